//! Outbound notification boundary. The engine only hands `(address, message)`
//! pairs to a sink and never waits on delivery; the real channel (SMTP,
//! transactional mail API) lives outside this crate.

use crate::db::Database;
use crate::error::{EngineError, EngineResult};
use chrono::{Duration, NaiveDateTime};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tracing::{info, warn};

pub trait NotificationSink {
    fn send(&self, address: &str, message: &str) -> anyhow::Result<()>;
}

/// Default sink: writes the notification to the log. Useful for local setups
/// and as the demo-mode fallback when no mail channel is configured.
pub struct LogSink;

impl NotificationSink for LogSink {
    fn send(&self, address: &str, message: &str) -> anyhow::Result<()> {
        info!(address, message, "notification dispatched");
        Ok(())
    }
}

/// Six-digit code derived from the address and issue instant.
pub fn generate_code(email: &str, now: NaiveDateTime) -> String {
    let mut hasher = DefaultHasher::new();
    email.hash(&mut hasher);
    now.and_utc().timestamp_nanos_opt().hash(&mut hasher);

    format!("{:06}", hasher.finish() % 900_000 + 100_000)
}

/// Stores a fresh verification code and pushes it to the sink. A sink failure
/// is logged but does not fail the operation: the attendance flows must never
/// block on delivery.
pub fn issue_verification(
    database: &Database,
    sink: &dyn NotificationSink,
    email: &str,
    ttl_minutes: i64,
    now: NaiveDateTime,
) -> EngineResult<()> {
    let code = generate_code(email, now);
    let expires_at = now + Duration::minutes(ttl_minutes);
    database.insert_verification(email, &code, expires_at)?;

    let message = format!(
        "Your PANK verification code is {code}. It expires in {ttl_minutes} minutes."
    );
    if let Err(error) = sink.send(email, &message) {
        warn!(email, error = %error, "verification code delivery failed");
    }

    Ok(())
}

/// Confirms a previously issued code and marks the employee's email verified.
/// Expired, mismatched or already-consumed codes are all rejected the same
/// way.
pub fn confirm_verification(
    database: &Database,
    email: &str,
    code: &str,
    now: NaiveDateTime,
) -> EngineResult<()> {
    let record = database
        .latest_verification(email)?
        .ok_or(EngineError::InvalidVerificationCode)?;

    if record.verified || record.expires_at < now || record.code != code.trim() {
        return Err(EngineError::InvalidVerificationCode);
    }

    database.mark_verification_used(record.id)?;
    database.mark_email_verified(email)?;
    info!(email, "email verified");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(value: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    fn open_test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let database = Database::open(&dir.path().join("pank.db")).unwrap();
        (dir, database)
    }

    #[test]
    fn generated_codes_are_six_digits() {
        let code = generate_code("awa@example.com", dt("2026-02-18T09:00:00"));
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
        assert!(!code.starts_with('0'));
    }

    #[test]
    fn issued_code_confirms_once() {
        let (_dir, database) = open_test_db();
        let issued_at = dt("2026-02-18T09:00:00");

        issue_verification(&database, &LogSink, "awa@example.com", 10, issued_at).unwrap();
        let code = database
            .latest_verification("awa@example.com")
            .unwrap()
            .unwrap()
            .code;

        let checked_at = dt("2026-02-18T09:05:00");
        confirm_verification(&database, "awa@example.com", &code, checked_at).unwrap();

        // The code is consumed; a replay is rejected.
        let replay = confirm_verification(&database, "awa@example.com", &code, checked_at);
        assert!(matches!(replay, Err(EngineError::InvalidVerificationCode)));
    }

    #[test]
    fn expired_code_is_rejected() {
        let (_dir, database) = open_test_db();
        let issued_at = dt("2026-02-18T09:00:00");

        issue_verification(&database, &LogSink, "awa@example.com", 10, issued_at).unwrap();
        let code = database
            .latest_verification("awa@example.com")
            .unwrap()
            .unwrap()
            .code;

        let too_late = dt("2026-02-18T09:20:00");
        let result = confirm_verification(&database, "awa@example.com", &code, too_late);
        assert!(matches!(result, Err(EngineError::InvalidVerificationCode)));
    }

    #[test]
    fn wrong_code_is_rejected() {
        let (_dir, database) = open_test_db();
        let issued_at = dt("2026-02-18T09:00:00");

        issue_verification(&database, &LogSink, "awa@example.com", 10, issued_at).unwrap();
        let result =
            confirm_verification(&database, "awa@example.com", "000000", issued_at);
        assert!(matches!(result, Err(EngineError::InvalidVerificationCode)));
    }
}
