//! Per-(employee, date) attendance lifecycle: punch-in, punch-out, admin
//! validation. Lateness and penalty are computed once at punch-in from the
//! policy in effect at that moment and are never revisited.

use crate::clock;
use crate::db::Database;
use crate::error::{EngineError, EngineResult};
use crate::model::{AttendanceRecord, Employee, PenaltyPolicy};
use chrono::{NaiveDate, NaiveTime};
use tracing::info;

/// Records the employee's arrival for `date`. Fails with `DuplicatePunch`
/// when a record already exists; the store's uniqueness constraint backs this
/// check up under concurrent punches.
pub fn punch_in(
    database: &Database,
    employee: &Employee,
    policy: &PenaltyPolicy,
    date: NaiveDate,
    now: NaiveTime,
) -> EngineResult<AttendanceRecord> {
    if database.attendance_for(employee.id, date)?.is_some() {
        return Err(EngineError::DuplicatePunch {
            employee_id: employee.id,
            date,
        });
    }

    let late = clock::late_minutes(employee.work_start_time, now);
    let amount = clock::penalty(late, policy.penalty_per_hour, policy.penalty_unit);

    let record = database.insert_attendance(
        employee.id,
        &employee.company_id,
        date,
        now,
        late,
        amount,
    )?;

    info!(
        employee_id = employee.id,
        %date,
        late_minutes = late,
        penalty = amount,
        "arrival recorded"
    );

    Ok(record)
}

/// Records the departure. Requires an existing arrival and no prior
/// departure; validation is not required to leave.
pub fn punch_out(
    database: &Database,
    employee_id: i64,
    date: NaiveDate,
    now: NaiveTime,
) -> EngineResult<AttendanceRecord> {
    let record = database
        .attendance_for(employee_id, date)?
        .filter(AttendanceRecord::has_arrived)
        .ok_or(EngineError::NoArrival { employee_id, date })?;

    if record.departure_time.is_some() {
        return Err(EngineError::AlreadyDeparted { employee_id, date });
    }

    let updated = database.set_departure(record.id, now)?;
    info!(employee_id, %date, "departure recorded");

    Ok(updated)
}

/// Sets or revokes the admin validation flag. Idempotent: re-applying the
/// current value is a no-op, not an error.
pub fn set_validation(
    database: &Database,
    attendance_id: i64,
    validated: bool,
) -> EngineResult<AttendanceRecord> {
    let record = database
        .attendance_by_id(attendance_id)?
        .ok_or(EngineError::RecordNotFound(attendance_id))?;

    if !record.has_arrived() {
        return Err(EngineError::NoArrivalToValidate { attendance_id });
    }

    if record.arrival_validated == validated {
        return Ok(record);
    }

    let updated = database.set_validation(attendance_id, validated)?;
    info!(attendance_id, validated, "validation updated");

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewEmployee, PenaltyUnit, Role};
    use chrono::NaiveDateTime;

    fn fixture() -> (tempfile::TempDir, Database, Employee, PenaltyPolicy) {
        let dir = tempfile::tempdir().unwrap();
        let database = Database::open(&dir.path().join("pank.db")).unwrap();
        let employee = database
            .insert_employee(
                &NewEmployee {
                    company_id: "acme".to_string(),
                    name: "Moussa".to_string(),
                    email: "moussa@example.com".to_string(),
                    role: Role::Employee,
                    work_start_time: t("08:00"),
                    work_end_time: t("17:00"),
                },
                NaiveDateTime::parse_from_str("2026-01-05T08:00:00", "%Y-%m-%dT%H:%M:%S").unwrap(),
            )
            .unwrap();

        let policy = PenaltyPolicy {
            company_id: "acme".to_string(),
            work_start_time: t("08:00"),
            work_end_time: t("17:00"),
            penalty_per_hour: 1500,
            penalty_unit: PenaltyUnit::Hour,
        };

        (dir, database, employee, policy)
    }

    fn t(value: &str) -> NaiveTime {
        crate::clock::parse_wall_clock(value).unwrap()
    }

    fn d(value: &str) -> NaiveDate {
        crate::clock::parse_date(value).unwrap()
    }

    #[test]
    fn late_punch_in_accrues_penalty() {
        let (_dir, database, employee, policy) = fixture();

        let record = punch_in(&database, &employee, &policy, d("2026-02-18"), t("08:45")).unwrap();

        assert_eq!(record.late_minutes, 45);
        assert_eq!(record.penalty_amount, 1125);
        assert!(!record.arrival_validated);
        assert!(record.departure_time.is_none());
    }

    #[test]
    fn early_punch_in_is_free() {
        let (_dir, database, employee, policy) = fixture();

        let record = punch_in(&database, &employee, &policy, d("2026-02-18"), t("07:50")).unwrap();

        assert_eq!(record.late_minutes, 0);
        assert_eq!(record.penalty_amount, 0);
    }

    #[test]
    fn second_punch_in_same_day_fails() {
        let (_dir, database, employee, policy) = fixture();
        let date = d("2026-02-18");

        let first = punch_in(&database, &employee, &policy, date, t("08:05")).unwrap();
        let second = punch_in(&database, &employee, &policy, date, t("09:00"));

        assert!(matches!(second, Err(EngineError::DuplicatePunch { .. })));
        let stored = database.attendance_for(employee.id, date).unwrap().unwrap();
        assert_eq!(stored.late_minutes, first.late_minutes);
    }

    #[test]
    fn penalty_is_pinned_to_punch_time_policy() {
        let (_dir, database, employee, mut policy) = fixture();

        let record = punch_in(&database, &employee, &policy, d("2026-02-18"), t("08:30")).unwrap();
        assert_eq!(record.penalty_amount, 750);

        // A later policy change must not touch the stored amounts.
        policy.penalty_per_hour = 9000;
        database.upsert_policy(&policy).unwrap();

        let stored = database.attendance_by_id(record.id).unwrap().unwrap();
        assert_eq!(stored.penalty_amount, 750);
        assert_eq!(stored.late_minutes, 30);
    }

    #[test]
    fn punch_out_requires_arrival() {
        let (_dir, database, employee, _policy) = fixture();

        let result = punch_out(&database, employee.id, d("2026-02-18"), t("17:05"));
        assert!(matches!(result, Err(EngineError::NoArrival { .. })));
    }

    #[test]
    fn punch_out_twice_fails() {
        let (_dir, database, employee, policy) = fixture();
        let date = d("2026-02-18");

        punch_in(&database, &employee, &policy, date, t("08:00")).unwrap();
        let departed = punch_out(&database, employee.id, date, t("17:02")).unwrap();
        assert_eq!(departed.departure_time, Some(t("17:02")));

        let again = punch_out(&database, employee.id, date, t("18:00"));
        assert!(matches!(again, Err(EngineError::AlreadyDeparted { .. })));
    }

    #[test]
    fn punch_out_does_not_require_validation() {
        let (_dir, database, employee, policy) = fixture();
        let date = d("2026-02-18");

        let record = punch_in(&database, &employee, &policy, date, t("08:00")).unwrap();
        assert!(!record.arrival_validated);
        assert!(punch_out(&database, employee.id, date, t("17:00")).is_ok());
    }

    #[test]
    fn validation_is_idempotent_and_revocable() {
        let (_dir, database, employee, policy) = fixture();
        let record = punch_in(&database, &employee, &policy, d("2026-02-18"), t("08:00")).unwrap();

        let once = set_validation(&database, record.id, true).unwrap();
        let twice = set_validation(&database, record.id, true).unwrap();
        assert!(once.arrival_validated);
        assert_eq!(once.arrival_validated, twice.arrival_validated);

        // Revocation works even after departure.
        punch_out(&database, employee.id, d("2026-02-18"), t("17:00")).unwrap();
        let revoked = set_validation(&database, record.id, false).unwrap();
        assert!(!revoked.arrival_validated);
    }

    #[test]
    fn validating_missing_record_fails() {
        let (_dir, database, _employee, _policy) = fixture();

        let result = set_validation(&database, 9999, true);
        assert!(matches!(result, Err(EngineError::RecordNotFound(9999))));
    }
}
