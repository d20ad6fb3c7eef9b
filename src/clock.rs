use crate::error::{EngineError, EngineResult};
use crate::model::PenaltyUnit;
use chrono::{NaiveDate, NaiveTime};

/// Parses a wall-clock string, accepting both `HH:MM` and `HH:MM:SS`.
pub fn parse_wall_clock(value: &str) -> EngineResult<NaiveTime> {
    let trimmed = value.trim();

    NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .map_err(|_| EngineError::InvalidTimeFormat(value.to_string()))
}

pub fn parse_date(value: &str) -> EngineResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| EngineError::InvalidTimeFormat(value.to_string()))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn format_wall_clock(time: NaiveTime) -> String {
    time.format("%H:%M:%S").to_string()
}

/// Whole minutes of lateness. Only time-of-day matters; early arrival clamps
/// to zero.
pub fn late_minutes(expected: NaiveTime, actual: NaiveTime) -> i64 {
    (actual - expected).num_minutes().max(0)
}

/// Penalty owed for `late_minutes` of lateness under an hourly `rate`.
/// Rounding is always upward, so any positive lateness with a positive rate
/// yields a positive penalty.
pub fn penalty(late_minutes: i64, rate_per_hour: i64, unit: PenaltyUnit) -> i64 {
    if late_minutes <= 0 || rate_per_hour <= 0 {
        return 0;
    }

    match unit {
        // The per-minute rate is derived from the hourly rate, which lands on
        // the same integer ceiling as billing fractional hours.
        PenaltyUnit::Minute | PenaltyUnit::Hour => (late_minutes * rate_per_hour + 59) / 60,
        PenaltyUnit::Day => rate_per_hour,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(value: &str) -> NaiveTime {
        parse_wall_clock(value).unwrap()
    }

    #[test]
    fn late_minutes_clamps_early_arrival() {
        assert_eq!(late_minutes(t("08:00"), t("07:50")), 0);
        assert_eq!(late_minutes(t("08:00"), t("08:00")), 0);
        assert_eq!(late_minutes(t("08:00"), t("08:45")), 45);
    }

    #[test]
    fn late_minutes_is_never_negative() {
        for (expected, actual) in [("23:59", "00:00"), ("12:30", "09:15"), ("00:00", "00:00")] {
            assert!(late_minutes(t(expected), t(actual)) >= 0);
        }
    }

    #[test]
    fn hourly_penalty_rounds_up() {
        // 45 minutes at 1500/hour bills ceil(45/60 * 1500) = 1125.
        assert_eq!(penalty(45, 1500, PenaltyUnit::Hour), 1125);
        // 1 minute at 1500/hour is 25, never rounded down to nothing.
        assert_eq!(penalty(1, 1500, PenaltyUnit::Hour), 25);
        // 1 minute at 7/hour: ceil(7/60) = 1.
        assert_eq!(penalty(1, 7, PenaltyUnit::Hour), 1);
    }

    #[test]
    fn minute_penalty_derives_from_hourly_rate() {
        assert_eq!(penalty(30, 600, PenaltyUnit::Minute), 300);
    }

    #[test]
    fn day_penalty_is_flat() {
        assert_eq!(penalty(1, 2000, PenaltyUnit::Day), 2000);
        assert_eq!(penalty(300, 2000, PenaltyUnit::Day), 2000);
    }

    #[test]
    fn zero_lateness_is_free_for_any_unit() {
        for unit in [PenaltyUnit::Minute, PenaltyUnit::Hour, PenaltyUnit::Day] {
            assert_eq!(penalty(0, 1500, unit), 0);
        }
    }

    #[test]
    fn positive_lateness_with_positive_rate_always_costs() {
        for unit in [PenaltyUnit::Minute, PenaltyUnit::Hour, PenaltyUnit::Day] {
            for late in [1, 17, 59, 60, 61, 480] {
                assert!(penalty(late, 100, unit) > 0);
            }
        }
    }

    #[test]
    fn parses_both_wall_clock_shapes() {
        assert_eq!(t("08:45"), t("08:45:00"));
        assert!(parse_wall_clock("8h45").is_err());
        assert!(parse_wall_clock("25:00").is_err());
        assert!(parse_wall_clock("").is_err());
    }

    #[test]
    fn parses_iso_dates_only() {
        assert!(parse_date("2026-02-18").is_ok());
        assert!(parse_date("18/02/2026").is_err());
    }
}
