use chrono::NaiveDate;

/// Failures surfaced by the attendance engine. All of these are value-level
/// outcomes a caller can present to the user; none indicate corruption, and a
/// failed transition leaves the record set untouched.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("attendance already recorded for employee {employee_id} on {date}")]
    DuplicatePunch { employee_id: i64, date: NaiveDate },

    #[error("no arrival recorded for employee {employee_id} on {date}")]
    NoArrival { employee_id: i64, date: NaiveDate },

    #[error("departure already recorded for employee {employee_id} on {date}")]
    AlreadyDeparted { employee_id: i64, date: NaiveDate },

    #[error("attendance {attendance_id} has no arrival to validate")]
    NoArrivalToValidate { attendance_id: i64 },

    #[error("attendance record not found: {0}")]
    RecordNotFound(i64),

    #[error("no arrived attendance for employee {employee_id} on {date}; punch in first")]
    NoAttendanceRecord { employee_id: i64, date: NaiveDate },

    #[error("a daily report needs at least one non-empty task")]
    EmptyTaskList,

    #[error("invalid time format: {0}")]
    InvalidTimeFormat(String),

    #[error("employee not found: {0}")]
    EmployeeNotFound(i64),

    #[error("verification code is invalid or expired")]
    InvalidVerificationCode,

    #[error("failed to encode task list: {0}")]
    TaskEncoding(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] rusqlite::Error),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
