use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

pub const DEFAULT_WORK_START: &str = "08:00";
pub const DEFAULT_WORK_END: &str = "17:00";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Employee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Employee => "employee",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "employee" => Some(Role::Employee),
            _ => None,
        }
    }
}

/// Unit the penalty rate is billed in. The stored rate is always expressed
/// per hour; minute billing derives a per-minute rate from it, day billing
/// applies the rate once per late day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PenaltyUnit {
    Minute,
    Hour,
    Day,
}

impl PenaltyUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            PenaltyUnit::Minute => "minute",
            PenaltyUnit::Hour => "hour",
            PenaltyUnit::Day => "day",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "minute" => Some(PenaltyUnit::Minute),
            "hour" => Some(PenaltyUnit::Hour),
            "day" => Some(PenaltyUnit::Day),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Employee {
    pub id: i64,
    pub company_id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub work_start_time: NaiveTime,
    pub work_end_time: NaiveTime,
    pub email_verified: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub company_id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub work_start_time: NaiveTime,
    pub work_end_time: NaiveTime,
}

/// One attendance record per (employee, date). `late_minutes` and
/// `penalty_amount` are fixed at punch-in and never recomputed, even if the
/// company policy changes afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceRecord {
    pub id: i64,
    pub employee_id: i64,
    pub company_id: String,
    pub date: NaiveDate,
    pub arrival_time: Option<NaiveTime>,
    pub departure_time: Option<NaiveTime>,
    pub arrival_validated: bool,
    pub late_minutes: i64,
    pub penalty_amount: i64,
}

impl AttendanceRecord {
    pub fn has_arrived(&self) -> bool {
        self.arrival_time.is_some()
    }

    pub fn is_late(&self) -> bool {
        self.has_arrived() && self.late_minutes > 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyReport {
    pub id: i64,
    pub employee_id: i64,
    pub company_id: String,
    pub attendance_id: i64,
    pub date: NaiveDate,
    pub tasks: Vec<String>,
    pub submitted_at: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PenaltyPolicy {
    pub company_id: String,
    pub work_start_time: NaiveTime,
    pub work_end_time: NaiveTime,
    pub penalty_per_hour: i64,
    pub penalty_unit: PenaltyUnit,
}

impl PenaltyPolicy {
    /// Applied when a company has no stored policy: standard office hours,
    /// hourly billing, zero rate. Missing configuration never fails a punch.
    pub fn fallback(company_id: &str) -> Self {
        Self {
            company_id: company_id.to_string(),
            work_start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
            work_end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
            penalty_per_hour: 0,
            penalty_unit: PenaltyUnit::Hour,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VerificationRecord {
    pub id: i64,
    pub email: String,
    pub code: String,
    pub expires_at: NaiveDateTime,
    pub verified: bool,
}
