pub mod queries;

use crate::error::{EngineError, EngineResult};
use crate::model::{
    AttendanceRecord, DailyReport, Employee, NewEmployee, PenaltyPolicy, PenaltyUnit, Role,
    VerificationRecord,
};
use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{Connection, Row, params};
use std::fs;
use std::path::Path;

/// SQLite-backed record store. The `UNIQUE(employee_id, date)` constraint on
/// attendances is the authority for the one-record-per-day invariant; the
/// engine treats a constraint violation as `DuplicatePunch`.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite DB: {}", path.display()))?;

        let database = Self { conn };
        database.init_schema()?;

        Ok(database)
    }

    pub fn init_schema(&self) -> anyhow::Result<()> {
        queries::schema_statements()
            .iter()
            .try_for_each(|statement| {
                self.conn
                    .execute(statement, [])
                    .context("Failed to initialize schema")
                    .map(|_| ())
            })
    }

    // --- employees -------------------------------------------------------

    pub fn insert_employee(
        &self,
        new: &NewEmployee,
        created_at: NaiveDateTime,
    ) -> EngineResult<Employee> {
        self.conn.execute(
            "INSERT INTO employees (company_id, name, email, role, work_start_time, work_end_time, email_verified, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
            params![
                new.company_id,
                new.name,
                new.email,
                new.role.as_str(),
                new.work_start_time,
                new.work_end_time,
                created_at,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        self.employee_by_id(id)?
            .ok_or(EngineError::EmployeeNotFound(id))
    }

    pub fn employee_by_id(&self, id: i64) -> EngineResult<Option<Employee>> {
        let employee = self
            .conn
            .query_row(
                "SELECT id, company_id, name, email, role, work_start_time, work_end_time, email_verified, created_at
                 FROM employees WHERE id = ?1",
                params![id],
                map_employee,
            )
            .ok();

        Ok(employee)
    }

    /// Roster in insertion order; ranking ties rely on this order being stable.
    pub fn employees_for_company(&self, company_id: &str) -> EngineResult<Vec<Employee>> {
        let mut statement = self.conn.prepare(
            "SELECT id, company_id, name, email, role, work_start_time, work_end_time, email_verified, created_at
             FROM employees
             WHERE company_id = ?1
             ORDER BY id ASC",
        )?;

        let rows = statement
            .query_map(params![company_id], map_employee)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    pub fn employee_count(&self, company_id: &str) -> EngineResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM employees WHERE company_id = ?1 AND role = 'employee'",
            params![company_id],
            |row| row.get(0),
        )?;

        Ok(count)
    }

    pub fn mark_email_verified(&self, email: &str) -> EngineResult<()> {
        self.conn.execute(
            "UPDATE employees SET email_verified = 1 WHERE email = ?1",
            params![email],
        )?;

        Ok(())
    }

    // --- attendances -----------------------------------------------------

    pub fn insert_attendance(
        &self,
        employee_id: i64,
        company_id: &str,
        date: NaiveDate,
        arrival_time: NaiveTime,
        late_minutes: i64,
        penalty_amount: i64,
    ) -> EngineResult<AttendanceRecord> {
        let result = self.conn.execute(
            "INSERT INTO attendances (employee_id, company_id, date, arrival_time, arrival_validated, late_minutes, penalty_amount)
             VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6)",
            params![
                employee_id,
                company_id,
                date,
                arrival_time,
                late_minutes,
                penalty_amount
            ],
        );

        match result {
            Ok(_) => {
                let id = self.conn.last_insert_rowid();
                self.attendance_by_id(id)?
                    .ok_or(EngineError::RecordNotFound(id))
            }
            Err(err) if is_unique_violation(&err) => {
                Err(EngineError::DuplicatePunch { employee_id, date })
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn attendance_by_id(&self, id: i64) -> EngineResult<Option<AttendanceRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT id, employee_id, company_id, date, arrival_time, departure_time, arrival_validated, late_minutes, penalty_amount
                 FROM attendances WHERE id = ?1",
                params![id],
                map_attendance,
            )
            .ok();

        Ok(record)
    }

    pub fn attendance_for(
        &self,
        employee_id: i64,
        date: NaiveDate,
    ) -> EngineResult<Option<AttendanceRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT id, employee_id, company_id, date, arrival_time, departure_time, arrival_validated, late_minutes, penalty_amount
                 FROM attendances WHERE employee_id = ?1 AND date = ?2",
                params![employee_id, date],
                map_attendance,
            )
            .ok();

        Ok(record)
    }

    pub fn set_departure(
        &self,
        id: i64,
        departure_time: NaiveTime,
    ) -> EngineResult<AttendanceRecord> {
        self.conn.execute(
            "UPDATE attendances SET departure_time = ?2 WHERE id = ?1",
            params![id, departure_time],
        )?;

        self.attendance_by_id(id)?
            .ok_or(EngineError::RecordNotFound(id))
    }

    pub fn set_validation(&self, id: i64, validated: bool) -> EngineResult<AttendanceRecord> {
        self.conn.execute(
            "UPDATE attendances SET arrival_validated = ?2 WHERE id = ?1",
            params![id, validated],
        )?;

        self.attendance_by_id(id)?
            .ok_or(EngineError::RecordNotFound(id))
    }

    pub fn attendances_between(
        &self,
        company_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> EngineResult<Vec<AttendanceRecord>> {
        let mut statement = self.conn.prepare(
            "SELECT id, employee_id, company_id, date, arrival_time, departure_time, arrival_validated, late_minutes, penalty_amount
             FROM attendances
             WHERE company_id = ?1 AND date >= ?2 AND date <= ?3
             ORDER BY date ASC, id ASC",
        )?;

        let rows = statement
            .query_map(params![company_id, from, to], map_attendance)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    pub fn latest_attendance_date(&self, company_id: &str) -> EngineResult<Option<NaiveDate>> {
        let date = self
            .conn
            .query_row(
                "SELECT date FROM attendances WHERE company_id = ?1 ORDER BY date DESC LIMIT 1",
                params![company_id],
                |row| row.get(0),
            )
            .ok();

        Ok(date)
    }

    // --- daily reports ---------------------------------------------------

    /// Last-write-wins per attendance: a re-submission replaces the task list
    /// and submission time of the existing report.
    pub fn upsert_report(
        &self,
        employee_id: i64,
        company_id: &str,
        attendance_id: i64,
        date: NaiveDate,
        tasks: &[String],
        submitted_at: NaiveTime,
    ) -> EngineResult<DailyReport> {
        let tasks_json = serde_json::to_string(tasks)?;

        self.conn.execute(
            "INSERT INTO daily_reports (employee_id, company_id, attendance_id, date, tasks, submitted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(attendance_id)
             DO UPDATE SET tasks=excluded.tasks, submitted_at=excluded.submitted_at",
            params![employee_id, company_id, attendance_id, date, tasks_json, submitted_at],
        )?;

        self.report_for_attendance(attendance_id)?
            .ok_or(EngineError::RecordNotFound(attendance_id))
    }

    pub fn report_for_attendance(&self, attendance_id: i64) -> EngineResult<Option<DailyReport>> {
        let report = self
            .conn
            .query_row(
                "SELECT id, employee_id, company_id, attendance_id, date, tasks, submitted_at
                 FROM daily_reports WHERE attendance_id = ?1",
                params![attendance_id],
                map_report,
            )
            .ok();

        Ok(report)
    }

    pub fn reports_between(
        &self,
        company_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> EngineResult<Vec<DailyReport>> {
        let mut statement = self.conn.prepare(
            "SELECT id, employee_id, company_id, attendance_id, date, tasks, submitted_at
             FROM daily_reports
             WHERE company_id = ?1 AND date >= ?2 AND date <= ?3
             ORDER BY date ASC, id ASC",
        )?;

        let rows = statement
            .query_map(params![company_id, from, to], map_report)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    // --- penalty policies ------------------------------------------------

    pub fn policy_for_company(&self, company_id: &str) -> EngineResult<Option<PenaltyPolicy>> {
        let policy = self
            .conn
            .query_row(
                "SELECT company_id, work_start_time, work_end_time, penalty_per_hour, penalty_unit
                 FROM company_policies WHERE company_id = ?1",
                params![company_id],
                map_policy,
            )
            .ok();

        Ok(policy)
    }

    pub fn upsert_policy(&self, policy: &PenaltyPolicy) -> EngineResult<()> {
        self.conn.execute(
            "INSERT INTO company_policies (company_id, work_start_time, work_end_time, penalty_per_hour, penalty_unit)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(company_id)
             DO UPDATE SET work_start_time=excluded.work_start_time, work_end_time=excluded.work_end_time,
                           penalty_per_hour=excluded.penalty_per_hour, penalty_unit=excluded.penalty_unit",
            params![
                policy.company_id,
                policy.work_start_time,
                policy.work_end_time,
                policy.penalty_per_hour,
                policy.penalty_unit.as_str(),
            ],
        )?;

        Ok(())
    }

    // --- email verification ----------------------------------------------

    pub fn insert_verification(
        &self,
        email: &str,
        code: &str,
        expires_at: NaiveDateTime,
    ) -> EngineResult<()> {
        self.conn.execute(
            "INSERT INTO email_verifications (email, code, expires_at, verified) VALUES (?1, ?2, ?3, 0)",
            params![email, code, expires_at],
        )?;

        Ok(())
    }

    pub fn latest_verification(&self, email: &str) -> EngineResult<Option<VerificationRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT id, email, code, expires_at, verified
                 FROM email_verifications WHERE email = ?1
                 ORDER BY id DESC LIMIT 1",
                params![email],
                |row| {
                    Ok(VerificationRecord {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        code: row.get(2)?,
                        expires_at: row.get(3)?,
                        verified: row.get(4)?,
                    })
                },
            )
            .ok();

        Ok(record)
    }

    pub fn mark_verification_used(&self, id: i64) -> EngineResult<()> {
        self.conn.execute(
            "UPDATE email_verifications SET verified = 1 WHERE id = ?1",
            params![id],
        )?;

        Ok(())
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn map_employee(row: &Row<'_>) -> rusqlite::Result<Employee> {
    let role: String = row.get(4)?;

    Ok(Employee {
        id: row.get(0)?,
        company_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        role: Role::parse(&role).unwrap_or(Role::Employee),
        work_start_time: row.get(5)?,
        work_end_time: row.get(6)?,
        email_verified: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn map_attendance(row: &Row<'_>) -> rusqlite::Result<AttendanceRecord> {
    Ok(AttendanceRecord {
        id: row.get(0)?,
        employee_id: row.get(1)?,
        company_id: row.get(2)?,
        date: row.get(3)?,
        arrival_time: row.get(4)?,
        departure_time: row.get(5)?,
        arrival_validated: row.get(6)?,
        late_minutes: row.get(7)?,
        penalty_amount: row.get(8)?,
    })
}

fn map_report(row: &Row<'_>) -> rusqlite::Result<DailyReport> {
    let tasks_json: String = row.get(5)?;

    Ok(DailyReport {
        id: row.get(0)?,
        employee_id: row.get(1)?,
        company_id: row.get(2)?,
        attendance_id: row.get(3)?,
        date: row.get(4)?,
        tasks: serde_json::from_str(&tasks_json).unwrap_or_default(),
        submitted_at: row.get(6)?,
    })
}

fn map_policy(row: &Row<'_>) -> rusqlite::Result<PenaltyPolicy> {
    let unit: String = row.get(4)?;

    Ok(PenaltyPolicy {
        company_id: row.get(0)?,
        work_start_time: row.get(1)?,
        work_end_time: row.get(2)?,
        penalty_per_hour: row.get(3)?,
        penalty_unit: PenaltyUnit::parse(&unit).unwrap_or(PenaltyUnit::Hour),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let database = Database::open(&dir.path().join("pank.db")).unwrap();
        (dir, database)
    }

    fn sample_employee(database: &Database) -> Employee {
        let created_at =
            NaiveDateTime::parse_from_str("2026-02-02T09:00:00", "%Y-%m-%dT%H:%M:%S").unwrap();
        database
            .insert_employee(
                &NewEmployee {
                    company_id: "acme".to_string(),
                    name: "Awa".to_string(),
                    email: "awa@example.com".to_string(),
                    role: Role::Employee,
                    work_start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                    work_end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
                },
                created_at,
            )
            .unwrap()
    }

    #[test]
    fn duplicate_attendance_insert_is_rejected_by_constraint() {
        let (_dir, database) = open_test_db();
        let employee = sample_employee(&database);
        let date = NaiveDate::from_ymd_opt(2026, 2, 18).unwrap();
        let arrival = NaiveTime::from_hms_opt(8, 10, 0).unwrap();

        let first = database
            .insert_attendance(employee.id, "acme", date, arrival, 10, 250)
            .unwrap();

        let second = database.insert_attendance(
            employee.id,
            "acme",
            date,
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            60,
            1500,
        );
        assert!(matches!(second, Err(EngineError::DuplicatePunch { .. })));

        // The stored record still carries the first punch.
        let stored = database.attendance_for(employee.id, date).unwrap().unwrap();
        assert_eq!(stored.id, first.id);
        assert_eq!(stored.late_minutes, 10);
        assert_eq!(stored.penalty_amount, 250);
    }

    #[test]
    fn report_upsert_overwrites_tasks() {
        let (_dir, database) = open_test_db();
        let employee = sample_employee(&database);
        let date = NaiveDate::from_ymd_opt(2026, 2, 18).unwrap();
        let arrival = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        let attendance = database
            .insert_attendance(employee.id, "acme", date, arrival, 0, 0)
            .unwrap();

        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
        database
            .upsert_report(
                employee.id,
                "acme",
                attendance.id,
                date,
                &["draft".to_string()],
                noon,
            )
            .unwrap();
        let evening = NaiveTime::from_hms_opt(18, 5, 0).unwrap();
        let replaced = database
            .upsert_report(
                employee.id,
                "acme",
                attendance.id,
                date,
                &["ship release".to_string(), "review PRs".to_string()],
                evening,
            )
            .unwrap();

        assert_eq!(replaced.tasks, vec!["ship release", "review PRs"]);
        assert_eq!(replaced.submitted_at, evening);

        let all = database.reports_between("acme", date, date).unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn missing_policy_reads_as_none() {
        let (_dir, database) = open_test_db();
        assert!(database.policy_for_company("ghost").unwrap().is_none());
    }

    #[test]
    fn policy_upsert_replaces_existing_row() {
        let (_dir, database) = open_test_db();
        let mut policy = PenaltyPolicy::fallback("acme");
        policy.penalty_per_hour = 1500;
        database.upsert_policy(&policy).unwrap();

        policy.penalty_per_hour = 2000;
        policy.penalty_unit = PenaltyUnit::Day;
        database.upsert_policy(&policy).unwrap();

        let stored = database.policy_for_company("acme").unwrap().unwrap();
        assert_eq!(stored.penalty_per_hour, 2000);
        assert_eq!(stored.penalty_unit, PenaltyUnit::Day);
    }
}
