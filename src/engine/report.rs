//! Daily report binding: one optional task list per arrived attendance, plus
//! the productivity score derived from it.

use crate::db::Database;
use crate::error::{EngineError, EngineResult};
use crate::model::{AttendanceRecord, DailyReport, Employee};
use chrono::{NaiveDate, NaiveTime};
use tracing::info;

/// Submits (or re-submits) the day's task list. Requires an attendance with a
/// recorded arrival; blank tasks are dropped and an all-blank list is
/// rejected. Re-submission replaces the previous list wholesale.
pub fn submit_report(
    database: &Database,
    employee: &Employee,
    date: NaiveDate,
    tasks: Vec<String>,
    submitted_at: NaiveTime,
) -> EngineResult<DailyReport> {
    let cleaned = tasks
        .into_iter()
        .map(|task| task.trim().to_string())
        .filter(|task| !task.is_empty())
        .collect::<Vec<_>>();

    if cleaned.is_empty() {
        return Err(EngineError::EmptyTaskList);
    }

    let attendance = database
        .attendance_for(employee.id, date)?
        .filter(AttendanceRecord::has_arrived)
        .ok_or(EngineError::NoAttendanceRecord {
            employee_id: employee.id,
            date,
        })?;

    let report = database.upsert_report(
        employee.id,
        &employee.company_id,
        attendance.id,
        date,
        &cleaned,
        submitted_at,
    )?;

    info!(
        employee_id = employee.id,
        %date,
        task_count = report.tasks.len(),
        "daily report submitted"
    );

    Ok(report)
}

/// Bounded [0, 100] score: up to 80 points for task volume (20 per task),
/// up to 20 for punctuality, eroded one point per minute of lateness.
pub fn productivity_score(task_count: usize, late_minutes: i64) -> i64 {
    let task_score = (task_count as i64 * 20).min(80);
    let punctuality_score = if late_minutes == 0 {
        20
    } else {
        (20 - late_minutes).max(0)
    };

    (task_score + punctuality_score).min(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewEmployee, PenaltyPolicy, Role};
    use chrono::NaiveDateTime;

    fn fixture() -> (tempfile::TempDir, Database, Employee) {
        let dir = tempfile::tempdir().unwrap();
        let database = Database::open(&dir.path().join("pank.db")).unwrap();
        let employee = database
            .insert_employee(
                &NewEmployee {
                    company_id: "acme".to_string(),
                    name: "Fatou".to_string(),
                    email: "fatou@example.com".to_string(),
                    role: Role::Employee,
                    work_start_time: t("08:00"),
                    work_end_time: t("17:00"),
                },
                NaiveDateTime::parse_from_str("2026-01-05T08:00:00", "%Y-%m-%dT%H:%M:%S").unwrap(),
            )
            .unwrap();

        (dir, database, employee)
    }

    fn t(value: &str) -> NaiveTime {
        crate::clock::parse_wall_clock(value).unwrap()
    }

    fn d(value: &str) -> NaiveDate {
        crate::clock::parse_date(value).unwrap()
    }

    fn arrived(database: &Database, employee: &Employee, date: NaiveDate) {
        crate::engine::attendance::punch_in(
            database,
            employee,
            &PenaltyPolicy::fallback("acme"),
            date,
            t("08:00"),
        )
        .unwrap();
    }

    #[test]
    fn report_requires_an_arrived_attendance() {
        let (_dir, database, employee) = fixture();

        let result = submit_report(
            &database,
            &employee,
            d("2026-02-18"),
            vec!["write docs".to_string()],
            t("18:00"),
        );
        assert!(matches!(result, Err(EngineError::NoAttendanceRecord { .. })));
    }

    #[test]
    fn blank_tasks_are_rejected() {
        let (_dir, database, employee) = fixture();
        arrived(&database, &employee, d("2026-02-18"));

        let result = submit_report(
            &database,
            &employee,
            d("2026-02-18"),
            vec!["   ".to_string(), String::new()],
            t("18:00"),
        );
        assert!(matches!(result, Err(EngineError::EmptyTaskList)));
    }

    #[test]
    fn blank_entries_are_trimmed_out_of_mixed_lists() {
        let (_dir, database, employee) = fixture();
        arrived(&database, &employee, d("2026-02-18"));

        let report = submit_report(
            &database,
            &employee,
            d("2026-02-18"),
            vec!["  fix login bug  ".to_string(), " ".to_string()],
            t("18:00"),
        )
        .unwrap();

        assert_eq!(report.tasks, vec!["fix login bug"]);
    }

    #[test]
    fn resubmission_replaces_the_previous_list() {
        let (_dir, database, employee) = fixture();
        arrived(&database, &employee, d("2026-02-18"));

        submit_report(
            &database,
            &employee,
            d("2026-02-18"),
            vec!["morning standup".to_string()],
            t("12:00"),
        )
        .unwrap();

        let second = submit_report(
            &database,
            &employee,
            d("2026-02-18"),
            vec!["deploy v2".to_string(), "close tickets".to_string()],
            t("18:30"),
        )
        .unwrap();

        // Never a merge of both submissions.
        assert_eq!(second.tasks, vec!["deploy v2", "close tickets"]);
        assert_eq!(second.submitted_at, t("18:30"));
    }

    #[test]
    fn score_combines_tasks_and_punctuality() {
        // 3 tasks, 10 minutes late: min(60, 80) + max(0, 20 - 10) = 70.
        assert_eq!(productivity_score(3, 10), 70);
        assert_eq!(productivity_score(3, 0), 80);
        assert_eq!(productivity_score(0, 0), 20);
    }

    #[test]
    fn score_caps_at_hundred_and_floors_punctuality() {
        assert_eq!(productivity_score(10, 0), 100);
        assert_eq!(productivity_score(4, 120), 80);
        assert_eq!(productivity_score(5, 500), 80);
    }

    #[test]
    fn score_is_monotonic_in_task_count() {
        let mut previous = 0;
        for tasks in 0..=8 {
            let score = productivity_score(tasks, 5);
            assert!(score >= previous);
            previous = score;
        }
    }
}
