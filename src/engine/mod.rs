pub mod attendance;
pub mod report;
pub mod stats;

use crate::db::Database;
use crate::error::EngineResult;
use crate::model::Role;
use chrono::NaiveDate;
use stats::Statistics;

/// Loads a snapshot of the company's roster, attendances and reports for the
/// range and folds it into statistics. The computation itself is pure; the
/// snapshot may lag concurrent writes, which simply shows up on the next
/// refresh.
///
/// Admins are not part of the statistics roster: headcount, the expected-
/// attendance denominator and the rankings only cover the employee role.
pub fn load_statistics(
    database: &Database,
    company_id: &str,
    from: NaiveDate,
    to: NaiveDate,
    today: NaiveDate,
) -> EngineResult<Statistics> {
    let employees = database
        .employees_for_company(company_id)?
        .into_iter()
        .filter(|employee| employee.role == Role::Employee)
        .collect::<Vec<_>>();
    let attendances = database.attendances_between(company_id, from, to)?;
    let reports = database.reports_between(company_id, from, to)?;

    Ok(stats::compute_statistics(
        from,
        to,
        &employees,
        &attendances,
        &reports,
        today,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewEmployee;
    use chrono::{NaiveDateTime, NaiveTime};

    fn insert(database: &Database, name: &str, role: Role) -> crate::model::Employee {
        database
            .insert_employee(
                &NewEmployee {
                    company_id: "acme".to_string(),
                    name: name.to_string(),
                    email: format!("{}@example.com", name.to_lowercase()),
                    role,
                    work_start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                    work_end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
                },
                NaiveDateTime::parse_from_str("2026-01-05T08:00:00", "%Y-%m-%dT%H:%M:%S").unwrap(),
            )
            .unwrap()
    }

    #[test]
    fn statistics_roster_excludes_admins() {
        let dir = tempfile::tempdir().unwrap();
        let database = Database::open(&dir.path().join("pank.db")).unwrap();
        let _admin = insert(&database, "Fatou", Role::Admin);
        let employee = insert(&database, "Awa", Role::Employee);

        let date = NaiveDate::from_ymd_opt(2026, 2, 18).unwrap();
        database
            .insert_attendance(
                employee.id,
                "acme",
                date,
                NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                0,
                0,
            )
            .unwrap();

        let stats = load_statistics(&database, "acme", date, date, date).unwrap();

        // One employee over one day with one arrival is full attendance; a
        // roster that still counted the admin would halve it.
        assert_eq!(stats.total_employees, 1);
        assert_eq!(stats.attendance_rate, 100.0);
        assert_eq!(stats.attendance_trend[0].total, 1);
    }

    #[test]
    fn rankings_never_include_admins() {
        let dir = tempfile::tempdir().unwrap();
        let database = Database::open(&dir.path().join("pank.db")).unwrap();
        let admin = insert(&database, "Fatou", Role::Admin);
        let employee = insert(&database, "Awa", Role::Employee);

        let date = NaiveDate::from_ymd_opt(2026, 2, 18).unwrap();
        database
            .insert_attendance(
                admin.id,
                "acme",
                date,
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                60,
                1500,
            )
            .unwrap();
        database
            .insert_attendance(
                employee.id,
                "acme",
                date,
                NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                0,
                0,
            )
            .unwrap();

        let stats = load_statistics(&database, "acme", date, date, date).unwrap();

        // The admin's penalty is not ranked, and the task ranking only lists
        // the employee roster.
        assert!(stats.penalties_by_employee.is_empty());
        assert_eq!(stats.tasks_by_employee.len(), 1);
        assert_eq!(stats.tasks_by_employee[0].employee_id, employee.id);
    }
}
