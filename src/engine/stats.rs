//! Read-only aggregation over a snapshot of roster, attendance and report
//! records. Every function here is deterministic for a given snapshot and
//! tolerates empty input without dividing by zero.

use crate::engine::report::productivity_score;
use crate::model::{AttendanceRecord, DailyReport, Employee};
use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;

pub const MONTHLY_COMPARISON_MONTHS: usize = 6;

#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub total_employees: usize,
    /// Percentage of expected attendances (employees x calendar days) with a
    /// recorded arrival. 0 when the range or roster is empty.
    pub attendance_rate: f64,
    pub total_penalties: i64,
    pub average_productivity: f64,
    pub attendance_trend: Vec<AttendancePoint>,
    pub punctuality_trend: Vec<PunctualityPoint>,
    pub penalties_by_employee: Vec<PenaltyRank>,
    pub tasks_by_employee: Vec<TaskRank>,
    pub monthly_comparison: Vec<MonthlyPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendancePoint {
    pub date: NaiveDate,
    pub present: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PunctualityPoint {
    pub date: NaiveDate,
    pub on_time: usize,
    pub late: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PenaltyRank {
    pub employee_id: i64,
    pub name: String,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskRank {
    pub employee_id: i64,
    pub name: String,
    pub tasks: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyPoint {
    pub month: String,
    pub attendance_rate: i64,
    pub average_tasks: f64,
    pub attendance_direction: TrendDirection,
    pub productivity_direction: TrendDirection,
}

/// Folds the snapshot into company-wide statistics for the closed range
/// `[from, to]`. `today` anchors the trailing monthly comparison, which
/// deliberately ignores the selected range.
pub fn compute_statistics(
    from: NaiveDate,
    to: NaiveDate,
    employees: &[Employee],
    attendances: &[AttendanceRecord],
    reports: &[DailyReport],
    today: NaiveDate,
) -> Statistics {
    Statistics {
        total_employees: employees.len(),
        attendance_rate: attendance_rate(from, to, employees.len(), attendances),
        total_penalties: attendances.iter().map(|record| record.penalty_amount).sum(),
        average_productivity: average_productivity(attendances, reports),
        attendance_trend: attendance_trend(from, to, employees.len(), attendances),
        punctuality_trend: punctuality_trend(from, to, attendances),
        penalties_by_employee: penalty_ranking(employees, attendances),
        tasks_by_employee: task_ranking(employees, reports),
        monthly_comparison: monthly_comparison(attendances, reports, today),
    }
}

pub fn attendance_rate(
    from: NaiveDate,
    to: NaiveDate,
    employee_count: usize,
    attendances: &[AttendanceRecord],
) -> f64 {
    let expected = employee_count as i64 * days_in_range(from, to);
    if expected <= 0 {
        return 0.0;
    }

    let arrived = attendances
        .iter()
        .filter(|record| record.has_arrived())
        .count();

    arrived as f64 / expected as f64 * 100.0
}

/// Mean productivity score over reports whose attendance is in the snapshot;
/// 0 with no qualifying report.
pub fn average_productivity(
    attendances: &[AttendanceRecord],
    reports: &[DailyReport],
) -> f64 {
    let by_id: HashMap<i64, &AttendanceRecord> = attendances
        .iter()
        .map(|record| (record.id, record))
        .collect();

    let scores = reports
        .iter()
        .filter_map(|report| {
            by_id
                .get(&report.attendance_id)
                .map(|attendance| productivity_score(report.tasks.len(), attendance.late_minutes))
        })
        .collect::<Vec<_>>();

    if scores.is_empty() {
        return 0.0;
    }

    scores.iter().sum::<i64>() as f64 / scores.len() as f64
}

/// One point per calendar day in range; days with no data contribute a zero
/// count rather than a missing point.
pub fn attendance_trend(
    from: NaiveDate,
    to: NaiveDate,
    employee_count: usize,
    attendances: &[AttendanceRecord],
) -> Vec<AttendancePoint> {
    each_day(from, to)
        .map(|date| AttendancePoint {
            date,
            present: attendances
                .iter()
                .filter(|record| record.date == date && record.has_arrived())
                .count(),
            total: employee_count,
        })
        .collect()
}

pub fn punctuality_trend(
    from: NaiveDate,
    to: NaiveDate,
    attendances: &[AttendanceRecord],
) -> Vec<PunctualityPoint> {
    each_day(from, to)
        .map(|date| {
            let arrived = attendances
                .iter()
                .filter(|record| record.date == date && record.has_arrived())
                .collect::<Vec<_>>();

            PunctualityPoint {
                date,
                on_time: arrived.iter().filter(|record| record.late_minutes == 0).count(),
                late: arrived.iter().filter(|record| record.late_minutes > 0).count(),
            }
        })
        .collect()
}

/// Descending by accrued penalty; employees with nothing to pay are left out.
/// Ties keep roster order (the sort is stable).
pub fn penalty_ranking(
    employees: &[Employee],
    attendances: &[AttendanceRecord],
) -> Vec<PenaltyRank> {
    let mut totals: HashMap<i64, i64> = HashMap::new();
    for record in attendances {
        *totals.entry(record.employee_id).or_insert(0) += record.penalty_amount;
    }

    let mut ranking = employees
        .iter()
        .filter_map(|employee| {
            let amount = totals.get(&employee.id).copied().unwrap_or(0);
            (amount > 0).then(|| PenaltyRank {
                employee_id: employee.id,
                name: employee.name.clone(),
                amount,
            })
        })
        .collect::<Vec<_>>();

    ranking.sort_by(|left, right| right.amount.cmp(&left.amount));
    ranking
}

/// Descending by task volume. Unlike the penalty ranking, zero totals stay
/// in: an employee who filed nothing is a signal in itself.
pub fn task_ranking(employees: &[Employee], reports: &[DailyReport]) -> Vec<TaskRank> {
    let mut totals: HashMap<i64, usize> = HashMap::new();
    for report in reports {
        *totals.entry(report.employee_id).or_insert(0) += report.tasks.len();
    }

    let mut ranking = employees
        .iter()
        .map(|employee| TaskRank {
            employee_id: employee.id,
            name: employee.name.clone(),
            tasks: totals.get(&employee.id).copied().unwrap_or(0),
        })
        .collect::<Vec<_>>();

    ranking.sort_by(|left, right| right.tasks.cmp(&left.tasks));
    ranking
}

/// Trailing months anchored to `today`, oldest first, windowed by stepping
/// back 30 days at a time and snapping to month bounds. The per-month
/// attendance rate is relative to that month's record count, and the
/// direction flags compare each entry with the previous one by sign.
pub fn monthly_comparison(
    attendances: &[AttendanceRecord],
    reports: &[DailyReport],
    today: NaiveDate,
) -> Vec<MonthlyPoint> {
    let mut points = (0..MONTHLY_COMPARISON_MONTHS)
        .rev()
        .map(|step| {
            let anchor = today - Duration::days(step as i64 * 30);
            let (first, last) = month_bounds(anchor);

            let month_attendances = attendances
                .iter()
                .filter(|record| record.date >= first && record.date <= last)
                .collect::<Vec<_>>();
            let month_reports = reports
                .iter()
                .filter(|report| report.date >= first && report.date <= last)
                .collect::<Vec<_>>();

            let rate = if month_attendances.is_empty() {
                0.0
            } else {
                let arrived = month_attendances
                    .iter()
                    .filter(|record| record.has_arrived())
                    .count();
                arrived as f64 / month_attendances.len() as f64 * 100.0
            };

            let average_tasks = if month_reports.is_empty() {
                0.0
            } else {
                let total: usize = month_reports.iter().map(|report| report.tasks.len()).sum();
                (total as f64 / month_reports.len() as f64 * 10.0).round() / 10.0
            };

            MonthlyPoint {
                month: anchor.format("%b %Y").to_string(),
                attendance_rate: rate.round() as i64,
                average_tasks,
                attendance_direction: TrendDirection::Flat,
                productivity_direction: TrendDirection::Flat,
            }
        })
        .collect::<Vec<_>>();

    for index in 1..points.len() {
        let previous_rate = points[index - 1].attendance_rate;
        let previous_tasks = points[index - 1].average_tasks;
        let point = &mut points[index];
        point.attendance_direction = direction(point.attendance_rate as f64 - previous_rate as f64);
        point.productivity_direction = direction(point.average_tasks - previous_tasks);
    }

    points
}

fn direction(delta: f64) -> TrendDirection {
    if delta > 0.0 {
        TrendDirection::Up
    } else if delta < 0.0 {
        TrendDirection::Down
    } else {
        TrendDirection::Flat
    }
}

fn days_in_range(from: NaiveDate, to: NaiveDate) -> i64 {
    if from > to {
        return 0;
    }
    (to - from).num_days() + 1
}

fn each_day(from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    from.iter_days().take_while(move |date| *date <= to)
}

fn month_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = date.with_day(1).unwrap_or(date);
    let next_month = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };

    let last = next_month
        .map(|next| next - Duration::days(1))
        .unwrap_or(date);

    (first, last)
}
