//! Row-oriented export boundary. The engine hands out flat records with
//! stable field names; CSV and JSON are the only renderings shipped here,
//! richer formats belong to downstream consumers.

use crate::clock;
use crate::db::Database;
use crate::error::EngineResult;
use crate::model::Employee;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Attendance,
    Employees,
    Reports,
    Penalties,
}

impl ExportKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "attendance" => Some(ExportKind::Attendance),
            "employees" => Some(ExportKind::Employees),
            "reports" => Some(ExportKind::Reports),
            "penalties" => Some(ExportKind::Penalties),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportKind::Attendance => "attendance",
            ExportKind::Employees => "employees",
            ExportKind::Reports => "reports",
            ExportKind::Penalties => "penalties",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "csv" => Some(ExportFormat::Csv),
            "json" => Some(ExportFormat::Json),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Json => "application/json; charset=utf-8",
        }
    }
}

/// Flat tabular dataset: a header row plus stringly rows in header order.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

impl Dataset {
    pub fn render(&self, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Csv => Ok(self.to_csv()),
            ExportFormat::Json => serde_json::to_string_pretty(&self.to_json())
                .context("Failed to serialize export JSON"),
        }
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        out.push_str(&csv_line(self.headers.iter().map(|header| header.to_string())));

        for row in &self.rows {
            out.push_str(&csv_line(row.iter().cloned()));
        }

        out
    }

    /// Array of flat key-value objects, one per row.
    pub fn to_json(&self) -> Value {
        let records = self
            .rows
            .iter()
            .map(|row| {
                let object = self
                    .headers
                    .iter()
                    .zip(row.iter())
                    .map(|(header, value)| (header.to_string(), json!(value)))
                    .collect::<Map<_, _>>();
                Value::Object(object)
            })
            .collect::<Vec<_>>();

        Value::Array(records)
    }
}

#[derive(Debug)]
pub struct SavedExport {
    pub csv_path: PathBuf,
    pub json_path: PathBuf,
}

pub fn build_dataset(
    database: &Database,
    kind: ExportKind,
    company_id: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> EngineResult<Dataset> {
    let employees = database.employees_for_company(company_id)?;
    let by_id: HashMap<i64, &Employee> = employees.iter().map(|e| (e.id, e)).collect();

    let dataset = match kind {
        ExportKind::Attendance => {
            let records = database.attendances_between(company_id, from, to)?;
            Dataset {
                headers: vec![
                    "date",
                    "employee",
                    "email",
                    "scheduled_start",
                    "arrival",
                    "scheduled_end",
                    "departure",
                    "late_minutes",
                    "penalty_amount",
                    "validated",
                ],
                rows: records
                    .iter()
                    .map(|record| {
                        let employee = by_id.get(&record.employee_id);
                        vec![
                            clock::format_date(record.date),
                            employee.map(|e| e.name.clone()).unwrap_or_default(),
                            employee.map(|e| e.email.clone()).unwrap_or_default(),
                            employee
                                .map(|e| clock::format_wall_clock(e.work_start_time))
                                .unwrap_or_default(),
                            record
                                .arrival_time
                                .map(clock::format_wall_clock)
                                .unwrap_or_default(),
                            employee
                                .map(|e| clock::format_wall_clock(e.work_end_time))
                                .unwrap_or_default(),
                            record
                                .departure_time
                                .map(clock::format_wall_clock)
                                .unwrap_or_default(),
                            record.late_minutes.to_string(),
                            record.penalty_amount.to_string(),
                            record.arrival_validated.to_string(),
                        ]
                    })
                    .collect(),
            }
        }
        ExportKind::Employees => Dataset {
            headers: vec![
                "name",
                "email",
                "role",
                "work_start_time",
                "work_end_time",
                "email_verified",
                "created_at",
            ],
            rows: employees
                .iter()
                .map(|employee| {
                    vec![
                        employee.name.clone(),
                        employee.email.clone(),
                        employee.role.as_str().to_string(),
                        clock::format_wall_clock(employee.work_start_time),
                        clock::format_wall_clock(employee.work_end_time),
                        employee.email_verified.to_string(),
                        employee.created_at.format("%Y-%m-%d %H:%M").to_string(),
                    ]
                })
                .collect(),
        },
        ExportKind::Reports => {
            let reports = database.reports_between(company_id, from, to)?;
            Dataset {
                headers: vec![
                    "date",
                    "employee",
                    "email",
                    "task_count",
                    "tasks",
                    "submitted_at",
                ],
                rows: reports
                    .iter()
                    .map(|report| {
                        let employee = by_id.get(&report.employee_id);
                        vec![
                            clock::format_date(report.date),
                            employee.map(|e| e.name.clone()).unwrap_or_default(),
                            employee.map(|e| e.email.clone()).unwrap_or_default(),
                            report.tasks.len().to_string(),
                            report.tasks.join(" | "),
                            clock::format_wall_clock(report.submitted_at),
                        ]
                    })
                    .collect(),
            }
        }
        ExportKind::Penalties => {
            let records = database.attendances_between(company_id, from, to)?;
            Dataset {
                headers: vec!["date", "employee", "email", "late_minutes", "penalty_amount"],
                rows: records
                    .iter()
                    .filter(|record| record.late_minutes > 0 || record.penalty_amount > 0)
                    .map(|record| {
                        let employee = by_id.get(&record.employee_id);
                        vec![
                            clock::format_date(record.date),
                            employee.map(|e| e.name.clone()).unwrap_or_default(),
                            employee.map(|e| e.email.clone()).unwrap_or_default(),
                            record.late_minutes.to_string(),
                            record.penalty_amount.to_string(),
                        ]
                    })
                    .collect(),
            }
        }
    };

    Ok(dataset)
}

pub fn save_export(
    dataset: &Dataset,
    kind: ExportKind,
    export_dir: &Path,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<SavedExport> {
    fs::create_dir_all(export_dir).with_context(|| {
        format!(
            "Failed to create export directory: {}",
            export_dir.display()
        )
    })?;

    let stem = format!(
        "{}_{}_{}",
        kind.as_str(),
        clock::format_date(from),
        clock::format_date(to)
    );
    let csv_path = export_dir.join(format!("{stem}.csv"));
    let json_path = export_dir.join(format!("{stem}.json"));

    fs::write(&csv_path, dataset.render(ExportFormat::Csv)?)
        .with_context(|| format!("Failed to write CSV export: {}", csv_path.display()))?;
    fs::write(&json_path, dataset.render(ExportFormat::Json)?)
        .with_context(|| format!("Failed to write JSON export: {}", json_path.display()))?;

    Ok(SavedExport {
        csv_path,
        json_path,
    })
}

fn csv_line(fields: impl Iterator<Item = String>) -> String {
    let quoted = fields
        .map(|field| format!("\"{}\"", field.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(",");

    format!("{quoted}\n")
}
