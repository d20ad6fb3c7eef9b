pub const CREATE_EMPLOYEES: &str = r#"
CREATE TABLE IF NOT EXISTS employees (
  id              INTEGER PRIMARY KEY AUTOINCREMENT,
  company_id      TEXT NOT NULL,
  name            TEXT NOT NULL,
  email           TEXT NOT NULL,
  role            TEXT NOT NULL DEFAULT 'employee',
  work_start_time TEXT NOT NULL DEFAULT '08:00:00',
  work_end_time   TEXT NOT NULL DEFAULT '17:00:00',
  email_verified  INTEGER NOT NULL DEFAULT 0,
  created_at      TEXT NOT NULL
);
"#;

pub const CREATE_ATTENDANCES: &str = r#"
CREATE TABLE IF NOT EXISTS attendances (
  id                INTEGER PRIMARY KEY AUTOINCREMENT,
  employee_id       INTEGER NOT NULL REFERENCES employees(id),
  company_id        TEXT NOT NULL,
  date              TEXT NOT NULL,
  arrival_time      TEXT,
  departure_time    TEXT,
  arrival_validated INTEGER NOT NULL DEFAULT 0,
  late_minutes      INTEGER NOT NULL DEFAULT 0,
  penalty_amount    INTEGER NOT NULL DEFAULT 0,
  UNIQUE(employee_id, date)
);
"#;

pub const CREATE_DAILY_REPORTS: &str = r#"
CREATE TABLE IF NOT EXISTS daily_reports (
  id            INTEGER PRIMARY KEY AUTOINCREMENT,
  employee_id   INTEGER NOT NULL REFERENCES employees(id),
  company_id    TEXT NOT NULL,
  attendance_id INTEGER NOT NULL UNIQUE REFERENCES attendances(id),
  date          TEXT NOT NULL,
  tasks         TEXT NOT NULL,
  submitted_at  TEXT NOT NULL
);
"#;

pub const CREATE_COMPANY_POLICIES: &str = r#"
CREATE TABLE IF NOT EXISTS company_policies (
  id               INTEGER PRIMARY KEY AUTOINCREMENT,
  company_id       TEXT NOT NULL UNIQUE,
  work_start_time  TEXT NOT NULL,
  work_end_time    TEXT NOT NULL,
  penalty_per_hour INTEGER NOT NULL DEFAULT 0,
  penalty_unit     TEXT NOT NULL DEFAULT 'hour'
);
"#;

pub const CREATE_EMAIL_VERIFICATIONS: &str = r#"
CREATE TABLE IF NOT EXISTS email_verifications (
  id         INTEGER PRIMARY KEY AUTOINCREMENT,
  email      TEXT NOT NULL,
  code       TEXT NOT NULL,
  expires_at TEXT NOT NULL,
  verified   INTEGER NOT NULL DEFAULT 0
);
"#;

pub const INDEX_EMPLOYEES_COMPANY: &str =
    "CREATE INDEX IF NOT EXISTS idx_employees_company ON employees(company_id);";

pub const INDEX_ATTENDANCES_COMPANY_DATE: &str =
    "CREATE INDEX IF NOT EXISTS idx_attendances_company_date ON attendances(company_id, date);";

pub const INDEX_DAILY_REPORTS_COMPANY_DATE: &str =
    "CREATE INDEX IF NOT EXISTS idx_daily_reports_company_date ON daily_reports(company_id, date);";

pub const INDEX_EMAIL_VERIFICATIONS_EMAIL: &str =
    "CREATE INDEX IF NOT EXISTS idx_email_verifications_email ON email_verifications(email);";

pub fn schema_statements() -> Vec<&'static str> {
    vec![
        CREATE_EMPLOYEES,
        CREATE_ATTENDANCES,
        CREATE_DAILY_REPORTS,
        CREATE_COMPANY_POLICIES,
        CREATE_EMAIL_VERIFICATIONS,
        INDEX_EMPLOYEES_COMPANY,
        INDEX_ATTENDANCES_COMPANY_DATE,
        INDEX_DAILY_REPORTS_COMPANY_DATE,
        INDEX_EMAIL_VERIFICATIONS_EMAIL,
    ]
}
