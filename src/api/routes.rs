use crate::clock;
use crate::config::Config;
use crate::db::Database;
use crate::engine;
use crate::engine::stats::Statistics;
use crate::error::EngineError;
use crate::export::{self, ExportFormat, ExportKind};
use crate::model::{
    AttendanceRecord, DailyReport, Employee, NewEmployee, PenaltyPolicy, PenaltyUnit, Role,
};
use crate::notify::{self, LogSink};
use anyhow::Context;
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{Datelike, Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<Config>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/status", get(status))
        .route("/api/v1/attendance/punch-in", post(punch_in))
        .route("/api/v1/attendance/punch-out", post(punch_out))
        .route("/api/v1/attendance/:id/validation", put(validation_put))
        .route("/api/v1/attendance", get(attendance_list))
        .route("/api/v1/report", post(report_post))
        .route("/api/v1/report/today", get(report_today))
        .route("/api/v1/stats", get(stats_get))
        .route("/api/v1/employees", get(employees_get).post(employees_post))
        .route("/api/v1/policy", get(policy_get).put(policy_put))
        .route("/api/v1/verification/send", post(verification_send))
        .route("/api/v1/verification/confirm", post(verification_confirm))
        .route("/api/v1/export/:kind", get(export_get))
        .with_state(state)
}

/// Caller identity taken from request headers. Authentication proper lives in
/// the reverse proxy in front of this service; the headers are trusted here.
#[derive(Debug, Clone)]
pub struct Actor {
    pub employee_id: i64,
    pub company_id: String,
    pub role: Role,
}

impl Actor {
    fn require_admin(&self) -> Result<(), ApiError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "This operation requires the admin role".to_string(),
            ))
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let employee_id = header_value(parts, "x-employee-id")?
            .parse::<i64>()
            .map_err(|_| ApiError::BadRequest("x-employee-id must be an integer".to_string()))?;
        let company_id = header_value(parts, "x-company-id")?;
        let role = Role::parse(&header_value(parts, "x-role")?)
            .ok_or_else(|| ApiError::BadRequest("x-role must be admin or employee".to_string()))?;

        Ok(Actor {
            employee_id,
            company_id,
            role,
        })
    }
}

fn header_value(parts: &Parts, name: &str) -> Result<String, ApiError> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
        .ok_or_else(|| ApiError::BadRequest(format!("Missing {name} header")))
}

#[derive(Debug, Deserialize)]
struct RangeQuery {
    from: Option<String>,
    to: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExportQuery {
    from: Option<String>,
    to: Option<String>,
    format: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ValidationPayload {
    validated: bool,
}

#[derive(Debug, Deserialize)]
struct ReportPayload {
    tasks: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct NewEmployeePayload {
    name: String,
    email: String,
    role: Option<String>,
    work_start_time: Option<String>,
    work_end_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PolicyPayload {
    work_start_time: String,
    work_end_time: String,
    penalty_per_hour: i64,
    penalty_unit: String,
}

#[derive(Debug, Deserialize)]
struct VerificationSendPayload {
    email: String,
}

#[derive(Debug, Deserialize)]
struct VerificationConfirmPayload {
    email: String,
    code: String,
}

#[derive(Debug, Serialize)]
struct AttendancePayload {
    from: String,
    to: String,
    count: usize,
    records: Vec<AttendanceRecord>,
}

#[derive(Debug, Serialize)]
struct StatusPayload {
    company_id: String,
    employees: i64,
    present_today: usize,
    late_today: usize,
    pending_validations: usize,
    month_penalties: i64,
    latest_attendance_date: Option<String>,
    api_port: u16,
}

async fn status(State(state): State<ApiState>, actor: Actor) -> ApiResult<Json<StatusPayload>> {
    let database = Database::open(&state.config.db_path)?;
    let today = Local::now().date_naive();
    let month_start = NaiveDate::from_ymd_opt(today.year(), today.month(), 1)
        .context("Failed to compute month start")?;

    let today_records = database.attendances_between(&actor.company_id, today, today)?;
    let month_records = database.attendances_between(&actor.company_id, month_start, today)?;

    let payload = StatusPayload {
        company_id: actor.company_id.clone(),
        employees: database.employee_count(&actor.company_id)?,
        present_today: today_records.iter().filter(|r| r.has_arrived()).count(),
        late_today: today_records.iter().filter(|r| r.is_late()).count(),
        pending_validations: month_records
            .iter()
            .filter(|r| r.has_arrived() && !r.arrival_validated)
            .count(),
        month_penalties: month_records.iter().map(|r| r.penalty_amount).sum(),
        latest_attendance_date: database
            .latest_attendance_date(&actor.company_id)?
            .map(clock::format_date),
        api_port: state.config.api_port,
    };

    Ok(Json(payload))
}

async fn punch_in(
    State(state): State<ApiState>,
    actor: Actor,
) -> ApiResult<Json<AttendanceRecord>> {
    let database = Database::open(&state.config.db_path)?;
    let employee = load_employee(&database, &actor)?;
    let policy = database
        .policy_for_company(&actor.company_id)?
        .unwrap_or_else(|| PenaltyPolicy::fallback(&actor.company_id));

    let now = Local::now();
    let record = engine::attendance::punch_in(
        &database,
        &employee,
        &policy,
        now.date_naive(),
        now.time(),
    )?;

    Ok(Json(record))
}

async fn punch_out(
    State(state): State<ApiState>,
    actor: Actor,
) -> ApiResult<Json<AttendanceRecord>> {
    let database = Database::open(&state.config.db_path)?;
    let employee = load_employee(&database, &actor)?;

    let now = Local::now();
    let record =
        engine::attendance::punch_out(&database, employee.id, now.date_naive(), now.time())?;

    Ok(Json(record))
}

async fn validation_put(
    State(state): State<ApiState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(payload): Json<ValidationPayload>,
) -> ApiResult<Json<AttendanceRecord>> {
    actor.require_admin()?;

    let database = Database::open(&state.config.db_path)?;
    let record = engine::attendance::set_validation(&database, id, payload.validated)?;

    Ok(Json(record))
}

async fn attendance_list(
    State(state): State<ApiState>,
    actor: Actor,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<AttendancePayload>> {
    let (from, to) = resolve_range(&query)?;

    let database = Database::open(&state.config.db_path)?;
    let mut records = database.attendances_between(&actor.company_id, from, to)?;
    if actor.role != Role::Admin {
        records.retain(|record| record.employee_id == actor.employee_id);
    }

    Ok(Json(AttendancePayload {
        from: clock::format_date(from),
        to: clock::format_date(to),
        count: records.len(),
        records,
    }))
}

async fn report_post(
    State(state): State<ApiState>,
    actor: Actor,
    Json(payload): Json<ReportPayload>,
) -> ApiResult<Json<DailyReport>> {
    let database = Database::open(&state.config.db_path)?;
    let employee = load_employee(&database, &actor)?;

    let now = Local::now();
    let report = engine::report::submit_report(
        &database,
        &employee,
        now.date_naive(),
        payload.tasks,
        now.time(),
    )?;

    Ok(Json(report))
}

async fn report_today(State(state): State<ApiState>, actor: Actor) -> ApiResult<Json<DailyReport>> {
    let database = Database::open(&state.config.db_path)?;
    let today = Local::now().date_naive();

    let attendance = database
        .attendance_for(actor.employee_id, today)?
        .ok_or_else(|| ApiError::NotFound("No attendance record for today".to_string()))?;
    let report = database
        .report_for_attendance(attendance.id)?
        .ok_or_else(|| ApiError::NotFound("No report submitted today".to_string()))?;

    Ok(Json(report))
}

async fn stats_get(
    State(state): State<ApiState>,
    actor: Actor,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<Statistics>> {
    actor.require_admin()?;

    let today = Local::now().date_naive();
    let (from, to) = resolve_range(&query)?;

    let database = Database::open(&state.config.db_path)?;
    let statistics = engine::load_statistics(&database, &actor.company_id, from, to, today)?;

    Ok(Json(statistics))
}

async fn employees_get(
    State(state): State<ApiState>,
    actor: Actor,
) -> ApiResult<Json<Vec<Employee>>> {
    actor.require_admin()?;

    let database = Database::open(&state.config.db_path)?;
    let employees = database.employees_for_company(&actor.company_id)?;

    Ok(Json(employees))
}

async fn employees_post(
    State(state): State<ApiState>,
    actor: Actor,
    Json(payload): Json<NewEmployeePayload>,
) -> ApiResult<Json<Employee>> {
    actor.require_admin()?;

    let role = match payload.role.as_deref() {
        Some(raw) => Role::parse(raw)
            .ok_or_else(|| ApiError::BadRequest("role must be admin or employee".to_string()))?,
        None => Role::Employee,
    };
    let fallback = PenaltyPolicy::fallback(&actor.company_id);
    let work_start_time = match payload.work_start_time.as_deref() {
        Some(raw) => clock::parse_wall_clock(raw)?,
        None => fallback.work_start_time,
    };
    let work_end_time = match payload.work_end_time.as_deref() {
        Some(raw) => clock::parse_wall_clock(raw)?,
        None => fallback.work_end_time,
    };

    let database = Database::open(&state.config.db_path)?;
    let employee = database.insert_employee(
        &NewEmployee {
            company_id: actor.company_id.clone(),
            name: payload.name.trim().to_string(),
            email: payload.email.trim().to_string(),
            role,
            work_start_time,
            work_end_time,
        },
        Local::now().naive_local(),
    )?;

    Ok(Json(employee))
}

async fn policy_get(State(state): State<ApiState>, actor: Actor) -> ApiResult<Json<PenaltyPolicy>> {
    let database = Database::open(&state.config.db_path)?;
    let policy = database
        .policy_for_company(&actor.company_id)?
        .unwrap_or_else(|| PenaltyPolicy::fallback(&actor.company_id));

    Ok(Json(policy))
}

async fn policy_put(
    State(state): State<ApiState>,
    actor: Actor,
    Json(payload): Json<PolicyPayload>,
) -> ApiResult<Json<PenaltyPolicy>> {
    actor.require_admin()?;

    let penalty_unit = PenaltyUnit::parse(&payload.penalty_unit).ok_or_else(|| {
        ApiError::BadRequest("penalty_unit must be minute, hour or day".to_string())
    })?;
    let policy = PenaltyPolicy {
        company_id: actor.company_id.clone(),
        work_start_time: clock::parse_wall_clock(&payload.work_start_time)?,
        work_end_time: clock::parse_wall_clock(&payload.work_end_time)?,
        penalty_per_hour: payload.penalty_per_hour,
        penalty_unit,
    };

    let database = Database::open(&state.config.db_path)?;
    database.upsert_policy(&policy)?;

    Ok(Json(policy))
}

async fn verification_send(
    State(state): State<ApiState>,
    _actor: Actor,
    Json(payload): Json<VerificationSendPayload>,
) -> ApiResult<Json<Value>> {
    let database = Database::open(&state.config.db_path)?;
    notify::issue_verification(
        &database,
        &LogSink,
        payload.email.trim(),
        state.config.verification_ttl_minutes,
        Local::now().naive_local(),
    )?;

    Ok(Json(json!({ "sent": true })))
}

async fn verification_confirm(
    State(state): State<ApiState>,
    _actor: Actor,
    Json(payload): Json<VerificationConfirmPayload>,
) -> ApiResult<Json<Value>> {
    let database = Database::open(&state.config.db_path)?;
    notify::confirm_verification(
        &database,
        payload.email.trim(),
        payload.code.trim(),
        Local::now().naive_local(),
    )?;

    Ok(Json(json!({ "verified": true })))
}

async fn export_get(
    State(state): State<ApiState>,
    actor: Actor,
    Path(kind): Path<String>,
    Query(query): Query<ExportQuery>,
) -> ApiResult<Response> {
    actor.require_admin()?;

    let kind = ExportKind::parse(&kind).ok_or_else(|| {
        ApiError::BadRequest("kind must be attendance, employees, reports or penalties".to_string())
    })?;
    let format = match query.format.as_deref() {
        Some(raw) => ExportFormat::parse(raw)
            .ok_or_else(|| ApiError::BadRequest("format must be csv or json".to_string()))?,
        None => ExportFormat::Csv,
    };
    let (from, to) = resolve_range(&RangeQuery {
        from: query.from.clone(),
        to: query.to.clone(),
    })?;

    let database = Database::open(&state.config.db_path)?;
    let dataset = export::build_dataset(&database, kind, &actor.company_id, from, to)?;
    let content = dataset.render(format)?;

    let filename = format!(
        "{}_{}_{}.{}",
        kind.as_str(),
        clock::format_date(from),
        clock::format_date(to),
        format.extension()
    );
    let mut response = Response::new(content.into_response().into_body());
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(format.content_type()),
    );
    response.headers_mut().insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))?,
    );

    Ok(response)
}

fn load_employee(database: &Database, actor: &Actor) -> Result<Employee, ApiError> {
    let employee = database
        .employee_by_id(actor.employee_id)?
        .ok_or(EngineError::EmployeeNotFound(actor.employee_id))?;

    if employee.company_id != actor.company_id {
        return Err(ApiError::Forbidden(
            "Employee does not belong to this company".to_string(),
        ));
    }

    Ok(employee)
}

/// Missing bounds fall back to the trailing 30 days ending today.
fn resolve_range(query: &RangeQuery) -> Result<(NaiveDate, NaiveDate), ApiError> {
    let today = Local::now().date_naive();
    let to = match query.to.as_deref() {
        Some(raw) => clock::parse_date(raw)?,
        None => today,
    };
    let from = match query.from.as_deref() {
        Some(raw) => clock::parse_date(raw)?,
        None => to - Duration::days(29),
    };

    if from > to {
        return Err(ApiError::BadRequest(
            "from must not be after to".to_string(),
        ));
    }

    Ok((from, to))
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Internal(anyhow::Error),
}

impl From<EngineError> for ApiError {
    fn from(value: EngineError) -> Self {
        match value {
            EngineError::DuplicatePunch { .. } | EngineError::AlreadyDeparted { .. } => {
                Self::Conflict(value.to_string())
            }
            EngineError::NoArrival { .. }
            | EngineError::NoArrivalToValidate { .. }
            | EngineError::NoAttendanceRecord { .. }
            | EngineError::EmptyTaskList
            | EngineError::InvalidTimeFormat(_)
            | EngineError::InvalidVerificationCode => Self::BadRequest(value.to_string()),
            EngineError::RecordNotFound(_) | EngineError::EmployeeNotFound(_) => {
                Self::NotFound(value.to_string())
            }
            EngineError::TaskEncoding(_) | EngineError::Store(_) => Self::Internal(value.into()),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value)
    }
}

impl From<axum::http::header::InvalidHeaderValue> for ApiError {
    fn from(value: axum::http::header::InvalidHeaderValue) -> Self {
        Self::Internal(value.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Forbidden(message) => {
                (StatusCode::FORBIDDEN, Json(json!({ "error": message }))).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Conflict(message) => {
                (StatusCode::CONFLICT, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Internal(error) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": error.to_string() })),
            )
                .into_response(),
        }
    }
}
