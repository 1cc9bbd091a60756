//! Payroll API Handlers
//!
//! REST endpoints over the run lifecycle and the employee registry. Errors
//! surface as the closed code set {invalid_state, not_found, conflict,
//! validation_error, internal}.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::employee::{
    CreateEmployeeRequest, Employee, EmployeeError, EmployeeService, Jurisdiction, PayFrequency,
    UpdateEmployeeRequest,
};

use super::models::*;
use super::service::{PayrollError, PayrollService};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub payroll: PayrollService,
    pub employees: EmployeeService,
}

/// API Response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub code: Option<&'static str>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }

    pub fn failure(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            code: Some(code),
        }
    }
}

fn status_for(code: &str) -> StatusCode {
    match code {
        "not_found" => StatusCode::NOT_FOUND,
        "conflict" | "invalid_state" => StatusCode::CONFLICT,
        "validation_error" => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn payroll_failure<T: Serialize>(e: PayrollError) -> (StatusCode, Json<ApiResponse<T>>) {
    let code = e.code();
    (status_for(code), Json(ApiResponse::failure(code, e.to_string())))
}

fn employee_failure<T: Serialize>(e: EmployeeError) -> (StatusCode, Json<ApiResponse<T>>) {
    payroll_failure(PayrollError::from(e))
}

// ── Payroll runs ─────────────────────────────────────────────────────────

/// POST /api/v1/payroll/runs
pub async fn create_or_get_run(
    State(state): State<AppState>,
    Json(request): Json<CreateRunRequest>,
) -> impl IntoResponse {
    match state.payroll.create_or_get_run(request).await {
        Ok(run) => (StatusCode::CREATED, Json(ApiResponse::success(run))),
        Err(e) => payroll_failure(e),
    }
}

/// GET /api/v1/payroll/runs
pub async fn list_runs(
    State(state): State<AppState>,
    Query(filter): Query<RunFilter>,
) -> impl IntoResponse {
    match state.payroll.list_runs(filter).await {
        Ok(runs) => (StatusCode::OK, Json(ApiResponse::success(runs))),
        Err(e) => payroll_failure(e),
    }
}

/// GET /api/v1/payroll/runs/:id
pub async fn get_run(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match state.payroll.get_run(id).await {
        Ok(run) => (StatusCode::OK, Json(ApiResponse::success(run))),
        Err(e) => payroll_failure(e),
    }
}

/// DELETE /api/v1/payroll/runs/:id
pub async fn delete_run(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match state.payroll.delete_run(id).await {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::success(serde_json::json!({"deleted": id})))),
        Err(e) => payroll_failure(e),
    }
}

/// GET /api/v1/payroll/runs/:id/records
pub async fn get_run_records(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match state.payroll.records_for_run(id).await {
        Ok(records) => (StatusCode::OK, Json(ApiResponse::success(records))),
        Err(e) => payroll_failure(e),
    }
}

/// POST /api/v1/payroll/runs/:id/sync
pub async fn sync_employees(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match state.payroll.sync_employees(id).await {
        Ok(added) => (StatusCode::OK, Json(ApiResponse::success(added))),
        Err(e) => payroll_failure(e),
    }
}

/// POST /api/v1/payroll/runs/:id/employees/:employee_id
pub async fn add_employee(
    State(state): State<AppState>,
    Path((id, employee_id)): Path<(Uuid, Uuid)>,
) -> impl IntoResponse {
    match state.payroll.add_employee(id, employee_id).await {
        Ok(record) => (StatusCode::CREATED, Json(ApiResponse::success(record))),
        Err(e) => payroll_failure(e),
    }
}

/// DELETE /api/v1/payroll/runs/:id/employees/:employee_id
pub async fn remove_employee(
    State(state): State<AppState>,
    Path((id, employee_id)): Path<(Uuid, Uuid)>,
) -> impl IntoResponse {
    match state.payroll.remove_employee(id, employee_id).await {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::success(serde_json::json!({"removed": employee_id})))),
        Err(e) => payroll_failure(e),
    }
}

/// PATCH /api/v1/payroll/records/:id
pub async fn update_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<RecordPatch>,
) -> impl IntoResponse {
    match state.payroll.update_record(id, patch).await {
        Ok(record) => (StatusCode::OK, Json(ApiResponse::success(record))),
        Err(e) => payroll_failure(e),
    }
}

/// POST /api/v1/payroll/runs/:id/recalculate
pub async fn recalculate(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match state.payroll.recalculate(id).await {
        Ok((run, records)) => (
            StatusCode::OK,
            Json(ApiResponse::success(RecalculationResponse { run, records })),
        ),
        Err(e) => payroll_failure(e),
    }
}

/// POST /api/v1/payroll/runs/:id/finalize
pub async fn finalize(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match state.payroll.finalize(id).await {
        Ok(run) => (StatusCode::OK, Json(ApiResponse::success(run))),
        Err(e) => payroll_failure(e),
    }
}

/// POST /api/v1/payroll/runs/:id/approve
pub async fn approve(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ApproveRequest>,
) -> impl IntoResponse {
    match state.payroll.approve(id, request.approved_by).await {
        Ok(run) => (StatusCode::OK, Json(ApiResponse::success(run))),
        Err(e) => payroll_failure(e),
    }
}

/// POST /api/v1/payroll/runs/:id/pay
pub async fn mark_paid(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match state.payroll.mark_paid(id).await {
        Ok(run) => (StatusCode::OK, Json(ApiResponse::success(run))),
        Err(e) => payroll_failure(e),
    }
}

/// POST /api/v1/payroll/runs/:id/cancel
pub async fn cancel(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match state.payroll.cancel(id).await {
        Ok(run) => (StatusCode::OK, Json(ApiResponse::success(run))),
        Err(e) => payroll_failure(e),
    }
}

/// GET /api/v1/payroll/preview
pub async fn tax_preview(
    State(state): State<AppState>,
    Query(query): Query<TaxPreviewQuery>,
) -> impl IntoResponse {
    let pay_date = query
        .pay_date
        .unwrap_or_else(|| chrono::Utc::now().date_naive());
    match state
        .payroll
        .calculate_tax_preview(query.jurisdiction, query.pay_frequency, query.gross, pay_date)
    {
        Ok(result) => (StatusCode::OK, Json(ApiResponse::success(result))),
        Err(e) => payroll_failure(e),
    }
}

// ── Employees ────────────────────────────────────────────────────────────

/// POST /api/v1/employees
pub async fn create_employee(
    State(state): State<AppState>,
    Json(request): Json<CreateEmployeeRequest>,
) -> impl IntoResponse {
    match state.employees.create(request) {
        Ok(employee) => (StatusCode::CREATED, Json(ApiResponse::success(employee))),
        Err(e) => employee_failure(e),
    }
}

/// GET /api/v1/employees
pub async fn list_employees(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(ApiResponse::success(state.employees.list())))
}

/// GET /api/v1/employees/:id
pub async fn get_employee(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match state.employees.get(id) {
        Ok(employee) => (StatusCode::OK, Json(ApiResponse::success(employee))),
        Err(e) => employee_failure::<Employee>(e),
    }
}

/// PUT /api/v1/employees/:id
pub async fn update_employee(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<UpdateEmployeeRequest>,
) -> impl IntoResponse {
    match state.employees.update(id, patch) {
        Ok(employee) => (StatusCode::OK, Json(ApiResponse::success(employee))),
        Err(e) => employee_failure(e),
    }
}

/// POST /api/v1/employees/:id/terminate
pub async fn terminate_employee(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<TerminateRequest>,
) -> impl IntoResponse {
    match state.employees.terminate(id, request.termination_date) {
        Ok(employee) => (StatusCode::OK, Json(ApiResponse::success(employee))),
        Err(e) => employee_failure(e),
    }
}

/// POST /api/v1/pay-groups
pub async fn create_pay_group(
    State(state): State<AppState>,
    Json(request): Json<CreatePayGroupRequest>,
) -> impl IntoResponse {
    let group = state
        .employees
        .create_pay_group(request.name, request.pay_frequency, request.next_pay_date);
    (StatusCode::CREATED, Json(ApiResponse::success(group)))
}

// ── Request/response shapes ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub approved_by: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct TerminateRequest {
    pub termination_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct CreatePayGroupRequest {
    pub name: String,
    pub pay_frequency: PayFrequency,
    pub next_pay_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct TaxPreviewQuery {
    pub gross: Decimal,
    pub jurisdiction: Jurisdiction,
    pub pay_frequency: PayFrequency,
    pub pay_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct RecalculationResponse {
    pub run: PayrollRun,
    pub records: Vec<PayrollRecord>,
}
