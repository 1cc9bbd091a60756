//! Maple Payroll - self-hosted Canadian payroll service

use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{Datelike, Utc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use maple_payroll::payroll::handlers::{self, AppState};
use maple_payroll::{Edition, EmployeeService, InMemoryStore, ParameterStore, PayrollService};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_dir =
        std::env::var("TAX_TABLES_DIR").unwrap_or_else(|_| "config/tax_tables".to_string());
    let params = Arc::new(ParameterStore::new(config_dir));

    // Fail fast on broken tables: load the current year's editions up front.
    let year = Utc::now().date_naive().year();
    for edition in [Edition::Jan, Edition::Jul] {
        if let Err(e) = params.load(year, edition) {
            tracing::warn!(year, edition = edition.as_str(), error = %e, "tax parameters unavailable");
        }
    }

    let employees = EmployeeService::new(params.clone());
    let store = Arc::new(InMemoryStore::new());
    let payroll = PayrollService::new(store, employees.clone(), params);
    let state = AppState { payroll, employees };

    let app = Router::new()
        .route("/health", get(|| async {
            Json(serde_json::json!({"status": "healthy", "service": "maple-payroll"}))
        }))
        .route("/api/v1/employees", get(handlers::list_employees).post(handlers::create_employee))
        .route("/api/v1/employees/:id", get(handlers::get_employee).put(handlers::update_employee))
        .route("/api/v1/employees/:id/terminate", post(handlers::terminate_employee))
        .route("/api/v1/pay-groups", post(handlers::create_pay_group))
        .route("/api/v1/payroll/runs", get(handlers::list_runs).post(handlers::create_or_get_run))
        .route("/api/v1/payroll/runs/:id", get(handlers::get_run).delete(handlers::delete_run))
        .route("/api/v1/payroll/runs/:id/records", get(handlers::get_run_records))
        .route("/api/v1/payroll/runs/:id/sync", post(handlers::sync_employees))
        .route(
            "/api/v1/payroll/runs/:id/employees/:employee_id",
            post(handlers::add_employee).delete(handlers::remove_employee),
        )
        .route("/api/v1/payroll/records/:id", patch(handlers::update_record))
        .route("/api/v1/payroll/runs/:id/recalculate", post(handlers::recalculate))
        .route("/api/v1/payroll/runs/:id/finalize", post(handlers::finalize))
        .route("/api/v1/payroll/runs/:id/approve", post(handlers::approve))
        .route("/api/v1/payroll/runs/:id/pay", post(handlers::mark_paid))
        .route("/api/v1/payroll/runs/:id/cancel", post(handlers::cancel))
        .route("/api/v1/payroll/preview", get(handlers::tax_preview))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "8083".to_string());
    tracing::info!("maple-payroll listening on 0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
