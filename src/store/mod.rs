//! Snapshot & Result Store
//!
//! The persistence surface the run lifecycle writes through. Read-mostly:
//! downstream paystub generation and aggregate reports consume records
//! through the queries here and never mutate them.

pub mod memory;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::payroll::models::{PayrollRecord, PayrollRun, RunFilter};
use crate::tax::YtdAccumulator;

/// Store failures. `Duplicate` carries the unique-constraint pair;
/// `Unavailable` propagates backend outages unchanged.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("Run not found: {0}")]
    RunNotFound(Uuid),

    #[error("Record not found: {0}")]
    RecordNotFound(Uuid),

    #[error("Record already exists for run {run_id}, employee {employee_id}")]
    Duplicate { run_id: Uuid, employee_id: Uuid },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Transactional operations over runs and records.
///
/// Callers serialize writes per run (the service holds a per-run lock);
/// implementations only guarantee that each operation commits fully or not
/// at all.
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn insert_run(&self, run: PayrollRun) -> Result<(), StoreError>;

    async fn update_run(&self, run: PayrollRun) -> Result<(), StoreError>;

    async fn get_run(&self, id: Uuid) -> Result<Option<PayrollRun>, StoreError>;

    async fn find_run_by_pay_date(&self, pay_date: NaiveDate)
        -> Result<Option<PayrollRun>, StoreError>;

    async fn list_runs(&self, filter: RunFilter) -> Result<Vec<PayrollRun>, StoreError>;

    async fn delete_run(&self, id: Uuid) -> Result<(), StoreError>;

    /// Enforces the (run_id, employee_id) unique constraint.
    async fn insert_record(&self, record: PayrollRecord) -> Result<(), StoreError>;

    async fn update_record(&self, record: PayrollRecord) -> Result<(), StoreError>;

    async fn delete_record(&self, id: Uuid) -> Result<(), StoreError>;

    async fn get_record(&self, id: Uuid) -> Result<Option<PayrollRecord>, StoreError>;

    async fn get_record_for_employee(
        &self,
        run_id: Uuid,
        employee_id: Uuid,
    ) -> Result<Option<PayrollRecord>, StoreError>;

    async fn records_for_run(&self, run_id: Uuid) -> Result<Vec<PayrollRecord>, StoreError>;

    /// Commit a recalculation: the updated run summary and every record,
    /// together. A failure leaves the previous state in place.
    async fn commit_recalculation(
        &self,
        run: PayrollRun,
        records: Vec<PayrollRecord>,
    ) -> Result<(), StoreError>;

    /// Sum the approved results for an employee's tax year, up to but not
    /// including `before_pay_date`. The only path by which past-period
    /// state reaches the engine.
    async fn get_prior_ytd(
        &self,
        employee_id: Uuid,
        tax_year: i32,
        before_pay_date: NaiveDate,
    ) -> Result<YtdAccumulator, StoreError>;
}

pub use memory::InMemoryStore;
