//! Payroll Service
//!
//! The run lifecycle state machine. Owns all mutation of runs and records;
//! the engine stays pure and the store only sees whole-state writes.
//! Mutations for one run are serialized by a per-run lock.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::employee::{Employee, EmployeeError, EmployeeService, Jurisdiction, PayFrequency};
use crate::params::{Edition, ParameterError, ParameterStore, Parameters};
use crate::store::{ResultStore, StoreError};
use crate::tax::{self, CalculationError, CalculationInput, CalculationResult};

use super::models::*;

/// Payroll lifecycle errors
#[derive(Debug, thiserror::Error)]
pub enum PayrollError {
    #[error("Payroll run not found: {0}")]
    RunNotFound(Uuid),

    #[error("Payroll record not found: {0}")]
    RecordNotFound(Uuid),

    #[error("Operation not allowed while run is {0}")]
    InvalidState(PayrollRunStatus),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Run has modified records pending recalculation: {0:?}")]
    ModifiedRecords(Vec<Uuid>),

    #[error("Run has records with invalid results: {0:?}")]
    InvalidRecords(Vec<Uuid>),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Employee(#[from] EmployeeError),

    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Calculation failed: {0}")]
    Calculation(#[from] CalculationError),
}

impl PayrollError {
    /// Closed error-code set exposed at the API boundary.
    pub fn code(&self) -> &'static str {
        match self {
            PayrollError::RunNotFound(_) | PayrollError::RecordNotFound(_) => "not_found",
            PayrollError::InvalidState(_) => "invalid_state",
            PayrollError::Conflict(_) => "conflict",
            PayrollError::ModifiedRecords(_)
            | PayrollError::InvalidRecords(_)
            | PayrollError::Validation(_) => "validation_error",
            PayrollError::Employee(EmployeeError::NotFound(_))
            | PayrollError::Employee(EmployeeError::PayGroupNotFound(_)) => "not_found",
            PayrollError::Employee(_) => "validation_error",
            PayrollError::Store(StoreError::Duplicate { .. }) => "conflict",
            PayrollError::Calculation(CalculationError::InvalidInput(_)) => "validation_error",
            PayrollError::Parameter(_)
            | PayrollError::Store(_)
            | PayrollError::Calculation(_) => "internal",
        }
    }
}

/// Payroll Service
#[derive(Clone)]
pub struct PayrollService {
    store: Arc<dyn ResultStore>,
    employees: EmployeeService,
    params: Arc<ParameterStore>,
    run_locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl PayrollService {
    pub fn new(
        store: Arc<dyn ResultStore>,
        employees: EmployeeService,
        params: Arc<ParameterStore>,
    ) -> Self {
        Self {
            store,
            employees,
            params,
            run_locks: Arc::new(DashMap::new()),
        }
    }

    /// Find the run for this pay date or create a draft seeded with every
    /// eligible employee (active members of pay groups due on the date).
    pub async fn create_or_get_run(&self, request: CreateRunRequest) -> Result<PayrollRun, PayrollError> {
        if request.period_end < request.period_start {
            return Err(PayrollError::Validation(
                "period_end must not precede period_start".to_string(),
            ));
        }
        if request.pay_date < request.period_end {
            return Err(PayrollError::Validation(
                "pay_date must not precede period_end".to_string(),
            ));
        }

        if let Some(existing) = self.store.find_run_by_pay_date(request.pay_date).await? {
            return Ok(existing);
        }

        let mut run = PayrollRun::new(request.period_start, request.period_end, request.pay_date);
        self.store.insert_run(run.clone()).await?;

        let lock = self.run_lock(run.id);
        let _guard = lock.lock().await;

        let eligible = self.employees.eligible_for_pay_date(run.pay_date);
        for employee in &eligible {
            let record = self.seed_record(&run, employee).await?;
            self.store.insert_record(record).await?;
        }

        run.total_employees = eligible.len() as i32;
        run.updated_at = Utc::now();
        self.store.update_run(run.clone()).await?;

        tracing::info!(run_id = %run.id, pay_date = %run.pay_date, employees = eligible.len(), "payroll run created");
        Ok(run)
    }

    /// Add records for newly-eligible employees. Never removes.
    pub async fn sync_employees(&self, run_id: Uuid) -> Result<Vec<PayrollRecord>, PayrollError> {
        let lock = self.run_lock(run_id);
        let _guard = lock.lock().await;

        let mut run = self.mutable_run(run_id).await?;
        let mut added = Vec::new();
        for employee in self.employees.eligible_for_pay_date(run.pay_date) {
            if self
                .store
                .get_record_for_employee(run_id, employee.id)
                .await?
                .is_some()
            {
                continue;
            }
            let record = self.seed_record(&run, &employee).await?;
            self.store.insert_record(record.clone()).await?;
            added.push(record);
        }

        if !added.is_empty() {
            run.total_employees += added.len() as i32;
            run.updated_at = Utc::now();
            self.store.update_run(run).await?;
        }
        Ok(added)
    }

    pub async fn add_employee(&self, run_id: Uuid, employee_id: Uuid) -> Result<PayrollRecord, PayrollError> {
        let lock = self.run_lock(run_id);
        let _guard = lock.lock().await;

        let mut run = self.mutable_run(run_id).await?;
        let employee = self.employees.get(employee_id)?;
        if !employee.is_active_on(run.pay_date) {
            return Err(PayrollError::Validation(format!(
                "employee {employee_id} is not active on {}",
                run.pay_date
            )));
        }

        let record = self.seed_record(&run, &employee).await?;
        match self.store.insert_record(record.clone()).await {
            Ok(()) => {}
            Err(StoreError::Duplicate { .. }) => {
                return Err(PayrollError::Conflict(format!(
                    "employee {employee_id} is already in run {run_id}"
                )));
            }
            Err(e) => return Err(e.into()),
        }

        run.total_employees += 1;
        run.updated_at = Utc::now();
        self.store.update_run(run).await?;
        Ok(record)
    }

    pub async fn remove_employee(&self, run_id: Uuid, employee_id: Uuid) -> Result<(), PayrollError> {
        let lock = self.run_lock(run_id);
        let _guard = lock.lock().await;

        let mut run = self.mutable_run(run_id).await?;
        let record = self
            .store
            .get_record_for_employee(run_id, employee_id)
            .await?
            .ok_or(PayrollError::Validation(format!(
                "employee {employee_id} has no record in run {run_id}"
            )))?;
        self.store.delete_record(record.id).await?;

        run.total_employees = (run.total_employees - 1).max(0);
        run.updated_at = Utc::now();
        self.store.update_run(run).await?;
        Ok(())
    }

    /// Override a record's period inputs. Marks the record modified; the
    /// run cannot finalize until a recalculation clears the flag.
    pub async fn update_record(&self, record_id: Uuid, patch: RecordPatch) -> Result<PayrollRecord, PayrollError> {
        let mut record = self
            .store
            .get_record(record_id)
            .await?
            .ok_or(PayrollError::RecordNotFound(record_id))?;

        let lock = self.run_lock(record.run_id);
        let _guard = lock.lock().await;
        self.mutable_run(record.run_id).await?;

        if patch.is_empty() {
            return Err(PayrollError::Validation("empty record patch".to_string()));
        }
        validate_patch(&patch)?;

        let input = &mut record.input;
        if let Some(v) = patch.gross_regular {
            input.gross_regular = v;
        }
        if let Some(v) = patch.gross_overtime {
            input.gross_overtime = v;
        }
        if let Some(v) = patch.taxable_benefits {
            input.taxable_benefits = v;
        }
        if let Some(v) = patch.vacation_pay {
            input.vacation_pay = v;
        }
        if let Some(v) = patch.rrsp {
            input.rrsp = v;
        }
        if let Some(v) = patch.union_dues {
            input.union_dues = v;
        }
        if let Some(v) = patch.other_pretax {
            input.other_pretax = v;
        }
        if let Some(v) = patch.garnishments {
            input.garnishments = v;
        }
        record.is_modified = true;

        self.store.update_record(record.clone()).await?;
        Ok(record)
    }

    /// Re-run the engine for every record against refreshed YTD state and
    /// the pay date's parameter edition. Engine failures flag the record
    /// instead of aborting; the whole outcome commits together.
    pub async fn recalculate(&self, run_id: Uuid) -> Result<(PayrollRun, Vec<PayrollRecord>), PayrollError> {
        let lock = self.run_lock(run_id);
        let _guard = lock.lock().await;

        let mut run = self.mutable_run(run_id).await?;
        let before = run.clone();
        run.status = PayrollRunStatus::Calculating;
        run.updated_at = Utc::now();
        self.store.update_run(run.clone()).await?;

        let outcome = self.recalculate_locked(&mut run).await;
        if outcome.is_err() {
            // the commit never happened; restore the pre-recalculation row
            let _ = self.store.update_run(before).await;
        }
        outcome
    }

    async fn recalculate_locked(
        &self,
        run: &mut PayrollRun,
    ) -> Result<(PayrollRun, Vec<PayrollRecord>), PayrollError> {
        let edition = Edition::for_pay_date(run.pay_date);
        let params = self.load_params_with_retry(run.tax_year(), edition)?;

        let mut records = self.store.records_for_run(run.id).await?;
        let mut total_gross = Decimal::ZERO;
        let mut total_deductions = Decimal::ZERO;
        let mut total_net = Decimal::ZERO;
        let mut total_employer_cost = Decimal::ZERO;

        for record in &mut records {
            // YTD is re-read so approvals landed since the last pass are seen
            record.input.ytd_before = self
                .store
                .get_prior_ytd(record.employee_id, run.tax_year(), run.pay_date)
                .await?;

            match tax::calculate(&record.input, &params) {
                Ok(result) => {
                    total_gross += result.total_gross;
                    total_deductions += result.total_deductions;
                    total_net += result.net_pay;
                    total_employer_cost += result.employer_cpp + result.employer_ei;
                    record.result = Some(result);
                    record.error = None;
                }
                Err(e) => {
                    tracing::error!(record_id = %record.id, employee_id = %record.employee_id, error = %e, "record calculation failed");
                    record.result = None;
                    record.error = Some(e.to_string());
                }
            }
            record.is_modified = false;
        }

        run.total_employees = records.len() as i32;
        run.total_gross = total_gross;
        run.total_deductions = total_deductions;
        run.total_net = total_net;
        run.total_employer_cost = total_employer_cost;
        run.status = PayrollRunStatus::Draft;
        run.updated_at = Utc::now();

        self.store
            .commit_recalculation(run.clone(), records.clone())
            .await?;
        Ok((run.clone(), records))
    }

    /// Draft → pending approval. Requires a coherent run: every record
    /// recalculated since its last edit and none flagged invalid.
    pub async fn finalize(&self, run_id: Uuid) -> Result<PayrollRun, PayrollError> {
        let lock = self.run_lock(run_id);
        let _guard = lock.lock().await;

        let mut run = self.require_run(run_id).await?;
        if !run.can_be_finalized() {
            return Err(PayrollError::InvalidState(run.status));
        }

        let records = self.store.records_for_run(run_id).await?;
        if records.is_empty() {
            return Err(PayrollError::Validation("run has no records".to_string()));
        }
        let modified: Vec<Uuid> = records.iter().filter(|r| r.is_modified).map(|r| r.id).collect();
        if !modified.is_empty() {
            return Err(PayrollError::ModifiedRecords(modified));
        }
        let invalid: Vec<Uuid> = records.iter().filter(|r| !r.is_valid()).map(|r| r.id).collect();
        if !invalid.is_empty() {
            return Err(PayrollError::InvalidRecords(invalid));
        }

        run.status = PayrollRunStatus::PendingApproval;
        run.finalized_at = Some(Utc::now());
        run.updated_at = Utc::now();
        self.store.update_run(run.clone()).await?;
        Ok(run)
    }

    /// Pending approval → approved, at most once. Re-invocation on an
    /// approved run is a no-op returning the current state.
    pub async fn approve(&self, run_id: Uuid, approver_id: Uuid) -> Result<PayrollRun, PayrollError> {
        let lock = self.run_lock(run_id);
        let _guard = lock.lock().await;

        let mut run = self.require_run(run_id).await?;
        if run.status == PayrollRunStatus::Approved {
            return Ok(run);
        }
        if !run.can_be_approved() {
            return Err(PayrollError::InvalidState(run.status));
        }

        run.status = PayrollRunStatus::Approved;
        run.approved_by = Some(approver_id);
        run.approved_at = Some(Utc::now());
        run.updated_at = Utc::now();
        self.store.update_run(run.clone()).await?;

        // downstream paystub/ledger consumers key off this event
        tracing::info!(run_id = %run.id, approver = %approver_id, total_net = %run.total_net, "payroll run approved");
        Ok(run)
    }

    pub async fn mark_paid(&self, run_id: Uuid) -> Result<PayrollRun, PayrollError> {
        let lock = self.run_lock(run_id);
        let _guard = lock.lock().await;

        let mut run = self.require_run(run_id).await?;
        if run.status != PayrollRunStatus::Approved {
            return Err(PayrollError::InvalidState(run.status));
        }
        run.status = PayrollRunStatus::Paid;
        run.paid_at = Some(Utc::now());
        run.updated_at = Utc::now();
        self.store.update_run(run.clone()).await?;
        Ok(run)
    }

    pub async fn cancel(&self, run_id: Uuid) -> Result<PayrollRun, PayrollError> {
        let lock = self.run_lock(run_id);
        let _guard = lock.lock().await;

        let mut run = self.require_run(run_id).await?;
        if !run.can_be_cancelled() {
            return Err(PayrollError::InvalidState(run.status));
        }
        run.status = PayrollRunStatus::Cancelled;
        run.updated_at = Utc::now();
        self.store.update_run(run.clone()).await?;
        Ok(run)
    }

    /// Delete a draft outright. Non-draft runs are history and stay.
    pub async fn delete_run(&self, run_id: Uuid) -> Result<(), PayrollError> {
        let lock = self.run_lock(run_id);
        let _guard = lock.lock().await;

        let run = self.require_run(run_id).await?;
        if !run.is_draft() {
            return Err(PayrollError::InvalidState(run.status));
        }
        self.store.delete_run(run_id).await?;
        self.run_locks.remove(&run_id);
        Ok(())
    }

    pub async fn get_run(&self, run_id: Uuid) -> Result<PayrollRun, PayrollError> {
        self.require_run(run_id).await
    }

    pub async fn list_runs(&self, filter: RunFilter) -> Result<Vec<PayrollRun>, PayrollError> {
        Ok(self.store.list_runs(filter).await?)
    }

    pub async fn records_for_run(&self, run_id: Uuid) -> Result<Vec<PayrollRecord>, PayrollError> {
        self.require_run(run_id).await?;
        Ok(self.store.records_for_run(run_id).await?)
    }

    pub async fn get_record(&self, record_id: Uuid) -> Result<PayrollRecord, PayrollError> {
        self.store
            .get_record(record_id)
            .await?
            .ok_or(PayrollError::RecordNotFound(record_id))
    }

    /// One-off calculation for a hypothetical gross, without creating a run.
    pub fn calculate_tax_preview(
        &self,
        jurisdiction: Jurisdiction,
        pay_frequency: PayFrequency,
        gross: Decimal,
        pay_date: NaiveDate,
    ) -> Result<CalculationResult, PayrollError> {
        use chrono::Datelike;
        let edition = Edition::for_pay_date(pay_date);
        let params = self.load_params_with_retry(pay_date.year(), edition)?;
        let juris = params
            .jurisdiction(jurisdiction)
            .ok_or(CalculationError::MissingJurisdiction(jurisdiction))?;

        let input = CalculationInput {
            employee_id: Uuid::nil(),
            jurisdiction,
            pay_frequency,
            gross_regular: gross,
            gross_overtime: Decimal::ZERO,
            taxable_benefits: Decimal::ZERO,
            vacation_pay: Decimal::ZERO,
            rrsp: Decimal::ZERO,
            union_dues: Decimal::ZERO,
            other_pretax: Decimal::ZERO,
            garnishments: Decimal::ZERO,
            federal_claim: params.federal.basic_personal_amount,
            provincial_claim: juris.basic_personal_amount,
            exemptions: Default::default(),
            ytd_before: Default::default(),
        };
        Ok(tax::calculate(&input, &params)?)
    }

    async fn seed_record(&self, run: &PayrollRun, employee: &Employee) -> Result<PayrollRecord, PayrollError> {
        let ytd_before = self
            .store
            .get_prior_ytd(employee.id, run.tax_year(), run.pay_date)
            .await?;

        let input = CalculationInput {
            employee_id: employee.id,
            jurisdiction: employee.jurisdiction,
            pay_frequency: employee.pay_frequency,
            gross_regular: tax::round_cents(employee.compensation.period_gross(employee.pay_frequency)),
            gross_overtime: Decimal::ZERO,
            taxable_benefits: Decimal::ZERO,
            vacation_pay: Decimal::ZERO,
            rrsp: Decimal::ZERO,
            union_dues: Decimal::ZERO,
            other_pretax: Decimal::ZERO,
            garnishments: Decimal::ZERO,
            federal_claim: employee.federal_claim,
            provincial_claim: employee.provincial_claim,
            exemptions: employee.exemptions,
            ytd_before,
        };

        let pay_group_name = employee
            .pay_group_id
            .and_then(|id| self.employees.get_pay_group(id).ok())
            .map(|g| g.name);

        Ok(PayrollRecord {
            id: Uuid::new_v4(),
            run_id: run.id,
            employee_id: employee.id,
            input,
            result: None,
            error: None,
            employee_snapshot: EmployeeSnapshot {
                employee_name: employee.full_name(),
                jurisdiction: employee.jurisdiction,
                compensation: employee.compensation.clone(),
                pay_group_name,
            },
            is_modified: false,
            created_at: Utc::now(),
        })
    }

    fn load_params_with_retry(&self, year: i32, edition: Edition) -> Result<Arc<Parameters>, ParameterError> {
        match self.params.load(year, edition) {
            Ok(params) => Ok(params),
            Err(first) => {
                tracing::warn!(year, edition = edition.as_str(), error = %first, "parameter load failed, retrying once");
                self.params.load(year, edition)
            }
        }
    }

    async fn require_run(&self, run_id: Uuid) -> Result<PayrollRun, PayrollError> {
        self.store
            .get_run(run_id)
            .await?
            .ok_or(PayrollError::RunNotFound(run_id))
    }

    async fn mutable_run(&self, run_id: Uuid) -> Result<PayrollRun, PayrollError> {
        let run = self.require_run(run_id).await?;
        if !run.accepts_record_mutations() {
            return Err(PayrollError::InvalidState(run.status));
        }
        Ok(run)
    }

    fn run_lock(&self, run_id: Uuid) -> Arc<Mutex<()>> {
        self.run_locks
            .entry(run_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

fn validate_patch(patch: &RecordPatch) -> Result<(), PayrollError> {
    let fields = [
        ("gross_regular", patch.gross_regular),
        ("gross_overtime", patch.gross_overtime),
        ("taxable_benefits", patch.taxable_benefits),
        ("vacation_pay", patch.vacation_pay),
        ("rrsp", patch.rrsp),
        ("union_dues", patch.union_dues),
        ("other_pretax", patch.other_pretax),
        ("garnishments", patch.garnishments),
    ];
    for (name, value) in fields {
        if let Some(v) = value {
            if v.is_sign_negative() {
                return Err(PayrollError::Validation(format!("{name} must not be negative")));
            }
        }
    }
    Ok(())
}
