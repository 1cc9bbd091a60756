//! Payroll Models
//!
//! The payroll run, its per-employee records, and the employee snapshot
//! that keeps historical records correct after later employee edits.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::employee::{CompensationBasis, Jurisdiction};
use crate::tax::{CalculationInput, CalculationResult};

/// Payroll Run Status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayrollRunStatus {
    Draft,
    Calculating,
    PendingApproval,
    Approved,
    Paid,
    Cancelled,
}

impl Default for PayrollRunStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl PayrollRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayrollRunStatus::Draft => "draft",
            PayrollRunStatus::Calculating => "calculating",
            PayrollRunStatus::PendingApproval => "pending_approval",
            PayrollRunStatus::Approved => "approved",
            PayrollRunStatus::Paid => "paid",
            PayrollRunStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for PayrollRunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payroll Run - one pay date's processing unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayrollRun {
    pub id: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub pay_date: NaiveDate,
    pub status: PayrollRunStatus,

    // Denormalized cache, recomputed from records during recalculate
    pub total_employees: i32,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_gross: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_deductions: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_net: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_employer_cost: Decimal,

    // Approval
    pub finalized_at: Option<DateTime<Utc>>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PayrollRun {
    pub fn new(period_start: NaiveDate, period_end: NaiveDate, pay_date: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            period_start,
            period_end,
            pay_date,
            status: PayrollRunStatus::Draft,
            total_employees: 0,
            total_gross: Decimal::ZERO,
            total_deductions: Decimal::ZERO,
            total_net: Decimal::ZERO,
            total_employer_cost: Decimal::ZERO,
            finalized_at: None,
            approved_by: None,
            approved_at: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The tax year the run's YTD accumulators belong to.
    pub fn tax_year(&self) -> i32 {
        use chrono::Datelike;
        self.pay_date.year()
    }

    pub fn is_draft(&self) -> bool {
        self.status == PayrollRunStatus::Draft
    }

    /// Records may only be added, removed, or edited on a draft run.
    pub fn accepts_record_mutations(&self) -> bool {
        self.status == PayrollRunStatus::Draft
    }

    pub fn can_be_finalized(&self) -> bool {
        self.status == PayrollRunStatus::Draft
    }

    pub fn can_be_approved(&self) -> bool {
        self.status == PayrollRunStatus::PendingApproval
    }

    pub fn can_be_cancelled(&self) -> bool {
        self.status != PayrollRunStatus::Cancelled
    }
}

/// Denormalized employee state captured when a record is inserted. A value
/// copy, never a reference: later employee edits must not rewrite history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeSnapshot {
    pub employee_name: String,
    pub jurisdiction: Jurisdiction,
    pub compensation: CompensationBasis,
    pub pay_group_name: Option<String>,
}

/// One employee's row in a payroll run. Unique on (run_id, employee_id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayrollRecord {
    pub id: Uuid,
    pub run_id: Uuid,
    pub employee_id: Uuid,
    pub input: CalculationInput,
    pub result: Option<CalculationResult>,
    /// Engine failure message when the last recalculation rejected this
    /// record; the run cannot finalize while this is set.
    pub error: Option<String>,
    pub employee_snapshot: EmployeeSnapshot,
    pub is_modified: bool,
    pub created_at: DateTime<Utc>,
}

impl PayrollRecord {
    pub fn is_valid(&self) -> bool {
        self.result.is_some() && self.error.is_none()
    }
}

/// Request to create (or fetch) the run for a pay date
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRunRequest {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub pay_date: NaiveDate,
}

/// Per-record input overrides applied by `update_record`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordPatch {
    pub gross_regular: Option<Decimal>,
    pub gross_overtime: Option<Decimal>,
    pub taxable_benefits: Option<Decimal>,
    pub vacation_pay: Option<Decimal>,
    pub rrsp: Option<Decimal>,
    pub union_dues: Option<Decimal>,
    pub other_pretax: Option<Decimal>,
    pub garnishments: Option<Decimal>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        self.gross_regular.is_none()
            && self.gross_overtime.is_none()
            && self.taxable_benefits.is_none()
            && self.vacation_pay.is_none()
            && self.rrsp.is_none()
            && self.union_dues.is_none()
            && self.other_pretax.is_none()
            && self.garnishments.is_none()
    }
}

/// Filters for listing runs
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunFilter {
    pub status: Option<PayrollRunStatus>,
    pub year: Option<i32>,
}
