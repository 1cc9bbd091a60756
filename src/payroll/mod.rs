//! Payroll Module
//!
//! The payroll-run lifecycle: a state machine over per-employee records
//! with snapshot-stable history and at-most-once approval.

pub mod handlers;
pub mod models;
pub mod service;

pub use models::{
    CreateRunRequest, EmployeeSnapshot, PayrollRecord, PayrollRun, PayrollRunStatus, RecordPatch,
    RunFilter,
};
pub use service::{PayrollError, PayrollService};
