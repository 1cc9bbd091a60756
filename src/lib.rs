//! Maple Payroll
//!
//! Canadian employer-side payroll engine for every jurisdiction except
//! Quebec, implementing the CRA T4127 "Option 1" annual-projection
//! formulas.
//!
//! ## Components
//!
//! - **Parameter store**: versioned tax tables keyed by (year, edition)
//! - **Calculators & engine**: pure per-period CPP/CPP2, EI, federal and
//!   provincial tax, composed into a balanced result
//! - **Run lifecycle**: the payroll-run state machine with employee
//!   snapshots and at-most-once approval
//! - **Result store**: the read-mostly persistence surface downstream
//!   paystub and report consumers query

pub mod employee;
pub mod params;
pub mod payroll;
pub mod store;
pub mod tax;

// Re-exports
pub use employee::{Employee, EmployeeService, Jurisdiction, PayFrequency};
pub use params::{Edition, ParameterError, ParameterStore, Parameters};
pub use payroll::{PayrollError, PayrollRecord, PayrollRun, PayrollRunStatus, PayrollService};
pub use store::{InMemoryStore, ResultStore};
pub use tax::{calculate, CalculationInput, CalculationResult, YtdAccumulator};
