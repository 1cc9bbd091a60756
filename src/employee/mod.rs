//! Employee Module
//!
//! Employee and pay-group registry plus the closed jurisdiction and
//! pay-frequency vocabulary.

pub mod models;
pub mod service;

pub use models::{
    CompensationBasis, CreateEmployeeRequest, Employee, ExemptionFlags, Jurisdiction, PayFrequency,
    PayGroup, UpdateEmployeeRequest,
};
pub use service::{EmployeeError, EmployeeService};
