//! Tax Parameters Module
//!
//! Versioned, validated tax tables keyed by (year, edition). Immutable once
//! loaded; shared by reference across all workers.

pub mod models;
pub mod store;

pub use models::{
    CapabilityFlags, CppParams, DynamicBpa, Edition, EiParams, FederalParams, HealthPremiumParams,
    HealthPremiumSegment, JurisdictionParams, K5pParams, Parameters, SurtaxParams, TaxBracket,
    TaxReductionParams,
};
pub use store::{ParameterError, ParameterStore};
