//! Tax Parameter Models
//!
//! The on-disk parameter documents and the validated in-memory shapes the
//! calculators consume. Every monetary and rate field travels as a decimal
//! string to keep binary floats out of the pipeline.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::employee::Jurisdiction;

/// Mid-year revision of a year's federal and provincial parameters.
/// CPP/EI parameters are year-scoped and ignore the edition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edition {
    Jan,
    Jul,
}

impl Edition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Edition::Jan => "jan",
            Edition::Jul => "jul",
        }
    }

    /// The edition whose effective range contains the pay date.
    pub fn for_pay_date(pay_date: NaiveDate) -> Self {
        if pay_date.month() >= 7 {
            Edition::Jul
        } else {
            Edition::Jan
        }
    }
}

/// Provenance block carried by every parameter file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
    pub source: String,
    pub effective_date: NaiveDate,
    pub validation_status: String,
    pub last_updated: DateTime<Utc>,
}

/// One tax bracket: the T4127 (threshold, rate, K) triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxBracket {
    #[serde(with = "rust_decimal::serde::str")]
    pub threshold: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub rate: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub k_constant: Decimal,
}

/// Canada Pension Plan constants for a year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CppParams {
    #[serde(with = "rust_decimal::serde::str")]
    pub ympe: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub yampe: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub basic_exemption: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub base_rate: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub additional_rate: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub max_base_contribution: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub max_additional_contribution: Decimal,
}

/// Employment Insurance constants for a year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EiParams {
    #[serde(with = "rust_decimal::serde::str")]
    pub max_insurable_earnings: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub employee_rate: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub employer_multiplier: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub max_premium: Decimal,
}

/// Federal Option 1 parameters for one edition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederalParams {
    #[serde(with = "rust_decimal::serde::str")]
    pub basic_personal_amount: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub canada_employment_amount: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub indexing_rate: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub credit_rate: Decimal,
    pub brackets: Vec<TaxBracket>,
}

/// Ontario surtax tiers. The second tier stacks on the first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurtaxParams {
    #[serde(with = "rust_decimal::serde::str")]
    pub threshold_1: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub rate_1: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub threshold_2: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub rate_2: Decimal,
}

/// One segment of the Ontario health-premium piecewise function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthPremiumSegment {
    #[serde(with = "rust_decimal::serde::str")]
    pub income_floor: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub base: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub marginal_rate: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub cap: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthPremiumParams {
    pub segments: Vec<HealthPremiumSegment>,
}

/// British Columbia low-income tax reduction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxReductionParams {
    #[serde(with = "rust_decimal::serde::str")]
    pub base_amount: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub income_threshold: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub phase_out_rate: Decimal,
}

/// Alberta supplementary credit (K5P).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct K5pParams {
    #[serde(with = "rust_decimal::serde::str")]
    pub rate: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub income_cap: Decimal,
}

/// Income-dependent basic personal amount recipes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DynamicBpa {
    /// Manitoba: full BPA up to the start, zero past the end, linear between.
    PhaseOut {
        #[serde(with = "rust_decimal::serde::str")]
        phase_out_start: Decimal,
        #[serde(with = "rust_decimal::serde::str")]
        phase_out_end: Decimal,
    },
    /// Nova Scotia: supplement ramps from zero at `income_low` to
    /// `supplement_max` at `income_high`.
    Supplement {
        #[serde(with = "rust_decimal::serde::str")]
        income_low: Decimal,
        #[serde(with = "rust_decimal::serde::str")]
        income_high: Decimal,
        #[serde(with = "rust_decimal::serde::str")]
        supplement_rate: Decimal,
        #[serde(with = "rust_decimal::serde::str")]
        supplement_max: Decimal,
    },
    /// Yukon: tracks the federal BPA function.
    FederalMirror {
        #[serde(with = "rust_decimal::serde::str")]
        bpa_max: Decimal,
        #[serde(with = "rust_decimal::serde::str")]
        bpa_min: Decimal,
        #[serde(with = "rust_decimal::serde::str")]
        phase_start: Decimal,
        #[serde(with = "rust_decimal::serde::str")]
        phase_end: Decimal,
    },
}

/// What a jurisdiction's formula set includes beyond the bracket skeleton.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CapabilityFlags {
    pub has_surtax: bool,
    pub has_health_premium: bool,
    pub has_tax_reduction: bool,
    pub has_k5p_supplement: bool,
    pub has_dynamic_bpa: bool,
}

/// Provincial/territorial parameters for one edition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JurisdictionParams {
    #[serde(with = "rust_decimal::serde::str")]
    pub basic_personal_amount: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub credit_rate: Decimal,
    /// Provincial employment amount (K4P); Yukon only.
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub employment_amount: Option<Decimal>,
    pub brackets: Vec<TaxBracket>,
    pub capabilities: CapabilityFlags,
    #[serde(default)]
    pub surtax: Option<SurtaxParams>,
    #[serde(default)]
    pub health_premium: Option<HealthPremiumParams>,
    #[serde(default)]
    pub tax_reduction: Option<TaxReductionParams>,
    #[serde(default)]
    pub k5p: Option<K5pParams>,
    #[serde(default)]
    pub dynamic_bpa: Option<DynamicBpa>,
}

/// `cpp_ei.json` document.
#[derive(Debug, Clone, Deserialize)]
pub struct CppEiDocument {
    #[serde(rename = "_metadata")]
    pub metadata: FileMetadata,
    pub year: i32,
    pub cpp: CppParams,
    pub ei: EiParams,
}

/// `federal_<edition>.json` document.
#[derive(Debug, Clone, Deserialize)]
pub struct FederalDocument {
    #[serde(rename = "_metadata")]
    pub metadata: FileMetadata,
    pub year: i32,
    pub edition: Edition,
    #[serde(flatten)]
    pub params: FederalParams,
}

/// `provinces_<edition>.json` document.
#[derive(Debug, Clone, Deserialize)]
pub struct ProvincesDocument {
    #[serde(rename = "_metadata")]
    pub metadata: FileMetadata,
    pub year: i32,
    pub edition: Edition,
    pub jurisdictions: HashMap<Jurisdiction, JurisdictionParams>,
}

/// The full validated parameter set for one (year, edition).
#[derive(Debug, Clone)]
pub struct Parameters {
    pub year: i32,
    pub edition: Edition,
    pub federal: FederalParams,
    pub cpp: CppParams,
    pub ei: EiParams,
    pub jurisdictions: HashMap<Jurisdiction, JurisdictionParams>,
}

impl Parameters {
    pub fn jurisdiction(&self, code: Jurisdiction) -> Option<&JurisdictionParams> {
        self.jurisdictions.get(&code)
    }
}
