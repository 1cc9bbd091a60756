//! Calculation Models
//!
//! The engine's input/output shapes and the year-to-date accumulator.
//! Monetary fields serialize as decimal strings.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::employee::{ExemptionFlags, Jurisdiction, PayFrequency};

/// Running totals for one employee within a tax year. Non-decreasing across
/// periods; resets at the year boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YtdAccumulator {
    #[serde(with = "rust_decimal::serde::str")]
    pub gross: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub cpp_base: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub cpp_additional: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub ei: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub federal_tax: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub provincial_tax: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub pensionable_earnings: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub insurable_earnings: Decimal,
}

/// Everything one period calculation needs. Employee-derived fields are
/// copied in so the engine stays a pure function and a stored input can be
/// replayed exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationInput {
    pub employee_id: Uuid,
    pub jurisdiction: Jurisdiction,
    pub pay_frequency: PayFrequency,
    #[serde(with = "rust_decimal::serde::str")]
    pub gross_regular: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub gross_overtime: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub taxable_benefits: Decimal,
    /// Vacation pay cashed out this period.
    #[serde(with = "rust_decimal::serde::str")]
    pub vacation_pay: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub rrsp: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub union_dues: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub other_pretax: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub garnishments: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub federal_claim: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub provincial_claim: Decimal,
    pub exemptions: ExemptionFlags,
    pub ytd_before: YtdAccumulator,
}

impl CalculationInput {
    pub fn total_gross(&self) -> Decimal {
        self.gross_regular + self.gross_overtime + self.taxable_benefits + self.vacation_pay
    }

    pub fn total_pretax(&self) -> Decimal {
        self.rrsp + self.union_dues + self.other_pretax
    }
}

/// One period's statutory lines, employer costs, and the advanced YTD state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    #[serde(with = "rust_decimal::serde::str")]
    pub total_gross: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub cpp_base: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub cpp_additional: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub ei: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub federal_tax: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub provincial_tax: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub rrsp: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub union_dues: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub other_pretax: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub garnishments: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_deductions: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub net_pay: Decimal,
    /// Employer match: base + additional, 1:1.
    #[serde(with = "rust_decimal::serde::str")]
    pub employer_cpp: Decimal,
    /// The CPP2 share of the employer match.
    #[serde(with = "rust_decimal::serde::str")]
    pub employer_cpp_additional: Decimal,
    /// Employee premium times the employer multiplier.
    #[serde(with = "rust_decimal::serde::str")]
    pub employer_ei: Decimal,
    pub ytd_after: YtdAccumulator,
}

impl CalculationResult {
    /// Sum of the statutory and voluntary deduction lines.
    pub fn deduction_lines(&self) -> Decimal {
        self.cpp_base
            + self.cpp_additional
            + self.ei
            + self.federal_tax
            + self.provincial_tax
            + self.rrsp
            + self.union_dues
            + self.other_pretax
            + self.garnishments
    }
}
