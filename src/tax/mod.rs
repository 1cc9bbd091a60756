//! Statutory Calculators and Engine
//!
//! Pure per-period calculators for CPP/CPP2, EI, federal and provincial
//! income tax, composed by the engine in dependency order. No I/O, no
//! shared state; everything is a function of the input and the parameters.

pub mod bpa;
pub mod cpp;
pub mod ei;
pub mod engine;
pub mod federal;
pub mod models;
pub mod provincial;

pub use engine::{calculate, CalculationError};
pub use models::{CalculationInput, CalculationResult, YtdAccumulator};

use rust_decimal::{Decimal, RoundingStrategy};

use crate::params::{CppParams, EiParams, TaxBracket};

/// Round a final line value to cents, half away from zero.
pub(crate) fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// The bracket whose threshold is the largest not exceeding `annual`.
/// An income exactly on a threshold lands in the higher bracket.
pub(crate) fn bracket_for(annual: Decimal, brackets: &[TaxBracket]) -> &TaxBracket {
    brackets
        .iter()
        .rev()
        .find(|b| annual >= b.threshold)
        .unwrap_or(&brackets[0])
}

/// Annualized credit base for K2/K2P: the non-enhanced share of the CPP
/// contribution plus the EI premium, each capped per period by its annual
/// maximum spread over the year.
pub(crate) fn statutory_credit_base(
    cpp_period: Decimal,
    ei_period: Decimal,
    periods_per_year: Decimal,
    cpp: &CppParams,
    ei: &EiParams,
) -> Decimal {
    let cpp_cap = cpp.max_base_contribution / periods_per_year;
    let ei_cap = ei.max_premium / periods_per_year;
    let non_enhanced_ratio = cpp::CPP_CREDIT_RATE / cpp.base_rate;

    let cpp_part = cpp_period.min(cpp_cap) * periods_per_year * non_enhanced_ratio;
    let ei_part = ei_period.min(ei_cap) * periods_per_year;
    cpp_part + ei_part
}
