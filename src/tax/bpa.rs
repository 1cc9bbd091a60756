//! Dynamic Basic Personal Amounts
//!
//! Manitoba, Nova Scotia, and Yukon compute the BPA from annual income
//! instead of publishing a flat amount. Recipes are data-driven; this file
//! only evaluates them.

use rust_decimal::Decimal;

use crate::params::DynamicBpa;

use super::round_cents;

/// Evaluate a dynamic-BPA recipe at the given annual income.
/// `static_bpa` is the jurisdiction's published base amount.
pub fn resolve(recipe: &DynamicBpa, annual_income: Decimal, static_bpa: Decimal) -> Decimal {
    let bpa = match recipe {
        DynamicBpa::PhaseOut {
            phase_out_start,
            phase_out_end,
        } => {
            if annual_income <= *phase_out_start {
                static_bpa
            } else if annual_income >= *phase_out_end {
                Decimal::ZERO
            } else {
                let span = *phase_out_end - *phase_out_start;
                static_bpa * (*phase_out_end - annual_income) / span
            }
        }
        DynamicBpa::Supplement {
            income_low,
            income_high,
            supplement_rate,
            supplement_max,
        } => {
            let supplement = if annual_income <= *income_low {
                Decimal::ZERO
            } else if annual_income >= *income_high {
                *supplement_max
            } else {
                ((annual_income - *income_low) * *supplement_rate).min(*supplement_max)
            };
            static_bpa + supplement
        }
        DynamicBpa::FederalMirror {
            bpa_max,
            bpa_min,
            phase_start,
            phase_end,
        } => {
            if annual_income <= *phase_start {
                *bpa_max
            } else if annual_income >= *phase_end {
                *bpa_min
            } else {
                let span = *phase_end - *phase_start;
                *bpa_max - (annual_income - *phase_start) * (*bpa_max - *bpa_min) / span
            }
        }
    };
    round_cents(bpa)
}
