//! Canada Pension Plan Calculators
//!
//! Base (first-tier) and additional (CPP2) contributions for one pay
//! period. Intermediate arithmetic stays exact; cents rounding happens on
//! the returned amount only.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::params::CppParams;

use super::round_cents;

/// Portion of the base contribution rate that is credit-eligible; the
/// remainder above it is the enhanced (deductible) portion.
pub const CPP_CREDIT_RATE: Decimal = dec!(0.0495);

/// Base CPP contribution for the period.
///
/// The per-period exemption is the annual basic exemption spread over the
/// year's periods; the result is floored at zero and capped by the
/// employee's remaining annual headroom.
pub fn base_contribution(
    pensionable: Decimal,
    ytd_cpp_before: Decimal,
    exempt: bool,
    periods_per_year: Decimal,
    cpp: &CppParams,
) -> Decimal {
    if exempt {
        return Decimal::ZERO;
    }

    let exemption = cpp.basic_exemption / periods_per_year;
    let contribution = (pensionable - exemption).max(Decimal::ZERO) * cpp.base_rate;
    let headroom = (cpp.max_base_contribution - ytd_cpp_before).max(Decimal::ZERO);
    round_cents(contribution.min(headroom))
}

/// Second additional CPP (CPP2) contribution for the period.
///
/// Applies to pensionable earnings between YMPE and YAMPE, tracked through
/// the YTD pensionable accumulator.
pub fn additional_contribution(
    pensionable: Decimal,
    ytd_pensionable_before: Decimal,
    ytd_cpp2_before: Decimal,
    exempt: bool,
    cpp: &CppParams,
) -> Decimal {
    if exempt {
        return Decimal::ZERO;
    }

    let room_to_yampe = (cpp.yampe - ytd_pensionable_before).max(Decimal::ZERO);
    let gap_to_ympe = (cpp.ympe - ytd_pensionable_before).max(Decimal::ZERO);
    let excess = (pensionable.min(room_to_yampe) - gap_to_ympe).max(Decimal::ZERO);

    let contribution = excess * cpp.additional_rate;
    let headroom = (cpp.max_additional_contribution - ytd_cpp2_before).max(Decimal::ZERO);
    round_cents(contribution.min(headroom))
}

/// F2: the enhanced portion of the period's base contribution, deductible
/// from taxable income. Scaling the actual contribution keeps exemptions
/// and caps flowing through.
pub fn enhanced_deduction(base_contribution: Decimal, cpp: &CppParams) -> Decimal {
    if base_contribution.is_zero() {
        return Decimal::ZERO;
    }
    let enhanced_ratio = (cpp.base_rate - CPP_CREDIT_RATE) / cpp.base_rate;
    round_cents(base_contribution * enhanced_ratio)
}
