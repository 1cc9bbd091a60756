//! Employment Insurance Calculator
//!
//! Employee premium with the annual maximum applied against YTD, and the
//! employer premium at the statutory multiplier.

use rust_decimal::Decimal;

use crate::params::EiParams;

use super::round_cents;

/// Employee EI premium for the period, capped by remaining annual headroom.
pub fn premium(
    insurable: Decimal,
    ytd_ei_before: Decimal,
    exempt: bool,
    ei: &EiParams,
) -> Decimal {
    if exempt {
        return Decimal::ZERO;
    }

    let premium = insurable * ei.employee_rate;
    let headroom = (ei.max_premium - ytd_ei_before).max(Decimal::ZERO);
    round_cents(premium.min(headroom))
}

/// Employer premium: the employee premium scaled by the multiplier. The
/// employer cap follows the employee cap through this scaling; it is never
/// re-derived from gross.
pub fn employer_premium(employee_premium: Decimal, ei: &EiParams) -> Decimal {
    round_cents(employee_premium * ei.employer_multiplier)
}
