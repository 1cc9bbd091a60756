//! Federal Income Tax (T4127 Option 1)
//!
//! Annual projection: the period's taxable income is annualized, basic tax
//! T3 is computed from the bracket (R, K) pair and the K1/K2/K4 credits,
//! then divided back into the period.

use rust_decimal::Decimal;

use crate::params::{CppParams, EiParams, FederalParams};

use super::{bracket_for, round_cents, statutory_credit_base};

/// Federal tax for one pay period.
///
/// `annual_taxable` is factor A: periods × (gross − pre-tax deductions −
/// CPP2 − F2), already floored at zero by the caller.
pub fn period_tax(
    annual_taxable: Decimal,
    claim: Decimal,
    cpp_period: Decimal,
    ei_period: Decimal,
    periods_per_year: Decimal,
    federal: &FederalParams,
    cpp: &CppParams,
    ei: &EiParams,
) -> Decimal {
    let bracket = bracket_for(annual_taxable, &federal.brackets);

    let k1 = federal.credit_rate * claim;
    let k2 = federal.credit_rate
        * statutory_credit_base(cpp_period, ei_period, periods_per_year, cpp, ei);
    let k4 = federal.credit_rate * annual_taxable.min(federal.canada_employment_amount);

    let t3 = (bracket.rate * annual_taxable - bracket.k_constant - k1 - k2 - k4)
        .max(Decimal::ZERO);

    round_cents(t3 / periods_per_year)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::TaxBracket;
    use rust_decimal_macros::dec;

    fn federal_jan_2025() -> FederalParams {
        FederalParams {
            basic_personal_amount: dec!(16129.00),
            canada_employment_amount: dec!(1471.00),
            indexing_rate: dec!(0.027),
            credit_rate: dec!(0.15),
            brackets: vec![
                TaxBracket { threshold: dec!(0), rate: dec!(0.1500), k_constant: dec!(0) },
                TaxBracket { threshold: dec!(57375), rate: dec!(0.2050), k_constant: dec!(3156) },
                TaxBracket { threshold: dec!(114750), rate: dec!(0.2600), k_constant: dec!(9467) },
                TaxBracket { threshold: dec!(177882), rate: dec!(0.2900), k_constant: dec!(14803) },
                TaxBracket { threshold: dec!(253414), rate: dec!(0.3300), k_constant: dec!(24940) },
            ],
        }
    }

    fn cpp_2025() -> CppParams {
        CppParams {
            ympe: dec!(71300.00),
            yampe: dec!(81200.00),
            basic_exemption: dec!(3500.00),
            base_rate: dec!(0.0595),
            additional_rate: dec!(0.0400),
            max_base_contribution: dec!(4034.10),
            max_additional_contribution: dec!(396.00),
        }
    }

    fn ei_2025() -> EiParams {
        EiParams {
            max_insurable_earnings: dec!(65700.00),
            employee_rate: dec!(0.0164),
            employer_multiplier: dec!(1.4000),
            max_premium: dec!(1077.48),
        }
    }

    #[test]
    fn test_mid_salary_biweekly() {
        // A for $2,307.69 gross less $100 RRSP and $21.73 F2, annualized
        let tax = period_tax(
            dec!(56834.96),
            dec!(16129),
            dec!(129.30),
            dec!(37.85),
            dec!(26),
            &federal_jan_2025(),
            &cpp_2025(),
            &ei_2025(),
        );
        assert_eq!(tax, dec!(204.54));
    }

    #[test]
    fn test_bracket_threshold_takes_higher_bracket() {
        let federal = federal_jan_2025();
        let on_threshold = bracket_for(dec!(57375), &federal.brackets);
        assert_eq!(on_threshold.rate, dec!(0.2050));
        let below = bracket_for(dec!(57374.99), &federal.brackets);
        assert_eq!(below.rate, dec!(0.1500));
    }

    #[test]
    fn test_zero_income_zero_tax() {
        let tax = period_tax(
            Decimal::ZERO,
            dec!(16129),
            Decimal::ZERO,
            Decimal::ZERO,
            dec!(26),
            &federal_jan_2025(),
            &cpp_2025(),
            &ei_2025(),
        );
        assert_eq!(tax, Decimal::ZERO);
    }

    #[test]
    fn test_low_income_floors_at_zero() {
        // claim credits exceed tax on a small income
        let tax = period_tax(
            dec!(12000),
            dec!(16129),
            dec!(10.00),
            dec!(7.57),
            dec!(26),
            &federal_jan_2025(),
            &cpp_2025(),
            &ei_2025(),
        );
        assert_eq!(tax, Decimal::ZERO);
    }

    #[test]
    fn test_k2_components_cap_at_annual_maximums() {
        let cpp = cpp_2025();
        let ei = ei_2025();
        // monthly contributions far above the per-period caps
        let base = statutory_credit_base(dec!(875.15), dec!(246.00), dec!(12), &cpp, &ei);
        // CPP component caps at 4034.10 × (0.0495/0.0595), EI at 1077.48
        let expected_cpp = dec!(4034.10) * (dec!(0.0495) / dec!(0.0595));
        assert_eq!(base, expected_cpp + dec!(1077.48));
    }

    #[test]
    fn test_cpp_exempt_year_loses_k2_cpp_component() {
        let cpp = cpp_2025();
        let ei = ei_2025();
        let with_cpp = statutory_credit_base(dec!(129.30), dec!(37.85), dec!(26), &cpp, &ei);
        let without_cpp = statutory_credit_base(Decimal::ZERO, dec!(37.85), dec!(26), &cpp, &ei);
        assert_eq!(with_cpp - without_cpp, dec!(129.30) * dec!(26) * (dec!(0.0495) / dec!(0.0595)));
    }
}
