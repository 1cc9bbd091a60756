//! Provincial and Territorial Income Tax
//!
//! One function covers all twelve jurisdictions: the bracket skeleton is
//! shared and every regional wrinkle (Ontario surtax and health premium,
//! BC tax reduction, Alberta K5P, dynamic BPAs) hangs off the capability
//! bundle in the jurisdiction's parameters.

use rust_decimal::Decimal;

use crate::params::{
    CppParams, EiParams, HealthPremiumParams, JurisdictionParams, SurtaxParams, TaxReductionParams,
};

use super::{bpa, bracket_for, round_cents, statutory_credit_base};

/// Provincial tax for one pay period.
///
/// `annual_taxable` is the same factor A the federal calculator consumed.
pub fn period_tax(
    annual_taxable: Decimal,
    claim: Decimal,
    cpp_period: Decimal,
    ei_period: Decimal,
    periods_per_year: Decimal,
    juris: &JurisdictionParams,
    cpp: &CppParams,
    ei: &EiParams,
) -> Decimal {
    let bracket = bracket_for(annual_taxable, &juris.brackets);

    // A dynamic BPA replaces the basic portion of the claim; anything the
    // employee claimed above the published amount rides on top.
    let effective_claim = match &juris.dynamic_bpa {
        Some(recipe) => {
            let extra = (claim - juris.basic_personal_amount).max(Decimal::ZERO);
            bpa::resolve(recipe, annual_taxable, juris.basic_personal_amount) + extra
        }
        None => claim,
    };

    let k1p = juris.credit_rate * effective_claim;
    let k2p = juris.credit_rate
        * statutory_credit_base(cpp_period, ei_period, periods_per_year, cpp, ei);
    let k4p = juris
        .employment_amount
        .map(|amount| juris.credit_rate * annual_taxable.min(amount))
        .unwrap_or(Decimal::ZERO);
    let k5p = juris
        .k5p
        .as_ref()
        .map(|k| k.rate * annual_taxable.min(k.income_cap))
        .unwrap_or(Decimal::ZERO);

    let t2 = (bracket.rate * annual_taxable - bracket.k_constant - k1p - k2p - k4p - k5p)
        .max(Decimal::ZERO);

    let v1 = juris
        .surtax
        .as_ref()
        .map(|s| surtax(t2, s))
        .unwrap_or(Decimal::ZERO);
    let v2 = juris
        .health_premium
        .as_ref()
        .map(|hp| health_premium(annual_taxable, hp))
        .unwrap_or(Decimal::ZERO);
    let reduction = juris
        .tax_reduction
        .as_ref()
        .map(|r| tax_reduction(annual_taxable, r))
        .unwrap_or(Decimal::ZERO);

    let annual = (t2 + v1 + v2 - reduction).max(Decimal::ZERO);
    round_cents(annual / periods_per_year)
}

/// Ontario surtax: each tier taxes the basic provincial tax above its
/// threshold; the tiers stack.
fn surtax(t2: Decimal, params: &SurtaxParams) -> Decimal {
    params.rate_1 * (t2 - params.threshold_1).max(Decimal::ZERO)
        + params.rate_2 * (t2 - params.threshold_2).max(Decimal::ZERO)
}

/// Ontario health premium: piecewise in annual income, capped per segment.
fn health_premium(annual_taxable: Decimal, params: &HealthPremiumParams) -> Decimal {
    let segment = params
        .segments
        .iter()
        .rev()
        .find(|s| annual_taxable >= s.income_floor);
    match segment {
        Some(s) => (s.base + s.marginal_rate * (annual_taxable - s.income_floor)).min(s.cap),
        None => Decimal::ZERO,
    }
}

/// BC low-income reduction, phased out above the income threshold.
fn tax_reduction(annual_taxable: Decimal, params: &TaxReductionParams) -> Decimal {
    if annual_taxable <= params.income_threshold {
        params.base_amount
    } else {
        (params.base_amount - (annual_taxable - params.income_threshold) * params.phase_out_rate)
            .max(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{CapabilityFlags, HealthPremiumSegment, K5pParams, TaxBracket};
    use rust_decimal_macros::dec;

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

    fn ontario() -> JurisdictionParams {
        JurisdictionParams {
            basic_personal_amount: dec!(12747.00),
            credit_rate: dec!(0.0505),
            employment_amount: None,
            brackets: vec![
                TaxBracket { threshold: dec!(0), rate: dec!(0.0505), k_constant: dec!(0) },
                TaxBracket { threshold: dec!(52886), rate: dec!(0.0915), k_constant: dec!(2168) },
                TaxBracket { threshold: dec!(105775), rate: dec!(0.1116), k_constant: dec!(4294) },
                TaxBracket { threshold: dec!(150000), rate: dec!(0.1216), k_constant: dec!(5794) },
                TaxBracket { threshold: dec!(220000), rate: dec!(0.1316), k_constant: dec!(7994) },
            ],
            capabilities: CapabilityFlags {
                has_surtax: true,
                has_health_premium: true,
                ..Default::default()
            },
            surtax: Some(SurtaxParams {
                threshold_1: dec!(5710.00),
                rate_1: dec!(0.20),
                threshold_2: dec!(7307.00),
                rate_2: dec!(0.16),
            }),
            health_premium: Some(HealthPremiumParams {
                segments: vec![
                    HealthPremiumSegment { income_floor: dec!(20000), base: dec!(0), marginal_rate: dec!(0.06), cap: dec!(300) },
                    HealthPremiumSegment { income_floor: dec!(36000), base: dec!(300), marginal_rate: dec!(0.06), cap: dec!(450) },
                    HealthPremiumSegment { income_floor: dec!(48000), base: dec!(450), marginal_rate: dec!(0.25), cap: dec!(600) },
                    HealthPremiumSegment { income_floor: dec!(72000), base: dec!(600), marginal_rate: dec!(0.25), cap: dec!(750) },
                    HealthPremiumSegment { income_floor: dec!(200000), base: dec!(750), marginal_rate: dec!(0.25), cap: dec!(900) },
                ],
            }),
            tax_reduction: None,
            k5p: None,
            dynamic_bpa: None,
        }
    }

    fn british_columbia() -> JurisdictionParams {
        JurisdictionParams {
            basic_personal_amount: dec!(12932.00),
            credit_rate: dec!(0.0506),
            employment_amount: None,
            brackets: vec![
                TaxBracket { threshold: dec!(0), rate: dec!(0.0506), k_constant: dec!(0) },
                TaxBracket { threshold: dec!(49279), rate: dec!(0.0770), k_constant: dec!(1301) },
                TaxBracket { threshold: dec!(98560), rate: dec!(0.1050), k_constant: dec!(4061) },
            ],
            capabilities: CapabilityFlags {
                has_tax_reduction: true,
                ..Default::default()
            },
            surtax: None,
            health_premium: None,
            tax_reduction: Some(TaxReductionParams {
                base_amount: dec!(562.00),
                income_threshold: dec!(25020.00),
                phase_out_rate: dec!(0.0356),
            }),
            k5p: None,
            dynamic_bpa: None,
        }
    }

    fn alberta(with_k5p: bool) -> JurisdictionParams {
        JurisdictionParams {
            basic_personal_amount: dec!(22323.00),
            credit_rate: dec!(0.1000),
            employment_amount: None,
            brackets: vec![
                TaxBracket { threshold: dec!(0), rate: dec!(0.1000), k_constant: dec!(0) },
                TaxBracket { threshold: dec!(151234), rate: dec!(0.1200), k_constant: dec!(3025) },
            ],
            capabilities: CapabilityFlags {
                has_k5p_supplement: with_k5p,
                ..Default::default()
            },
            surtax: None,
            health_premium: None,
            tax_reduction: None,
            k5p: with_k5p.then(|| K5pParams {
                rate: dec!(0.0200),
                income_cap: dec!(60000.00),
            }),
            dynamic_bpa: None,
        }
    }

    #[test]
    fn test_ontario_mid_income_no_surtax() {
        let tax = period_tax(
            dec!(56834.96),
            dec!(12747),
            dec!(129.30),
            dec!(37.85),
            dec!(26),
            &ontario(),
            &cpp_2025(),
            &ei_2025(),
        );
        assert_eq!(tax, dec!(107.61));
    }

    #[test]
    fn test_ontario_high_income_hits_both_surtax_tiers() {
        // monthly $15,000 profile: A = 12 × (15,000 − 147.08)
        let tax = period_tax(
            dec!(178235.04),
            dec!(12747),
            dec!(875.15),
            dec!(246.00),
            dec!(12),
            &ontario(),
            &cpp_2025(),
            &ei_2025(),
        );
        assert_eq!(tax, dec!(1571.24));
    }

    #[test]
    fn test_health_premium_piecewise() {
        let hp = ontario().health_premium.unwrap();
        assert_eq!(health_premium(dec!(18000), &hp), Decimal::ZERO);
        assert_eq!(health_premium(dec!(20000), &hp), Decimal::ZERO);
        assert_eq!(health_premium(dec!(24000), &hp), dec!(240.00));
        assert_eq!(health_premium(dec!(30000), &hp), dec!(300));
        assert_eq!(health_premium(dec!(56834.96), &hp), dec!(600));
        assert_eq!(health_premium(dec!(178235.04), &hp), dec!(750));
        // annual maximum
        assert_eq!(health_premium(dec!(500000), &hp), dec!(900));
    }

    #[test]
    fn test_surtax_tiers_stack() {
        let s = ontario().surtax.unwrap();
        assert_eq!(surtax(dec!(5000), &s), Decimal::ZERO);
        // only the first tier
        assert_eq!(surtax(dec!(6710), &s), dec!(200.00));
        // both tiers on the amount above each threshold
        let v1 = surtax(dec!(10000), &s);
        assert_eq!(v1, dec!(0.20) * dec!(4290) + dec!(0.16) * dec!(2693));
    }

    #[test]
    fn test_bc_reduction_zeroes_low_income_tax() {
        let tax = period_tax(
            dec!(20000),
            dec!(12932),
            Decimal::ZERO,
            Decimal::ZERO,
            dec!(26),
            &british_columbia(),
            &cpp_2025(),
            &ei_2025(),
        );
        assert_eq!(tax, Decimal::ZERO);
    }

    #[test]
    fn test_bc_reduction_phases_out() {
        let tax = period_tax(
            dec!(30000),
            dec!(12932),
            Decimal::ZERO,
            Decimal::ZERO,
            dec!(26),
            &british_columbia(),
            &cpp_2025(),
            &ei_2025(),
        );
        // T2 = 1518 − 654.3592; S = 562 − 4980 × 0.0356
        assert_eq!(tax, dec!(18.42));
    }

    #[test]
    fn test_alberta_k5p_lowers_tax() {
        let with = period_tax(
            dec!(60000),
            dec!(22323),
            Decimal::ZERO,
            Decimal::ZERO,
            dec!(12),
            &alberta(true),
            &cpp_2025(),
            &ei_2025(),
        );
        let without = period_tax(
            dec!(60000),
            dec!(22323),
            Decimal::ZERO,
            Decimal::ZERO,
            dec!(12),
            &alberta(false),
            &cpp_2025(),
            &ei_2025(),
        );
        // 0.02 × 60,000 spread across 12 periods
        assert_eq!(without - with, dec!(100.00));
    }
}
