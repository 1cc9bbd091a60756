//! Calculation Engine
//!
//! Composes the statutory calculators in dependency order (CPP → CPP2 → EI
//! → federal → provincial; the tax calculators consume the contribution
//! lines through their credits), balances the result, and advances the YTD
//! accumulator. Pure: same input and parameters, same output.

use rust_decimal::Decimal;

use crate::employee::Jurisdiction;
use crate::params::Parameters;

use super::models::{CalculationInput, CalculationResult, YtdAccumulator};
use super::{cpp, ei, federal, provincial};

/// Engine failures. `Balance` signals a calculator defect, never bad input.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CalculationError {
    #[error("Invalid calculation input: {0}")]
    InvalidInput(String),

    #[error("Jurisdiction {0} missing from the loaded parameter set")]
    MissingJurisdiction(Jurisdiction),

    #[error("Balance check failed: gross {gross} - deductions {deductions} != net {net}")]
    Balance {
        gross: Decimal,
        deductions: Decimal,
        net: Decimal,
    },
}

/// Compute one pay period for one employee.
pub fn calculate(
    input: &CalculationInput,
    params: &Parameters,
) -> Result<CalculationResult, CalculationError> {
    validate(input)?;

    let juris = params
        .jurisdiction(input.jurisdiction)
        .ok_or(CalculationError::MissingJurisdiction(input.jurisdiction))?;

    let periods = input.pay_frequency.periods_decimal();
    let total_gross = input.total_gross();
    let pensionable = total_gross;
    let insurable = total_gross;
    let ytd = &input.ytd_before;

    let cpp_base = cpp::base_contribution(
        pensionable,
        ytd.cpp_base,
        input.exemptions.cpp,
        periods,
        &params.cpp,
    );
    let cpp_additional = cpp::additional_contribution(
        pensionable,
        ytd.pensionable_earnings,
        ytd.cpp_additional,
        input.exemptions.cpp2,
        &params.cpp,
    );
    let ei_premium = ei::premium(insurable, ytd.ei, input.exemptions.ei, &params.ei);

    // Annual taxable income (factor A): the enhanced-CPP portion F2 and the
    // full CPP2 contribution are deductible alongside pre-tax deductions.
    let f2 = cpp::enhanced_deduction(cpp_base, &params.cpp);
    let annual_taxable = (periods
        * (total_gross - input.total_pretax() - cpp_additional - f2))
        .max(Decimal::ZERO);

    let federal_tax = federal::period_tax(
        annual_taxable,
        input.federal_claim,
        cpp_base,
        ei_premium,
        periods,
        &params.federal,
        &params.cpp,
        &params.ei,
    );
    let provincial_tax = provincial::period_tax(
        annual_taxable,
        input.provincial_claim,
        cpp_base,
        ei_premium,
        periods,
        juris,
        &params.cpp,
        &params.ei,
    );

    let total_deductions = cpp_base
        + cpp_additional
        + ei_premium
        + federal_tax
        + provincial_tax
        + input.rrsp
        + input.union_dues
        + input.other_pretax
        + input.garnishments;
    let net_pay = total_gross - total_deductions;

    let ytd_after = YtdAccumulator {
        gross: ytd.gross + total_gross,
        cpp_base: ytd.cpp_base + cpp_base,
        cpp_additional: ytd.cpp_additional + cpp_additional,
        ei: ytd.ei + ei_premium,
        federal_tax: ytd.federal_tax + federal_tax,
        provincial_tax: ytd.provincial_tax + provincial_tax,
        pensionable_earnings: ytd.pensionable_earnings + pensionable,
        insurable_earnings: ytd.insurable_earnings + insurable,
    };

    let result = CalculationResult {
        total_gross,
        cpp_base,
        cpp_additional,
        ei: ei_premium,
        federal_tax,
        provincial_tax,
        rrsp: input.rrsp,
        union_dues: input.union_dues,
        other_pretax: input.other_pretax,
        garnishments: input.garnishments,
        total_deductions,
        net_pay,
        employer_cpp: cpp_base + cpp_additional,
        employer_cpp_additional: cpp_additional,
        employer_ei: ei::employer_premium(ei_premium, &params.ei),
        ytd_after,
    };

    balance_check(input, &result)?;
    Ok(result)
}

fn validate(input: &CalculationInput) -> Result<(), CalculationError> {
    let fields = [
        ("gross_regular", input.gross_regular),
        ("gross_overtime", input.gross_overtime),
        ("taxable_benefits", input.taxable_benefits),
        ("vacation_pay", input.vacation_pay),
        ("rrsp", input.rrsp),
        ("union_dues", input.union_dues),
        ("other_pretax", input.other_pretax),
        ("garnishments", input.garnishments),
        ("federal_claim", input.federal_claim),
        ("provincial_claim", input.provincial_claim),
    ];
    for (name, value) in fields {
        if value.is_sign_negative() {
            return Err(CalculationError::InvalidInput(format!(
                "{name} must not be negative"
            )));
        }
    }
    Ok(())
}

/// The identity must hold exactly at cents. A violation is a calculator
/// bug; it is logged with the full input and surfaced, never swallowed.
fn balance_check(
    input: &CalculationInput,
    result: &CalculationResult,
) -> Result<(), CalculationError> {
    let lines = result.deduction_lines();
    if result.total_deductions != lines
        || result.total_gross - result.total_deductions != result.net_pay
    {
        tracing::error!(?input, ?result, "engine balance check failed");
        return Err(CalculationError::Balance {
            gross: result.total_gross,
            deductions: result.total_deductions,
            net: result.net_pay,
        });
    }
    Ok(())
}
