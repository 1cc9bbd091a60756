//! Employee Models
//!
//! Employee, pay group, and the closed jurisdiction/frequency vocabulary
//! used throughout the engine.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Canadian payroll jurisdictions supported by the engine.
///
/// Quebec is intentionally absent: QPP/QPIP/QC provincial tax follow a
/// different formula set and are not handled here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Jurisdiction {
    Ab,
    Bc,
    Mb,
    Nb,
    Nl,
    Ns,
    Nt,
    Nu,
    On,
    Pe,
    Sk,
    Yt,
}

impl Jurisdiction {
    /// All twelve jurisdictions, in code order.
    pub const ALL: [Jurisdiction; 12] = [
        Jurisdiction::Ab,
        Jurisdiction::Bc,
        Jurisdiction::Mb,
        Jurisdiction::Nb,
        Jurisdiction::Nl,
        Jurisdiction::Ns,
        Jurisdiction::Nt,
        Jurisdiction::Nu,
        Jurisdiction::On,
        Jurisdiction::Pe,
        Jurisdiction::Sk,
        Jurisdiction::Yt,
    ];

    pub fn as_code(&self) -> &'static str {
        match self {
            Jurisdiction::Ab => "ab",
            Jurisdiction::Bc => "bc",
            Jurisdiction::Mb => "mb",
            Jurisdiction::Nb => "nb",
            Jurisdiction::Nl => "nl",
            Jurisdiction::Ns => "ns",
            Jurisdiction::Nt => "nt",
            Jurisdiction::Nu => "nu",
            Jurisdiction::On => "on",
            Jurisdiction::Pe => "pe",
            Jurisdiction::Sk => "sk",
            Jurisdiction::Yt => "yt",
        }
    }
}

impl fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_code().to_uppercase())
    }
}

impl FromStr for Jurisdiction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ab" => Ok(Jurisdiction::Ab),
            "bc" => Ok(Jurisdiction::Bc),
            "mb" => Ok(Jurisdiction::Mb),
            "nb" => Ok(Jurisdiction::Nb),
            "nl" => Ok(Jurisdiction::Nl),
            "ns" => Ok(Jurisdiction::Ns),
            "nt" => Ok(Jurisdiction::Nt),
            "nu" => Ok(Jurisdiction::Nu),
            "on" => Ok(Jurisdiction::On),
            "pe" => Ok(Jurisdiction::Pe),
            "sk" => Ok(Jurisdiction::Sk),
            "yt" => Ok(Jurisdiction::Yt),
            other => Err(format!("unknown jurisdiction code: {other}")),
        }
    }
}

/// Pay period frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayFrequency {
    Weekly,
    BiWeekly,
    SemiMonthly,
    Monthly,
}

impl PayFrequency {
    /// Number of pay periods in a year (T4127 factor P).
    pub fn periods_per_year(&self) -> u32 {
        match self {
            PayFrequency::Weekly => 52,
            PayFrequency::BiWeekly => 26,
            PayFrequency::SemiMonthly => 24,
            PayFrequency::Monthly => 12,
        }
    }

    pub fn periods_decimal(&self) -> Decimal {
        Decimal::from(self.periods_per_year())
    }

    /// Standard working hours per period, from a 2,080-hour year.
    pub fn standard_hours(&self) -> Decimal {
        Decimal::from(2080u32) / self.periods_decimal()
    }
}

/// How an employee's regular pay is expressed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompensationBasis {
    AnnualSalary {
        #[serde(with = "rust_decimal::serde::str")]
        amount: Decimal,
    },
    HourlyRate {
        #[serde(with = "rust_decimal::serde::str")]
        rate: Decimal,
    },
}

impl CompensationBasis {
    /// Regular gross for one period at standard hours, unrounded.
    pub fn period_gross(&self, frequency: PayFrequency) -> Decimal {
        match self {
            CompensationBasis::AnnualSalary { amount } => *amount / frequency.periods_decimal(),
            CompensationBasis::HourlyRate { rate } => *rate * frequency.standard_hours(),
        }
    }
}

/// Statutory exemption flags.
///
/// The engine never infers these from dates; the 18/70 birthday and CPT30
/// election boundaries are the employer's responsibility to toggle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExemptionFlags {
    pub cpp: bool,
    pub ei: bool,
    pub cpp2: bool,
}

/// Employee record.
///
/// The SIN never enters the core: `sin_masked` carries the display form the
/// boundary produced (e.g. "***-***-729"), nothing more.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub jurisdiction: Jurisdiction,
    pub pay_frequency: PayFrequency,
    pub compensation: CompensationBasis,
    #[serde(with = "rust_decimal::serde::str")]
    pub federal_claim: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub provincial_claim: Decimal,
    pub exemptions: ExemptionFlags,
    pub hire_date: NaiveDate,
    pub termination_date: Option<NaiveDate>,
    pub pay_group_id: Option<Uuid>,
    pub sin_masked: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Hired on or before `date` and not yet terminated as of `date`.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.hire_date <= date && self.termination_date.map_or(true, |t| t >= date)
    }
}

/// Pay group: the scheduling unit that makes employees eligible for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayGroup {
    pub id: Uuid,
    pub name: String,
    pub pay_frequency: PayFrequency,
    pub next_pay_date: NaiveDate,
}

/// Request to create an employee
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateEmployeeRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    pub jurisdiction: Jurisdiction,
    pub pay_frequency: PayFrequency,
    pub compensation: CompensationBasis,
    /// Defaults to the federal basic personal amount when omitted.
    pub federal_claim: Option<Decimal>,
    /// Defaults to the jurisdiction's basic personal amount when omitted.
    pub provincial_claim: Option<Decimal>,
    #[serde(default)]
    pub exemptions: ExemptionFlags,
    pub hire_date: NaiveDate,
    pub pay_group_id: Option<Uuid>,
    /// Already-masked display form; the core never sees the full SIN.
    pub sin_masked: Option<String>,
}

/// Partial update to an employee
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEmployeeRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub jurisdiction: Option<Jurisdiction>,
    pub pay_frequency: Option<PayFrequency>,
    pub compensation: Option<CompensationBasis>,
    pub federal_claim: Option<Decimal>,
    pub provincial_claim: Option<Decimal>,
    pub exemptions: Option<ExemptionFlags>,
    pub pay_group_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_periods_per_year() {
        assert_eq!(PayFrequency::Weekly.periods_per_year(), 52);
        assert_eq!(PayFrequency::BiWeekly.periods_per_year(), 26);
        assert_eq!(PayFrequency::SemiMonthly.periods_per_year(), 24);
        assert_eq!(PayFrequency::Monthly.periods_per_year(), 12);
    }

    #[test]
    fn test_jurisdiction_round_trip() {
        for j in Jurisdiction::ALL {
            assert_eq!(j.as_code().parse::<Jurisdiction>().unwrap(), j);
        }
        assert!("qc".parse::<Jurisdiction>().is_err());
    }

    #[test]
    fn test_salary_period_gross() {
        let basis = CompensationBasis::AnnualSalary { amount: dec!(60_000) };
        assert_eq!(basis.period_gross(PayFrequency::Monthly), dec!(5_000));
    }

    #[test]
    fn test_hourly_period_gross() {
        let basis = CompensationBasis::HourlyRate { rate: dec!(25) };
        assert_eq!(basis.period_gross(PayFrequency::BiWeekly), dec!(2_000));
    }

    #[test]
    fn test_active_window() {
        let now = Utc::now();
        let emp = Employee {
            id: Uuid::new_v4(),
            first_name: "Avery".to_string(),
            last_name: "Chen".to_string(),
            jurisdiction: Jurisdiction::On,
            pay_frequency: PayFrequency::BiWeekly,
            compensation: CompensationBasis::AnnualSalary { amount: dec!(60_000) },
            federal_claim: dec!(16_129),
            provincial_claim: dec!(12_747),
            exemptions: ExemptionFlags::default(),
            hire_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            termination_date: Some(NaiveDate::from_ymd_opt(2025, 9, 30).unwrap()),
            pay_group_id: None,
            sin_masked: None,
            created_at: now,
            updated_at: now,
        };

        assert!(!emp.is_active_on(NaiveDate::from_ymd_opt(2025, 2, 28).unwrap()));
        assert!(emp.is_active_on(NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()));
        assert!(!emp.is_active_on(NaiveDate::from_ymd_opt(2025, 10, 1).unwrap()));
    }
}
