//! Parameter Store
//!
//! Loads year/edition parameter documents from disk, validates them, and
//! serves them from an immutable cache. A set that loads once is shared by
//! reference for the rest of the process lifetime.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use rust_decimal::Decimal;

use crate::employee::Jurisdiction;

use super::models::*;

/// Parameter loading errors. Both variants are fatal for the affected
/// edition; they never reach the result of a calculation call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParameterError {
    #[error("Parameter set not found: {0}")]
    NotFound(String),

    #[error("Parameter validation failed: {0}")]
    Invalid(String),
}

/// Versioned tax-parameter store.
///
/// Expects the layout `<base_dir>/<year>/{cpp_ei,federal_<ed>,provinces_<ed>}.json`.
#[derive(Debug)]
pub struct ParameterStore {
    base_dir: PathBuf,
    cache: DashMap<(i32, Edition), Arc<Parameters>>,
}

impl ParameterStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            cache: DashMap::new(),
        }
    }

    /// Load and validate the full parameter set for (year, edition).
    /// Idempotent: subsequent calls return the cached immutable set.
    pub fn load(&self, year: i32, edition: Edition) -> Result<Arc<Parameters>, ParameterError> {
        if let Some(cached) = self.cache.get(&(year, edition)) {
            return Ok(cached.clone());
        }

        let year_dir = self.base_dir.join(year.to_string());
        let cpp_ei: CppEiDocument = read_document(&year_dir.join("cpp_ei.json"))?;
        let federal: FederalDocument =
            read_document(&year_dir.join(format!("federal_{}.json", edition.as_str())))?;
        let provinces: ProvincesDocument =
            read_document(&year_dir.join(format!("provinces_{}.json", edition.as_str())))?;

        let params = build_validated(year, edition, cpp_ei, federal, provinces)?;

        tracing::info!(year, edition = edition.as_str(), "tax parameters loaded");
        let params = Arc::new(params);
        self.cache.insert((year, edition), params.clone());
        Ok(params)
    }

    pub fn get_federal(&self, year: i32, edition: Edition) -> Result<FederalParams, ParameterError> {
        Ok(self.load(year, edition)?.federal.clone())
    }

    /// CPP parameters are year-scoped; either edition's set carries them.
    pub fn get_cpp(&self, year: i32) -> Result<CppParams, ParameterError> {
        Ok(self.year_scoped(year)?.cpp.clone())
    }

    /// EI parameters are year-scoped; either edition's set carries them.
    pub fn get_ei(&self, year: i32) -> Result<EiParams, ParameterError> {
        Ok(self.year_scoped(year)?.ei.clone())
    }

    pub fn get_jurisdiction(
        &self,
        year: i32,
        edition: Edition,
        code: Jurisdiction,
    ) -> Result<JurisdictionParams, ParameterError> {
        let params = self.load(year, edition)?;
        params
            .jurisdiction(code)
            .cloned()
            .ok_or_else(|| ParameterError::NotFound(format!("{year}/{}/{code}", edition.as_str())))
    }

    fn year_scoped(&self, year: i32) -> Result<Arc<Parameters>, ParameterError> {
        for edition in [Edition::Jan, Edition::Jul] {
            if let Some(cached) = self.cache.get(&(year, edition)) {
                return Ok(cached.clone());
            }
        }
        self.load(year, Edition::Jan)
    }
}

fn read_document<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ParameterError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|_| ParameterError::NotFound(path.display().to_string()))?;
    serde_json::from_str(&raw)
        .map_err(|e| ParameterError::Invalid(format!("{}: {e}", path.display())))
}

fn build_validated(
    year: i32,
    edition: Edition,
    cpp_ei: CppEiDocument,
    federal: FederalDocument,
    provinces: ProvincesDocument,
) -> Result<Parameters, ParameterError> {
    if cpp_ei.year != year || federal.year != year || provinces.year != year {
        return Err(ParameterError::Invalid(format!(
            "document year mismatch for {year}"
        )));
    }
    if federal.edition != edition || provinces.edition != edition {
        return Err(ParameterError::Invalid(format!(
            "document edition mismatch for {}",
            edition.as_str()
        )));
    }

    validate_cpp(&cpp_ei.cpp)?;
    validate_ei(&cpp_ei.ei)?;

    // The federal schedule is document-defined at five brackets.
    if federal.params.brackets.len() != 5 {
        return Err(ParameterError::Invalid(format!(
            "federal bracket count must be 5, got {}",
            federal.params.brackets.len()
        )));
    }
    validate_brackets("federal", &federal.params.brackets)?;
    if federal.params.credit_rate <= Decimal::ZERO {
        return Err(ParameterError::Invalid("federal credit_rate must be positive".into()));
    }

    for code in Jurisdiction::ALL {
        let params = provinces
            .jurisdictions
            .get(&code)
            .ok_or_else(|| ParameterError::Invalid(format!("missing jurisdiction {code}")))?;
        validate_jurisdiction(code, params)?;
    }

    Ok(Parameters {
        year,
        edition,
        federal: federal.params,
        cpp: cpp_ei.cpp,
        ei: cpp_ei.ei,
        jurisdictions: provinces.jurisdictions,
    })
}

fn validate_cpp(cpp: &CppParams) -> Result<(), ParameterError> {
    if cpp.ympe <= Decimal::ZERO
        || cpp.yampe <= Decimal::ZERO
        || cpp.base_rate <= Decimal::ZERO
        || cpp.additional_rate <= Decimal::ZERO
        || cpp.max_base_contribution <= Decimal::ZERO
        || cpp.max_additional_contribution <= Decimal::ZERO
        || cpp.basic_exemption <= Decimal::ZERO
    {
        return Err(ParameterError::Invalid("cpp constants must be positive".into()));
    }
    if cpp.yampe <= cpp.ympe {
        return Err(ParameterError::Invalid("YAMPE must exceed YMPE".into()));
    }
    Ok(())
}

fn validate_ei(ei: &EiParams) -> Result<(), ParameterError> {
    if ei.max_insurable_earnings <= Decimal::ZERO
        || ei.employee_rate <= Decimal::ZERO
        || ei.employer_multiplier <= Decimal::ZERO
        || ei.max_premium <= Decimal::ZERO
    {
        return Err(ParameterError::Invalid("ei constants must be positive".into()));
    }
    Ok(())
}

fn validate_brackets(label: &str, brackets: &[TaxBracket]) -> Result<(), ParameterError> {
    let first = brackets
        .first()
        .ok_or_else(|| ParameterError::Invalid(format!("{label}: empty bracket list")))?;
    if !first.threshold.is_zero() {
        return Err(ParameterError::Invalid(format!(
            "{label}: first bracket threshold must be zero"
        )));
    }
    for pair in brackets.windows(2) {
        if pair[1].threshold <= pair[0].threshold {
            return Err(ParameterError::Invalid(format!(
                "{label}: thresholds must be strictly ascending"
            )));
        }
        if pair[1].rate < pair[0].rate {
            return Err(ParameterError::Invalid(format!(
                "{label}: rates must be non-decreasing"
            )));
        }
    }
    Ok(())
}

fn validate_jurisdiction(code: Jurisdiction, params: &JurisdictionParams) -> Result<(), ParameterError> {
    if params.basic_personal_amount <= Decimal::ZERO {
        return Err(ParameterError::Invalid(format!("{code}: BPA must be positive")));
    }
    if params.credit_rate <= Decimal::ZERO {
        return Err(ParameterError::Invalid(format!("{code}: credit_rate must be positive")));
    }
    validate_brackets(code.as_code(), &params.brackets)?;

    let caps = params.capabilities;
    let consistent = [
        (caps.has_surtax, params.surtax.is_some(), "surtax"),
        (caps.has_health_premium, params.health_premium.is_some(), "health_premium"),
        (caps.has_tax_reduction, params.tax_reduction.is_some(), "tax_reduction"),
        (caps.has_k5p_supplement, params.k5p.is_some(), "k5p"),
        (caps.has_dynamic_bpa, params.dynamic_bpa.is_some(), "dynamic_bpa"),
    ];
    for (flag, present, name) in consistent {
        if flag != present {
            return Err(ParameterError::Invalid(format!(
                "{code}: capability flag {name} inconsistent with coefficient presence"
            )));
        }
    }

    let dynamic_required = matches!(code, Jurisdiction::Mb | Jurisdiction::Ns | Jurisdiction::Yt);
    if dynamic_required && !caps.has_dynamic_bpa {
        return Err(ParameterError::Invalid(format!(
            "{code}: dynamic BPA recipe is required"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    fn store() -> ParameterStore {
        ParameterStore::new(concat!(env!("CARGO_MANIFEST_DIR"), "/config/tax_tables"))
    }

    #[test]
    fn test_load_2025_jan() {
        let store = store();
        let params = store.load(2025, Edition::Jan).unwrap();

        assert_eq!(params.federal.brackets.len(), 5);
        assert_eq!(params.federal.credit_rate, dec!(0.1500));
        assert_eq!(params.cpp.ympe, dec!(71300.00));
        assert_eq!(params.cpp.max_base_contribution, dec!(4034.10));
        assert_eq!(params.ei.max_premium, dec!(1077.48));
        assert_eq!(params.jurisdictions.len(), 12);
    }

    #[test]
    fn test_all_twelve_jurisdictions_retrievable() {
        let store = store();
        for edition in [Edition::Jan, Edition::Jul] {
            for code in Jurisdiction::ALL {
                let params = store.get_jurisdiction(2025, edition, code).unwrap();
                assert!(!params.brackets.is_empty());
            }
        }
    }

    #[test]
    fn test_jul_edition_lowers_first_bracket() {
        let store = store();
        let jan = store.get_federal(2025, Edition::Jan).unwrap();
        let jul = store.get_federal(2025, Edition::Jul).unwrap();

        assert!(jul.brackets[0].rate < jan.brackets[0].rate);
        assert!(jul.credit_rate < jan.credit_rate);
        // the recalibrated constants compensate for the mid-year drop
        assert!(jul.brackets[1].k_constant > jan.brackets[1].k_constant);
    }

    #[test]
    fn test_load_is_cached_and_idempotent() {
        let store = store();
        let first = store.load(2025, Edition::Jan).unwrap();
        let second = store.load(2025, Edition::Jan).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_missing_year_is_not_found() {
        let store = store();
        assert!(matches!(
            store.load(1999, Edition::Jan),
            Err(ParameterError::NotFound(_))
        ));
    }

    #[test]
    fn test_dynamic_jurisdictions_carry_recipes() {
        let store = store();
        for code in [Jurisdiction::Mb, Jurisdiction::Ns, Jurisdiction::Yt] {
            let params = store.get_jurisdiction(2025, Edition::Jan, code).unwrap();
            assert!(params.capabilities.has_dynamic_bpa);
            assert!(params.dynamic_bpa.is_some());
        }
    }

    #[test]
    fn test_corrupt_document_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let year_dir = dir.path().join("2025");
        std::fs::create_dir_all(&year_dir).unwrap();
        let mut file = std::fs::File::create(year_dir.join("cpp_ei.json")).unwrap();
        file.write_all(b"{ not json").unwrap();

        let store = ParameterStore::new(dir.path());
        assert!(matches!(
            store.load(2025, Edition::Jan),
            Err(ParameterError::Invalid(_))
        ));
    }
}
