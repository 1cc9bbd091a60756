//! In-memory store implementation
//!
//! Concurrent-map backed store for tests, previews, and single-node
//! deployments. The maps are the source of truth; the (run, employee)
//! index enforces the unique constraint.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use dashmap::DashMap;
use uuid::Uuid;

use crate::payroll::models::{PayrollRecord, PayrollRun, PayrollRunStatus, RunFilter};
use crate::tax::YtdAccumulator;

use super::{ResultStore, StoreError};

#[derive(Debug, Default)]
pub struct InMemoryStore {
    runs: DashMap<Uuid, PayrollRun>,
    records: DashMap<Uuid, PayrollRecord>,
    by_run_employee: DashMap<(Uuid, Uuid), Uuid>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResultStore for InMemoryStore {
    async fn insert_run(&self, run: PayrollRun) -> Result<(), StoreError> {
        self.runs.insert(run.id, run);
        Ok(())
    }

    async fn update_run(&self, run: PayrollRun) -> Result<(), StoreError> {
        if !self.runs.contains_key(&run.id) {
            return Err(StoreError::RunNotFound(run.id));
        }
        self.runs.insert(run.id, run);
        Ok(())
    }

    async fn get_run(&self, id: Uuid) -> Result<Option<PayrollRun>, StoreError> {
        Ok(self.runs.get(&id).map(|r| r.clone()))
    }

    async fn find_run_by_pay_date(
        &self,
        pay_date: NaiveDate,
    ) -> Result<Option<PayrollRun>, StoreError> {
        Ok(self
            .runs
            .iter()
            .filter(|r| r.pay_date == pay_date && r.status != PayrollRunStatus::Cancelled)
            .map(|r| r.clone())
            .min_by_key(|r| r.created_at))
    }

    async fn list_runs(&self, filter: RunFilter) -> Result<Vec<PayrollRun>, StoreError> {
        let mut runs: Vec<PayrollRun> = self
            .runs
            .iter()
            .filter(|r| filter.status.map_or(true, |s| r.status == s))
            .filter(|r| filter.year.map_or(true, |y| r.pay_date.year() == y))
            .map(|r| r.clone())
            .collect();
        runs.sort_by_key(|r| r.pay_date);
        Ok(runs)
    }

    async fn delete_run(&self, id: Uuid) -> Result<(), StoreError> {
        self.runs.remove(&id).ok_or(StoreError::RunNotFound(id))?;
        let orphaned: Vec<Uuid> = self
            .records
            .iter()
            .filter(|r| r.run_id == id)
            .map(|r| r.id)
            .collect();
        for record_id in orphaned {
            if let Some((_, record)) = self.records.remove(&record_id) {
                self.by_run_employee.remove(&(record.run_id, record.employee_id));
            }
        }
        Ok(())
    }

    async fn insert_record(&self, record: PayrollRecord) -> Result<(), StoreError> {
        let key = (record.run_id, record.employee_id);
        // entry-based insert so two concurrent adds cannot both pass the check
        match self.by_run_employee.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(StoreError::Duplicate {
                run_id: record.run_id,
                employee_id: record.employee_id,
            }),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(record.id);
                self.records.insert(record.id, record);
                Ok(())
            }
        }
    }

    async fn update_record(&self, record: PayrollRecord) -> Result<(), StoreError> {
        if !self.records.contains_key(&record.id) {
            return Err(StoreError::RecordNotFound(record.id));
        }
        self.records.insert(record.id, record);
        Ok(())
    }

    async fn delete_record(&self, id: Uuid) -> Result<(), StoreError> {
        let (_, record) = self.records.remove(&id).ok_or(StoreError::RecordNotFound(id))?;
        self.by_run_employee.remove(&(record.run_id, record.employee_id));
        Ok(())
    }

    async fn get_record(&self, id: Uuid) -> Result<Option<PayrollRecord>, StoreError> {
        Ok(self.records.get(&id).map(|r| r.clone()))
    }

    async fn get_record_for_employee(
        &self,
        run_id: Uuid,
        employee_id: Uuid,
    ) -> Result<Option<PayrollRecord>, StoreError> {
        let record_id = match self.by_run_employee.get(&(run_id, employee_id)) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.records.get(&record_id).map(|r| r.clone()))
    }

    async fn records_for_run(&self, run_id: Uuid) -> Result<Vec<PayrollRecord>, StoreError> {
        let mut records: Vec<PayrollRecord> = self
            .records
            .iter()
            .filter(|r| r.run_id == run_id)
            .map(|r| r.clone())
            .collect();
        records.sort_by_key(|r| (r.created_at, r.id));
        Ok(records)
    }

    async fn commit_recalculation(
        &self,
        run: PayrollRun,
        records: Vec<PayrollRecord>,
    ) -> Result<(), StoreError> {
        if !self.runs.contains_key(&run.id) {
            return Err(StoreError::RunNotFound(run.id));
        }
        for record in &records {
            if !self.records.contains_key(&record.id) {
                return Err(StoreError::RecordNotFound(record.id));
            }
        }
        // all keys verified; the writes below cannot fail
        for record in records {
            self.records.insert(record.id, record);
        }
        self.runs.insert(run.id, run);
        Ok(())
    }

    async fn get_prior_ytd(
        &self,
        employee_id: Uuid,
        tax_year: i32,
        before_pay_date: NaiveDate,
    ) -> Result<YtdAccumulator, StoreError> {
        let counted_runs: Vec<Uuid> = self
            .runs
            .iter()
            .filter(|r| {
                matches!(r.status, PayrollRunStatus::Approved | PayrollRunStatus::Paid)
                    && r.pay_date.year() == tax_year
                    && r.pay_date < before_pay_date
            })
            .map(|r| r.id)
            .collect();

        let mut ytd = YtdAccumulator::default();
        for record in self.records.iter() {
            if record.employee_id != employee_id || !counted_runs.contains(&record.run_id) {
                continue;
            }
            if let Some(result) = &record.result {
                ytd.gross += result.total_gross;
                ytd.cpp_base += result.cpp_base;
                ytd.cpp_additional += result.cpp_additional;
                ytd.ei += result.ei;
                ytd.federal_tax += result.federal_tax;
                ytd.provincial_tax += result.provincial_tax;
                ytd.pensionable_earnings += result.total_gross;
                ytd.insurable_earnings += result.total_gross;
            }
        }
        Ok(ytd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::employee::{CompensationBasis, ExemptionFlags, Jurisdiction, PayFrequency};
    use crate::payroll::models::EmployeeSnapshot;
    use crate::tax::{CalculationInput, CalculationResult};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn sample_input(employee_id: Uuid) -> CalculationInput {
        CalculationInput {
            employee_id,
            jurisdiction: Jurisdiction::On,
            pay_frequency: PayFrequency::BiWeekly,
            gross_regular: dec!(2000.00),
            gross_overtime: Decimal::ZERO,
            taxable_benefits: Decimal::ZERO,
            vacation_pay: Decimal::ZERO,
            rrsp: Decimal::ZERO,
            union_dues: Decimal::ZERO,
            other_pretax: Decimal::ZERO,
            garnishments: Decimal::ZERO,
            federal_claim: dec!(16129.00),
            provincial_claim: dec!(12747.00),
            exemptions: ExemptionFlags::default(),
            ytd_before: Default::default(),
        }
    }

    fn sample_result(gross: Decimal) -> CalculationResult {
        CalculationResult {
            total_gross: gross,
            cpp_base: dec!(110.99),
            cpp_additional: Decimal::ZERO,
            ei: dec!(32.80),
            federal_tax: dec!(176.89),
            provincial_tax: dec!(92.06),
            rrsp: Decimal::ZERO,
            union_dues: Decimal::ZERO,
            other_pretax: Decimal::ZERO,
            garnishments: Decimal::ZERO,
            total_deductions: dec!(412.74),
            net_pay: gross - dec!(412.74),
            employer_cpp: dec!(110.99),
            employer_cpp_additional: Decimal::ZERO,
            employer_ei: dec!(45.92),
            ytd_after: Default::default(),
        }
    }

    fn record_for(run_id: Uuid, employee_id: Uuid, with_result: bool) -> PayrollRecord {
        PayrollRecord {
            id: Uuid::new_v4(),
            run_id,
            employee_id,
            input: sample_input(employee_id),
            result: with_result.then(|| sample_result(dec!(2000.00))),
            error: None,
            employee_snapshot: EmployeeSnapshot {
                employee_name: "Avery Chen".to_string(),
                jurisdiction: Jurisdiction::On,
                compensation: CompensationBasis::AnnualSalary { amount: dec!(52_000) },
                pay_group_name: None,
            },
            is_modified: false,
            created_at: Utc::now(),
        }
    }

    fn run_on(pay_date: NaiveDate, status: PayrollRunStatus) -> PayrollRun {
        let mut run = PayrollRun::new(
            pay_date - chrono::Duration::days(16),
            pay_date - chrono::Duration::days(3),
            pay_date,
        );
        run.status = status;
        run
    }

    #[tokio::test]
    async fn test_duplicate_record_rejected() {
        let store = InMemoryStore::new();
        let run = run_on(
            NaiveDate::from_ymd_opt(2025, 1, 17).unwrap(),
            PayrollRunStatus::Draft,
        );
        let employee_id = Uuid::new_v4();
        store.insert_run(run.clone()).await.unwrap();
        store
            .insert_record(record_for(run.id, employee_id, false))
            .await
            .unwrap();

        let second = store.insert_record(record_for(run.id, employee_id, false)).await;
        assert!(matches!(second, Err(StoreError::Duplicate { .. })));
    }

    #[tokio::test]
    async fn test_prior_ytd_counts_only_approved_before_date() {
        let store = InMemoryStore::new();
        let employee_id = Uuid::new_v4();

        let approved = run_on(
            NaiveDate::from_ymd_opt(2025, 1, 17).unwrap(),
            PayrollRunStatus::Approved,
        );
        let draft = run_on(
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
            PayrollRunStatus::Draft,
        );
        let later_paid = run_on(
            NaiveDate::from_ymd_opt(2025, 2, 28).unwrap(),
            PayrollRunStatus::Paid,
        );
        for run in [&approved, &draft, &later_paid] {
            store.insert_run(run.clone()).await.unwrap();
        }
        for run_id in [approved.id, draft.id, later_paid.id] {
            store
                .insert_record(record_for(run_id, employee_id, true))
                .await
                .unwrap();
        }

        let ytd = store
            .get_prior_ytd(
                employee_id,
                2025,
                NaiveDate::from_ymd_opt(2025, 2, 14).unwrap(),
            )
            .await
            .unwrap();

        // only the approved January run counts: draft excluded, later run excluded
        assert_eq!(ytd.gross, dec!(2000.00));
        assert_eq!(ytd.cpp_base, dec!(110.99));
        assert_eq!(ytd.pensionable_earnings, dec!(2000.00));
    }

    #[tokio::test]
    async fn test_prior_ytd_resets_across_tax_years() {
        let store = InMemoryStore::new();
        let employee_id = Uuid::new_v4();
        let last_year = run_on(
            NaiveDate::from_ymd_opt(2024, 12, 20).unwrap(),
            PayrollRunStatus::Paid,
        );
        store.insert_run(last_year.clone()).await.unwrap();
        store
            .insert_record(record_for(last_year.id, employee_id, true))
            .await
            .unwrap();

        let ytd = store
            .get_prior_ytd(
                employee_id,
                2025,
                NaiveDate::from_ymd_opt(2025, 1, 17).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(ytd, YtdAccumulator::default());
    }

    #[tokio::test]
    async fn test_delete_run_clears_records_and_index() {
        let store = InMemoryStore::new();
        let run = run_on(
            NaiveDate::from_ymd_opt(2025, 1, 17).unwrap(),
            PayrollRunStatus::Draft,
        );
        let employee_id = Uuid::new_v4();
        store.insert_run(run.clone()).await.unwrap();
        store
            .insert_record(record_for(run.id, employee_id, false))
            .await
            .unwrap();

        store.delete_run(run.id).await.unwrap();
        assert!(store.get_run(run.id).await.unwrap().is_none());
        assert!(store.records_for_run(run.id).await.unwrap().is_empty());
        // the unique-constraint slot was released with the record
        store
            .insert_record(record_for(run.id, employee_id, false))
            .await
            .unwrap();
    }
}
