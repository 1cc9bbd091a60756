//! Employee Service
//!
//! Registry for employees and pay groups. Pay groups drive run eligibility:
//! an employee joins a run when their group's next pay date matches the
//! run's pay date.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use dashmap::DashMap;
use uuid::Uuid;
use validator::Validate;

use crate::params::{Edition, ParameterError, ParameterStore};

use super::models::*;

/// Employee service errors
#[derive(Debug, thiserror::Error)]
pub enum EmployeeError {
    #[error("Employee not found: {0}")]
    NotFound(Uuid),

    #[error("Pay group not found: {0}")]
    PayGroupNotFound(Uuid),

    #[error("Employee {0} is already terminated")]
    AlreadyTerminated(Uuid),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Parameter(#[from] ParameterError),
}

/// Employee and pay-group registry.
#[derive(Debug, Clone)]
pub struct EmployeeService {
    employees: Arc<DashMap<Uuid, Employee>>,
    pay_groups: Arc<DashMap<Uuid, PayGroup>>,
    params: Arc<ParameterStore>,
}

impl EmployeeService {
    pub fn new(params: Arc<ParameterStore>) -> Self {
        Self {
            employees: Arc::new(DashMap::new()),
            pay_groups: Arc::new(DashMap::new()),
            params,
        }
    }

    /// Create an employee. TD1 claims default to the basic personal amounts
    /// for the hire year's edition when the request omits them.
    pub fn create(&self, request: CreateEmployeeRequest) -> Result<Employee, EmployeeError> {
        request
            .validate()
            .map_err(|e| EmployeeError::Validation(e.to_string()))?;

        if let Some(group_id) = request.pay_group_id {
            if !self.pay_groups.contains_key(&group_id) {
                return Err(EmployeeError::PayGroupNotFound(group_id));
            }
        }

        let year = request.hire_date.year();
        let edition = Edition::for_pay_date(request.hire_date);
        let federal_claim = match request.federal_claim {
            Some(claim) => claim,
            None => self.params.get_federal(year, edition)?.basic_personal_amount,
        };
        let provincial_claim = match request.provincial_claim {
            Some(claim) => claim,
            None => {
                self.params
                    .get_jurisdiction(year, edition, request.jurisdiction)?
                    .basic_personal_amount
            }
        };

        let now = Utc::now();
        let employee = Employee {
            id: Uuid::new_v4(),
            first_name: request.first_name,
            last_name: request.last_name,
            jurisdiction: request.jurisdiction,
            pay_frequency: request.pay_frequency,
            compensation: request.compensation,
            federal_claim,
            provincial_claim,
            exemptions: request.exemptions,
            hire_date: request.hire_date,
            termination_date: None,
            pay_group_id: request.pay_group_id,
            sin_masked: request.sin_masked,
            created_at: now,
            updated_at: now,
        };

        self.employees.insert(employee.id, employee.clone());
        tracing::info!(employee_id = %employee.id, "employee created");
        Ok(employee)
    }

    pub fn get(&self, id: Uuid) -> Result<Employee, EmployeeError> {
        self.employees
            .get(&id)
            .map(|e| e.clone())
            .ok_or(EmployeeError::NotFound(id))
    }

    pub fn list(&self) -> Vec<Employee> {
        let mut all: Vec<Employee> = self.employees.iter().map(|e| e.clone()).collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        all
    }

    /// Apply a partial update. Existing payroll records are value snapshots
    /// and are unaffected.
    pub fn update(&self, id: Uuid, patch: UpdateEmployeeRequest) -> Result<Employee, EmployeeError> {
        if let Some(group_id) = patch.pay_group_id {
            if !self.pay_groups.contains_key(&group_id) {
                return Err(EmployeeError::PayGroupNotFound(group_id));
            }
        }

        let mut entry = self
            .employees
            .get_mut(&id)
            .ok_or(EmployeeError::NotFound(id))?;

        if let Some(v) = patch.first_name {
            entry.first_name = v;
        }
        if let Some(v) = patch.last_name {
            entry.last_name = v;
        }
        if let Some(v) = patch.jurisdiction {
            entry.jurisdiction = v;
        }
        if let Some(v) = patch.pay_frequency {
            entry.pay_frequency = v;
        }
        if let Some(v) = patch.compensation {
            entry.compensation = v;
        }
        if let Some(v) = patch.federal_claim {
            entry.federal_claim = v;
        }
        if let Some(v) = patch.provincial_claim {
            entry.provincial_claim = v;
        }
        if let Some(v) = patch.exemptions {
            entry.exemptions = v;
        }
        if let Some(v) = patch.pay_group_id {
            entry.pay_group_id = Some(v);
        }
        entry.updated_at = Utc::now();

        Ok(entry.clone())
    }

    /// Soft delete: historical records stay valid.
    pub fn terminate(&self, id: Uuid, termination_date: NaiveDate) -> Result<Employee, EmployeeError> {
        let mut entry = self
            .employees
            .get_mut(&id)
            .ok_or(EmployeeError::NotFound(id))?;

        if entry.termination_date.is_some() {
            return Err(EmployeeError::AlreadyTerminated(id));
        }

        entry.termination_date = Some(termination_date);
        entry.updated_at = Utc::now();
        tracing::info!(employee_id = %id, %termination_date, "employee terminated");
        Ok(entry.clone())
    }

    pub fn create_pay_group(
        &self,
        name: impl Into<String>,
        pay_frequency: PayFrequency,
        next_pay_date: NaiveDate,
    ) -> PayGroup {
        let group = PayGroup {
            id: Uuid::new_v4(),
            name: name.into(),
            pay_frequency,
            next_pay_date,
        };
        self.pay_groups.insert(group.id, group.clone());
        group
    }

    pub fn get_pay_group(&self, id: Uuid) -> Result<PayGroup, EmployeeError> {
        self.pay_groups
            .get(&id)
            .map(|g| g.clone())
            .ok_or(EmployeeError::PayGroupNotFound(id))
    }

    pub fn set_next_pay_date(&self, id: Uuid, next_pay_date: NaiveDate) -> Result<PayGroup, EmployeeError> {
        let mut entry = self
            .pay_groups
            .get_mut(&id)
            .ok_or(EmployeeError::PayGroupNotFound(id))?;
        entry.next_pay_date = next_pay_date;
        Ok(entry.clone())
    }

    /// Active employees whose pay group pays on `pay_date`.
    pub fn eligible_for_pay_date(&self, pay_date: NaiveDate) -> Vec<Employee> {
        let due_groups: Vec<Uuid> = self
            .pay_groups
            .iter()
            .filter(|g| g.next_pay_date == pay_date)
            .map(|g| g.id)
            .collect();

        let mut eligible: Vec<Employee> = self
            .employees
            .iter()
            .filter(|e| {
                e.is_active_on(pay_date)
                    && e.pay_group_id.map_or(false, |g| due_groups.contains(&g))
            })
            .map(|e| e.clone())
            .collect();
        eligible.sort_by_key(|e| e.id);
        eligible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_service() -> EmployeeService {
        let params = Arc::new(ParameterStore::new(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/config/tax_tables"
        )));
        EmployeeService::new(params)
    }

    fn create_request(group: Option<Uuid>) -> CreateEmployeeRequest {
        CreateEmployeeRequest {
            first_name: "Avery".to_string(),
            last_name: "Chen".to_string(),
            jurisdiction: Jurisdiction::On,
            pay_frequency: PayFrequency::BiWeekly,
            compensation: CompensationBasis::AnnualSalary { amount: dec!(60_000) },
            federal_claim: None,
            provincial_claim: None,
            exemptions: ExemptionFlags::default(),
            hire_date: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
            pay_group_id: group,
            sin_masked: Some("***-***-729".to_string()),
        }
    }

    #[test]
    fn test_create_defaults_claims_to_bpa() {
        let service = test_service();
        let employee = service.create(create_request(None)).unwrap();

        assert_eq!(employee.federal_claim, dec!(16_129));
        assert_eq!(employee.provincial_claim, dec!(12_747));
        assert!(employee.termination_date.is_none());
    }

    #[test]
    fn test_terminate_is_soft_and_once() {
        let service = test_service();
        let employee = service.create(create_request(None)).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();

        let terminated = service.terminate(employee.id, date).unwrap();
        assert_eq!(terminated.termination_date, Some(date));
        assert!(matches!(
            service.terminate(employee.id, date),
            Err(EmployeeError::AlreadyTerminated(_))
        ));
        // still retrievable
        assert!(service.get(employee.id).is_ok());
    }

    #[test]
    fn test_eligibility_follows_pay_group_date() {
        let service = test_service();
        let pay_date = NaiveDate::from_ymd_opt(2025, 1, 17).unwrap();
        let group = service.create_pay_group("Salaried", PayFrequency::BiWeekly, pay_date);

        let in_group = service.create(create_request(Some(group.id))).unwrap();
        let _outside = service.create(create_request(None)).unwrap();

        let eligible = service.eligible_for_pay_date(pay_date);
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].id, in_group.id);

        assert!(service
            .eligible_for_pay_date(NaiveDate::from_ymd_opt(2025, 1, 18).unwrap())
            .is_empty());
    }

    #[test]
    fn test_unknown_pay_group_rejected() {
        let service = test_service();
        let result = service.create(create_request(Some(Uuid::new_v4())));
        assert!(matches!(result, Err(EmployeeError::PayGroupNotFound(_))));
    }
}
