//! Composite transaction drafts.
//!
//! A draft collects a farmer, a project, a hub, service lines (each optionally
//! bound to an equipment unit) and commodities. `total_cost` is recomputed from
//! the lines after every line mutation. Rejected mutations leave the draft
//! untouched.

use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::directory::LocationDirectory;
use crate::models::{Commodity, Equipment, Role, Service, TransactionRequest};
use crate::scope::RoleScope;
use crate::utils::{format_amount, normalize_id};

/// `transactionType` sent for drafts built here.
pub const SERVICE_TRANSACTION_TYPE: &str = "service";

/// Draft lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DraftStatus {
    Empty,
    Building,
    Valid,
    /// Validation failed; the draft is editable and behaves as `Building`.
    RejectedLocally,
    /// Accepted by the gateway. Terminal.
    Submitted,
}

/// A mutation the draft refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("This transaction has already been submitted")]
    AlreadySubmitted,

    #[error("Service {0} is not part of this transaction")]
    UnknownService(String),

    #[error("Quantity must be at least 1")]
    QuantityBelowOne,

    #[error("Select a hub before assigning equipment")]
    HubNotSelected,

    #[error("Hub is fixed by your profile")]
    HubLocked,

    #[error("Equipment {equipment_id} does not perform this service")]
    EquipmentCategoryMismatch { equipment_id: String },

    #[error("Equipment {equipment_id} belongs to a different hub")]
    EquipmentHubMismatch { equipment_id: String },

    #[error("Equipment {equipment_id} is already assigned to another service")]
    EquipmentAlreadyAssigned { equipment_id: String },

    #[error("Validate the transaction before submitting")]
    NotValidated,
}

/// One reason a draft failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationIssue {
    #[error("Select a farmer")]
    MissingFarmer,

    #[error("Select a project")]
    MissingProject,

    #[error("Add at least one service")]
    NoServices,

    #[error("Select a hub")]
    MissingHub,

    #[error("Hub not assigned to profile")]
    HubNotAssignedToProfile,

    #[error("Hub {0} is not an active hub")]
    UnknownHub(String),

    #[error("Hub {0} is outside your assigned state")]
    HubOutsideScope(String),

    #[error("Equipment on {service_id} does not match the service or hub")]
    EquipmentMismatch { service_id: String },

    #[error("Equipment {0} is assigned to more than one service")]
    DuplicateEquipment(String),
}

/// Every issue found by [`TransactionDraft::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
pub struct ValidationErrors(pub Vec<ValidationIssue>);

impl ValidationErrors {
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.0
    }

    pub fn contains(&self, issue: &ValidationIssue) -> bool {
        self.0.contains(issue)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceLine {
    pub service_id: String,
    pub service_name: String,
    pub category_id: String,
    pub unit_cost: f64,
    pub measuring_unit: String,
    pub quantity: u32,
    pub equipment_id: Option<String>,
    #[serde(skip)]
    equipment_category_id: Option<String>,
    #[serde(skip)]
    equipment_hub_id: Option<String>,
}

impl ServiceLine {
    fn new(service: &Service) -> Self {
        Self {
            service_id: service.id.clone(),
            service_name: service.name.clone(),
            category_id: service.category_id.clone(),
            unit_cost: service.unit_cost,
            measuring_unit: service.measuring_unit.clone(),
            quantity: 1,
            equipment_id: None,
            equipment_category_id: None,
            equipment_hub_id: None,
        }
    }

    pub fn subtotal(&self) -> f64 {
        self.unit_cost * f64::from(self.quantity)
    }

    pub fn subtotal_display(&self) -> String {
        format_amount(self.subtotal())
    }

    fn clear_equipment(&mut self) {
        self.equipment_id = None;
        self.equipment_category_id = None;
        self.equipment_hub_id = None;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionDraft {
    role: Role,
    locked_state_id: Option<String>,
    locked_hub_id: Option<String>,
    farmer_id: Option<String>,
    project_id: Option<String>,
    hub_id: Option<String>,
    lines: Vec<ServiceLine>,
    commodity_ids: Vec<String>,
    total_cost: f64,
    transaction_type: String,
    status: DraftStatus,
}

impl TransactionDraft {
    /// Start a draft for a user with `scope`. A community lead's hub is their
    /// locked community.
    pub fn new(scope: &RoleScope) -> Self {
        let locked_hub_id = scope.locked_community_id().map(str::to_string);
        Self {
            role: scope.role(),
            locked_state_id: scope.locked_state_id().map(str::to_string),
            hub_id: locked_hub_id.clone(),
            locked_hub_id,
            farmer_id: None,
            project_id: None,
            lines: Vec::new(),
            commodity_ids: Vec::new(),
            total_cost: 0.0,
            transaction_type: SERVICE_TRANSACTION_TYPE.to_string(),
            status: DraftStatus::Empty,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn status(&self) -> DraftStatus {
        self.status
    }

    pub fn farmer_id(&self) -> Option<&str> {
        self.farmer_id.as_deref()
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    pub fn hub_id(&self) -> Option<&str> {
        self.hub_id.as_deref()
    }

    pub fn lines(&self) -> &[ServiceLine] {
        &self.lines
    }

    pub fn line(&self, service_id: &str) -> Option<&ServiceLine> {
        self.lines.iter().find(|l| l.service_id == service_id)
    }

    pub fn commodity_ids(&self) -> &[String] {
        &self.commodity_ids
    }

    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    pub fn total_display(&self) -> String {
        format_amount(self.total_cost)
    }

    /// Whether an equipment unit is held by any line of this draft.
    pub fn is_equipment_assigned(&self, equipment_id: &str) -> bool {
        self.lines
            .iter()
            .any(|l| l.equipment_id.as_deref() == Some(equipment_id))
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub fn set_farmer(&mut self, farmer_id: Option<&str>) -> Result<(), DraftError> {
        self.touch()?;
        self.farmer_id = normalize_id(farmer_id);
        Ok(())
    }

    pub fn set_project(&mut self, project_id: Option<&str>) -> Result<(), DraftError> {
        self.touch()?;
        self.project_id = normalize_id(project_id);
        Ok(())
    }

    pub fn set_transaction_type(&mut self, transaction_type: &str) -> Result<(), DraftError> {
        self.touch()?;
        self.transaction_type = transaction_type.trim().to_string();
        Ok(())
    }

    /// Choose the hub. Equipment assigned from a different hub is released.
    pub fn set_hub(&mut self, hub_id: Option<&str>) -> Result<(), DraftError> {
        let hub_id = normalize_id(hub_id);
        if self.locked_hub_id.is_some() {
            if hub_id == self.locked_hub_id {
                return Ok(());
            }
            return Err(DraftError::HubLocked);
        }
        self.ensure_open()?;
        if hub_id == self.hub_id {
            return Ok(());
        }
        self.touch()?;

        for line in &mut self.lines {
            if line.equipment_id.is_some() && line.equipment_hub_id != hub_id {
                debug!(service = %line.service_id, equipment = ?line.equipment_id, "Releasing equipment from previous hub");
                line.clear_equipment();
            }
        }
        self.hub_id = hub_id;
        Ok(())
    }

    /// Add a line for `service` with quantity 1. Returns false if the service
    /// is already on the draft.
    pub fn add_service(&mut self, service: &Service) -> Result<bool, DraftError> {
        self.ensure_open()?;
        if self.line(&service.id).is_some() {
            return Ok(false);
        }
        self.touch()?;
        self.lines.push(ServiceLine::new(service));
        self.recompute_total();
        Ok(true)
    }

    /// Remove a service line, releasing any equipment it held.
    pub fn remove_service(&mut self, service_id: &str) -> Result<(), DraftError> {
        self.ensure_open()?;
        let index = self.line_index(service_id)?;
        self.touch()?;
        self.lines.remove(index);
        self.recompute_total();
        Ok(())
    }

    pub fn set_quantity(&mut self, service_id: &str, quantity: u32) -> Result<(), DraftError> {
        self.ensure_open()?;
        if quantity < 1 {
            return Err(DraftError::QuantityBelowOne);
        }
        let index = self.line_index(service_id)?;
        self.touch()?;
        self.lines[index].quantity = quantity;
        self.recompute_total();
        Ok(())
    }

    /// Bind `equipment` to the line for `service_id`.
    ///
    /// The equipment must perform the line's service category, sit at the draft's
    /// hub, and not be held by another line.
    pub fn assign_equipment(
        &mut self,
        service_id: &str,
        equipment: &Equipment,
    ) -> Result<(), DraftError> {
        self.ensure_open()?;
        let index = self.line_index(service_id)?;
        let hub_id = self.hub_id.as_deref().ok_or(DraftError::HubNotSelected)?;

        if equipment.category_id != self.lines[index].category_id {
            return Err(DraftError::EquipmentCategoryMismatch {
                equipment_id: equipment.id.clone(),
            });
        }
        if equipment.hub_id.as_deref() != Some(hub_id) {
            return Err(DraftError::EquipmentHubMismatch {
                equipment_id: equipment.id.clone(),
            });
        }
        let held_elsewhere = self
            .lines
            .iter()
            .enumerate()
            .any(|(i, l)| i != index && l.equipment_id.as_deref() == Some(equipment.id.as_str()));
        if held_elsewhere {
            return Err(DraftError::EquipmentAlreadyAssigned {
                equipment_id: equipment.id.clone(),
            });
        }

        self.touch()?;
        let line = &mut self.lines[index];
        line.equipment_id = Some(equipment.id.clone());
        line.equipment_category_id = Some(equipment.category_id.clone());
        line.equipment_hub_id = equipment.hub_id.clone();
        Ok(())
    }

    pub fn unassign_equipment(&mut self, service_id: &str) -> Result<(), DraftError> {
        self.ensure_open()?;
        let index = self.line_index(service_id)?;
        self.touch()?;
        self.lines[index].clear_equipment();
        Ok(())
    }

    /// Add a commodity. Adding one already present does nothing.
    pub fn add_commodity(&mut self, commodity: &Commodity) -> Result<(), DraftError> {
        self.ensure_open()?;
        let Some(id) = normalize_id(Some(&commodity.id)) else {
            return Ok(());
        };
        if !self.commodity_ids.contains(&id) {
            self.touch()?;
            self.commodity_ids.push(id);
        }
        Ok(())
    }

    pub fn remove_commodity(&mut self, commodity_id: &str) -> Result<(), DraftError> {
        self.ensure_open()?;
        if let Some(index) = self.commodity_ids.iter().position(|c| c == commodity_id) {
            self.touch()?;
            self.commodity_ids.remove(index);
        }
        Ok(())
    }

    // =========================================================================
    // Validation and submission
    // =========================================================================

    /// Check the draft against its role scope and the hub directory.
    ///
    /// Success moves the draft to `Valid`; failure moves it to `RejectedLocally`
    /// and reports every issue found. A submitted draft is left as is.
    pub fn validate(&mut self, directory: &LocationDirectory) -> Result<(), ValidationErrors> {
        if self.status == DraftStatus::Submitted {
            return Ok(());
        }
        let mut issues = Vec::new();

        if self.farmer_id.is_none() {
            issues.push(ValidationIssue::MissingFarmer);
        }
        if self.project_id.is_none() {
            issues.push(ValidationIssue::MissingProject);
        }
        if self.lines.is_empty() {
            issues.push(ValidationIssue::NoServices);
        }

        if self.role.chooses_hub() {
            match self.hub_id.as_deref() {
                None => issues.push(ValidationIssue::MissingHub),
                Some(hub_id) => match directory.hub(hub_id) {
                    None => issues.push(ValidationIssue::UnknownHub(hub_id.to_string())),
                    Some(hub) => {
                        if let Some(ref state) = self.locked_state_id {
                            if hub.state_id != *state {
                                issues.push(ValidationIssue::HubOutsideScope(hub_id.to_string()));
                            }
                        }
                    }
                },
            }
        } else if self.role == Role::CommunityLead && self.locked_hub_id.is_none() {
            issues.push(ValidationIssue::HubNotAssignedToProfile);
        } else if self.hub_id.is_none() {
            issues.push(ValidationIssue::MissingHub);
        }

        let mut seen = HashSet::new();
        for line in &self.lines {
            let Some(ref equipment_id) = line.equipment_id else {
                continue;
            };
            if !seen.insert(equipment_id.as_str()) {
                issues.push(ValidationIssue::DuplicateEquipment(equipment_id.clone()));
            }
            let matches = line.equipment_category_id.as_deref() == Some(line.category_id.as_str())
                && line.equipment_hub_id.is_some()
                && line.equipment_hub_id == self.hub_id;
            if !matches {
                issues.push(ValidationIssue::EquipmentMismatch {
                    service_id: line.service_id.clone(),
                });
            }
        }

        if issues.is_empty() {
            self.status = DraftStatus::Valid;
            Ok(())
        } else {
            debug!(count = issues.len(), "Transaction draft failed validation");
            self.status = DraftStatus::RejectedLocally;
            Err(ValidationErrors(issues))
        }
    }

    /// Flatten a validated draft into the body for `POST /transactions`.
    pub fn to_payload(&self) -> Result<TransactionRequest, DraftError> {
        if self.status == DraftStatus::Submitted {
            return Err(DraftError::AlreadySubmitted);
        }
        if self.status != DraftStatus::Valid {
            return Err(DraftError::NotValidated);
        }
        // Valid implies farmer, project and hub are all present
        let (Some(farmer), Some(project), Some(hub)) =
            (&self.farmer_id, &self.project_id, &self.hub_id)
        else {
            return Err(DraftError::NotValidated);
        };

        Ok(TransactionRequest {
            farmer: farmer.clone(),
            project_id: project.clone(),
            hub: hub.clone(),
            transaction_commodity: self.commodity_ids.clone(),
            equipment: self
                .lines
                .iter()
                .filter_map(|l| l.equipment_id.clone())
                .collect(),
            total_cost: self.total_cost,
            transaction_type: self.transaction_type.clone(),
        })
    }

    /// Record that the gateway accepted this draft. Only a validated draft
    /// can become submitted.
    pub(crate) fn mark_submitted(&mut self) -> Result<(), DraftError> {
        match self.status {
            DraftStatus::Valid => {
                self.status = DraftStatus::Submitted;
                Ok(())
            }
            DraftStatus::Submitted => Err(DraftError::AlreadySubmitted),
            _ => Err(DraftError::NotValidated),
        }
    }

    fn ensure_open(&self) -> Result<(), DraftError> {
        if self.status == DraftStatus::Submitted {
            Err(DraftError::AlreadySubmitted)
        } else {
            Ok(())
        }
    }

    /// Mark the draft as being edited; any earlier validation no longer holds.
    fn touch(&mut self) -> Result<(), DraftError> {
        self.ensure_open()?;
        self.status = DraftStatus::Building;
        Ok(())
    }

    fn line_index(&self, service_id: &str) -> Result<usize, DraftError> {
        self.lines
            .iter()
            .position(|l| l.service_id == service_id)
            .ok_or_else(|| DraftError::UnknownService(service_id.to_string()))
    }

    fn recompute_total(&mut self) {
        self.total_cost = self.lines.iter().map(ServiceLine::subtotal).sum();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::fixtures::sample_hubs;
    use crate::models::Identity;

    const TOLERANCE: f64 = 0.01;

    fn service(id: &str, category: &str, cost: f64) -> Service {
        Service {
            id: id.to_string(),
            name: format!("Service {}", id),
            category_id: category.to_string(),
            unit_cost: cost,
            measuring_unit: "hectare".to_string(),
        }
    }

    fn equipment(id: &str, category: &str, hub: &str) -> Equipment {
        Equipment {
            id: id.to_string(),
            name: format!("Equipment {}", id),
            category_id: category.to_string(),
            hub_id: Some(hub.to_string()),
            status: None,
        }
    }

    fn commodity(id: &str) -> Commodity {
        Commodity {
            id: id.to_string(),
            name: id.to_uppercase(),
        }
    }

    fn admin_draft() -> TransactionDraft {
        TransactionDraft::new(&RoleScope::resolve(&Identity::new(Role::UnrestrictedAdmin)))
    }

    fn directory() -> LocationDirectory {
        LocationDirectory::load(sample_hubs())
    }

    fn expected_total(draft: &TransactionDraft) -> f64 {
        draft
            .lines()
            .iter()
            .map(|l| l.unit_cost * l.quantity as f64)
            .sum()
    }

    // -------------------------------------------------------------------------
    // Cost
    // -------------------------------------------------------------------------

    #[test]
    fn test_transaction_cost_scenario() {
        let mut draft = admin_draft();
        draft.add_service(&service("A", "plough", 5000.0)).unwrap();
        draft.set_quantity("A", 2).unwrap();
        draft.add_service(&service("B", "harrow", 3000.0)).unwrap();
        assert!((draft.total_cost() - 13000.0).abs() < TOLERANCE);
        assert_eq!(draft.total_display(), "₦13,000.00");

        draft.remove_service("A").unwrap();
        assert!((draft.total_cost() - 3000.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_cost_invariant_over_mutation_sequence() {
        let mut draft = admin_draft();
        let services = [
            service("A", "c1", 1250.75),
            service("B", "c2", 0.1),
            service("C", "c3", 99999.99),
            service("D", "c1", 3.33),
        ];
        for (step, s) in services.iter().cycle().take(40).enumerate() {
            match step % 4 {
                0 | 1 => {
                    draft.add_service(s).unwrap();
                }
                2 => {
                    let _ = draft.set_quantity(&s.id, (step as u32 % 7) + 1);
                }
                _ => {
                    let _ = draft.remove_service(&s.id);
                }
            }
            assert!((draft.total_cost() - expected_total(&draft)).abs() < TOLERANCE);
        }
    }

    #[test]
    fn test_add_service_is_idempotent() {
        let mut draft = admin_draft();
        assert!(draft.add_service(&service("A", "plough", 5000.0)).unwrap());
        draft.set_quantity("A", 3).unwrap();
        assert!(!draft.add_service(&service("A", "plough", 5000.0)).unwrap());
        assert_eq!(draft.lines().len(), 1);
        assert_eq!(draft.line("A").unwrap().quantity, 3);
    }

    #[test]
    fn test_quantity_below_one_rejected() {
        let mut draft = admin_draft();
        draft.add_service(&service("A", "plough", 5000.0)).unwrap();
        draft.set_quantity("A", 4).unwrap();
        assert_eq!(draft.set_quantity("A", 0), Err(DraftError::QuantityBelowOne));
        assert_eq!(draft.line("A").unwrap().quantity, 4);
        assert_eq!(draft.line("A").unwrap().subtotal_display(), "₦20,000.00");
        assert_eq!(
            draft.set_quantity("Z", 2),
            Err(DraftError::UnknownService("Z".to_string()))
        );
    }

    // -------------------------------------------------------------------------
    // Equipment
    // -------------------------------------------------------------------------

    #[test]
    fn test_assign_equipment_rules() {
        let mut draft = admin_draft();
        draft.add_service(&service("A", "plough", 5000.0)).unwrap();
        draft.add_service(&service("B", "plough", 4000.0)).unwrap();

        let tractor = equipment("EQ1", "plough", "H1");
        assert_eq!(draft.assign_equipment("A", &tractor), Err(DraftError::HubNotSelected));

        draft.set_hub(Some("H1")).unwrap();
        draft.assign_equipment("A", &tractor).unwrap();
        assert!(draft.is_equipment_assigned("EQ1"));

        // Reassigning to the same line is fine; another line is not
        draft.assign_equipment("A", &tractor).unwrap();
        let before = draft.clone();
        assert_eq!(
            draft.assign_equipment("B", &tractor),
            Err(DraftError::EquipmentAlreadyAssigned {
                equipment_id: "EQ1".to_string()
            })
        );
        assert_eq!(draft.line("B"), before.line("B"));

        assert!(matches!(
            draft.assign_equipment("B", &equipment("EQ2", "harrow", "H1")),
            Err(DraftError::EquipmentCategoryMismatch { .. })
        ));
        assert!(matches!(
            draft.assign_equipment("B", &equipment("EQ3", "plough", "H2")),
            Err(DraftError::EquipmentHubMismatch { .. })
        ));
        assert_eq!(draft.line("B").unwrap().equipment_id, None);
    }

    #[test]
    fn test_removing_line_frees_equipment() {
        let mut draft = admin_draft();
        draft.set_hub(Some("H1")).unwrap();
        draft.add_service(&service("A", "plough", 5000.0)).unwrap();
        draft.add_service(&service("B", "plough", 4000.0)).unwrap();
        let tractor = equipment("EQ1", "plough", "H1");

        draft.assign_equipment("A", &tractor).unwrap();
        draft.remove_service("A").unwrap();
        assert!(!draft.is_equipment_assigned("EQ1"));
        draft.assign_equipment("B", &tractor).unwrap();
    }

    #[test]
    fn test_equipment_never_double_booked() {
        let mut draft = admin_draft();
        draft.set_hub(Some("H1")).unwrap();
        let pool = [
            equipment("EQ1", "plough", "H1"),
            equipment("EQ2", "plough", "H1"),
        ];
        for id in ["A", "B", "C"] {
            draft.add_service(&service(id, "plough", 100.0)).unwrap();
        }
        for (i, line) in ["A", "B", "C", "A", "C", "B"].iter().enumerate() {
            let _ = draft.assign_equipment(line, &pool[i % 2]);
            if i == 3 {
                draft.unassign_equipment("B").unwrap();
            }
            let mut seen = HashSet::new();
            for l in draft.lines() {
                if let Some(ref id) = l.equipment_id {
                    assert!(seen.insert(id.clone()), "{} booked twice", id);
                }
            }
        }
    }

    #[test]
    fn test_changing_hub_releases_foreign_equipment() {
        let mut draft = admin_draft();
        draft.set_hub(Some("H1")).unwrap();
        draft.add_service(&service("A", "plough", 5000.0)).unwrap();
        draft.assign_equipment("A", &equipment("EQ1", "plough", "H1")).unwrap();

        draft.set_hub(Some("H2")).unwrap();
        assert_eq!(draft.line("A").unwrap().equipment_id, None);
    }

    // -------------------------------------------------------------------------
    // Commodities
    // -------------------------------------------------------------------------

    #[test]
    fn test_commodities_behave_as_set() {
        let mut draft = admin_draft();
        draft.add_commodity(&commodity("maize")).unwrap();
        draft.add_commodity(&commodity("rice")).unwrap();
        draft.add_commodity(&commodity("maize")).unwrap();
        draft.add_commodity(&commodity(" ")).unwrap();
        assert_eq!(draft.commodity_ids(), &["maize".to_string(), "rice".to_string()]);

        draft.remove_commodity("maize").unwrap();
        draft.remove_commodity("cassava").unwrap();
        assert_eq!(draft.commodity_ids(), &["rice".to_string()]);
    }

    // -------------------------------------------------------------------------
    // Validation and lifecycle
    // -------------------------------------------------------------------------

    #[test]
    fn test_empty_draft_reports_every_issue() {
        let mut draft = admin_draft();
        assert_eq!(draft.status(), DraftStatus::Empty);
        let err = draft.validate(&directory()).unwrap_err();
        assert_eq!(
            err.issues(),
            &[
                ValidationIssue::MissingFarmer,
                ValidationIssue::MissingProject,
                ValidationIssue::NoServices,
                ValidationIssue::MissingHub,
            ]
        );
        assert_eq!(draft.status(), DraftStatus::RejectedLocally);
        assert_eq!(draft.to_payload(), Err(DraftError::NotValidated));
    }

    #[test]
    fn test_valid_draft_payload() {
        let mut draft = admin_draft();
        draft.set_farmer(Some("F1")).unwrap();
        draft.set_project(Some("P1")).unwrap();
        draft.set_hub(Some("H1")).unwrap();
        draft.add_service(&service("A", "plough", 5000.0)).unwrap();
        draft.add_service(&service("B", "harrow", 3000.0)).unwrap();
        draft.set_quantity("A", 2).unwrap();
        draft.assign_equipment("A", &equipment("EQ1", "plough", "H1")).unwrap();
        draft.add_commodity(&commodity("maize")).unwrap();

        draft.validate(&directory()).expect("draft is complete");
        assert_eq!(draft.status(), DraftStatus::Valid);

        let payload = draft.to_payload().unwrap();
        assert_eq!(payload.farmer, "F1");
        assert_eq!(payload.project_id, "P1");
        assert_eq!(payload.hub, "H1");
        assert_eq!(payload.equipment, vec!["EQ1".to_string()]);
        assert_eq!(payload.transaction_commodity, vec!["maize".to_string()]);
        assert!((payload.total_cost - 13000.0).abs() < TOLERANCE);
        assert_eq!(payload.transaction_type, SERVICE_TRANSACTION_TYPE);

        // Editing after validation requires validating again
        draft.set_quantity("B", 2).unwrap();
        assert_eq!(draft.status(), DraftStatus::Building);
        assert_eq!(draft.to_payload(), Err(DraftError::NotValidated));
    }

    #[test]
    fn test_state_coordinator_hub_must_be_in_state() {
        let scope = RoleScope::resolve(&Identity::new(Role::StateCoordinator).with_state("LA"));
        let mut draft = TransactionDraft::new(&scope);
        draft.set_farmer(Some("F1")).unwrap();
        draft.set_project(Some("P1")).unwrap();
        draft.add_service(&service("A", "plough", 5000.0)).unwrap();

        draft.set_hub(Some("H3")).unwrap();
        let err = draft.validate(&directory()).unwrap_err();
        assert_eq!(err.issues(), &[ValidationIssue::HubOutsideScope("H3".to_string())]);

        draft.set_hub(Some("GHOST")).unwrap();
        let err = draft.validate(&directory()).unwrap_err();
        assert!(err.contains(&ValidationIssue::UnknownHub("GHOST".to_string())));

        draft.set_hub(Some("H2")).unwrap();
        assert!(draft.validate(&directory()).is_ok());
    }

    #[test]
    fn test_community_lead_uses_locked_hub() {
        let scope = RoleScope::resolve(
            &Identity::new(Role::CommunityLead)
                .with_state("LA")
                .with_community("H2"),
        );
        let mut draft = TransactionDraft::new(&scope);
        assert_eq!(draft.hub_id(), Some("H2"));
        assert_eq!(draft.set_hub(Some("H1")), Err(DraftError::HubLocked));
        assert_eq!(draft.set_hub(Some("H2")), Ok(()));

        draft.set_farmer(Some("F1")).unwrap();
        draft.set_project(Some("P1")).unwrap();
        draft.add_service(&service("A", "plough", 5000.0)).unwrap();
        assert!(draft.validate(&LocationDirectory::empty()).is_ok());
        assert_eq!(draft.to_payload().unwrap().hub, "H2");
    }

    #[test]
    fn test_community_lead_without_hub_assignment() {
        let scope = RoleScope::resolve(&Identity::new(Role::CommunityLead).with_state("LA"));
        let mut draft = TransactionDraft::new(&scope);
        draft.set_farmer(Some("F1")).unwrap();
        draft.set_project(Some("P1")).unwrap();
        draft.add_service(&service("A", "plough", 5000.0)).unwrap();

        let err = draft.validate(&directory()).unwrap_err();
        assert_eq!(err.issues(), &[ValidationIssue::HubNotAssignedToProfile]);
        assert_eq!(err.to_string(), "Hub not assigned to profile");
    }

    #[test]
    fn test_submitted_draft_is_frozen() {
        let mut draft = admin_draft();
        draft.set_farmer(Some("F1")).unwrap();
        draft.set_project(Some("P1")).unwrap();
        draft.set_hub(Some("H1")).unwrap();
        draft.add_service(&service("A", "plough", 5000.0)).unwrap();
        draft.validate(&directory()).unwrap();
        draft.mark_submitted().unwrap();

        assert_eq!(draft.status(), DraftStatus::Submitted);
        assert_eq!(
            draft.add_service(&service("B", "harrow", 1.0)),
            Err(DraftError::AlreadySubmitted)
        );
        assert_eq!(draft.set_farmer(Some("F2")), Err(DraftError::AlreadySubmitted));
        assert_eq!(draft.to_payload(), Err(DraftError::AlreadySubmitted));
        assert_eq!(draft.farmer_id(), Some("F1"));
    }

    #[test]
    fn test_only_validated_draft_can_be_submitted() {
        let mut draft = admin_draft();
        assert_eq!(draft.mark_submitted(), Err(DraftError::NotValidated));

        draft.add_service(&service("A", "plough", 5000.0)).unwrap();
        assert_eq!(draft.mark_submitted(), Err(DraftError::NotValidated));
        assert_eq!(draft.status(), DraftStatus::Building);

        assert!(draft.validate(&directory()).is_err());
        assert_eq!(draft.mark_submitted(), Err(DraftError::NotValidated));
        assert_eq!(draft.status(), DraftStatus::RejectedLocally);

        draft.set_farmer(Some("F1")).unwrap();
        draft.set_project(Some("P1")).unwrap();
        draft.set_hub(Some("H1")).unwrap();
        draft.validate(&directory()).unwrap();
        assert_eq!(draft.mark_submitted(), Ok(()));
        assert_eq!(draft.mark_submitted(), Err(DraftError::AlreadySubmitted));
    }

    #[test]
    fn test_reselecting_same_hub_keeps_draft_valid() {
        let mut draft = admin_draft();
        draft.set_farmer(Some("F1")).unwrap();
        draft.set_project(Some("P1")).unwrap();
        draft.set_hub(Some("H1")).unwrap();
        draft.add_service(&service("A", "plough", 5000.0)).unwrap();
        draft.validate(&directory()).unwrap();

        draft.set_hub(Some(" H1 ")).unwrap();
        assert_eq!(draft.status(), DraftStatus::Valid);
        assert!(draft.to_payload().is_ok());

        draft.set_hub(Some("H2")).unwrap();
        assert_eq!(draft.status(), DraftStatus::Building);
    }
}
