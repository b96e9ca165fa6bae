use tracing::{debug, info, warn};

use shared_models::medication::{Medication, MedicationStatus};

use crate::models::MedicationError;

/// Where a medication sits in its lifecycle. Deletion overrides status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Active,
    Archived,
    Deleted,
}

impl From<&Medication> for LifecycleState {
    fn from(medication: &Medication) -> Self {
        if medication.is_deleted() {
            return LifecycleState::Deleted;
        }
        match medication.status {
            MedicationStatus::Active => LifecycleState::Active,
            MedicationStatus::Archived => LifecycleState::Archived,
        }
    }
}

/// What a status request amounts to once validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    Unchanged,
    Apply(MedicationStatus),
}

pub struct MedicationLifecycleService;

impl MedicationLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Statuses reachable from `state`. Nothing leaves `Deleted`.
    pub fn get_valid_transitions(&self, state: LifecycleState) -> Vec<MedicationStatus> {
        match state {
            LifecycleState::Active => vec![MedicationStatus::Archived],
            LifecycleState::Archived => vec![MedicationStatus::Active],
            LifecycleState::Deleted => vec![],
        }
    }

    pub fn validate_status_transition(
        &self,
        medication: &Medication,
        new_status: MedicationStatus,
    ) -> Result<StatusChange, MedicationError> {
        let state = LifecycleState::from(medication);
        debug!("Validating medication {} transition {:?} -> {}", medication.id, state, new_status);

        if state == LifecycleState::Deleted {
            warn!("Status change on deleted medication {}", medication.id);
            return Err(MedicationError::Deleted(medication.id));
        }

        if medication.status == new_status {
            debug!("Medication {} already {}", medication.id, new_status);
            return Ok(StatusChange::Unchanged);
        }

        if !self.get_valid_transitions(state).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", medication.status, new_status);
            return Err(MedicationError::InvalidTransition {
                from: medication.status,
                to: new_status,
            });
        }

        info!("Status transition validated: {} -> {}", medication.status, new_status);
        Ok(StatusChange::Apply(new_status))
    }

    /// Edits, checkbox toggles and deletion all require a live row.
    pub fn ensure_mutable(&self, medication: &Medication) -> Result<(), MedicationError> {
        if medication.is_deleted() {
            warn!("Rejected change to deleted medication {}", medication.id);
            return Err(MedicationError::Deleted(medication.id));
        }
        Ok(())
    }

    pub fn ensure_archived(&self, medication: &Medication) -> Result<(), MedicationError> {
        self.ensure_mutable(medication)?;
        if LifecycleState::from(medication) != LifecycleState::Archived {
            warn!("Archive notes rejected for medication {}: not archived", medication.id);
            return Err(MedicationError::NotArchived(medication.id));
        }
        Ok(())
    }
}

impl Default for MedicationLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Utc;

    use super::*;

    fn medication(status: MedicationStatus, deleted: bool) -> Medication {
        let now = Utc::now();
        Medication {
            id: 7,
            patient_id: 1,
            name: "Lisinopril".to_string(),
            strength: None,
            form: None,
            dose: None,
            frequency: None,
            prescribed: None,
            comments: None,
            intended_duration: None,
            status,
            is_taking: true,
            archive_reason: None,
            archive_comments: None,
            added_at: now,
            archived_at: None,
            deleted_at: deleted.then_some(now),
        }
    }

    #[test]
    fn active_and_archived_toggle() {
        let service = MedicationLifecycleService::new();

        assert_eq!(
            service
                .validate_status_transition(&medication(MedicationStatus::Active, false), MedicationStatus::Archived)
                .unwrap(),
            StatusChange::Apply(MedicationStatus::Archived)
        );
        assert_eq!(
            service
                .validate_status_transition(&medication(MedicationStatus::Archived, false), MedicationStatus::Active)
                .unwrap(),
            StatusChange::Apply(MedicationStatus::Active)
        );
    }

    #[test]
    fn same_status_is_unchanged() {
        let service = MedicationLifecycleService::new();
        let result =
            service.validate_status_transition(&medication(MedicationStatus::Archived, false), MedicationStatus::Archived);
        assert_matches!(result, Ok(StatusChange::Unchanged));
    }

    #[test]
    fn deleted_is_terminal() {
        let service = MedicationLifecycleService::new();
        let deleted = medication(MedicationStatus::Archived, true);

        assert_eq!(LifecycleState::from(&deleted), LifecycleState::Deleted);
        assert!(service.get_valid_transitions(LifecycleState::Deleted).is_empty());
        assert_matches!(
            service.validate_status_transition(&deleted, MedicationStatus::Active),
            Err(MedicationError::Deleted(7))
        );
        assert_matches!(service.ensure_mutable(&deleted), Err(MedicationError::Deleted(7)));
    }

    #[test]
    fn archive_notes_need_an_archived_row() {
        let service = MedicationLifecycleService::new();

        assert!(service.ensure_archived(&medication(MedicationStatus::Archived, false)).is_ok());
        assert_matches!(
            service.ensure_archived(&medication(MedicationStatus::Active, false)),
            Err(MedicationError::NotArchived(7))
        );
        assert_matches!(
            service.ensure_archived(&medication(MedicationStatus::Archived, true)),
            Err(MedicationError::Deleted(7))
        );
    }
}
