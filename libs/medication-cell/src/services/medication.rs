use chrono::Utc;
use tracing::{debug, info, warn};

use shared_database::medications::{self, MedicationView};
use shared_database::patients;
use shared_models::medication::{Medication, MedicationDetails, MedicationStatus, Prescribed};
use shared_utils::extractor::non_blank;
use shared_utils::AppState;

use crate::models::{
    ArchiveInfoRequest, CreateMedicationRequest, MedicationError, PreviousEntry, UpdateMedicationRequest,
    UpdateStatusRequest, UpdateTakingRequest,
};
use crate::services::lifecycle::{MedicationLifecycleService, StatusChange};

fn medication_details(request: CreateMedicationRequest) -> Result<MedicationDetails, MedicationError> {
    let name = non_blank(request.name)
        .ok_or_else(|| MedicationError::Validation("Medication name required".to_string()))?;
    let prescribed = non_blank(request.prescribed)
        .map(|raw| raw.parse::<Prescribed>().map_err(MedicationError::Validation))
        .transpose()?;

    Ok(MedicationDetails {
        name,
        strength: non_blank(request.strength),
        form: non_blank(request.form),
        dose: non_blank(request.dose),
        frequency: non_blank(request.frequency),
        prescribed,
        comments: non_blank(request.comments),
        intended_duration: non_blank(request.intended_duration),
    })
}

pub struct MedicationService {
    state: AppState,
    lifecycle: MedicationLifecycleService,
}

impl MedicationService {
    pub fn new(state: &AppState) -> Self {
        Self {
            state: state.clone(),
            lifecycle: MedicationLifecycleService::new(),
        }
    }

    pub async fn list(&self, patient_id: i64, view: MedicationView) -> Result<Vec<Medication>, MedicationError> {
        debug!("Listing {:?} medications for patient {}", view, patient_id);

        let medications = self
            .state
            .db
            .run(move |conn| {
                patients::require(conn, patient_id)?;
                medications::list_by_patient(conn, patient_id, view)
            })
            .await?;
        Ok(medications)
    }

    pub async fn create(
        &self,
        patient_id: i64,
        request: CreateMedicationRequest,
    ) -> Result<Medication, MedicationError> {
        let details = medication_details(request)?;
        debug!("Adding medication '{}' for patient {}", details.name, patient_id);

        let medication = self
            .state
            .db
            .run(move |conn| {
                patients::require(conn, patient_id)?;
                medications::insert_medication(conn, patient_id, &details, Utc::now())
            })
            .await?;

        info!("Created medication {} for patient {}", medication.id, patient_id);
        Ok(medication)
    }

    pub async fn get(&self, medication_id: i64) -> Result<Medication, MedicationError> {
        debug!("Fetching medication {}", medication_id);

        self.state
            .db
            .run(move |conn| medications::find_by_id(conn, medication_id))
            .await?
            .ok_or(MedicationError::NotFound)
    }

    pub async fn update(
        &self,
        medication_id: i64,
        request: UpdateMedicationRequest,
    ) -> Result<Medication, MedicationError> {
        let details = medication_details(request)?;
        let current = self.get(medication_id).await?;
        self.lifecycle.ensure_mutable(&current)?;

        let changes = self
            .state
            .db
            .run(move |conn| medications::update_details(conn, medication_id, &details))
            .await?;
        let medication = self.reload_after(medication_id, changes).await?;

        info!("Updated medication {}", medication_id);
        Ok(medication)
    }

    /// Archive or restore. Requesting the current status changes nothing.
    pub async fn update_status(
        &self,
        medication_id: i64,
        request: UpdateStatusRequest,
    ) -> Result<Medication, MedicationError> {
        let status = request
            .status
            .as_deref()
            .and_then(|raw| raw.parse::<MedicationStatus>().ok())
            .ok_or(MedicationError::InvalidStatus)?;

        let current = self.get(medication_id).await?;
        let new_status = match self.lifecycle.validate_status_transition(&current, status)? {
            StatusChange::Unchanged => return Ok(current),
            StatusChange::Apply(new_status) => new_status,
        };

        let archive_reason = non_blank(request.archive_reason);
        let archive_comments = non_blank(request.archive_comments);
        let changes = self
            .state
            .db
            .run(move |conn| {
                medications::set_status(
                    conn,
                    medication_id,
                    new_status,
                    archive_reason.as_deref(),
                    archive_comments.as_deref(),
                    Utc::now(),
                )
            })
            .await?;
        let medication = self.reload_after(medication_id, changes).await?;

        info!("Medication {} is now {}", medication_id, new_status);
        Ok(medication)
    }

    pub async fn update_taking(
        &self,
        medication_id: i64,
        request: UpdateTakingRequest,
    ) -> Result<Medication, MedicationError> {
        let is_taking = request
            .is_taking
            .ok_or_else(|| MedicationError::Validation("isTaking must be a boolean".to_string()))?;

        let current = self.get(medication_id).await?;
        self.lifecycle.ensure_mutable(&current)?;

        let changes = self
            .state
            .db
            .run(move |conn| medications::set_taking(conn, medication_id, is_taking))
            .await?;
        let medication = self.reload_after(medication_id, changes).await?;

        debug!("Medication {} is_taking={}", medication_id, is_taking);
        Ok(medication)
    }

    pub async fn update_archive_info(
        &self,
        medication_id: i64,
        request: ArchiveInfoRequest,
    ) -> Result<Medication, MedicationError> {
        let current = self.get(medication_id).await?;
        self.lifecycle.ensure_archived(&current)?;

        let archive_reason = non_blank(request.archive_reason);
        let archive_comments = non_blank(request.archive_comments);
        let changes = self
            .state
            .db
            .run(move |conn| {
                medications::set_archive_info(
                    conn,
                    medication_id,
                    archive_reason.as_deref(),
                    archive_comments.as_deref(),
                )
            })
            .await?;

        if changes == 0 {
            warn!("Medication {} changed state before its archive notes were saved", medication_id);
            return Err(MedicationError::NotArchived(medication_id));
        }

        info!("Updated archive notes for medication {}", medication_id);
        self.get(medication_id).await
    }

    /// Soft delete. The row remains for the duplicate-history check.
    pub async fn delete(&self, medication_id: i64) -> Result<(), MedicationError> {
        let current = self.get(medication_id).await?;
        self.lifecycle.ensure_mutable(&current)?;

        let changes = self
            .state
            .db
            .run(move |conn| medications::soft_delete(conn, medication_id, Utc::now()))
            .await?;

        if changes == 0 {
            return Err(MedicationError::Deleted(medication_id));
        }

        info!("Soft-deleted medication {}", medication_id);
        Ok(())
    }

    /// Latest archived or deleted entry with the same name, for re-add warnings.
    pub async fn check_previous_entry(&self, patient_id: i64, name: String) -> Result<PreviousEntry, MedicationError> {
        let name = non_blank(Some(name))
            .ok_or_else(|| MedicationError::Validation("Medication name required".to_string()))?;
        debug!("Checking removed history of '{}' for patient {}", name, patient_id);

        let previous = self
            .state
            .db
            .run(move |conn| {
                patients::require(conn, patient_id)?;
                medications::find_previous_entry(conn, patient_id, &name)
            })
            .await?;

        Ok(PreviousEntry::from(previous))
    }

    /// Mutations only touch live rows, so zero changes means it was deleted meanwhile.
    async fn reload_after(&self, medication_id: i64, changes: usize) -> Result<Medication, MedicationError> {
        if changes == 0 {
            return Err(MedicationError::Deleted(medication_id));
        }
        self.get(medication_id).await
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn request(name: Option<&str>, prescribed: Option<&str>) -> CreateMedicationRequest {
        CreateMedicationRequest {
            name: name.map(str::to_string),
            prescribed: prescribed.map(str::to_string),
            strength: Some("  ".to_string()),
            intended_duration: Some(" 2 weeks ".to_string()),
            ..CreateMedicationRequest::default()
        }
    }

    #[test]
    fn details_require_a_name() {
        assert_matches!(
            medication_details(request(None, None)),
            Err(MedicationError::Validation(msg)) if msg == "Medication name required"
        );
        assert_matches!(medication_details(request(Some(" "), None)), Err(MedicationError::Validation(_)));
    }

    #[test]
    fn details_normalise_optional_fields() {
        let details = medication_details(request(Some(" Aspirin "), Some("No"))).unwrap();
        assert_eq!(details.name, "Aspirin");
        assert_eq!(details.prescribed, Some(Prescribed::No));
        assert_eq!(details.strength, None);
        assert_eq!(details.intended_duration.as_deref(), Some("2 weeks"));
    }

    #[test]
    fn details_reject_unknown_prescribed_value() {
        assert_matches!(
            medication_details(request(Some("Aspirin"), Some("sometimes"))),
            Err(MedicationError::Validation(_))
        );
    }
}
