use chrono::Utc;
use tracing::{debug, info};

use shared_database::{medications, patients, DatabaseError};
use shared_models::patient::{ActiveReviewCounts, Checklist};
use shared_utils::AppState;

use crate::models::{PatientError, ReconciliationStatus, SaveDraftRequest, SaveDraftResponse};

pub const MESSAGE_RECONCILED: &str = "Patient marked as reconciled";
pub const MESSAGE_CHECKLIST_PENDING: &str = "Medications complete - please complete checklist";
pub const MESSAGE_MEDICATIONS_PENDING: &str = "Draft saved - not all medications reviewed";

/// A patient is reconciled when every active medication has been confirmed
/// and all three checklist questions have been asked.
///
/// An empty active list never counts as fully checked.
pub fn derive_status(counts: ActiveReviewCounts, checklist: Checklist) -> ReconciliationStatus {
    let all_meds_checked = counts.total_active > 0 && counts.total_active == counts.checked_active;
    let checklist_complete = checklist.all_checked();

    ReconciliationStatus {
        is_reconciled: all_meds_checked && checklist_complete,
        all_meds_checked,
        checklist_complete,
    }
}

pub fn status_message(status: &ReconciliationStatus) -> &'static str {
    if status.is_reconciled {
        MESSAGE_RECONCILED
    } else if status.all_meds_checked {
        MESSAGE_CHECKLIST_PENDING
    } else {
        MESSAGE_MEDICATIONS_PENDING
    }
}

pub struct ReconciliationService {
    state: AppState,
}

impl ReconciliationService {
    pub fn new(state: &AppState) -> Self {
        Self {
            state: state.clone(),
        }
    }

    /// Persist the checkbox snapshot and checklist, then recompute and store
    /// the patient's reconciled flag from what was just written.
    pub async fn save_draft(
        &self,
        patient_id: i64,
        request: SaveDraftRequest,
    ) -> Result<SaveDraftResponse, PatientError> {
        let updates = request.medication_statuses.ok_or_else(|| {
            PatientError::Validation("medicationStatuses must be an array".to_string())
        })?;
        let checklist: Option<Checklist> = request.checklist.map(Checklist::from);
        debug!(
            "Saving draft for patient {}: {} medication status(es), checklist provided: {}",
            patient_id,
            updates.len(),
            checklist.is_some()
        );

        let (patient, counts, status) = self
            .state
            .db
            .run(move |conn| {
                patients::require(conn, patient_id)?;

                medications::batch_update_taking(conn, patient_id, &updates)?;

                let now = Utc::now();
                if let Some(checklist) = &checklist {
                    patients::update_checklist(conn, patient_id, checklist, now)?;
                }

                let stored = patients::find_by_id(conn, patient_id)?
                    .ok_or(DatabaseError::NotFound { entity: "Patient", id: patient_id })?;
                let counts = patients::active_review_counts(conn, patient_id)?;
                let status = derive_status(counts, stored.checklist());

                patients::update_reconciliation(conn, patient_id, status.is_reconciled, now)?;
                let patient = patients::find_by_id(conn, patient_id)?
                    .ok_or(DatabaseError::NotFound { entity: "Patient", id: patient_id })?;

                Ok((patient, counts, status))
            })
            .await?;

        info!(
            "Patient {} draft saved: reconciled={}, {}/{} active checked, checklist complete={}",
            patient_id, status.is_reconciled, counts.checked_active, counts.total_active, status.checklist_complete
        );

        Ok(SaveDraftResponse {
            patient,
            is_reconciled: status.is_reconciled,
            total_active: counts.total_active,
            checked_active: counts.checked_active,
            checklist_complete: status.checklist_complete,
            message: status_message(&status).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ASKED: Checklist = Checklist {
        asked_otcs_topicals_injectables: true,
        asked_allergies: true,
        asked_medication_access: true,
    };

    fn counts(total_active: i64, checked_active: i64) -> ActiveReviewCounts {
        ActiveReviewCounts {
            total_active,
            checked_active,
        }
    }

    #[test]
    fn empty_active_list_is_never_reconciled() {
        for checklist in [Checklist::default(), ALL_ASKED] {
            let status = derive_status(counts(0, 0), checklist);
            assert!(!status.is_reconciled);
            assert!(!status.all_meds_checked);
        }
    }

    #[test]
    fn all_checked_with_full_checklist_is_reconciled() {
        let status = derive_status(counts(3, 3), ALL_ASKED);
        assert!(status.is_reconciled);
        assert_eq!(status_message(&status), MESSAGE_RECONCILED);
    }

    #[test]
    fn checked_meds_with_partial_checklist_asks_for_checklist() {
        let checklist = Checklist {
            asked_allergies: false,
            ..ALL_ASKED
        };
        let status = derive_status(counts(2, 2), checklist);
        assert!(!status.is_reconciled);
        assert!(status.all_meds_checked);
        assert!(!status.checklist_complete);
        assert_eq!(status_message(&status), MESSAGE_CHECKLIST_PENDING);
    }

    #[test]
    fn unchecked_meds_report_draft_saved() {
        let status = derive_status(counts(2, 1), ALL_ASKED);
        assert!(!status.is_reconciled);
        assert!(status.checklist_complete);
        assert_eq!(status_message(&status), MESSAGE_MEDICATIONS_PENDING);
    }
}
