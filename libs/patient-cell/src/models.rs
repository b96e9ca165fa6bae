use serde::{Deserialize, Serialize};

use shared_database::DatabaseError;
use shared_models::error::AppError;
use shared_models::medication::TakingUpdate;
use shared_models::patient::{Checklist, Patient};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientListQuery {
    pub doctor_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePatientRequest {
    pub doctor_id: Option<i64>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePatientRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<String>,
}

/// Checklist as the client sends it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChecklistRequest {
    pub asked_otcs: bool,
    pub asked_allergies: bool,
    pub asked_medication_access: bool,
}

impl From<ChecklistRequest> for Checklist {
    fn from(request: ChecklistRequest) -> Self {
        Checklist {
            asked_otcs_topicals_injectables: request.asked_otcs,
            asked_allergies: request.asked_allergies,
            asked_medication_access: request.asked_medication_access,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDraftRequest {
    pub medication_statuses: Option<Vec<TakingUpdate>>,
    pub checklist: Option<ChecklistRequest>,
}

/// Outcome of deriving reconciliation from counts and checklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconciliationStatus {
    pub is_reconciled: bool,
    pub all_meds_checked: bool,
    pub checklist_complete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDraftResponse {
    pub patient: Patient,
    pub is_reconciled: bool,
    pub total_active: i64,
    pub checked_active: i64,
    pub checklist_complete: bool,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("{0}")]
    Validation(String),

    #[error("Invalid date of birth")]
    InvalidDateOfBirth,

    #[error("Medication {0} is not an active medication of this patient")]
    InvalidSnapshot(i64),

    #[error(transparent)]
    Database(DatabaseError),
}

impl From<DatabaseError> for PatientError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity: "Patient", .. } => PatientError::NotFound,
            DatabaseError::NotFound { entity: "Doctor", .. } => PatientError::DoctorNotFound,
            DatabaseError::NotFound { entity: "Active medication", id } => PatientError::InvalidSnapshot(id),
            other => PatientError::Database(other),
        }
    }
}

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound | PatientError::DoctorNotFound => AppError::NotFound(err.to_string()),
            PatientError::Validation(msg) => AppError::ValidationError(msg),
            PatientError::InvalidDateOfBirth | PatientError::InvalidSnapshot(_) => {
                AppError::ValidationError(err.to_string())
            }
            PatientError::Database(db) => db.into(),
        }
    }
}
