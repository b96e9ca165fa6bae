use serde::{Deserialize, Serialize};

use shared_database::DatabaseError;
use shared_models::catalog::NewCatalogEntry;
use shared_models::error::AppError;
use shared_models::medication::{Medication, MedicationStatus};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMedicationRequest {
    pub name: Option<String>,
    pub strength: Option<String>,
    pub form: Option<String>,
    pub dose: Option<String>,
    pub frequency: Option<String>,
    pub prescribed: Option<String>,
    pub comments: Option<String>,
    pub intended_duration: Option<String>,
}

/// Full replacement of the editable fields.
pub type UpdateMedicationRequest = CreateMedicationRequest;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
    pub archive_reason: Option<String>,
    pub archive_comments: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTakingRequest {
    pub is_taking: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveInfoRequest {
    pub archive_reason: Option<String>,
    pub archive_comments: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSearchQuery {
    pub query: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogImportRequest {
    pub entries: Vec<NewCatalogEntry>,
}

/// Result of the duplicate-history lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviousEntry {
    pub found: bool,
    pub medication: Option<Medication>,
}

impl From<Option<Medication>> for PreviousEntry {
    fn from(medication: Option<Medication>) -> Self {
        Self {
            found: medication.is_some(),
            medication,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MedicationError {
    #[error("Medication not found")]
    NotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("{0}")]
    Validation(String),

    #[error("Invalid status. Must be active or archived")]
    InvalidStatus,

    #[error("Medication {0} has been deleted")]
    Deleted(i64),

    #[error("Medication {0} is not archived")]
    NotArchived(i64),

    #[error("Cannot change medication status from {from} to {to}")]
    InvalidTransition {
        from: MedicationStatus,
        to: MedicationStatus,
    },

    #[error(transparent)]
    Database(DatabaseError),
}

impl From<DatabaseError> for MedicationError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity: "Patient", .. } => MedicationError::PatientNotFound,
            DatabaseError::NotFound { entity: "Medication", .. } => MedicationError::NotFound,
            other => MedicationError::Database(other),
        }
    }
}

impl From<MedicationError> for AppError {
    fn from(err: MedicationError) -> Self {
        match err {
            MedicationError::NotFound | MedicationError::PatientNotFound => AppError::NotFound(err.to_string()),
            MedicationError::Validation(msg) => AppError::ValidationError(msg),
            MedicationError::InvalidStatus => AppError::ValidationError(err.to_string()),
            MedicationError::Deleted(_)
            | MedicationError::NotArchived(_)
            | MedicationError::InvalidTransition { .. } => AppError::Conflict(err.to_string()),
            MedicationError::Database(db) => db.into(),
        }
    }
}
