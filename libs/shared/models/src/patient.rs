use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub doctor_id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<String>,
    pub is_reconciled: bool,
    pub last_reconciled_at: Option<DateTime<Utc>>,
    pub asked_otcs_topicals_injectables: bool,
    pub asked_allergies: bool,
    pub asked_medication_access: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    pub fn checklist(&self) -> Checklist {
        Checklist {
            asked_otcs_topicals_injectables: self.asked_otcs_topicals_injectables,
            asked_allergies: self.asked_allergies,
            asked_medication_access: self.asked_medication_access,
        }
    }
}

/// Roster row: a patient plus the number of medications not soft-deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientSummary {
    #[serde(flatten)]
    pub patient: Patient,
    pub medication_count: i64,
}

/// Fields written on patient create and update.
#[derive(Debug, Clone, Default)]
pub struct PatientDetails {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<String>,
}

/// The three per-visit questions a clinician must affirm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checklist {
    pub asked_otcs_topicals_injectables: bool,
    pub asked_allergies: bool,
    pub asked_medication_access: bool,
}

impl Checklist {
    pub fn all_checked(&self) -> bool {
        self.asked_otcs_topicals_injectables && self.asked_allergies && self.asked_medication_access
    }
}

/// Active-medication review counts for one patient. Soft-deleted rows are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveReviewCounts {
    pub total_active: i64,
    pub checked_active: i64,
}
