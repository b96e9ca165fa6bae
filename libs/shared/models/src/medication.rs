use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MedicationStatus {
    Active,
    Archived,
}

impl MedicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MedicationStatus::Active => "active",
            MedicationStatus::Archived => "archived",
        }
    }
}

impl FromStr for MedicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(MedicationStatus::Active),
            "archived" => Ok(MedicationStatus::Archived),
            other => Err(format!("Unknown medication status: {}", other)),
        }
    }
}

impl fmt::Display for MedicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a medication was prescribed or self-sourced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Prescribed {
    Yes,
    No,
}

impl Prescribed {
    pub fn as_str(&self) -> &'static str {
        match self {
            Prescribed::Yes => "yes",
            Prescribed::No => "no",
        }
    }
}

impl FromStr for Prescribed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" => Ok(Prescribed::Yes),
            "no" => Ok(Prescribed::No),
            other => Err(format!("Prescribed must be yes or no, got {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    pub id: i64,
    pub patient_id: i64,
    pub name: String,
    pub strength: Option<String>,
    pub form: Option<String>,
    pub dose: Option<String>,
    pub frequency: Option<String>,
    pub prescribed: Option<Prescribed>,
    pub comments: Option<String>,
    pub intended_duration: Option<String>,
    pub status: MedicationStatus,
    pub is_taking: bool,
    pub archive_reason: Option<String>,
    pub archive_comments: Option<String>,
    pub added_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Medication {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Clinician-editable fields, shared by create and update.
#[derive(Debug, Clone, Default)]
pub struct MedicationDetails {
    pub name: String,
    pub strength: Option<String>,
    pub form: Option<String>,
    pub dose: Option<String>,
    pub frequency: Option<String>,
    pub prescribed: Option<Prescribed>,
    pub comments: Option<String>,
    pub intended_duration: Option<String>,
}

/// One checkbox in a save-draft snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TakingUpdate {
    pub id: i64,
    pub is_taking: bool,
}
