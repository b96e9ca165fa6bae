use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::{AppConfig, IN_MEMORY_DATABASE};
use shared_database::{doctors, Database};
use shared_models::doctor::{Doctor, NewDoctor};

use crate::password::hash_password;
use crate::state::AppState;

pub struct TestConfig {
    pub port: u16,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self { port: 0 }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            port: self.port,
            database_path: IN_MEMORY_DATABASE.to_string(),
            seed_doctor: None,
        }
    }

    /// Fresh state over a private in-memory store.
    pub fn to_state(&self) -> AppState {
        let db = Database::open_in_memory().expect("in-memory database opens");
        AppState::new(self.to_app_config(), db)
    }
}

pub struct TestDoctor {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl Default for TestDoctor {
    fn default() -> Self {
        Self {
            email: format!("doctor-{}@example.com", Uuid::new_v4()),
            password: "password123".to_string(),
            first_name: "Test".to_string(),
            last_name: "Doctor".to_string(),
        }
    }
}

impl TestDoctor {
    pub fn with_email(email: &str) -> Self {
        Self {
            email: email.to_string(),
            ..Self::default()
        }
    }

    /// Insert this doctor with a real password hash.
    pub async fn insert(&self, state: &AppState) -> Doctor {
        let new_doctor = NewDoctor {
            email: self.email.clone(),
            password_hash: hash_password(&self.password).expect("password hashes"),
            first_name: Some(self.first_name.clone()),
            last_name: Some(self.last_name.clone()),
        };
        state
            .db
            .run(move |conn| doctors::insert_doctor(conn, &new_doctor, Utc::now()))
            .await
            .expect("doctor inserts")
    }

    pub fn login_body(&self) -> Value {
        json!({
            "email": self.email,
            "password": self.password,
        })
    }
}

pub struct MockRequests;

impl MockRequests {
    pub fn create_patient(doctor_id: i64, name: &str) -> Value {
        json!({
            "doctorId": doctor_id,
            "name": name,
            "email": format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            "phone": "555-0100",
            "dateOfBirth": "1970-01-01"
        })
    }

    pub fn create_medication(name: &str) -> Value {
        json!({
            "name": name,
            "strength": "10 mg",
            "form": "tablet",
            "dose": "1",
            "frequency": "once daily",
            "prescribed": "yes",
            "comments": null,
            "intendedDuration": "ongoing"
        })
    }

    pub fn save_draft(statuses: &[(i64, bool)], checklist: Option<[bool; 3]>) -> Value {
        let medication_statuses: Vec<Value> = statuses
            .iter()
            .map(|(id, is_taking)| json!({ "id": id, "isTaking": is_taking }))
            .collect();

        match checklist {
            Some([otcs, allergies, access]) => json!({
                "medicationStatuses": medication_statuses,
                "checklist": {
                    "askedOtcs": otcs,
                    "askedAllergies": allergies,
                    "askedMedicationAccess": access
                }
            }),
            None => json!({ "medicationStatuses": medication_statuses }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default().to_app_config();
        assert!(config.is_in_memory());
        assert!(!config.is_seed_configured());
    }

    #[test]
    fn test_doctor_emails_are_unique() {
        assert_ne!(TestDoctor::default().email, TestDoctor::default().email);
    }

    #[test]
    fn test_doctor_insert_hashes_password() {
        let state = TestConfig::default().to_state();
        let doctor = tokio_test::block_on(TestDoctor::with_email("doc@example.com").insert(&state));
        assert_eq!(doctor.email, "doc@example.com");
        assert_ne!(doctor.password_hash, "password123");
    }

    #[test]
    fn save_draft_body_shape() {
        let body = MockRequests::save_draft(&[(1, true)], Some([true, true, false]));
        assert_eq!(body["medicationStatuses"][0]["isTaking"], true);
        assert_eq!(body["checklist"]["askedMedicationAccess"], false);
    }
}
