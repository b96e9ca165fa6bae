use chrono::{NaiveDate, Utc};
use tracing::{debug, info};

use shared_database::{doctors, patients, DatabaseError};
use shared_models::patient::{Patient, PatientDetails, PatientSummary};
use shared_utils::extractor::non_blank;
use shared_utils::AppState;

use crate::models::{CreatePatientRequest, PatientError, UpdatePatientRequest};

/// Validate and normalise the demographic fields shared by create and update.
fn patient_details(
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    date_of_birth: Option<String>,
    missing_name: &str,
) -> Result<PatientDetails, PatientError> {
    let name = non_blank(name).ok_or_else(|| PatientError::Validation(missing_name.to_string()))?;

    let date_of_birth = non_blank(date_of_birth);
    if let Some(dob) = &date_of_birth {
        NaiveDate::parse_from_str(dob, "%Y-%m-%d").map_err(|_| PatientError::InvalidDateOfBirth)?;
    }

    Ok(PatientDetails {
        name,
        email: non_blank(email),
        phone: non_blank(phone),
        date_of_birth,
    })
}

pub struct PatientService {
    state: AppState,
}

impl PatientService {
    pub fn new(state: &AppState) -> Self {
        Self {
            state: state.clone(),
        }
    }

    pub async fn list_for_doctor(&self, doctor_id: Option<String>) -> Result<Vec<PatientSummary>, PatientError> {
        let doctor_id = non_blank(doctor_id)
            .and_then(|raw| raw.parse::<i64>().ok())
            .ok_or_else(|| PatientError::Validation("Doctor ID required".to_string()))?;
        debug!("Listing patients for doctor {}", doctor_id);

        let roster = self
            .state
            .db
            .run(move |conn| patients::list_by_doctor(conn, doctor_id))
            .await?;
        Ok(roster)
    }

    pub async fn create_patient(&self, request: CreatePatientRequest) -> Result<Patient, PatientError> {
        let doctor_id = request.doctor_id;
        let details = patient_details(
            request.name,
            request.email,
            request.phone,
            request.date_of_birth,
            "Doctor ID and name required",
        )?;
        let doctor_id =
            doctor_id.ok_or_else(|| PatientError::Validation("Doctor ID and name required".to_string()))?;
        debug!("Creating patient for doctor {}", doctor_id);

        let patient = self
            .state
            .db
            .run(move |conn| {
                if doctors::find_by_id(conn, doctor_id)?.is_none() {
                    return Err(DatabaseError::NotFound { entity: "Doctor", id: doctor_id });
                }
                patients::insert_patient(conn, doctor_id, &details, Utc::now())
            })
            .await?;

        info!("Created patient {} for doctor {}", patient.id, doctor_id);
        Ok(patient)
    }

    pub async fn get_patient(&self, patient_id: i64) -> Result<Patient, PatientError> {
        debug!("Fetching patient {}", patient_id);

        self.state
            .db
            .run(move |conn| patients::find_by_id(conn, patient_id))
            .await?
            .ok_or(PatientError::NotFound)
    }

    pub async fn update_patient(
        &self,
        patient_id: i64,
        request: UpdatePatientRequest,
    ) -> Result<Patient, PatientError> {
        let details = patient_details(
            request.name,
            request.email,
            request.phone,
            request.date_of_birth,
            "Name required",
        )?;
        debug!("Updating patient {}", patient_id);

        let patient = self
            .state
            .db
            .run(move |conn| {
                if patients::update_patient(conn, patient_id, &details, Utc::now())? == 0 {
                    return Ok(None);
                }
                patients::find_by_id(conn, patient_id)
            })
            .await?
            .ok_or(PatientError::NotFound)?;

        info!("Updated patient {}", patient_id);
        Ok(patient)
    }

    pub async fn delete_patient(&self, patient_id: i64) -> Result<(), PatientError> {
        let changes = self
            .state
            .db
            .run(move |conn| patients::delete_patient(conn, patient_id))
            .await?;

        if changes == 0 {
            return Err(PatientError::NotFound);
        }

        info!("Deleted patient {} and its medications", patient_id);
        Ok(())
    }
}
