use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use shared_models::error::AppError;
use shared_utils::extractor::{ApiJson, ApiPath};
use shared_utils::AppState;

use crate::models::{CreatePatientRequest, PatientListQuery, SaveDraftRequest, SaveDraftResponse, UpdatePatientRequest};
use crate::services::{PatientService, ReconciliationService};

#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<AppState>,
    Query(query): Query<PatientListQuery>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&state);

    let patients = service.list_for_doctor(query.doctor_id).await?;

    Ok(Json(json!({ "patients": patients })))
}

#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreatePatientRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = PatientService::new(&state);

    let patient = service.create_patient(request).await?;

    Ok((StatusCode::CREATED, Json(json!({ "patient": patient }))))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<AppState>,
    ApiPath(patient_id): ApiPath<i64>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&state);

    let patient = service.get_patient(patient_id).await?;

    Ok(Json(json!({ "patient": patient })))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<AppState>,
    ApiPath(patient_id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&state);

    let patient = service.update_patient(patient_id, request).await?;

    Ok(Json(json!({ "patient": patient })))
}

#[axum::debug_handler]
pub async fn delete_patient(
    State(state): State<AppState>,
    ApiPath(patient_id): ApiPath<i64>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&state);

    service.delete_patient(patient_id).await?;

    Ok(Json(json!({ "message": "Patient deleted successfully" })))
}

#[axum::debug_handler]
pub async fn save_draft(
    State(state): State<AppState>,
    ApiPath(patient_id): ApiPath<i64>,
    ApiJson(request): ApiJson<SaveDraftRequest>,
) -> Result<Json<SaveDraftResponse>, AppError> {
    let service = ReconciliationService::new(&state);

    let summary = service.save_draft(patient_id, request).await?;

    Ok(Json(summary))
}
