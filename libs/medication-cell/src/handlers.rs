use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use shared_database::medications::MedicationView;
use shared_models::error::AppError;
use shared_utils::extractor::{ApiJson, ApiPath};
use shared_utils::AppState;

use crate::models::{
    ArchiveInfoRequest, CatalogImportRequest, CatalogSearchQuery, CreateMedicationRequest, PreviousEntry,
    UpdateMedicationRequest, UpdateStatusRequest, UpdateTakingRequest,
};
use crate::services::{CatalogService, MedicationService};

async fn list_view(state: &AppState, patient_id: i64, view: MedicationView) -> Result<Json<Value>, AppError> {
    let service = MedicationService::new(state);

    let medications = service.list(patient_id, view).await?;

    Ok(Json(json!({ "medications": medications })))
}

#[axum::debug_handler]
pub async fn list_medications(
    State(state): State<AppState>,
    ApiPath(patient_id): ApiPath<i64>,
) -> Result<Json<Value>, AppError> {
    list_view(&state, patient_id, MedicationView::All).await
}

#[axum::debug_handler]
pub async fn list_active_medications(
    State(state): State<AppState>,
    ApiPath(patient_id): ApiPath<i64>,
) -> Result<Json<Value>, AppError> {
    list_view(&state, patient_id, MedicationView::Active).await
}

#[axum::debug_handler]
pub async fn list_archived_medications(
    State(state): State<AppState>,
    ApiPath(patient_id): ApiPath<i64>,
) -> Result<Json<Value>, AppError> {
    list_view(&state, patient_id, MedicationView::Archived).await
}

#[axum::debug_handler]
pub async fn list_deleted_medications(
    State(state): State<AppState>,
    ApiPath(patient_id): ApiPath<i64>,
) -> Result<Json<Value>, AppError> {
    list_view(&state, patient_id, MedicationView::Deleted).await
}

#[axum::debug_handler]
pub async fn check_deleted(
    State(state): State<AppState>,
    ApiPath((patient_id, name)): ApiPath<(i64, String)>,
) -> Result<Json<PreviousEntry>, AppError> {
    let service = MedicationService::new(&state);

    let previous = service.check_previous_entry(patient_id, name).await?;

    Ok(Json(previous))
}

#[axum::debug_handler]
pub async fn create_medication(
    State(state): State<AppState>,
    ApiPath(patient_id): ApiPath<i64>,
    ApiJson(request): ApiJson<CreateMedicationRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = MedicationService::new(&state);

    let medication = service.create(patient_id, request).await?;

    Ok((StatusCode::CREATED, Json(json!({ "medication": medication }))))
}

#[axum::debug_handler]
pub async fn get_medication(
    State(state): State<AppState>,
    ApiPath(medication_id): ApiPath<i64>,
) -> Result<Json<Value>, AppError> {
    let service = MedicationService::new(&state);

    let medication = service.get(medication_id).await?;

    Ok(Json(json!({ "medication": medication })))
}

#[axum::debug_handler]
pub async fn update_medication(
    State(state): State<AppState>,
    ApiPath(medication_id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateMedicationRequest>,
) -> Result<Json<Value>, AppError> {
    let service = MedicationService::new(&state);

    let medication = service.update(medication_id, request).await?;

    Ok(Json(json!({ "medication": medication })))
}

#[axum::debug_handler]
pub async fn update_status(
    State(state): State<AppState>,
    ApiPath(medication_id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let service = MedicationService::new(&state);

    let medication = service.update_status(medication_id, request).await?;

    Ok(Json(json!({ "medication": medication })))
}

#[axum::debug_handler]
pub async fn update_taking(
    State(state): State<AppState>,
    ApiPath(medication_id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateTakingRequest>,
) -> Result<Json<Value>, AppError> {
    let service = MedicationService::new(&state);

    let medication = service.update_taking(medication_id, request).await?;

    Ok(Json(json!({ "medication": medication })))
}

#[axum::debug_handler]
pub async fn update_archive_info(
    State(state): State<AppState>,
    ApiPath(medication_id): ApiPath<i64>,
    ApiJson(request): ApiJson<ArchiveInfoRequest>,
) -> Result<Json<Value>, AppError> {
    let service = MedicationService::new(&state);

    let medication = service.update_archive_info(medication_id, request).await?;

    Ok(Json(json!({ "medication": medication })))
}

#[axum::debug_handler]
pub async fn delete_medication(
    State(state): State<AppState>,
    ApiPath(medication_id): ApiPath<i64>,
) -> Result<Json<Value>, AppError> {
    let service = MedicationService::new(&state);

    service.delete(medication_id).await?;

    Ok(Json(json!({ "message": "Medication deleted successfully" })))
}

#[axum::debug_handler]
pub async fn list_catalog(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let service = CatalogService::new(&state);

    let medications = service.list().await?;

    Ok(Json(json!({ "medications": medications })))
}

#[axum::debug_handler]
pub async fn search_catalog(
    State(state): State<AppState>,
    Query(query): Query<CatalogSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let service = CatalogService::new(&state);

    let medications = service.search(query.query).await?;

    Ok(Json(json!({ "medications": medications })))
}

#[axum::debug_handler]
pub async fn import_catalog(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CatalogImportRequest>,
) -> Result<Json<Value>, AppError> {
    let service = CatalogService::new(&state);

    let imported = service.import(request.entries).await?;

    Ok(Json(json!({ "imported": imported })))
}
