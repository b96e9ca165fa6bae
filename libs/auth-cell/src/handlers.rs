use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use tracing::debug;

use shared_models::error::AppError;
use shared_utils::extractor::ApiJson;
use shared_utils::AppState;

use crate::models::{LoginRequest, RegisterRequest};
use crate::services::AuthService;

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    debug!("Handling login");
    let service = AuthService::new(&state);

    let doctor = service.login(request).await?;

    Ok(Json(json!({ "doctor": doctor })))
}

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    debug!("Handling registration");
    let service = AuthService::new(&state);

    let doctor = service.register(request).await?;

    Ok((StatusCode::CREATED, Json(json!({ "doctor": doctor }))))
}
