use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use auth_cell::router::auth_routes;
use medication_cell::router::medication_routes;
use patient_cell::router::patient_routes;
use shared_utils::AppState;

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "message": "Reconcila API is running" }))
}

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .nest("/auth", auth_routes(state.clone()))
        .merge(patient_routes(state.clone()))
        .merge(medication_routes(state));

    Router::new()
        .route("/", get(|| async { "Reconcila API is running!" }))
        .nest("/api", api)
}
