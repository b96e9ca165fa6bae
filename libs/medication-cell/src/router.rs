use axum::{
    routing::{get, patch, post},
    Router,
};

use shared_utils::AppState;

use crate::handlers::*;

pub fn medication_routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/patients/{patient_id}/medications",
            get(list_medications).post(create_medication),
        )
        .route("/patients/{patient_id}/medications/active", get(list_active_medications))
        .route("/patients/{patient_id}/medications/archived", get(list_archived_medications))
        .route("/patients/{patient_id}/medications/deleted", get(list_deleted_medications))
        .route(
            "/patients/{patient_id}/medications/check-deleted/{name}",
            get(check_deleted),
        )
        .route(
            "/medications/{medication_id}",
            get(get_medication).put(update_medication).delete(delete_medication),
        )
        .route("/medications/{medication_id}/status", patch(update_status))
        .route("/medications/{medication_id}/taking", patch(update_taking))
        .route("/medications/{medication_id}/archive-info", patch(update_archive_info))
        .route("/medication-catalog", get(list_catalog))
        .route("/medication-catalog/search", get(search_catalog))
        .route("/medication-catalog/import", post(import_catalog))
        .with_state(state)
}
