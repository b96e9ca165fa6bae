use axum::{routing::{get, post}, Router};

use shared_utils::AppState;

use crate::handlers::*;

pub fn patient_routes(state: AppState) -> Router {
    Router::new()
        .route("/patients", get(list_patients).post(create_patient))
        .route(
            "/patients/{patient_id}",
            get(get_patient).put(update_patient).delete(delete_patient),
        )
        .route("/patients/{patient_id}/save-draft", post(save_draft))
        .with_state(state)
}
