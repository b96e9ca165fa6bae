use axum::{routing::post, Router};

use shared_utils::AppState;

use crate::handlers;

pub fn auth_routes(state: AppState) -> Router {
    Router::new()
        .route("/login", post(handlers::login))
        .route("/register", post(handlers::register))
        .with_state(state)
}
