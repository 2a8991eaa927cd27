pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;
use crate::submission::handlers;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/submissions", post(handlers::handle_submit))
        .route(
            "/api/v1/sessions/:session_id",
            get(handlers::handle_session_status),
        )
        .route(
            "/api/v1/sessions/:session_id/document",
            get(handlers::handle_download),
        )
        .with_state(state)
}
