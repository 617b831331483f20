// src/interviews/routes.rs

use axum::{
    routing::{get, patch, post},
    Router,
};

use super::handlers;

/// Create the interviews router
pub fn interviews_routes() -> Router {
    Router::new()
        .route("/api/schedule-interview", post(handlers::schedule_interview))
        .route("/api/interviews", get(handlers::list_interviews))
        .route("/api/interviews/:id", get(handlers::get_interview))
        .route(
            "/api/interviews/:id/status",
            patch(handlers::update_interview_status),
        )
        .route("/api/interviews/:id/cancel", post(handlers::cancel_interview))
}
