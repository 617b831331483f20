// src/notifications/routes.rs

use axum::{
    routing::{get, patch, post},
    Router,
};

use super::handlers;

/// Create the email and notifications router
pub fn notifications_routes() -> Router {
    Router::new()
        .route("/api/send-email", post(handlers::send_email))
        .route("/api/notifications", get(handlers::list_notifications))
        .route("/api/notifications/read-all", post(handlers::mark_all_read))
        .route("/api/notifications/:id/read", patch(handlers::mark_read))
}
