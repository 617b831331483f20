// src/admin/routes.rs

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};

use super::handlers;

pub fn admin_routes() -> Router {
    Router::new()
        .route("/api/admin/create-user", post(handlers::create_user))
        .route("/api/admin/users", get(handlers::list_users))
        .route("/api/admin/users/:id", delete(handlers::delete_user))
        .route("/api/admin/users/:id/role", put(handlers::update_user_role))
        .route(
            "/api/admin/users/:id/status",
            patch(handlers::update_user_status),
        )
}
