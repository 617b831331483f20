// src/candidates/routes.rs

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
    Router,
};

use super::handlers;
use super::models::MAX_ATTACHMENT_BYTES;

/// Multipart framing on top of the file itself
const UPLOAD_BODY_LIMIT: usize = MAX_ATTACHMENT_BYTES + 64 * 1024;

/// Create the candidates router
pub fn candidates_routes() -> Router {
    Router::new()
        .route(
            "/api/candidates",
            post(handlers::create_candidate).get(handlers::list_candidates),
        )
        .route(
            "/api/candidates/:id",
            get(handlers::get_candidate)
                .put(handlers::update_candidate)
                .delete(handlers::delete_candidate),
        )
        // Pipeline
        .route(
            "/api/applications/:id/candidates",
            post(handlers::add_candidate_to_application),
        )
        .route(
            "/api/postulations/:id/stage",
            patch(handlers::update_postulation_stage),
        )
        // Notes
        .route(
            "/api/candidates/:id/notes",
            post(handlers::create_note).get(handlers::list_notes),
        )
        .route("/api/notes/:id", delete(handlers::delete_note))
        // Evaluations
        .route(
            "/api/candidates/:id/evaluations",
            post(handlers::create_evaluation).get(handlers::list_evaluations),
        )
        // Attachments
        .route(
            "/api/candidates/:id/attachments",
            post(handlers::upload_attachment)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
                .get(handlers::list_attachments),
        )
        .route("/api/attachments/:id/url", get(handlers::attachment_url))
        .route("/api/attachments/:id", delete(handlers::delete_attachment))
        // Timeline
        .route("/api/candidates/:id/timeline", get(handlers::get_timeline))
}
