// src/ai_processing/routes.rs

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Create the AI processing queue router
pub fn ai_processing_routes() -> Router {
    Router::new()
        .route("/api/ai-processing/enqueue", post(handlers::enqueue_task))
        .route(
            "/api/ai-processing/next-task",
            get(handlers::peek_next_task).post(handlers::claim_next_task),
        )
        .route("/api/ai-processing/start", post(handlers::start_task))
        .route("/api/ai-processing/complete", post(handlers::complete_task))
        .route("/api/ai-processing/tasks/:id", get(handlers::get_task))
        .route("/api/ai-processing/stats", get(handlers::queue_stats))
        .route("/api/ai-processing/process-next", post(handlers::process_next))
}
