// src/ai_processing/mod.rs
//! AI processing queue: enqueue, claim, complete, plus an optional in-process worker

pub mod handlers;
pub mod models;
pub mod queue;
pub mod routes;
pub mod validators;
pub mod worker;


pub use queue::AiQueue;
pub use routes::ai_processing_routes;
