// Common module - shared types and utilities across all modules

pub mod config;
pub mod dev_mode;
pub mod error;
pub mod helpers;
pub mod migrations;
pub mod response;
pub mod state;
pub mod validation;

#[cfg(test)]
pub mod testing;

// Re-export commonly used types for convenience
pub use error::ApiError;
pub use helpers::{safe_email_log, safe_token_log};
pub use response::ApiResponse;
pub use state::AppState;
pub use validation::{ValidationError, ValidationResult, Validator};

/// Result alias used by handlers and services
pub type ApiResult<T> = Result<T, ApiError>;

/// Fresh UUID v4 string for new rows
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
