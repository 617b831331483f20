// Error handling types for the API

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::fmt;
use tracing::error;

use super::validation::ValidationResult;
use crate::services::{AiError, AuthAdminError, EmailError, GoogleError, StorageError};

/// API error types
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    Forbidden(String),
    BadRequest(String),
    NotFound(String),
    InternalServer(String),
    /// Internal failure carrying an extra hint for the caller
    InternalWithMessage { error: String, message: String },
    ExternalService(String),
    DatabaseError(sqlx::Error),
    ValidationError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::InternalServer(msg) => write!(f, "Internal Server Error: {}", msg),
            ApiError::InternalWithMessage { error, message } => {
                write!(f, "Internal Server Error: {} ({})", error, message)
            }
            ApiError::ExternalService(msg) => write!(f, "External Service Error: {}", msg),
            ApiError::DatabaseError(e) => write!(f, "Database Error: {}", e),
            ApiError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

/// JSON failure envelope: `{ success: false, error, code, message? }`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InternalServer(_)
            | ApiError::InternalWithMessage { .. }
            | ApiError::ExternalService(_)
            | ApiError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn forbidden() -> Self {
        ApiError::Forbidden("No tienes permisos para realizar esta acción".to_string())
    }

    /// Write error where a UNIQUE constraint failure means the row already exists
    pub fn duplicate_or_database(e: sqlx::Error, duplicate_message: &str) -> Self {
        if is_unique_violation(&e) {
            ApiError::BadRequest(duplicate_message.to_string())
        } else {
            ApiError::DatabaseError(e)
        }
    }
}

pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let (error_message, code, message) = match self {
            ApiError::Unauthorized(msg) => (msg, "UNAUTHORIZED", None),
            ApiError::Forbidden(msg) => (msg, "FORBIDDEN", None),
            ApiError::BadRequest(msg) => (msg, "BAD_REQUEST", None),
            ApiError::NotFound(msg) => (msg, "NOT_FOUND", None),
            ApiError::InternalServer(msg) => (msg, "INTERNAL_SERVER_ERROR", None),
            ApiError::InternalWithMessage { error, message } => {
                (error, "INTERNAL_SERVER_ERROR", Some(message))
            }
            ApiError::ExternalService(msg) => (msg, "EXTERNAL_SERVICE_ERROR", None),
            ApiError::DatabaseError(e) => {
                error!(error = %e, "Database error occurred");
                (
                    "Error al acceder a la base de datos".to_string(),
                    "DATABASE_ERROR",
                    None,
                )
            }
            ApiError::ValidationError(msg) => (msg, "VALIDATION_ERROR", None),
        };

        let error_response = ErrorResponse {
            success: false,
            error: error_message,
            code: code.to_string(),
            message,
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::DatabaseError(e)
    }
}

/// Helper function to convert ValidationResult to ApiError
impl From<ValidationResult> for ApiError {
    fn from(result: ValidationResult) -> Self {
        if result.is_valid {
            ApiError::InternalServer(
                "Validation result was valid but converted to error".to_string(),
            )
        } else {
            // The first message is the one shown to the user
            let error_messages: Vec<String> =
                result.errors.iter().map(|e| e.message.clone()).collect();
            ApiError::ValidationError(error_messages.join(". "))
        }
    }
}

// ============================================================================
// Integration errors
// ============================================================================

impl From<AuthAdminError> for ApiError {
    fn from(e: AuthAdminError) -> Self {
        match e {
            AuthAdminError::AlreadyRegistered => {
                ApiError::BadRequest("Ya existe un usuario con ese email".to_string())
            }
            AuthAdminError::NotConfigured => ApiError::InternalServer(
                "El servicio de autenticación no está configurado".to_string(),
            ),
            other => ApiError::ExternalService(format!(
                "Error en el servicio de autenticación: {}",
                other
            )),
        }
    }
}

impl From<EmailError> for ApiError {
    fn from(e: EmailError) -> Self {
        match e {
            EmailError::NotConfigured => ApiError::InternalServer(
                "El servicio de correo no está configurado".to_string(),
            ),
            EmailError::NoRecipients => {
                ApiError::BadRequest("Debe indicar al menos un destinatario".to_string())
            }
            other => ApiError::ExternalService(format!("Error al enviar el correo: {}", other)),
        }
    }
}

impl From<GoogleError> for ApiError {
    fn from(e: GoogleError) -> Self {
        match e {
            GoogleError::NotConfigured => ApiError::InternalServer(
                "Google Calendar no está configurado".to_string(),
            ),
            other => ApiError::ExternalService(format!(
                "Error al crear el evento en Google Calendar: {}",
                other
            )),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(_) => {
                ApiError::NotFound("Archivo no encontrado en el almacenamiento".to_string())
            }
            StorageError::NotConfigured => ApiError::InternalServer(
                "El almacenamiento de archivos no está configurado".to_string(),
            ),
            other => ApiError::ExternalService(format!("Error de almacenamiento: {}", other)),
        }
    }
}

impl From<AiError> for ApiError {
    fn from(e: AiError) -> Self {
        match e {
            AiError::NotConfigured => {
                ApiError::InternalServer("El análisis de IA no está configurado".to_string())
            }
            other => ApiError::ExternalService(format!("Error en el análisis de IA: {}", other)),
        }
    }
}
