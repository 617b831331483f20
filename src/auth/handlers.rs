//! Authentication handlers

use axum::response::IntoResponse;

use super::extractors::AuthedUser;
use super::models::CurrentUser;
use crate::common::{ApiError, ApiResponse};

/// GET /api/me - Current user with role and permissions
pub async fn me_handler(authed: AuthedUser) -> Result<impl IntoResponse, ApiError> {
    let current = CurrentUser {
        permissions: authed
            .permissions
            .iter()
            .map(|p| p.as_str().to_string())
            .collect(),
        role: authed.role.as_str().to_string(),
        id: authed.id,
        email: authed.email,
        full_name: authed.full_name,
    };

    Ok(ApiResponse::ok(current))
}
