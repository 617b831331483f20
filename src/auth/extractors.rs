//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use super::models::{Claims, User, SUPABASE_AUDIENCE};
use super::permissions::{permissions_for_role, Permission, Role};
use crate::common::dev_mode::DEV_USER_ID;
use crate::common::{safe_email_log, ApiError, AppState};

/// Authenticated dashboard user
///
/// Validates the Supabase access token and loads the matching `users` row.
/// Permissions come from the stored role.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub permissions: Vec<Permission>,
}

impl AuthedUser {
    pub fn has(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    /// 403 unless the user holds `permission`
    pub fn require(&self, permission: Permission) -> Result<(), ApiError> {
        if self.has(permission) {
            Ok(())
        } else {
            warn!(
                user_id = %self.id,
                permission = permission.as_str(),
                "Access denied: missing permission"
            );
            Err(ApiError::forbidden())
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let header = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ").unwrap_or(header).trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

async fn app_state<S: Send + Sync>(parts: &mut Parts, state: &S) -> Result<AppState, ApiError> {
    let Extension(state_lock): Extension<Arc<RwLock<AppState>>> =
        Extension::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;
    let app_state = state_lock.read().await.clone();
    Ok(app_state)
}

/// Verifies a Supabase HS256 access token and returns its claims
pub fn verify_access_token(token: &str, jwt_secret: &str) -> Result<Claims, ApiError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[SUPABASE_AUDIENCE]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        warn!(error = %e, "JWT token validation failed");
        ApiError::Unauthorized("Token inválido o expirado".into())
    })
}

async fn load_user(app_state: &AppState, token: &str) -> Result<AuthedUser, ApiError> {
    let claims = verify_access_token(token, &app_state.config.supabase.jwt_secret)?;

    let user: Option<User> = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(&claims.sub)
        .fetch_optional(&app_state.db)
        .await
        .map_err(|e| {
            error!(
                error = %e,
                user_id = %claims.sub,
                "Database error during user lookup in authentication"
            );
            ApiError::DatabaseError(e)
        })?;

    let user = match user {
        Some(u) if u.is_active => u,
        Some(u) => {
            warn!(user_id = %u.id, "Authentication failed: user is inactive");
            return Err(ApiError::Unauthorized("Usuario desactivado".into()));
        }
        None => {
            warn!(user_id = %claims.sub, "Authentication failed: user not found in database");
            return Err(ApiError::Unauthorized("Usuario no encontrado".into()));
        }
    };

    let role = Role::parse(&user.role).ok_or_else(|| {
        error!(user_id = %user.id, role = %user.role, "Stored role is not recognised");
        ApiError::Forbidden("Rol inválido".into())
    })?;

    debug!(
        user_id = %user.id,
        email = %safe_email_log(&user.email),
        role = role.as_str(),
        "User authentication successful via extractor"
    );

    Ok(AuthedUser {
        id: user.id,
        email: user.email,
        full_name: user.full_name,
        role,
        permissions: permissions_for_role(role),
    })
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = app_state(parts, state).await?;

        // DEV MODE: Bypass authentication completely
        if app_state.dev_mode.is_enabled() {
            let dev = &app_state.dev_mode;
            debug!(
                email = %safe_email_log(&dev.user_email),
                role = dev.user_role.as_str(),
                "DEV MODE: Authentication bypassed"
            );
            return Ok(AuthedUser {
                id: DEV_USER_ID.to_string(),
                email: dev.user_email.clone(),
                full_name: dev.user_name.clone(),
                role: dev.user_role,
                permissions: permissions_for_role(dev.user_role),
            });
        }

        let token = bearer_token(parts).ok_or_else(|| {
            warn!("Authentication failed: missing Authorization header");
            ApiError::Unauthorized("No autenticado".into())
        })?;

        load_user(&app_state, &token).await
    }
}

/// Caller of the AI queue endpoints
///
/// External workers authenticate with the `x-worker-token` header; dashboard
/// users need the `procesar_ia` permission.
#[derive(Debug, Clone)]
pub enum QueueCaller {
    Worker,
    User(AuthedUser),
}

pub const WORKER_TOKEN_HEADER: &str = "x-worker-token";

impl QueueCaller {
    /// Identifier stored as `requested_by` / default worker id
    pub fn actor_id(&self) -> String {
        match self {
            QueueCaller::Worker => "worker".to_string(),
            QueueCaller::User(user) => user.id.clone(),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for QueueCaller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = app_state(parts, state).await?;

        if let Some(presented) = parts
            .headers
            .get(WORKER_TOKEN_HEADER)
            .and_then(|h| h.to_str().ok())
        {
            return match app_state.config.ai.worker_token.as_deref() {
                Some(expected) if expected == presented => Ok(QueueCaller::Worker),
                _ => {
                    warn!("Queue access denied: invalid worker token");
                    Err(ApiError::Unauthorized("Token de worker inválido".into()))
                }
            };
        }

        let user = AuthedUser::from_request_parts(parts, state).await?;
        user.require(Permission::ProcessAi)?;
        Ok(QueueCaller::User(user))
    }
}
