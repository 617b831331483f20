// src/services/supabase_auth.rs
//! Supabase Auth admin client (`/auth/v1/admin/users`)

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::common::config::SupabaseConfig;
use crate::common::safe_email_log;

#[derive(Debug, Error)]
pub enum AuthAdminError {
    #[error("Supabase Auth not configured")]
    NotConfigured,

    #[error("A user with this email is already registered")]
    AlreadyRegistered,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Auth API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Data needed to register a dashboard user in Supabase Auth
#[derive(Debug, Clone)]
pub struct NewAuthUser {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

/// Administrative operations on the identity provider
#[async_trait]
pub trait AuthAdmin: Send + Sync {
    async fn create_user(&self, user: &NewAuthUser) -> Result<AuthUser, AuthAdminError>;
    async fn delete_user(&self, user_id: &str) -> Result<(), AuthAdminError>;
}

#[derive(Debug, Serialize)]
struct CreateUserBody<'a> {
    email: &'a str,
    password: &'a str,
    email_confirm: bool,
    user_metadata: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct SupabaseAuthAdmin {
    client: Client,
    base_url: Option<String>,
    service_role_key: Option<String>,
}

impl SupabaseAuthAdmin {
    pub fn new(config: &SupabaseConfig, client: Client) -> Self {
        Self {
            client,
            base_url: config.url.clone(),
            service_role_key: config.service_role_key.clone(),
        }
    }

    fn credentials(&self) -> Result<(&str, &str), AuthAdminError> {
        match (self.base_url.as_deref(), self.service_role_key.as_deref()) {
            (Some(url), Some(key)) => Ok((url, key)),
            _ => Err(AuthAdminError::NotConfigured),
        }
    }
}

/// Pulls a human readable message out of a Supabase error body
pub fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["msg", "message", "error_description", "error"]
                .iter()
                .find_map(|key| value.get(*key).and_then(|v| v.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| body.to_string())
}

fn is_duplicate_email(status: StatusCode, message: &str) -> bool {
    let lower = message.to_lowercase();
    (status == StatusCode::UNPROCESSABLE_ENTITY || status == StatusCode::BAD_REQUEST)
        && (lower.contains("already") || lower.contains("exists"))
}

#[async_trait]
impl AuthAdmin for SupabaseAuthAdmin {
    async fn create_user(&self, user: &NewAuthUser) -> Result<AuthUser, AuthAdminError> {
        let (base_url, key) = self.credentials()?;

        debug!(email = %safe_email_log(&user.email), "Creating Supabase Auth user");

        let body = CreateUserBody {
            email: &user.email,
            password: &user.password,
            email_confirm: true,
            user_metadata: json!({ "full_name": user.full_name, "role": user.role }),
        };

        let response = self
            .client
            .post(format!("{}/auth/v1/admin/users", base_url))
            .header("apikey", key)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send Auth user creation request");
                AuthAdminError::RequestFailed(e.to_string())
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AuthAdminError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            let message = extract_error_message(&text);
            error!(status = %status, error = %message, "Auth user creation failed");
            if is_duplicate_email(status, &message) {
                return Err(AuthAdminError::AlreadyRegistered);
            }
            return Err(AuthAdminError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let created: AuthUser = serde_json::from_str(&text)
            .map_err(|e| AuthAdminError::SerializationError(e.to_string()))?;

        info!(auth_user_id = %created.id, "Supabase Auth user created");
        Ok(created)
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), AuthAdminError> {
        let (base_url, key) = self.credentials()?;

        let response = self
            .client
            .delete(format!(
                "{}/auth/v1/admin/users/{}",
                base_url,
                urlencoding::encode(user_id)
            ))
            .header("apikey", key)
            .bearer_auth(key)
            .send()
            .await
            .map_err(|e| AuthAdminError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            info!(auth_user_id = %user_id, "Supabase Auth user deleted");
            return Ok(());
        }

        let message = extract_error_message(&response.text().await.unwrap_or_default());
        error!(status = %status, error = %message, "Auth user deletion failed");
        Err(AuthAdminError::Api {
            status: status.as_u16(),
            message,
        })
    }
}
