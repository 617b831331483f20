// src/common/config.rs
//! Environment driven configuration
//!
//! Integration credentials are optional: the server starts without them and
//! the affected operations report "not configured" when used.

use std::env;
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: Option<String>,
    pub service_role_key: Option<String>,
    pub jwt_secret: String,
    pub storage_bucket: String,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub resend_api_key: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub calendar_id: String,
}

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub analysis_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub worker_token: Option<String>,
    pub worker_enabled: bool,
    pub worker_interval_secs: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub app_base_url: String,
    pub timezone: String,
    pub cors_origins: Vec<String>,
    pub supabase: SupabaseConfig,
    pub email: EmailConfig,
    pub google: GoogleConfig,
    pub ai: AiConfig,
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn with_default(key: &str, default: &str) -> String {
    optional(key).unwrap_or_else(|| default.to_string())
}

fn flag(key: &str) -> bool {
    matches!(
        with_default(key, "false").to_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port_raw = with_default("PORT", "8080");
        let port = port_raw
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidValue {
                key: "PORT",
                value: port_raw.clone(),
            })?;

        let interval_raw = with_default("AI_WORKER_INTERVAL_SECS", "10");
        let worker_interval_secs =
            interval_raw
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "AI_WORKER_INTERVAL_SECS",
                    value: interval_raw.clone(),
                })?;

        let cors_origins = with_default(
            "CORS_ORIGINS",
            "http://localhost:3000,http://localhost:5173",
        )
        .split(',')
        .map(|origin| origin.trim().to_string())
        .filter(|origin| !origin.is_empty())
        .collect();

        Ok(Self {
            port,
            database_url: with_default("DATABASE_URL", "sqlite://hirepro.db"),
            app_base_url: with_default("APP_BASE_URL", "http://localhost:3000"),
            timezone: with_default("APP_TIMEZONE", "America/Santiago"),
            cors_origins,
            supabase: SupabaseConfig {
                url: optional("SUPABASE_URL").map(|u| u.trim_end_matches('/').to_string()),
                service_role_key: optional("SUPABASE_SERVICE_ROLE_KEY"),
                jwt_secret: with_default("SUPABASE_JWT_SECRET", "replace_with_supabase_jwt_secret"),
                storage_bucket: with_default("SUPABASE_STORAGE_BUCKET", "candidate-attachments"),
            },
            email: EmailConfig {
                resend_api_key: optional("RESEND_API_KEY"),
                from: with_default("EMAIL_FROM", "HirePro <no-reply@hirepro.app>"),
            },
            google: GoogleConfig {
                client_id: optional("GOOGLE_CLIENT_ID"),
                client_secret: optional("GOOGLE_CLIENT_SECRET"),
                refresh_token: optional("GOOGLE_REFRESH_TOKEN"),
                calendar_id: with_default("GOOGLE_CALENDAR_ID", "primary"),
            },
            ai: AiConfig {
                analysis_url: with_default(
                    "AI_ANALYSIS_URL",
                    "https://api.openai.com/v1/chat/completions",
                ),
                api_key: optional("AI_API_KEY"),
                model: with_default("AI_MODEL", "gpt-4o-mini"),
                worker_token: optional("AI_WORKER_TOKEN"),
                worker_enabled: flag("AI_WORKER_ENABLED"),
                worker_interval_secs,
            },
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }

    /// Configuration used by unit tests, no network credentials
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            port: 0,
            database_url: "sqlite::memory:".to_string(),
            app_base_url: "http://localhost:3000".to_string(),
            timezone: "America/Santiago".to_string(),
            cors_origins: Vec::new(),
            supabase: SupabaseConfig {
                url: None,
                service_role_key: None,
                jwt_secret: "test_jwt_secret".to_string(),
                storage_bucket: "candidate-attachments".to_string(),
            },
            email: EmailConfig {
                resend_api_key: None,
                from: "HirePro <no-reply@hirepro.test>".to_string(),
            },
            google: GoogleConfig {
                client_id: None,
                client_secret: None,
                refresh_token: None,
                calendar_id: "primary".to_string(),
            },
            ai: AiConfig {
                analysis_url: "http://localhost:9/v1/chat/completions".to_string(),
                api_key: None,
                model: "test-model".to_string(),
                worker_token: Some("worker-secret".to_string()),
                worker_enabled: false,
                worker_interval_secs: 10,
            },
        }
    }
}
