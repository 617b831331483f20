// src/common/dev_mode.rs
//! Development mode configuration and utilities
//! Allows bypassing Supabase JWT verification for local testing

use std::env;

use crate::auth::permissions::Role;

/// Fixed id of the development user, stable across requests
pub const DEV_USER_ID: &str = "00000000-0000-0000-0000-000000000001";

#[derive(Debug, Clone)]
pub struct DevModeConfig {
    pub enabled: bool,
    pub user_email: String,
    pub user_name: String,
    pub user_role: Role,
}

impl DevModeConfig {
    pub fn from_env() -> Self {
        let enabled = env::var("DEV_MODE")
            .unwrap_or_else(|_| "false".to_string())
            .to_lowercase()
            == "true";

        let user_email =
            env::var("DEV_USER_EMAIL").unwrap_or_else(|_| "dev@hirepro.test".to_string());

        let user_name = env::var("DEV_USER_NAME").unwrap_or_else(|_| "Dev User".to_string());

        let user_role = env::var("DEV_USER_ROLE")
            .ok()
            .and_then(|r| Role::parse(&r))
            .unwrap_or(Role::Administrador);

        Self {
            enabled,
            user_email,
            user_name,
            user_role,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            user_email: String::new(),
            user_name: String::new(),
            user_role: Role::Visualizador,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Print dev mode status on startup
pub fn print_dev_mode_status(config: &DevModeConfig) {
    if config.enabled {
        tracing::warn!("╔════════════════════════════════════════════════════════════╗");
        tracing::warn!("║  DEV MODE ENABLED - AUTHENTICATION BYPASSED                ║");
        tracing::warn!("║  DO NOT USE IN PRODUCTION!                                 ║");
        tracing::warn!("╚════════════════════════════════════════════════════════════╝");
        tracing::warn!(
            "Dev user: {} ({}) role={}",
            config.user_name,
            crate::common::safe_email_log(&config.user_email),
            config.user_role.as_str()
        );
    }
}

/// Reads `--dev` / `--prod` style flags from the given arguments
pub fn parse_dev_mode_args<I, S>(args: I) -> Option<bool>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    args.into_iter()
        .filter_map(|arg| match arg.as_ref() {
            "--dev" | "--dev-mode" => Some(true),
            "--no-dev" | "--prod" | "--production" => Some(false),
            _ => None,
        })
        .last()
}

/// Override dev mode from CLI args
pub fn apply_cli_override(mut config: DevModeConfig) -> DevModeConfig {
    if let Some(cli_dev_mode) = parse_dev_mode_args(env::args().skip(1)) {
        tracing::info!(dev_mode = cli_dev_mode, "CLI override for DEV_MODE");
        config.enabled = cli_dev_mode;
    }

    config
}
