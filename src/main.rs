// src/main.rs
use axum::{extract::Extension, middleware, Router};
use dotenv::dotenv;
use reqwest::Client;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::PathBuf;
use std::{str::FromStr, sync::Arc};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// ============================================================================
// MODULE IMPORTS
// ============================================================================

mod admin;
mod ai_processing;
mod applications;
mod auth;
mod candidates;
mod common;
mod dashboard;
mod interviews;
mod logging_middleware;
mod notifications;
mod services;

// ============================================================================
// COMMON IMPORTS
// ============================================================================

use auth::permissions::permission_strings;
use common::config::AppConfig;
use common::dev_mode::{apply_cli_override, print_dev_mode_status, DevModeConfig, DEV_USER_ID};
use common::AppState;
use services::{
    AiAnalysisClient, GoogleCalendarService, ResendClient, SupabaseAuthAdmin, SupabaseStorage,
};

/// Every API route with the shared state attached; CORS and tracing are added by `main`
pub fn build_router(state: AppState) -> Router {
    let shared = Arc::new(RwLock::new(state));

    Router::new()
        // Session
        .merge(auth::auth_routes())
        // Dashboard users
        .merge(admin::admin_routes())
        // Openings and their pipelines
        .merge(applications::applications_routes())
        // Candidates, postulations, notes, evaluations, attachments, timeline
        .merge(candidates::candidates_routes())
        // Interviews and calendar
        .merge(interviews::interviews_routes())
        // Outgoing email and in-app notifications
        .merge(notifications::notifications_routes())
        // AI analysis queue
        .merge(ai_processing::ai_processing_routes())
        // Overview and health
        .merge(dashboard::dashboard_routes())
        .layer(middleware::from_fn(logging_middleware::log_request_response))
        .layer(Extension(shared))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<axum::http::HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
            axum::http::Method::PATCH,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            axum::http::HeaderName::from_static("x-request-id"),
            axum::http::HeaderName::from_static(auth::extractors::WORKER_TOKEN_HEADER),
        ])
        .allow_credentials(true)
}

/// Makes sure the bypass user exists so foreign rows (notes, evaluations) can point at it
async fn ensure_dev_user(pool: &sqlx::SqlitePool, dev_mode: &DevModeConfig) -> anyhow::Result<()> {
    if !dev_mode.is_enabled() {
        return Ok(());
    }
    let permissions = serde_json::to_string(&permission_strings(dev_mode.user_role))?;
    sqlx::query(
        "INSERT OR IGNORE INTO users (id, email, full_name, role, permissions) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(DEV_USER_ID)
    .bind(&dev_mode.user_email)
    .bind(&dev_mode.user_name)
    .bind(dev_mode.user_role.as_str())
    .bind(permissions)
    .execute(pool)
    .await?;
    Ok(())
}

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // ========================================================================
    // ENVIRONMENT CONFIGURATION
    // ========================================================================

    let config = AppConfig::from_env()?;

    let dev_mode = apply_cli_override(DevModeConfig::from_env());
    print_dev_mode_status(&dev_mode);

    // ========================================================================
    // DATABASE SETUP
    // ========================================================================

    if let Some(path_part) = config.database_url.strip_prefix("sqlite://") {
        let path_without_params = path_part.split('?').next().unwrap_or("");
        if !path_without_params.is_empty() && !path_without_params.starts_with(':') {
            let db_path = PathBuf::from(path_without_params);
            if let Some(parent) = db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }
    }

    let connect_options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .connect_with(connect_options)
        .await?;

    common::migrations::run_migrations(&pool).await?;
    ensure_dev_user(&pool, &dev_mode).await?;

    // ========================================================================
    // SERVICE INITIALIZATION
    // ========================================================================

    let http_client = Client::builder().build()?;

    if config.supabase.url.is_none() {
        warn!("SUPABASE_URL not set: user administration and attachments are unavailable");
    }
    if config.email.resend_api_key.is_none() {
        warn!("RESEND_API_KEY not set: emails will fail");
    }
    if config.google.refresh_token.is_none() {
        warn!("Google Calendar credentials not set: virtual interviews cannot get a Meet link");
    }

    let app_state = AppState {
        db: pool,
        auth_admin: Arc::new(SupabaseAuthAdmin::new(&config.supabase, http_client.clone())),
        email: Arc::new(ResendClient::new(&config.email, http_client.clone())),
        calendar: Arc::new(GoogleCalendarService::new(
            &config.google,
            &config.timezone,
            http_client.clone(),
        )),
        storage: Arc::new(SupabaseStorage::new(&config.supabase, http_client.clone())),
        ai: Arc::new(AiAnalysisClient::new(&config.ai, http_client)),
        dev_mode,
        config: Arc::new(config),
    };
    info!("Integration clients initialized");

    if app_state.config.ai.worker_enabled {
        ai_processing::worker::start_worker(app_state.clone());
    } else {
        info!("AI worker disabled, tasks wait for an external worker or process-next");
    }

    // ========================================================================
    // ROUTER COMPOSITION
    // ========================================================================

    let addr = app_state.config.socket_addr();
    let cors = cors_layer(&app_state.config);

    let app = build_router(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
