// Application state shared across all modules

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::common::config::AppConfig;
use crate::common::dev_mode::DevModeConfig;
use crate::services::{AiAnalyzer, AuthAdmin, CalendarProvider, EmailSender, FileStorage};

/// Application state containing database pool, integration clients, and configuration
///
/// Integrations are held behind traits so handlers never depend on a concrete
/// HTTP client.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub dev_mode: DevModeConfig,
    pub auth_admin: Arc<dyn AuthAdmin>,
    pub email: Arc<dyn EmailSender>,
    pub calendar: Arc<dyn CalendarProvider>,
    pub storage: Arc<dyn FileStorage>,
    pub ai: Arc<dyn AiAnalyzer>,
}
