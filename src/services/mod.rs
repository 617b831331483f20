// src/services/mod.rs
//
// Integration clients and the cross-module workflows built on top of them

pub mod ai_analysis;
pub mod email;
pub mod google;
pub mod interviews;
pub mod mailer;
pub mod notifications;
pub mod storage;
pub mod supabase_auth;
pub mod timeline;

#[cfg(test)]
pub mod fakes;

// Re-export commonly used types for convenience
pub use ai_analysis::{AiAnalysisClient, AiAnalyzer, AiError};
pub use email::{EmailError, EmailSender, ResendClient};
pub use google::{CalendarProvider, GoogleCalendarService, GoogleError};
pub use storage::{FileStorage, StorageError, SupabaseStorage};
pub use supabase_auth::{AuthAdmin, AuthAdminError, SupabaseAuthAdmin};
