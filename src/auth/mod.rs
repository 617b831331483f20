//! # Auth Module
//!
//! Supabase access-token verification, roles and permissions:
//! - `AuthedUser` extractor for protected routes
//! - `QueueCaller` extractor for the AI queue (worker token or user)
//! - Static role → permission mapping

pub mod extractors;
pub mod handlers;
pub mod models;
pub mod permissions;
pub mod routes;


pub use extractors::{AuthedUser, QueueCaller};
pub use permissions::{Permission, Role};
pub use routes::auth_routes;
