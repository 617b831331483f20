// src/notifications/mod.rs
//! Outgoing email dispatch and the in-app notification inbox

pub mod handlers;
pub mod models;
pub mod routes;
pub mod validators;

#[cfg(test)]
mod tests;

pub use routes::notifications_routes;
