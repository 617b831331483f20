// src/admin/mod.rs
//! Dashboard user management: Auth account plus `users` row

pub mod handlers;
pub mod models;
pub mod routes;
pub mod validators;

#[cfg(test)]
mod tests;

pub use routes::admin_routes;
