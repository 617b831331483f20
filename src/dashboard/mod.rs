// src/dashboard/mod.rs
//! Recruiting overview and service health

pub mod handlers;
pub mod models;
pub mod routes;


pub use routes::dashboard_routes;
