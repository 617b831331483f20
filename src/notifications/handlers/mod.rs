// src/notifications/handlers/mod.rs

pub mod email;
pub mod inbox;

pub use email::*;
pub use inbox::*;
