// src/candidates/handlers/mod.rs

pub mod attachments;
pub mod candidates;
pub mod evaluations;
pub mod notes;
pub mod postulations;
pub mod timeline;

// Re-export handler functions
pub use attachments::*;
pub use candidates::*;
pub use evaluations::*;
pub use notes::*;
pub use postulations::*;
pub use timeline::*;
