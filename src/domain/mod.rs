//! Domain layer - Pure business logic.

pub mod error;
pub mod jobs;
pub mod playlist;
