//! Application layer - Generic services that use ports.

pub mod registry;
pub mod restream;
pub mod supervisor;
