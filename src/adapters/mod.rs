//! Adapters - Concrete implementations of ports.

pub mod fetch;
pub mod ffmpeg;
pub mod fs;
pub mod http;
