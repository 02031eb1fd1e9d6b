//! Restream - HLS restreaming proxy
//!
//! Takes an M3U playlist (inline or by URL), starts one ffmpeg process per
//! stream to repackage it as locally served HLS, and hands back a rewritten
//! playlist pointing at the local copies.
//!
//! Hexagonal Architecture:
//! - domain/: Pure business logic (playlist parsing/rewriting, stream ids, errors)
//! - ports/: Trait definitions (transcoder, playlist fetcher, staging store)
//! - adapters/: Concrete implementations (ffmpeg, reqwest, filesystem, axum)
//! - application/: Registry, transcode supervisor and restream service
//! - config: Environment configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports for convenience
pub use application::restream::{PlaylistSource, RestreamService};
pub use config::RestreamConfig;
pub use domain::error::RestreamError;
