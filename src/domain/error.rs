//! Error taxonomy for restream requests.

use crate::domain::jobs::StreamId;
use crate::domain::playlist::ParseError;
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum RestreamError {
    /// Missing or malformed input URL/content. Nothing is started.
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("malformed playlist: {0}")]
    Parse(#[from] ParseError),

    /// The transcoder binary could not be started.
    #[error("failed to start {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to fetch remote playlist: {0}")]
    RemoteFetch(String),

    /// The transcoder exited before the readiness grace period ran out.
    #[error("transcoder for {0} exited during startup")]
    NotAlive(StreamId),

    #[error("staging directory error: {0}")]
    Io(#[from] io::Error),
}

impl RestreamError {
    pub fn http_status(&self) -> u16 {
        match self {
            RestreamError::Validation(_) => 400,
            _ => 500,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            RestreamError::Validation(_) => "validation_error",
            RestreamError::Parse(_) => "parse_error",
            RestreamError::Spawn { .. } => "spawn_error",
            RestreamError::RemoteFetch(_) => "remote_fetch_error",
            RestreamError::NotAlive(_) => "transcoder_exited",
            RestreamError::Io(_) => "io_error",
        }
    }
}
