use crate::domain::jobs::TranscodeRequest;
use std::io;
use tokio::process::Child;

/// Starts one long-running transcoder process per stream.
#[cfg_attr(test, mockall::automock)]
pub trait TranscoderPort: Send + Sync {
    /// Program name, used in spawn errors and logs.
    fn name(&self) -> String;

    /// Spawn without waiting; stderr must be piped so it can be logged.
    fn spawn(&self, request: &TranscodeRequest) -> io::Result<Child>;
}
