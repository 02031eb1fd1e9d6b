use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Seconds of media per HLS segment.
pub const SEGMENT_SECONDS: u32 = 10;
/// Segments kept in the rolling live playlist.
pub const PLAYLIST_WINDOW: u32 = 6;
pub const SEGMENT_EXTENSION: &str = ".ts";
/// File name of the regenerated multi-stream playlist.
pub const MASTER_PLAYLIST: &str = "restream.m3u";

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Identifier of one transcoder run, `stream_<unix millis>_<5 base36 chars>`.
///
/// A fresh id is drawn for every start so a terminating process can never
/// write into, or have its cleanup delete, files of its replacement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(String);

impl StreamId {
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..5)
            .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
            .collect();
        Self(format!("stream_{}_{}", Utc::now().timestamp_millis(), suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn output_file_name(&self) -> String {
        format!("{}.m3u8", self.0)
    }

    /// ffmpeg `-hls_segment_filename` pattern.
    pub fn segment_pattern(&self) -> String {
        format!("{}_%03d{}", self.0, SEGMENT_EXTENSION)
    }

    pub fn owns_segment(&self, file_name: &str) -> bool {
        file_name
            .strip_prefix(self.0.as_str())
            .and_then(|rest| rest.strip_prefix('_'))
            .is_some_and(|rest| rest.ends_with(SEGMENT_EXTENSION))
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StreamId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Everything the transcoder needs for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeRequest {
    pub id: StreamId,
    pub source_url: String,
    pub output_path: PathBuf,
    pub segment_path: PathBuf,
}

impl TranscodeRequest {
    pub fn new(id: StreamId, source_url: String, staging_dir: &std::path::Path) -> Self {
        Self {
            output_path: staging_dir.join(id.output_file_name()),
            segment_path: staging_dir.join(id.segment_pattern()),
            id,
            source_url,
        }
    }
}

/// A running transcoder tracked by the registry.
///
/// The child process itself lives inside the observer task; the job keeps
/// the token that tells the observer to terminate it.
#[derive(Debug)]
pub struct StreamJob {
    pub id: StreamId,
    pub title: String,
    pub source_url: String,
    pub pid: Option<u32>,
    pub started_at: DateTime<Utc>,
    pub cancel: CancellationToken,
    pub observer: JoinHandle<()>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStatus {
    pub id: StreamId,
    pub title: String,
    pub source_url: String,
    pub started_at: DateTime<Utc>,
    pub pid: Option<u32>,
}

impl From<&StreamJob> for StreamStatus {
    fn from(job: &StreamJob) -> Self {
        Self {
            id: job.id.clone(),
            title: job.title.clone(),
            source_url: job.source_url.clone(),
            started_at: job.started_at,
            pid: job.pid,
        }
    }
}
