use crate::domain::jobs::StreamId;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};

/// Directory where transcoders write playlists and segments, served under `/streams`.
#[async_trait]
pub trait StagingStore: Send + Sync {
    /// Create the staging directory if it does not exist yet
    async fn ensure_dir(&self) -> io::Result<()>;

    /// Whether `name` currently exists in the staging directory
    async fn exists(&self, name: &str) -> bool;

    /// Delete every segment file owned by `id`
    /// Returns the number of files removed
    async fn purge_segments(&self, id: &StreamId) -> io::Result<usize>;

    /// The staging directory itself
    fn root(&self) -> &Path;

    /// Absolute location of `name` inside the staging directory
    fn path_of(&self, name: &str) -> PathBuf;
}
