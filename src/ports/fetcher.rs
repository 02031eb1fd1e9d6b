use crate::domain::error::RestreamError;
use async_trait::async_trait;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlaylistFetcher: Send + Sync {
    /// Download a remote M3U playlist as text.
    async fn fetch(&self, url: &str) -> Result<String, RestreamError>;
}
