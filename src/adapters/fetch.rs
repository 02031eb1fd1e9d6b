use crate::domain::error::RestreamError;
use crate::ports::fetcher::PlaylistFetcher;
use async_trait::async_trait;
use std::time::Duration;

const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Fetches remote playlists over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, RestreamError> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| RestreamError::RemoteFetch(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PlaylistFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, RestreamError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| RestreamError::RemoteFetch(e.to_string()))?;

        response
            .text()
            .await
            .map_err(|e| RestreamError::RemoteFetch(e.to_string()))
    }
}
