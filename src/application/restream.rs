use crate::application::supervisor::{Readiness, TranscodeSupervisor};
use crate::domain::error::RestreamError;
use crate::domain::jobs::{StreamStatus, MASTER_PLAYLIST};
use crate::domain::playlist::{self, OutputPlaylist, PlaylistEntry};
use crate::ports::fetcher::PlaylistFetcher;
use crate::ports::storage::StagingStore;
use crate::ports::transcoder::TranscoderPort;
use reqwest::Url;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::Mutex;

/// Title given to the stream started by the single-stream endpoint.
const SINGLE_STREAM_TITLE: &str = "restream";

/// Where the playlist to regenerate comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistSource {
    Inline(String),
    Remote(String),
}

impl PlaylistSource {
    /// Inline content wins when both are given; blank values count as missing.
    pub fn from_request(
        content: Option<String>,
        url: Option<String>,
    ) -> Result<Self, RestreamError> {
        let content = content.filter(|c| !c.trim().is_empty());
        let url = url.filter(|u| !u.trim().is_empty());
        match (content, url) {
            (Some(content), _) => Ok(PlaylistSource::Inline(content)),
            (None, Some(url)) => Ok(PlaylistSource::Remote(url.trim().to_string())),
            (None, None) => Err(RestreamError::Validation(
                "provide the M3U playlist as m3uContent or m3uUrl".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveStream {
    #[serde(flatten)]
    pub status: StreamStatus,
    pub playlist_url: String,
}

pub struct RestreamService<T, S, F> {
    supervisor: TranscodeSupervisor<T, S>,
    fetcher: F,
    public_base_url: String,
    ready_timeout: Duration,
    /// Held while one request replaces the running streams with its own.
    generation: Mutex<()>,
}

impl<T, S, F> RestreamService<T, S, F>
where
    T: TranscoderPort,
    S: StagingStore + 'static,
    F: PlaylistFetcher,
{
    pub fn new(
        supervisor: TranscodeSupervisor<T, S>,
        fetcher: F,
        public_base_url: impl Into<String>,
        ready_timeout: Duration,
    ) -> Self {
        Self {
            supervisor,
            fetcher,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            ready_timeout,
            generation: Mutex::new(()),
        }
    }

    pub fn supervisor(&self) -> &TranscodeSupervisor<T, S> {
        &self.supervisor
    }

    pub fn public_url(&self, file_name: &str) -> String {
        format!("{}/streams/{}", self.public_base_url, file_name)
    }

    /// Replace whatever is running with a single stream of `m3u8_url`.
    ///
    /// Nothing is touched unless the URL validates. Returns the public URL
    /// of the new HLS playlist once the transcoder has survived the
    /// readiness window.
    pub async fn start_single(&self, m3u8_url: &str) -> Result<String, RestreamError> {
        let url = m3u8_url.trim();
        if !url.ends_with(".m3u8") {
            return Err(RestreamError::Validation(
                "m3u8Url must end with .m3u8".to_string(),
            ));
        }
        validate_http_url(url)?;

        let id = {
            let _generation = self.generation.lock().await;
            self.supervisor.cleanup_all();
            self.supervisor.start_stream(SINGLE_STREAM_TITLE, url)?
        };

        match self.supervisor.wait_ready(&id, self.ready_timeout).await {
            Readiness::Exited => Err(RestreamError::NotAlive(id)),
            Readiness::Ready | Readiness::Alive => Ok(self.public_url(&id.output_file_name())),
        }
    }

    /// Restream every qualifying entry of a playlist and publish the
    /// rewritten playlist. Returns its public URL.
    ///
    /// The previous generation is stopped as soon as the source is known to
    /// be usable, even if fetching or parsing it fails afterwards. The whole
    /// playlist is parsed before the first new stream starts; a spawn
    /// failure half-way leaves the streams started so far running.
    pub async fn generate(&self, source: PlaylistSource) -> Result<String, RestreamError> {
        if let PlaylistSource::Remote(url) = &source {
            validate_http_url(url)?;
        }

        let _generation = self.generation.lock().await;
        self.supervisor.cleanup_all();

        let text = match source {
            PlaylistSource::Inline(text) => text,
            PlaylistSource::Remote(url) => self.fetcher.fetch(&url).await?,
        };
        let entries = playlist::entries(&text).collect::<Result<Vec<PlaylistEntry>, _>>()?;

        let mut output = OutputPlaylist::new();
        for entry in entries.into_iter().filter(|e| e.qualifies()) {
            let id = self.supervisor.start_stream(&entry.title, &entry.url)?;
            output.add_entry(entry.title, self.public_url(&id.output_file_name()));
        }

        let path = self.supervisor.store().path_of(MASTER_PLAYLIST);
        output.write_to(&path).await?;
        tracing::info!(streams = output.len(), path = %path.display(), "restream playlist written");

        Ok(self.public_url(MASTER_PLAYLIST))
    }

    pub fn status(&self) -> Vec<ActiveStream> {
        self.supervisor
            .registry()
            .snapshot()
            .into_iter()
            .map(|status| ActiveStream {
                playlist_url: self.public_url(&status.id.output_file_name()),
                status,
            })
            .collect()
    }

    pub async fn shutdown(&self) {
        self.supervisor.shutdown().await;
    }
}

fn validate_http_url(raw: &str) -> Result<(), RestreamError> {
    let url = Url::parse(raw)
        .map_err(|e| RestreamError::Validation(format!("invalid URL {:?}: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(RestreamError::Validation(format!(
            "unsupported URL scheme {:?}",
            other
        ))),
    }
}
