//! Configuration loaded from the environment (and `.env`).

use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct RestreamConfig {
    /// HTTP server bind address
    pub addr: String,
    /// HTTP server port
    pub port: String,
    /// Staging directory for transcoder output, served under `/streams`
    pub streams_dir: PathBuf,
    /// Scheme and host used to build the URLs handed back to clients
    pub public_base_url: String,
    /// Transcoder executable
    pub ffmpeg_bin: String,
    /// How long the single-stream endpoint waits for the transcoder to come up
    pub ready_timeout: Duration,
}

impl RestreamConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = lookup("PORT").unwrap_or_else(|| String::from("3000"));

        // Render injects RENDER_EXTERNAL_HOSTNAME for public services.
        let public_base_url = lookup("PUBLIC_BASE_URL")
            .or_else(|| {
                lookup("RENDER_EXTERNAL_HOSTNAME").map(|host| format!("https://{}", host))
            })
            .unwrap_or_else(|| {
                let host = lookup("HOST").unwrap_or_else(|| String::from("localhost"));
                format!("http://{}:{}", host, port)
            });

        let ready_timeout = lookup("READY_TIMEOUT_SECS")
            .and_then(|secs| secs.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(2));

        Self {
            addr: lookup("ADDR").unwrap_or_else(|| String::from("0.0.0.0")),
            port,
            streams_dir: lookup("STREAMS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./public/streams")),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            ffmpeg_bin: lookup("FFMPEG_BIN").unwrap_or_else(|| String::from("ffmpeg")),
            ready_timeout,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }
}
