//! Restream server binary.
//!
//! Wires up:
//! - ffmpeg transcoder, reqwest playlist fetcher, filesystem staging store
//! - Stream registry and transcode supervisor
//! - HTTP API + static `/streams` file server

use restream::adapters::{fetch::HttpFetcher, ffmpeg::FfmpegTranscoder, fs::FsAdapter, http};
use restream::application::registry::StreamRegistry;
use restream::application::supervisor::TranscodeSupervisor;
use restream::ports::storage::StagingStore;
use restream::{RestreamConfig, RestreamService};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = RestreamConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("restream=info,tower_http=info")),
        )
        .init();

    // 1. Adapters
    let store = Arc::new(FsAdapter::new(&config.streams_dir));
    if let Err(e) = store.ensure_dir().await {
        tracing::error!(dir = %config.streams_dir.display(), error = %e, "cannot create streams directory");
        std::process::exit(1);
    }

    let fetcher = match HttpFetcher::new() {
        Ok(fetcher) => fetcher,
        Err(e) => {
            tracing::error!(error = %e, "cannot build HTTP client");
            std::process::exit(1);
        }
    };

    // 2. Application Services
    let supervisor = TranscodeSupervisor::new(
        FfmpegTranscoder::new(&config.ffmpeg_bin),
        store,
        Arc::new(StreamRegistry::new()),
    );
    let service = Arc::new(RestreamService::new(
        supervisor,
        fetcher,
        config.public_base_url.clone(),
        config.ready_timeout,
    ));

    // 3. HTTP Layer
    let app = http::router(service.clone(), &config.streams_dir);

    // 4. Start Server
    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .expect("Failed to bind TCP listener");
    tracing::info!(
        addr = %config.bind_addr(),
        public = %config.public_base_url,
        "restream server listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server failed to start");

    // 5. Stop every transcoder and wait for segment cleanup
    service.shutdown().await;
    tracing::info!("all streams stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
