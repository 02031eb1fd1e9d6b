//! HTTP inbound adapter.
//!
//! JSON endpoints for starting restreams plus a static file server over the
//! staging directory under `/streams`.

pub mod error;
pub mod handlers;

use crate::application::restream::RestreamService;
use crate::ports::fetcher::PlaylistFetcher;
use crate::ports::storage::StagingStore;
use crate::ports::transcoder::TranscoderPort;
use axum::routing::{get, post};
use axum::Router;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub fn router<T, S, F>(service: Arc<RestreamService<T, S, F>>, streams_dir: &Path) -> Router
where
    T: TranscoderPort + 'static,
    S: StagingStore + 'static,
    F: PlaylistFetcher + 'static,
{
    Router::new()
        .route("/start-restream", post(handlers::start_restream::<T, S, F>))
        .route("/generate-restream", post(handlers::generate_restream::<T, S, F>))
        .route("/status", get(handlers::status::<T, S, F>))
        .route("/health", get(handlers::health))
        .nest_service("/streams", ServeDir::new(streams_dir))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(service)
}
