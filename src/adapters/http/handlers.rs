use super::error::AppError;
use crate::application::restream::{ActiveStream, PlaylistSource, RestreamService};
use crate::domain::error::RestreamError;
use crate::ports::fetcher::PlaylistFetcher;
use crate::ports::storage::StagingStore;
use crate::ports::transcoder::TranscoderPort;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRestreamRequest {
    pub m3u8_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRestreamResponse {
    pub restream_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRestreamRequest {
    pub m3u_content: Option<String>,
    pub m3u_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRestreamResponse {
    pub m3u_url: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub streams: Vec<ActiveStream>,
}

pub async fn start_restream<T, S, F>(
    State(service): State<Arc<RestreamService<T, S, F>>>,
    Json(request): Json<StartRestreamRequest>,
) -> Result<Json<StartRestreamResponse>, AppError>
where
    T: TranscoderPort + 'static,
    S: StagingStore + 'static,
    F: PlaylistFetcher + 'static,
{
    let url = request
        .m3u8_url
        .ok_or_else(|| RestreamError::Validation("m3u8Url is required".to_string()))?;
    let restream_url = service.start_single(&url).await?;
    Ok(Json(StartRestreamResponse { restream_url }))
}

pub async fn generate_restream<T, S, F>(
    State(service): State<Arc<RestreamService<T, S, F>>>,
    Json(request): Json<GenerateRestreamRequest>,
) -> Result<Json<GenerateRestreamResponse>, AppError>
where
    T: TranscoderPort + 'static,
    S: StagingStore + 'static,
    F: PlaylistFetcher + 'static,
{
    let source = PlaylistSource::from_request(request.m3u_content, request.m3u_url)?;
    let m3u_url = service.generate(source).await?;
    Ok(Json(GenerateRestreamResponse { m3u_url }))
}

pub async fn status<T, S, F>(
    State(service): State<Arc<RestreamService<T, S, F>>>,
) -> Json<StatusResponse>
where
    T: TranscoderPort + 'static,
    S: StagingStore + 'static,
    F: PlaylistFetcher + 'static,
{
    Json(StatusResponse {
        streams: service.status(),
    })
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn not_found(uri: Uri) -> (StatusCode, Json<Value>) {
    tracing::debug!(%uri, "no route");
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "route not found" })),
    )
}
