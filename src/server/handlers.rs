use crate::pipeline::{ChunkRecord, Phase, QueueDepths, StatsSnapshot};
use crate::server::{ApiError, ApiResult, AppState};
use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use serde::Serialize;
use std::sync::Arc;

/// Header names are matched case-insensitively.
pub const SUBMITTER_HEADER: &str = "userid";
pub const SESSION_HEADER: &str = "sessionid";
pub const TIMESTAMP_HEADER: &str = "timestamp";

fn required_header<'a>(headers: &'a HeaderMap, name: &str) -> ApiResult<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or(ApiError::MissingHeaders)
}

/// `POST /upload`
///
/// Responds 202 with the record as submitted. Stage metadata is added after
/// the response, and a record that later fails validation is dropped without
/// further notice.
pub async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> ApiResult<(StatusCode, Json<ChunkRecord>)> {
    let submitter_id = required_header(&headers, SUBMITTER_HEADER)?;
    let session_id = required_header(&headers, SESSION_HEADER)?;
    let timestamp = required_header(&headers, TIMESTAMP_HEADER)?;

    let timestamp: i64 = timestamp.parse().map_err(|_| ApiError::InvalidTimestamp)?;

    let payload = axum::body::to_bytes(body, state.max_body_bytes)
        .await
        .map_err(|e| {
            tracing::debug!(error = %e, "upload body unreadable");
            ApiError::UnreadableBody
        })?;

    let record =
        ChunkRecord::new(submitter_id, session_id, timestamp, payload.to_vec()).with_generated_id();

    state.pipeline.submit(record.clone())?;
    tracing::debug!(id = record.id(), submitter_id = record.submitter_id(), "chunk accepted");

    Ok((StatusCode::ACCEPTED, Json(record)))
}

/// `GET /chunks/{id}`
pub async fn get_chunk(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Arc<ChunkRecord>>> {
    state
        .pipeline
        .store()
        .find(&id)
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// `GET /sessions/{user_id}`
///
/// The path segment is a submitter id, and the result lists that
/// submitter's records across all sessions.
pub async fn get_sessions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<Vec<Arc<ChunkRecord>>> {
    Json(state.pipeline.store().find_by_submitter(&user_id))
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub phase: Phase,
    pub counters: StatsSnapshot,
    pub queues: QueueDepths,
    pub stored_records: usize,
}

/// `GET /stats`
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let pipeline = &state.pipeline;
    Json(StatsResponse {
        phase: pipeline.phase(),
        counters: pipeline.stats().snapshot(),
        queues: pipeline.queue_depths(),
        stored_records: pipeline.store().len(),
    })
}
