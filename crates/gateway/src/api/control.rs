//! ControlSurface (C10, §4.10): the tool and resource endpoints a caller
//! drives the pipeline through. Transport mirrors the existing gateway's
//! router conventions — plain `axum` JSON handlers over `AppState` — with
//! the task-status resource additionally exposed as an SSE stream, reusing
//! `StatusStore`'s `TaskEvent` broadcast-channel pattern the same way the
//! existing task-queue endpoints did.

use std::convert::Infallible;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json};
use futures_util::stream::Stream;
use serde::{Deserialize, Serialize};

use cf_domain::config::CleanupConfig;
use cf_domain::error::Error;
use cf_domain::length::parse_length;
use cf_ingest::types::SourceRef;

use crate::runtime::blob_keys;
use crate::runtime::orchestrator::GenerateRequest;
use crate::runtime::runner::QueueStatus;
use crate::runtime::status::{CreateOutcome, TaskEvent};
use crate::state::AppState;

// ── Wire shapes ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum SourceInput {
    Url { value: String },
    PdfPath { value: String },
    Youtube { value: String },
}

impl From<SourceInput> for SourceRef {
    fn from(input: SourceInput) -> Self {
        match input {
            SourceInput::Url { value } => SourceRef::Url(value),
            SourceInput::PdfPath { value } => SourceRef::PdfPath(value.into()),
            SourceInput::Youtube { value } => SourceRef::Youtube(value),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GeneratePodcastRequest {
    sources: Vec<SourceInput>,
    #[serde(default)]
    prominent_persons: Vec<String>,
    #[serde(default)]
    custom_prompt: Option<String>,
    length_str: String,
    #[serde(default)]
    webhook_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CleanupTaskFilesRequest {
    #[serde(default)]
    #[allow(dead_code)]
    policy_override: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GetServiceHealthQuery {
    #[serde(default)]
    include_details: bool,
}

fn api_error(status: axum::http::StatusCode, error: &str, description: impl Into<String>) -> axum::response::Response {
    (
        status,
        Json(serde_json::json!({ "error": error, "error_description": description.into() })),
    )
        .into_response()
}

/// `task_id` format validation (§4.10: "10-100 chars, non-empty").
fn validate_task_id(task_id: &str) -> Result<(), axum::response::Response> {
    if task_id.len() < 10 || task_id.len() > 100 {
        return Err(api_error(
            axum::http::StatusCode::BAD_REQUEST,
            "invalid_id",
            "task_id must be between 10 and 100 characters",
        ));
    }
    Ok(())
}

// ── GeneratePodcastAsync ───────────────────────────────────────────────────

pub async fn generate_podcast(
    State(state): State<AppState>,
    Json(body): Json<GeneratePodcastRequest>,
) -> impl IntoResponse {
    if body.sources.is_empty() {
        return api_error(axum::http::StatusCode::BAD_REQUEST, "invalid_input", "sources must not be empty");
    }
    if let Err(e) = parse_length(&body.length_str) {
        return api_error(axum::http::StatusCode::BAD_REQUEST, "invalid_input", e.to_string());
    }

    let task_id = uuid::Uuid::new_v4().to_string();
    let request_snapshot = serde_json::json!({
        "sources": body.sources.iter().map(|s| match s {
            SourceInput::Url { value } => value.clone(),
            SourceInput::PdfPath { value } => value.clone(),
            SourceInput::Youtube { value } => value.clone(),
        }).collect::<Vec<_>>(),
        "prominent_persons": body.prominent_persons,
        "custom_prompt": body.custom_prompt,
        "length_str": body.length_str,
        "webhook_url": body.webhook_url,
    });

    match state.status_store.create(&task_id, request_snapshot).await {
        Ok(CreateOutcome::Created(_)) => {}
        Ok(CreateOutcome::AlreadyExists) => {
            return api_error(axum::http::StatusCode::CONFLICT, "already_exists", "task_id collision, retry");
        }
        Err(e) => return api_error(axum::http::StatusCode::INTERNAL_SERVER_ERROR, "internal_error", e.to_string()),
    }

    let request = GenerateRequest {
        sources: body.sources.into_iter().map(SourceRef::from).collect(),
        prominent_persons: body.prominent_persons,
        custom_prompt: body.custom_prompt,
        length_str: body.length_str,
        webhook_url: body.webhook_url,
    };

    let orchestrator = state.orchestrator.clone();
    let submitted_id = task_id.clone();
    let submit_result = state.task_runner.submit(task_id.clone(), move |cancel| async move {
        orchestrator.run(submitted_id, request, cancel).await;
    });

    if let Err(e) = submit_result {
        let _ = state
            .status_store
            .set_error(&task_id, "server is at capacity".into(), e.to_string())
            .await;
        return match e {
            Error::CapacityError(_) => api_error(axum::http::StatusCode::TOO_MANY_REQUESTS, "at_capacity", "no worker slots available"),
            other => api_error(axum::http::StatusCode::INTERNAL_SERVER_ERROR, "internal_error", other.to_string()),
        };
    }

    (
        axum::http::StatusCode::ACCEPTED,
        Json(serde_json::json!({ "task_id": task_id, "status": "queued" })),
    )
        .into_response()
}

// ── GetTaskStatus / resources ─────────────────────────────────────────────

pub async fn get_task_status(State(state): State<AppState>, Path(task_id): Path<String>) -> impl IntoResponse {
    if let Err(resp) = validate_task_id(&task_id) {
        return resp;
    }
    match state.status_store.get(&task_id) {
        Some(record) => Json(record).into_response(),
        None => api_error(axum::http::StatusCode::NOT_FOUND, "not_found", "no such task_id"),
    }
}

pub async fn get_task_logs(State(state): State<AppState>, Path(task_id): Path<String>) -> impl IntoResponse {
    if let Err(resp) = validate_task_id(&task_id) {
        return resp;
    }
    match state.status_store.get(&task_id) {
        Some(record) => Json(record.logs).into_response(),
        None => api_error(axum::http::StatusCode::NOT_FOUND, "not_found", "no such task_id"),
    }
}

pub async fn get_task_warnings(State(state): State<AppState>, Path(task_id): Path<String>) -> impl IntoResponse {
    if let Err(resp) = validate_task_id(&task_id) {
        return resp;
    }
    match state.status_store.get(&task_id) {
        Some(record) => {
            let warnings: Vec<&str> = record
                .result_episode
                .as_ref()
                .map(|e| e.warnings.iter().map(String::as_str).collect())
                .unwrap_or_default();
            Json(serde_json::json!({ "warnings": warnings })).into_response()
        }
        None => api_error(axum::http::StatusCode::NOT_FOUND, "not_found", "no such task_id"),
    }
}

/// `jobs/<task_id>/status` as SSE — one event per `StatusStore::publish`
/// call, closing once the task reaches a terminal phase.
pub async fn task_status_sse(State(state): State<AppState>, Path(task_id): Path<String>) -> impl IntoResponse {
    if let Err(resp) = validate_task_id(&task_id) {
        return resp;
    }
    let Some(record) = state.status_store.get(&task_id) else {
        return api_error(axum::http::StatusCode::NOT_FOUND, "not_found", "no such task_id");
    };
    if record.status.is_terminal() {
        let data = serde_json::to_string(&record).unwrap_or_default();
        let stream = futures_util::stream::once(async move {
            Ok::<_, Infallible>(Event::default().event("task.snapshot").data(data))
        });
        return Sse::new(stream).keep_alive(KeepAlive::default()).into_response();
    }

    let rx = state.status_store.subscribe();
    let stream = make_status_event_stream(rx, task_id);
    Sse::new(stream).keep_alive(KeepAlive::default()).into_response()
}

fn make_status_event_stream(
    mut rx: tokio::sync::broadcast::Receiver<TaskEvent>,
    task_id: String,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) if event.task_id == task_id => {
                    let terminal = event.status.is_terminal();
                    let data = serde_json::to_string(&event).unwrap_or_default();
                    yield Ok(Event::default().event("task.status").data(data));
                    if terminal {
                        break;
                    }
                }
                Ok(_) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    let msg = format!("{{\"warning\":\"missed {n} events\"}}");
                    yield Ok(Event::default().event("warning").data(msg));
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}

// ── CancelTask ─────────────────────────────────────────────────────────────

pub async fn cancel_task(State(state): State<AppState>, Path(task_id): Path<String>) -> impl IntoResponse {
    if let Err(resp) = validate_task_id(&task_id) {
        return resp;
    }
    if state.status_store.get(&task_id).is_none() {
        return api_error(axum::http::StatusCode::NOT_FOUND, "not_found", "no such task_id");
    }
    let cancelled = state.task_runner.cancel(&task_id);
    Json(serde_json::json!({ "task_id": task_id, "cancelled": cancelled })).into_response()
}

// ── Podcast artifacts ────────────────────────────────────────────────────

pub async fn get_outline(State(state): State<AppState>, Path(task_id): Path<String>) -> impl IntoResponse {
    if let Err(resp) = validate_task_id(&task_id) {
        return resp;
    }
    fetch_text_artifact(&state, &blob_keys::outline_key(&task_id)).await
}

pub async fn get_transcript(State(state): State<AppState>, Path(task_id): Path<String>) -> impl IntoResponse {
    if let Err(resp) = validate_task_id(&task_id) {
        return resp;
    }
    match state.artifact_store.get_text(&blob_keys::transcript_key(&task_id)).await {
        Ok(text) => ([("content-type", "text/plain; charset=utf-8")], text).into_response(),
        Err(_) => api_error(axum::http::StatusCode::NOT_FOUND, "not_available", "transcript not yet available"),
    }
}

pub async fn get_audio(State(state): State<AppState>, Path(task_id): Path<String>) -> impl IntoResponse {
    if let Err(resp) = validate_task_id(&task_id) {
        return resp;
    }
    match state.artifact_store.get_bytes(&blob_keys::final_audio_key(&task_id)).await {
        Ok(bytes) => ([("content-type", "audio/mpeg")], bytes).into_response(),
        Err(_) => api_error(axum::http::StatusCode::NOT_FOUND, "not_available", "final audio not yet available"),
    }
}

pub async fn get_metadata(State(state): State<AppState>, Path(task_id): Path<String>) -> impl IntoResponse {
    if let Err(resp) = validate_task_id(&task_id) {
        return resp;
    }
    match state.status_store.get(&task_id) {
        Some(record) => match record.result_episode {
            Some(episode) => Json(episode).into_response(),
            None => api_error(axum::http::StatusCode::NOT_FOUND, "not_available", "episode metadata not yet available"),
        },
        None => api_error(axum::http::StatusCode::NOT_FOUND, "not_found", "no such task_id"),
    }
}

pub async fn get_persona_research(
    State(state): State<AppState>,
    Path((task_id, person_id)): Path<(String, String)>,
) -> impl IntoResponse {
    if let Err(resp) = validate_task_id(&task_id) {
        return resp;
    }
    fetch_text_artifact(&state, &blob_keys::persona_research_key(&task_id, &person_id)).await
}

async fn fetch_text_artifact(state: &AppState, key: &str) -> axum::response::Response {
    match state.artifact_store.get_text(key).await {
        Ok(raw) => match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) => Json(value).into_response(),
            Err(_) => ([("content-type", "application/json")], raw).into_response(),
        },
        Err(_) => api_error(axum::http::StatusCode::NOT_FOUND, "not_available", "artifact not yet available"),
    }
}

// ── Cleanup ──────────────────────────────────────────────────────────────

pub async fn cleanup_task_files(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    Json(_body): Json<CleanupTaskFilesRequest>,
) -> impl IntoResponse {
    if let Err(resp) = validate_task_id(&task_id) {
        return resp;
    }
    match state.cleanup_manager.force_cleanup(&task_id).await {
        Ok(bytes_reclaimed) => Json(serde_json::json!({ "files_removed": true, "bytes_reclaimed": bytes_reclaimed, "errors": [] as Vec<String> })).into_response(),
        Err(e) => Json(serde_json::json!({ "files_removed": false, "bytes_reclaimed": 0, "errors": [e.to_string()] })).into_response(),
    }
}

pub async fn get_cleanup_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.cleanup_manager.current_policy())
}

pub async fn get_cleanup_config(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.cleanup_manager.current_policy())
}

pub async fn configure_cleanup_policy(
    State(state): State<AppState>,
    Json(new_config): Json<CleanupConfig>,
) -> impl IntoResponse {
    match state.cleanup_manager.set_policy(new_config.clone()) {
        Ok(()) => Json(new_config).into_response(),
        Err(e) => api_error(axum::http::StatusCode::INTERNAL_SERVER_ERROR, "internal_error", e.to_string()),
    }
}

// ── Health ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct HealthSnapshot {
    status: &'static str,
    queue: QueueStatus,
    tts: Option<cf_tts::health::TtsHealthSnapshot>,
    active_tasks: Option<usize>,
}

pub async fn get_service_health(
    State(state): State<AppState>,
    axum::extract::Query(q): axum::extract::Query<GetServiceHealthQuery>,
) -> impl IntoResponse {
    let queue = state.task_runner.queue_status();
    let snapshot = HealthSnapshot {
        status: "ok",
        queue,
        tts: q.include_details.then(|| state.tts_gateway.health()),
        active_tasks: q
            .include_details
            .then(|| state.status_store.list(10_000, 0).into_iter().filter(|r| !r.status.is_terminal()).count()),
    };
    Json(snapshot)
}

/// Unauthenticated liveness probe.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_validation_rejects_too_short() {
        assert!(validate_task_id("short").is_err());
    }

    #[test]
    fn task_id_validation_accepts_uuid() {
        let id = uuid::Uuid::new_v4().to_string();
        assert!(validate_task_id(&id).is_ok());
    }

    #[test]
    fn source_input_maps_to_source_ref() {
        let input = SourceInput::Url { value: "https://example.com".into() };
        let source_ref: SourceRef = input.into();
        assert_eq!(source_ref.origin_label(), "https://example.com");
    }
}
