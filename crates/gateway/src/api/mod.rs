pub mod auth;
pub mod control;
pub mod oauth;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the full API router.
///
/// Routes are split into **public** (no auth required — liveness probe and
/// the embedded OAuth authorization server itself) and **protected** (the
/// ControlSurface, gated behind [`auth::require_bearer`]).
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/v1/health", get(control::health))
        .merge(oauth::router());

    let protected = Router::new()
        .route("/v1/podcast/generate", post(control::generate_podcast))
        .route("/v1/jobs/:task_id", get(control::get_task_status))
        .route("/v1/jobs/:task_id/cancel", post(control::cancel_task))
        .route("/v1/jobs/:task_id/status", get(control::task_status_sse))
        .route("/v1/jobs/:task_id/logs", get(control::get_task_logs))
        .route("/v1/jobs/:task_id/warnings", get(control::get_task_warnings))
        .route("/v1/podcast/:task_id/outline", get(control::get_outline))
        .route("/v1/podcast/:task_id/transcript", get(control::get_transcript))
        .route("/v1/podcast/:task_id/audio", get(control::get_audio))
        .route("/v1/podcast/:task_id/metadata", get(control::get_metadata))
        .route(
            "/v1/research/:task_id/:person_id",
            get(control::get_persona_research),
        )
        .route("/v1/jobs/:task_id/cleanup", post(control::cleanup_task_files))
        .route("/v1/cleanup/status", get(control::get_cleanup_status))
        .route("/v1/cleanup/config", get(control::get_cleanup_config))
        .route("/v1/cleanup/config", post(control::configure_cleanup_policy))
        .route("/v1/health/service", get(control::get_service_health))
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::require_bearer,
        ));

    public
        .merge(protected)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
