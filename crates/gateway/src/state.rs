use std::sync::Arc;

use cf_domain::config::Config;

use crate::runtime::cleanup::CleanupManager;
use crate::runtime::orchestrator::PipelineOrchestrator;
use crate::runtime::runner::TaskRunner;
use crate::runtime::status::StatusStore;
use crate::runtime::webhook::WebhookNotifier;
use cf_audio::AudioStitcher;
use cf_ingest::SourceIngestor;
use cf_providers::LlmGateway;
use cf_storage::ArtifactStore;
use cf_tts::TtsGateway;

use crate::api::oauth::OAuthState;

/// Shared application state passed to every API handler and to the
/// orchestrator running inside each `TaskRunner` worker.
///
/// Fields are grouped by concern, mirroring the component table of §2:
/// - **Core pipeline services** — the C1/C2/C4/C5/C6/C7/C8 singletons the
///   orchestrator (C9) drives.
/// - **Task runtime** — the bounded worker pool (C3).
/// - **Cleanup** — retention policy (C11).
/// - **Security** — inbound auth (C10 §4.10.1).
#[derive(Clone)]
pub struct AppState {
    // ── Core pipeline services ──────────────────────────────────────
    pub config: Arc<Config>,
    pub status_store: Arc<StatusStore>,
    pub artifact_store: Arc<dyn ArtifactStore>,
    pub source_ingestor: Arc<SourceIngestor>,
    pub llm_gateway: Arc<LlmGateway>,
    pub tts_gateway: Arc<TtsGateway>,
    pub audio_stitcher: Arc<AudioStitcher>,
    pub webhook_notifier: Arc<WebhookNotifier>,
    pub orchestrator: Arc<PipelineOrchestrator>,

    // ── Task runtime ─────────────────────────────────────────────────
    pub task_runner: Arc<TaskRunner>,

    // ── Cleanup ───────────────────────────────────────────────────────
    pub cleanup_manager: Arc<CleanupManager>,

    // ── Security (startup-computed) ───────────────────────────────────
    /// SHA-256 hash of each configured static API key. `None` entries are
    /// never stored; an empty vec means no static keys are configured.
    pub api_key_hashes: Arc<Vec<Vec<u8>>>,
    pub oauth: Arc<OAuthState>,
}
