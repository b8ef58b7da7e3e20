//! AppState construction and background-task spawning extracted from
//! `main.rs`, so tests and alternate entrypoints can boot the full
//! runtime without an HTTP listener.

use std::sync::Arc;

use anyhow::Context;
use sha2::{Digest, Sha256};

use cf_audio::AudioStitcher;
use cf_domain::config::{CleanupConfig, Config, ConfigSeverity};
use cf_ingest::SourceIngestor;
use cf_providers::{LlmGateway, LlmRouter};
use cf_storage::cache::TextCache;
use cf_storage::local::LocalArtifactStore;
use cf_storage::remote::RemoteArtifactStore;
use cf_storage::ArtifactStore;
use cf_tts::backend::GoogleTtsBackend;
use cf_tts::gateway::TtsGateway;

use crate::api::oauth::OAuthState;
use crate::runtime::cleanup::CleanupManager;
use crate::runtime::orchestrator::PipelineOrchestrator;
use crate::runtime::runner::TaskRunner;
use crate::runtime::status::StatusStore;
use crate::runtime::webhook::WebhookNotifier;
use crate::state::AppState;

/// Validate config, initialize every subsystem and return a fully-wired
/// [`AppState`]. Shared boot path for `main.rs` and integration tests.
pub async fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── StatusStore ──────────────────────────────────────────────────
    let status_store = Arc::new(
        StatusStore::connect(&config.database.url)
            .await
            .context("connecting StatusStore")?,
    );
    tracing::info!(url = %config.database.url, "status store ready");

    // ── ArtifactStore ────────────────────────────────────────────────
    let text_cache = TextCache::new(
        config.artifact_store.text_cache_size,
        std::time::Duration::from_secs(config.artifact_store.text_cache_ttl_secs),
    );
    let artifact_store: Arc<dyn ArtifactStore> = if let Some(bucket) = &config.artifact_store.bucket {
        let gcs = object_store::gcp::GoogleCloudStorageBuilder::from_env()
            .with_bucket_name(bucket)
            .build()
            .context("building GCS artifact store backend")?;
        tracing::info!(bucket = %bucket, "artifact store ready (remote GCS backend)");
        Arc::new(RemoteArtifactStore::new(Arc::new(gcs), text_cache))
    } else {
        let root = config.outputs.root.clone();
        std::fs::create_dir_all(&root).context("creating outputs root")?;
        tracing::info!(root = %root.display(), "artifact store ready (local backend)");
        Arc::new(LocalArtifactStore::new(root, text_cache))
    };

    // ── Source ingestion ─────────────────────────────────────────────
    let source_ingestor = Arc::new(SourceIngestor::new());

    // ── LLM gateway ──────────────────────────────────────────────────
    let llm_router = LlmRouter::from_config(&config.llm).context("initializing LLM providers")?;
    let llm_gateway = Arc::new(LlmGateway::new(llm_router));
    tracing::info!("LLM gateway ready");

    // ── TTS gateway ──────────────────────────────────────────────────
    let tts_api_key = std::env::var(&config.tts.api_key_env).unwrap_or_default();
    if tts_api_key.is_empty() {
        tracing::warn!(
            env_var = %config.tts.api_key_env,
            "TTS API key not set — speech synthesis calls will fail"
        );
    }
    let tts_backend = Arc::new(GoogleTtsBackend::new(tts_api_key));
    let tts_gateway = Arc::new(TtsGateway::new(tts_backend, &config.tts));
    tracing::info!("TTS gateway ready");

    // ── Audio stitcher ───────────────────────────────────────────────
    let audio_stitcher = Arc::new(AudioStitcher::new(config.tts.inter_turn_silence_ms));

    // ── Webhook notifier ─────────────────────────────────────────────
    let webhook_notifier = Arc::new(WebhookNotifier::new());

    // ── Pipeline orchestrator ────────────────────────────────────────
    let orchestrator = Arc::new(PipelineOrchestrator::new(
        status_store.clone(),
        artifact_store.clone(),
        source_ingestor.clone(),
        llm_gateway.clone(),
        tts_gateway.clone(),
        audio_stitcher.clone(),
        webhook_notifier.clone(),
    ));

    // ── Task runner ──────────────────────────────────────────────────
    let task_config = config.tasks.clamped();
    let task_runner = Arc::new(TaskRunner::new(task_config.max_concurrent_generations));
    tracing::info!(
        max_concurrent = task_config.max_concurrent_generations,
        "task runner ready"
    );

    // ── Cleanup manager ──────────────────────────────────────────────
    let cleanup_config = CleanupConfig::load().context("loading cleanup policy")?;
    let cleanup_manager = Arc::new(CleanupManager::new(
        cleanup_config,
        artifact_store.clone(),
        status_store.clone(),
    ));
    tracing::info!("cleanup manager ready");

    // ── Static API keys (read once, hashed for constant-time comparison) ──
    let api_key_hashes: Vec<Vec<u8>> = config
        .auth
        .api_key_envs
        .iter()
        .filter_map(|env_var| {
            std::env::var(env_var).ok().filter(|v| !v.is_empty()).map(|key| {
                tracing::info!(env_var = %env_var, "static API key loaded");
                Sha256::digest(key.as_bytes()).to_vec()
            })
        })
        .collect();
    if api_key_hashes.is_empty() {
        tracing::warn!("no static API keys configured — only OAuth bearer tokens will be accepted");
    }

    // ── Embedded OAuth authorization server ──────────────────────────
    let oauth = Arc::new(OAuthState::new(config.auth.oauth.clone()));
    tracing::info!("OAuth authorization server ready");

    Ok(AppState {
        config,
        status_store,
        artifact_store,
        source_ingestor,
        llm_gateway,
        tts_gateway,
        audio_stitcher,
        webhook_notifier,
        orchestrator,
        task_runner,
        cleanup_manager,
        api_key_hashes: Arc::new(api_key_hashes),
        oauth,
    })
}

/// Spawn long-running background tokio tasks (currently: the cleanup
/// sweep). Call after [`build_app_state`] when running the HTTP server;
/// one-shot invocations (tests) typically skip this.
pub fn spawn_background_tasks(state: &AppState) {
    state.cleanup_manager.clone().spawn_background_sweep();
    tracing::info!("background tasks spawned");
}
