//! CleanupManager (C11, §4.11). Wraps the already-pure
//! [`CleanupConfig::should_cleanup_now`] policy evaluation with a
//! background scheduler (grounded in the teacher's interval-loop idiom
//! from `main.rs`'s `spawn_background_tasks`) and the artifact-deletion
//! execution it drives, using the shared key layout in
//! [`super::blob_keys`].

use std::sync::Arc;
use std::time::Duration;

use cf_domain::config::{CleanupConfig, CleanupPolicy};
use cf_domain::error::Result;
use cf_domain::trace::TraceEvent;
use cf_storage::ArtifactStore;
use parking_lot::RwLock;

use crate::runtime::blob_keys::{self, ArtifactCategory};
use crate::runtime::status::StatusStore;

pub struct CleanupManager {
    config: RwLock<CleanupConfig>,
    artifact_store: Arc<dyn ArtifactStore>,
    status_store: Arc<StatusStore>,
}

impl CleanupManager {
    pub fn new(
        config: CleanupConfig,
        artifact_store: Arc<dyn ArtifactStore>,
        status_store: Arc<StatusStore>,
    ) -> Self {
        Self {
            config: RwLock::new(config),
            artifact_store,
            status_store,
        }
    }

    pub fn current_policy(&self) -> CleanupConfig {
        self.config.read().clone()
    }

    /// `ConfigureCleanupPolicy` — persists the new policy to disk and swaps
    /// it in for subsequent sweeps (§4.11, §6 tool surface).
    pub fn set_policy(&self, new_config: CleanupConfig) -> std::io::Result<()> {
        new_config.save()?;
        *self.config.write() = new_config;
        Ok(())
    }

    /// `CleanupTaskFiles(task_id)` — explicit, unconditional deletion of
    /// every artifact belonging to the task, regardless of retention
    /// flags (an explicit ask overrides the default policy).
    pub async fn force_cleanup(&self, task_id: &str) -> Result<u64> {
        self.delete_matching(task_id, |_| true).await
    }

    /// One pass over all terminal tasks: deletes the artifact categories
    /// the current policy does not retain, for any task whose completion
    /// time makes it due per `should_cleanup_now` (§4.11).
    pub async fn sweep_once(&self) -> Result<u64> {
        let policy = self.current_policy();
        let now = chrono::Utc::now();
        let mut reclaimed = 0u64;

        for record in self.status_store.list(10_000, 0) {
            if !record.status.is_terminal() {
                continue;
            }
            if !policy.should_cleanup_now(record.last_updated_at, now) {
                continue;
            }
            reclaimed += self.sweep_task(&record.task_id, &policy).await?;
        }
        Ok(reclaimed)
    }

    async fn sweep_task(&self, task_id: &str, policy: &CleanupConfig) -> Result<u64> {
        let force_non_audio_delete = policy.default_policy == CleanupPolicy::RetainAudioOnly;
        let should_delete = |category: ArtifactCategory| match category {
            ArtifactCategory::FinalAudio => {
                !policy.retain_audio_files && policy.default_policy != CleanupPolicy::RetainAudioOnly
            }
            ArtifactCategory::AudioSegments => !policy.retain_audio_segments || force_non_audio_delete,
            ArtifactCategory::Transcript => !policy.retain_transcripts || force_non_audio_delete,
            ArtifactCategory::LlmOutputs => !policy.retain_llm_outputs || force_non_audio_delete,
        };
        let reclaimed = self.delete_matching(task_id, should_delete).await?;
        if reclaimed > 0 {
            TraceEvent::CleanupPerformed {
                task_id: task_id.to_string(),
                bytes_reclaimed: reclaimed,
            }
            .emit();
        }
        Ok(reclaimed)
    }

    async fn delete_matching(
        &self,
        task_id: &str,
        should_delete: impl Fn(ArtifactCategory) -> bool,
    ) -> Result<u64> {
        let mut reclaimed = 0u64;
        let prefixes = [blob_keys::audio_prefix(task_id), blob_keys::text_prefix(task_id)];
        for prefix in prefixes {
            for key in self.artifact_store.list(&prefix).await? {
                if !should_delete(blob_keys::classify(&key)) {
                    continue;
                }
                if let Ok(bytes) = self.artifact_store.get_bytes(&key).await {
                    reclaimed += bytes.len() as u64;
                }
                self.artifact_store.delete(&key).await?;
            }
        }
        Ok(reclaimed)
    }

    /// Spawns the background sweep loop (§4.11 `background_cleanup_interval_minutes`).
    /// Gated on `enable_background_cleanup`; sleeps and re-checks rather
    /// than exiting, so a later `ConfigureCleanupPolicy` call re-enables it.
    pub fn spawn_background_sweep(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let interval_minutes = {
                    let policy = self.current_policy();
                    if !policy.enable_background_cleanup {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        continue;
                    }
                    policy.background_cleanup_interval_minutes.max(1)
                };
                tokio::time::sleep(Duration::from_secs(interval_minutes * 60)).await;
                if let Err(e) = self.sweep_once().await {
                    tracing::warn!(error = %e, "cleanup sweep failed");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cf_domain::models::Phase;
    use cf_storage::cache::TextCache;
    use cf_storage::local::LocalArtifactStore;

    #[tokio::test]
    async fn force_cleanup_deletes_everything_for_the_task() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn ArtifactStore> =
            Arc::new(LocalArtifactStore::new(dir.path().to_path_buf(), TextCache::default()));
        store
            .put_text(&blob_keys::transcript_key("task-1"), "hello", "text/plain")
            .await
            .unwrap();
        store
            .put_bytes(&blob_keys::final_audio_key("task-1"), vec![1, 2, 3], "audio/mpeg")
            .await
            .unwrap();

        let status_store = Arc::new(StatusStore::connect("sqlite::memory:").await.unwrap());
        let manager = CleanupManager::new(CleanupConfig::default(), store.clone(), status_store);

        let reclaimed = manager.force_cleanup("task-1").await.unwrap();
        assert!(reclaimed > 0);
        assert!(store.list(&blob_keys::audio_prefix("task-1")).await.unwrap().is_empty());
        assert!(store.list(&blob_keys::text_prefix("task-1")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sweep_respects_retain_audio_files() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn ArtifactStore> =
            Arc::new(LocalArtifactStore::new(dir.path().to_path_buf(), TextCache::default()));
        store
            .put_bytes(&blob_keys::final_audio_key("task-1"), vec![1, 2, 3], "audio/mpeg")
            .await
            .unwrap();
        store
            .put_text(&blob_keys::transcript_key("task-1"), "hello", "text/plain")
            .await
            .unwrap();

        let status_store = Arc::new(StatusStore::connect("sqlite::memory:").await.unwrap());
        status_store
            .create("task-1", serde_json::json!({}))
            .await
            .unwrap();
        status_store
            .update_status("task-1", Phase::Completed, None, Some(100))
            .await
            .unwrap();

        let mut config = CleanupConfig::default();
        config.default_policy = CleanupPolicy::AutoOnComplete;
        config.retain_audio_files = true;
        config.retain_transcripts = false;

        let manager = CleanupManager::new(config, store.clone(), status_store);
        manager.sweep_once().await.unwrap();

        let audio_remaining = store.list(&blob_keys::audio_prefix("task-1")).await.unwrap();
        let text_remaining = store.list(&blob_keys::text_prefix("task-1")).await.unwrap();
        assert!(!audio_remaining.is_empty());
        assert!(text_remaining.is_empty());
    }
}
