//! StatusStore (C1, §4.1): the durable `task_id → TaskRecord` mapping.
//!
//! Backed by a `sqlx` SQLite table with an in-process `RwLock<HashMap<...>>`
//! read-through cache in front of it (§3.1) so hot reads never touch the
//! DB. Writes go to the DB first, then update the cache — mutations on a
//! given `task_id` are serialized through a per-task `tokio::sync::Mutex`
//! so two concurrent callers never interleave a read-modify-write (§5
//! "StatusStore mutations ... are serializable").

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use cf_domain::error::{Error, Result};
use cf_domain::models::{ArtifactUpdate, LogEntry, Phase, ResultEpisode, TaskError, TaskRecord};
use parking_lot::RwLock;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use tokio::sync::broadcast;
use tokio::sync::Mutex as AsyncMutex;

/// Logs are bounded per task; oldest entries are dropped once the cap is
/// exceeded (§3 TaskRecord.logs).
const MAX_LOG_ENTRIES: usize = 5000;

/// Broadcast channel capacity (§4.10 SSE subscription). Lagging
/// subscribers just miss events — they can always re-fetch the current
/// snapshot via `get`.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// One push notification for a `task_id`'s live status subscription
/// (`jobs/<task_id>/status` SSE resource, §4.10). Carries only the fields
/// a subscriber needs to decide whether to re-fetch; the full record is
/// always available via `StatusStore::get`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TaskEvent {
    pub task_id: String,
    pub status: Phase,
    pub progress_pct: u8,
}

pub enum CreateOutcome {
    Created(TaskRecord),
    AlreadyExists,
}

pub enum UpdateOutcome {
    Updated,
    NotFound,
    TerminalViolation,
}

pub struct StatusStore {
    pool: SqlitePool,
    cache: RwLock<HashMap<String, TaskRecord>>,
    task_locks: AsyncMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    events: broadcast::Sender<TaskEvent>,
}

impl StatusStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(Error::Database)?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS tasks (
                task_id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                progress_pct INTEGER NOT NULL,
                status_description TEXT NOT NULL,
                created_at TEXT NOT NULL,
                last_updated_at TEXT NOT NULL,
                request_data TEXT NOT NULL,
                logs TEXT NOT NULL,
                artifacts TEXT NOT NULL,
                error TEXT,
                result_episode TEXT
            )",
        )
        .execute(&pool)
        .await
        .map_err(Error::Database)?;

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let store = Self {
            pool,
            cache: RwLock::new(HashMap::new()),
            task_locks: AsyncMutex::new(HashMap::new()),
            events,
        };
        store.warm_cache().await?;
        Ok(store)
    }

    /// Subscribe to live `TaskEvent`s for every task (§4.10 SSE resource).
    /// Callers filter by `task_id` themselves — one process-wide channel
    /// is simpler than a per-task registry and subscriber counts here are
    /// always small.
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.events.subscribe()
    }

    fn publish(&self, record: &TaskRecord) {
        let _ = self.events.send(TaskEvent {
            task_id: record.task_id.clone(),
            status: record.status,
            progress_pct: record.progress_pct,
        });
    }

    async fn warm_cache(&self) -> Result<()> {
        let rows = sqlx::query("SELECT * FROM tasks")
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        let mut cache = self.cache.write();
        for row in rows {
            if let Ok(record) = row_to_record(&row) {
                cache.insert(record.task_id.clone(), record);
            }
        }
        Ok(())
    }

    async fn lock_for(&self, task_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.task_locks.lock().await;
        locks
            .entry(task_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    async fn persist(&self, record: &TaskRecord) -> Result<()> {
        let status = serde_json::to_string(&record.status).map_err(Error::Json)?;
        let logs = serde_json::to_string(&record.logs).map_err(Error::Json)?;
        let artifacts = serde_json::to_string(&record.artifacts).map_err(Error::Json)?;
        let error = record
            .error
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(Error::Json)?;
        let result_episode = record
            .result_episode
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(Error::Json)?;

        sqlx::query(
            "INSERT INTO tasks (task_id, status, progress_pct, status_description, created_at, \
             last_updated_at, request_data, logs, artifacts, error, result_episode) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(task_id) DO UPDATE SET \
             status=excluded.status, progress_pct=excluded.progress_pct, \
             status_description=excluded.status_description, last_updated_at=excluded.last_updated_at, \
             request_data=excluded.request_data, logs=excluded.logs, artifacts=excluded.artifacts, \
             error=excluded.error, result_episode=excluded.result_episode",
        )
        .bind(&record.task_id)
        .bind(status.trim_matches('"'))
        .bind(record.progress_pct as i64)
        .bind(&record.status_description)
        .bind(record.created_at.to_rfc3339())
        .bind(record.last_updated_at.to_rfc3339())
        .bind(record.request.to_string())
        .bind(logs)
        .bind(artifacts)
        .bind(error)
        .bind(result_episode)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    /// `Create(task_id, request) → TaskRecord | AlreadyExists` (§4.1).
    pub async fn create(&self, task_id: &str, request: serde_json::Value) -> Result<CreateOutcome> {
        let lock = self.lock_for(task_id).await;
        let _guard = lock.lock().await;

        if self.cache.read().contains_key(task_id) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        let record = TaskRecord::new(task_id.to_string(), request);
        self.persist(&record).await?;
        self.cache.write().insert(task_id.to_string(), record.clone());
        Ok(CreateOutcome::Created(record))
    }

    /// `Get(task_id) → TaskRecord | NotFound`. Returns an owned snapshot;
    /// mutating it never affects the store.
    pub fn get(&self, task_id: &str) -> Option<TaskRecord> {
        self.cache.read().get(task_id).cloned()
    }

    pub fn list(&self, limit: usize, offset: usize) -> Vec<TaskRecord> {
        let cache = self.cache.read();
        let mut records: Vec<&TaskRecord> = cache.values().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    }

    /// `UpdateStatus(task_id, new_status, desc?, progress?) → ok | NotFound | TerminalViolation`.
    ///
    /// `progress_pct` is clamped to be non-decreasing (§8 invariant 1):
    /// a caller-supplied value lower than the current one is raised to the
    /// current value rather than rejected outright.
    pub async fn update_status(
        &self,
        task_id: &str,
        new_status: Phase,
        desc: Option<String>,
        progress: Option<u8>,
    ) -> Result<UpdateOutcome> {
        let lock = self.lock_for(task_id).await;
        let _guard = lock.lock().await;

        let Some(mut record) = self.get(task_id) else {
            return Ok(UpdateOutcome::NotFound);
        };
        if record.status.is_terminal() {
            tracing::warn!(task_id, ?new_status, "dropped status update on terminal task");
            return Ok(UpdateOutcome::TerminalViolation);
        }

        record.status = new_status;
        if let Some(d) = desc {
            record.status_description = d;
        }
        if let Some(p) = progress {
            record.progress_pct = p.max(record.progress_pct);
        } else {
            record.progress_pct = record.progress_pct.max(new_status.entry_progress());
        }
        record.last_updated_at = Utc::now();

        self.persist(&record).await?;
        self.publish(&record);
        self.cache.write().insert(task_id.to_string(), record);
        Ok(UpdateOutcome::Updated)
    }

    /// `AppendLog(task_id, entry) → ok | NotFound`.
    pub async fn append_log(&self, task_id: &str, entry: LogEntry) -> Result<UpdateOutcome> {
        let lock = self.lock_for(task_id).await;
        let _guard = lock.lock().await;

        let Some(mut record) = self.get(task_id) else {
            return Ok(UpdateOutcome::NotFound);
        };
        record.logs.push(entry);
        if record.logs.len() > MAX_LOG_ENTRIES {
            let overflow = record.logs.len() - MAX_LOG_ENTRIES;
            record.logs.drain(0..overflow);
        }
        record.last_updated_at = Utc::now();
        self.persist(&record).await?;
        self.cache.write().insert(task_id.to_string(), record);
        Ok(UpdateOutcome::Updated)
    }

    /// `UpdateArtifacts(task_id, flags) → ok | NotFound`.
    pub async fn update_artifacts(&self, task_id: &str, update: ArtifactUpdate) -> Result<UpdateOutcome> {
        let lock = self.lock_for(task_id).await;
        let _guard = lock.lock().await;

        let Some(mut record) = self.get(task_id) else {
            return Ok(UpdateOutcome::NotFound);
        };
        if let Some(v) = update.source_analyses_available {
            record.artifacts.source_analyses_available = v;
        }
        if let Some(v) = update.persona_research_available {
            record.artifacts.persona_research_available = v;
        }
        if let Some(v) = update.outline_available {
            record.artifacts.outline_available = v;
        }
        if let Some(v) = update.dialogue_available {
            record.artifacts.dialogue_available = v;
        }
        if let Some(v) = update.audio_segments_available {
            record.artifacts.audio_segments_available = v;
        }
        if let Some(v) = update.final_audio_available {
            record.artifacts.final_audio_available = v;
        }
        if let Some(key) = update.final_audio_key {
            record.artifacts.final_audio_key = Some(key);
        }
        record.last_updated_at = Utc::now();
        self.persist(&record).await?;
        self.cache.write().insert(task_id.to_string(), record);
        Ok(UpdateOutcome::Updated)
    }

    /// `SetError(task_id, user_msg, tech_detail) → ok | NotFound`;
    /// transitions to `Failed` if not already terminal.
    pub async fn set_error(&self, task_id: &str, user_message: String, technical_detail: String) -> Result<UpdateOutcome> {
        let lock = self.lock_for(task_id).await;
        let _guard = lock.lock().await;

        let Some(mut record) = self.get(task_id) else {
            return Ok(UpdateOutcome::NotFound);
        };
        if record.status.is_terminal() {
            tracing::warn!(task_id, "dropped SetError on terminal task");
            return Ok(UpdateOutcome::TerminalViolation);
        }
        record.status = Phase::Failed;
        record.error = Some(TaskError { user_message, technical_detail });
        record.last_updated_at = Utc::now();
        self.persist(&record).await?;
        self.publish(&record);
        self.cache.write().insert(task_id.to_string(), record);
        Ok(UpdateOutcome::Updated)
    }

    /// `SetEpisode(task_id, episode) → ok | NotFound`.
    pub async fn set_episode(&self, task_id: &str, episode: ResultEpisode) -> Result<UpdateOutcome> {
        let lock = self.lock_for(task_id).await;
        let _guard = lock.lock().await;

        let Some(mut record) = self.get(task_id) else {
            return Ok(UpdateOutcome::NotFound);
        };
        record.result_episode = Some(episode);
        record.last_updated_at = Utc::now();
        self.persist(&record).await?;
        self.cache.write().insert(task_id.to_string(), record);
        Ok(UpdateOutcome::Updated)
    }

    /// `Delete(task_id) → ok | NotFound`.
    pub async fn delete(&self, task_id: &str) -> Result<UpdateOutcome> {
        let lock = self.lock_for(task_id).await;
        let _guard = lock.lock().await;

        if self.cache.write().remove(task_id).is_none() {
            return Ok(UpdateOutcome::NotFound);
        }
        sqlx::query("DELETE FROM tasks WHERE task_id = ?")
            .bind(task_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(UpdateOutcome::Updated)
    }
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<TaskRecord> {
    let status_str: String = row.try_get("status").map_err(Error::Database)?;
    let status: Phase = serde_json::from_str(&format!("\"{status_str}\"")).map_err(Error::Json)?;
    let request_data: String = row.try_get("request_data").map_err(Error::Database)?;
    let logs_raw: String = row.try_get("logs").map_err(Error::Database)?;
    let artifacts_raw: String = row.try_get("artifacts").map_err(Error::Database)?;
    let error_raw: Option<String> = row.try_get("error").map_err(Error::Database)?;
    let episode_raw: Option<String> = row.try_get("result_episode").map_err(Error::Database)?;
    let created_at: String = row.try_get("created_at").map_err(Error::Database)?;
    let last_updated_at: String = row.try_get("last_updated_at").map_err(Error::Database)?;

    Ok(TaskRecord {
        task_id: row.try_get("task_id").map_err(Error::Database)?,
        status,
        progress_pct: row.try_get::<i64, _>("progress_pct").map_err(Error::Database)? as u8,
        status_description: row.try_get("status_description").map_err(Error::Database)?,
        created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| Error::Other(e.to_string()))?
            .with_timezone(&Utc),
        last_updated_at: chrono::DateTime::parse_from_rfc3339(&last_updated_at)
            .map_err(|e| Error::Other(e.to_string()))?
            .with_timezone(&Utc),
        request: serde_json::from_str(&request_data).map_err(Error::Json)?,
        logs: serde_json::from_str(&logs_raw).map_err(Error::Json)?,
        artifacts: serde_json::from_str(&artifacts_raw).map_err(Error::Json)?,
        error: error_raw.map(|e| serde_json::from_str(&e)).transpose().map_err(Error::Json)?,
        result_episode: episode_raw.map(|e| serde_json::from_str(&e)).transpose().map_err(Error::Json)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> StatusStore {
        StatusStore::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let s = store().await;
        let outcome = s.create("task-1", serde_json::json!({"a": 1})).await.unwrap();
        assert!(matches!(outcome, CreateOutcome::Created(_)));
        let record = s.get("task-1").unwrap();
        assert_eq!(record.status, Phase::Queued);
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let s = store().await;
        s.create("task-1", serde_json::json!({})).await.unwrap();
        let outcome = s.create("task-1", serde_json::json!({})).await.unwrap();
        assert!(matches!(outcome, CreateOutcome::AlreadyExists));
    }

    #[tokio::test]
    async fn update_status_is_monotonic_in_progress() {
        let s = store().await;
        s.create("task-1", serde_json::json!({})).await.unwrap();
        s.update_status("task-1", Phase::AnalyzingSources, None, Some(20))
            .await
            .unwrap();
        // A lower progress value than current must not regress it.
        s.update_status("task-1", Phase::ResearchingPersonas, None, Some(10))
            .await
            .unwrap();
        let record = s.get("task-1").unwrap();
        assert_eq!(record.status, Phase::ResearchingPersonas);
        assert!(record.progress_pct >= 20);
    }

    #[tokio::test]
    async fn terminal_status_rejects_further_updates() {
        let s = store().await;
        s.create("task-1", serde_json::json!({})).await.unwrap();
        s.update_status("task-1", Phase::Completed, None, Some(100))
            .await
            .unwrap();
        let outcome = s
            .update_status("task-1", Phase::Failed, None, None)
            .await
            .unwrap();
        assert!(matches!(outcome, UpdateOutcome::TerminalViolation));
        let record = s.get("task-1").unwrap();
        assert_eq!(record.status, Phase::Completed);
    }

    #[tokio::test]
    async fn set_error_transitions_to_failed() {
        let s = store().await;
        s.create("task-1", serde_json::json!({})).await.unwrap();
        s.set_error("task-1", "oops".into(), "stack trace".into()).await.unwrap();
        let record = s.get("task-1").unwrap();
        assert_eq!(record.status, Phase::Failed);
        assert_eq!(record.error.unwrap().user_message, "oops");
    }

    #[tokio::test]
    async fn append_log_caps_at_max_entries() {
        let s = store().await;
        s.create("task-1", serde_json::json!({})).await.unwrap();
        for i in 0..5010 {
            s.append_log(
                "task-1",
                LogEntry {
                    ts: Utc::now(),
                    phase: Phase::Queued,
                    sub_task: None,
                    message: format!("entry {i}"),
                },
            )
            .await
            .unwrap();
        }
        let record = s.get("task-1").unwrap();
        assert_eq!(record.logs.len(), MAX_LOG_ENTRIES);
        assert_eq!(record.logs.last().unwrap().message, "entry 5009");
    }

    #[tokio::test]
    async fn delete_removes_from_cache_and_db() {
        let s = store().await;
        s.create("task-1", serde_json::json!({})).await.unwrap();
        s.delete("task-1").await.unwrap();
        assert!(s.get("task-1").is_none());
        let outcome = s.delete("task-1").await.unwrap();
        assert!(matches!(outcome, UpdateOutcome::NotFound));
    }

    #[tokio::test]
    async fn status_updates_publish_task_events() {
        let s = store().await;
        let mut rx = s.subscribe();
        s.create("task-1", serde_json::json!({})).await.unwrap();
        s.update_status("task-1", Phase::AnalyzingSources, None, None)
            .await
            .unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.task_id, "task-1");
        assert_eq!(event.status, Phase::AnalyzingSources);
    }

    #[tokio::test]
    async fn list_paginates_newest_first() {
        let s = store().await;
        for i in 0..5 {
            s.create(&format!("task-{i}"), serde_json::json!({})).await.unwrap();
        }
        let page = s.list(2, 0);
        assert_eq!(page.len(), 2);
    }
}
