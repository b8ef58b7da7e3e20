//! TaskRunner (C3, §4.3): a single bounded worker pool shared by every
//! task, as opposed to the teacher's per-session semaphore map — this
//! spec has one global capacity limit (`tasks.max_concurrent`), not a
//! per-caller one.
//!
//! `submit` makes an immediate accept/reject decision via
//! `try_acquire_owned` rather than queueing: callers that can't get a
//! slot see `Error::CapacityError` synchronously (§4.3 "AtCapacity").

use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::runtime::cancel::{CancelRegistry, CancelToken};
use cf_domain::error::{Error, Result};

#[derive(Debug, Clone, serde::Serialize)]
pub struct QueueStatus {
    pub active: usize,
    pub max_workers: usize,
    pub available_slots: usize,
    pub active_task_ids: Vec<String>,
}

pub struct TaskRunner {
    semaphore: Arc<Semaphore>,
    max_workers: usize,
    cancel_registry: Arc<CancelRegistry>,
}

impl TaskRunner {
    pub fn new(max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_workers)),
            max_workers,
            cancel_registry: Arc::new(CancelRegistry::new()),
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn can_accept(&self) -> bool {
        self.semaphore.available_permits() > 0
    }

    pub fn queue_status(&self) -> QueueStatus {
        let available_slots = self.semaphore.available_permits();
        QueueStatus {
            active: self.max_workers - available_slots,
            max_workers: self.max_workers,
            available_slots,
            active_task_ids: self.cancel_registry.active_task_ids(),
        }
    }

    pub fn is_running(&self, task_id: &str) -> bool {
        self.cancel_registry.is_running(task_id)
    }

    /// Cancel a running task. Returns `true` if it was found running.
    pub fn cancel(&self, task_id: &str) -> bool {
        self.cancel_registry.cancel(task_id)
    }

    /// Submits `task_id` for background execution. `work` receives the
    /// task's `CancelToken` so it can check for cooperative cancellation
    /// at phase boundaries (§4.9).
    ///
    /// Returns `Error::CapacityError` immediately if no worker slot is
    /// free, and `Error::InputError` if `task_id` is already running
    /// (duplicate submission, §4.3).
    pub fn submit<F, Fut>(&self, task_id: String, work: F) -> Result<()>
    where
        F: FnOnce(CancelToken) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        if self.cancel_registry.is_running(&task_id) {
            return Err(Error::InputError(format!(
                "task {task_id} is already running"
            )));
        }
        let permit = self
            .semaphore
            .clone()
            .try_acquire_owned()
            .map_err(|_| Error::CapacityError("no worker slots available".into()))?;

        let token = self.cancel_registry.register(&task_id);
        let registry = self.cancel_registry.clone();
        let cleanup_task_id = task_id.clone();

        tokio::spawn(async move {
            let _permit = permit;
            work(token).await;
            registry.remove(&cleanup_task_id);
        });
        Ok(())
    }

    /// Blocks until every in-flight worker has released its permit
    /// (graceful shutdown, §4.3).
    pub async fn shutdown(&self) {
        let _ = self.semaphore.acquire_many(self.max_workers as u32).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn submit_runs_work_and_releases_slot() {
        let runner = TaskRunner::new(2);
        let ran = Arc::new(AtomicUsize::new(0));
        let ran2 = ran.clone();
        runner
            .submit("t1".into(), move |_token| async move {
                ran2.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(runner.queue_status().active, 0);
    }

    #[tokio::test]
    async fn submit_rejects_when_at_capacity() {
        let runner = TaskRunner::new(1);
        runner
            .submit("t1".into(), |_token| async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
            })
            .unwrap();
        let err = runner.submit("t2".into(), |_token| async move {}).unwrap_err();
        assert!(matches!(err, Error::CapacityError(_)));
    }

    #[tokio::test]
    async fn duplicate_task_id_is_rejected() {
        let runner = TaskRunner::new(2);
        runner
            .submit("t1".into(), |_token| async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
            })
            .unwrap();
        let err = runner.submit("t1".into(), |_token| async move {}).unwrap_err();
        assert!(matches!(err, Error::InputError(_)));
    }

    #[tokio::test]
    async fn cancel_trips_the_tokens_observed_by_work() {
        let runner = TaskRunner::new(1);
        let observed = Arc::new(AtomicUsize::new(0));
        let observed2 = observed.clone();
        runner
            .submit("t1".into(), move |token| async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                if token.is_cancelled() {
                    observed2.fetch_add(1, Ordering::SeqCst);
                }
            })
            .unwrap();
        assert!(runner.cancel("t1"));
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(observed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancel_unknown_task_returns_false() {
        let runner = TaskRunner::new(1);
        assert!(!runner.cancel("ghost"));
    }
}
