//! Cooperative cancellation (§4.3, §5). A `CancelToken` is checked by the
//! orchestrator at every phase boundary and inside the per-turn dialogue
//! loop; one token per task, no group/hierarchy cascade.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// A cancellation token that can be checked by the orchestrator loop.
#[derive(Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Signal cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Returns `Err(Error::Cancelled)` if this token has been tripped.
    pub fn check(&self) -> cf_domain::error::Result<()> {
        if self.is_cancelled() {
            Err(cf_domain::error::Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks active cancellation tokens per running `task_id`.
pub struct CancelRegistry {
    tokens: Mutex<HashMap<String, CancelToken>>,
}

impl Default for CancelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelRegistry {
    pub fn new() -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Create and register a new cancel token for a task.
    pub fn register(&self, task_id: &str) -> CancelToken {
        let token = CancelToken::new();
        self.tokens.lock().insert(task_id.to_owned(), token.clone());
        token
    }

    /// Cancel a running task. Returns `true` if a token was found.
    pub fn cancel(&self, task_id: &str) -> bool {
        if let Some(token) = self.tokens.lock().get(task_id) {
            token.cancel();
            true
        } else {
            false
        }
    }

    /// Remove the token for a task (called when the worker finishes).
    pub fn remove(&self, task_id: &str) {
        self.tokens.lock().remove(task_id);
    }

    pub fn is_running(&self, task_id: &str) -> bool {
        self.tokens.lock().contains_key(task_id)
    }

    /// Snapshot of every currently-registered task id (§4.3 `QueueStatus`).
    pub fn active_task_ids(&self) -> Vec<String> {
        self.tokens.lock().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_lifecycle() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
        assert!(token.check().is_err());
    }

    #[test]
    fn registry_register_and_cancel() {
        let registry = CancelRegistry::new();
        let token = registry.register("task-1");
        assert!(!token.is_cancelled());
        assert!(registry.is_running("task-1"));

        assert!(registry.cancel("task-1"));
        assert!(token.is_cancelled());

        registry.remove("task-1");
        assert!(!registry.is_running("task-1"));
        assert!(!registry.cancel("task-1"));
    }

    #[test]
    fn cancel_nonexistent_task_returns_false() {
        let registry = CancelRegistry::new();
        assert!(!registry.cancel("does_not_exist"));
    }

    #[test]
    fn remove_is_idempotent() {
        let registry = CancelRegistry::new();
        registry.register("task-1");
        registry.remove("task-1");
        registry.remove("task-1");
        assert!(!registry.is_running("task-1"));
    }

    #[test]
    fn register_replaces_previous_token() {
        let registry = CancelRegistry::new();
        let old_token = registry.register("task-1");
        let new_token = registry.register("task-1");

        assert!(!old_token.is_cancelled());
        assert!(!new_token.is_cancelled());

        registry.cancel("task-1");
        assert!(new_token.is_cancelled());
    }

    #[test]
    fn cancel_token_clone_shares_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn cancel_token_default() {
        let token = CancelToken::default();
        assert!(!token.is_cancelled());
    }
}
