use serde::Serialize;

/// Structured trace events emitted across all castforge crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    /// A pipeline phase (P0-P9) started for a task.
    PhaseStarted { task_id: String, phase: String },
    /// A pipeline phase completed successfully.
    PhaseCompleted {
        task_id: String,
        phase: String,
        duration_ms: u64,
    },
    /// A pipeline phase failed. `fatal` distinguishes a whole-task abort
    /// from a per-item degradation that the phase recovered from.
    PhaseFailed {
        task_id: String,
        phase: String,
        error: String,
        fatal: bool,
    },
    /// A task transitioned to the cancelled terminal state.
    TaskCancelled { task_id: String, phase: String },
    LlmRequest {
        provider: String,
        model: String,
        role: String,
        duration_ms: u64,
        prompt_tokens: Option<u32>,
        completion_tokens: Option<u32>,
        repaired: bool,
    },
    LlmFallback {
        from_provider: String,
        from_model: String,
        to_provider: String,
        to_model: String,
        reason: String,
    },
    TtsSynthesized {
        task_id: String,
        segment_index: usize,
        voice: String,
        duration_ms: u64,
    },
    AudioStitched {
        task_id: String,
        segment_count: usize,
        total_duration_ms: u64,
    },
    WebhookDelivered {
        task_id: String,
        status: String,
        attempt: u32,
        duration_ms: u64,
    },
    WebhookFailed {
        task_id: String,
        status: String,
        attempt: u32,
        error: String,
        exhausted: bool,
    },
    CleanupPerformed {
        task_id: String,
        bytes_reclaimed: u64,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "cf_event");
    }
}
