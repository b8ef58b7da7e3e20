/// Shared error type used across all castforge crates.
///
/// Variants map onto the pipeline's error taxonomy: callers use the
/// variant to decide whether a failure is the caller's fault, a capacity
/// problem, retryable, or fatal to the whole task.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Bad input from the API caller (malformed request, unsupported
    /// source URL, length string that doesn't parse). Maps to HTTP 400.
    #[error("invalid input: {0}")]
    InputError(String),

    /// Missing/invalid bearer credential. Maps to HTTP 401.
    #[error("auth: {0}")]
    AuthError(String),

    /// The worker pool is saturated; no slot available. Maps to HTTP 429.
    #[error("capacity exceeded: {0}")]
    CapacityError(String),

    /// An upstream (LLM provider, TTS backend, ingest fetch) failed in a
    /// way that is likely to succeed on retry.
    #[error("upstream transient error from {provider}: {message}")]
    UpstreamTransient { provider: String, message: String },

    /// An upstream failed in a way that will not succeed on retry
    /// (invalid credentials, 4xx response, malformed output after repair).
    #[error("upstream permanent error from {provider}: {message}")]
    UpstreamPermanent { provider: String, message: String },

    /// Generated content violated a structural invariant (wrong segment
    /// count, dialogue turn missing a persona, JSON schema mismatch after
    /// the one allowed repair attempt).
    #[error("content invariant violated: {0}")]
    ContentInvariantError(String),

    /// A single item within a fan-out step (one segment, one persona)
    /// failed while siblings succeeded; the phase degrades rather than
    /// aborting the whole task.
    #[error("partial item failure ({item}): {message}")]
    PartialItemError { item: String, message: String },

    /// A pipeline phase failed in a way that cannot be degraded around;
    /// the whole task transitions to `Failed`.
    #[error("phase {phase} fatal: {message}")]
    PhaseFatal { phase: String, message: String },

    /// The task was cancelled cooperatively via `CancelToken`.
    #[error("cancelled")]
    Cancelled,

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error should be retried by the caller (used by the
    /// LLM gateway's and TTS gateway's retry loops).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::UpstreamTransient { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_transient_is_retryable() {
        let err = Error::UpstreamTransient {
            provider: "gemini".into(),
            message: "503".into(),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn upstream_permanent_is_not_retryable() {
        let err = Error::UpstreamPermanent {
            provider: "gemini".into(),
            message: "401".into(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn cancelled_is_not_retryable() {
        assert!(!Error::Cancelled.is_retryable());
    }
}
