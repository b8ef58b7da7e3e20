//! In-process counters feeding `GetServiceHealth` (§4.6, §4.10).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Synthesis counters, updated on every call. Cheap enough to bump on
/// the hot path; read by the health endpoint under no lock (all fields
/// are independent atomics, so a snapshot may be very slightly torn but
/// never stale beyond one in-flight call).
#[derive(Debug)]
pub struct TtsHealth {
    active: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    total_latency_ms: AtomicU64,
    started_at: Instant,
}

impl Default for TtsHealth {
    fn default() -> Self {
        Self {
            active: AtomicU64::new(0),
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            total_latency_ms: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }
}

/// A point-in-time snapshot safe to serialize into a health response.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TtsHealthSnapshot {
    pub active_workers: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub success_rate: f64,
    pub avg_latency_ms: f64,
    pub uptime_secs: u64,
}

impl TtsHealth {
    pub fn on_start(&self) {
        self.active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_finish(&self, success: bool, latency_ms: u64) {
        self.active.fetch_sub(1, Ordering::Relaxed);
        if success {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TtsHealthSnapshot {
        let succeeded = self.succeeded.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let total = succeeded + failed;
        let success_rate = if total == 0 {
            1.0
        } else {
            succeeded as f64 / total as f64
        };
        let avg_latency_ms = if total == 0 {
            0.0
        } else {
            self.total_latency_ms.load(Ordering::Relaxed) as f64 / total as f64
        };

        TtsHealthSnapshot {
            active_workers: self.active.load(Ordering::Relaxed),
            succeeded,
            failed,
            success_rate,
            avg_latency_ms,
            uptime_secs: self.started_at.elapsed().as_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_rate_is_one_with_no_calls() {
        let health = TtsHealth::default();
        assert_eq!(health.snapshot().success_rate, 1.0);
    }

    #[test]
    fn success_rate_reflects_failures() {
        let health = TtsHealth::default();
        health.on_start();
        health.on_finish(true, 100);
        health.on_start();
        health.on_finish(false, 50);

        let snap = health.snapshot();
        assert_eq!(snap.succeeded, 1);
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.success_rate, 0.5);
        assert_eq!(snap.avg_latency_ms, 75.0);
        assert_eq!(snap.active_workers, 0);
    }
}
