use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TaskRunner worker pool configuration
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Global bounded-worker-pool size (§4.3, §6.5 `MAX_CONCURRENT_GENERATIONS`).
///
/// Unlike a per-session concurrency limit, this bounds the *entire*
/// process's in-flight podcast generations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Maximum number of tasks that may execute concurrently across the
    /// whole process. Clamped to the range `1..=64`.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_generations: usize,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            max_concurrent_generations: default_max_concurrent(),
        }
    }
}

impl TaskConfig {
    /// Clamp `max_concurrent_generations` to the allowed range `1..=64`.
    pub fn clamped(&self) -> Self {
        Self {
            max_concurrent_generations: self.max_concurrent_generations.clamp(1, 64),
        }
    }
}

fn default_max_concurrent() -> usize {
    2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_two() {
        let cfg = TaskConfig::default();
        assert_eq!(cfg.max_concurrent_generations, 2);
    }

    #[test]
    fn clamp_below_min() {
        let cfg = TaskConfig {
            max_concurrent_generations: 0,
        };
        assert_eq!(cfg.clamped().max_concurrent_generations, 1);
    }

    #[test]
    fn clamp_above_max() {
        let cfg = TaskConfig {
            max_concurrent_generations: 1000,
        };
        assert_eq!(cfg.clamped().max_concurrent_generations, 64);
    }

    #[test]
    fn clamp_within_range() {
        let cfg = TaskConfig {
            max_concurrent_generations: 4,
        };
        assert_eq!(cfg.clamped().max_concurrent_generations, 4);
    }

    #[test]
    fn serde_roundtrip() {
        let cfg = TaskConfig {
            max_concurrent_generations: 4,
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let deserialized: TaskConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.max_concurrent_generations, 4);
    }

    #[test]
    fn deserialize_missing_field_uses_default() {
        let cfg: TaskConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.max_concurrent_generations, 2);
    }
}
