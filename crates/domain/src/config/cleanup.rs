use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Cleanup policy configuration (§4.11)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Named retention policy a task's artifacts may be cleaned up under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CleanupPolicy {
    /// Never clean up automatically; only explicit `CleanupTaskFiles` calls.
    #[default]
    Manual,
    /// Clean up as soon as the task reaches a terminal state.
    AutoOnComplete,
    /// Clean up `auto_cleanup_hours` after completion.
    AutoAfterHours,
    /// Clean up `auto_cleanup_days` after completion.
    AutoAfterDays,
    /// Keep only the final audio; drop everything else.
    RetainAudioOnly,
    /// Never delete anything for this task.
    RetainAll,
}

/// Retention configuration, loaded from / persisted to a JSON file at
/// `CleanupConfig::load`'s path (§6.5 "Cleanup policy JSON file path").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    #[serde(default)]
    pub default_policy: CleanupPolicy,
    #[serde(default = "d_auto_cleanup_hours")]
    pub auto_cleanup_hours: u32,
    #[serde(default = "d_auto_cleanup_days")]
    pub auto_cleanup_days: u32,
    #[serde(default = "d_true")]
    pub retain_audio_files: bool,
    #[serde(default = "d_true")]
    pub retain_transcripts: bool,
    #[serde(default)]
    pub retain_llm_outputs: bool,
    #[serde(default)]
    pub retain_audio_segments: bool,
    #[serde(default = "d_max_temp_size_mb")]
    pub max_temp_size_mb: u64,
    #[serde(default = "d_max_total_storage_gb")]
    pub max_total_storage_gb: u64,
    #[serde(default)]
    pub cleanup_on_startup: bool,
    #[serde(default = "d_true")]
    pub enable_background_cleanup: bool,
    #[serde(default = "d_background_interval_minutes")]
    pub background_cleanup_interval_minutes: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            default_policy: CleanupPolicy::default(),
            auto_cleanup_hours: d_auto_cleanup_hours(),
            auto_cleanup_days: d_auto_cleanup_days(),
            retain_audio_files: true,
            retain_transcripts: true,
            retain_llm_outputs: false,
            retain_audio_segments: false,
            max_temp_size_mb: d_max_temp_size_mb(),
            max_total_storage_gb: d_max_total_storage_gb(),
            cleanup_on_startup: false,
            enable_background_cleanup: true,
            background_cleanup_interval_minutes: d_background_interval_minutes(),
        }
    }
}

impl CleanupConfig {
    /// Path cleanup config is persisted to, from `CLEANUP_CONFIG_PATH` env
    /// var or a local default.
    pub fn load_path() -> PathBuf {
        std::env::var("CLEANUP_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/cleanup_config.json"))
    }

    pub fn load() -> std::io::Result<Self> {
        let path = Self::load_path();
        match std::fs::read_to_string(&path) {
            Ok(raw) => Ok(serde_json::from_str(&raw).unwrap_or_default()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::load_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)
    }

    /// Pure evaluation of `ShouldCleanupNow(task_id, completion_time)` (§4.11).
    /// `now` and `completion_time` are both caller-supplied so this stays
    /// pure and unit-testable without a wall-clock dependency.
    pub fn should_cleanup_now(
        &self,
        completion_time: chrono::DateTime<chrono::Utc>,
        now: chrono::DateTime<chrono::Utc>,
    ) -> bool {
        match self.default_policy {
            CleanupPolicy::Manual | CleanupPolicy::RetainAll => false,
            CleanupPolicy::AutoOnComplete => true,
            CleanupPolicy::AutoAfterHours => {
                now - completion_time >= chrono::Duration::hours(self.auto_cleanup_hours as i64)
            }
            CleanupPolicy::AutoAfterDays => {
                now - completion_time >= chrono::Duration::days(self.auto_cleanup_days as i64)
            }
            CleanupPolicy::RetainAudioOnly => true,
        }
    }
}

fn d_true() -> bool {
    true
}
fn d_auto_cleanup_hours() -> u32 {
    24
}
fn d_auto_cleanup_days() -> u32 {
    7
}
fn d_max_temp_size_mb() -> u64 {
    500
}
fn d_max_total_storage_gb() -> u64 {
    5
}
fn d_background_interval_minutes() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn defaults_match_original_config() {
        let cfg = CleanupConfig::default();
        assert_eq!(cfg.default_policy, CleanupPolicy::Manual);
        assert_eq!(cfg.auto_cleanup_hours, 24);
        assert_eq!(cfg.auto_cleanup_days, 7);
        assert!(cfg.retain_audio_files);
        assert!(cfg.retain_transcripts);
        assert!(!cfg.retain_llm_outputs);
        assert!(!cfg.retain_audio_segments);
        assert_eq!(cfg.max_temp_size_mb, 500);
        assert_eq!(cfg.max_total_storage_gb, 5);
        assert!(!cfg.cleanup_on_startup);
        assert!(cfg.enable_background_cleanup);
        assert_eq!(cfg.background_cleanup_interval_minutes, 60);
    }

    fn t(mins_after_epoch: i64) -> chrono::DateTime<chrono::Utc> {
        chrono::Utc.timestamp_opt(mins_after_epoch * 60, 0).unwrap()
    }

    #[test]
    fn manual_policy_never_cleans_up() {
        let cfg = CleanupConfig {
            default_policy: CleanupPolicy::Manual,
            ..Default::default()
        };
        assert!(!cfg.should_cleanup_now(t(0), t(1_000_000)));
    }

    #[test]
    fn retain_all_never_cleans_up() {
        let cfg = CleanupConfig {
            default_policy: CleanupPolicy::RetainAll,
            ..Default::default()
        };
        assert!(!cfg.should_cleanup_now(t(0), t(1_000_000)));
    }

    #[test]
    fn auto_on_complete_cleans_up_immediately() {
        let cfg = CleanupConfig {
            default_policy: CleanupPolicy::AutoOnComplete,
            ..Default::default()
        };
        assert!(cfg.should_cleanup_now(t(0), t(0)));
    }

    #[test]
    fn auto_after_hours_respects_threshold() {
        let cfg = CleanupConfig {
            default_policy: CleanupPolicy::AutoAfterHours,
            auto_cleanup_hours: 2,
            ..Default::default()
        };
        assert!(!cfg.should_cleanup_now(t(0), t(60))); // 1h later
        assert!(cfg.should_cleanup_now(t(0), t(120))); // exactly 2h later
    }

    #[test]
    fn auto_after_days_respects_threshold() {
        let cfg = CleanupConfig {
            default_policy: CleanupPolicy::AutoAfterDays,
            auto_cleanup_days: 1,
            ..Default::default()
        };
        assert!(!cfg.should_cleanup_now(t(0), t(60 * 23)));
        assert!(cfg.should_cleanup_now(t(0), t(60 * 24)));
    }

    #[test]
    fn policy_serde_roundtrip() {
        for policy in &[
            "manual",
            "auto_on_complete",
            "auto_after_hours",
            "auto_after_days",
            "retain_audio_only",
            "retain_all",
        ] {
            let json = format!("\"{}\"", policy);
            let parsed: CleanupPolicy = serde_json::from_str(&json).unwrap();
            let back = serde_json::to_string(&parsed).unwrap();
            assert_eq!(back, json);
        }
    }

    #[test]
    fn deserialize_empty_uses_defaults() {
        let cfg: CleanupConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.auto_cleanup_hours, 24);
    }
}
