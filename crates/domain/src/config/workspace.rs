use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Local outputs tree
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Root of the local filesystem layout used by the local ArtifactStore
/// backend (§6.3) and by `CleanupManager` when scanning temp directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputsConfig {
    #[serde(default = "d_outputs_path")]
    pub root: PathBuf,
}

impl Default for OutputsConfig {
    fn default() -> Self {
        Self {
            root: d_outputs_path(),
        }
    }
}

impl OutputsConfig {
    /// Per-task audio segment directory: `<root>/outputs/audio/<task_id>/segments`.
    pub fn segments_dir(&self, task_id: &str) -> PathBuf {
        self.root.join("outputs/audio").join(task_id).join("segments")
    }

    /// Per-task final audio path: `<root>/outputs/audio/<task_id>/final.mp3`.
    pub fn final_audio_path(&self, task_id: &str) -> PathBuf {
        self.root.join("outputs/audio").join(task_id).join("final.mp3")
    }
}

fn d_outputs_path() -> PathBuf {
    PathBuf::from(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_root_is_cwd() {
        assert_eq!(OutputsConfig::default().root, PathBuf::from("."));
    }

    #[test]
    fn segments_dir_matches_layout() {
        let cfg = OutputsConfig::default();
        assert_eq!(
            cfg.segments_dir("task-1"),
            PathBuf::from("./outputs/audio/task-1/segments")
        );
    }

    #[test]
    fn final_audio_path_matches_layout() {
        let cfg = OutputsConfig::default();
        assert_eq!(
            cfg.final_audio_path("task-1"),
            PathBuf::from("./outputs/audio/task-1/final.mp3")
        );
    }
}
