//! Core data types shared by every crate that touches the generation
//! pipeline: `TaskRecord` (StatusStore, §4.1), the per-phase artifacts
//! produced by the orchestrator (§3), and small value types threaded
//! through the LLM/TTS gateways.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Phase / status (§4.9)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Pipeline phase labels, doubling as the `TaskRecord.status` value and
/// as progress anchors. Ordered: non-terminal phases only ever advance
/// forward (§5 ordering guarantees); `Failed`/`Cancelled` are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Queued,
    PreprocessingSources,
    AnalyzingSources,
    ResearchingPersonas,
    GeneratingOutline,
    GeneratingDialogue,
    GeneratingAudioSegments,
    StitchingAudio,
    PostprocessingFinalEpisode,
    Completed,
    Failed,
    Cancelled,
}

impl Phase {
    /// Progress percentage at which this phase is entered (§4.9 table).
    pub fn entry_progress(&self) -> u8 {
        match self {
            Phase::Queued => 0,
            Phase::PreprocessingSources => 5,
            Phase::AnalyzingSources => 15,
            Phase::ResearchingPersonas => 30,
            Phase::GeneratingOutline => 45,
            Phase::GeneratingDialogue => 60,
            Phase::GeneratingAudioSegments => 75,
            Phase::StitchingAudio => 90,
            Phase::PostprocessingFinalEpisode => 95,
            Phase::Completed => 100,
            Phase::Failed | Phase::Cancelled => 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed | Phase::Cancelled)
    }

    /// The progress ceiling for updates emitted *within* this phase: one
    /// less than the next phase's entry progress (§4.9 transition rules).
    /// Terminal phases have no ceiling below their own ingress value.
    pub fn progress_ceiling(&self) -> u8 {
        match self {
            Phase::Queued => Phase::PreprocessingSources.entry_progress().saturating_sub(1),
            Phase::PreprocessingSources => Phase::AnalyzingSources.entry_progress().saturating_sub(1),
            Phase::AnalyzingSources => Phase::ResearchingPersonas.entry_progress().saturating_sub(1),
            Phase::ResearchingPersonas => Phase::GeneratingOutline.entry_progress().saturating_sub(1),
            Phase::GeneratingOutline => Phase::GeneratingDialogue.entry_progress().saturating_sub(1),
            Phase::GeneratingDialogue => Phase::GeneratingAudioSegments.entry_progress().saturating_sub(1),
            Phase::GeneratingAudioSegments => Phase::StitchingAudio.entry_progress().saturating_sub(1),
            Phase::StitchingAudio => Phase::PostprocessingFinalEpisode.entry_progress().saturating_sub(1),
            Phase::PostprocessingFinalEpisode => Phase::Completed.entry_progress(),
            Phase::Completed | Phase::Failed | Phase::Cancelled => 100,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TaskRecord (§3, §4.1)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: String,
    pub status: Phase,
    pub progress_pct: u8,
    pub status_description: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    /// Opaque snapshot of the original request, for audit/reruns.
    pub request: serde_json::Value,
    pub logs: Vec<LogEntry>,
    pub artifacts: ArtifactFlags,
    pub error: Option<TaskError>,
    pub result_episode: Option<ResultEpisode>,
}

impl TaskRecord {
    pub fn new(task_id: String, request: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            task_id,
            status: Phase::Queued,
            progress_pct: 0,
            status_description: "queued".into(),
            created_at: now,
            last_updated_at: now,
            request,
            logs: Vec::new(),
            artifacts: ArtifactFlags::default(),
            error: None,
            result_episode: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub ts: DateTime<Utc>,
    pub phase: Phase,
    pub sub_task: Option<String>,
    pub message: String,
}

/// Boolean/path flags indicating which persisted artifacts exist for a
/// task, set only after the corresponding `ArtifactStore` put succeeds
/// (§5 "write-after-persist" invariant).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ArtifactFlags {
    pub source_analyses_available: bool,
    pub persona_research_available: bool,
    pub outline_available: bool,
    pub dialogue_available: bool,
    pub audio_segments_available: bool,
    pub final_audio_available: bool,
    pub final_audio_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskError {
    pub user_message: String,
    pub technical_detail: String,
}

/// Typed replacement for the kwargs-style artifact update the original
/// implementation passed as `**kwargs` (see SPEC_FULL.md §9). Every
/// field is optional; `StatusStore::update_artifacts` applies only the
/// `Some` ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactUpdate {
    pub source_analyses_available: Option<bool>,
    pub persona_research_available: Option<bool>,
    pub outline_available: Option<bool>,
    pub dialogue_available: Option<bool>,
    pub audio_segments_available: Option<bool>,
    pub final_audio_available: Option<bool>,
    pub final_audio_key: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Pipeline artifacts (§3)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedSource {
    pub origin_ref: String,
    pub content_text: String,
    pub byte_count: usize,
    pub warnings: Vec<String>,
}

impl ExtractedSource {
    pub fn is_empty(&self) -> bool {
        self.content_text.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceAnalysis {
    pub summary_points: Vec<String>,
    pub detailed_analysis_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Neutral,
}

impl Gender {
    /// Normalizes arbitrary LLM-returned gender strings per §4.9 tie-break:
    /// anything other than `male`/`female` (case-insensitively) becomes
    /// `neutral`.
    pub fn normalize(raw: &str) -> Gender {
        match raw.trim().to_ascii_lowercase().as_str() {
            "male" => Gender::Male,
            "female" => Gender::Female,
            _ => Gender::Neutral,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaResearch {
    pub person_id: String,
    pub display_name: String,
    pub gender: Gender,
    pub invented_name: String,
    pub detailed_profile_text: String,
    pub tts_voice_id: String,
    pub tts_voice_params: TtsVoiceParams,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TtsVoiceParams {
    /// Speaking rate, constrained to [0.85, 1.15] (§4.6).
    pub speaking_rate: f32,
}

impl Default for TtsVoiceParams {
    fn default() -> Self {
        Self { speaking_rate: 1.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodcastOutline {
    pub title: String,
    pub summary: String,
    pub segments: Vec<OutlineSegment>,
}

impl PodcastOutline {
    /// Sum of per-segment target word counts (§8 invariant 6).
    pub fn total_target_words(&self) -> u32 {
        self.segments.iter().map(|s| s.target_word_count).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineSegment {
    pub segment_id: String,
    pub title: String,
    /// One of the reserved IDs `Host`/`Narrator`, or a `person_id` from
    /// persona research (§4.9 tie-break).
    pub speaker_id: String,
    pub content_cue: String,
    pub target_word_count: u32,
    pub estimated_duration_seconds: u32,
}

pub const RESERVED_SPEAKER_IDS: [&str; 2] = ["Host", "Narrator"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueTurn {
    /// 1-based, strictly increasing and dense across the whole episode.
    pub turn_id: u32,
    pub speaker_id: String,
    pub speaker_gender: Option<Gender>,
    pub text: String,
    pub source_mentions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEpisode {
    pub title: String,
    pub summary: String,
    pub transcript_text: String,
    pub audio_blob_key: String,
    pub source_attributions: Vec<String>,
    pub per_turn_audio_keys: Vec<String>,
    pub warnings: Vec<String>,
    pub llm_artifact_keys: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_entry_progress_matches_table() {
        assert_eq!(Phase::Queued.entry_progress(), 0);
        assert_eq!(Phase::PreprocessingSources.entry_progress(), 5);
        assert_eq!(Phase::AnalyzingSources.entry_progress(), 15);
        assert_eq!(Phase::ResearchingPersonas.entry_progress(), 30);
        assert_eq!(Phase::GeneratingOutline.entry_progress(), 45);
        assert_eq!(Phase::GeneratingDialogue.entry_progress(), 60);
        assert_eq!(Phase::GeneratingAudioSegments.entry_progress(), 75);
        assert_eq!(Phase::StitchingAudio.entry_progress(), 90);
        assert_eq!(Phase::PostprocessingFinalEpisode.entry_progress(), 95);
        assert_eq!(Phase::Completed.entry_progress(), 100);
    }

    #[test]
    fn progress_ceiling_is_next_entry_minus_one() {
        assert_eq!(Phase::Queued.progress_ceiling(), 4);
        assert_eq!(Phase::AnalyzingSources.progress_ceiling(), 29);
        assert_eq!(Phase::PostprocessingFinalEpisode.progress_ceiling(), 100);
    }

    #[test]
    fn terminal_phases() {
        assert!(Phase::Completed.is_terminal());
        assert!(Phase::Failed.is_terminal());
        assert!(Phase::Cancelled.is_terminal());
        assert!(!Phase::GeneratingDialogue.is_terminal());
    }

    #[test]
    fn phase_ordering_is_forward() {
        assert!(Phase::Queued < Phase::PreprocessingSources);
        assert!(Phase::GeneratingDialogue < Phase::StitchingAudio);
    }

    #[test]
    fn gender_normalizes_unknown_to_neutral() {
        assert_eq!(Gender::normalize("Male"), Gender::Male);
        assert_eq!(Gender::normalize("FEMALE"), Gender::Female);
        assert_eq!(Gender::normalize("other"), Gender::Neutral);
        assert_eq!(Gender::normalize(""), Gender::Neutral);
    }

    #[test]
    fn outline_total_target_words_sums_segments() {
        let outline = PodcastOutline {
            title: "t".into(),
            summary: "s".into(),
            segments: vec![
                OutlineSegment {
                    segment_id: "seg-1".into(),
                    title: "intro".into(),
                    speaker_id: "Host".into(),
                    content_cue: "".into(),
                    target_word_count: 300,
                    estimated_duration_seconds: 120,
                },
                OutlineSegment {
                    segment_id: "seg-2".into(),
                    title: "body".into(),
                    speaker_id: "Host".into(),
                    content_cue: "".into(),
                    target_word_count: 450,
                    estimated_duration_seconds: 180,
                },
            ],
        };
        assert_eq!(outline.total_target_words(), 750);
    }

    #[test]
    fn extracted_source_empty_detection() {
        let source = ExtractedSource {
            origin_ref: "https://example.com".into(),
            content_text: "   ".into(),
            byte_count: 3,
            warnings: vec![],
        };
        assert!(source.is_empty());
    }

    #[test]
    fn task_record_new_starts_queued() {
        let record = TaskRecord::new("task-1".into(), serde_json::json!({}));
        assert_eq!(record.status, Phase::Queued);
        assert_eq!(record.progress_pct, 0);
        assert!(record.error.is_none());
        assert!(record.result_episode.is_none());
        assert!(!record.artifacts.final_audio_available);
    }
}
