use serde::{Deserialize, Serialize};

/// LLM model capabilities — every {provider, model} advertises these.
/// The gateway uses capabilities to validate a role's configured model
/// actually supports what the operation needs (e.g. JSON mode).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmCapabilities {
    pub supports_json_mode: bool,
    pub supports_vision: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_window_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

impl Default for LlmCapabilities {
    fn default() -> Self {
        Self {
            supports_json_mode: false,
            supports_vision: false,
            context_window_tokens: None,
            max_output_tokens: None,
        }
    }
}

/// The four LLM operations the gateway performs, one per pipeline phase.
/// Each maps to a `RoleConfig` entry keyed by its snake_case name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelRole {
    /// P1: extract topics, entities, and tone from the source text.
    AnalyzeSource,
    /// P2: build background/opinions for each configured persona.
    ResearchPersona,
    /// P3: produce the segment-level outline for the episode.
    GenerateOutline,
    /// P5: produce the dialogue turns for a single segment.
    GenerateSegmentDialogue,
}

impl ModelRole {
    /// The config key this role is looked up under in `LlmConfig::roles`.
    pub fn config_key(&self) -> &'static str {
        match self {
            ModelRole::AnalyzeSource => "analyze_source",
            ModelRole::ResearchPersona => "research_persona",
            ModelRole::GenerateOutline => "generate_outline",
            ModelRole::GenerateSegmentDialogue => "generate_segment_dialogue",
        }
    }

    /// Whether this operation requires a structured (JSON-mode) response.
    pub fn requires_json(&self) -> bool {
        matches!(
            self,
            ModelRole::AnalyzeSource
                | ModelRole::ResearchPersona
                | ModelRole::GenerateOutline
                | ModelRole::GenerateSegmentDialogue
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_key_matches_snake_case_name() {
        assert_eq!(ModelRole::AnalyzeSource.config_key(), "analyze_source");
        assert_eq!(
            ModelRole::GenerateSegmentDialogue.config_key(),
            "generate_segment_dialogue"
        );
    }

    #[test]
    fn all_roles_require_json() {
        for role in [
            ModelRole::AnalyzeSource,
            ModelRole::ResearchPersona,
            ModelRole::GenerateOutline,
            ModelRole::GenerateSegmentDialogue,
        ] {
            assert!(role.requires_json());
        }
    }

    #[test]
    fn serde_roundtrip() {
        let json = serde_json::to_string(&ModelRole::GenerateOutline).unwrap();
        assert_eq!(json, "\"generate_outline\"");
        let back: ModelRole = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ModelRole::GenerateOutline);
    }
}
