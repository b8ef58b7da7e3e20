//! `LlmGateway`: the four typed operations the orchestrator drives (§4.5).
//!
//! Each operation renders a prompt, calls [`LlmRouter::chat_for_role`], and
//! parses the response into its typed result. A malformed-JSON response
//! triggers exactly one repair-reprompt before the call fails; anything
//! else (off-target word count, unknown speaker id, ...) is a domain
//! validation the orchestrator performs and retries itself.

use crate::router::LlmRouter;
use crate::traits::ChatRequest;
use cf_domain::capability::ModelRole;
use cf_domain::error::{Error, Result};
use cf_domain::models::{
    DialogueTurn, OutlineSegment, PersonaResearch, PodcastOutline, SourceAnalysis,
};
use cf_domain::tool::Message;
use serde::de::DeserializeOwned;

pub struct LlmGateway {
    router: LlmRouter,
}

impl LlmGateway {
    pub fn new(router: LlmRouter) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &LlmRouter {
        &self.router
    }

    /// P1: extract topics/entities/tone from one source's text.
    pub async fn analyze_source(&self, text: &str) -> Result<SourceAnalysis> {
        let messages = vec![
            Message::system(
                "You analyze source material for a podcast production pipeline. \
                 Reply with ONLY a JSON object: \
                 {\"summary_points\": [string], \"detailed_analysis_text\": string}.",
            ),
            Message::user(text),
        ];
        self.call_json(ModelRole::AnalyzeSource, messages).await
    }

    /// P2: research a named person against the gathered source text.
    pub async fn research_persona(
        &self,
        person_name: &str,
        source_text: &str,
    ) -> Result<PersonaResearch> {
        let prompt = format!(
            "Research \"{person_name}\" using the following source material as context:\n\n{source_text}\n\n\
             Reply with ONLY a JSON object: {{\"person_id\": string, \"display_name\": string, \
             \"gender\": \"male\"|\"female\"|\"neutral\", \"invented_name\": string, \
             \"detailed_profile_text\": string}}. \
             `person_id` must be a stable slug derived from the name (lowercase, hyphenated)."
        );
        let messages = vec![
            Message::system(
                "You research public figures for a multi-speaker podcast, inventing a \
                 pronounceable on-air name when the real name is ambiguous to synthesize.",
            ),
            Message::user(prompt),
        ];
        let raw: RawPersonaResearch = self.call_json(ModelRole::ResearchPersona, messages).await?;
        Ok(raw.into_persona_research())
    }

    /// P3: produce the segment-level outline for the episode.
    #[allow(clippy::too_many_arguments)]
    pub async fn generate_outline(
        &self,
        analyses: &[SourceAnalysis],
        persona_researches: &[PersonaResearch],
        total_word_target: u32,
        prominent_persons: &[String],
        custom_prompt: Option<&str>,
        correction_note: Option<&str>,
    ) -> Result<PodcastOutline> {
        let analyses_text = analyses
            .iter()
            .map(|a| a.detailed_analysis_text.as_str())
            .collect::<Vec<_>>()
            .join("\n---\n");
        let persona_ids: Vec<&str> = persona_researches.iter().map(|p| p.person_id.as_str()).collect();
        let mut prompt = format!(
            "Source analyses:\n{analyses_text}\n\n\
             Available speakers: Host, Narrator{}.\n\
             Prominent persons requested: {:?}.\n\
             Total target word count across ALL segments combined must equal exactly {total_word_target}.\n\
             Reply with ONLY a JSON object: {{\"title\": string, \"summary\": string, \"segments\": [\
             {{\"segment_id\": string, \"title\": string, \"speaker_id\": string, \"content_cue\": string, \
             \"target_word_count\": number, \"estimated_duration_seconds\": number}}]}}.",
            if persona_ids.is_empty() {
                String::new()
            } else {
                format!(", {}", persona_ids.join(", "))
            },
            prominent_persons,
        );
        if let Some(extra) = custom_prompt {
            prompt.push_str(&format!("\n\nAdditional instruction from the requester: {extra}"));
        }
        if let Some(note) = correction_note {
            prompt.push_str(&format!("\n\nCORRECTION REQUIRED: {note}"));
        }
        let messages = vec![
            Message::system(
                "You design podcast episode outlines with a strict total word budget. \
                 Every speaker_id must be \"Host\", \"Narrator\", or one of the listed persona ids.",
            ),
            Message::user(prompt),
        ];
        self.call_json(ModelRole::GenerateOutline, messages).await
    }

    /// P5: produce the dialogue turns for one segment, continuing the
    /// global turn-id sequence from `continuing_turn_id`.
    pub async fn generate_segment_dialogue(
        &self,
        outline: &PodcastOutline,
        segment: &OutlineSegment,
        available_speakers: &[String],
        continuing_turn_id: u32,
    ) -> Result<Vec<DialogueTurn>> {
        let prompt = format!(
            "Episode: \"{}\" — {}\n\n\
             Segment \"{}\": {} (speaker: {}, target words: {}).\n\
             Content cue: {}\n\n\
             Available speaker ids: {:?}.\n\
             Dialogue turns must start at turn_id={continuing_turn_id} and increase by 1 with no gaps.\n\
             Reply with ONLY a JSON array of objects: \
             [{{\"turn_id\": number, \"speaker_id\": string, \"text\": string, \"source_mentions\": [string]}}].",
            outline.title,
            outline.summary,
            segment.segment_id,
            segment.title,
            segment.speaker_id,
            segment.target_word_count,
            segment.content_cue,
            available_speakers,
        );
        let messages = vec![
            Message::system(
                "You write natural multi-speaker dialogue turns for one outline segment of a podcast.",
            ),
            Message::user(prompt),
        ];
        let raw: Vec<RawDialogueTurn> = self
            .call_json(ModelRole::GenerateSegmentDialogue, messages)
            .await?;
        Ok(raw.into_iter().map(RawDialogueTurn::into_turn).collect())
    }

    /// Sends `messages` for `role`, parses the JSON response into `T`, and
    /// retries once with a repair reprompt on a parse failure (§4.5).
    async fn call_json<T: DeserializeOwned>(
        &self,
        role: ModelRole,
        messages: Vec<Message>,
    ) -> Result<T> {
        let req = ChatRequest {
            messages: messages.clone(),
            json_mode: true,
            ..Default::default()
        };
        let resp = self.router.chat_for_role(role, req).await?;
        if let Ok(parsed) = parse_json_response::<T>(&resp.content) {
            return Ok(parsed);
        }

        let mut repair_messages = messages;
        repair_messages.push(Message::assistant(resp.content));
        repair_messages.push(Message::user(
            "That response was not valid JSON matching the requested schema. \
             Reply again with ONLY the corrected JSON, no prose, no markdown fences.",
        ));
        let repair_req = ChatRequest {
            messages: repair_messages,
            json_mode: true,
            ..Default::default()
        };
        let repair_resp = self.router.chat_for_role(role, repair_req).await?;
        parse_json_response::<T>(&repair_resp.content).map_err(|e| Error::ContentInvariantError(
            format!("LLM response was not valid JSON after one repair attempt: {e}"),
        ))
    }
}

/// Strips a leading/trailing markdown code fence, if present, before parsing.
fn parse_json_response<T: DeserializeOwned>(raw: &str) -> std::result::Result<T, serde_json::Error> {
    let trimmed = raw.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed)
        .trim_end_matches("```")
        .trim();
    serde_json::from_str(unfenced)
}

// ── Wire shapes (before domain normalization, §4.9 tie-breaks) ─────────

#[derive(Debug, serde::Deserialize)]
struct RawPersonaResearch {
    person_id: String,
    display_name: String,
    gender: String,
    invented_name: String,
    detailed_profile_text: String,
}

impl RawPersonaResearch {
    fn into_persona_research(self) -> PersonaResearch {
        PersonaResearch {
            person_id: self.person_id,
            display_name: self.display_name,
            gender: cf_domain::models::Gender::normalize(&self.gender),
            invented_name: self.invented_name,
            detailed_profile_text: self.detailed_profile_text,
            tts_voice_id: String::new(),
            tts_voice_params: cf_domain::models::TtsVoiceParams::default(),
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct RawDialogueTurn {
    turn_id: u32,
    speaker_id: String,
    text: String,
    #[serde(default)]
    source_mentions: Vec<String>,
}

impl RawDialogueTurn {
    fn into_turn(self) -> DialogueTurn {
        DialogueTurn {
            turn_id: self.turn_id,
            speaker_id: self.speaker_id,
            speaker_gender: None,
            text: self.text,
            source_mentions: self.source_mentions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_json_response_strips_markdown_fence() {
        let raw = "```json\n{\"summary_points\": [\"a\"], \"detailed_analysis_text\": \"x\"}\n```";
        let parsed: SourceAnalysis = parse_json_response(raw).unwrap();
        assert_eq!(parsed.summary_points, vec!["a".to_string()]);
    }

    #[test]
    fn parse_json_response_plain_json_still_works() {
        let raw = "{\"summary_points\": [], \"detailed_analysis_text\": \"y\"}";
        let parsed: SourceAnalysis = parse_json_response(raw).unwrap();
        assert_eq!(parsed.detailed_analysis_text, "y");
    }

    #[test]
    fn parse_json_response_garbage_fails() {
        let result: std::result::Result<SourceAnalysis, _> = parse_json_response("not json");
        assert!(result.is_err());
    }

    #[test]
    fn raw_persona_research_normalizes_gender() {
        let raw = RawPersonaResearch {
            person_id: "ada-lovelace".into(),
            display_name: "Ada Lovelace".into(),
            gender: "FEMALE".into(),
            invented_name: "Ada".into(),
            detailed_profile_text: "...".into(),
        };
        let persona = raw.into_persona_research();
        assert_eq!(persona.gender, cf_domain::models::Gender::Female);
        assert!(persona.tts_voice_id.is_empty());
    }
}
