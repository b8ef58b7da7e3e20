//! PipelineOrchestrator (C9, §4.9): drives one task through every phase,
//! wiring together the ingest/LLM/TTS/audio/storage components the other
//! runtime modules only coordinate around. Phase transitions, artifact
//! flags, and the terminal webhook all go through [`StatusStore`] and
//! [`WebhookNotifier`] so a crash mid-phase leaves a consistent record.

use std::collections::HashMap;
use std::sync::Arc;

use cf_audio::stitcher::{AudioStitcher, TurnAudio};
use cf_domain::error::{Error, Result};
use cf_domain::length::parse_length;
use cf_domain::models::{
    ArtifactUpdate, DialogueTurn, ExtractedSource, Gender, LogEntry, OutlineSegment,
    PersonaResearch, Phase, PodcastOutline, ResultEpisode, SourceAnalysis, RESERVED_SPEAKER_IDS,
};
use cf_ingest::ingestor::SourceIngestor;
use cf_ingest::types::SourceRef;
use cf_providers::LlmGateway;
use cf_storage::ArtifactStore;
use cf_tts::gateway::TtsGateway;
use cf_tts::voice::VoiceProfile;
use chrono::Utc;
use futures_util::stream::{self, StreamExt};

use crate::runtime::blob_keys;
use crate::runtime::cancel::CancelToken;
use crate::runtime::status::{StatusStore, UpdateOutcome};
use crate::runtime::webhook::WebhookNotifier;

const SOURCE_ANALYSIS_CONCURRENCY: usize = 4;
const PERSONA_RESEARCH_CONCURRENCY: usize = 4;

/// Everything `GeneratePodcastAsync` needs to drive one run. The raw
/// request JSON is kept separately by the caller for `StatusStore::create`
/// — this is the orchestrator's own typed view of it.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub sources: Vec<SourceRef>,
    pub prominent_persons: Vec<String>,
    pub custom_prompt: Option<String>,
    pub length_str: String,
    pub webhook_url: Option<String>,
}

pub struct PipelineOrchestrator {
    status_store: Arc<StatusStore>,
    artifact_store: Arc<dyn ArtifactStore>,
    source_ingestor: Arc<SourceIngestor>,
    llm_gateway: Arc<LlmGateway>,
    tts_gateway: Arc<TtsGateway>,
    audio_stitcher: Arc<AudioStitcher>,
    webhook_notifier: Arc<WebhookNotifier>,
}

impl PipelineOrchestrator {
    pub fn new(
        status_store: Arc<StatusStore>,
        artifact_store: Arc<dyn ArtifactStore>,
        source_ingestor: Arc<SourceIngestor>,
        llm_gateway: Arc<LlmGateway>,
        tts_gateway: Arc<TtsGateway>,
        audio_stitcher: Arc<AudioStitcher>,
        webhook_notifier: Arc<WebhookNotifier>,
    ) -> Self {
        Self {
            status_store,
            artifact_store,
            source_ingestor,
            llm_gateway,
            tts_gateway,
            audio_stitcher,
            webhook_notifier,
        }
    }

    /// Entry point handed to [`crate::runtime::TaskRunner::submit`]. Never
    /// panics or propagates: every outcome, including cancellation, ends
    /// in a terminal `StatusStore` transition and (if requested) a webhook.
    pub async fn run(&self, task_id: String, request: GenerateRequest, cancel: CancelToken) {
        match self.drive(&task_id, &request, &cancel).await {
            Ok(()) => {}
            Err(err) => self.finish_with_error(&task_id, &request, err).await,
        }
    }

    async fn drive(&self, task_id: &str, request: &GenerateRequest, cancel: &CancelToken) -> Result<()> {
        cancel.check()?;
        self.enter_phase(task_id, Phase::PreprocessingSources, "extracting source material").await?;
        let extracted = self.source_ingestor.extract_all(&request.sources).await;
        let mut warnings = Vec::new();
        for source in &extracted {
            warnings.extend(source.warnings.iter().cloned());
        }
        let usable: Vec<&ExtractedSource> = extracted.iter().filter(|s| !s.is_empty()).collect();
        if usable.is_empty() {
            return Err(Error::PhaseFatal {
                phase: "preprocessing_sources".into(),
                message: "no_usable_sources".into(),
            });
        }

        cancel.check()?;
        self.enter_phase(task_id, Phase::AnalyzingSources, "analyzing sources").await?;
        let (analyses, analyses_persisted) = self.analyze_sources(task_id, &usable).await?;
        if analyses_persisted > 0 {
            self.status_store
                .update_artifacts(task_id, ArtifactUpdate { source_analyses_available: Some(true), ..Default::default() })
                .await?;
        }

        cancel.check()?;
        self.enter_phase(task_id, Phase::ResearchingPersonas, "researching personas").await?;
        let combined_source_text = usable.iter().map(|s| s.content_text.as_str()).collect::<Vec<_>>().join("\n\n");
        let (personas, personas_persisted) = self
            .research_personas(task_id, &request.prominent_persons, &combined_source_text)
            .await?;
        if personas_persisted > 0 {
            self.status_store
                .update_artifacts(task_id, ArtifactUpdate { persona_research_available: Some(true), ..Default::default() })
                .await?;
        }

        cancel.check()?;
        self.enter_phase(task_id, Phase::GeneratingOutline, "generating episode outline").await?;
        let total_word_target = parse_length(&request.length_str)?.total_word_target;
        let outline = self
            .build_outline(
                task_id,
                &analyses,
                &personas,
                total_word_target,
                &request.prominent_persons,
                request.custom_prompt.as_deref(),
            )
            .await?;
        let outline_key = blob_keys::outline_key(task_id);
        self.artifact_store
            .put_text(&outline_key, &serde_json::to_string(&outline)?, "application/json")
            .await?;
        self.status_store
            .update_artifacts(task_id, ArtifactUpdate { outline_available: Some(true), ..Default::default() })
            .await?;

        cancel.check()?;
        self.enter_phase(task_id, Phase::GeneratingDialogue, "writing dialogue").await?;
        let available_speakers = available_speaker_ids(&personas);
        let turns = self.generate_dialogue(&outline, &available_speakers).await?;
        self.status_store
            .update_artifacts(task_id, ArtifactUpdate { dialogue_available: Some(true), ..Default::default() })
            .await?;

        self.enter_phase(task_id, Phase::GeneratingAudioSegments, "synthesizing audio segments").await?;
        let segment_outcome = self.synthesize_segments(task_id, &turns, &personas, cancel).await?;
        self.status_store
            .update_artifacts(task_id, ArtifactUpdate { audio_segments_available: Some(true), ..Default::default() })
            .await?;

        self.enter_phase(task_id, Phase::StitchingAudio, "stitching final audio").await?;
        let stitched = self.audio_stitcher.stitch(segment_outcome.turn_audio)?;
        for w in &stitched.warnings {
            self.log(task_id, Phase::StitchingAudio, w.clone()).await;
        }
        if stitched.turns_included == 0 {
            return Err(Error::PhaseFatal {
                phase: "stitching_audio".into(),
                message: "no turns survived stitching".into(),
            });
        }
        let final_key = blob_keys::final_audio_key(task_id);
        self.artifact_store.put_bytes(&final_key, stitched.mp3_bytes, "audio/mpeg").await?;
        self.status_store
            .update_artifacts(
                task_id,
                ArtifactUpdate {
                    final_audio_available: Some(true),
                    final_audio_key: Some(final_key.clone()),
                    ..Default::default()
                },
            )
            .await?;

        self.enter_phase(task_id, Phase::PostprocessingFinalEpisode, "assembling final episode").await?;
        let transcript_text = render_transcript(&outline, &turns);
        self.artifact_store
            .put_text(&blob_keys::transcript_key(task_id), &transcript_text, "text/plain")
            .await?;

        let mut llm_artifact_keys = HashMap::new();
        llm_artifact_keys.insert("outline".to_string(), outline_key);
        for (i, _) in analyses.iter().enumerate() {
            llm_artifact_keys.insert(format!("source_analysis_{i}"), blob_keys::source_analysis_key(task_id, i));
        }
        for persona in &personas {
            llm_artifact_keys.insert(
                format!("persona_research_{}", persona.person_id),
                blob_keys::persona_research_key(task_id, &persona.person_id),
            );
        }

        warnings.extend(stitched.warnings);
        let episode = ResultEpisode {
            title: outline.title.clone(),
            summary: outline.summary.clone(),
            transcript_text,
            audio_blob_key: final_key,
            source_attributions: usable.iter().map(|s| s.origin_ref.clone()).collect(),
            per_turn_audio_keys: segment_outcome.per_turn_audio_keys,
            warnings,
            llm_artifact_keys,
        };

        self.status_store.set_episode(task_id, episode.clone()).await?;
        self.status_store
            .update_status(task_id, Phase::Completed, Some("completed".into()), Some(100))
            .await?;

        if let Some(url) = &request.webhook_url {
            self.webhook_notifier.notify(url, task_id, "completed", Some(&episode), None).await;
        }
        Ok(())
    }

    /// P2: bounded fan-out over every non-empty extracted source.
    /// Tolerates any number of individual failures as long as at least
    /// one source analysis succeeds (§4.9 degradation policy). The
    /// returned `persisted` count only reflects blobs that actually made
    /// it into the `ArtifactStore` — callers must gate the
    /// `source_analyses_available` flag on it, not on `analyses.len()`,
    /// to uphold the write-after-persist invariant (§5, §8 #3).
    async fn analyze_sources(&self, task_id: &str, sources: &[&ExtractedSource]) -> Result<(Vec<SourceAnalysis>, usize)> {
        let results: Vec<(usize, Result<SourceAnalysis>)> = stream::iter(sources.iter().enumerate())
            .map(|(i, source)| {
                let llm = self.llm_gateway.clone();
                let text = source.content_text.clone();
                async move { (i, llm.analyze_source(&text).await) }
            })
            .buffer_unordered(SOURCE_ANALYSIS_CONCURRENCY)
            .collect()
            .await;

        let mut analyses = Vec::new();
        let mut persisted = 0usize;
        for (i, result) in results {
            match result {
                Ok(analysis) => {
                    let key = blob_keys::source_analysis_key(task_id, i);
                    match serde_json::to_string(&analysis) {
                        Ok(json) => match self.artifact_store.put_text(&key, &json, "application/json").await {
                            Ok(_) => persisted += 1,
                            Err(e) => {
                                self.log(task_id, Phase::AnalyzingSources, format!("source {i} analysis could not be stored: {e}")).await;
                            }
                        },
                        Err(e) => {
                            self.log(task_id, Phase::AnalyzingSources, format!("source {i} analysis could not be serialized: {e}")).await;
                        }
                    }
                    analyses.push(analysis);
                }
                Err(e) => {
                    self.log(task_id, Phase::AnalyzingSources, format!("source {i} analysis failed: {e}")).await;
                }
            }
        }
        if analyses.is_empty() {
            return Err(Error::PhaseFatal {
                phase: "analyzing_sources".into(),
                message: "every source analysis attempt failed".into(),
            });
        }
        Ok((analyses, persisted))
    }

    /// P3: bounded fan-out over the requested prominent persons. Each
    /// successful persona is assigned its synthesis voice immediately, so
    /// the persisted `PersonaResearch` blob already carries it (§4.6).
    /// Empty `prominent_persons` is a legitimate no-persona episode, not a
    /// failure.
    async fn research_personas(
        &self,
        task_id: &str,
        prominent_persons: &[String],
        source_text: &str,
    ) -> Result<(Vec<PersonaResearch>, usize)> {
        if prominent_persons.is_empty() {
            return Ok((Vec::new(), 0));
        }

        let results: Vec<Result<PersonaResearch>> = stream::iter(prominent_persons.iter().cloned())
            .map(|name| {
                let llm = self.llm_gateway.clone();
                let tts = self.tts_gateway.clone();
                let text = source_text.to_string();
                async move {
                    let mut persona = llm.research_persona(&name, &text).await?;
                    let voice = tts.select_voice(&persona.person_id, persona.gender).await;
                    persona.tts_voice_id = voice.voice_id;
                    persona.tts_voice_params.speaking_rate = voice.speaking_rate;
                    Ok(persona)
                }
            })
            .buffer_unordered(PERSONA_RESEARCH_CONCURRENCY)
            .collect()
            .await;

        let mut personas = Vec::new();
        let mut persisted = 0usize;
        for result in results {
            match result {
                Ok(persona) => {
                    let key = blob_keys::persona_research_key(task_id, &persona.person_id);
                    match serde_json::to_string(&persona) {
                        Ok(json) => match self.artifact_store.put_text(&key, &json, "application/json").await {
                            Ok(_) => persisted += 1,
                            Err(e) => {
                                self.log(task_id, Phase::ResearchingPersonas, format!("persona {} research could not be stored: {e}", persona.person_id)).await;
                            }
                        },
                        Err(e) => {
                            self.log(task_id, Phase::ResearchingPersonas, format!("persona {} research could not be serialized: {e}", persona.person_id)).await;
                        }
                    }
                    personas.push(persona);
                }
                Err(e) => {
                    self.log(task_id, Phase::ResearchingPersonas, format!("persona research failed: {e}")).await;
                }
            }
        }
        if personas.is_empty() {
            return Err(Error::PhaseFatal {
                phase: "researching_personas".into(),
                message: "every requested persona failed research".into(),
            });
        }
        Ok((personas, persisted))
    }

    /// P4: generate the outline, validating the word-budget and
    /// speaker-id closure tie-breaks (§4.9). One correction-reprompt is
    /// allowed before the phase fails outright — all-or-nothing beyond
    /// that (§4.9 degradation policy).
    #[allow(clippy::too_many_arguments)]
    async fn build_outline(
        &self,
        task_id: &str,
        analyses: &[SourceAnalysis],
        personas: &[PersonaResearch],
        total_word_target: u32,
        prominent_persons: &[String],
        custom_prompt: Option<&str>,
    ) -> Result<PodcastOutline> {
        let allowed_speakers = available_speaker_ids(personas);

        let outline = self
            .llm_gateway
            .generate_outline(analyses, personas, total_word_target, prominent_persons, custom_prompt, None)
            .await?;

        if let Err(reason) = validate_outline(&outline, total_word_target, &allowed_speakers) {
            self.log(task_id, Phase::GeneratingOutline, format!("outline failed validation, retrying once: {reason}")).await;
            let correction_note =
                format!("{reason} Regenerate the full outline honoring every constraint exactly.");
            let retried = self
                .llm_gateway
                .generate_outline(
                    analyses,
                    personas,
                    total_word_target,
                    prominent_persons,
                    custom_prompt,
                    Some(&correction_note),
                )
                .await?;
            validate_outline(&retried, total_word_target, &allowed_speakers)
                .map_err(|reason| Error::ContentInvariantError(format!("outline word budget: {reason}")))?;
            return Ok(retried);
        }
        Ok(outline)
    }

    /// P5: sequential segment-by-segment dialogue generation. Turn ids
    /// must be dense and strictly increasing across the whole episode;
    /// any violation fails the phase outright (§4.9 all-or-nothing).
    async fn generate_dialogue(&self, outline: &PodcastOutline, available_speakers: &[String]) -> Result<Vec<DialogueTurn>> {
        let mut turns = Vec::new();
        let mut next_turn_id = 1u32;

        for segment in &outline.segments {
            let mut segment_turns = self
                .llm_gateway
                .generate_segment_dialogue(outline, segment, available_speakers, next_turn_id)
                .await?;
            if segment_turns.is_empty() {
                return Err(Error::PhaseFatal {
                    phase: "generating_dialogue".into(),
                    message: format!("segment {} produced no dialogue turns", segment.segment_id),
                });
            }
            for (offset, turn) in segment_turns.iter().enumerate() {
                let expected = next_turn_id + offset as u32;
                if turn.turn_id != expected {
                    return Err(Error::PhaseFatal {
                        phase: "generating_dialogue".into(),
                        message: format!(
                            "segment {} turn ids are not dense: expected {expected}, got {}",
                            segment.segment_id, turn.turn_id
                        ),
                    });
                }
                if !available_speakers.iter().any(|s| s == &turn.speaker_id) {
                    return Err(Error::PhaseFatal {
                        phase: "generating_dialogue".into(),
                        message: format!("unknown speaker_id \"{}\"", turn.speaker_id),
                    });
                }
            }
            next_turn_id += segment_turns.len() as u32;
            turns.append(&mut segment_turns);
        }
        Ok(turns)
    }

    /// P6: synthesize every turn, tolerating up to half the turns failing
    /// (§4.9 degradation policy). Checks `cancel` between turns since this
    /// is the longest-running phase.
    async fn synthesize_segments(
        &self,
        task_id: &str,
        turns: &[DialogueTurn],
        personas: &[PersonaResearch],
        cancel: &CancelToken,
    ) -> Result<SegmentAudioOutcome> {
        let persona_by_id: HashMap<&str, &PersonaResearch> =
            personas.iter().map(|p| (p.person_id.as_str(), p)).collect();

        let mut turn_audio = Vec::with_capacity(turns.len());
        let mut per_turn_audio_keys = Vec::new();
        let mut succeeded = 0usize;

        for turn in turns {
            cancel.check()?;
            let voice = self.resolve_voice(turn, &persona_by_id).await;
            match self.tts_gateway.synthesize(&turn.text, &voice).await {
                Ok(bytes) => {
                    let key = blob_keys::segment_audio_key(task_id, turn.turn_id);
                    match self.artifact_store.put_bytes(&key, bytes.clone(), "audio/mpeg").await {
                        Ok(_) => {
                            succeeded += 1;
                            per_turn_audio_keys.push(key);
                            turn_audio.push(TurnAudio { turn_id: turn.turn_id, bytes: Some(bytes) });
                        }
                        Err(e) => {
                            self.log(task_id, Phase::GeneratingAudioSegments, format!("turn {} could not be stored: {e}", turn.turn_id)).await;
                            turn_audio.push(TurnAudio { turn_id: turn.turn_id, bytes: None });
                        }
                    }
                }
                Err(e) => {
                    self.log(task_id, Phase::GeneratingAudioSegments, format!("turn {} synthesis failed: {e}", turn.turn_id)).await;
                    turn_audio.push(TurnAudio { turn_id: turn.turn_id, bytes: None });
                }
            }
        }

        if succeeded * 2 < turns.len() {
            return Err(Error::PhaseFatal {
                phase: "generating_audio_segments".into(),
                message: format!("only {succeeded}/{} turns synthesized, below the 50% threshold", turns.len()),
            });
        }
        Ok(SegmentAudioOutcome { turn_audio, per_turn_audio_keys })
    }

    async fn resolve_voice(&self, turn: &DialogueTurn, personas: &HashMap<&str, &PersonaResearch>) -> VoiceProfile {
        if let Some(persona) = personas.get(turn.speaker_id.as_str()) {
            return VoiceProfile {
                voice_id: persona.tts_voice_id.clone(),
                language_code: "en-US".to_string(),
                speaking_rate: persona.tts_voice_params.speaking_rate,
            };
        }
        self.tts_gateway.select_voice(&turn.speaker_id, Gender::Neutral).await
    }

    async fn enter_phase(&self, task_id: &str, phase: Phase, desc: &str) -> Result<()> {
        match self.status_store.update_status(task_id, phase, Some(desc.to_string()), None).await? {
            UpdateOutcome::Updated => Ok(()),
            UpdateOutcome::NotFound => Err(Error::Other(format!("task {task_id} is missing from the status store"))),
            UpdateOutcome::TerminalViolation => Err(Error::Cancelled),
        }
    }

    async fn log(&self, task_id: &str, phase: Phase, message: String) {
        let _ = self
            .status_store
            .append_log(task_id, LogEntry { ts: Utc::now(), phase, sub_task: None, message })
            .await;
    }

    async fn finish_with_error(&self, task_id: &str, request: &GenerateRequest, err: Error) {
        match err {
            Error::Cancelled => {
                self.log(task_id, Phase::Cancelled, "task cancelled".into()).await;
                let _ = self
                    .status_store
                    .update_status(task_id, Phase::Cancelled, Some("cancelled".into()), None)
                    .await;
                if let Some(url) = &request.webhook_url {
                    self.webhook_notifier.notify(url, task_id, "cancelled", None, None).await;
                }
            }
            other => {
                let (user_message, technical_detail) = describe_error(&other);
                let _ = self.status_store.set_error(task_id, user_message.clone(), technical_detail).await;
                if let Some(url) = &request.webhook_url {
                    self.webhook_notifier.notify(url, task_id, "failed", None, Some(&user_message)).await;
                }
            }
        }
    }
}

struct SegmentAudioOutcome {
    turn_audio: Vec<TurnAudio>,
    per_turn_audio_keys: Vec<String>,
}

fn available_speaker_ids(personas: &[PersonaResearch]) -> Vec<String> {
    let mut ids: Vec<String> = RESERVED_SPEAKER_IDS.iter().map(|s| s.to_string()).collect();
    ids.extend(personas.iter().map(|p| p.person_id.clone()));
    ids
}

/// Validates the two P4 tie-breaks: the outline's total target word
/// count must match the requested length exactly, and every segment's
/// speaker must resolve to a reserved id or a researched persona (§4.9).
fn validate_outline(outline: &PodcastOutline, total_word_target: u32, allowed_speakers: &[String]) -> std::result::Result<(), String> {
    if outline.segments.is_empty() {
        return Err("outline has no segments".to_string());
    }
    if outline.total_target_words() != total_word_target {
        return Err(format!(
            "total target word count {} does not match the requested {total_word_target}",
            outline.total_target_words()
        ));
    }
    for segment in &outline.segments {
        if !allowed_speakers.iter().any(|s| s == &segment.speaker_id) {
            return Err(format!(
                "segment \"{}\" uses unknown speaker_id \"{}\"",
                segment.segment_id, segment.speaker_id
            ));
        }
    }
    Ok(())
}

fn render_transcript(outline: &PodcastOutline, turns: &[DialogueTurn]) -> String {
    let mut out = format!("{}\n{}\n\n", outline.title, outline.summary);
    for turn in turns {
        out.push_str(&format!("[{}] {}: {}\n", turn.turn_id, turn.speaker_id, turn.text));
    }
    out
}

fn describe_error(err: &Error) -> (String, String) {
    match err {
        Error::PhaseFatal { phase, message } => (message.clone(), format!("phase {phase} fatal: {message}")),
        Error::InputError(m) => (m.clone(), format!("input error: {m}")),
        Error::ContentInvariantError(m) => (
            "the generated content did not meet the episode's requirements".to_string(),
            format!("content invariant violated: {m}"),
        ),
        Error::UpstreamPermanent { provider, message } => (
            format!("the {provider} service rejected the request"),
            format!("upstream permanent error from {provider}: {message}"),
        ),
        Error::UpstreamTransient { provider, message } => (
            format!("the {provider} service is temporarily unavailable"),
            format!("upstream transient error from {provider}: {message}"),
        ),
        other => (other.to_string(), other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outline_with(words: u32, speaker: &str) -> PodcastOutline {
        PodcastOutline {
            title: "t".into(),
            summary: "s".into(),
            segments: vec![OutlineSegment {
                segment_id: "seg-1".into(),
                title: "intro".into(),
                speaker_id: speaker.into(),
                content_cue: "".into(),
                target_word_count: words,
                estimated_duration_seconds: 60,
            }],
        }
    }

    #[test]
    fn validate_outline_accepts_exact_word_budget_and_reserved_speaker() {
        let outline = outline_with(750, "Host");
        assert!(validate_outline(&outline, 750, &available_speaker_ids(&[])).is_ok());
    }

    #[test]
    fn validate_outline_rejects_mismatched_word_budget() {
        let outline = outline_with(700, "Host");
        assert!(validate_outline(&outline, 750, &available_speaker_ids(&[])).is_err());
    }

    #[test]
    fn validate_outline_rejects_unknown_speaker() {
        let outline = outline_with(750, "some-stranger");
        assert!(validate_outline(&outline, 750, &available_speaker_ids(&[])).is_err());
    }

    #[test]
    fn available_speaker_ids_includes_reserved_and_personas() {
        let persona = PersonaResearch {
            person_id: "ada-lovelace".into(),
            display_name: "Ada Lovelace".into(),
            gender: Gender::Female,
            invented_name: "Ada".into(),
            detailed_profile_text: "".into(),
            tts_voice_id: "en-US-Neural2-C".into(),
            tts_voice_params: cf_domain::models::TtsVoiceParams::default(),
        };
        let ids = available_speaker_ids(&[persona]);
        assert!(ids.contains(&"Host".to_string()));
        assert!(ids.contains(&"Narrator".to_string()));
        assert!(ids.contains(&"ada-lovelace".to_string()));
    }

    #[test]
    fn render_transcript_includes_every_turn() {
        let outline = outline_with(100, "Host");
        let turns = vec![
            DialogueTurn { turn_id: 1, speaker_id: "Host".into(), speaker_gender: None, text: "hello".into(), source_mentions: vec![] },
            DialogueTurn { turn_id: 2, speaker_id: "Narrator".into(), speaker_gender: None, text: "world".into(), source_mentions: vec![] },
        ];
        let transcript = render_transcript(&outline, &turns);
        assert!(transcript.contains("hello"));
        assert!(transcript.contains("world"));
    }

    #[test]
    fn describe_error_gives_distinct_user_and_technical_messages() {
        let err = Error::PhaseFatal { phase: "generating_outline".into(), message: "boom".into() };
        let (user, technical) = describe_error(&err);
        assert_eq!(user, "boom");
        assert!(technical.contains("generating_outline"));
    }
}
