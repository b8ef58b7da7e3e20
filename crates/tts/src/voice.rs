//! Deterministic voice selection (§4.6, §9 design note).
//!
//! Voice index and speaking rate are both derived from a stable hash of
//! `person_id`, so re-running the same config reproduces the same voice
//! assignment without needing true randomness.

use cf_domain::models::{Gender, TtsVoiceParams};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// A hard-coded shortlist of high-quality English voices per gender,
/// used when the backend's voice catalog is empty or unavailable.
fn fallback_shortlist(gender: Gender) -> &'static [&'static str] {
    match gender {
        Gender::Male => &["en-US-Neural2-D", "en-GB-Neural2-B", "en-AU-Neural2-B"],
        Gender::Female => &["en-US-Neural2-C", "en-GB-Neural2-A", "en-AU-Neural2-A"],
        Gender::Neutral => &["en-US-Neural2-F", "en-GB-Neural2-D", "en-AU-Neural2-C"],
    }
}

/// A voice assignment chosen for a persona: the backend voice id, the
/// language code it belongs to, and the speaking rate for all of that
/// persona's turns.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceProfile {
    pub voice_id: String,
    pub language_code: String,
    pub speaking_rate: f32,
}

/// Hash `person_id` into a stable `u64`, then derive a shortlist index
/// and a speaking rate in `[0.85, 1.15]` from it.
pub fn pick_voice(
    person_id: &str,
    gender: Gender,
    catalog: &std::collections::HashMap<Gender, Vec<String>>,
) -> VoiceProfile {
    let mut hasher = DefaultHasher::new();
    person_id.hash(&mut hasher);
    let h = hasher.finish();

    let shortlist: Vec<&str> = catalog
        .get(&gender)
        .filter(|v| !v.is_empty())
        .map(|v| v.iter().map(|s| s.as_str()).collect())
        .unwrap_or_else(|| fallback_shortlist(gender).to_vec());

    let idx = (h as usize) % shortlist.len();
    let voice_id = shortlist[idx].to_string();

    // Spread the low bits of the hash across [0.85, 1.15] in steps of 0.01.
    let rate_steps = 31u64; // (1.15 - 0.85) / 0.01 + 1
    let step = (h >> 8) % rate_steps;
    let speaking_rate = 0.85 + (step as f32) * 0.01;

    let language_code = voice_id
        .split('-')
        .take(2)
        .collect::<Vec<_>>()
        .join("-");

    VoiceProfile {
        voice_id,
        language_code,
        speaking_rate,
    }
}

pub fn voice_params_from_rate(rate: f32) -> TtsVoiceParams {
    TtsVoiceParams {
        speaking_rate: rate.clamp(0.85, 1.15),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn same_person_id_always_picks_same_voice() {
        let catalog = HashMap::new();
        let a = pick_voice("alan-turing", Gender::Male, &catalog);
        let b = pick_voice("alan-turing", Gender::Male, &catalog);
        assert_eq!(a, b);
    }

    #[test]
    fn speaking_rate_within_bounds() {
        let catalog = HashMap::new();
        for id in ["a", "b", "c", "d", "alan-turing", "ada-lovelace"] {
            let v = pick_voice(id, Gender::Female, &catalog);
            assert!(v.speaking_rate >= 0.85 && v.speaking_rate <= 1.15);
        }
    }

    #[test]
    fn different_genders_use_different_shortlists() {
        let catalog = HashMap::new();
        let male = pick_voice("x", Gender::Male, &catalog);
        let female = pick_voice("x", Gender::Female, &catalog);
        assert_ne!(male.voice_id, female.voice_id);
    }

    #[test]
    fn custom_catalog_overrides_fallback() {
        let mut catalog = HashMap::new();
        catalog.insert(Gender::Neutral, vec!["custom-voice-1".into()]);
        let v = pick_voice("anyone", Gender::Neutral, &catalog);
        assert_eq!(v.voice_id, "custom-voice-1");
    }
}
