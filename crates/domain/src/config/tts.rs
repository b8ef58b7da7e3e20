use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TTSGateway configuration (§4.6)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    /// Env var carrying the TTS backend credential (`GOOGLE_TTS_API_KEY`).
    #[serde(default = "d_api_key_env")]
    pub api_key_env: String,
    /// Internal bounded synthesis concurrency (§4.6: "≤ cores").
    #[serde(default = "d_max_concurrent_synth")]
    pub max_concurrent_synthesis: usize,
    /// Per-call timeout in milliseconds.
    #[serde(default = "d_timeout_ms")]
    pub call_timeout_ms: u64,
    /// Max retry attempts for transient errors.
    #[serde(default = "d_max_retries")]
    pub max_retries: u32,
    /// Inter-turn silence duration in milliseconds (§4.7).
    #[serde(default = "d_inter_turn_silence_ms")]
    pub inter_turn_silence_ms: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            api_key_env: d_api_key_env(),
            max_concurrent_synthesis: d_max_concurrent_synth(),
            call_timeout_ms: d_timeout_ms(),
            max_retries: d_max_retries(),
            inter_turn_silence_ms: d_inter_turn_silence_ms(),
        }
    }
}

fn d_api_key_env() -> String {
    "GOOGLE_TTS_API_KEY".into()
}
fn d_max_concurrent_synth() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
fn d_timeout_ms() -> u64 {
    30_000
}
fn d_max_retries() -> u32 {
    3
}
fn d_inter_turn_silence_ms() -> u64 {
    500
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_silence_is_500ms() {
        assert_eq!(TtsConfig::default().inter_turn_silence_ms, 500);
    }

    #[test]
    fn default_api_key_env_matches_spec() {
        assert_eq!(TtsConfig::default().api_key_env, "GOOGLE_TTS_API_KEY");
    }

    #[test]
    fn default_concurrency_is_at_least_one() {
        assert!(TtsConfig::default().max_concurrent_synthesis >= 1);
    }
}
