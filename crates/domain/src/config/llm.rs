use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LLM provider system
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "d_20000u")]
    pub default_timeout_ms: u64,
    #[serde(default = "d_3")]
    pub max_retries: u32,
    /// Startup policy for LLM providers.
    ///
    /// - `allow_none` (default): gateway boots even if zero providers init;
    ///   generation endpoints return errors until credentials are configured.
    /// - `require_one`: abort startup if no providers successfully init.
    #[serde(default)]
    pub startup_policy: LlmStartupPolicy,
    /// Model roles: one per `LLMGateway` operation (analyze_source,
    /// research_persona, generate_outline, generate_segment_dialogue),
    /// plus any custom roles.
    #[serde(default)]
    pub roles: HashMap<String, RoleConfig>,
    /// Registered LLM providers (data-driven: adding a provider = adding config).
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 20_000,
            max_retries: 3,
            startup_policy: LlmStartupPolicy::AllowNone,
            roles: HashMap::new(),
            providers: Vec::new(),
        }
    }
}

/// Controls how the gateway handles LLM provider initialization at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LlmStartupPolicy {
    #[default]
    AllowNone,
    RequireOne,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleConfig {
    /// Format: "provider_id/model_name"
    pub model: String,
    #[serde(default)]
    pub require_json: bool,
    #[serde(default)]
    pub fallbacks: Vec<FallbackConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    pub model: String,
    #[serde(default)]
    pub require_json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    pub kind: ProviderKind,
    pub base_url: String,
    #[serde(default)]
    pub auth: ProviderAuthConfig,
    #[serde(default)]
    pub default_model: Option<String>,
}

/// Providers the LLM gateway ships adapters for. Only `Google` (Gemini) and
/// `Anthropic` are in scope — no OpenAI-compatible, Bedrock, or OAuth-device
/// backends here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Google,
    Anthropic,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderAuthConfig {
    #[serde(default)]
    pub mode: AuthMode,
    /// Env var containing the key.
    #[serde(default)]
    pub env: Option<String>,
    /// Direct key (config-only setups; prefer env).
    #[serde(default)]
    pub key: Option<String>,
    /// Multiple env var names for round-robin key rotation. When non-empty,
    /// takes precedence over `env`/`key`.
    #[serde(default)]
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    #[default]
    ApiKey,
    QueryParam,
}

// ── serde default helpers ───────────────────────────────────────────

fn d_20000u() -> u64 {
    20_000
}
fn d_3() -> u32 {
    3
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llm_config_default_has_no_providers() {
        let config = LlmConfig::default();
        assert!(config.providers.is_empty());
        assert_eq!(config.startup_policy, LlmStartupPolicy::AllowNone);
    }

    #[test]
    fn provider_config_deserializes() {
        let json = r#"{
            "id": "gemini",
            "kind": "google",
            "base_url": "https://generativelanguage.googleapis.com",
            "auth": { "mode": "query_param", "env": "GEMINI_API_KEY" }
        }"#;
        let provider: ProviderConfig = serde_json::from_str(json).unwrap();
        assert_eq!(provider.kind, ProviderKind::Google);
        assert_eq!(provider.auth.env.as_deref(), Some("GEMINI_API_KEY"));
    }

    #[test]
    fn role_config_with_fallback_deserializes() {
        let json = r#"{
            "model": "gemini/gemini-2.0-flash",
            "require_json": true,
            "fallbacks": [{"model": "anthropic/claude-sonnet-4-5-20250514", "require_json": true}]
        }"#;
        let role: RoleConfig = serde_json::from_str(json).unwrap();
        assert!(role.require_json);
        assert_eq!(role.fallbacks.len(), 1);
    }

    #[test]
    fn startup_policy_serde_roundtrip() {
        for policy in &["allow_none", "require_one"] {
            let json = format!("\"{}\"", policy);
            let parsed: LlmStartupPolicy = serde_json::from_str(&json).unwrap();
            let back = serde_json::to_string(&parsed).unwrap();
            assert_eq!(back, json);
        }
    }
}
