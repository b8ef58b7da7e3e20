//! Role-driven LLM router.
//!
//! The router resolves a [`ModelRole`] to its configured provider/model,
//! sends the request, and falls back to the role's configured fallback
//! chain on a retryable error. Emits `TraceEvent::LlmRequest` /
//! `TraceEvent::LlmFallback` for observability.

use crate::registry::ProviderRegistry;
use crate::traits::{ChatRequest, ChatResponse, LlmProvider};
use cf_domain::capability::ModelRole;
use cf_domain::config::{LlmConfig, RoleConfig};
use cf_domain::error::{Error, Result};
use cf_domain::trace::TraceEvent;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// A role-driven router that selects providers per [`ModelRole`] and falls
/// back to configured alternates on transient failures.
pub struct LlmRouter {
    registry: ProviderRegistry,
    role_configs: HashMap<String, RoleConfig>,
    default_timeout_ms: u64,
}

impl LlmRouter {
    pub fn from_config(llm_config: &LlmConfig) -> Result<Self> {
        let registry = ProviderRegistry::from_config(llm_config)?;
        let role_configs: HashMap<String, RoleConfig> = llm_config.roles.clone();

        Ok(Self {
            registry,
            role_configs,
            default_timeout_ms: llm_config.default_timeout_ms,
        })
    }

    pub fn new(
        registry: ProviderRegistry,
        role_configs: HashMap<String, RoleConfig>,
        default_timeout_ms: u64,
    ) -> Self {
        Self {
            registry,
            role_configs,
            default_timeout_ms,
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Send a chat request for a given model role. The router:
    ///
    /// 1. Resolves the primary model from the role config.
    /// 2. Sends the request with a timeout.
    /// 3. On a retryable error, walks the role's fallback chain in order.
    /// 4. Emits `TraceEvent::LlmRequest` / `TraceEvent::LlmFallback`.
    pub async fn chat_for_role(
        &self,
        role: ModelRole,
        mut req: ChatRequest,
    ) -> Result<ChatResponse> {
        let role_str = role.config_key().to_string();
        req.json_mode = role.requires_json();

        let role_cfg = self.role_configs.get(&role_str).ok_or_else(|| {
            Error::PhaseFatal {
                phase: role_str.clone(),
                message: format!("no role config for '{}'", role_str),
            }
        })?;

        let (provider_id, model_name) = resolve_model(&role_cfg.model);
        if let Some(provider) = self.registry.get(provider_id) {
            req.model = Some(model_name.to_string());
            let start = Instant::now();
            let result = self.try_chat(&provider, &req).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match self.handle_attempt(&role_str, provider_id, model_name, duration_ms, result) {
                Ok(resp) => return Ok(resp),
                Err(AttemptOutcome::Retry) => {}
                Err(AttemptOutcome::Final(e)) => return Err(e),
            }
        } else {
            tracing::warn!(
                provider = %provider_id,
                "primary provider not found in registry, trying fallbacks"
            );
        }

        for fallback in &role_cfg.fallbacks {
            let (fb_provider_id, fb_model_name) = resolve_model(&fallback.model);
            let fb_provider = match self.registry.get(fb_provider_id) {
                Some(p) => p,
                None => {
                    tracing::warn!(provider = %fb_provider_id, "fallback provider not found, skipping");
                    continue;
                }
            };

            TraceEvent::LlmFallback {
                from_provider: provider_id.to_string(),
                from_model: model_name.to_string(),
                to_provider: fb_provider_id.to_string(),
                to_model: fb_model_name.to_string(),
                reason: "primary model failed or unavailable".to_string(),
            }
            .emit();

            req.model = Some(fb_model_name.to_string());
            let start = Instant::now();
            let result = self.try_chat(&fb_provider, &req).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match self.handle_attempt(&role_str, fb_provider_id, fb_model_name, duration_ms, result)
            {
                Ok(resp) => return Ok(resp),
                Err(AttemptOutcome::Retry) => continue,
                Err(AttemptOutcome::Final(e)) => return Err(e),
            }
        }

        Err(Error::UpstreamPermanent {
            provider: "router".into(),
            message: format!(
                "all models for role '{}' failed or were unavailable",
                role_str
            ),
        })
    }

    fn handle_attempt(
        &self,
        role_str: &str,
        provider_id: &str,
        model_name: &str,
        duration_ms: u64,
        result: Result<ChatResponse>,
    ) -> std::result::Result<ChatResponse, AttemptOutcome> {
        match result {
            Ok(resp) => {
                TraceEvent::LlmRequest {
                    provider: provider_id.to_string(),
                    model: model_name.to_string(),
                    role: role_str.to_string(),
                    duration_ms,
                    prompt_tokens: resp.usage.prompt_tokens,
                    completion_tokens: resp.usage.completion_tokens,
                    repaired: false,
                }
                .emit();
                Ok(resp)
            }
            Err(e) if e.is_retryable() => {
                tracing::warn!(
                    provider = %provider_id,
                    model = %model_name,
                    error = %e,
                    "model call failed, trying fallback"
                );
                Err(AttemptOutcome::Retry)
            }
            Err(e) => {
                TraceEvent::LlmRequest {
                    provider: provider_id.to_string(),
                    model: model_name.to_string(),
                    role: role_str.to_string(),
                    duration_ms,
                    prompt_tokens: None,
                    completion_tokens: None,
                    repaired: false,
                }
                .emit();
                Err(AttemptOutcome::Final(e))
            }
        }
    }

    async fn try_chat(
        &self,
        provider: &Arc<dyn LlmProvider>,
        req: &ChatRequest,
    ) -> Result<ChatResponse> {
        let timeout = std::time::Duration::from_millis(self.default_timeout_ms);
        match tokio::time::timeout(timeout, provider.chat(req.clone())).await {
            Ok(result) => result,
            Err(_) => Err(Error::UpstreamTransient {
                provider: provider.provider_id().to_string(),
                message: format!("timed out after {}ms", self.default_timeout_ms),
            }),
        }
    }
}

enum AttemptOutcome {
    Retry,
    Final(Error),
}

/// Split a `"provider_id/model_name"` string into its two components.
pub fn resolve_model(model_str: &str) -> (&str, &str) {
    match model_str.split_once('/') {
        Some((provider, model)) => (provider, model),
        None => (model_str, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_model_splits_on_slash() {
        assert_eq!(resolve_model("gemini/gemini-2.0-flash"), ("gemini", "gemini-2.0-flash"));
    }

    #[test]
    fn resolve_model_without_slash_has_empty_model() {
        assert_eq!(resolve_model("gemini"), ("gemini", ""));
    }
}
