//! Provider registry.
//!
//! Constructs and holds all configured LLM provider instances. At startup the
//! registry reads the [`LlmConfig`], resolves authentication (env vars, direct
//! keys), and instantiates the appropriate adapter for each configured provider.

use crate::anthropic::AnthropicProvider;
use crate::google::GoogleProvider;
use crate::traits::LlmProvider;
use cf_domain::config::{LlmConfig, LlmStartupPolicy, ProviderKind};
use cf_domain::error::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Holds all instantiated LLM providers and role assignments.
///
/// When the startup policy is `allow_none`, the registry also records
/// initialization errors so they can be surfaced in a readiness endpoint.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    roles: HashMap<String, String>,
    init_errors: Vec<ProviderInitError>,
}

/// Records a provider that failed to initialize.
#[derive(Debug, Clone)]
pub struct ProviderInitError {
    pub provider_id: String,
    pub kind: String,
    pub error: String,
}

impl ProviderRegistry {
    /// Build the registry from the application's [`LlmConfig`].
    ///
    /// Each entry in `config.providers` is instantiated using the adapter
    /// matching its `kind`. Providers that fail to initialize are logged and
    /// skipped rather than aborting startup, unless `startup_policy` says
    /// otherwise.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let mut providers: HashMap<String, Arc<dyn LlmProvider>> = HashMap::new();
        let mut init_errors: Vec<ProviderInitError> = Vec::new();

        for pc in &config.providers {
            let result: Result<Arc<dyn LlmProvider>> = match pc.kind {
                ProviderKind::Anthropic => {
                    AnthropicProvider::from_config(pc).map(|p| Arc::new(p) as Arc<dyn LlmProvider>)
                }
                ProviderKind::Google => {
                    GoogleProvider::from_config(pc).map(|p| Arc::new(p) as Arc<dyn LlmProvider>)
                }
            };

            match result {
                Ok(provider) => {
                    tracing::info!(
                        provider_id = %pc.id,
                        kind = ?pc.kind,
                        "registered LLM provider"
                    );
                    providers.insert(pc.id.clone(), provider);
                }
                Err(e) => {
                    tracing::warn!(
                        provider_id = %pc.id,
                        kind = ?pc.kind,
                        error = %e,
                        "failed to initialize LLM provider, skipping"
                    );
                    init_errors.push(ProviderInitError {
                        provider_id: pc.id.clone(),
                        kind: format!("{:?}", pc.kind),
                        error: e.to_string(),
                    });
                }
            }
        }

        if providers.is_empty() && !config.providers.is_empty() {
            match config.startup_policy {
                LlmStartupPolicy::RequireOne => {
                    return Err(Error::PhaseFatal {
                        phase: "bootstrap".into(),
                        message: "all configured LLM providers failed to initialize \
                                  (startup_policy = require_one)"
                            .into(),
                    });
                }
                LlmStartupPolicy::AllowNone => {
                    tracing::warn!(
                        failed_providers = init_errors.len(),
                        "no LLM providers initialized (startup_policy = allow_none); \
                         gateway will boot but generation endpoints will fail until \
                         credentials are configured"
                    );
                }
            }
        }

        let mut roles = HashMap::new();
        for (role_name, role_cfg) in &config.roles {
            roles.insert(role_name.clone(), role_cfg.model.clone());
        }

        Ok(Self {
            providers,
            roles,
            init_errors,
        })
    }

    /// Look up a provider by its config id.
    pub fn get(&self, provider_id: &str) -> Option<Arc<dyn LlmProvider>> {
        self.providers.get(provider_id).cloned()
    }

    /// Get the model spec (`"provider_id/model_name"`) assigned to a role.
    pub fn model_for_role(&self, role: &str) -> Option<&str> {
        self.roles.get(role).map(|s| s.as_str())
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// List all registered provider IDs (sorted).
    pub fn list_providers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.providers.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Provider initialization errors (empty if all succeeded).
    pub fn init_errors(&self) -> &[ProviderInitError] {
        &self.init_errors
    }
}
