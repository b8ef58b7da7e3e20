mod auth;
mod cleanup;
mod llm;
mod observability;
mod server;
mod storage;
mod tasks;
mod tts;
mod workspace;

pub use auth::*;
pub use cleanup::*;
pub use llm::*;
pub use observability::*;
pub use server::*;
pub use storage::*;
pub use tasks::*;
pub use tts::*;
pub use workspace::*;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub tts: TtsConfig,
    #[serde(default)]
    pub tasks: TaskConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub artifact_store: ArtifactStoreConfig,
    #[serde(default)]
    pub cleanup: CleanupConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good. Bootstrap aborts
    /// on any `Error`-severity issue and logs `Warning`-severity ones.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        // Server port must be non-zero.
        if self.server.port == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.port".into(),
                message: "port must be greater than 0".into(),
            });
        }

        // Server host must not be empty.
        if self.server.host.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.host".into(),
                message: "host must not be empty".into(),
            });
        }

        // CORS: warn if wildcard is used.
        if self.server.cors.allowed_origins.len() == 1 && self.server.cors.allowed_origins[0] == "*"
        {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "server.cors.allowed_origins".into(),
                message: "wildcard \"*\" allows all origins (not recommended for production)"
                    .into(),
            });
        }

        // Warn when no LLM providers are configured.
        if self.llm.providers.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "llm.providers".into(),
                message: "no LLM providers configured".into(),
            });
        } else if self.llm.startup_policy == LlmStartupPolicy::RequireOne
            && self.llm.providers.is_empty()
        {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "llm.providers".into(),
                message: "startup_policy is require_one but no providers are configured".into(),
            });
        }

        let mut seen_ids: HashSet<&str> = HashSet::new();
        for (i, provider) in self.llm.providers.iter().enumerate() {
            if provider.id.is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("llm.providers[{i}].id"),
                    message: "provider id must not be empty".into(),
                });
            }
            if provider.base_url.is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("llm.providers[{i}].base_url"),
                    message: "provider base_url must not be empty".into(),
                });
            }
            if !provider.base_url.is_empty()
                && !provider.base_url.starts_with("http://")
                && !provider.base_url.starts_with("https://")
            {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("llm.providers[{i}].base_url"),
                    message: format!(
                        "base_url must start with http:// or https:// (got \"{}\")",
                        provider.base_url
                    ),
                });
            }
            if !provider.id.is_empty() && !seen_ids.insert(&provider.id) {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Warning,
                    field: format!("llm.providers[{i}].id"),
                    message: format!(
                        "duplicate provider id \"{}\" — later provider will shadow earlier one",
                        provider.id
                    ),
                });
            }
            let needs_credentials = matches!(
                provider.auth.mode,
                AuthMode::ApiKey | AuthMode::QueryParam
            );
            if needs_credentials {
                let has_env = provider.auth.env.as_ref().is_some_and(|v| !v.is_empty());
                let has_key = provider.auth.key.as_ref().is_some_and(|v| !v.is_empty());
                let has_keys = !provider.auth.keys.is_empty();
                if !has_env && !has_key && !has_keys {
                    errors.push(ConfigError {
                        severity: ConfigSeverity::Error,
                        field: format!("llm.providers[{i}].auth"),
                        message: format!(
                            "provider \"{}\" uses {:?} auth mode but has no auth.env, auth.key, or auth.keys configured",
                            provider.id, provider.auth.mode
                        ),
                    });
                }
            }
        }

        // Remote ArtifactStore requires a bucket name that is non-empty.
        if let Some(bucket) = &self.artifact_store.bucket {
            if bucket.is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: "artifact_store.bucket".into(),
                    message: "AUDIO_BUCKET set but empty".into(),
                });
            }
        }

        // DATABASE_URL must not be empty.
        if self.database.url.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "database.url".into(),
                message: "database.url must not be empty".into(),
            });
        }

        // No inbound auth at all outside local is a footgun, not an error.
        if !self.server.environment.allows_auth_bypass() && self.auth.api_key_envs.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "auth.api_key_envs".into(),
                message: "no static API keys configured outside local environment; only OAuth clients will be able to authenticate".into(),
            });
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            server: ServerConfig {
                port: 8000,
                host: "0.0.0.0".into(),
                ..ServerConfig::default()
            },
            llm: LlmConfig {
                providers: vec![ProviderConfig {
                    id: "gemini".into(),
                    kind: ProviderKind::Google,
                    base_url: "https://generativelanguage.googleapis.com".into(),
                    auth: ProviderAuthConfig {
                        mode: AuthMode::QueryParam,
                        env: Some("GEMINI_API_KEY".into()),
                        ..ProviderAuthConfig::default()
                    },
                    default_model: None,
                }],
                ..LlmConfig::default()
            },
            ..Config::default()
        }
    }

    fn find_issue<'a>(issues: &'a [ConfigError], field_prefix: &str) -> Option<&'a ConfigError> {
        issues.iter().find(|e| e.field.starts_with(field_prefix))
    }

    #[test]
    fn valid_config_passes() {
        let issues = valid_config().validate();
        let errors: Vec<_> = issues
            .iter()
            .filter(|e| e.severity == ConfigSeverity::Error)
            .collect();
        assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
    }

    #[test]
    fn server_port_zero_is_error() {
        let mut cfg = valid_config();
        cfg.server.port = 0;
        let issues = cfg.validate();
        let issue = find_issue(&issues, "server.port").expect("expected port error");
        assert_eq!(issue.severity, ConfigSeverity::Error);
    }

    #[test]
    fn empty_providers_is_warning_not_error() {
        let mut cfg = valid_config();
        cfg.llm.providers.clear();
        let issues = cfg.validate();
        let issue = find_issue(&issues, "llm.providers").expect("expected providers warning");
        assert_eq!(issue.severity, ConfigSeverity::Warning);
    }

    #[test]
    fn provider_missing_credentials_is_error() {
        let mut cfg = valid_config();
        cfg.llm.providers[0].auth.env = None;
        let issues = cfg.validate();
        let issue = find_issue(&issues, "llm.providers[0].auth").expect("expected auth error");
        assert_eq!(issue.severity, ConfigSeverity::Error);
    }

    #[test]
    fn duplicate_provider_ids_is_warning() {
        let mut cfg = valid_config();
        let dup = cfg.llm.providers[0].clone();
        cfg.llm.providers.push(dup);
        let issues = cfg.validate();
        let issue = find_issue(&issues, "llm.providers[1].id").expect("expected duplicate warning");
        assert_eq!(issue.severity, ConfigSeverity::Warning);
    }

    #[test]
    fn empty_database_url_is_error() {
        let mut cfg = valid_config();
        cfg.database.url = String::new();
        let issues = cfg.validate();
        assert!(find_issue(&issues, "database.url").is_some());
    }

    #[test]
    fn wildcard_cors_is_warning() {
        let mut cfg = valid_config();
        cfg.server.cors.allowed_origins = vec!["*".into()];
        let issues = cfg.validate();
        let issue = find_issue(&issues, "server.cors").expect("expected cors warning");
        assert_eq!(issue.severity, ConfigSeverity::Warning);
    }

    #[test]
    fn no_api_keys_outside_local_is_warning() {
        let mut cfg = valid_config();
        cfg.server.environment = Environment::Production;
        let issues = cfg.validate();
        assert!(find_issue(&issues, "auth.api_key_envs").is_some());
    }

    #[test]
    fn no_api_keys_in_local_is_fine() {
        let cfg = valid_config();
        let issues = cfg.validate();
        assert!(find_issue(&issues, "auth.api_key_envs").is_none());
    }
}
