//! Shared utility functions for provider adapters.

use cf_domain::config::ProviderAuthConfig;
use cf_domain::error::{Error, Result};

/// Convert a [`reqwest::Error`] into an upstream-classified domain [`Error`].
///
/// Timeouts and connection failures are transient (worth retrying);
/// everything else is treated as permanent.
pub(crate) fn from_reqwest(provider: &str, e: reqwest::Error) -> Error {
    if e.is_timeout() || e.is_connect() {
        Error::UpstreamTransient {
            provider: provider.into(),
            message: e.to_string(),
        }
    } else {
        Error::UpstreamPermanent {
            provider: provider.into(),
            message: e.to_string(),
        }
    }
}

/// Resolve a single API key from a [`ProviderAuthConfig`].
///
/// Precedence: `key` (plaintext, config-only) then `env` (environment
/// variable). `keys` (rotation) is handled separately by `AuthRotator`.
pub fn resolve_api_key(auth: &ProviderAuthConfig) -> Result<String> {
    if let Some(ref key) = auth.key {
        tracing::warn!(
            "API key loaded from plaintext config field 'key' — prefer 'env' instead"
        );
        return Ok(key.clone());
    }

    if let Some(ref env_var) = auth.env {
        return std::env::var(env_var).map_err(|_| {
            Error::AuthError(format!(
                "environment variable '{}' not set or not valid UTF-8",
                env_var
            ))
        });
    }

    Err(Error::AuthError(
        "no API key configured: set 'key', 'env', or 'keys' on the provider's auth config".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_api_key_plaintext() {
        let auth = ProviderAuthConfig {
            key: Some("sk-test-123".into()),
            ..Default::default()
        };
        let result = resolve_api_key(&auth).unwrap();
        assert_eq!(result, "sk-test-123");
    }

    #[test]
    fn resolve_api_key_env_var() {
        let var_name = "CF_TEST_RESOLVE_ENV_KEY_1234";
        std::env::set_var(var_name, "env-secret-value");
        let auth = ProviderAuthConfig {
            env: Some(var_name.into()),
            ..Default::default()
        };
        let result = resolve_api_key(&auth).unwrap();
        assert_eq!(result, "env-secret-value");
        std::env::remove_var(var_name);
    }

    #[test]
    fn resolve_api_key_env_var_missing() {
        let auth = ProviderAuthConfig {
            env: Some("CF_TEST_NONEXISTENT_VAR_8888".into()),
            ..Default::default()
        };
        let err = resolve_api_key(&auth).unwrap_err();
        assert!(err.to_string().contains("CF_TEST_NONEXISTENT_VAR_8888"));
    }

    #[test]
    fn resolve_api_key_no_config() {
        let auth = ProviderAuthConfig::default();
        let err = resolve_api_key(&auth).unwrap_err();
        assert!(err.to_string().contains("no API key configured"));
    }

    #[test]
    fn resolve_api_key_plaintext_takes_precedence_over_env() {
        let auth = ProviderAuthConfig {
            key: Some("plaintext-wins".into()),
            env: Some("CF_TEST_SHOULD_NOT_BE_READ".into()),
            ..Default::default()
        };
        let result = resolve_api_key(&auth).unwrap();
        assert_eq!(result, "plaintext-wins");
    }
}
