use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Inbound auth configuration (§4.10.1, §6.1)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// Env var names holding static bearer API keys granting full scope.
    #[serde(default)]
    pub api_key_envs: Vec<String>,
    #[serde(default)]
    pub oauth: OAuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// Access token lifetime in seconds (§6.1: 1 hour).
    #[serde(default = "d_access_token_secs")]
    pub access_token_ttl_secs: i64,
    /// Authorization code lifetime in seconds (§6.1: 10 minutes), single-use.
    #[serde(default = "d_auth_code_secs")]
    pub auth_code_ttl_secs: i64,
    /// Dynamic client registration secret lifetime in seconds (~30 days).
    #[serde(default = "d_client_secret_secs")]
    pub client_secret_ttl_secs: i64,
    /// Supported scopes advertised at discovery.
    #[serde(default = "d_scopes")]
    pub scopes: Vec<String>,
    /// Relax `redirect_uri` validation for specific pre-registered clients
    /// (§9 design note: the "Claude.ai trust redirect_uri" accommodation).
    /// Off by default; production deployments opt in explicitly.
    #[serde(default)]
    pub trust_redirect_uri_allowlist: Vec<String>,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            access_token_ttl_secs: d_access_token_secs(),
            auth_code_ttl_secs: d_auth_code_secs(),
            client_secret_ttl_secs: d_client_secret_secs(),
            scopes: d_scopes(),
            trust_redirect_uri_allowlist: Vec::new(),
        }
    }
}

fn d_access_token_secs() -> i64 {
    3600
}
fn d_auth_code_secs() -> i64 {
    600
}
fn d_client_secret_secs() -> i64 {
    60 * 60 * 24 * 30
}
fn d_scopes() -> Vec<String> {
    vec!["mcp.read".into(), "mcp.write".into(), "admin".into()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_lifetimes() {
        let cfg = OAuthConfig::default();
        assert_eq!(cfg.access_token_ttl_secs, 3600);
        assert_eq!(cfg.auth_code_ttl_secs, 600);
        assert_eq!(cfg.client_secret_ttl_secs, 2_592_000);
        assert_eq!(cfg.scopes, vec!["mcp.read", "mcp.write", "admin"]);
        assert!(cfg.trust_redirect_uri_allowlist.is_empty());
    }

    #[test]
    fn auth_config_default_has_no_api_keys() {
        assert!(AuthConfig::default().api_key_envs.is_empty());
    }
}
