use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_8000")]
    pub port: u16,
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub environment: Environment,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: d_8000(),
            host: d_host(),
            cors: CorsConfig::default(),
            environment: Environment::default(),
        }
    }
}

/// Deployment environment, selects defaults for auth bypass / CORS / reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

impl Environment {
    /// `local` bypasses bearer-token auth entirely (§6.1).
    pub fn allows_auth_bypass(&self) -> bool {
        matches!(self, Environment::Local)
    }

    /// Default worker-pool size for `TaskRunner` (§4.3, §6.5).
    pub fn default_max_concurrent_generations(&self) -> usize {
        match self {
            Environment::Local => 2,
            Environment::Staging | Environment::Production => 4,
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(Environment::Local),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(format!("unknown environment: \"{other}\"")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Origins allowed for CORS. Use `["*"]` for permissive (NOT recommended).
    /// Defaults to localhost-only.
    #[serde(default = "d_cors_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: d_cors_origins(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_8000() -> u16 {
    8000
}
fn d_host() -> String {
    "0.0.0.0".into()
}
fn d_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:*".into(),
        "http://127.0.0.1:*".into(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_binds_all_interfaces_on_8000() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.environment, Environment::Local);
    }

    #[test]
    fn only_local_allows_auth_bypass() {
        assert!(Environment::Local.allows_auth_bypass());
        assert!(!Environment::Staging.allows_auth_bypass());
        assert!(!Environment::Production.allows_auth_bypass());
    }

    #[test]
    fn worker_pool_defaults_scale_with_environment() {
        assert_eq!(Environment::Local.default_max_concurrent_generations(), 2);
        assert_eq!(Environment::Staging.default_max_concurrent_generations(), 4);
        assert_eq!(Environment::Production.default_max_concurrent_generations(), 4);
    }

    #[test]
    fn environment_from_str_is_case_insensitive() {
        assert_eq!("Local".parse::<Environment>().unwrap(), Environment::Local);
        assert_eq!(
            "PRODUCTION".parse::<Environment>().unwrap(),
            Environment::Production
        );
        assert!("bogus".parse::<Environment>().is_err());
    }

    #[test]
    fn deserialize_missing_environment_defaults_to_local() {
        let cfg: ServerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.environment, Environment::Local);
    }
}
