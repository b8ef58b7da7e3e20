use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// StatusStore / ArtifactStore backing configuration
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// `DATABASE_URL` backing for StatusStore (§3.1, §6.4). A lightweight
/// embedded DB (sqlite) suffices for local runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "d_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: d_database_url(),
        }
    }
}

fn d_database_url() -> String {
    "sqlite://./data/castforge.db".into()
}

/// ArtifactStore remote backend selection (§4.2, §6.5). When `bucket` is
/// `None`, ArtifactStore falls back to the local filesystem backend rooted
/// at `OutputsConfig::root`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ArtifactStoreConfig {
    /// `AUDIO_BUCKET` — bucket/container name for the remote object store.
    #[serde(default)]
    pub bucket: Option<String>,
    /// Text-blob read cache size (entries).
    #[serde(default = "d_cache_size")]
    pub text_cache_size: u64,
    /// Text-blob read cache TTL in seconds.
    #[serde(default = "d_cache_ttl_secs")]
    pub text_cache_ttl_secs: u64,
}

impl ArtifactStoreConfig {
    pub fn remote_enabled(&self) -> bool {
        self.bucket.is_some()
    }
}

fn d_cache_size() -> u64 {
    50
}

fn d_cache_ttl_secs() -> u64 {
    300
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_database_url_is_local_sqlite() {
        assert_eq!(DatabaseConfig::default().url, "sqlite://./data/castforge.db");
    }

    #[test]
    fn artifact_store_defaults_to_local_backend() {
        let cfg = ArtifactStoreConfig::default();
        assert!(!cfg.remote_enabled());
        assert_eq!(cfg.text_cache_size, 50);
        assert_eq!(cfg.text_cache_ttl_secs, 300);
    }

    #[test]
    fn artifact_store_remote_enabled_when_bucket_set() {
        let cfg = ArtifactStoreConfig {
            bucket: Some("my-bucket".into()),
            ..Default::default()
        };
        assert!(cfg.remote_enabled());
    }
}
