//! The backend-agnostic [`ArtifactStore`] trait (§4.2).

use async_trait::async_trait;
use cf_domain::error::Result;

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Write raw bytes under `key`, returning a URL/path identifying them.
    async fn put_bytes(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String>;

    /// Write a UTF-8 string under `key`.
    async fn put_text(&self, key: &str, text: &str, content_type: &str) -> Result<String> {
        self.put_bytes(key, text.as_bytes().to_vec(), content_type).await
    }

    /// Read `key` back as a UTF-8 string. Implementations that sit behind
    /// a cache (see [`crate::cache::TextCache`]) check it first.
    async fn get_text(&self, key: &str) -> Result<String>;

    /// Read `key` back as raw bytes (e.g. an audio blob).
    async fn get_bytes(&self, key: &str) -> Result<Vec<u8>>;

    /// Delete `key`. Must invalidate any cache entry for it.
    async fn delete(&self, key: &str) -> Result<()>;

    /// List all keys under `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}
