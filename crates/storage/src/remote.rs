//! Object-store-backed `ArtifactStore` backend (GCS/S3 via `object_store`).

use crate::cache::TextCache;
use crate::store::ArtifactStore;
use async_trait::async_trait;
use cf_domain::error::{Error, Result};
use futures_util::TryStreamExt;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::sync::Arc;

pub struct RemoteArtifactStore {
    store: Arc<dyn ObjectStore>,
    cache: TextCache,
}

impl RemoteArtifactStore {
    pub fn new(store: Arc<dyn ObjectStore>, cache: TextCache) -> Self {
        Self { store, cache }
    }
}

fn classify(e: object_store::Error, key: &str) -> Error {
    match &e {
        object_store::Error::NotFound { .. } => {
            Error::InputError(format!("artifact not found: {key}"))
        }
        _ => Error::UpstreamTransient {
            provider: "object_store".into(),
            message: e.to_string(),
        },
    }
}

#[async_trait]
impl ArtifactStore for RemoteArtifactStore {
    async fn put_bytes(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<String> {
        let path = ObjectPath::from(key);
        self.store
            .put(&path, bytes.into())
            .await
            .map_err(|e| classify(e, key))?;
        self.cache.invalidate(key);
        Ok(path.to_string())
    }

    async fn get_text(&self, key: &str) -> Result<String> {
        if let Some(cached) = self.cache.get(key) {
            return Ok(cached);
        }
        let bytes = self.get_bytes(key).await?;
        let text = String::from_utf8(bytes)
            .map_err(|e| Error::InputError(format!("artifact {key} is not valid utf-8: {e}")))?;
        self.cache.insert(key.to_string(), text.clone());
        Ok(text)
    }

    async fn get_bytes(&self, key: &str) -> Result<Vec<u8>> {
        let path = ObjectPath::from(key);
        let result = self.store.get(&path).await.map_err(|e| classify(e, key))?;
        let bytes = result.bytes().await.map_err(|e| classify(e, key))?;
        Ok(bytes.to_vec())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = ObjectPath::from(key);
        self.cache.invalidate(key);
        self.store.delete(&path).await.map_err(|e| classify(e, key))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix_path = ObjectPath::from(prefix);
        let entries: Vec<_> = self
            .store
            .list(Some(&prefix_path))
            .try_collect()
            .await
            .map_err(|e| classify(e, prefix))?;
        Ok(entries.into_iter().map(|m| m.location.to_string()).collect())
    }
}
