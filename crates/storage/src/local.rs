//! Local filesystem `ArtifactStore` backend, rooted at `OutputsConfig::root`.

use crate::cache::TextCache;
use crate::store::ArtifactStore;
use async_trait::async_trait;
use cf_domain::error::{Error, Result};
use std::path::PathBuf;

pub struct LocalArtifactStore {
    root: PathBuf,
    cache: TextCache,
}

impl LocalArtifactStore {
    pub fn new(root: PathBuf, cache: TextCache) -> Self {
        Self { root, cache }
    }

    fn resolve(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn put_bytes(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<String> {
        let path = self.resolve(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &bytes).await?;
        self.cache.invalidate(key);
        Ok(path.to_string_lossy().into_owned())
    }

    async fn get_text(&self, key: &str) -> Result<String> {
        if let Some(cached) = self.cache.get(key) {
            return Ok(cached);
        }
        let path = self.resolve(key);
        let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::InputError(format!("artifact not found: {key}"))
            } else {
                Error::Io(e)
            }
        })?;
        self.cache.insert(key.to_string(), text.clone());
        Ok(text)
    }

    async fn get_bytes(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.resolve(key);
        tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::InputError(format!("artifact not found: {key}"))
            } else {
                Error::Io(e)
            }
        })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.resolve(key);
        self.cache.invalidate(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::InputError(format!("artifact not found: {key}")))
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let root = self.resolve(prefix);
        let mut out = Vec::new();
        let mut pending = vec![root.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(e) => e,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(Error::Io(e)),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.is_dir() {
                    pending.push(path);
                } else if let Ok(rel) = path.strip_prefix(&root) {
                    out.push(rel.to_string_lossy().replace('\\', "/"));
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (LocalArtifactStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path().to_path_buf(), TextCache::default());
        (store, dir)
    }

    #[tokio::test]
    async fn put_then_get_text_round_trips() {
        let (store, _dir) = store();
        store.put_text("a/b.json", "{}", "application/json").await.unwrap();
        assert_eq!(store.get_text("a/b.json").await.unwrap(), "{}");
    }

    #[tokio::test]
    async fn get_missing_key_is_input_error() {
        let (store, _dir) = store();
        let err = store.get_text("missing.json").await.unwrap_err();
        assert!(matches!(err, Error::InputError(_)));
    }

    #[tokio::test]
    async fn delete_invalidates_cache() {
        let (store, _dir) = store();
        store.put_text("k.json", "x", "application/json").await.unwrap();
        store.get_text("k.json").await.unwrap();
        store.delete("k.json").await.unwrap();
        assert!(store.get_text("k.json").await.is_err());
    }

    #[tokio::test]
    async fn list_finds_nested_files() {
        let (store, _dir) = store();
        store.put_text("audio/t1/segments/turn_001.mp3", "x", "audio/mpeg").await.unwrap();
        store.put_text("audio/t1/segments/turn_002.mp3", "x", "audio/mpeg").await.unwrap();
        let keys = store.list("audio/t1").await.unwrap();
        assert_eq!(keys.len(), 2);
    }
}
