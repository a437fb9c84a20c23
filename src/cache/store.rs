//! Durable local cache tier backends.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::cache::{CacheKey, CachedProgress};
use crate::dao::storage::{StorageError, StorageResult};

/// Durable tier of the progress cache, surviving an app reload.
///
/// `load` returning `None` means "never checked"; a stored entry with an
/// empty guess list means "checked, empty" and is just as cacheable.
pub trait LocalCacheStore: Send + Sync {
    /// Read the cached progress for a key, if the key was ever written.
    fn load(&self, key: CacheKey) -> BoxFuture<'static, StorageResult<Option<CachedProgress>>>;
    /// Write (or overwrite) the cached progress for its key.
    fn save(&self, entry: CachedProgress) -> BoxFuture<'static, StorageResult<()>>;
    /// Drop the cached progress for a key.
    fn remove(&self, key: CacheKey) -> BoxFuture<'static, StorageResult<()>>;
}

/// Durable cache tier held in process memory, for tests.
#[derive(Clone, Default)]
pub struct MemoryCacheStore {
    entries: Arc<DashMap<CacheKey, CachedProgress>>,
}

impl MemoryCacheStore {
    /// Empty cache store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalCacheStore for MemoryCacheStore {
    fn load(&self, key: CacheKey) -> BoxFuture<'static, StorageResult<Option<CachedProgress>>> {
        let entries = self.entries.clone();
        Box::pin(async move { Ok(entries.get(&key).map(|entry| entry.clone())) })
    }

    fn save(&self, entry: CachedProgress) -> BoxFuture<'static, StorageResult<()>> {
        let entries = self.entries.clone();
        Box::pin(async move {
            entries.insert(entry.key(), entry);
            Ok(())
        })
    }

    fn remove(&self, key: CacheKey) -> BoxFuture<'static, StorageResult<()>> {
        let entries = self.entries.clone();
        Box::pin(async move {
            entries.remove(&key);
            Ok(())
        })
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheDocument {
    entries: HashMap<String, CachedProgress>,
}

/// Durable cache tier persisted as a JSON document on disk.
#[derive(Clone)]
pub struct FileCacheStore {
    path: Arc<PathBuf>,
    gate: Arc<Mutex<()>>,
}

impl FileCacheStore {
    /// Open a cache store over the given document path.
    pub fn open(path: PathBuf) -> Self {
        Self {
            path: Arc::new(path),
            gate: Arc::new(Mutex::new(())),
        }
    }

    async fn load_document(path: &PathBuf) -> StorageResult<CacheDocument> {
        match tokio::fs::read(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| {
                StorageError::unavailable(
                    format!("cache document at `{}` is corrupt", path.display()),
                    source,
                )
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(CacheDocument::default()),
            Err(source) => Err(StorageError::unavailable(
                format!("failed to read cache document at `{}`", path.display()),
                source,
            )),
        }
    }

    async fn save_document(path: &PathBuf, document: &CacheDocument) -> StorageResult<()> {
        let bytes = serde_json::to_vec(document).map_err(|source| {
            StorageError::unavailable("failed to encode cache document".into(), source)
        })?;
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes).await.map_err(|source| {
            StorageError::unavailable(
                format!("failed to write cache document at `{}`", tmp.display()),
                source,
            )
        })?;
        tokio::fs::rename(&tmp, path).await.map_err(|source| {
            StorageError::unavailable(
                format!("failed to replace cache document at `{}`", path.display()),
                source,
            )
        })
    }
}

impl LocalCacheStore for FileCacheStore {
    fn load(&self, key: CacheKey) -> BoxFuture<'static, StorageResult<Option<CachedProgress>>> {
        let path = self.path.clone();
        let gate = self.gate.clone();
        Box::pin(async move {
            let _guard = gate.lock().await;
            let document = Self::load_document(&path).await?;
            Ok(document.entries.get(&key.slot()).cloned())
        })
    }

    fn save(&self, entry: CachedProgress) -> BoxFuture<'static, StorageResult<()>> {
        let path = self.path.clone();
        let gate = self.gate.clone();
        Box::pin(async move {
            let _guard = gate.lock().await;
            let mut document = Self::load_document(&path).await?;
            document.entries.insert(entry.key().slot(), entry);
            Self::save_document(&path, &document).await
        })
    }

    fn remove(&self, key: CacheKey) -> BoxFuture<'static, StorageResult<()>> {
        let path = self.path.clone();
        let gate = self.gate.clone();
        Box::pin(async move {
            let _guard = gate.lock().await;
            let mut document = Self::load_document(&path).await?;
            if document.entries.remove(&key.slot()).is_some() {
                Self::save_document(&path, &document).await?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::puzzle::Track;
    use uuid::Uuid;

    #[tokio::test]
    async fn file_store_round_trips_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let key = CacheKey {
            puzzle_id: Uuid::new_v4(),
            track: Track::Global,
        };

        {
            let store = FileCacheStore::open(path.clone());
            store
                .save(CachedProgress {
                    puzzle_id: key.puzzle_id,
                    track: key.track,
                    guesses: Vec::new(),
                })
                .await
                .unwrap();
        }

        let reopened = FileCacheStore::open(path);
        let loaded = reopened.load(key).await.unwrap();
        // Checked-but-empty is a stored state, not a miss.
        assert_eq!(loaded.map(|entry| entry.guesses.len()), Some(0));
    }

    #[tokio::test]
    async fn remove_clears_the_slot() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCacheStore::open(dir.path().join("cache.json"));
        let key = CacheKey {
            puzzle_id: Uuid::new_v4(),
            track: Track::Personalized,
        };

        store
            .save(CachedProgress {
                puzzle_id: key.puzzle_id,
                track: key.track,
                guesses: Vec::new(),
            })
            .await
            .unwrap();
        store.remove(key).await.unwrap();
        assert!(store.load(key).await.unwrap().is_none());
    }
}
