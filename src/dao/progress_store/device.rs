//! Anonymous device-local progress store for unauthenticated players.
//!
//! Attempts live in a single JSON document on disk, keyed by the
//! player-visible puzzle date key rather than an attempt id, matching the
//! shape of the authoritative store's guess lists. The document survives a
//! reload of the app; surviving an account switch on a shared device is out
//! of scope.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::dao::models::{AttemptEntity, AttemptKey, AttemptResult, GuessEntity};
use crate::dao::storage::{StorageError, StorageResult};

/// Location of the on-disk document backing a [`DeviceProgressStore`].
#[derive(Debug, Clone)]
pub struct DeviceStoreConfig {
    /// Path of the JSON document.
    pub path: PathBuf,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DeviceDocument {
    attempts: HashMap<String, AttemptEntity>,
}

impl DeviceDocument {
    fn slot(key: &AttemptKey) -> String {
        format!("{}:{}:{}", key.date_key, key.track, key.player_id)
    }

    fn by_id_mut(&mut self, attempt_id: Uuid) -> Option<&mut AttemptEntity> {
        self.attempts
            .values_mut()
            .find(|attempt| attempt.id == attempt_id)
    }

    fn by_id(&self, attempt_id: Uuid) -> Option<&AttemptEntity> {
        self.attempts
            .values()
            .find(|attempt| attempt.id == attempt_id)
    }
}

/// Progress store persisting to a device-local JSON document.
#[derive(Clone)]
pub struct DeviceProgressStore {
    path: Arc<PathBuf>,
    // Serializes read-modify-write cycles within this process.
    gate: Arc<Mutex<()>>,
}

impl DeviceProgressStore {
    /// Open a store over the configured document path.
    ///
    /// The document is created lazily on first write; a missing file reads
    /// as an empty store.
    pub fn open(config: DeviceStoreConfig) -> Self {
        Self {
            path: Arc::new(config.path),
            gate: Arc::new(Mutex::new(())),
        }
    }

    async fn load(path: &PathBuf) -> StorageResult<DeviceDocument> {
        match tokio::fs::read(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| {
                StorageError::unavailable(
                    format!("device store at `{}` is corrupt", path.display()),
                    source,
                )
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Ok(DeviceDocument::default())
            }
            Err(source) => Err(StorageError::unavailable(
                format!("failed to read device store at `{}`", path.display()),
                source,
            )),
        }
    }

    async fn save(path: &PathBuf, document: &DeviceDocument) -> StorageResult<()> {
        let bytes = serde_json::to_vec_pretty(document).map_err(|source| {
            StorageError::unavailable("failed to encode device store".into(), source)
        })?;

        // Write-then-rename keeps the document whole across a crash.
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes).await.map_err(|source| {
            StorageError::unavailable(
                format!("failed to write device store at `{}`", tmp.display()),
                source,
            )
        })?;
        tokio::fs::rename(&tmp, path).await.map_err(|source| {
            StorageError::unavailable(
                format!("failed to replace device store at `{}`", path.display()),
                source,
            )
        })
    }
}

impl super::ProgressStore for DeviceProgressStore {
    fn find_or_create_attempt(
        &self,
        key: AttemptKey,
    ) -> BoxFuture<'static, StorageResult<AttemptEntity>> {
        let path = self.path.clone();
        let gate = self.gate.clone();
        Box::pin(async move {
            let _guard = gate.lock().await;
            let mut document = Self::load(&path).await?;

            let slot = DeviceDocument::slot(&key);
            if let Some(existing) = document.attempts.get(&slot) {
                return Ok(existing.clone());
            }

            let attempt = key.create_attempt(OffsetDateTime::now_utc());
            document.attempts.insert(slot, attempt.clone());
            Self::save(&path, &document).await?;
            Ok(attempt)
        })
    }

    fn append_guess(
        &self,
        attempt_id: Uuid,
        guess: GuessEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let path = self.path.clone();
        let gate = self.gate.clone();
        Box::pin(async move {
            let _guard = gate.lock().await;
            let mut document = Self::load(&path).await?;

            let attempt = document
                .by_id_mut(attempt_id)
                .ok_or(StorageError::NotFound { attempt_id })?;
            if attempt.is_finalized() {
                return Err(StorageError::Finalized { attempt_id });
            }
            attempt.guesses.push(guess);

            Self::save(&path, &document).await
        })
    }

    fn finalize_attempt(
        &self,
        attempt_id: Uuid,
        result: AttemptResult,
        completed_at: OffsetDateTime,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let path = self.path.clone();
        let gate = self.gate.clone();
        Box::pin(async move {
            let _guard = gate.lock().await;
            let mut document = Self::load(&path).await?;

            let attempt = document
                .by_id_mut(attempt_id)
                .ok_or(StorageError::NotFound { attempt_id })?;
            if attempt.is_finalized() {
                return Err(StorageError::Finalized { attempt_id });
            }
            attempt.result = Some(result);
            attempt.completed_at = Some(completed_at);

            Self::save(&path, &document).await
        })
    }

    fn list_guesses(&self, attempt_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<GuessEntity>>> {
        let path = self.path.clone();
        let gate = self.gate.clone();
        Box::pin(async move {
            let _guard = gate.lock().await;
            let document = Self::load(&path).await?;
            document
                .by_id(attempt_id)
                .map(|attempt| attempt.guesses.clone())
                .ok_or(StorageError::NotFound { attempt_id })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::progress_store::ProgressStore;
    use crate::puzzle::{DigitCount, Track};

    fn store_in(dir: &tempfile::TempDir) -> DeviceProgressStore {
        DeviceProgressStore::open(DeviceStoreConfig {
            path: dir.path().join("progress.json"),
        })
    }

    fn key(track: Track) -> AttemptKey {
        AttemptKey {
            player_id: "device-1".into(),
            puzzle_id: Uuid::new_v4(),
            date_key: "2026-08-26".into(),
            track,
            digit_count: DigitCount::Six,
            streak_saver: false,
        }
    }

    fn guess(value: &str) -> GuessEntity {
        GuessEntity {
            display: value.into(),
            canonical: "20260826".into(),
            submitted_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let attempt = store.find_or_create_attempt(key(Track::Global)).await.unwrap();
        assert!(attempt.guesses.is_empty());
    }

    #[tokio::test]
    async fn progress_survives_reopening_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let key = key(Track::Global);

        let attempt_id = {
            let store = store_in(&dir);
            let attempt = store.find_or_create_attempt(key.clone()).await.unwrap();
            store.append_guess(attempt.id, guess("200769")).await.unwrap();
            attempt.id
        };

        // Fresh store instance over the same file, as after an app reload.
        let reopened = store_in(&dir);
        let resumed = reopened.find_or_create_attempt(key).await.unwrap();
        assert_eq!(resumed.id, attempt_id);

        let guesses = reopened.list_guesses(attempt_id).await.unwrap();
        assert_eq!(guesses.len(), 1);
        assert_eq!(guesses[0].display, "200769");
    }

    #[tokio::test]
    async fn same_date_on_another_track_is_a_separate_slot() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let mut personalized = key(Track::Personalized);
        let global = key(Track::Global);
        personalized.player_id = global.player_id.clone();

        let a = store.find_or_create_attempt(global).await.unwrap();
        let b = store.find_or_create_attempt(personalized).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn finalize_locks_the_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let attempt = store.find_or_create_attempt(key(Track::Global)).await.unwrap();

        store
            .finalize_attempt(attempt.id, AttemptResult::Lost, OffsetDateTime::now_utc())
            .await
            .unwrap();

        let err = store.append_guess(attempt.id, guess("111111")).await;
        assert!(matches!(err, Err(StorageError::Finalized { .. })));
    }
}
