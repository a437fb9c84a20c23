//! Two-tier read-through cache over puzzle progress.
//!
//! Tier one is an in-memory map scoped to the engine instance; tier two is
//! a durable [`store::LocalCacheStore`]. Every key carries both the puzzle
//! id and the track: progress cached under one track must never answer a
//! read for the other.

pub mod store;

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::dao::models::GuessEntity;
use crate::dao::progress_store::ProgressStore;
use crate::dao::storage::StorageResult;
use crate::puzzle::Track;

use self::store::LocalCacheStore;

/// Identity of one cached progress entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Puzzle the progress belongs to.
    pub puzzle_id: Uuid,
    /// Content pool; part of the key, never inferred.
    pub track: Track,
}

impl CacheKey {
    /// Stable string form used by durable tiers and logs.
    pub fn slot(&self) -> String {
        format!("{}:{}", self.puzzle_id, self.track)
    }
}

/// Guesses known for one (puzzle, track) pair.
///
/// An entry with an empty guess list means the authoritative store was
/// checked and reported no progress; that state is cached like any other so
/// repeat lookups stay local.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedProgress {
    /// Puzzle the progress belongs to.
    pub puzzle_id: Uuid,
    /// Content pool of the puzzle.
    pub track: Track,
    /// Guesses in submission order; possibly empty.
    pub guesses: Vec<GuessEntity>,
}

impl CachedProgress {
    /// Key this entry is stored under.
    pub fn key(&self) -> CacheKey {
        CacheKey {
            puzzle_id: self.puzzle_id,
            track: self.track,
        }
    }
}

/// Read-through reconciler across the session tier, the durable tier, and
/// the authoritative store.
pub struct CacheReconciler {
    session: DashMap<CacheKey, CachedProgress>,
    durable: Arc<dyn LocalCacheStore>,
}

impl CacheReconciler {
    /// Build a reconciler over the given durable tier.
    pub fn new(durable: Arc<dyn LocalCacheStore>) -> Self {
        Self {
            session: DashMap::new(),
            durable,
        }
    }

    /// Resolve the progress for a key.
    ///
    /// Read order: session tier, durable tier, then one authoritative fetch
    /// of the attempt's guesses. Whatever the fetch returns, including an
    /// empty list, is written back to both tiers, so concurrent fills are
    /// idempotent rather than racy.
    pub async fn progress(
        &self,
        key: CacheKey,
        store: &dyn ProgressStore,
        attempt_id: Uuid,
    ) -> StorageResult<CachedProgress> {
        if let Some(entry) = self.session.get(&key) {
            return Ok(entry.clone());
        }

        match self.durable.load(key).await {
            Ok(Some(entry)) => {
                self.session.insert(key, entry.clone());
                return Ok(entry);
            }
            Ok(None) => {}
            Err(err) => {
                // A broken durable tier degrades to a remote fetch.
                warn!(key = %key.slot(), error = %err, "durable cache read failed");
            }
        }

        debug!(key = %key.slot(), %attempt_id, "cache miss; fetching authoritative guesses");
        let guesses = store.list_guesses(attempt_id).await?;
        let entry = CachedProgress {
            puzzle_id: key.puzzle_id,
            track: key.track,
            guesses,
        };
        self.write_back(entry.clone()).await;
        Ok(entry)
    }

    /// Write-through after a successful remote guess save.
    ///
    /// Both tiers are updated immediately, not on next read. The appended
    /// guess needs a complete baseline: a session-tier miss reads through
    /// the durable tier, and a miss there refetches the authoritative list
    /// (which already contains the saved guess). Overwriting a tier with
    /// less history than it held is never acceptable.
    pub async fn record_guess(
        &self,
        key: CacheKey,
        store: &dyn ProgressStore,
        attempt_id: Uuid,
        guess: GuessEntity,
    ) {
        if let Some(mut entry) = self.session.get(&key).map(|entry| entry.clone()) {
            entry.guesses.push(guess);
            self.write_back(entry).await;
            return;
        }

        match self.durable.load(key).await {
            Ok(Some(mut entry)) => {
                entry.guesses.push(guess);
                self.write_back(entry).await;
            }
            Ok(None) => self.refetch_after_save(key, store, attempt_id).await,
            Err(err) => {
                warn!(key = %key.slot(), error = %err, "durable cache read failed");
                self.refetch_after_save(key, store, attempt_id).await;
            }
        }
    }

    async fn refetch_after_save(&self, key: CacheKey, store: &dyn ProgressStore, attempt_id: Uuid) {
        match store.list_guesses(attempt_id).await {
            Ok(guesses) => {
                self.write_back(CachedProgress {
                    puzzle_id: key.puzzle_id,
                    track: key.track,
                    guesses,
                })
                .await;
            }
            Err(err) => {
                // Leave the key cold; the next read refetches the full
                // history instead of trusting a truncated entry.
                warn!(key = %key.slot(), %attempt_id, error = %err, "post-save refetch failed; not caching");
            }
        }
    }

    /// Drop both tiers for a key so the next read refetches.
    pub async fn invalidate(&self, key: CacheKey) {
        self.session.remove(&key);
        if let Err(err) = self.durable.remove(key).await {
            warn!(key = %key.slot(), error = %err, "durable cache invalidation failed");
        }
    }

    /// Whether the session tier currently holds the key.
    pub fn is_cached(&self, key: CacheKey) -> bool {
        self.session.contains_key(&key)
    }

    async fn write_back(&self, entry: CachedProgress) {
        let key = entry.key();
        self.session.insert(key, entry.clone());
        if let Err(err) = self.durable.save(entry).await {
            // Stale durable tier is tolerable; the session tier is current
            // and the next cold read refetches from the store.
            warn!(key = %key.slot(), error = %err, "durable cache write failed");
        }
    }
}
