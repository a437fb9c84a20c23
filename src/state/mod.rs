//! Shared engine state wiring stores, caches, and the active session.

pub mod session;
pub mod state_machine;

use std::collections::VecDeque;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::cache::CacheReconciler;
use crate::cache::store::LocalCacheStore;
use crate::config::EngineConfig;
use crate::dao::models::RetryQueueItem;
use crate::dao::progress_store::ProgressStore;
use crate::puzzle::{PuzzleAnswer, Track};
use crate::services::streaks::StreakTracker;
use crate::state::session::PlaySession;

pub use self::state_machine::{InvalidTransition, SessionEvent, SessionPhase, SessionStateMachine};

/// Cheaply-cloneable handle to the engine state.
pub type SharedEngine = Arc<EngineState>;

/// Central engine state storing the selected progress store, caches, and
/// the session currently being played.
///
/// The progress store is selected once at construction (authoritative for
/// authenticated players, device-local for guests); no call site branches
/// on authentication afterwards.
pub struct EngineState {
    config: EngineConfig,
    store: Arc<dyn ProgressStore>,
    cache: CacheReconciler,
    streaks: Arc<dyn StreakTracker>,
    puzzle: RwLock<Option<PuzzleAnswer>>,
    session: RwLock<Option<PlaySession>>,
    attempt_ids: DashMap<(Uuid, Track), Uuid>,
    pending_guesses: Mutex<VecDeque<RetryQueueItem>>,
}

impl EngineState {
    /// Construct a new [`EngineState`] wrapped in an [`Arc`] so it can be
    /// cloned cheaply.
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn ProgressStore>,
        durable_cache: Arc<dyn LocalCacheStore>,
        streaks: Arc<dyn StreakTracker>,
    ) -> SharedEngine {
        Arc::new(Self {
            config,
            store,
            cache: CacheReconciler::new(durable_cache),
            streaks,
            puzzle: RwLock::new(None),
            session: RwLock::new(None),
            attempt_ids: DashMap::new(),
            pending_guesses: Mutex::new(VecDeque::new()),
        })
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The progress store selected for this session.
    pub fn store(&self) -> &Arc<dyn ProgressStore> {
        &self.store
    }

    /// Two-tier progress cache.
    pub fn cache(&self) -> &CacheReconciler {
        &self.cache
    }

    /// Streak/holiday collaborator.
    pub fn streaks(&self) -> &Arc<dyn StreakTracker> {
        &self.streaks
    }

    /// Install puzzle metadata as delivered by the external provider.
    ///
    /// Content may arrive before the allocator-assigned identifier; a later
    /// call with the id filled in completes it.
    pub async fn install_puzzle(&self, puzzle: PuzzleAnswer) {
        let mut slot = self.puzzle.write().await;
        *slot = Some(puzzle);
    }

    /// Attach the allocator-assigned identifier to the installed puzzle.
    pub async fn install_puzzle_id(&self, id: Uuid) {
        let mut slot = self.puzzle.write().await;
        if let Some(puzzle) = slot.as_mut() {
            puzzle.id = Some(id);
        }
    }

    /// Snapshot of the installed puzzle metadata, if any.
    pub async fn puzzle(&self) -> Option<PuzzleAnswer> {
        self.puzzle.read().await.clone()
    }

    /// Session currently being played.
    pub fn session(&self) -> &RwLock<Option<PlaySession>> {
        &self.session
    }

    /// Tear down the active session.
    ///
    /// Pending backoff timers are plain futures owned by in-flight calls,
    /// so dropping those calls cancels them; nothing re-enters the cleared
    /// session afterwards.
    pub async fn clear_session(&self) {
        let mut slot = self.session.write().await;
        slot.take();
    }

    /// Session-scoped idempotency map: attempt id already resolved for a
    /// (puzzle, track) pair, if any.
    pub fn cached_attempt_id(&self, puzzle_id: Uuid, track: Track) -> Option<Uuid> {
        self.attempt_ids
            .get(&(puzzle_id, track))
            .map(|entry| *entry.value())
    }

    /// Remember a resolved attempt id for the rest of the session.
    pub fn remember_attempt_id(&self, puzzle_id: Uuid, track: Track, attempt_id: Uuid) {
        self.attempt_ids.insert((puzzle_id, track), attempt_id);
    }

    /// Durable retry queue for guesses whose persistence retries were
    /// exhausted.
    pub fn pending_guesses(&self) -> &Mutex<VecDeque<RetryQueueItem>> {
        &self.pending_guesses
    }
}
