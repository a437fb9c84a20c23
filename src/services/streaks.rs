//! Streak/holiday collaborator boundary.
//!
//! The engine treats streak ownership as opaque: it reads statistics and
//! issues consume/reset commands at terminal transitions, nothing more.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use futures::future::BoxFuture;

use crate::dao::storage::{StorageError, StorageResult};

/// Snapshot of the externally-owned streak counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakStatistics {
    /// Current consecutive-day streak.
    pub current: u32,
    /// Best streak ever reached.
    pub best: u32,
}

/// Signal surfaced to the presentation layer after a winning play of
/// today's puzzle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakMilestone {
    /// Streak length after the win.
    pub streak: u32,
}

/// External service owning streak state.
pub trait StreakTracker: Send + Sync {
    /// Fresh streak statistics.
    fn statistics(&self) -> BoxFuture<'static, StorageResult<StreakStatistics>>;
    /// Mark the active streak-saver as consumed.
    fn consume_saver(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Reset the streak counter to zero.
    fn reset_streak(&self) -> BoxFuture<'static, StorageResult<()>>;
}

#[derive(Default)]
struct Inner {
    current: AtomicU32,
    best: AtomicU32,
    saver_consumed: AtomicBool,
    fail: AtomicBool,
}

/// In-memory streak tracker used in tests and guest sessions without a
/// remote streak service.
#[derive(Clone, Default)]
pub struct MemoryStreakTracker {
    inner: Arc<Inner>,
}

impl MemoryStreakTracker {
    /// Tracker seeded with a current streak.
    pub fn with_streak(current: u32) -> Self {
        let tracker = Self::default();
        tracker.inner.current.store(current, Ordering::SeqCst);
        tracker.inner.best.store(current, Ordering::SeqCst);
        tracker
    }

    /// Make every subsequent call fail with a transient error.
    pub fn fail_all(&self) {
        self.inner.fail.store(true, Ordering::SeqCst);
    }

    /// Whether the saver has been consumed.
    pub fn saver_consumed(&self) -> bool {
        self.inner.saver_consumed.load(Ordering::SeqCst)
    }

    /// Current streak value.
    pub fn current(&self) -> u32 {
        self.inner.current.load(Ordering::SeqCst)
    }
}

impl StreakTracker for MemoryStreakTracker {
    fn statistics(&self) -> BoxFuture<'static, StorageResult<StreakStatistics>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            if inner.fail.load(Ordering::SeqCst) {
                return Err(StorageError::transient("streak service down"));
            }
            Ok(StreakStatistics {
                current: inner.current.load(Ordering::SeqCst),
                best: inner.best.load(Ordering::SeqCst),
            })
        })
    }

    fn consume_saver(&self) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            if inner.fail.load(Ordering::SeqCst) {
                return Err(StorageError::transient("streak service down"));
            }
            inner.saver_consumed.store(true, Ordering::SeqCst);
            Ok(())
        })
    }

    fn reset_streak(&self) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            if inner.fail.load(Ordering::SeqCst) {
                return Err(StorageError::transient("streak service down"));
            }
            inner.current.store(0, Ordering::SeqCst);
            Ok(())
        })
    }
}
