//! Lock-rank enforcement for engine state.
//!
//! Defines the global lock ordering invariant and checks it at runtime.
//! The rank system encodes the rule:
//!
//! ```text
//! maintenance → store → table[0] → table[1] → … → table[L-1]
//! ```
//!
//! A thread may only acquire a lock whose rank is strictly higher than
//! every rank it already holds. Violations are recorded in the safety
//! counters rather than panicking.
//!
//! Guards returned by [`read`] and [`write`] record their release on drop,
//! so early returns and `?` keep the per-thread rank stack balanced.

use crate::safety_counters::LOCK_COUNTERS;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::cell::RefCell;
use std::ops::{Deref, DerefMut};

/// Lock ranks in acquisition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum LockRank {
    /// Gate that excludes compaction from every other operation.
    Maintenance,
    /// The vector store.
    Store,
    /// One hash table; tables are ordered by index.
    Table(usize),
}

thread_local! {
    static LOCK_RANK_STACK: RefCell<Vec<LockRank>> = const { RefCell::new(Vec::new()) };
}

/// Records acquisition of a lock at the given rank.
///
/// The violation is always counted; debug builds also log it.
#[inline]
pub(crate) fn record_lock_acquire(rank: LockRank) {
    LOCK_RANK_STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        if let Some(&highest) = stack.iter().max() {
            if rank <= highest {
                LOCK_COUNTERS.record_invariant_violation();

                #[cfg(debug_assertions)]
                tracing::warn!(
                    acquired = ?rank,
                    highest_held = ?highest,
                    "lock-order violation: acquiring {:?} while holding {:?}",
                    rank,
                    highest,
                );
            }
        }
        stack.push(rank);
    });
}

/// Records release of the most recent acquisition of `rank`.
///
/// Guards may be released in any order; releasing a rank that is not held
/// is counted as a mismatch.
#[inline]
pub(crate) fn record_lock_release(rank: LockRank) {
    LOCK_RANK_STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        match stack.iter().rposition(|&held| held == rank) {
            Some(pos) => {
                stack.remove(pos);
            }
            None => LOCK_COUNTERS.record_release_mismatch(),
        }
    });
}

/// Returns the current depth of the lock rank stack for this thread.
#[cfg(test)]
pub(crate) fn lock_depth() -> usize {
    LOCK_RANK_STACK.with(|stack| stack.borrow().len())
}

/// A lock guard that keeps the rank stack in sync.
pub(crate) struct Ranked<G> {
    guard: G,
    rank: LockRank,
}

impl<G> Drop for Ranked<G> {
    fn drop(&mut self) {
        record_lock_release(self.rank);
    }
}

impl<G: Deref> Deref for Ranked<G> {
    type Target = G::Target;

    fn deref(&self) -> &Self::Target {
        &*self.guard
    }
}

impl<G: DerefMut> DerefMut for Ranked<G> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.guard
    }
}

/// Acquires `lock` for reading at `rank`.
pub(crate) fn read<T>(lock: &RwLock<T>, rank: LockRank) -> Ranked<RwLockReadGuard<'_, T>> {
    record_lock_acquire(rank);
    let guard = lock.try_read().unwrap_or_else(|| {
        LOCK_COUNTERS.record_contention();
        lock.read()
    });
    Ranked { guard, rank }
}

/// Acquires `lock` for writing at `rank`.
pub(crate) fn write<T>(lock: &RwLock<T>, rank: LockRank) -> Ranked<RwLockWriteGuard<'_, T>> {
    record_lock_acquire(rank);
    let guard = lock.try_write().unwrap_or_else(|| {
        LOCK_COUNTERS.record_contention();
        lock.write()
    });
    Ranked { guard, rank }
}
