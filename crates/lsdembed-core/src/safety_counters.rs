//! Lock safety and observability counters.
//!
//! Always-on atomic counters for lock contention, lock-order violations
//! and release mismatches. They are process-wide diagnostics shared by
//! every engine instance and carry no index state.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide lock safety counters.
///
/// All counters use relaxed ordering since they are advisory.
#[allow(clippy::struct_field_names)]
pub(crate) struct LockSafetyCounters {
    /// Lock acquisitions that could not be satisfied without blocking.
    pub lock_contention_total: AtomicU64,
    /// Lock-rank invariant violations.
    pub invariant_violation_total: AtomicU64,
    /// Releases of a rank this thread was not holding.
    pub release_mismatch_total: AtomicU64,
}

impl LockSafetyCounters {
    /// Creates a counter set with all values at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lock_contention_total: AtomicU64::new(0),
            invariant_violation_total: AtomicU64::new(0),
            release_mismatch_total: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_contention(&self) {
        self.lock_contention_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_invariant_violation(&self) {
        self.invariant_violation_total
            .fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_release_mismatch(&self) {
        self.release_mismatch_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> LockSafetySnapshot {
        LockSafetySnapshot {
            lock_contention_total: self.lock_contention_total.load(Ordering::Relaxed),
            invariant_violation_total: self.invariant_violation_total.load(Ordering::Relaxed),
            release_mismatch_total: self.release_mismatch_total.load(Ordering::Relaxed),
        }
    }
}

/// Immutable snapshot of the lock safety counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[allow(clippy::struct_field_names)]
pub struct LockSafetySnapshot {
    /// Lock acquisitions that had to block.
    pub lock_contention_total: u64,
    /// Lock-rank invariant violations.
    pub invariant_violation_total: u64,
    /// Releases of a rank the thread was not holding.
    pub release_mismatch_total: u64,
}

/// Global safety counters instance, active in all builds.
pub(crate) static LOCK_COUNTERS: LockSafetyCounters = LockSafetyCounters::new();

/// Returns the current process-wide lock safety counters.
#[must_use]
pub fn lock_safety_snapshot() -> LockSafetySnapshot {
    LOCK_COUNTERS.snapshot()
}
