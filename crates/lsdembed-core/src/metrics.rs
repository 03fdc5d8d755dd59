//! Operational counters and retrieval-quality helpers.
//!
//! - [`EngineMetrics`]: per-engine atomic counters, Prometheus-exportable
//! - [`lock_safety_snapshot`]: process-wide lock diagnostics
//! - [`recall_at_k`]: compare approximate results against exact ones

use serde::Serialize;
use std::collections::HashSet;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

pub use crate::safety_counters::{lock_safety_snapshot, LockSafetySnapshot};

/// Per-engine operation counters.
///
/// Counters are advisory and use relaxed ordering.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    inserts_total: AtomicU64,
    deletes_total: AtomicU64,
    queries_total: AtomicU64,
    query_errors: AtomicU64,
    multi_probe_total: AtomicU64,
    candidates_evaluated: AtomicU64,
    compactions_total: AtomicU64,
    rows_reclaimed: AtomicU64,
}

impl EngineMetrics {
    /// Creates a zeroed counter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_insert(&self) {
        self.inserts_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delete(&self) {
        self.deletes_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_query(&self, candidates: usize) {
        self.queries_total.fetch_add(1, Ordering::Relaxed);
        self.candidates_evaluated
            .fetch_add(candidates as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_query_error(&self) {
        self.queries_total.fetch_add(1, Ordering::Relaxed);
        self.query_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_multi_probe(&self) {
        self.multi_probe_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_compaction(&self, reclaimed: usize) {
        self.compactions_total.fetch_add(1, Ordering::Relaxed);
        self.rows_reclaimed
            .fetch_add(reclaimed as u64, Ordering::Relaxed);
    }

    /// Returns a point-in-time copy of every counter.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            inserts_total: self.inserts_total.load(Ordering::Relaxed),
            deletes_total: self.deletes_total.load(Ordering::Relaxed),
            queries_total: self.queries_total.load(Ordering::Relaxed),
            query_errors: self.query_errors.load(Ordering::Relaxed),
            multi_probe_total: self.multi_probe_total.load(Ordering::Relaxed),
            candidates_evaluated: self.candidates_evaluated.load(Ordering::Relaxed),
            compactions_total: self.compactions_total.load(Ordering::Relaxed),
            rows_reclaimed: self.rows_reclaimed.load(Ordering::Relaxed),
        }
    }

    /// Exports the counters in Prometheus text format.
    #[must_use]
    pub fn export_prometheus(&self) -> String {
        use std::fmt::Write;

        let s = self.snapshot();
        let success = s.queries_total.saturating_sub(s.query_errors);
        let mut output = String::new();

        output.push_str("# HELP lsdembed_queries_total Total number of queries executed\n");
        output.push_str("# TYPE lsdembed_queries_total counter\n");
        let _ = writeln!(output, "lsdembed_queries_total{{status=\"success\"}} {success}");
        let _ = writeln!(
            output,
            "lsdembed_queries_total{{status=\"error\"}} {}\n",
            s.query_errors
        );

        for (name, help, value) in [
            ("inserts_total", "Successful inserts", s.inserts_total),
            ("deletes_total", "Successful deletes", s.deletes_total),
            (
                "multi_probe_total",
                "Queries that fell back to multi-probe",
                s.multi_probe_total,
            ),
            (
                "candidates_evaluated_total",
                "Candidates reranked by exact distance",
                s.candidates_evaluated,
            ),
            ("compactions_total", "Compactions that reclaimed rows", s.compactions_total),
            ("rows_reclaimed_total", "Rows physically reclaimed", s.rows_reclaimed),
        ] {
            let _ = writeln!(output, "# HELP lsdembed_{name} {help}");
            let _ = writeln!(output, "# TYPE lsdembed_{name} counter");
            let _ = writeln!(output, "lsdembed_{name} {value}\n");
        }

        output
    }
}

/// Point-in-time copy of [`EngineMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Successful inserts.
    pub inserts_total: u64,
    /// Successful deletes.
    pub deletes_total: u64,
    /// Queries, including failed ones.
    pub queries_total: u64,
    /// Queries that returned an error.
    pub query_errors: u64,
    /// Queries that fell back to multi-probe.
    pub multi_probe_total: u64,
    /// Candidates reranked by exact distance.
    pub candidates_evaluated: u64,
    /// Compactions that reclaimed at least one row.
    pub compactions_total: u64,
    /// Rows physically reclaimed.
    pub rows_reclaimed: u64,
}

/// Calculates Recall@k: the share of `ground_truth` found in `results`.
///
/// Returns 0.0 if `ground_truth` is empty.
#[must_use]
pub fn recall_at_k<T: Eq + Hash>(ground_truth: &[T], results: &[T]) -> f64 {
    if ground_truth.is_empty() {
        return 0.0;
    }

    let truth_set: HashSet<&T> = ground_truth.iter().collect();
    let found = results.iter().filter(|id| truth_set.contains(id)).count();

    #[allow(clippy::cast_precision_loss)]
    let recall = found as f64 / ground_truth.len() as f64;
    recall
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = EngineMetrics::new();
        metrics.record_insert();
        metrics.record_insert();
        metrics.record_delete();
        metrics.record_query(7);
        metrics.record_query_error();
        metrics.record_compaction(3);

        let s = metrics.snapshot();
        assert_eq!(s.inserts_total, 2);
        assert_eq!(s.deletes_total, 1);
        assert_eq!(s.queries_total, 2);
        assert_eq!(s.query_errors, 1);
        assert_eq!(s.candidates_evaluated, 7);
        assert_eq!(s.compactions_total, 1);
        assert_eq!(s.rows_reclaimed, 3);
    }

    #[test]
    fn test_prometheus_export() {
        let metrics = EngineMetrics::new();
        metrics.record_query(1);
        metrics.record_query_error();
        let text = metrics.export_prometheus();
        assert!(text.contains("lsdembed_queries_total{status=\"success\"} 1"));
        assert!(text.contains("lsdembed_queries_total{status=\"error\"} 1"));
        assert!(text.contains("# TYPE lsdembed_inserts_total counter"));
    }

    #[test]
    fn test_recall_at_k() {
        assert!((recall_at_k(&[1, 2, 3, 4], &[1, 3, 9]) - 0.5).abs() < f64::EPSILON);
        assert!((recall_at_k(&["a"], &["a"]) - 1.0).abs() < f64::EPSILON);
        assert!(recall_at_k::<u8>(&[], &[1]).abs() < f64::EPSILON);
    }
}
