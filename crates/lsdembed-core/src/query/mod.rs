//! Query pipeline.
//!
//! A query runs as three independent stages connected by plain data:
//!
//! 1. **signatures**: [`ProjectionFamily::signatures`] on the probe
//! 2. **gather**: [`gather_candidates`] unions matching buckets and, if
//!    that yields fewer than `k` slots, widens to Hamming neighbours
//! 3. **rank**: [`rank_candidates`] scores visible candidates exactly and
//!    keeps the best `k`
//!
//! Results are ordered by ascending distance, ties broken by id.

mod cancel;

pub use cancel::CancelToken;

use crate::distance::DistanceMetric;
use crate::error::Result;
use crate::hashing::{ProjectionFamily, Signature, Signatures};
use crate::index::{CandidateSet, MultiTableIndex};
use crate::point::{SearchResult, VectorId};
use crate::store::{Slot, VectorStore};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Output of the gather stage.
#[derive(Debug, Clone, Default)]
pub struct Gathered {
    /// Candidate slots, first-seen order, possibly including rows that are
    /// pending or tombstoned.
    pub candidates: CandidateSet,
    /// Candidates found in exact-match buckets alone.
    pub exact_matches: usize,
    /// Largest Hamming radius probed; 0 when exact buckets sufficed.
    pub probe_radius: usize,
}

/// Stateless query stages bound to one projection family and metric.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    family: ProjectionFamily,
    metric: DistanceMetric,
    probe_radius: usize,
}

impl QueryEngine {
    /// Creates a query engine.
    #[must_use]
    pub fn new(family: ProjectionFamily, metric: DistanceMetric, probe_radius: usize) -> Self {
        Self {
            family,
            metric,
            probe_radius,
        }
    }

    /// The projection family shared with the write path.
    #[must_use]
    pub fn family(&self) -> &ProjectionFamily {
        &self.family
    }

    /// The reranking metric.
    #[must_use]
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Stage 1: per-table signatures of `vector`.
    #[must_use]
    pub fn signatures(&self, vector: &[f32]) -> Signatures {
        self.family.signatures(vector)
    }

    /// Stage 2 with this engine's probe radius.
    #[must_use]
    pub fn gather(&self, index: &MultiTableIndex, signatures: &[Signature], k: usize) -> Gathered {
        gather_candidates(index, signatures, k, self.probe_radius)
    }

    /// Stage 3 with this engine's metric.
    pub fn rank<I: VectorId>(
        &self,
        probe: &[f32],
        candidates: impl IntoIterator<Item = Slot>,
        store: &VectorStore<I>,
        k: usize,
        cancel: Option<&CancelToken>,
    ) -> Result<Vec<SearchResult<I>>> {
        rank_candidates(probe, candidates, store, self.metric, k, cancel)
    }
}

/// Collects candidate slots for `signatures`.
///
/// Exact buckets are always read. While fewer than `k` candidates are
/// known, buckets at Hamming distance 1, 2, … up to `max_radius` are
/// added.
#[must_use]
pub fn gather_candidates(
    index: &MultiTableIndex,
    signatures: &[Signature],
    k: usize,
    max_radius: usize,
) -> Gathered {
    let mut candidates = index.candidates(signatures);
    let exact_matches = candidates.len();
    let mut probe_radius = 0;

    while candidates.len() < k && probe_radius < max_radius {
        probe_radius += 1;
        index.probe(signatures, probe_radius, &mut candidates);
    }

    if probe_radius > 0 {
        tracing::debug!(
            radius = probe_radius,
            exact = exact_matches,
            total = candidates.len(),
            k,
            "multi-probe fallback"
        );
    }

    Gathered {
        candidates,
        exact_matches,
        probe_radius,
    }
}

struct HeapEntry<'a, I> {
    distance: f32,
    id: &'a I,
}

impl<I: Ord> Ord for HeapEntry<'_, I> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.id.cmp(other.id))
    }
}

impl<I: Ord> PartialOrd for HeapEntry<'_, I> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<I: Ord> PartialEq for HeapEntry<'_, I> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<I: Ord> Eq for HeapEntry<'_, I> {}

/// Scores every visible candidate against `probe` and returns the best `k`.
///
/// Candidates that are pending, tombstoned or repeated are skipped. The
/// token, if any, is checked before each distance evaluation.
pub fn rank_candidates<I: VectorId>(
    probe: &[f32],
    candidates: impl IntoIterator<Item = Slot>,
    store: &VectorStore<I>,
    metric: DistanceMetric,
    k: usize,
    cancel: Option<&CancelToken>,
) -> Result<Vec<SearchResult<I>>> {
    if k == 0 {
        return Ok(Vec::new());
    }

    // Max-heap on (distance, id): the root is the current worst keeper.
    let mut heap: BinaryHeap<HeapEntry<'_, I>> = BinaryHeap::with_capacity(k + 1);
    let mut seen = CandidateSet::default();

    for slot in candidates {
        if let Some(token) = cancel {
            token.check()?;
        }
        if !store.is_visible(slot) || !seen.insert(slot) {
            continue;
        }

        let entry = HeapEntry {
            distance: metric.distance(probe, store.vector(slot)),
            id: store.id(slot),
        };
        if heap.len() < k {
            heap.push(entry);
        } else if heap.peek().is_some_and(|worst| entry < *worst) {
            heap.pop();
            heap.push(entry);
        }
    }

    Ok(heap
        .into_sorted_vec()
        .into_iter()
        .map(|e| SearchResult::new(e.id.clone(), e.distance))
        .collect())
}
