//! Multi-table LSH index.
//!
//! `L` independent [`HashTable`]s, one per projection group. Two vectors
//! only need to collide in one table to become query candidates, so more
//! tables raise recall at the cost of candidate-set size and of insert
//! work proportional to `L`.
//!
//! Each table sits behind its own `RwLock`; writers touching different
//! tables never contend, and readers never block each other. Locks are
//! taken one table at a time in ascending order.

mod table;

pub use table::HashTable;

use crate::hashing::{HammingShell, Signature};
use crate::locking::{self, LockRank};
use crate::store::{Slot, SlotRemap};
use indexmap::IndexSet;
use parking_lot::RwLock;
use rustc_hash::FxBuildHasher;
use serde::Serialize;

/// Candidate slots in first-seen order, without duplicates.
pub type CandidateSet = IndexSet<Slot, FxBuildHasher>;

/// Per-table occupancy figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableStats {
    /// Non-empty buckets.
    pub bucket_count: usize,
    /// Size of the largest bucket.
    pub largest_bucket: usize,
    /// Slots filed in the table.
    pub slots: usize,
}

/// `L` hash tables keyed by signature.
#[derive(Debug)]
pub struct MultiTableIndex {
    tables: Vec<RwLock<HashTable>>,
    bits: usize,
}

impl MultiTableIndex {
    /// Creates an index of `num_tables` empty tables with `bits`-wide signatures.
    #[must_use]
    pub fn new(num_tables: usize, bits: usize) -> Self {
        Self {
            tables: (0..num_tables).map(|_| RwLock::new(HashTable::new())).collect(),
            bits,
        }
    }

    /// Number of tables.
    #[must_use]
    pub fn num_tables(&self) -> usize {
        self.tables.len()
    }

    /// Files `slot` under `signatures[t]` in every table `t`.
    ///
    /// # Panics
    ///
    /// Panics if `signatures.len()` differs from the table count.
    pub fn insert(&self, slot: Slot, signatures: &[Signature]) {
        assert_eq!(signatures.len(), self.tables.len(), "one signature per table");
        for (t, (table, &signature)) in self.tables.iter().zip(signatures).enumerate() {
            let inserted = locking::write(table, LockRank::Table(t)).insert(slot, signature);
            debug_assert!(inserted, "slot {slot} filed twice in table {t}");
        }
    }

    /// Removes `slot` from every table it is filed in.
    ///
    /// Uses the per-table reverse map, so the caller does not need the
    /// original signatures. Returns how many tables held the slot.
    pub fn remove(&self, slot: Slot) -> usize {
        let mut removed = 0;
        for (t, table) in self.tables.iter().enumerate() {
            if locking::write(table, LockRank::Table(t)).remove(slot).is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Union of the buckets matching `signatures`, table by table.
    #[must_use]
    pub fn candidates(&self, signatures: &[Signature]) -> CandidateSet {
        let mut out = CandidateSet::default();
        for (t, (table, &signature)) in self.tables.iter().zip(signatures).enumerate() {
            let table = locking::read(table, LockRank::Table(t));
            out.extend(table.bucket(signature).iter().copied());
        }
        out
    }

    /// Adds the buckets at exactly Hamming distance `radius` from each
    /// table's signature to `out`.
    ///
    /// Returns the number of non-empty buckets visited.
    pub fn probe(&self, signatures: &[Signature], radius: usize, out: &mut CandidateSet) -> usize {
        let mut visited = 0;
        for (t, (table, &signature)) in self.tables.iter().zip(signatures).enumerate() {
            let table = locking::read(table, LockRank::Table(t));
            for neighbour in HammingShell::new(signature, self.bits, radius) {
                let bucket = table.bucket(neighbour);
                if !bucket.is_empty() {
                    visited += 1;
                    out.extend(bucket.iter().copied());
                }
            }
        }
        visited
    }

    /// Returns the signatures `slot` is filed under, one per table.
    #[must_use]
    pub fn signatures_of(&self, slot: Slot) -> Option<Vec<Signature>> {
        self.tables
            .iter()
            .enumerate()
            .map(|(t, table)| locking::read(table, LockRank::Table(t)).signature_of(slot))
            .collect()
    }

    /// Rewrites every table through a compaction remap.
    pub fn remap(&self, remap: &SlotRemap) {
        for (t, table) in self.tables.iter().enumerate() {
            locking::write(table, LockRank::Table(t)).remap(remap);
        }
    }

    /// Per-table occupancy.
    #[must_use]
    pub fn stats(&self) -> Vec<TableStats> {
        self.tables
            .iter()
            .enumerate()
            .map(|(t, table)| {
                let table = locking::read(table, LockRank::Table(t));
                TableStats {
                    bucket_count: table.bucket_count(),
                    largest_bucket: table.largest_bucket(),
                    slots: table.len(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests;
