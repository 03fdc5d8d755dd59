//! A single LSH hash table.

use crate::hashing::Signature;
use crate::store::{Slot, SlotRemap};
use rustc_hash::FxHashMap;

/// Signature → bucket map plus the reverse slot → signature map.
///
/// Buckets are kept sorted by slot. Slots are handed out in insertion
/// order, so bucket order is insertion order and stays deterministic even
/// when concurrent writers reach the table out of order.
#[derive(Debug, Default, Clone)]
pub struct HashTable {
    buckets: FxHashMap<Signature, Vec<Slot>>,
    assigned: FxHashMap<Slot, Signature>,
}

impl HashTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `slot` to the bucket of `signature`.
    ///
    /// Returns false if the slot was already present in this table.
    pub fn insert(&mut self, slot: Slot, signature: Signature) -> bool {
        if self.assigned.contains_key(&slot) {
            return false;
        }
        let bucket = self.buckets.entry(signature).or_default();
        match bucket.binary_search(&slot) {
            Ok(_) => return false,
            Err(pos) => bucket.insert(pos, slot),
        }
        self.assigned.insert(slot, signature);
        true
    }

    /// Removes `slot` using the reverse map.
    ///
    /// Returns the signature it was filed under, or `None` if absent.
    pub fn remove(&mut self, slot: Slot) -> Option<Signature> {
        let signature = self.assigned.remove(&slot)?;
        if let Some(bucket) = self.buckets.get_mut(&signature) {
            if let Ok(pos) = bucket.binary_search(&slot) {
                bucket.remove(pos);
            }
            if bucket.is_empty() {
                self.buckets.remove(&signature);
            }
        }
        Some(signature)
    }

    /// Returns the bucket for `signature`, in insertion order.
    #[must_use]
    pub fn bucket(&self, signature: Signature) -> &[Slot] {
        self.buckets.get(&signature).map_or(&[], Vec::as_slice)
    }

    /// Returns the signature `slot` is filed under.
    #[must_use]
    pub fn signature_of(&self, slot: Slot) -> Option<Signature> {
        self.assigned.get(&slot).copied()
    }

    /// Rewrites every slot through `remap`, dropping reclaimed ones.
    pub fn remap(&mut self, remap: &SlotRemap) {
        self.buckets.retain(|_, bucket| {
            bucket.retain_mut(|slot| match remap.get(*slot) {
                Some(new) => {
                    *slot = new;
                    true
                }
                None => false,
            });
            !bucket.is_empty()
        });
        self.assigned = self
            .assigned
            .drain()
            .filter_map(|(slot, sig)| remap.get(slot).map(|new| (new, sig)))
            .collect();
    }

    /// Number of non-empty buckets.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Size of the largest bucket.
    #[must_use]
    pub fn largest_bucket(&self) -> usize {
        self.buckets.values().map(Vec::len).max().unwrap_or(0)
    }

    /// Number of slots filed in this table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    /// Returns true if the table holds no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }
}
