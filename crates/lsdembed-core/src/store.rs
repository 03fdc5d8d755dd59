//! Append-structured storage of raw embeddings.
//!
//! Rows are addressed by a dense [`Slot`] assigned in insertion order.
//! Vector data lives in one flat `Vec<f32>` (slot-major), so a row is a
//! `dimension`-long window into it.
//!
//! # Row states
//!
//! ```text
//! reserve ──► pending ──commit──► live ──remove──► tombstoned ──compact──► (gone)
//! ```
//!
//! Only live rows are observable through [`VectorStore::get`] and
//! [`VectorStore::is_visible`]. A tombstoned id stays reserved until
//! [`VectorStore::compact`] physically drops it, so re-inserting it before
//! compaction fails with `DuplicateId`.

use crate::error::{check_vector, Error, Result};
use crate::point::VectorId;
use roaring::RoaringBitmap;
use rustc_hash::FxHashMap;

/// Dense row address inside a [`VectorStore`].
pub type Slot = u32;

/// Old-to-new slot mapping produced by a compaction.
///
/// Compaction preserves relative slot order, so any slot list that was
/// sorted stays sorted after remapping.
#[derive(Debug, Clone, Default)]
pub struct SlotRemap {
    mapping: Vec<Option<Slot>>,
}

impl SlotRemap {
    /// Returns the new slot for `old`, or `None` if the row was reclaimed.
    #[must_use]
    pub fn get(&self, old: Slot) -> Option<Slot> {
        self.mapping.get(old as usize).copied().flatten()
    }

    /// Number of slots that existed before compaction.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    /// Returns true if the mapping covers no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }
}

/// Outcome of [`VectorStore::compact`].
#[derive(Debug, Clone, Default)]
pub struct Compaction {
    /// Number of tombstoned rows physically removed.
    pub reclaimed: usize,
    /// Slot renumbering; `None` when nothing was reclaimed.
    pub remap: Option<SlotRemap>,
}

/// Slot-addressed embedding storage with tombstones.
#[derive(Debug, Clone)]
pub struct VectorStore<I> {
    dimension: usize,
    data: Vec<f32>,
    ids: Vec<I>,
    slots: FxHashMap<I, Slot>,
    tombstones: RoaringBitmap,
    pending: RoaringBitmap,
}

impl<I: VectorId> VectorStore<I> {
    /// Creates an empty store for vectors of `dimension` components.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
            ids: Vec::new(),
            slots: FxHashMap::default(),
            tombstones: RoaringBitmap::new(),
            pending: RoaringBitmap::new(),
        }
    }

    /// Returns the fixed dimensionality.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Appends a live row.
    pub fn put(&mut self, id: I, vector: &[f32]) -> Result<Slot> {
        let slot = self.reserve(id, vector)?;
        self.commit(slot);
        Ok(slot)
    }

    /// Appends a row in the pending state.
    ///
    /// The id is reserved immediately but the row stays invisible until
    /// [`commit`](Self::commit). Nothing is modified when an error is
    /// returned.
    pub fn reserve(&mut self, id: I, vector: &[f32]) -> Result<Slot> {
        check_vector(self.dimension, vector)?;
        if self.slots.contains_key(&id) {
            return Err(Error::duplicate(&id));
        }
        let slot = Slot::try_from(self.ids.len())
            .map_err(|_| Error::CapacityExceeded(self.ids.len()))?;

        self.data.extend_from_slice(vector);
        self.ids.push(id.clone());
        self.slots.insert(id, slot);
        self.pending.insert(slot);
        Ok(slot)
    }

    /// Makes a pending row visible.
    pub fn commit(&mut self, slot: Slot) {
        self.pending.remove(slot);
    }

    /// Returns the vector of a live id.
    pub fn get(&self, id: &I) -> Result<&[f32]> {
        match self.live_slot(id) {
            Some(slot) => Ok(self.vector(slot)),
            None => Err(Error::not_found(id)),
        }
    }

    /// Returns true if `id` is live.
    #[must_use]
    pub fn contains(&self, id: &I) -> bool {
        self.live_slot(id).is_some()
    }

    /// Tombstones a live id and returns the slot it occupied.
    ///
    /// Storage is not reclaimed until [`compact`](Self::compact).
    pub fn remove(&mut self, id: &I) -> Result<Slot> {
        let slot = self.live_slot(id).ok_or_else(|| Error::not_found(id))?;
        self.tombstones.insert(slot);
        Ok(slot)
    }

    /// Physically drops tombstoned rows and renumbers the survivors.
    ///
    /// Pending rows survive compaction and keep their pending state.
    pub fn compact(&mut self) -> Compaction {
        if self.tombstones.is_empty() {
            return Compaction::default();
        }

        let old_rows = self.ids.len();
        let reclaimed = self.tombstones.len() as usize;
        let mut mapping = Vec::with_capacity(old_rows);
        let mut data = Vec::with_capacity((old_rows - reclaimed) * self.dimension);
        let mut ids = Vec::with_capacity(old_rows - reclaimed);
        let mut pending = RoaringBitmap::new();
        let mut next: Slot = 0;

        for (old, id) in std::mem::take(&mut self.ids).into_iter().enumerate() {
            // old < ids.len() which already fit in a Slot when it was reserved.
            #[allow(clippy::cast_possible_truncation)]
            let old = old as Slot;
            if self.tombstones.contains(old) {
                self.slots.remove(&id);
                mapping.push(None);
                continue;
            }
            data.extend_from_slice(self.vector(old));
            if self.pending.contains(old) {
                pending.insert(next);
            }
            self.slots.insert(id.clone(), next);
            ids.push(id);
            mapping.push(Some(next));
            next += 1;
        }

        self.data = data;
        self.ids = ids;
        self.pending = pending;
        self.tombstones.clear();

        Compaction {
            reclaimed,
            remap: Some(SlotRemap { mapping }),
        }
    }

    /// Returns true if the row at `slot` is live.
    #[must_use]
    pub fn is_visible(&self, slot: Slot) -> bool {
        (slot as usize) < self.ids.len()
            && !self.pending.contains(slot)
            && !self.tombstones.contains(slot)
    }

    /// Returns the raw vector at `slot` regardless of its state.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of bounds.
    #[must_use]
    pub fn vector(&self, slot: Slot) -> &[f32] {
        let start = slot as usize * self.dimension;
        &self.data[start..start + self.dimension]
    }

    /// Returns the id stored at `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of bounds.
    #[must_use]
    pub fn id(&self, slot: Slot) -> &I {
        &self.ids[slot as usize]
    }

    /// Returns the slot of a live id.
    #[must_use]
    pub fn live_slot(&self, id: &I) -> Option<Slot> {
        self.slots
            .get(id)
            .copied()
            .filter(|&slot| self.is_visible(slot))
    }

    /// Iterates live rows in slot order.
    pub fn iter_live(&self) -> impl Iterator<Item = (Slot, &I, &[f32])> + '_ {
        (0..self.ids.len()).filter_map(move |i| {
            #[allow(clippy::cast_possible_truncation)]
            let slot = i as Slot;
            self.is_visible(slot)
                .then(|| (slot, &self.ids[i], self.vector(slot)))
        })
    }

    /// Number of live rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len() - self.tombstones.len() as usize - self.pending.len() as usize
    }

    /// Returns true if no row is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of tombstoned rows awaiting compaction.
    #[must_use]
    pub fn tombstoned_len(&self) -> usize {
        self.tombstones.len() as usize
    }

    /// Number of reserved rows not yet committed.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len() as usize
    }

    /// Number of physical rows, in any state.
    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.ids.len()
    }
}
