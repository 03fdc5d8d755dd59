//! Engine orchestration and concurrency protocol.
//!
//! The engine owns one [`VectorStore`] and one [`MultiTableIndex`] behind
//! explicit locks, plus an immutable [`QueryEngine`] (projection family and
//! metric) that needs no locking. Independent engines share nothing.
//!
//! # Locking
//!
//! Ranks follow `maintenance → store → table[0..L]` (see `locking`).
//!
//! | Operation | maintenance | store | tables |
//! |-----------|-------------|-------|--------|
//! | insert | read | write (reserve), later write (commit) | write, one at a time |
//! | delete | read | write (tombstone) | write, one at a time |
//! | query | read | read (rank stage) | read, one at a time |
//! | compact | **write** | write | write, ascending |
//!
//! Readers never block each other, and writers only meet on the store
//! lock for the short reserve/commit/tombstone steps or on a shared table.
//!
//! # Visibility
//!
//! An insert reserves its row as *pending*, files the slot in every table,
//! then commits. A delete tombstones first, then unfiles. The rank stage
//! drops pending and tombstoned slots, so a concurrent query sees a write
//! either not at all or completely, and any query that starts after a
//! write returned observes it.

use crate::config::{EngineConfig, IndexConfig, MaintenanceConfig};
use crate::distance::DistanceMetric;
use crate::error::{check_vector, Error, Result};
use crate::hashing::ProjectionFamily;
use crate::index::{MultiTableIndex, TableStats};
use crate::locking::{self, LockRank};
use crate::metrics::EngineMetrics;
use crate::point::{SearchResult, VectorId};
use crate::query::{CancelToken, QueryEngine};
use crate::store::{Slot, VectorStore};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

/// Lifecycle state of an engine.
///
/// There is no separate building phase: inserts are incremental, and an
/// engine stays `Built` once it has accepted its first insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineState {
    /// No insert has succeeded yet.
    Empty,
    /// At least one insert has succeeded.
    Built,
}

/// Row and table occupancy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Lifecycle state.
    pub state: EngineState,
    /// Live rows.
    pub live: usize,
    /// Tombstoned rows awaiting compaction.
    pub tombstoned: usize,
    /// Rows reserved by in-flight inserts.
    pub pending: usize,
    /// Per-table occupancy.
    pub tables: Vec<TableStats>,
}

/// Creates an engine from the five construction parameters.
///
/// Shorthand for [`Engine::new`] with the default probe radius.
pub fn create_index<I: VectorId>(
    dimension: usize,
    num_tables: usize,
    hyperplanes_per_table: usize,
    seed: u64,
    metric: DistanceMetric,
) -> Result<Engine<I>> {
    Engine::new(IndexConfig::new(
        dimension,
        num_tables,
        hyperplanes_per_table,
        seed,
        metric,
    ))
}

/// Approximate nearest-neighbour engine.
pub struct Engine<I: VectorId> {
    config: IndexConfig,
    maintenance_config: MaintenanceConfig,
    query: QueryEngine,
    /// Held for reading by every operation and for writing by compaction,
    /// which renumbers slots.
    maintenance: RwLock<()>,
    store: RwLock<VectorStore<I>>,
    index: MultiTableIndex,
    metrics: EngineMetrics,
    built: AtomicBool,
}

impl<I: VectorId> Engine<I> {
    /// Creates an engine; no engine is returned if `config` is invalid.
    pub fn new(config: IndexConfig) -> Result<Self> {
        Self::with_maintenance(config, MaintenanceConfig::default())
    }

    /// Creates an engine from a full configuration.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Self::with_maintenance(config.index.clone(), config.maintenance.clone())
    }

    /// Creates an engine with an explicit maintenance policy.
    pub fn with_maintenance(config: IndexConfig, maintenance: MaintenanceConfig) -> Result<Self> {
        config.validate()?;
        maintenance.validate()?;

        let family = ProjectionFamily::new(
            config.dimension,
            config.num_tables,
            config.hyperplanes_per_table,
            config.seed,
        )?;

        tracing::info!(
            dimension = config.dimension,
            num_tables = config.num_tables,
            hyperplanes_per_table = config.hyperplanes_per_table,
            seed = config.seed,
            metric = %config.metric,
            probe_radius = config.probe_radius,
            "LSH engine created"
        );

        Ok(Self {
            query: QueryEngine::new(family, config.metric, config.probe_radius),
            store: RwLock::new(VectorStore::new(config.dimension)),
            index: MultiTableIndex::new(config.num_tables, config.hyperplanes_per_table),
            maintenance: RwLock::new(()),
            metrics: EngineMetrics::new(),
            built: AtomicBool::new(false),
            maintenance_config: maintenance,
            config,
        })
    }

    /// Inserts `vector` under `id`.
    ///
    /// Signatures are computed once, before any lock is taken. On error
    /// neither the store nor the index has been touched.
    pub fn insert(&self, id: I, vector: &[f32]) -> Result<()> {
        check_vector(self.config.dimension, vector)?;
        let signatures = self.query.signatures(vector);

        let _gate = locking::read(&self.maintenance, LockRank::Maintenance);
        let slot = locking::write(&self.store, LockRank::Store).reserve(id, vector)?;
        self.index.insert(slot, &signatures);
        locking::write(&self.store, LockRank::Store).commit(slot);

        self.built.store(true, Ordering::Release);
        self.metrics.record_insert();
        tracing::debug!(slot, "insert committed");
        Ok(())
    }

    /// Inserts rows in order, stopping at the first failure.
    ///
    /// Returns how many rows were inserted; rows before a failure stay.
    pub fn insert_batch<V: AsRef<[f32]>>(
        &self,
        rows: impl IntoIterator<Item = (I, V)>,
    ) -> Result<usize> {
        let mut inserted = 0;
        for (id, vector) in rows {
            self.insert(id, vector.as_ref())?;
            inserted += 1;
        }
        Ok(inserted)
    }

    /// Deletes `id`.
    ///
    /// The row is tombstoned and removed from every bucket before this
    /// returns. The id stays reserved until the next compaction.
    pub fn delete(&self, id: &I) -> Result<()> {
        let _gate = locking::read(&self.maintenance, LockRank::Maintenance);
        let slot = locking::write(&self.store, LockRank::Store).remove(id)?;
        let unfiled = self.index.remove(slot);
        debug_assert_eq!(unfiled, self.config.num_tables, "slot {slot} missing from a table");

        self.metrics.record_delete();
        tracing::debug!(slot, "delete applied");
        Ok(())
    }

    /// Returns up to `k` nearest live ids, closest first.
    ///
    /// An empty result is a valid answer, not an error.
    pub fn query(&self, probe: &[f32], k: usize) -> Result<Vec<SearchResult<I>>> {
        self.observe_query(self.run_query(probe, k, None))
    }

    /// Like [`query`](Self::query), abandoning work once `cancel` fires.
    pub fn query_with_cancel(
        &self,
        probe: &[f32],
        k: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<SearchResult<I>>> {
        self.observe_query(self.run_query(probe, k, Some(cancel)))
    }

    fn observe_query(
        &self,
        result: Result<(Vec<SearchResult<I>>, usize)>,
    ) -> Result<Vec<SearchResult<I>>> {
        match result {
            Ok((results, candidates)) => {
                self.metrics.record_query(candidates);
                Ok(results)
            }
            Err(err) => {
                self.metrics.record_query_error();
                Err(err)
            }
        }
    }

    fn run_query(
        &self,
        probe: &[f32],
        k: usize,
        cancel: Option<&CancelToken>,
    ) -> Result<(Vec<SearchResult<I>>, usize)> {
        if k == 0 {
            return Err(Error::InvalidK(k));
        }
        check_vector(self.config.dimension, probe)?;
        let signatures = self.query.signatures(probe);

        let _gate = locking::read(&self.maintenance, LockRank::Maintenance);
        let gathered = self.query.gather(&self.index, &signatures, k);
        if gathered.probe_radius > 0 {
            self.metrics.record_multi_probe();
        }
        if let Some(token) = cancel {
            token.check()?;
        }

        let store = locking::read(&self.store, LockRank::Store);
        let candidates = gathered.candidates.len();
        let results = self.query.rank(
            probe,
            gathered.candidates.into_iter(),
            &store,
            k,
            cancel,
        )?;
        Ok((results, candidates))
    }

    /// Exact scan over every live row, ordered like [`query`](Self::query).
    pub fn brute_force(&self, probe: &[f32], k: usize) -> Result<Vec<SearchResult<I>>> {
        if k == 0 {
            return Err(Error::InvalidK(k));
        }
        check_vector(self.config.dimension, probe)?;

        let _gate = locking::read(&self.maintenance, LockRank::Maintenance);
        let store = locking::read(&self.store, LockRank::Store);
        let rows = Slot::try_from(store.total_rows())
            .map_err(|_| Error::CapacityExceeded(store.total_rows()))?;
        self.query.rank(probe, 0..rows, &store, k, None)
    }

    /// Returns a copy of the vector stored under a live `id`.
    pub fn get(&self, id: &I) -> Result<Vec<f32>> {
        let _gate = locking::read(&self.maintenance, LockRank::Maintenance);
        let store = locking::read(&self.store, LockRank::Store);
        store.get(id).map(<[f32]>::to_vec)
    }

    /// Returns true if `id` is live.
    #[must_use]
    pub fn contains(&self, id: &I) -> bool {
        let _gate = locking::read(&self.maintenance, LockRank::Maintenance);
        let store = locking::read(&self.store, LockRank::Store);
        store.contains(id)
    }

    /// Number of live rows.
    #[must_use]
    pub fn len(&self) -> usize {
        locking::read(&self.store, LockRank::Store).len()
    }

    /// Returns true if no row is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Physically removes tombstoned rows and returns how many were reclaimed.
    ///
    /// Runs exclusively: it waits for in-flight operations and blocks new
    /// ones until slots are renumbered in the store and every table. A
    /// second call with no deletes in between reclaims nothing.
    pub fn compact(&self) -> usize {
        let _gate = locking::write(&self.maintenance, LockRank::Maintenance);
        let mut store = locking::write(&self.store, LockRank::Store);
        let compaction = store.compact();

        if let Some(remap) = &compaction.remap {
            self.index.remap(remap);
            self.metrics.record_compaction(compaction.reclaimed);
            tracing::info!(
                reclaimed = compaction.reclaimed,
                live = store.len(),
                "compaction finished"
            );
        }
        compaction.reclaimed
    }

    /// Compacts if the tombstone share has reached the configured ratio.
    ///
    /// Returns `None` when no compaction ran.
    pub fn maybe_compact(&self) -> Option<usize> {
        let ratio = self.maintenance_config.auto_compact_ratio?;
        let (tombstoned, total) = {
            let store = locking::read(&self.store, LockRank::Store);
            (store.tombstoned_len(), store.total_rows())
        };
        if tombstoned == 0 {
            return None;
        }

        #[allow(clippy::cast_precision_loss)]
        let share = tombstoned as f32 / total as f32;
        if share >= ratio {
            tracing::debug!(tombstoned, total, ratio, "tombstone ratio reached");
            Some(self.compact())
        } else {
            None
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        if self.built.load(Ordering::Acquire) {
            EngineState::Built
        } else {
            EngineState::Empty
        }
    }

    /// Row and table occupancy.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        let _gate = locking::read(&self.maintenance, LockRank::Maintenance);
        let (live, tombstoned, pending) = {
            let store = locking::read(&self.store, LockRank::Store);
            (store.len(), store.tombstoned_len(), store.pending_len())
        };
        EngineStats {
            state: self.state(),
            live,
            tombstoned,
            pending,
            tables: self.index.stats(),
        }
    }

    /// Operation counters for this engine.
    #[must_use]
    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Index parameters.
    #[must_use]
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Maintenance policy.
    #[must_use]
    pub fn maintenance_config(&self) -> &MaintenanceConfig {
        &self.maintenance_config
    }

    /// The projection family used for every signature.
    #[must_use]
    pub fn family(&self) -> &ProjectionFamily {
        self.query.family()
    }

    /// Runs `f` over every live `(id, vector)` in slot order under one
    /// consistent read view.
    pub(crate) fn for_each_live(&self, mut f: impl FnMut(&I, &[f32])) {
        let _gate = locking::read(&self.maintenance, LockRank::Maintenance);
        let store = locking::read(&self.store, LockRank::Store);
        for (_, id, vector) in store.iter_live() {
            f(id, vector);
        }
    }
}

impl<I: VectorId> std::fmt::Debug for Engine<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
