//! Snapshot persistence for engines.
//!
//! A snapshot holds the [`IndexConfig`] and every live `(id, vector)` in
//! slot order. Hyperplanes and buckets are not stored: the projection
//! family is a pure function of the config, so re-inserting the rows in
//! order rebuilds identical signatures and bucket order.
//!
//! # Format
//!
//! ```text
//! [Magic: "LSDE" 4 bytes]
//! [Version: 1 byte]
//! [Body: postcard(Snapshot)]
//! ```
//!
//! Tombstoned and pending rows are never written.

use crate::config::IndexConfig;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::point::VectorId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Snapshot file magic bytes.
pub const SNAPSHOT_MAGIC: &[u8; 4] = b"LSDE";

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u8 = 1;

const HEADER_LEN: usize = SNAPSHOT_MAGIC.len() + 1;

/// Point-in-time copy of an engine's live contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot<I> {
    /// Parameters needed to rebuild the projection family.
    pub config: IndexConfig,
    /// Live rows in slot order.
    pub rows: Vec<(I, Vec<f32>)>,
}

impl<I> Snapshot<I> {
    /// Number of rows captured.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if no row was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<I: Serialize> Snapshot<I> {
    /// Encodes the snapshot with its header.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(HEADER_LEN + self.rows.len() * 16);
        buf.extend_from_slice(SNAPSHOT_MAGIC);
        buf.push(SNAPSHOT_VERSION);
        postcard::to_io(self, &mut buf)?;
        Ok(buf)
    }

    /// Writes the snapshot to `path` via a temporary file and rename.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, &bytes)?;
        std::fs::rename(&temp_path, path)?;
        tracing::debug!(path = %path.display(), rows = self.rows.len(), "snapshot saved");
        Ok(())
    }
}

impl<I: DeserializeOwned> Snapshot<I> {
    /// Decodes a snapshot, checking magic and version first.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(Error::Snapshot("snapshot too small".to_string()));
        }
        if &data[..SNAPSHOT_MAGIC.len()] != SNAPSHOT_MAGIC {
            tracing::warn!("snapshot rejected: invalid magic");
            return Err(Error::Snapshot("invalid magic".to_string()));
        }
        let version = data[SNAPSHOT_MAGIC.len()];
        if version != SNAPSHOT_VERSION {
            tracing::warn!(version, "snapshot rejected: unsupported version");
            return Err(Error::Snapshot(format!(
                "unsupported version {version}, expected {SNAPSHOT_VERSION}"
            )));
        }

        let (snapshot, rest): (Self, &[u8]) = postcard::take_from_bytes(&data[HEADER_LEN..])?;
        if !rest.is_empty() {
            return Err(Error::Snapshot(format!(
                "{} trailing bytes after body",
                rest.len()
            )));
        }
        Ok(snapshot)
    }

    /// Reads a snapshot from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }
}

impl<I: VectorId> Engine<I> {
    /// Captures the config and every live row under one read view.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot<I> {
        let mut rows = Vec::with_capacity(self.len());
        self.for_each_live(|id, vector| rows.push((id.clone(), vector.to_vec())));
        Snapshot {
            config: self.config().clone(),
            rows,
        }
    }

    /// Rebuilds an engine by re-inserting every row in order.
    pub fn from_snapshot(snapshot: Snapshot<I>) -> Result<Self> {
        let engine = Self::new(snapshot.config)?;
        let restored = engine.insert_batch(snapshot.rows)?;
        tracing::info!(rows = restored, "engine restored from snapshot");
        Ok(engine)
    }
}
