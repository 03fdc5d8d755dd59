//! # `lsdembed` Core
//!
//! In-memory approximate nearest-neighbour search over embeddings using
//! random-hyperplane locality-sensitive hashing.
//!
//! ## Features
//!
//! - **Seeded projection family**: `L` tables of `k` Gaussian hyperplanes,
//!   fully reproducible from `(dimension, L, k, seed)`
//! - **Multi-probe**: Hamming-neighbour buckets when exact buckets run short
//! - **Exact reranking**: Euclidean or cosine, ties broken by id
//! - **Concurrent**: queries never block each other; inserts and deletes
//!   are linearizable
//! - **Snapshots**: postcard-encoded live rows, rebuilt deterministically
//!
//! ## Quick Start
//!
//! ```rust
//! use lsdembed_core::{create_index, DistanceMetric};
//!
//! fn main() -> lsdembed_core::Result<()> {
//!     let engine = create_index(4, 2, 3, 42, DistanceMetric::Euclidean)?;
//!
//!     engine.insert("a", &[1.0, 0.0, 0.0, 0.0])?;
//!     engine.insert("b", &[0.0, 1.0, 0.0, 0.0])?;
//!     engine.insert("c", &[0.99, 0.01, 0.0, 0.0])?;
//!
//!     let results = engine.query(&[1.0, 0.0, 0.0, 0.0], 2)?;
//!     assert_eq!(results[0].id, "a");
//!
//!     engine.delete(&"b")?;
//!     assert_eq!(engine.compact(), 1);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
// Clippy lints configured in workspace Cargo.toml [workspace.lints.clippy]
#![cfg_attr(
    test,
    allow(
        clippy::float_cmp,
        clippy::cast_precision_loss,
        clippy::uninlined_format_args
    )
)]

pub mod config;
pub mod distance;
pub mod engine;
pub mod error;
pub mod hashing;
pub mod index;
mod locking;
pub mod metrics;
pub mod point;
pub mod query;
mod safety_counters;
pub mod snapshot;
pub mod store;

pub use config::{EngineConfig, IndexConfig, LoggingConfig, MaintenanceConfig};
pub use distance::DistanceMetric;
pub use engine::{create_index, Engine, EngineState, EngineStats};
pub use error::{Error, Result};
pub use hashing::{ProjectionFamily, Signature};
pub use index::TableStats;
pub use metrics::{lock_safety_snapshot, recall_at_k, EngineMetrics, MetricsSnapshot};
pub use point::{SearchResult, VectorId};
pub use query::CancelToken;
pub use snapshot::Snapshot;
