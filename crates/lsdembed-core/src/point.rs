//! Identifier bound and query result type.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

/// Caller-assigned identifier for an embedding.
///
/// Ids are opaque to the engine: they are hashed for lookup and ordered
/// only to break distance ties deterministically. Implemented for every
/// type meeting the bounds (`u64`, `String`, `&'static str`, tuples...).
pub trait VectorId: Clone + Eq + Hash + Ord + Debug + Send + Sync + 'static {}

impl<T> VectorId for T where T: Clone + Eq + Hash + Ord + Debug + Send + Sync + 'static {}

/// A single query hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult<I> {
    /// Id of the matching embedding.
    pub id: I,
    /// Exact distance from the probe under the index metric.
    pub distance: f32,
}

impl<I> SearchResult<I> {
    /// Creates a new search result.
    #[must_use]
    pub const fn new(id: I, distance: f32) -> Self {
        Self { id, distance }
    }
}
