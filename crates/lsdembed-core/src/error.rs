//! Error types for lsdembed.
//!
//! All failures are local and synchronous: the engine never retries an
//! operation on the caller's behalf. An empty query result is a success
//! with zero rows and is never reported through this type.

use thiserror::Error;

/// Errors returned by engine operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Vector length differs from the configured dimensionality.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Configured dimensionality.
        expected: usize,
        /// Length of the rejected vector.
        actual: usize,
    },

    /// Insert of an id that is live or tombstoned but not yet compacted.
    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    /// The id is absent or has been deleted.
    #[error("Id not found: {0}")]
    NotFound(String),

    /// Construction parameters are out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Query result count must be at least 1.
    #[error("Invalid k: {0} (must be >= 1)")]
    InvalidK(usize),

    /// Vector contains NaN or infinite components.
    #[error("Invalid vector: {0}")]
    InvalidVector(String),

    /// A query observed its cancellation token.
    #[error("Query cancelled")]
    Cancelled,

    /// The store cannot address more rows.
    #[error("Capacity exceeded: {0} rows")]
    CapacityExceeded(usize),

    /// Configuration could not be extracted.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Snapshot encoding, decoding or format mismatch.
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn duplicate<I: std::fmt::Debug>(id: &I) -> Self {
        Self::DuplicateId(format!("{id:?}"))
    }

    pub(crate) fn not_found<I: std::fmt::Debug>(id: &I) -> Self {
        Self::NotFound(format!("{id:?}"))
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<postcard::Error> for Error {
    fn from(err: postcard::Error) -> Self {
        Self::Snapshot(err.to_string())
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Rejects vectors whose length differs from `expected` or that carry
/// non-finite components.
pub(crate) fn check_vector(expected: usize, vector: &[f32]) -> Result<()> {
    if vector.len() != expected {
        return Err(Error::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    if let Some(pos) = vector.iter().position(|x| !x.is_finite()) {
        return Err(Error::InvalidVector(format!(
            "component {pos} is not finite"
        )));
    }
    Ok(())
}
