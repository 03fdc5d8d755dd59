//! Configuration for lsdembed engines.
//!
//! Values are layered with `figment`, later sources overriding earlier ones:
//!
//! 1. Built-in defaults
//! 2. An optional TOML file
//! 3. Environment variables prefixed `LSDEMBED_`, nested with `__`
//!    (for example `LSDEMBED_INDEX__NUM_TABLES=16`)
//!
//! ```toml
//! [index]
//! dimension = 768
//! num_tables = 8
//! hyperplanes_per_table = 12
//! seed = 42
//! metric = "cosine"
//! probe_radius = 1
//!
//! [maintenance]
//! auto_compact_ratio = 0.25
//!
//! [logging]
//! level = "info"
//! ```

use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use crate::hashing::MAX_HYPERPLANES_PER_TABLE;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "LSDEMBED_";

/// Largest supported multi-probe radius.
pub const MAX_PROBE_RADIUS: usize = 3;

/// Parameters fixed for the lifetime of one index.
///
/// Together they fully determine the projection family, so they are
/// also what a snapshot must carry to re-hash stored vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Embedding dimensionality.
    pub dimension: usize,
    /// Number of hash tables (`L`).
    pub num_tables: usize,
    /// Hyperplanes per table (`k`), at most 64.
    pub hyperplanes_per_table: usize,
    /// Seed for hyperplane generation.
    pub seed: u64,
    /// Exact metric used for reranking.
    pub metric: DistanceMetric,
    /// Largest Hamming distance explored when exact buckets yield fewer
    /// than `k` candidates. Zero disables multi-probe.
    pub probe_radius: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dimension: 384,
            num_tables: 8,
            hyperplanes_per_table: 12,
            seed: 42,
            metric: DistanceMetric::Cosine,
            probe_radius: 1,
        }
    }
}

impl IndexConfig {
    /// Creates a config with the default probe radius.
    #[must_use]
    pub fn new(
        dimension: usize,
        num_tables: usize,
        hyperplanes_per_table: usize,
        seed: u64,
        metric: DistanceMetric,
    ) -> Self {
        Self {
            dimension,
            num_tables,
            hyperplanes_per_table,
            seed,
            metric,
            ..Self::default()
        }
    }

    /// Sets the multi-probe radius.
    #[must_use]
    pub fn with_probe_radius(mut self, radius: usize) -> Self {
        self.probe_radius = radius;
        self
    }

    /// Checks every parameter range.
    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(Error::InvalidConfiguration(
                "dimension must be positive".to_string(),
            ));
        }
        if self.num_tables == 0 {
            return Err(Error::InvalidConfiguration(
                "num_tables must be positive".to_string(),
            ));
        }
        if self.hyperplanes_per_table == 0
            || self.hyperplanes_per_table > MAX_HYPERPLANES_PER_TABLE
        {
            return Err(Error::InvalidConfiguration(format!(
                "hyperplanes_per_table must be in 1..={MAX_HYPERPLANES_PER_TABLE}, got {}",
                self.hyperplanes_per_table
            )));
        }
        if self.probe_radius > MAX_PROBE_RADIUS {
            return Err(Error::InvalidConfiguration(format!(
                "probe_radius must be at most {MAX_PROBE_RADIUS}, got {}",
                self.probe_radius
            )));
        }
        Ok(())
    }
}

/// Background-free maintenance policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    /// Compact once tombstoned rows reach this share of all rows.
    /// `None` leaves compaction entirely to the caller.
    pub auto_compact_ratio: Option<f32>,
}

impl MaintenanceConfig {
    /// Checks the ratio lies in `(0, 1]`.
    pub fn validate(&self) -> Result<()> {
        match self.auto_compact_ratio {
            Some(r) if !(r > 0.0 && r <= 1.0) => Err(Error::InvalidConfiguration(format!(
                "auto_compact_ratio must be in (0, 1], got {r}"
            ))),
            _ => Ok(()),
        }
    }
}

/// Logging settings for binaries embedding the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Index parameters.
    pub index: IndexConfig,
    /// Maintenance policy.
    pub maintenance: MaintenanceConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Builds the layered figment: defaults, then `path` if given, then env.
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Loads and validates the configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::from_figment(&Self::figment(path))
    }

    /// Extracts and validates a configuration from any figment.
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<()> {
        self.index.validate()?;
        self.maintenance.validate()
    }
}
