//! Random-hyperplane projection family.

use super::{Signature, Signatures, MAX_HYPERPLANES_PER_TABLE};
use crate::error::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

/// One unit-Gaussian sample.
fn standard_normal(rng: &mut StdRng) -> f32 {
    let u1 = rng.gen::<f32>().clamp(f32::MIN_POSITIVE, 1.0);
    let u2 = rng.gen::<f32>();
    (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}

/// `L` groups of `k` random hyperplanes, fixed at construction.
///
/// # Coefficient generation
///
/// A `StdRng` is seeded once with `seed` and every coefficient is drawn
/// from a unit Gaussian in this order:
///
/// ```text
/// for table in 0..L { for plane in 0..k { for coord in 0..dimension { draw } } }
/// ```
///
/// Each draw consumes two uniform `f32`s and keeps the cosine branch of
/// the Box-Muller transform. The first uniform is clamped to
/// `f32::MIN_POSITIVE` to keep the logarithm finite, which caps
/// `|coefficient|` near 13.2 and slightly thins the extreme tail. Only
/// hyperplane direction matters for a sign bit, so this has no
/// measurable effect on bucketing.
///
/// Two families built from the same `(dimension, L, k, seed)` are
/// therefore identical, which is what makes persisted ids re-hashable.
#[derive(Debug, Clone)]
pub struct ProjectionFamily {
    dimension: usize,
    num_tables: usize,
    hyperplanes_per_table: usize,
    seed: u64,
    /// Table-major, then hyperplane, then coordinate.
    coefficients: Vec<f32>,
}

impl ProjectionFamily {
    /// Draws a new family.
    pub fn new(
        dimension: usize,
        num_tables: usize,
        hyperplanes_per_table: usize,
        seed: u64,
    ) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::InvalidConfiguration(
                "dimension must be positive".to_string(),
            ));
        }
        if num_tables == 0 {
            return Err(Error::InvalidConfiguration(
                "num_tables must be positive".to_string(),
            ));
        }
        if hyperplanes_per_table == 0 || hyperplanes_per_table > MAX_HYPERPLANES_PER_TABLE {
            return Err(Error::InvalidConfiguration(format!(
                "hyperplanes_per_table must be in 1..={MAX_HYPERPLANES_PER_TABLE}, got {hyperplanes_per_table}"
            )));
        }
        let total = dimension
            .checked_mul(num_tables)
            .and_then(|n| n.checked_mul(hyperplanes_per_table))
            .ok_or_else(|| {
                Error::InvalidConfiguration("projection family size overflows usize".to_string())
            })?;

        let mut rng = StdRng::seed_from_u64(seed);
        let coefficients: Vec<f32> = (0..total).map(|_| standard_normal(&mut rng)).collect();

        Ok(Self {
            dimension,
            num_tables,
            hyperplanes_per_table,
            seed,
            coefficients,
        })
    }

    /// Computes the signature of `vector` in table `table`.
    ///
    /// Bit `j` is set when the dot product with hyperplane `j` is `>= 0`.
    ///
    /// # Panics
    ///
    /// Panics if `table >= num_tables()`. Callers validate `vector` length.
    #[must_use]
    pub fn signature(&self, vector: &[f32], table: usize) -> Signature {
        debug_assert_eq!(vector.len(), self.dimension);
        assert!(table < self.num_tables, "table {table} out of range");

        let group_len = self.hyperplanes_per_table * self.dimension;
        let group = &self.coefficients[table * group_len..(table + 1) * group_len];

        group
            .chunks_exact(self.dimension)
            .enumerate()
            .fold(0, |sig, (bit, plane)| {
                let dot: f32 = plane.iter().zip(vector).map(|(h, x)| h * x).sum();
                if dot >= 0.0 {
                    sig | (1 << bit)
                } else {
                    sig
                }
            })
    }

    /// Computes one signature per table, in table order.
    #[must_use]
    pub fn signatures(&self, vector: &[f32]) -> Signatures {
        (0..self.num_tables)
            .map(|table| self.signature(vector, table))
            .collect()
    }

    /// Vector dimensionality.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of tables (`L`).
    #[must_use]
    pub fn num_tables(&self) -> usize {
        self.num_tables
    }

    /// Hyperplanes per table (`k`), i.e. signature width in bits.
    #[must_use]
    pub fn hyperplanes_per_table(&self) -> usize {
        self.hyperplanes_per_table
    }

    /// Seed the family was drawn from.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns hyperplane `plane` of table `table`.
    #[must_use]
    pub fn hyperplane(&self, table: usize, plane: usize) -> &[f32] {
        let start = (table * self.hyperplanes_per_table + plane) * self.dimension;
        &self.coefficients[start..start + self.dimension]
    }
}
