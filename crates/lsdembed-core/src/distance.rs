//! Exact distance kernels used to rerank LSH candidates.
//!
//! Both metrics return a *distance*: lower is closer, identical vectors
//! score `0.0`. Sums are accumulated in `f64`, so large finite components
//! cannot overflow the dot product or the norms.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Distance metric fixed per index instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// L2 distance.
    Euclidean,
    /// `1 - cos(a, b)`, in `[0, 2]`.
    ///
    /// A zero-norm vector scores `1.0` against any non-zero vector and
    /// `0.0` against another zero vector.
    #[default]
    Cosine,
}

impl DistanceMetric {
    /// Computes the distance between two vectors of equal length.
    #[inline]
    #[must_use]
    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len(), "distance on vectors of unequal length");
        match self {
            Self::Euclidean => euclidean_distance_scalar(a, b),
            Self::Cosine => cosine_distance_scalar(a, b),
        }
    }

    /// Returns the canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Euclidean => "euclidean",
            Self::Cosine => "cosine",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMetric {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "euclidean" | "l2" => Ok(Self::Euclidean),
            "cosine" => Ok(Self::Cosine),
            other => Err(crate::Error::InvalidConfiguration(format!(
                "unknown metric '{other}'"
            ))),
        }
    }
}

#[inline]
#[allow(clippy::cast_possible_truncation)]
fn euclidean_distance_scalar(a: &[f32], b: &[f32]) -> f32 {
    let sum: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| (f64::from(x) - f64::from(y)).powi(2))
        .sum();
    sum.sqrt() as f32
}

#[inline]
#[allow(clippy::cast_possible_truncation)]
fn cosine_distance_scalar(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;

    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    match (norm_a == 0.0, norm_b == 0.0) {
        (true, true) => 0.0,
        (true, false) | (false, true) => 1.0,
        (false, false) => {
            // Narrowed before subtracting so a self-match rounds to exactly 0.
            let cos = (dot / (norm_a.sqrt() * norm_b.sqrt())) as f32;
            (1.0 - cos).max(0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euclidean_known_distance() {
        let a = [0.0, 0.0, 0.0];
        let b = [3.0, 4.0, 0.0];
        let dist = DistanceMetric::Euclidean.distance(&a, &b);
        assert!((dist - 5.0).abs() < 1e-5, "3-4-5 triangle");
    }

    #[test]
    fn test_cosine_identical_vectors() {
        let v = [1.0, 2.0, 3.0];
        let dist = DistanceMetric::Cosine.distance(&v, &v);
        assert!(dist.abs() < 1e-5, "Identical vectors should have distance ~0");
    }

    #[test]
    fn test_cosine_orthogonal_and_opposite() {
        let a = [1.0, 0.0];
        let b = [0.0, 1.0];
        let c = [-1.0, 0.0];
        assert!((DistanceMetric::Cosine.distance(&a, &b) - 1.0).abs() < 1e-6);
        assert!((DistanceMetric::Cosine.distance(&a, &c) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_vector() {
        let zero = [0.0, 0.0, 0.0];
        let v = [1.0, 0.0, 0.0];
        assert!((DistanceMetric::Cosine.distance(&zero, &v) - 1.0).abs() < f32::EPSILON);
        assert!((DistanceMetric::Cosine.distance(&v, &zero) - 1.0).abs() < f32::EPSILON);
        assert_eq!(DistanceMetric::Cosine.distance(&zero, &zero), 0.0);
    }

    #[test]
    fn test_self_distance_is_exactly_zero() {
        let v = [0.3, -7.25, 1e-3, 42.0, -0.125];
        assert_eq!(DistanceMetric::Cosine.distance(&v, &v), 0.0);
        assert_eq!(DistanceMetric::Euclidean.distance(&v, &v), 0.0);
    }

    #[test]
    fn test_large_components_stay_finite() {
        let probe = [1e30, 1e30];
        let near = [1.0, 1.0];
        let far = [1e30, -1e30];

        let cos_near = DistanceMetric::Cosine.distance(&probe, &near);
        let cos_far = DistanceMetric::Cosine.distance(&probe, &far);
        assert!(cos_near.abs() < 1e-6, "parallel vectors, got {cos_near}");
        assert!((cos_far - 1.0).abs() < 1e-6, "orthogonal vectors, got {cos_far}");

        let l2 = DistanceMetric::Euclidean.distance(&probe, &far);
        assert!(l2.is_finite());
        assert!((l2 / 2e30 - 1.0).abs() < 1e-5);
        assert!(DistanceMetric::Euclidean.distance(&probe, &[1e30, 1e29]) < l2);
    }

    #[test]
    fn test_metric_parse_and_display() {
        assert_eq!(
            "Euclidean".parse::<DistanceMetric>().unwrap(),
            DistanceMetric::Euclidean
        );
        assert_eq!("l2".parse::<DistanceMetric>().unwrap(), DistanceMetric::Euclidean);
        assert_eq!(DistanceMetric::Cosine.to_string(), "cosine");
        assert!("manhattan".parse::<DistanceMetric>().is_err());
    }
}
