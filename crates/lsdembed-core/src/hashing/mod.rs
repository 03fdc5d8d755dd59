//! Locality-sensitive hashing with random hyperplanes.
//!
//! # Module Organization
//!
//! - `projection`: the seeded [`ProjectionFamily`] and signature computation
//! - this module: signature types and Hamming-neighbour enumeration used by
//!   multi-probe lookups

mod projection;

pub use projection::ProjectionFamily;

use smallvec::SmallVec;

/// Packed sign bits for one table: bit `j` is hyperplane `j`.
pub type Signature = u64;

/// One signature per table, in table order.
pub type Signatures = SmallVec<[Signature; 8]>;

/// Widest signature that fits in a [`Signature`].
pub const MAX_HYPERPLANES_PER_TABLE: usize = Signature::BITS as usize;

/// Iterates every signature at exactly Hamming distance `radius` from a
/// base signature, over the low `bits` bits.
///
/// Flipped bit positions are enumerated as combinations in lexicographic
/// order, so the sequence is deterministic.
#[derive(Debug, Clone)]
pub struct HammingShell {
    base: Signature,
    bits: usize,
    positions: SmallVec<[usize; 4]>,
    done: bool,
}

impl HammingShell {
    /// Creates the shell of `base` at distance `radius`.
    ///
    /// A radius of zero yields only `base`; a radius above `bits` yields nothing.
    #[must_use]
    pub fn new(base: Signature, bits: usize, radius: usize) -> Self {
        Self {
            base,
            bits,
            positions: (0..radius).collect(),
            done: radius > bits,
        }
    }

    fn advance(&mut self) {
        let r = self.positions.len();
        // Rightmost position that can still move right.
        let Some(i) = (0..r)
            .rev()
            .find(|&i| self.positions[i] < self.bits - r + i)
        else {
            self.done = true;
            return;
        };
        self.positions[i] += 1;
        for j in i + 1..r {
            self.positions[j] = self.positions[j - 1] + 1;
        }
    }
}

impl Iterator for HammingShell {
    type Item = Signature;

    fn next(&mut self) -> Option<Signature> {
        if self.done {
            return None;
        }
        let mask = self
            .positions
            .iter()
            .fold(0 as Signature, |m, &p| m | (1 << p));
        let out = self.base ^ mask;
        if self.positions.is_empty() {
            self.done = true;
        } else {
            self.advance();
        }
        Some(out)
    }
}
