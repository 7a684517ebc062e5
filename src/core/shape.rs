//! Filter shape: bit width plus hash function count.
//!
//! Every filter that takes part in one index must share a single [`Shape`].
//! Two filters with equal width but different hash counts are still
//! incompatible: their bit densities mean different things.

use crate::core::params;
use crate::error::{BloomIndexError, Result};
use crate::util::bitops::bits_to_words;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Width and hash-function count of a Bloom filter.
///
/// # Examples
///
/// ```
/// use bloomindex::core::Shape;
///
/// let shape = Shape::new(1000, 7).unwrap();
/// assert_eq!(shape.bits(), 1000);
/// assert_eq!(shape.hashes(), 7);
/// assert_eq!(shape.num_words(), 16);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Shape {
    bits: u32,
    hashes: u32,
}

impl Shape {
    /// Create a shape.
    ///
    /// # Errors
    ///
    /// Returns [`BloomIndexError::InvalidShape`] if either value is zero.
    pub fn new(bits: u32, hashes: u32) -> Result<Self> {
        if bits == 0 || hashes == 0 {
            return Err(BloomIndexError::invalid_shape(bits, hashes));
        }
        Ok(Self { bits, hashes })
    }

    /// Optimal shape for `expected_items` entries at false positive rate `fp_rate`.
    ///
    /// # Errors
    ///
    /// Propagates parameter errors from [`params::optimal_bit_count`] and
    /// rejects widths that do not fit a `u32`.
    ///
    /// # Examples
    ///
    /// ```
    /// use bloomindex::core::Shape;
    ///
    /// let shape = Shape::from_population(1000, 0.01).unwrap();
    /// assert_eq!(shape.hashes(), 7);
    /// assert!(shape.bits() >= 9585);
    /// ```
    pub fn from_population(expected_items: usize, fp_rate: f64) -> Result<Self> {
        let (bits, hashes) = params::calculate_filter_params(expected_items, fp_rate)?;
        let bits = u32::try_from(bits).map_err(|_| {
            BloomIndexError::invalid_parameters(format!(
                "{} bits does not fit a 32-bit shape width",
                bits
            ))
        })?;
        Self::new(bits, hashes as u32)
    }

    /// Bit width.
    #[must_use]
    #[inline]
    pub const fn bits(&self) -> u32 {
        self.bits
    }

    /// Number of hash functions used to build filters of this shape.
    #[must_use]
    #[inline]
    pub const fn hashes(&self) -> u32 {
        self.hashes
    }

    /// Number of 64-bit words backing a filter of this shape.
    #[must_use]
    #[inline]
    pub const fn num_words(&self) -> usize {
        bits_to_words(self.bits as usize)
    }

    /// Estimate how many items were merged into a filter with `cardinality` set bits.
    ///
    /// Uses `n ≈ -(m/k) · ln(1 - c/m)`. Returns `f64::INFINITY` for a
    /// saturated filter.
    #[must_use]
    pub fn estimate_items(&self, cardinality: usize) -> f64 {
        let m = f64::from(self.bits);
        let k = f64::from(self.hashes);
        let c = cardinality as f64;
        if c >= m {
            return f64::INFINITY;
        }
        -(m / k) * (1.0 - c / m).ln()
    }

    /// Expected false positive rate once `items` have been merged into one filter.
    #[must_use]
    pub fn false_positive_rate(&self, items: usize) -> f64 {
        params::expected_fp_rate(self.bits as usize, items, self.hashes as usize)
            .unwrap_or(1.0)
    }

    /// Panic unless `other` equals `self`.
    ///
    /// Shape mismatch between filters sharing an index is a programming
    /// error, so it fails fast rather than returning a recoverable error.
    #[inline]
    #[track_caller]
    pub fn assert_same(&self, other: &Shape) {
        assert!(
            self == other,
            "Shape mismatch: expected {}, got {}",
            self,
            other
        );
    }

    /// Return `Err(ShapeMismatch)` unless `other` equals `self`.
    ///
    /// # Errors
    ///
    /// [`BloomIndexError::ShapeMismatch`] when the shapes differ.
    pub fn check_same(&self, other: &Shape) -> Result<()> {
        if self != other {
            return Err(BloomIndexError::shape_mismatch(*self, *other));
        }
        Ok(())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shape(m={}, k={})", self.bits, self.hashes)
    }
}
