//! Fixed-width Bloom filter value type.
//!
//! A [`Filter`] is the unit every index stores and queries. It is built
//! elsewhere (by whatever hashes the source fields into bit positions) and
//! handed to an index already populated; the index only ever needs four
//! primitives:
//!
//! | Operation | Meaning |
//! |-----------|---------|
//! | [`contains`](Filter::contains) | `self ⊇ other`, word by word `(s & o) == o` |
//! | [`merge`](Filter::merge) | in-place OR |
//! | [`cardinality`](Filter::cardinality) | popcount (Hamming weight) |
//! | [`hamming_distance`](Filter::hamming_distance) | popcount of XOR |
//!
//! All binary operations require equal [`Shape`]s and panic otherwise.
//!
//! # Memory Layout
//!
//! ```text
//! words[0]: [bit 0][bit 1]...[bit 63]
//! words[1]: [bit 64]...[bit 127]
//! ...
//! words[n-1]: valid bits up to shape.bits(), remaining bits always zero
//! ```
//!
//! # Examples
//!
//! ```
//! use bloomindex::core::{Filter, Shape};
//!
//! let shape = Shape::new(20, 3).unwrap();
//! let a = Filter::from_indices(shape, [0, 1, 4]).unwrap();
//! let b = Filter::from_indices(shape, [0, 1, 2, 4]).unwrap();
//!
//! assert!(b.contains(&a));
//! assert!(!a.contains(&b));
//! assert_eq!(a.cardinality(), 3);
//! assert_eq!(a.hamming_distance(&b), 1);
//! ```

use crate::core::Shape;
use crate::error::{BloomIndexError, Result};
use crate::util::bitops::{self, bit_offset, tail_mask, word_index};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of bits below the leading one folded into [`Filter::approx_log`] by default.
pub const DEFAULT_LOG_DEPTH: usize = 25;

/// An immutable-once-stored bit vector of a given [`Shape`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Filter {
    shape: Shape,
    words: Box<[u64]>,
}

impl Filter {
    /// Create an empty filter (no bits set).
    #[must_use]
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            words: vec![0u64; shape.num_words()].into_boxed_slice(),
        }
    }

    /// Build a filter from raw little-endian words.
    ///
    /// # Errors
    ///
    /// - [`BloomIndexError::WordCountMismatch`] if `words.len()` differs from
    ///   [`Shape::num_words`]
    /// - [`BloomIndexError::IndexOutOfBounds`] if a bit at or beyond
    ///   `shape.bits()` is set
    ///
    /// # Examples
    ///
    /// ```
    /// use bloomindex::core::{Filter, Shape};
    ///
    /// let shape = Shape::new(20, 3).unwrap();
    /// let f = Filter::from_words(shape, vec![0b10011]).unwrap();
    /// assert_eq!(f.cardinality(), 3);
    ///
    /// assert!(Filter::from_words(shape, vec![1 << 20]).is_err());
    /// ```
    pub fn from_words(shape: Shape, words: Vec<u64>) -> Result<Self> {
        let expected = shape.num_words();
        if words.len() != expected {
            return Err(BloomIndexError::word_count_mismatch(expected, words.len()));
        }

        let bits = shape.bits() as usize;
        if let Some(&last) = words.last() {
            let stray = last & !tail_mask(bits);
            if stray != 0 {
                let top = (expected - 1) * bitops::WORD_BITS
                    + (bitops::WORD_BITS - 1 - stray.leading_zeros() as usize);
                return Err(BloomIndexError::index_out_of_bounds(top, bits));
            }
        }

        Ok(Self {
            shape,
            words: words.into_boxed_slice(),
        })
    }

    /// Build a filter with the given bit positions set.
    ///
    /// # Errors
    ///
    /// [`BloomIndexError::IndexOutOfBounds`] for any index `>= shape.bits()`.
    pub fn from_indices<I>(shape: Shape, indices: I) -> Result<Self>
    where
        I: IntoIterator<Item = u32>,
    {
        let mut filter = Self::new(shape);
        for index in indices {
            if index >= shape.bits() {
                return Err(BloomIndexError::index_out_of_bounds(
                    index as usize,
                    shape.bits() as usize,
                ));
            }
            filter.set(index);
        }
        Ok(filter)
    }

    /// Shape of this filter.
    #[must_use]
    #[inline]
    pub const fn shape(&self) -> Shape {
        self.shape
    }

    /// Backing words.
    #[must_use]
    #[inline]
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Set bit `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= shape.bits()`.
    #[inline]
    pub fn set(&mut self, index: u32) {
        assert!(
            index < self.shape.bits(),
            "Filter index out of bounds: index={} bits={}",
            index,
            self.shape.bits()
        );
        let index = index as usize;
        self.words[word_index(index)] |= 1u64 << bit_offset(index);
    }

    /// Read bit `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= shape.bits()`.
    #[must_use]
    #[inline]
    pub fn get(&self, index: u32) -> bool {
        assert!(
            index < self.shape.bits(),
            "Filter index out of bounds: index={} bits={}",
            index,
            self.shape.bits()
        );
        let index = index as usize;
        self.words[word_index(index)] & (1u64 << bit_offset(index)) != 0
    }

    /// `true` iff every bit set in `other` is set in `self`.
    ///
    /// # Panics
    ///
    /// Panics on shape mismatch.
    #[must_use]
    #[inline]
    #[track_caller]
    pub fn contains(&self, other: &Filter) -> bool {
        self.shape.assert_same(&other.shape);
        bitops::is_superset(&self.words, &other.words)
    }

    /// OR `other` into `self`.
    ///
    /// # Panics
    ///
    /// Panics on shape mismatch.
    #[track_caller]
    pub fn merge(&mut self, other: &Filter) {
        self.shape.assert_same(&other.shape);
        bitops::or_assign(&mut self.words, &other.words);
    }

    /// Number of set bits (the filter's Hamming weight).
    #[must_use]
    #[inline]
    pub fn cardinality(&self) -> usize {
        bitops::count_ones_slice(&self.words)
    }

    /// Number of bit positions where `self` and `other` differ.
    ///
    /// # Panics
    ///
    /// Panics on shape mismatch.
    #[must_use]
    #[inline]
    #[track_caller]
    pub fn hamming_distance(&self, other: &Filter) -> usize {
        self.shape.assert_same(&other.shape);
        bitops::hamming_distance(&self.words, &other.words)
    }

    /// `true` if no bit is set.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Index of the most significant set bit.
    #[must_use]
    #[inline]
    pub fn highest_bit(&self) -> Option<usize> {
        bitops::highest_set_bit(&self.words)
    }

    /// Approximate base-2 logarithm of the filter read as an unsigned integer.
    ///
    /// The integer part is the position of the highest set bit; each of the
    /// next `depth` set bits below it contributes `2^(bit - highest)`. An empty
    /// filter yields `0.0`. Only used as an ordering key.
    ///
    /// # Examples
    ///
    /// ```
    /// use bloomindex::core::{Filter, Shape};
    ///
    /// let shape = Shape::new(64, 1).unwrap();
    /// let f = Filter::from_indices(shape, [10, 9]).unwrap();
    /// assert_eq!(f.approx_log(0), 10.0);
    /// assert_eq!(f.approx_log(1), 10.5);
    /// ```
    #[must_use]
    pub fn approx_log(&self, depth: usize) -> f64 {
        let mut bits = bitops::set_bits_descending(&self.words);
        let Some(top) = bits.next() else {
            return 0.0;
        };

        let mut result = top as f64;
        for bit in bits.take(depth) {
            result += 2f64.powi(bit as i32 - top as i32);
        }
        result
    }

    /// Extract `width` bits starting at bit `offset` as an integer.
    ///
    /// `width` must divide 64 so a chunk never straddles two words. Bits past
    /// the end of the filter read as zero.
    #[must_use]
    #[inline]
    pub fn chunk(&self, offset: usize, width: u32) -> usize {
        debug_assert!(width > 0 && bitops::WORD_BITS % width as usize == 0);
        let word = match self.words.get(word_index(offset)) {
            Some(&w) => w,
            None => return 0,
        };
        let mask = (1u64 << width) - 1;
        ((word >> bit_offset(offset)) & mask) as usize
    }

    /// Iterate set bit positions in ascending order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        bitops::set_bits_ascending(&self.words)
    }
}
