//! Error types for index construction and configuration.
//!
//! The hot index contract (`add`, `delete`, `count`, `search`) is infallible:
//! comparing filters of different shapes is a programming error and panics,
//! deleting an absent filter returns `false`, and querying an empty index
//! returns zero matches. Everything that validates caller input ahead of
//! time (shapes, raw filter words, builder parameters, strategy names)
//! reports a [`BloomIndexError`] instead.
//!
//! # Error Propagation
//!
//! ```
//! use bloomindex::{Result, BloomIndexError};
//! use bloomindex::core::Shape;
//!
//! fn shape_for(n: usize, fp: f64) -> Result<Shape> {
//!     let shape = Shape::from_population(n, fp)?;
//!     Ok(shape)
//! }
//! # assert!(shape_for(1000, 0.01).is_ok());
//! # assert!(shape_for(0, 0.01).is_err());
//! ```

#![allow(clippy::module_name_repetitions)]

use crate::core::Shape;
use std::fmt;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BloomIndexError>;

/// Errors reported while building shapes, filters and indexes.
///
/// `Clone` + `PartialEq` keep the type easy to assert on in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum BloomIndexError {
    /// A shape with zero bits or zero hash functions was requested.
    InvalidShape {
        /// Requested bit width.
        bits: u32,
        /// Requested hash function count.
        hashes: u32,
    },

    /// Generic parameter validation failure.
    InvalidParameters {
        /// Human-readable description of what's invalid.
        message: String,
    },

    /// False positive rate outside the open interval (0, 1).
    FalsePositiveRateOutOfBounds {
        /// The rejected rate.
        fp_rate: f64,
    },

    /// Expected item count of zero.
    InvalidItemCount {
        /// The rejected count.
        count: usize,
    },

    /// Bloofi order below the supported minimum.
    InvalidOrder {
        /// The rejected order.
        order: usize,
        /// Minimum supported order.
        min: usize,
    },

    /// Trie chunk width other than 4 or 8 bits.
    InvalidChunkWidth {
        /// The rejected width in bits.
        width: u32,
    },

    /// Raw word buffer does not match the shape's word count.
    WordCountMismatch {
        /// Words required by the shape.
        expected: usize,
        /// Words supplied.
        actual: usize,
    },

    /// A bit index at or beyond the shape's width.
    IndexOutOfBounds {
        /// The offending bit index.
        index: usize,
        /// Width of the filter in bits.
        length: usize,
    },

    /// Two filters (or a filter and an index) disagree on shape.
    ShapeMismatch {
        /// Shape the index or first filter was built with.
        expected: Shape,
        /// Shape that was supplied.
        actual: Shape,
    },

    /// Strategy name not recognised by [`IndexKind`](crate::index::IndexKind).
    UnknownIndexKind {
        /// The unrecognised name.
        name: String,
    },

    /// Serialization or deserialization failed.
    #[cfg(feature = "serde")]
    SerializationError {
        /// Description of what failed.
        message: String,
    },

    /// Internal invariant violated.
    ///
    /// Reported by consistency checks such as [`Bloofi::validate`](crate::index::Bloofi::validate).
    /// Seeing one indicates a bug in this crate.
    InternalError {
        /// Description of the invariant that was violated.
        message: String,
    },
}

impl fmt::Display for BloomIndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidShape { bits, hashes } => {
                write!(
                    f,
                    "Invalid shape: {} bits, {} hash functions. Both must be greater than 0.",
                    bits, hashes
                )
            }
            Self::InvalidParameters { message } => {
                write!(f, "Invalid index parameters: {}.", message)
            }
            Self::FalsePositiveRateOutOfBounds { fp_rate } => {
                write!(
                    f,
                    "False positive rate {} is out of bounds. Must be in range (0, 1).",
                    fp_rate
                )
            }
            Self::InvalidItemCount { count } => {
                write!(
                    f,
                    "Invalid item count: {}. Expected items must be greater than 0.",
                    count
                )
            }
            Self::InvalidOrder { order, min } => {
                write!(f, "Invalid Bloofi order {}. Must be at least {}.", order, min)
            }
            Self::InvalidChunkWidth { width } => {
                write!(f, "Invalid trie chunk width {} bits. Must be 4 or 8.", width)
            }
            Self::WordCountMismatch { expected, actual } => {
                write!(
                    f,
                    "Filter word count mismatch: shape requires {} words, got {}.",
                    expected, actual
                )
            }
            Self::IndexOutOfBounds { index, length } => {
                write!(
                    f,
                    "Bit index {} out of bounds for filter of {} bits",
                    index, length
                )
            }
            Self::ShapeMismatch { expected, actual } => {
                write!(
                    f,
                    "Shape mismatch: expected {}, got {}.",
                    expected, actual
                )
            }
            Self::UnknownIndexKind { name } => {
                write!(f, "Unknown index kind '{}'.", name)
            }
            #[cfg(feature = "serde")]
            Self::SerializationError { message } => {
                write!(f, "Serialization error: {}.", message)
            }
            Self::InternalError { message } => {
                write!(
                    f,
                    "Internal error (this is a bug in bloomindex): {}.",
                    message
                )
            }
        }
    }
}

impl std::error::Error for BloomIndexError {}

impl BloomIndexError {
    /// Create an `InvalidShape` error.
    #[must_use]
    pub fn invalid_shape(bits: u32, hashes: u32) -> Self {
        Self::InvalidShape { bits, hashes }
    }

    /// Create an `InvalidParameters` error with a formatted message.
    ///
    /// # Examples
    /// ```
    /// use bloomindex::BloomIndexError;
    ///
    /// let err = BloomIndexError::invalid_parameters(
    ///     format!("shard capacity {} is too small", 0)
    /// );
    /// assert!(err.to_string().contains("shard capacity"));
    /// ```
    #[must_use]
    pub fn invalid_parameters(message: impl Into<String>) -> Self {
        Self::InvalidParameters {
            message: message.into(),
        }
    }

    /// Create a `FalsePositiveRateOutOfBounds` error.
    #[must_use]
    pub fn fp_rate_out_of_bounds(fp_rate: f64) -> Self {
        Self::FalsePositiveRateOutOfBounds { fp_rate }
    }

    /// Create an `InvalidItemCount` error.
    #[must_use]
    pub fn invalid_item_count(count: usize) -> Self {
        Self::InvalidItemCount { count }
    }

    /// Create an `InvalidOrder` error.
    #[must_use]
    pub fn invalid_order(order: usize, min: usize) -> Self {
        Self::InvalidOrder { order, min }
    }

    /// Create an `InvalidChunkWidth` error.
    #[must_use]
    pub fn invalid_chunk_width(width: u32) -> Self {
        Self::InvalidChunkWidth { width }
    }

    /// Create a `WordCountMismatch` error.
    #[must_use]
    pub fn word_count_mismatch(expected: usize, actual: usize) -> Self {
        Self::WordCountMismatch { expected, actual }
    }

    /// Create an `IndexOutOfBounds` error.
    #[must_use]
    pub fn index_out_of_bounds(index: usize, length: usize) -> Self {
        Self::IndexOutOfBounds { index, length }
    }

    /// Create a `ShapeMismatch` error.
    #[must_use]
    pub fn shape_mismatch(expected: Shape, actual: Shape) -> Self {
        Self::ShapeMismatch { expected, actual }
    }

    /// Create an `UnknownIndexKind` error.
    #[must_use]
    pub fn unknown_index_kind(name: impl Into<String>) -> Self {
        Self::UnknownIndexKind { name: name.into() }
    }

    /// Create a `SerializationError`.
    #[cfg(feature = "serde")]
    #[must_use]
    pub fn serialization_error(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    /// Create an `InternalError`.
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_shape() {
        let err = BloomIndexError::invalid_shape(0, 3);
        let display = format!("{err}");
        assert!(display.contains("0 bits"));
        assert!(display.contains("3 hash functions"));
    }

    #[test]
    fn test_error_display_invalid_parameters() {
        let err = BloomIndexError::invalid_parameters("test message");
        let display = format!("{err}");
        assert!(display.contains("Invalid index parameters"));
        assert!(display.contains("test message"));
        assert!(display.ends_with('.'));
    }

    #[test]
    fn test_error_display_fp_rate_out_of_bounds() {
        let err = BloomIndexError::fp_rate_out_of_bounds(1.5);
        let display = format!("{err}");
        assert!(display.contains("1.5"));
        assert!(display.contains("(0, 1)"));
    }

    #[test]
    fn test_error_display_invalid_order() {
        let err = BloomIndexError::invalid_order(0, 1);
        let display = format!("{err}");
        assert!(display.contains("order 0"));
        assert!(display.contains("at least 1"));
    }

    #[test]
    fn test_error_display_invalid_chunk_width() {
        let err = BloomIndexError::invalid_chunk_width(5);
        assert!(format!("{err}").contains("5 bits"));
    }

    #[test]
    fn test_error_display_word_count_mismatch() {
        let err = BloomIndexError::word_count_mismatch(2, 3);
        let display = format!("{err}");
        assert!(display.contains("2 words"));
        assert!(display.contains("got 3"));
    }

    #[test]
    fn test_error_display_index_out_of_bounds() {
        let err = BloomIndexError::index_out_of_bounds(150, 100);
        let display = format!("{}", err);
        assert!(display.contains("150"));
        assert!(display.contains("100"));
        assert!(display.contains("out of bounds"));
    }

    #[test]
    fn test_error_display_shape_mismatch() {
        let a = Shape::new(64, 3).unwrap();
        let b = Shape::new(128, 3).unwrap();
        let display = format!("{}", BloomIndexError::shape_mismatch(a, b));
        assert!(display.contains("64"));
        assert!(display.contains("128"));
    }

    #[test]
    fn test_error_display_unknown_index_kind() {
        let err = BloomIndexError::unknown_index_kind("btree");
        assert!(format!("{err}").contains("'btree'"));
    }

    #[test]
    fn test_error_display_internal_error() {
        let err = BloomIndexError::internal_error("aggregate drift");
        let display = format!("{err}");
        assert!(display.contains("Internal error"));
        assert!(display.contains("bug"));
        assert!(display.contains("aggregate drift"));
    }

    #[test]
    fn test_error_implements_std_error() {
        let _err: Box<dyn std::error::Error> =
            Box::new(BloomIndexError::invalid_parameters("test"));
    }

    #[test]
    fn test_error_clone() {
        let err1 = BloomIndexError::invalid_item_count(0);
        let err2 = err1.clone();
        assert_eq!(err1, err2);
    }

    #[test]
    fn test_error_propagation_with_question_mark() {
        fn inner() -> Result<()> {
            Err(BloomIndexError::invalid_item_count(0))
        }

        fn outer() -> Result<()> {
            inner()?;
            Ok(())
        }

        assert!(outer().is_err());
    }
}
