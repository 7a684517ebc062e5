//! Internal utility functions and helpers.
//!
//! # Modules
//!
//! - [`bitops`] - Word-slice bit manipulation (popcount, containment, distance)

pub mod bitops;

pub use bitops::{count_ones_slice, hamming_distance, is_superset};
