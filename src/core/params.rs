//! Shape sizing from an expected population.
//!
//! Given `n` expected entries per filter and a target false positive rate `ε`:
//!
//! - `m = -n × ln(ε) / (ln 2)²` bits
//! - `k = (m/n) × ln 2` hash functions
//! - expected false positive rate `p = (1 - e^(-kn/m))^k`
//!
//! Only [`Shape::from_population`](crate::core::Shape::from_population) and
//! the shape estimators call into this module; indexes never hash anything
//! themselves.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]

use crate::error::{BloomIndexError, Result};
use std::f64::consts::LN_2;

const LN2_SQUARED: f64 = LN_2 * LN_2;

/// Smallest width handed out by [`optimal_bit_count`].
pub const MIN_FILTER_SIZE: usize = 8;

/// Upper clamp for [`optimal_hash_count`].
pub const MAX_HASH_FUNCTIONS: usize = 32;

/// Lower clamp for [`optimal_hash_count`].
pub const MIN_HASH_FUNCTIONS: usize = 1;

/// Optimal number of bits for `n` items at false positive rate `fp_rate`.
///
/// # Errors
///
/// - [`BloomIndexError::InvalidItemCount`] if `n == 0`
/// - [`BloomIndexError::FalsePositiveRateOutOfBounds`] if `fp_rate` is not in (0, 1)
/// - [`BloomIndexError::InvalidParameters`] if the result overflows
///
/// # Examples
///
/// ```
/// use bloomindex::core::params::optimal_bit_count;
///
/// let bits = optimal_bit_count(1000, 0.01).unwrap();
/// assert!(bits >= 9585 && bits <= 9586);
/// ```
pub fn optimal_bit_count(n: usize, fp_rate: f64) -> Result<usize> {
    if n == 0 {
        return Err(BloomIndexError::invalid_item_count(n));
    }
    if fp_rate <= 0.0 || fp_rate >= 1.0 || fp_rate.is_nan() {
        return Err(BloomIndexError::fp_rate_out_of_bounds(fp_rate));
    }

    let m = (-(n as f64) * fp_rate.ln() / LN2_SQUARED).ceil();
    if m > (usize::MAX / 2) as f64 {
        return Err(BloomIndexError::invalid_parameters(format!(
            "calculated filter size {:.0} exceeds reasonable bounds",
            m
        )));
    }

    Ok((m as usize).max(MIN_FILTER_SIZE))
}

/// Optimal number of hash functions for `m` bits holding `n` items.
///
/// Clamped to `[MIN_HASH_FUNCTIONS, MAX_HASH_FUNCTIONS]`.
///
/// # Errors
///
/// - [`BloomIndexError::InvalidParameters`] if `m == 0`
/// - [`BloomIndexError::InvalidItemCount`] if `n == 0`
///
/// # Examples
///
/// ```
/// use bloomindex::core::params::optimal_hash_count;
///
/// assert_eq!(optimal_hash_count(9585, 1000).unwrap(), 7);
/// ```
pub fn optimal_hash_count(m: usize, n: usize) -> Result<usize> {
    if m == 0 {
        return Err(BloomIndexError::invalid_parameters("filter size must be > 0"));
    }
    if n == 0 {
        return Err(BloomIndexError::invalid_item_count(n));
    }

    let k = ((m as f64 / n as f64) * LN_2).round() as usize;
    Ok(k.clamp(MIN_HASH_FUNCTIONS, MAX_HASH_FUNCTIONS))
}

/// Expected false positive rate after merging `n` items into `m` bits with `k` hashes.
///
/// # Errors
///
/// [`BloomIndexError::InvalidParameters`] if `m == 0` or `k == 0`.
///
/// # Examples
///
/// ```
/// use bloomindex::core::params::expected_fp_rate;
///
/// let fp = expected_fp_rate(9585, 1000, 7).unwrap();
/// assert!((fp - 0.01).abs() < 0.001);
/// ```
pub fn expected_fp_rate(m: usize, n: usize, k: usize) -> Result<f64> {
    if m == 0 || k == 0 {
        return Err(BloomIndexError::invalid_parameters(format!(
            "m={} and k={} must both be > 0",
            m, k
        )));
    }
    if n == 0 {
        return Ok(0.0);
    }

    let k_f64 = k as f64;
    let prob_bit_one = 1.0 - (-(k_f64 * n as f64) / m as f64).exp();
    Ok(prob_bit_one.powf(k_f64).clamp(0.0, 1.0))
}

/// `(optimal_bits, optimal_hashes)` for `n` items at `fp_rate`.
///
/// # Errors
///
/// See [`optimal_bit_count`].
pub fn calculate_filter_params(n: usize, fp_rate: f64) -> Result<(usize, usize)> {
    let m = optimal_bit_count(n, fp_rate)?;
    let k = optimal_hash_count(m, n)?;
    Ok((m, k))
}
