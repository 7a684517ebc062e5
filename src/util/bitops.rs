//! Bit manipulation helpers over `&[u64]` word buffers.
//!
//! Filters and aggregates store their bits as little-endian word arrays:
//!
//! ```text
//! Word 0: [bit 0][bit 1]...[bit 63]
//! Word 1: [bit 64][bit 65]...[bit 127]
//! ```
//!
//! Every function here works on that layout. Most compile down to a single
//! `POPCNT`/`LZCNT` per word, which is what makes containment and distance
//! tests cheap enough to run at every tree level.

#![allow(clippy::cast_possible_truncation)]

/// Number of bits in a storage word.
pub const WORD_BITS: usize = 64;

/// Number of 64-bit words needed to store `bits` bits.
///
/// # Examples
///
/// ```
/// use bloomindex::util::bitops::bits_to_words;
///
/// assert_eq!(bits_to_words(0), 0);
/// assert_eq!(bits_to_words(64), 1);
/// assert_eq!(bits_to_words(65), 2);
/// ```
#[inline(always)]
#[must_use]
pub const fn bits_to_words(bits: usize) -> usize {
    (bits + WORD_BITS - 1) / WORD_BITS
}

/// Word holding bit `bit`.
#[inline(always)]
#[must_use]
pub const fn word_index(bit: usize) -> usize {
    bit / WORD_BITS
}

/// Position of bit `bit` inside its word.
#[inline(always)]
#[must_use]
pub const fn bit_offset(bit: usize) -> usize {
    bit % WORD_BITS
}

/// Count set bits across all words.
///
/// # Examples
///
/// ```
/// use bloomindex::util::bitops::count_ones_slice;
///
/// assert_eq!(count_ones_slice(&[0b1010, 0b1111, 0b0001]), 7);
/// assert_eq!(count_ones_slice(&[]), 0);
/// ```
#[inline]
#[must_use]
pub fn count_ones_slice(words: &[u64]) -> usize {
    words.iter().map(|&w| w.count_ones() as usize).sum()
}

/// Hamming distance (popcount of XOR) between two word buffers.
///
/// # Panics
///
/// Panics if the slices have different lengths.
///
/// # Examples
///
/// ```
/// use bloomindex::util::bitops::hamming_distance;
///
/// assert_eq!(hamming_distance(&[0b1010, 0b1111], &[0b1100, 0b1111]), 2);
/// ```
#[inline]
#[must_use]
pub fn hamming_distance(a: &[u64], b: &[u64]) -> usize {
    assert_eq!(a.len(), b.len(), "Slices must have same length");

    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| (x ^ y).count_ones() as usize)
        .sum()
}

/// `true` iff every bit set in `sub` is also set in `sup`.
///
/// # Panics
///
/// Panics if the slices have different lengths.
///
/// # Examples
///
/// ```
/// use bloomindex::util::bitops::is_superset;
///
/// assert!(is_superset(&[0b1110], &[0b0110]));
/// assert!(!is_superset(&[0b0110], &[0b1110]));
/// assert!(is_superset(&[0b0110], &[0]));
/// ```
#[inline]
#[must_use]
pub fn is_superset(sup: &[u64], sub: &[u64]) -> bool {
    assert_eq!(sup.len(), sub.len(), "Slices must have same length");

    sup.iter().zip(sub.iter()).all(|(&s, &q)| s & q == q)
}

/// In-place OR of `src` into `dst`.
///
/// # Panics
///
/// Panics if the slices have different lengths.
#[inline]
pub fn or_assign(dst: &mut [u64], src: &[u64]) {
    assert_eq!(dst.len(), src.len(), "Slices must have same length");

    for (d, &s) in dst.iter_mut().zip(src.iter()) {
        *d |= s;
    }
}

/// Index of the most significant set bit, or `None` if no bit is set.
///
/// # Examples
///
/// ```
/// use bloomindex::util::bitops::highest_set_bit;
///
/// assert_eq!(highest_set_bit(&[0, 0]), None);
/// assert_eq!(highest_set_bit(&[0b100, 0]), Some(2));
/// assert_eq!(highest_set_bit(&[1, 1]), Some(64));
/// ```
#[inline]
#[must_use]
pub fn highest_set_bit(words: &[u64]) -> Option<usize> {
    words
        .iter()
        .enumerate()
        .rev()
        .find(|(_, &w)| w != 0)
        .map(|(i, &w)| i * WORD_BITS + (WORD_BITS - 1 - w.leading_zeros() as usize))
}

/// Iterate set bit positions from most to least significant.
///
/// # Examples
///
/// ```
/// use bloomindex::util::bitops::set_bits_descending;
///
/// let bits: Vec<usize> = set_bits_descending(&[0b1001, 0b10]).collect();
/// assert_eq!(bits, vec![65, 3, 0]);
/// ```
pub fn set_bits_descending(words: &[u64]) -> impl Iterator<Item = usize> + '_ {
    words.iter().enumerate().rev().flat_map(|(i, &w)| {
        let mut rest = w;
        std::iter::from_fn(move || {
            if rest == 0 {
                return None;
            }
            let top = WORD_BITS - 1 - rest.leading_zeros() as usize;
            rest &= !(1u64 << top);
            Some(i * WORD_BITS + top)
        })
    })
}

/// Iterate set bit positions from least to most significant.
pub fn set_bits_ascending(words: &[u64]) -> impl Iterator<Item = usize> + '_ {
    words.iter().enumerate().flat_map(|(i, &w)| {
        let mut rest = w;
        std::iter::from_fn(move || {
            if rest == 0 {
                return None;
            }
            let low = rest.trailing_zeros() as usize;
            rest &= rest - 1;
            Some(i * WORD_BITS + low)
        })
    })
}

/// Mask selecting the valid bits of the last word for a `bits`-wide filter.
///
/// Returns `u64::MAX` when `bits` is a multiple of 64.
#[inline]
#[must_use]
pub const fn tail_mask(bits: usize) -> u64 {
    match bits % WORD_BITS {
        0 => u64::MAX,
        r => (1u64 << r) - 1,
    }
}
