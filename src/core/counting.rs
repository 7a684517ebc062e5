//! Reference-counted aggregate filter.
//!
//! An aggregate summarises a set of contributor filters as their OR. A plain
//! OR cannot be undone when one contributor leaves, so each bit position
//! carries a counter of how many contributors set it:
//!
//! - Add contributor: increment the counter of each of its set bits
//! - Remove contributor: decrement the same counters
//! - Bit is "on" in the aggregate while its counter is > 0
//!
//! The on/off view is cached as a [`Filter`] mask so that containment and
//! distance checks against an aggregate cost the same as against a filter.
//!
//! # Examples
//!
//! ```
//! use bloomindex::core::{CountingFilter, Filter, Shape};
//!
//! let shape = Shape::new(64, 2).unwrap();
//! let a = Filter::from_indices(shape, [1, 2]).unwrap();
//! let b = Filter::from_indices(shape, [2, 3]).unwrap();
//!
//! let mut agg = CountingFilter::new(shape);
//! agg.add(&a);
//! agg.add(&b);
//! assert!(agg.contains(&Filter::from_indices(shape, [1, 3]).unwrap()));
//!
//! agg.subtract(&a);
//! assert!(agg.contains(&b));
//! assert!(!agg.contains(&a)); // bit 1 dropped out, bit 2 kept by b
//! ```

use crate::core::{Filter, Shape};
use crate::util::bitops::WORD_BITS;

/// Per-bit counted OR of a multiset of filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountingFilter {
    /// Cached `counts[i] > 0` view.
    mask: Filter,
    /// One counter per bit position.
    counts: Vec<u32>,
    /// Number of contributors currently added.
    contributors: usize,
}

impl CountingFilter {
    /// Create an empty aggregate.
    #[must_use]
    pub fn new(shape: Shape) -> Self {
        Self {
            mask: Filter::new(shape),
            counts: vec![0; shape.bits() as usize],
            contributors: 0,
        }
    }

    /// Aggregate of every filter yielded by `filters`.
    #[must_use]
    pub fn from_filters<'a, I>(shape: Shape, filters: I) -> Self
    where
        I: IntoIterator<Item = &'a Filter>,
    {
        let mut agg = Self::new(shape);
        for filter in filters {
            agg.add(filter);
        }
        agg
    }

    /// Shape of the aggregate.
    #[must_use]
    #[inline]
    pub const fn shape(&self) -> Shape {
        self.mask.shape()
    }

    /// The OR of all contributors, as a plain filter.
    #[must_use]
    #[inline]
    pub fn as_filter(&self) -> &Filter {
        &self.mask
    }

    /// Number of contributors added and not yet subtracted.
    #[must_use]
    #[inline]
    pub const fn contributors(&self) -> usize {
        self.contributors
    }

    /// `true` if nothing contributes to the aggregate.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.contributors == 0
    }

    /// Counter for bit `index`.
    #[must_use]
    #[inline]
    pub fn count_at(&self, index: usize) -> u32 {
        self.counts[index]
    }

    /// Add one contributor.
    ///
    /// # Panics
    ///
    /// Panics on shape mismatch.
    #[track_caller]
    pub fn add(&mut self, filter: &Filter) {
        self.shape().assert_same(&filter.shape());
        for bit in filter.iter_ones() {
            self.counts[bit] += 1;
        }
        self.mask.merge(filter);
        self.contributors += 1;
    }

    /// Remove one contributor previously passed to [`add`](Self::add).
    ///
    /// # Panics
    ///
    /// Panics on shape mismatch, or if a counter would drop below zero
    /// (the filter was never added).
    #[track_caller]
    pub fn subtract(&mut self, filter: &Filter) {
        self.shape().assert_same(&filter.shape());
        assert!(self.contributors > 0, "CountingFilter underflow: no contributors");
        for bit in filter.iter_ones() {
            let count = &mut self.counts[bit];
            assert!(*count > 0, "CountingFilter underflow at bit {}", bit);
            *count -= 1;
        }
        self.contributors -= 1;
        self.rebuild_mask_words(filter);
    }

    /// Add every contributor of `other` into `self`.
    #[track_caller]
    pub fn add_counts(&mut self, other: &CountingFilter) {
        self.shape().assert_same(&other.shape());
        for (mine, &theirs) in self.counts.iter_mut().zip(other.counts.iter()) {
            *mine += theirs;
        }
        self.mask.merge(&other.mask);
        self.contributors += other.contributors;
    }

    /// Remove every contributor of `other` from `self`.
    ///
    /// # Panics
    ///
    /// Panics on shape mismatch or counter underflow.
    #[track_caller]
    pub fn subtract_counts(&mut self, other: &CountingFilter) {
        self.shape().assert_same(&other.shape());
        assert!(
            self.contributors >= other.contributors,
            "CountingFilter underflow: {} contributors, subtracting {}",
            self.contributors,
            other.contributors
        );
        for (bit, (mine, &theirs)) in self.counts.iter_mut().zip(other.counts.iter()).enumerate() {
            assert!(*mine >= theirs, "CountingFilter underflow at bit {}", bit);
            *mine -= theirs;
        }
        self.contributors -= other.contributors;
        self.rebuild_mask_words(&other.mask);
    }

    /// Drop every contributor.
    pub fn clear(&mut self) {
        self.counts.iter_mut().for_each(|c| *c = 0);
        self.mask = Filter::new(self.shape());
        self.contributors = 0;
    }

    /// `true` iff the aggregate's OR contains `filter`.
    #[must_use]
    #[inline]
    #[track_caller]
    pub fn contains(&self, filter: &Filter) -> bool {
        self.mask.contains(filter)
    }

    /// Hamming distance between the aggregate's OR and `filter`.
    #[must_use]
    #[inline]
    #[track_caller]
    pub fn hamming_distance(&self, filter: &Filter) -> usize {
        self.mask.hamming_distance(filter)
    }

    /// Number of bits currently on.
    #[must_use]
    #[inline]
    pub fn cardinality(&self) -> usize {
        self.mask.cardinality()
    }

    /// Recompute mask words touched by `removed`'s set bits from the counters.
    fn rebuild_mask_words(&mut self, removed: &Filter) {
        let bits = self.counts.len();
        let mut words = self.mask.words().to_vec();
        for (w, &touched) in removed.words().iter().enumerate() {
            if touched == 0 {
                continue;
            }
            let start = w * WORD_BITS;
            let end = (start + WORD_BITS).min(bits);
            let mut word = 0u64;
            for (offset, &count) in self.counts[start..end].iter().enumerate() {
                if count > 0 {
                    word |= 1u64 << offset;
                }
            }
            words[w] = word;
        }
        // Words came from a valid mask of the same shape
        self.mask = Filter::from_words(self.shape(), words)
            .unwrap_or_else(|_| unreachable!("mask words stay within shape"));
    }
}
