//! Builder for configured index instances.
//!
//! [`IndexKind::build`] creates any strategy with default tuning. The builder
//! exposes the knobs each strategy has and validates them before anything is
//! allocated.
//!
//! # Type-State Pattern
//!
//! The strategy and the filter shape are required. The builder only offers
//! `build()` once both are set:
//!
//! ```text
//! Initial → WithKind → Complete → Box<dyn FilterIndex>
//!     ↓          ↓            ↓
//!   .kind()   .shape() /    .build()
//!             .shape_for()
//! ```
//!
//! # Examples
//!
//! ```
//! use bloomindex::builder::IndexBuilder;
//! use bloomindex::core::Shape;
//! use bloomindex::index::{IndexKind, KeyPolicy};
//!
//! let index = IndexBuilder::new()
//!     .kind(IndexKind::Hamming)
//!     .shape(Shape::new(256, 4).unwrap())
//!     .hamming_keys(KeyPolicy::Approximate)
//!     .build()
//!     .unwrap();
//! assert_eq!(index.name(), "Hamming");
//!
//! let index = IndexBuilder::new()
//!     .kind(IndexKind::Bloofi)
//!     .shape_for(20, 0.01)
//!     .bloofi_order(4)
//!     .build()
//!     .unwrap();
//! assert_eq!(index.shape().hashes(), 7);
//! ```
//!
//! # Option Applicability
//!
//! | Option | Default | Used by |
//! |--------|---------|---------|
//! | `expected_population` | 10 000 | `Linear` (pre-allocation), sharded kinds |
//! | `bloofi_order` | 2 | `Bloofi`, `NaturalBloofi` |
//! | `shard_capacity` | `⌈√population⌉`, min 64 | `ShardedList`, `NaturalBloofi` |
//! | `hamming_keys` | `Exact` | `Hamming` |
//!
//! Options that do not apply to the chosen kind are validated but ignored.

use crate::core::{FilterIndex, Shape};
use crate::error::{BloomIndexError, Result};
use crate::index::bloofi::DEFAULT_ORDER;
use crate::index::{
    BfTrie, Bloofi, ChunkWidth, HammingIndex, IndexKind, KeyPolicy, LinearIndex, NaturalBloofi,
    ShardConfig, ShardedList,
};
use std::marker::PhantomData;

/// Default `expected_population` when none is given.
pub const DEFAULT_EXPECTED_POPULATION: usize = 10_000;

/// Type-state marker: nothing required is set.
#[derive(Debug)]
pub struct Initial;

/// Type-state marker: strategy chosen.
#[derive(Debug)]
pub struct WithKind;

/// Type-state marker: strategy and shape set.
#[derive(Debug)]
pub struct Complete;

#[derive(Debug, Clone, Copy)]
enum ShapeSource {
    Given(Shape),
    Derived { items: usize, fp_rate: f64 },
}

/// Fluent index configuration.
#[derive(Debug)]
pub struct IndexBuilder<State = Initial> {
    kind: Option<IndexKind>,
    shape: Option<ShapeSource>,
    expected_population: usize,
    bloofi_order: usize,
    shard_capacity: Option<usize>,
    key_policy: KeyPolicy,
    _state: PhantomData<State>,
}

impl Default for IndexBuilder<Initial> {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexBuilder<Initial> {
    /// Start a new configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            kind: None,
            shape: None,
            expected_population: DEFAULT_EXPECTED_POPULATION,
            bloofi_order: DEFAULT_ORDER,
            shard_capacity: None,
            key_policy: KeyPolicy::default(),
            _state: PhantomData,
        }
    }

    /// Choose the strategy.
    #[must_use]
    pub fn kind(self, kind: IndexKind) -> IndexBuilder<WithKind> {
        let mut next = self.transition::<WithKind>();
        next.kind = Some(kind);
        next
    }
}

impl IndexBuilder<WithKind> {
    /// Use an explicit filter shape.
    #[must_use]
    pub fn shape(self, shape: Shape) -> IndexBuilder<Complete> {
        let mut next = self.transition::<Complete>();
        next.shape = Some(ShapeSource::Given(shape));
        next
    }

    /// Derive the shape from the number of items hashed into each filter and
    /// a target false positive rate, via [`Shape::from_population`].
    #[must_use]
    pub fn shape_for(self, items_per_filter: usize, fp_rate: f64) -> IndexBuilder<Complete> {
        let mut next = self.transition::<Complete>();
        next.shape = Some(ShapeSource::Derived {
            items: items_per_filter,
            fp_rate,
        });
        next
    }
}

impl<State> IndexBuilder<State> {
    /// Expected number of stored filters (a sizing hint).
    #[must_use]
    pub fn expected_population(mut self, population: usize) -> Self {
        self.expected_population = population;
        self
    }

    /// Minimum fan-out for Bloofi nodes.
    #[must_use]
    pub fn bloofi_order(mut self, order: usize) -> Self {
        self.bloofi_order = order;
        self
    }

    /// Distinct filters per shard, overriding the population-derived default.
    #[must_use]
    pub fn shard_capacity(mut self, capacity: usize) -> Self {
        self.shard_capacity = Some(capacity);
        self
    }

    /// Tiebreak policy for HammingIndex keys.
    #[must_use]
    pub fn hamming_keys(mut self, policy: KeyPolicy) -> Self {
        self.key_policy = policy;
        self
    }

    fn transition<Next>(self) -> IndexBuilder<Next> {
        IndexBuilder {
            kind: self.kind,
            shape: self.shape,
            expected_population: self.expected_population,
            bloofi_order: self.bloofi_order,
            shard_capacity: self.shard_capacity,
            key_policy: self.key_policy,
            _state: PhantomData,
        }
    }
}

impl IndexBuilder<Complete> {
    /// Validate the configuration and build the index.
    ///
    /// # Errors
    ///
    /// - Shape derivation errors from [`Shape::from_population`]
    /// - [`BloomIndexError::InvalidOrder`](crate::error::BloomIndexError::InvalidOrder)
    ///   for an order below 1
    /// - [`BloomIndexError::InvalidParameters`](crate::error::BloomIndexError::InvalidParameters)
    ///   for a zero shard capacity
    pub fn build(self) -> Result<Box<dyn FilterIndex>> {
        let shape = match self.shape {
            Some(ShapeSource::Given(shape)) => shape,
            Some(ShapeSource::Derived { items, fp_rate }) => {
                validation::validate_items(items)?;
                validation::validate_fp_rate(fp_rate)?;
                Shape::from_population(items, fp_rate)?
            }
            None => return Err(BloomIndexError::internal_error("builder completed without a shape")),
        };
        let kind = self
            .kind
            .ok_or_else(|| BloomIndexError::internal_error("builder completed without a kind"))?;

        validation::validate_order(self.bloofi_order)?;
        let shards = ShardConfig {
            capacity: self
                .shard_capacity
                .unwrap_or_else(|| ShardConfig::for_population(self.expected_population).capacity),
            order: self.bloofi_order,
        };
        validation::validate_shard_capacity(shards.capacity)?;

        #[cfg(feature = "trace")]
        tracing::debug!(kind = %kind, shape = %shape, "IndexBuilder::build");

        let index: Box<dyn FilterIndex> = match kind {
            IndexKind::Linear => Box::new(LinearIndex::with_capacity(shape, self.expected_population)),
            IndexKind::BfTrie4 => Box::new(BfTrie::new(shape, ChunkWidth::Four)),
            IndexKind::BfTrie8 => Box::new(BfTrie::new(shape, ChunkWidth::Eight)),
            IndexKind::Hamming => Box::new(HammingIndex::with_policy(shape, self.key_policy)),
            IndexKind::Bloofi => Box::new(Bloofi::with_order(shape, self.bloofi_order)?),
            IndexKind::ShardedList => Box::new(ShardedList::with_config(shape, shards)?),
            IndexKind::NaturalBloofi => Box::new(NaturalBloofi::with_config(shape, shards)?),
        };
        Ok(index)
    }
}

/// Common validation functions for the builder.
mod validation {
    use crate::error::{BloomIndexError, Result};
    use crate::index::bloofi::MIN_ORDER;

    /// # Errors
    ///
    /// Returns error if `items == 0`.
    #[inline]
    pub fn validate_items(items: usize) -> Result<()> {
        if items == 0 {
            return Err(BloomIndexError::invalid_item_count(items));
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns error if `fp_rate` is not in (0, 1).
    #[inline]
    pub fn validate_fp_rate(fp_rate: f64) -> Result<()> {
        if !(fp_rate > 0.0 && fp_rate < 1.0) {
            return Err(BloomIndexError::fp_rate_out_of_bounds(fp_rate));
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns error if `order < MIN_ORDER`.
    #[inline]
    pub fn validate_order(order: usize) -> Result<()> {
        if order < MIN_ORDER {
            return Err(BloomIndexError::invalid_order(order, MIN_ORDER));
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns error if `capacity == 0`.
    #[inline]
    pub fn validate_shard_capacity(capacity: usize) -> Result<()> {
        if capacity == 0 {
            return Err(BloomIndexError::invalid_parameters(
                "shard capacity must be > 0",
            ));
        }
        Ok(())
    }
}
