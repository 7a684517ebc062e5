//! Population-partitioning wrappers (ShardedList, NaturalBloofi).
//!
//! Filters are routed into bounded shards. Each shard sits behind a
//! *gatekeeper*: the counted OR of everything it stores. Queries skip any
//! shard whose gatekeeper does not contain them, then search the survivors.
//!
//! ```text
//!              ┌───────────────┐   ┌───────────────┐   ┌───────────────┐
//! gatekeeper:  │ OR of shard 0 │   │ OR of shard 1 │   │ OR of shard 2 │
//!              ├───────────────┤   ├───────────────┤   ├───────────────┤
//! contents:    │ linear list   │   │ linear list   │   │ linear list   │  ShardedList
//!              │  or Bloofi    │   │  or Bloofi    │   │  or Bloofi    │  NaturalBloofi
//!              └───────────────┘   └───────────────┘   └───────────────┘
//! ```
//!
//! # Routing
//!
//! 1. A filter already stored in some shard gets its multiplicity bumped there
//! 2. Otherwise it goes to the shard with spare capacity whose gatekeeper is
//!    nearest in Hamming distance
//! 3. If every shard is full, a new shard is opened
//!
//! Capacity counts distinct filters. Duplicates never open a shard.
//! A shard emptied by deletes is dropped.

use crate::core::{CountingFilter, Filter, FilterIndex, Shape};
use crate::error::{BloomIndexError, Result};
use crate::index::bloofi::{Bloofi, DEFAULT_ORDER, MIN_ORDER};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Smallest shard capacity derived from an expected population.
pub const MIN_SHARD_CAPACITY: usize = 64;

/// Shard sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ShardConfig {
    /// Distinct filters per shard.
    pub capacity: usize,
    /// Order of the nested tree, for shards that hold one.
    pub order: usize,
}

impl ShardConfig {
    /// Capacity `⌈√expected⌉`, at least [`MIN_SHARD_CAPACITY`].
    ///
    /// # Examples
    ///
    /// ```
    /// use bloomindex::index::sharded::{ShardConfig, MIN_SHARD_CAPACITY};
    ///
    /// assert_eq!(ShardConfig::for_population(1_000_000).capacity, 1000);
    /// assert_eq!(ShardConfig::for_population(100).capacity, MIN_SHARD_CAPACITY);
    /// ```
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn for_population(expected_population: usize) -> Self {
        let root = (expected_population as f64).sqrt().ceil() as usize;
        Self {
            capacity: root.max(MIN_SHARD_CAPACITY),
            order: DEFAULT_ORDER,
        }
    }

    /// Check capacity and order.
    ///
    /// # Errors
    ///
    /// - [`BloomIndexError::InvalidParameters`] if `capacity == 0`
    /// - [`BloomIndexError::InvalidOrder`] if `order < MIN_ORDER`
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(BloomIndexError::invalid_parameters(
                "shard capacity must be > 0",
            ));
        }
        if self.order < MIN_ORDER {
            return Err(BloomIndexError::invalid_order(self.order, MIN_ORDER));
        }
        Ok(())
    }
}

/// One bounded partition behind a gatekeeper.
pub trait Shard: fmt::Debug + Send + Sync {
    /// Name of the wrapper built from this shard type.
    const NAME: &'static str;

    /// Empty shard.
    fn create(shape: Shape, config: &ShardConfig) -> Self
    where
        Self: Sized;

    /// `true` while fewer than `capacity` distinct filters are stored.
    fn has_space(&self) -> bool;

    /// Hamming distance from the gatekeeper to `filter`.
    fn distance(&self, filter: &Filter) -> usize;

    /// Gatekeeper test: `false` proves no stored filter contains `query`.
    fn may_contain(&self, query: &Filter) -> bool;

    /// Bump the multiplicity of `filter` if stored exactly.
    fn try_increment(&mut self, filter: &Filter) -> bool;

    /// Store a filter not yet present.
    fn insert(&mut self, filter: Filter);

    /// Remove one copy of `filter`.
    fn delete(&mut self, filter: &Filter) -> bool;

    /// Matches of `query`, with multiplicity.
    fn count(&self, query: &Filter) -> usize;

    /// Visit each match once per stored copy.
    fn search(&self, query: &Filter, visit: &mut dyn FnMut(&Filter));

    /// Distinct filters stored.
    fn distinct(&self) -> usize;

    /// `true` if nothing is stored.
    fn is_empty(&self) -> bool {
        self.distinct() == 0
    }
}

/// Shard scanning a plain list.
#[derive(Debug, Clone)]
pub struct ListShard {
    gatekeeper: CountingFilter,
    entries: Vec<(Filter, usize)>,
    capacity: usize,
}

impl Shard for ListShard {
    const NAME: &'static str = "ShardedList";

    fn create(shape: Shape, config: &ShardConfig) -> Self {
        Self {
            gatekeeper: CountingFilter::new(shape),
            entries: Vec::with_capacity(config.capacity),
            capacity: config.capacity,
        }
    }

    fn has_space(&self) -> bool {
        self.entries.len() < self.capacity
    }

    fn distance(&self, filter: &Filter) -> usize {
        self.gatekeeper.hamming_distance(filter)
    }

    fn may_contain(&self, query: &Filter) -> bool {
        self.gatekeeper.contains(query)
    }

    fn try_increment(&mut self, filter: &Filter) -> bool {
        match self.entries.iter_mut().find(|(f, _)| f == filter) {
            Some((_, count)) => {
                *count += 1;
                true
            }
            None => false,
        }
    }

    fn insert(&mut self, filter: Filter) {
        self.gatekeeper.add(&filter);
        self.entries.push((filter, 1));
    }

    fn delete(&mut self, filter: &Filter) -> bool {
        let Some(pos) = self.entries.iter().position(|(f, _)| f == filter) else {
            return false;
        };
        self.entries[pos].1 -= 1;
        if self.entries[pos].1 == 0 {
            let (removed, _) = self.entries.swap_remove(pos);
            self.gatekeeper.subtract(&removed);
        }
        true
    }

    fn count(&self, query: &Filter) -> usize {
        self.entries
            .iter()
            .filter(|(f, _)| f.contains(query))
            .map(|(_, n)| n)
            .sum()
    }

    fn search(&self, query: &Filter, visit: &mut dyn FnMut(&Filter)) {
        for (filter, n) in &self.entries {
            if filter.contains(query) {
                for _ in 0..*n {
                    visit(filter);
                }
            }
        }
    }

    fn distinct(&self) -> usize {
        self.entries.len()
    }
}

/// Shard holding a nested [`Bloofi`]; its root aggregate is the gatekeeper.
#[derive(Debug, Clone)]
pub struct BloofiShard {
    tree: Bloofi,
    capacity: usize,
}

impl Shard for BloofiShard {
    const NAME: &'static str = "NaturalBloofi";

    fn create(shape: Shape, config: &ShardConfig) -> Self {
        let tree = Bloofi::with_order(shape, config.order).unwrap_or_else(|_| Bloofi::new(shape));
        Self {
            tree,
            capacity: config.capacity,
        }
    }

    fn has_space(&self) -> bool {
        self.tree.distinct() < self.capacity
    }

    fn distance(&self, filter: &Filter) -> usize {
        self.tree.root_aggregate().hamming_distance(filter)
    }

    fn may_contain(&self, query: &Filter) -> bool {
        self.tree.root_aggregate().contains(query)
    }

    fn try_increment(&mut self, filter: &Filter) -> bool {
        self.tree.try_increment(filter)
    }

    fn insert(&mut self, filter: Filter) {
        self.tree.add(filter);
    }

    fn delete(&mut self, filter: &Filter) -> bool {
        self.tree.delete(filter)
    }

    fn count(&self, query: &Filter) -> usize {
        self.tree.count(query)
    }

    fn search(&self, query: &Filter, visit: &mut dyn FnMut(&Filter)) {
        self.tree.search(query, visit);
    }

    fn distinct(&self) -> usize {
        self.tree.distinct()
    }
}

/// Router over a growing set of shards of type `S`.
///
/// # Examples
///
/// ```
/// use bloomindex::core::{Filter, FilterIndex, Shape};
/// use bloomindex::index::{NaturalBloofi, ShardedList};
///
/// let shape = Shape::new(20, 3).unwrap();
/// let a = Filter::from_words(shape, vec![0b1_0011]).unwrap();
/// let b = Filter::from_words(shape, vec![0b1_0111]).unwrap();
///
/// let mut list = ShardedList::new(shape, 1000);
/// let mut natural = NaturalBloofi::new(shape, 1000);
/// for index in [&mut list as &mut dyn FilterIndex, &mut natural] {
///     index.add(a.clone());
///     index.add(b.clone());
///     assert_eq!(index.count(&a), 2);
/// }
/// assert_eq!(list.shard_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Sharded<S> {
    shape: Shape,
    config: ShardConfig,
    shards: Vec<S>,
    size: usize,
}

/// Shards scanned linearly.
pub type ShardedList = Sharded<ListShard>;

/// Shards each holding a small Bloofi.
pub type NaturalBloofi = Sharded<BloofiShard>;

impl<S: Shard> Sharded<S> {
    /// Empty router sized for `expected_population` filters.
    #[must_use]
    pub fn new(shape: Shape, expected_population: usize) -> Self {
        Self {
            shape,
            config: ShardConfig::for_population(expected_population),
            shards: Vec::new(),
            size: 0,
        }
    }

    /// Empty router with explicit shard sizing.
    ///
    /// # Errors
    ///
    /// See [`ShardConfig::validate`].
    pub fn with_config(shape: Shape, config: ShardConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            shape,
            config,
            shards: Vec::new(),
            size: 0,
        })
    }

    /// Shard sizing in use.
    #[must_use]
    pub fn config(&self) -> ShardConfig {
        self.config
    }

    /// Number of live shards.
    #[must_use]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Distinct filters per shard, in shard order.
    #[must_use]
    pub fn shard_sizes(&self) -> Vec<usize> {
        self.shards.iter().map(Shard::distinct).collect()
    }

    fn nearest_open_shard(&self, filter: &Filter) -> Option<usize> {
        self.shards
            .iter()
            .enumerate()
            .filter(|(_, s)| s.has_space())
            .min_by_key(|(_, s)| s.distance(filter))
            .map(|(i, _)| i)
    }
}

impl<S: Shard> FilterIndex for Sharded<S> {
    fn add(&mut self, filter: Filter) {
        self.shape.assert_same(&filter.shape());
        #[cfg(feature = "trace")]
        tracing::trace!(kind = S::NAME, shards = self.shards.len(), "add");
        self.size += 1;

        for shard in &mut self.shards {
            if shard.may_contain(&filter) && shard.try_increment(&filter) {
                return;
            }
        }

        match self.nearest_open_shard(&filter) {
            Some(i) => self.shards[i].insert(filter),
            None => {
                let mut shard = S::create(self.shape, &self.config);
                shard.insert(filter);
                self.shards.push(shard);

                #[cfg(feature = "trace")]
                tracing::debug!(kind = S::NAME, shards = self.shards.len(), "shard opened");
            }
        }
    }

    fn delete(&mut self, filter: &Filter) -> bool {
        self.shape.assert_same(&filter.shape());
        #[cfg(feature = "trace")]
        tracing::trace!(kind = S::NAME, shards = self.shards.len(), "delete");
        let hit = self
            .shards
            .iter_mut()
            .position(|s| s.may_contain(filter) && s.delete(filter));
        let Some(i) = hit else {
            return false;
        };
        self.size -= 1;
        if self.shards[i].is_empty() {
            self.shards.remove(i);

            #[cfg(feature = "trace")]
            tracing::debug!(kind = S::NAME, shards = self.shards.len(), "shard dropped");
        }
        true
    }

    fn count(&self, query: &Filter) -> usize {
        self.shape.assert_same(&query.shape());
        #[cfg(feature = "trace")]
        tracing::trace!(kind = S::NAME, shards = self.shards.len(), "count");
        self.shards
            .iter()
            .filter(|s| s.may_contain(query))
            .map(|s| s.count(query))
            .sum()
    }

    fn search(&self, query: &Filter, visit: &mut dyn FnMut(&Filter)) {
        self.shape.assert_same(&query.shape());
        for shard in self.shards.iter().filter(|s| s.may_contain(query)) {
            shard.search(query, visit);
        }
    }

    fn size(&self) -> usize {
        self.size
    }

    fn name(&self) -> &'static str {
        S::NAME
    }

    fn shape(&self) -> Shape {
        self.shape
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape() -> Shape {
        Shape::new(20, 3).unwrap()
    }

    fn f(word: u64) -> Filter {
        Filter::from_words(shape(), vec![word]).unwrap()
    }

    fn tiny(capacity: usize) -> ShardConfig {
        ShardConfig { capacity, order: 1 }
    }

    #[test]
    fn test_config_for_population() {
        assert_eq!(ShardConfig::for_population(0).capacity, MIN_SHARD_CAPACITY);
        assert_eq!(ShardConfig::for_population(10_000).capacity, 100);
        assert_eq!(ShardConfig::for_population(10_001).capacity, 101);
        assert_eq!(ShardConfig::for_population(10).order, DEFAULT_ORDER);
    }

    #[test]
    fn test_config_validation() {
        assert!(ShardedList::with_config(shape(), tiny(0)).is_err());
        let err = NaturalBloofi::with_config(shape(), ShardConfig { capacity: 4, order: 0 })
            .unwrap_err();
        assert_eq!(err, BloomIndexError::invalid_order(0, MIN_ORDER));
        assert!(ShardedList::with_config(shape(), tiny(1)).is_ok());
    }

    #[test]
    fn test_names() {
        assert_eq!(ShardedList::new(shape(), 10).name(), "ShardedList");
        assert_eq!(NaturalBloofi::new(shape(), 10).name(), "NaturalBloofi");
    }

    fn reference_scenario<S: Shard>(mut index: Sharded<S>) {
        let a = f(0b1_0011);
        let b = f(0b1_0111);
        let c = f(0b10_0000);
        index.add(a.clone());
        index.add(b.clone());
        index.add(c.clone());

        assert_eq!(index.count(&a), 2, "{}", index.name());
        assert_eq!(index.count(&b), 1);
        assert_eq!(index.count(&c), 1);
        assert!(index.delete(&b));
        assert_eq!(index.count(&a), 1);
    }

    #[test]
    fn test_reference_scenario() {
        reference_scenario(ShardedList::new(shape(), 100));
        reference_scenario(NaturalBloofi::new(shape(), 100));
        reference_scenario(ShardedList::with_config(shape(), tiny(1)).unwrap());
        reference_scenario(NaturalBloofi::with_config(shape(), tiny(1)).unwrap());
    }

    #[test]
    fn test_full_shards_open_new_ones() {
        let mut index = ShardedList::with_config(shape(), tiny(2)).unwrap();
        for word in [0b1, 0b10, 0b100, 0b1000, 0b1_0000] {
            index.add(f(word));
        }
        assert_eq!(index.shard_count(), 3);
        assert_eq!(index.shard_sizes().iter().sum::<usize>(), 5);
        assert_eq!(index.count(&Filter::new(shape())), 5);
    }

    #[test]
    fn test_duplicates_do_not_open_shards() {
        let mut index = NaturalBloofi::with_config(shape(), tiny(1)).unwrap();
        let a = f(0b101);
        for _ in 0..5 {
            index.add(a.clone());
        }
        assert_eq!(index.shard_count(), 1);
        assert_eq!(index.size(), 5);
        assert_eq!(index.count(&a), 5);

        let mut seen = 0;
        index.search(&f(0b1), &mut |_| seen += 1);
        assert_eq!(seen, 5);
    }

    #[test]
    fn test_routes_to_nearest_gatekeeper() {
        let mut index = ShardedList::with_config(shape(), tiny(4)).unwrap();
        index.add(f(0xF));
        // The only shard takes everything until it is full
        for word in [0xF0, 0xF00, 0xF000] {
            index.add(f(word));
        }
        assert_eq!(index.shard_count(), 1);
        index.add(f(0xF_0000));
        assert_eq!(index.shard_count(), 2);

        // 0x3_0000 is nearer the second shard's gatekeeper (0xF_0000)
        index.add(f(0x3_0000));
        assert_eq!(index.shard_sizes(), vec![4, 2]);
    }

    #[test]
    fn test_empty_shards_are_dropped() {
        let mut index = NaturalBloofi::with_config(shape(), tiny(1)).unwrap();
        index.add(f(0b1));
        index.add(f(0b10));
        assert_eq!(index.shard_count(), 2);

        assert!(index.delete(&f(0b1)));
        assert_eq!(index.shard_count(), 1);
        assert!(!index.delete(&f(0b1)));
        assert!(index.delete(&f(0b10)));
        assert_eq!(index.shard_count(), 0);
        assert!(index.is_empty());
        assert_eq!(index.count(&Filter::new(shape())), 0);
    }

    #[test]
    fn test_gatekeeper_tracks_deletes() {
        let mut shard = ListShard::create(shape(), &tiny(8));
        shard.insert(f(0b011));
        shard.insert(f(0b110));
        assert!(shard.may_contain(&f(0b111)));

        assert!(shard.delete(&f(0b110)));
        assert!(!shard.may_contain(&f(0b100)));
        assert!(shard.may_contain(&f(0b011)));
        assert_eq!(shard.distance(&f(0b011)), 0);
    }
}
