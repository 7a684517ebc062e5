//! BloomIndex: in-memory containment indexes over Bloom filters.
//!
//! An index stores a multiset of equally-shaped Bloom filters and answers,
//! for a query filter `q`, which stored filters `f` satisfy `f ⊇ q` (every
//! bit set in `q` is set in `f`). Such an `f` is a *match*: whatever set `f`
//! summarises may contain everything `q` summarises.
//!
//! Several strategies trade build cost, memory and pruning power. They are
//! interchangeable behind one trait and always agree on every answer.
//!
//! # Quick Start
//!
//! ```
//! use bloomindex::prelude::*;
//!
//! let shape = Shape::new(20, 3).unwrap();
//! let a = Filter::from_words(shape, vec![0b1_0011]).unwrap();
//! let b = Filter::from_words(shape, vec![0b1_0111]).unwrap();
//! let c = Filter::from_words(shape, vec![0b10_0000]).unwrap();
//!
//! let mut index = Bloofi::new(shape);
//! index.add(a.clone());
//! index.add(b.clone());
//! index.add(c.clone());
//!
//! assert_eq!(index.count(&a), 2); // a and b contain a
//! assert_eq!(index.count(&c), 1);
//! assert!(index.delete(&b));
//! assert_eq!(index.count(&a), 1);
//! ```
//!
//! # Choosing a Strategy
//!
//! | Strategy | Add | Query pruning | Best when |
//! |----------|-----|---------------|-----------|
//! | [`LinearIndex`] | O(1) | none | small sets, reference answers |
//! | [`BfTrie`] (4/8-bit) | O(m / width) | per-chunk superset tables | dense, long filters |
//! | [`HammingIndex`] | O(log n) | weight ≥ query weight | sparse queries |
//! | [`Bloofi`] | O(log n) | OR-aggregate per subtree | clustered filters |
//! | [`ShardedList`] | O(shards) | OR-aggregate per shard | bulk dissimilar data |
//! | [`NaturalBloofi`] | O(shards + log n) | shard aggregate, then tree | large clustered sets |
//!
//! [`IndexKind`] names every strategy and builds any of them; the
//! [`builder::IndexBuilder`] exposes per-strategy tuning with validation.
//!
//! # Features
//!
//! - `serde` - `Serialize`/`Deserialize` for shapes, filters and
//!   configuration enums; JSON metrics export
//! - `rayon` - [`core::par_count_batch`] for parallel read-only queries
//! - `metrics` - [`metrics::MeteredIndex`] operation counters and latency
//!   histograms
//! - `trace` - `tracing` events on structural changes

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::len_zero)]
#![allow(clippy::bool_assert_comparison)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

/// Filters, shapes and the index contract
pub mod core;

/// Error types and result aliases
pub mod error;

/// Index strategies
pub mod index;

/// Bit-slice helpers
pub mod util;

/// Validated index configuration
pub mod builder;

/// Operation metrics (requires `metrics` feature)
#[cfg(feature = "metrics")]
#[cfg_attr(docsrs, doc(cfg(feature = "metrics")))]
pub mod metrics;

pub use error::{BloomIndexError, Result};

pub use core::{CountingFilter, Filter, FilterIndex, Shape};

pub use index::{
    BfTrie, Bloofi, ChunkWidth, HammingIndex, IndexKind, KeyPolicy, LinearIndex, NaturalBloofi,
    ShardedList,
};

pub use builder::IndexBuilder;

#[cfg(feature = "metrics")]
pub use metrics::{MeteredIndex, MetricsCollector};

/// Prelude module for convenient imports.
///
/// # Examples
///
/// ```
/// use bloomindex::prelude::*;
///
/// let shape = Shape::new(64, 3).unwrap();
/// let mut index = IndexKind::Hamming.build(100, shape);
/// index.add(Filter::from_indices(shape, [3, 9, 27]).unwrap());
/// assert_eq!(index.size(), 1);
/// ```
pub mod prelude {
    pub use crate::builder::IndexBuilder;
    pub use crate::core::{Filter, FilterIndex, Shape};
    pub use crate::error::{BloomIndexError, Result};
    pub use crate::index::{
        BfTrie, Bloofi, ChunkWidth, HammingIndex, IndexKind, KeyPolicy, LinearIndex,
        NaturalBloofi, ShardedList,
    };

    #[cfg(feature = "rayon")]
    pub use crate::core::par_count_batch;

    #[cfg(feature = "metrics")]
    pub use crate::metrics::{MeteredIndex, MetricsCollector};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_imports() {
        let shape = Shape::new(32, 2).unwrap();
        let mut index = LinearIndex::new(shape);
        index.add(Filter::from_indices(shape, [1, 2]).unwrap());
        assert_eq!(index.count(&Filter::from_indices(shape, [1]).unwrap()), 1);
    }

    #[test]
    fn test_trait_object_usage() {
        fn fill(index: &mut dyn FilterIndex, filters: &[Filter]) {
            for f in filters {
                index.add(f.clone());
            }
        }

        let shape = Shape::new(32, 2).unwrap();
        let filters: Vec<Filter> = (0..8u32)
            .map(|i| Filter::from_indices(shape, [i, i + 8]).unwrap())
            .collect();

        for kind in IndexKind::ALL {
            let mut index = kind.build(filters.len(), shape);
            fill(index.as_mut(), &filters);
            assert_eq!(index.size(), 8, "{}", kind);
        }
    }

    #[test]
    fn test_builder() {
        let index = IndexBuilder::new()
            .kind(IndexKind::NaturalBloofi)
            .shape(Shape::new(128, 3).unwrap())
            .expected_population(1000)
            .build()
            .unwrap();
        assert!(index.is_empty());
        assert_eq!(index.name(), "NaturalBloofi");
    }

    #[test]
    fn test_indexes_are_shareable_for_reads() {
        use std::sync::Arc;

        let shape = Shape::new(64, 2).unwrap();
        let mut bloofi = Bloofi::new(shape);
        for i in 0..32u32 {
            bloofi.add(Filter::from_indices(shape, [i, 63]).unwrap());
        }
        let shared = Arc::new(bloofi);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let index = Arc::clone(&shared);
                std::thread::spawn(move || {
                    index.count(&Filter::from_indices(index.shape(), [63]).unwrap())
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 32);
        }
    }
}
