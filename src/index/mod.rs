//! Containment index strategies.
//!
//! | Strategy | Type | Pruning |
//! |----------|------|---------|
//! | `Linear` | [`LinearIndex`] | none, reference scan |
//! | `BFTrie4` / `BFTrie8` | [`BfTrie`] | per-chunk superset tables |
//! | `Hamming` | [`HammingIndex`] | weight classes ≥ query weight |
//! | `Bloofi` | [`Bloofi`] | OR-aggregates per subtree |
//! | `ShardedList` | [`ShardedList`] | OR-aggregate per shard, linear inside |
//! | `NaturalBloofi` | [`NaturalBloofi`] | OR-aggregate per shard, Bloofi inside |
//!
//! All implement [`FilterIndex`] and give identical answers for identical
//! contents. [`IndexKind`] names the closed set of strategies and builds
//! any of them from an expected population and a shape.
//!
//! # Examples
//!
//! ```
//! use bloomindex::core::{Filter, Shape};
//! use bloomindex::index::IndexKind;
//!
//! let shape = Shape::new(64, 3).unwrap();
//! let kind: IndexKind = "bftrie8".parse().unwrap();
//! let mut index = kind.build(10_000, shape);
//!
//! index.add(Filter::from_indices(shape, [1, 5, 40]).unwrap());
//! assert_eq!(index.count(&Filter::from_indices(shape, [5]).unwrap()), 1);
//! assert_eq!(index.name(), "BFTrie8");
//! ```

pub mod bloofi;
pub mod hamming;
pub mod linear;
pub mod sharded;
pub mod trie;

pub use bloofi::Bloofi;
pub use hamming::{HammingIndex, KeyPolicy};
pub use linear::LinearIndex;
pub use sharded::{NaturalBloofi, ShardConfig, Sharded, ShardedList};
pub use trie::{BfTrie, ChunkWidth};

use crate::core::{FilterIndex, Shape};
use crate::error::BloomIndexError;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The closed set of index strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum IndexKind {
    /// [`LinearIndex`].
    Linear,
    /// [`BfTrie`] with 4-bit chunks.
    BfTrie4,
    /// [`BfTrie`] with 8-bit chunks.
    BfTrie8,
    /// [`HammingIndex`] with [`KeyPolicy::Exact`].
    Hamming,
    /// [`Bloofi`] with its default order.
    Bloofi,
    /// [`ShardedList`].
    ShardedList,
    /// [`NaturalBloofi`].
    NaturalBloofi,
}

impl IndexKind {
    /// Every strategy, reference scan first.
    pub const ALL: [IndexKind; 7] = [
        IndexKind::Linear,
        IndexKind::BfTrie4,
        IndexKind::BfTrie8,
        IndexKind::Hamming,
        IndexKind::Bloofi,
        IndexKind::ShardedList,
        IndexKind::NaturalBloofi,
    ];

    /// Name reported by [`FilterIndex::name`] for this strategy.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Linear => "Linear",
            Self::BfTrie4 => "BFTrie4",
            Self::BfTrie8 => "BFTrie8",
            Self::Hamming => "Hamming",
            Self::Bloofi => "Bloofi",
            Self::ShardedList => "ShardedList",
            Self::NaturalBloofi => "NaturalBloofi",
        }
    }

    /// Build an empty index of this kind with default tuning.
    ///
    /// `expected_population` sizes shards and pre-allocation; it is a hint,
    /// not a limit.
    #[must_use]
    pub fn build(self, expected_population: usize, shape: Shape) -> Box<dyn FilterIndex> {
        match self {
            Self::Linear => Box::new(LinearIndex::with_capacity(shape, expected_population)),
            Self::BfTrie4 => Box::new(BfTrie::new(shape, ChunkWidth::Four)),
            Self::BfTrie8 => Box::new(BfTrie::new(shape, ChunkWidth::Eight)),
            Self::Hamming => Box::new(HammingIndex::new(shape)),
            Self::Bloofi => Box::new(Bloofi::new(shape)),
            Self::ShardedList => Box::new(ShardedList::new(shape, expected_population)),
            Self::NaturalBloofi => Box::new(NaturalBloofi::new(shape, expected_population)),
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IndexKind {
    type Err = BloomIndexError;

    /// Case-insensitive match on [`IndexKind::name`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| BloomIndexError::unknown_index_kind(s))
    }
}
