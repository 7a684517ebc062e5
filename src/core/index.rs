//! The containment-index contract.
//!
//! Every strategy in [`crate::index`] implements [`FilterIndex`] and is
//! interchangeable behind it. An index stores a multiset of [`Filter`]s of
//! one [`Shape`] and answers, for a query filter, which stored filters are
//! supersets of the query (a *match*).
//!
//! # Guarantees
//!
//! 1. **Exact answers**: `count` and `search` report exactly the stored
//!    filters `f` with `f.contains(query)`. Internal pruning structures may
//!    cause wasted work but never missed or spurious matches.
//! 2. **Multiset semantics**: adding the same filter twice stores it twice.
//!    `count`, `search` and `size` all observe both copies; `delete` removes
//!    one copy at a time.
//! 3. **Absent deletes are no-ops**: `delete` of a filter that is not stored
//!    returns `false` and leaves the index unchanged.
//! 4. **Shape discipline**: passing a filter whose shape differs from
//!    [`shape`](FilterIndex::shape) panics.
//!
//! # Examples
//!
//! ```
//! use bloomindex::core::{Filter, FilterIndex, Shape};
//! use bloomindex::index::{IndexKind, LinearIndex};
//!
//! fn populate(index: &mut dyn FilterIndex, filters: &[Filter]) {
//!     for f in filters {
//!         index.add(f.clone());
//!     }
//! }
//!
//! let shape = Shape::new(20, 3).unwrap();
//! let a = Filter::from_words(shape, vec![0b1_0011]).unwrap();
//! let b = Filter::from_words(shape, vec![0b1_0111]).unwrap();
//!
//! for kind in IndexKind::ALL {
//!     let mut index = kind.build(100, shape);
//!     populate(index.as_mut(), &[a.clone(), b.clone()]);
//!     assert_eq!(index.count(&a), 2, "{}", index.name());
//! }
//! ```

use crate::core::{Filter, Shape};

/// A multiset of same-shape filters supporting superset queries.
///
/// Mutation requires exclusive access; queries only need `&self`, so a fully
/// built index can be shared across threads for read-only use.
pub trait FilterIndex: Send + Sync {
    /// Store one copy of `filter`.
    ///
    /// # Panics
    ///
    /// Panics if `filter.shape() != self.shape()`.
    fn add(&mut self, filter: Filter);

    /// Remove one copy of `filter`, matched by exact equality.
    ///
    /// Returns `true` if a copy was removed.
    ///
    /// # Panics
    ///
    /// Panics if `filter.shape() != self.shape()`.
    fn delete(&mut self, filter: &Filter) -> bool;

    /// Number of stored filters (with multiplicity) that contain `query`.
    ///
    /// # Panics
    ///
    /// Panics if `query.shape() != self.shape()`.
    fn count(&self, query: &Filter) -> usize;

    /// Call `visit` once per stored copy of every filter that contains `query`.
    ///
    /// Visit order is unspecified and differs between strategies.
    ///
    /// # Panics
    ///
    /// Panics if `query.shape() != self.shape()`.
    fn search(&self, query: &Filter, visit: &mut dyn FnMut(&Filter));

    /// Total stored filters, counting duplicates.
    fn size(&self) -> usize;

    /// Stable, human-readable strategy name.
    fn name(&self) -> &'static str;

    /// Shape every stored and queried filter must have.
    fn shape(&self) -> Shape;

    /// `true` if nothing is stored.
    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Collect every match of `query` into a vector.
    fn matches(&self, query: &Filter) -> Vec<Filter> {
        let mut out = Vec::new();
        self.search(query, &mut |f| out.push(f.clone()));
        out
    }

    /// `count` for each query in order.
    fn count_batch(&self, queries: &[Filter]) -> Vec<usize> {
        queries.iter().map(|q| self.count(q)).collect()
    }
}

impl<I: FilterIndex + ?Sized> FilterIndex for Box<I> {
    fn add(&mut self, filter: Filter) {
        (**self).add(filter);
    }

    fn delete(&mut self, filter: &Filter) -> bool {
        (**self).delete(filter)
    }

    fn count(&self, query: &Filter) -> usize {
        (**self).count(query)
    }

    fn search(&self, query: &Filter, visit: &mut dyn FnMut(&Filter)) {
        (**self).search(query, visit);
    }

    fn size(&self) -> usize {
        (**self).size()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn shape(&self) -> Shape {
        (**self).shape()
    }
}

/// Run `count` for every query across the rayon thread pool.
///
/// Results are returned in query order.
///
/// # Examples
///
/// ```
/// use bloomindex::core::{par_count_batch, Filter, FilterIndex, Shape};
/// use bloomindex::index::LinearIndex;
///
/// let shape = Shape::new(64, 2).unwrap();
/// let mut index = LinearIndex::new(shape);
/// index.add(Filter::from_indices(shape, [1, 2]).unwrap());
///
/// let queries = vec![
///     Filter::from_indices(shape, [1]).unwrap(),
///     Filter::from_indices(shape, [3]).unwrap(),
/// ];
/// assert_eq!(par_count_batch(&index, &queries), vec![1, 0]);
/// ```
#[cfg(feature = "rayon")]
pub fn par_count_batch<I>(index: &I, queries: &[Filter]) -> Vec<usize>
where
    I: FilterIndex + ?Sized,
{
    use rayon::prelude::*;

    queries.par_iter().map(|q| index.count(q)).collect()
}
