//! Operation metrics for containment indexes.
//!
//! [`MeteredIndex`] wraps any [`FilterIndex`] and records every call into a
//! [`MetricsCollector`]. The wrapper is itself a `FilterIndex`, so it drops
//! into any code that takes one, including `Box<dyn FilterIndex>`.
//!
//! ```text
//!   caller ──► MeteredIndex<I> ──► I (Bloofi, BfTrie, ...)
//!                   │
//!                   ▼
//!            MetricsCollector ──► MetricsSnapshot ──► Prometheus / JSON
//!             ├─ counters (adds, deletes hit/miss, queries, matches)
//!             └─ LatencyHistogram × 2 (add, query)
//! ```
//!
//! # Examples
//!
//! ```
//! use bloomindex::core::{Filter, FilterIndex, Shape};
//! use bloomindex::index::Bloofi;
//! use bloomindex::metrics::MeteredIndex;
//!
//! let shape = Shape::new(64, 3).unwrap();
//! let mut index = MeteredIndex::new(Bloofi::new(shape));
//!
//! index.add(Filter::from_indices(shape, [1, 2, 3]).unwrap());
//! index.add(Filter::from_indices(shape, [2, 3, 4]).unwrap());
//! assert_eq!(index.count(&Filter::from_indices(shape, [2, 3]).unwrap()), 2);
//!
//! let snapshot = index.metrics().snapshot();
//! assert_eq!(snapshot.adds, 2);
//! assert_eq!(snapshot.queries, 1);
//! assert_eq!(snapshot.matches, 2);
//! ```

mod collector;
mod histogram;

pub use collector::{MetricsCollector, MetricsSnapshot};
pub use histogram::{LatencyHistogram, LatencyStats};

use crate::core::{Filter, FilterIndex, Shape};
use std::time::Instant;

/// A [`FilterIndex`] that records its own traffic.
#[derive(Debug)]
pub struct MeteredIndex<I> {
    inner: I,
    metrics: MetricsCollector,
}

impl<I: FilterIndex> MeteredIndex<I> {
    /// Wrap `inner` with a fresh collector.
    pub fn new(inner: I) -> Self {
        Self::with_collector(inner, MetricsCollector::new())
    }

    /// Wrap `inner`, recording into an existing collector. Several indexes
    /// may share one collector to report aggregate traffic.
    pub fn with_collector(inner: I, metrics: MetricsCollector) -> Self {
        Self { inner, metrics }
    }

    /// The collector this wrapper records into.
    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// The wrapped index.
    pub fn inner(&self) -> &I {
        &self.inner
    }

    /// Unwrap, discarding the collector.
    pub fn into_inner(self) -> I {
        self.inner
    }
}

impl<I: FilterIndex> FilterIndex for MeteredIndex<I> {
    fn add(&mut self, filter: Filter) {
        let start = Instant::now();
        self.inner.add(filter);
        self.metrics.record_add(start.elapsed());
    }

    fn delete(&mut self, filter: &Filter) -> bool {
        let hit = self.inner.delete(filter);
        self.metrics.record_delete(hit);
        hit
    }

    fn count(&self, query: &Filter) -> usize {
        let start = Instant::now();
        let n = self.inner.count(query);
        self.metrics.record_query(n, start.elapsed());
        n
    }

    fn search(&self, query: &Filter, visit: &mut dyn FnMut(&Filter)) {
        let start = Instant::now();
        let mut n = 0usize;
        self.inner.search(query, &mut |f| {
            n += 1;
            visit(f);
        });
        self.metrics.record_query(n, start.elapsed());
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn shape(&self) -> Shape {
        self.inner.shape()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{IndexKind, LinearIndex};

    fn filter(shape: Shape, bits: &[u32]) -> Filter {
        Filter::from_indices(shape, bits.iter().copied()).unwrap()
    }

    #[test]
    fn test_metered_index_is_transparent() {
        let shape = Shape::new(32, 2).unwrap();
        let mut plain = LinearIndex::new(shape);
        let mut metered = MeteredIndex::new(LinearIndex::new(shape));

        for bits in [&[1u32, 2][..], &[2, 3], &[1, 2, 3], &[1, 2]] {
            plain.add(filter(shape, bits));
            metered.add(filter(shape, bits));
        }

        let q = filter(shape, &[2]);
        assert_eq!(metered.count(&q), plain.count(&q));
        assert_eq!(metered.size(), plain.size());
        assert_eq!(metered.name(), "Linear");
        assert_eq!(metered.shape(), shape);
    }

    #[test]
    fn test_records_every_operation() {
        let shape = Shape::new(32, 2).unwrap();
        let mut index = MeteredIndex::new(LinearIndex::new(shape));
        let a = filter(shape, &[1, 2]);
        let b = filter(shape, &[1, 2, 3]);

        index.add(a.clone());
        index.add(b.clone());
        assert!(index.delete(&a));
        assert!(!index.delete(&a));

        let mut seen = Vec::new();
        index.search(&filter(shape, &[1]), &mut |f| seen.push(f.clone()));
        assert_eq!(seen, vec![b]);
        assert_eq!(index.count(&filter(shape, &[9])), 0);

        let s = index.metrics().snapshot();
        assert_eq!(s.adds, 2);
        assert_eq!(s.deletes_hit, 1);
        assert_eq!(s.deletes_miss, 1);
        assert_eq!(s.queries, 2);
        assert_eq!(s.matches, 1);
    }

    #[test]
    fn test_shared_collector_across_strategies() {
        let shape = Shape::new(64, 3).unwrap();
        let metrics = MetricsCollector::new();
        let mut indexes: Vec<_> = IndexKind::ALL
            .into_iter()
            .map(|kind| MeteredIndex::with_collector(kind.build(100, shape), metrics.clone()))
            .collect();

        for index in &mut indexes {
            index.add(filter(shape, &[5, 6, 7]));
        }

        assert_eq!(metrics.total_adds(), IndexKind::ALL.len() as u64);
        let boxed = indexes.pop().unwrap().into_inner();
        assert_eq!(boxed.size(), 1);
    }
}
