//! Linear-scan reference index.
//!
//! Stores each distinct filter once alongside its multiplicity and answers
//! every query by testing all of them. Used as the correctness oracle the
//! other strategies are compared against, and as the baseline they must beat.

use crate::core::{Filter, FilterIndex, Shape};
use std::collections::HashMap;

/// Exhaustive scan over a `filter -> multiplicity` map.
///
/// # Examples
///
/// ```
/// use bloomindex::core::{Filter, FilterIndex, Shape};
/// use bloomindex::index::LinearIndex;
///
/// let shape = Shape::new(32, 2).unwrap();
/// let mut index = LinearIndex::new(shape);
/// let f = Filter::from_indices(shape, [3, 9]).unwrap();
///
/// index.add(f.clone());
/// index.add(f.clone());
/// assert_eq!(index.size(), 2);
/// assert_eq!(index.distinct(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct LinearIndex {
    shape: Shape,
    entries: HashMap<Filter, usize>,
    size: usize,
}

impl LinearIndex {
    /// Create an empty index for filters of `shape`.
    #[must_use]
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            entries: HashMap::new(),
            size: 0,
        }
    }

    /// Create an empty index with room for `capacity` distinct filters.
    #[must_use]
    pub fn with_capacity(shape: Shape, capacity: usize) -> Self {
        Self {
            shape,
            entries: HashMap::with_capacity(capacity),
            size: 0,
        }
    }

    /// Number of distinct filters stored.
    #[must_use]
    pub fn distinct(&self) -> usize {
        self.entries.len()
    }

    /// Multiplicity of exactly `filter`.
    #[must_use]
    pub fn multiplicity(&self, filter: &Filter) -> usize {
        self.entries.get(filter).copied().unwrap_or(0)
    }
}

impl FilterIndex for LinearIndex {
    fn add(&mut self, filter: Filter) {
        self.shape.assert_same(&filter.shape());
        *self.entries.entry(filter).or_insert(0) += 1;
        self.size += 1;
    }

    fn delete(&mut self, filter: &Filter) -> bool {
        self.shape.assert_same(&filter.shape());
        let Some(count) = self.entries.get_mut(filter) else {
            return false;
        };
        *count -= 1;
        if *count == 0 {
            self.entries.remove(filter);
        }
        self.size -= 1;
        true
    }

    fn count(&self, query: &Filter) -> usize {
        self.shape.assert_same(&query.shape());
        self.entries
            .iter()
            .filter(|(f, _)| f.contains(query))
            .map(|(_, &n)| n)
            .sum()
    }

    fn search(&self, query: &Filter, visit: &mut dyn FnMut(&Filter)) {
        self.shape.assert_same(&query.shape());
        for (filter, &n) in &self.entries {
            if filter.contains(query) {
                for _ in 0..n {
                    visit(filter);
                }
            }
        }
    }

    fn size(&self) -> usize {
        self.size
    }

    fn name(&self) -> &'static str {
        "Linear"
    }

    fn shape(&self) -> Shape {
        self.shape
    }
}
