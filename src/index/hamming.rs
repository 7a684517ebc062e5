//! Weight-ordered index (HammingIndex).
//!
//! A stored filter can only contain a query if it has at least as many set
//! bits. All distinct filters live in one ordered map keyed by
//!
//! ```text
//! (hamming weight, approximate log, [exact bit pattern])
//! ```
//!
//! so that every weight class is a contiguous key range. A query of weight
//! `w` scans only the classes `w, w+1, ..., max`, each through a pair of
//! sentinel keys, and tests containment on what falls inside.
//!
//! Inside a class the approximate log keeps similar patterns adjacent and
//! lets the scan start past every filter whose highest set bit lies below the
//! query's, since such a filter cannot be a superset.
//!
//! # Key Policies
//!
//! The approximate log only folds in the top [`DEFAULT_LOG_DEPTH`] bits
//! below the leading one, so two different patterns can share both weight
//! and log. [`KeyPolicy`] decides what happens then:
//!
//! | Policy | Colliding distinct filters |
//! |--------|----------------------------|
//! | [`KeyPolicy::Exact`] | kept apart by a full bit-pattern tiebreak |
//! | [`KeyPolicy::Approximate`] | merged into one node, counted as duplicates |
//!
//! `Approximate` keeps keys to two scalars but may miscount and may
//! delete a colliding neighbour. `Exact` is the default and gives exact
//! answers.
//!
//! [`DEFAULT_LOG_DEPTH`]: crate::core::DEFAULT_LOG_DEPTH

use crate::core::{Filter, FilterIndex, Shape, DEFAULT_LOG_DEPTH};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::Bound;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How node keys break ties between filters of equal weight and log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum KeyPolicy {
    /// Tiebreak on the exact bit pattern. No collisions.
    #[default]
    Exact,
    /// No tiebreak. Filters colliding on `(weight, log)` share one node.
    Approximate,
}

#[derive(Debug, Clone)]
struct HammingKey {
    weight: usize,
    log: f64,
    pattern: Option<Box<[u64]>>,
}

impl HammingKey {
    fn sentinel(weight: usize, log: f64) -> Self {
        Self {
            weight,
            log,
            pattern: None,
        }
    }
}

impl PartialEq for HammingKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HammingKey {}

impl PartialOrd for HammingKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HammingKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight
            .cmp(&other.weight)
            .then_with(|| self.log.total_cmp(&other.log))
            .then_with(|| self.pattern.cmp(&other.pattern))
    }
}

#[derive(Debug, Clone)]
struct HammingNode {
    filter: Filter,
    count: usize,
}

/// Ordered `(weight, log)` index.
///
/// # Examples
///
/// ```
/// use bloomindex::core::{Filter, FilterIndex, Shape};
/// use bloomindex::index::HammingIndex;
///
/// let shape = Shape::new(20, 3).unwrap();
/// let mut index = HammingIndex::new(shape);
///
/// let a = Filter::from_words(shape, vec![0b1_0011]).unwrap();
/// let c = Filter::from_words(shape, vec![0b10_0000]).unwrap();
/// index.add(a.clone());
/// index.add(c.clone());
///
/// assert_eq!(index.count(&a), 1);
/// assert_eq!(index.count(&Filter::new(shape)), 2);
/// ```
#[derive(Debug, Clone)]
pub struct HammingIndex {
    shape: Shape,
    policy: KeyPolicy,
    log_depth: usize,
    nodes: BTreeMap<HammingKey, HammingNode>,
    size: usize,
}

impl HammingIndex {
    /// Create an empty index using [`KeyPolicy::Exact`].
    #[must_use]
    pub fn new(shape: Shape) -> Self {
        Self::with_policy(shape, KeyPolicy::default())
    }

    /// Create an empty index with an explicit key policy.
    #[must_use]
    pub fn with_policy(shape: Shape, policy: KeyPolicy) -> Self {
        Self::with_log_depth(shape, policy, DEFAULT_LOG_DEPTH)
    }

    /// Create an empty index folding `log_depth` bits into the approximate log.
    #[must_use]
    pub fn with_log_depth(shape: Shape, policy: KeyPolicy, log_depth: usize) -> Self {
        Self {
            shape,
            policy,
            log_depth,
            nodes: BTreeMap::new(),
            size: 0,
        }
    }

    /// Key policy in use.
    #[must_use]
    pub fn policy(&self) -> KeyPolicy {
        self.policy
    }

    /// Number of nodes (distinct keys) stored.
    #[must_use]
    pub fn distinct(&self) -> usize {
        self.nodes.len()
    }

    /// Number of distinct Hamming weights currently stored.
    #[must_use]
    pub fn weight_classes(&self) -> usize {
        let mut classes = 0;
        let mut last = None;
        for key in self.nodes.keys() {
            if last != Some(key.weight) {
                classes += 1;
                last = Some(key.weight);
            }
        }
        classes
    }

    fn key_for(&self, filter: &Filter) -> HammingKey {
        HammingKey {
            weight: filter.cardinality(),
            log: filter.approx_log(self.log_depth),
            pattern: match self.policy {
                KeyPolicy::Exact => Some(filter.words().into()),
                KeyPolicy::Approximate => None,
            },
        }
    }

    /// Visit every node whose filter contains `query`.
    fn scan<'a>(&'a self, query: &Filter, mut on_match: impl FnMut(&'a HammingNode)) {
        let Some(max_weight) = self.nodes.keys().next_back().map(|k| k.weight) else {
            return;
        };
        // A superset's leading one is at or above the query's
        let floor = query
            .highest_bit()
            .map_or(f64::NEG_INFINITY, |bit| bit as f64);

        for weight in query.cardinality()..=max_weight {
            let lower = Bound::Included(HammingKey::sentinel(weight, floor));
            let upper = Bound::Excluded(HammingKey::sentinel(weight + 1, f64::NEG_INFINITY));
            for node in self.nodes.range((lower, upper)).map(|(_, n)| n) {
                if node.filter.contains(query) {
                    on_match(node);
                }
            }
        }
    }
}

impl FilterIndex for HammingIndex {
    fn add(&mut self, filter: Filter) {
        self.shape.assert_same(&filter.shape());
        let key = self.key_for(&filter);
        self.nodes
            .entry(key)
            .and_modify(|node| node.count += 1)
            .or_insert(HammingNode { filter, count: 1 });
        self.size += 1;
    }

    fn delete(&mut self, filter: &Filter) -> bool {
        self.shape.assert_same(&filter.shape());
        let key = self.key_for(filter);
        let Some(node) = self.nodes.get_mut(&key) else {
            return false;
        };
        node.count -= 1;
        if node.count == 0 {
            self.nodes.remove(&key);
        }
        self.size -= 1;
        true
    }

    fn count(&self, query: &Filter) -> usize {
        self.shape.assert_same(&query.shape());
        let mut total = 0;
        self.scan(query, |node| total += node.count);
        total
    }

    fn search(&self, query: &Filter, visit: &mut dyn FnMut(&Filter)) {
        self.shape.assert_same(&query.shape());
        self.scan(query, |node| {
            for _ in 0..node.count {
                visit(&node.filter);
            }
        });
    }

    fn size(&self) -> usize {
        self.size
    }

    fn name(&self) -> &'static str {
        "Hamming"
    }

    fn shape(&self) -> Shape {
        self.shape
    }
}
