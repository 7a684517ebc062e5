//! Bloom filter index tree (Bloofi).
//!
//! A height-balanced multiway tree over stored filters. Every inner node
//! carries an *aggregate*: the OR of all filters in its subtree. A query
//! only descends into children whose aggregate (or, at the bottom, whose
//! filter) contains it, so whole subtrees that cannot hold a superset are
//! skipped.
//!
//! ```text
//!                    root [agg = a|b|c|d|e]
//!                   /                      \
//!        inner [agg = a|b|c]          inner [agg = d|e]
//!        /       |       \              /        \
//!     leaf a  leaf b  leaf c         leaf d    leaf e
//! ```
//!
//! # Structure
//!
//! - The root is always an inner node; an empty tree is a root with no children
//! - All leaves sit at the same depth
//! - A non-root inner node holds between 1 and `2 × order` children and
//!   normally at least `order`
//! - Aggregates are [`CountingFilter`]s, so a leaf can leave without
//!   rescanning its siblings
//!
//! # Maintenance
//!
//! | Event | Action |
//! |-------|--------|
//! | Insert | route to the child nearest in Hamming distance, append a leaf |
//! | Overflow (`> 2 × order`) | split off the upper half, cascade upward, grow a new root |
//! | Underflow (`< order`) | borrow from a sibling with spare children, else merge into one |
//! | Root with one inner child | promote that child, shrink height |
//!
//! Nodes live in an arena and refer to each other by index, parents
//! included.
//!
//! # Examples
//!
//! ```
//! use bloomindex::core::{Filter, FilterIndex, Shape};
//! use bloomindex::index::Bloofi;
//!
//! let shape = Shape::new(20, 3).unwrap();
//! let mut tree = Bloofi::new(shape);
//!
//! let a = Filter::from_words(shape, vec![0b1_0011]).unwrap();
//! let b = Filter::from_words(shape, vec![0b1_0111]).unwrap();
//! tree.add(a.clone());
//! tree.add(b.clone());
//!
//! assert_eq!(tree.count(&a), 2);
//! assert!(tree.delete(&b));
//! assert_eq!(tree.count(&a), 1);
//! tree.validate().unwrap();
//! ```

use crate::core::{CountingFilter, Filter, FilterIndex, Shape};
use crate::error::{BloomIndexError, Result};
use std::collections::HashMap;

/// Default minimum fan-out.
pub const DEFAULT_ORDER: usize = 2;

/// Smallest accepted order.
pub const MIN_ORDER: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct NodeId(usize);

#[derive(Debug, Clone)]
enum Node {
    Inner {
        aggregate: CountingFilter,
        children: Vec<NodeId>,
        parent: Option<NodeId>,
    },
    Leaf {
        filter: Filter,
        count: usize,
        parent: NodeId,
    },
}

impl Node {
    /// What a query is tested against at this node.
    fn mask(&self) -> &Filter {
        match self {
            Self::Inner { aggregate, .. } => aggregate.as_filter(),
            Self::Leaf { filter, .. } => filter,
        }
    }

    fn parent(&self) -> Option<NodeId> {
        match self {
            Self::Inner { parent, .. } => *parent,
            Self::Leaf { parent, .. } => Some(*parent),
        }
    }

    fn set_parent(&mut self, id: NodeId) {
        match self {
            Self::Inner { parent, .. } => *parent = Some(id),
            Self::Leaf { parent, .. } => *parent = id,
        }
    }

    fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf { .. })
    }
}

/// Slot storage with index reuse.
#[derive(Debug, Clone, Default)]
struct Arena {
    slots: Vec<Option<Node>>,
    free: Vec<usize>,
    live: usize,
}

impl Arena {
    fn alloc(&mut self, node: Node) -> NodeId {
        self.live += 1;
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                NodeId(slot)
            }
            None => {
                self.slots.push(Some(node));
                NodeId(self.slots.len() - 1)
            }
        }
    }

    fn release(&mut self, id: NodeId) -> Node {
        match self.slots[id.0].take() {
            Some(node) => {
                self.live -= 1;
                self.free.push(id.0);
                node
            }
            None => panic!("Bloofi node {} released twice", id.0),
        }
    }

    fn get(&self, id: NodeId) -> &Node {
        match &self.slots[id.0] {
            Some(node) => node,
            None => panic!("Bloofi node {} used after release", id.0),
        }
    }

    fn get_mut(&mut self, id: NodeId) -> &mut Node {
        match &mut self.slots[id.0] {
            Some(node) => node,
            None => panic!("Bloofi node {} used after release", id.0),
        }
    }
}

/// How an insert picks the child to descend into.
#[derive(Debug, Clone, Copy)]
enum Route {
    Nearest,
    Rightmost,
}

/// Balanced aggregate tree over Bloom filters.
#[derive(Debug, Clone)]
pub struct Bloofi {
    shape: Shape,
    order: usize,
    arena: Arena,
    root: NodeId,
    /// Distinct stored filters.
    leaves: usize,
    /// Stored filters counting duplicates.
    size: usize,
}

impl Bloofi {
    /// Create an empty tree with [`DEFAULT_ORDER`].
    #[must_use]
    pub fn new(shape: Shape) -> Self {
        let mut arena = Arena::default();
        let root = arena.alloc(Node::Inner {
            aggregate: CountingFilter::new(shape),
            children: Vec::new(),
            parent: None,
        });
        Self {
            shape,
            order: DEFAULT_ORDER,
            arena,
            root,
            leaves: 0,
            size: 0,
        }
    }

    /// Create an empty tree whose nodes hold `order..=2*order` children.
    ///
    /// # Errors
    ///
    /// [`BloomIndexError::InvalidOrder`] if `order < MIN_ORDER`.
    pub fn with_order(shape: Shape, order: usize) -> Result<Self> {
        if order < MIN_ORDER {
            return Err(BloomIndexError::invalid_order(order, MIN_ORDER));
        }
        let mut tree = Self::new(shape);
        tree.order = order;
        Ok(tree)
    }

    /// Build a tree from a known population.
    ///
    /// Duplicates are folded first. The distinct filters are then chained
    /// greedily, each next one being the remaining filter nearest in Hamming
    /// distance to the previous, and appended in that order along the
    /// right-most path. Similar filters end up under the same parents. The
    /// chaining pass is quadratic in the number of distinct filters.
    ///
    /// # Errors
    ///
    /// - [`BloomIndexError::InvalidOrder`] if `order < MIN_ORDER`
    /// - [`BloomIndexError::ShapeMismatch`] if any filter's shape differs
    pub fn bulk_load<I>(shape: Shape, order: usize, filters: I) -> Result<Self>
    where
        I: IntoIterator<Item = Filter>,
    {
        let mut tree = Self::with_order(shape, order)?;

        let mut distinct: Vec<(Filter, usize)> = Vec::new();
        let mut positions: HashMap<Filter, usize> = HashMap::new();
        for filter in filters {
            shape.check_same(&filter.shape())?;
            match positions.get(&filter) {
                Some(&i) => distinct[i].1 += 1,
                None => {
                    positions.insert(filter.clone(), distinct.len());
                    distinct.push((filter, 1));
                }
            }
        }
        drop(positions);

        let mut chained = Vec::with_capacity(distinct.len());
        if !distinct.is_empty() {
            chained.push(distinct.swap_remove(0));
        }
        while let Some((last, _)) = chained.last() {
            let nearest = distinct
                .iter()
                .enumerate()
                .min_by_key(|(_, (f, _))| f.hamming_distance(last))
                .map(|(i, _)| i);
            match nearest {
                Some(i) => chained.push(distinct.swap_remove(i)),
                None => break,
            }
        }

        #[cfg(feature = "trace")]
        tracing::debug!(distinct = chained.len(), order, "Bloofi::bulk_load");

        for (filter, count) in chained {
            tree.insert_leaf(filter, count, Route::Rightmost);
        }
        Ok(tree)
    }

    /// Minimum fan-out of non-root inner nodes.
    #[must_use]
    pub fn order(&self) -> usize {
        self.order
    }

    /// Levels from the root down to the leaves, both included.
    ///
    /// An empty tree has height 1.
    #[must_use]
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut cur = self.root;
        while let Some(&first) = self.children(cur).first() {
            height += 1;
            cur = first;
        }
        height
    }

    /// Live nodes, root and leaves included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.arena.live
    }

    /// Distinct filters stored.
    #[must_use]
    pub fn distinct(&self) -> usize {
        self.leaves
    }

    /// OR of every stored filter, with per-bit leaf counts.
    #[must_use]
    pub fn root_aggregate(&self) -> &CountingFilter {
        match self.arena.get(self.root) {
            Node::Inner { aggregate, .. } => aggregate,
            Node::Leaf { .. } => unreachable!("Bloofi root is always an inner node"),
        }
    }

    /// Add one copy of `filter` only if an identical filter is already stored.
    ///
    /// Returns `true` if the copy was added.
    #[track_caller]
    pub fn try_increment(&mut self, filter: &Filter) -> bool {
        self.shape.assert_same(&filter.shape());
        let Some(id) = self.locate(filter) else {
            return false;
        };
        if let Node::Leaf { count, .. } = self.arena.get_mut(id) {
            *count += 1;
        }
        self.size += 1;
        true
    }

    /// Check every structural invariant of the tree.
    ///
    /// Recomputes each aggregate from its children and compares, checks
    /// parent links, fan-out bounds, uniform leaf depth, and the size
    /// counters. Meant for tests and debugging; cost is linear in the tree.
    ///
    /// # Errors
    ///
    /// [`BloomIndexError::InternalError`] describing the first violation found.
    pub fn validate(&self) -> Result<()> {
        let root = self.arena.get(self.root);
        if root.is_leaf() || root.parent().is_some() {
            return Err(BloomIndexError::internal_error(
                "root must be a parentless inner node",
            ));
        }

        let mut reachable = 0;
        let mut leaves = 0;
        let mut size = 0;
        let mut leaf_depth = None;
        let mut stack = vec![(self.root, 0usize)];

        while let Some((id, depth)) = stack.pop() {
            reachable += 1;
            match self.arena.get(id) {
                Node::Leaf { count, .. } => {
                    if *count == 0 {
                        return Err(BloomIndexError::internal_error(format!(
                            "leaf {} has zero count",
                            id.0
                        )));
                    }
                    leaves += 1;
                    size += count;
                    match leaf_depth {
                        None => leaf_depth = Some(depth),
                        Some(d) if d != depth => {
                            return Err(BloomIndexError::internal_error(format!(
                                "leaves at depths {} and {}",
                                d, depth
                            )));
                        }
                        Some(_) => {}
                    }
                }
                Node::Inner {
                    aggregate,
                    children,
                    ..
                } => {
                    if id != self.root && children.is_empty() {
                        return Err(BloomIndexError::internal_error(format!(
                            "inner node {} has no children",
                            id.0
                        )));
                    }
                    if children.len() > 2 * self.order {
                        return Err(BloomIndexError::internal_error(format!(
                            "inner node {} has {} children, limit {}",
                            id.0,
                            children.len(),
                            2 * self.order
                        )));
                    }
                    let leaf_children = children
                        .iter()
                        .filter(|&&c| self.arena.get(c).is_leaf())
                        .count();
                    if leaf_children != 0 && leaf_children != children.len() {
                        return Err(BloomIndexError::internal_error(format!(
                            "inner node {} mixes leaf and inner children",
                            id.0
                        )));
                    }
                    for &child in children {
                        if self.arena.get(child).parent() != Some(id) {
                            return Err(BloomIndexError::internal_error(format!(
                                "node {} does not point back to parent {}",
                                child.0, id.0
                            )));
                        }
                        stack.push((child, depth + 1));
                    }
                    if *aggregate != self.aggregate_of(children) {
                        return Err(BloomIndexError::internal_error(format!(
                            "aggregate of node {} is out of sync with its children",
                            id.0
                        )));
                    }
                }
            }
        }

        if reachable != self.arena.live {
            return Err(BloomIndexError::internal_error(format!(
                "{} live nodes but {} reachable",
                self.arena.live, reachable
            )));
        }
        if leaves != self.leaves || size != self.size {
            return Err(BloomIndexError::internal_error(format!(
                "counters say {}/{} leaves/size, tree holds {}/{}",
                self.leaves, self.size, leaves, size
            )));
        }
        Ok(())
    }

    fn children(&self, id: NodeId) -> &[NodeId] {
        match self.arena.get(id) {
            Node::Inner { children, .. } => children,
            Node::Leaf { .. } => &[],
        }
    }

    fn children_mut(&mut self, id: NodeId) -> &mut Vec<NodeId> {
        match self.arena.get_mut(id) {
            Node::Inner { children, .. } => children,
            Node::Leaf { .. } => unreachable!("leaf {} has no children", id.0),
        }
    }

    fn aggregate_mut(&mut self, id: NodeId) -> &mut CountingFilter {
        match self.arena.get_mut(id) {
            Node::Inner { aggregate, .. } => aggregate,
            Node::Leaf { .. } => unreachable!("leaf {} has no aggregate", id.0),
        }
    }

    fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.arena.get(id).parent()
    }

    /// Aggregate recomputed from scratch over `children`.
    fn aggregate_of(&self, children: &[NodeId]) -> CountingFilter {
        let mut aggregate = CountingFilter::new(self.shape);
        for &child in children {
            match self.arena.get(child) {
                Node::Leaf { filter, .. } => aggregate.add(filter),
                Node::Inner { aggregate: a, .. } => aggregate.add_counts(a),
            }
        }
        aggregate
    }

    fn aggregate_consistent(&self, id: NodeId) -> bool {
        match self.arena.get(id) {
            Node::Inner {
                aggregate,
                children,
                ..
            } => *aggregate == self.aggregate_of(children),
            Node::Leaf { .. } => true,
        }
    }

    /// Leaf holding exactly `filter`, searching only subtrees that contain it.
    fn locate(&self, filter: &Filter) -> Option<NodeId> {
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = self.arena.get(id);
            if !node.mask().contains(filter) {
                continue;
            }
            match node {
                Node::Leaf { filter: stored, .. } => {
                    if stored == filter {
                        return Some(id);
                    }
                }
                Node::Inner { children, .. } => stack.extend_from_slice(children),
            }
        }
        None
    }

    fn for_each_match(&self, query: &Filter, mut on_match: impl FnMut(&Filter, usize)) {
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = self.arena.get(id);
            if !node.mask().contains(query) {
                continue;
            }
            match node {
                Node::Leaf { filter, count, .. } => on_match(filter, *count),
                Node::Inner { children, .. } => stack.extend_from_slice(children),
            }
        }
    }

    /// Child of `id` to descend into, or `None` if `id` sits directly above leaves.
    fn next_hop(&self, id: NodeId, filter: &Filter, route: Route) -> Option<NodeId> {
        let children = self.children(id);
        let first = *children.first()?;
        if self.arena.get(first).is_leaf() {
            return None;
        }
        match route {
            Route::Nearest => children
                .iter()
                .copied()
                .min_by_key(|&c| self.arena.get(c).mask().hamming_distance(filter)),
            Route::Rightmost => children.last().copied(),
        }
    }

    fn insert_leaf(&mut self, filter: Filter, count: usize, route: Route) {
        let mut cur = self.root;
        loop {
            self.aggregate_mut(cur).add(&filter);
            match self.next_hop(cur, &filter, route) {
                Some(child) => cur = child,
                None => break,
            }
        }

        let leaf = self.arena.alloc(Node::Leaf {
            filter,
            count,
            parent: cur,
        });
        self.children_mut(cur).push(leaf);
        self.leaves += 1;
        self.size += count;
        self.split_overflowing(cur);
    }

    /// Split `id` while it holds more than `2 × order` children, cascading upward.
    fn split_overflowing(&mut self, mut id: NodeId) {
        while self.children(id).len() > 2 * self.order {
            let parent = self.parent_of(id);
            let moved = {
                let children = self.children_mut(id);
                let at = children.len() / 2;
                children.split_off(at)
            };
            let kept = self.aggregate_of(self.children(id));
            *self.aggregate_mut(id) = kept;

            let aggregate = self.aggregate_of(&moved);
            let sibling = self.arena.alloc(Node::Inner {
                aggregate,
                children: moved.clone(),
                parent,
            });
            for &child in &moved {
                self.arena.get_mut(child).set_parent(sibling);
            }
            debug_assert!(self.aggregate_consistent(id));
            debug_assert!(self.aggregate_consistent(sibling));

            #[cfg(feature = "trace")]
            tracing::debug!(node = id.0, sibling = sibling.0, "Bloofi split");

            match parent {
                Some(p) => {
                    let siblings = self.children_mut(p);
                    let at = siblings
                        .iter()
                        .position(|&c| c == id)
                        .map_or(siblings.len(), |i| i + 1);
                    siblings.insert(at, sibling);
                    id = p;
                }
                None => {
                    let aggregate = self.aggregate_of(&[id, sibling]);
                    let root = self.arena.alloc(Node::Inner {
                        aggregate,
                        children: vec![id, sibling],
                        parent: None,
                    });
                    self.arena.get_mut(id).set_parent(root);
                    self.arena.get_mut(sibling).set_parent(root);
                    self.root = root;

                    #[cfg(feature = "trace")]
                    tracing::debug!(height = self.height(), "Bloofi root split");
                    break;
                }
            }
        }
    }

    /// Restore fan-out bounds from `id` upward after a removal.
    fn rebalance(&mut self, mut id: NodeId) {
        loop {
            if id == self.root {
                self.collapse_root();
                return;
            }
            let Some(parent) = self.parent_of(id) else {
                return;
            };

            let len = self.children(id).len();
            if len == 0 {
                self.children_mut(parent).retain(|&c| c != id);
                self.arena.release(id);
                id = parent;
                continue;
            }
            if len >= self.order {
                return;
            }

            let siblings = self.children(parent);
            let pos = siblings
                .iter()
                .position(|&c| c == id)
                .unwrap_or_else(|| unreachable!("node {} missing from its parent", id.0));
            let left = pos.checked_sub(1).map(|i| siblings[i]);
            let right = siblings.get(pos + 1).copied();

            let donor = [left, right]
                .into_iter()
                .flatten()
                .find(|&s| self.children(s).len() > self.order);
            if let Some(donor) = donor {
                self.redistribute(id, donor, Some(donor) == left);
                return;
            }

            if let Some(target) = left.or(right) {
                self.merge(id, target, parent, Some(target) == left);
            }
            id = parent;
        }
    }

    /// Move children from `donor` into `id` until they split the total evenly.
    fn redistribute(&mut self, id: NodeId, donor: NodeId, donor_is_left: bool) {
        let have = self.children(id).len();
        let total = have + self.children(donor).len();
        let take = total / 2 - have;

        let moved: Vec<NodeId> = {
            let from = self.children_mut(donor);
            if donor_is_left {
                let at = from.len() - take;
                from.split_off(at)
            } else {
                from.drain(..take).collect()
            }
        };
        for &child in &moved {
            self.move_contribution(child, donor, id);
        }

        let to = self.children_mut(id);
        if donor_is_left {
            let mut joined = moved;
            joined.extend_from_slice(to);
            *to = joined;
        } else {
            to.extend(moved);
        }

        debug_assert!(self.aggregate_consistent(id));
        debug_assert!(self.aggregate_consistent(donor));

        #[cfg(feature = "trace")]
        tracing::debug!(node = id.0, donor = donor.0, moved = take, "Bloofi redistribute");
    }

    /// Fold all of `id`'s children into `target` and drop `id`.
    fn merge(&mut self, id: NodeId, target: NodeId, parent: NodeId, target_is_left: bool) {
        let (aggregate, children) = match self.arena.release(id) {
            Node::Inner {
                aggregate,
                children,
                ..
            } => (aggregate, children),
            Node::Leaf { .. } => unreachable!("only inner nodes merge"),
        };
        for &child in &children {
            self.arena.get_mut(child).set_parent(target);
        }
        self.aggregate_mut(target).add_counts(&aggregate);

        let into = self.children_mut(target);
        if target_is_left {
            into.extend(children);
        } else {
            let mut joined = children;
            joined.extend_from_slice(into);
            *into = joined;
        }
        self.children_mut(parent).retain(|&c| c != id);

        debug_assert!(self.aggregate_consistent(target));

        #[cfg(feature = "trace")]
        tracing::debug!(node = id.0, target = target.0, "Bloofi merge");
    }

    /// Shift `child`'s contribution from `from`'s aggregate to `to`'s and reparent it.
    fn move_contribution(&mut self, child: NodeId, from: NodeId, to: NodeId) {
        match self.arena.get(child) {
            Node::Leaf { filter, .. } => {
                let filter = filter.clone();
                self.aggregate_mut(from).subtract(&filter);
                self.aggregate_mut(to).add(&filter);
            }
            Node::Inner { aggregate, .. } => {
                let aggregate = aggregate.clone();
                self.aggregate_mut(from).subtract_counts(&aggregate);
                self.aggregate_mut(to).add_counts(&aggregate);
            }
        }
        self.arena.get_mut(child).set_parent(to);
    }

    /// Promote a lone inner child of the root until the root branches.
    fn collapse_root(&mut self) {
        loop {
            let only = match self.children(self.root) {
                [only] => *only,
                _ => return,
            };
            if self.arena.get(only).is_leaf() {
                return;
            }
            self.arena.release(self.root);
            if let Node::Inner { parent, .. } = self.arena.get_mut(only) {
                *parent = None;
            }
            self.root = only;

            #[cfg(feature = "trace")]
            tracing::debug!(root = only.0, "Bloofi root collapse");
        }
    }
}

impl FilterIndex for Bloofi {
    fn add(&mut self, filter: Filter) {
        self.shape.assert_same(&filter.shape());
        if self.try_increment(&filter) {
            return;
        }
        self.insert_leaf(filter, 1, Route::Nearest);
    }

    fn delete(&mut self, filter: &Filter) -> bool {
        self.shape.assert_same(&filter.shape());
        let Some(id) = self.locate(filter) else {
            return false;
        };
        self.size -= 1;
        if let Node::Leaf { count, .. } = self.arena.get_mut(id) {
            *count -= 1;
            if *count > 0 {
                return true;
            }
        }

        let (removed, parent) = match self.arena.release(id) {
            Node::Leaf { filter, parent, .. } => (filter, parent),
            Node::Inner { .. } => unreachable!("locate only returns leaves"),
        };
        self.children_mut(parent).retain(|&c| c != id);
        let mut ancestor = Some(parent);
        while let Some(a) = ancestor {
            self.aggregate_mut(a).subtract(&removed);
            ancestor = self.parent_of(a);
        }
        self.leaves -= 1;
        self.rebalance(parent);
        true
    }

    fn count(&self, query: &Filter) -> usize {
        self.shape.assert_same(&query.shape());
        let mut total = 0;
        self.for_each_match(query, |_, count| total += count);
        total
    }

    fn search(&self, query: &Filter, visit: &mut dyn FnMut(&Filter)) {
        self.shape.assert_same(&query.shape());
        self.for_each_match(query, |filter, count| {
            for _ in 0..count {
                visit(filter);
            }
        });
    }

    fn size(&self) -> usize {
        self.size
    }

    fn name(&self) -> &'static str {
        "Bloofi"
    }

    fn shape(&self) -> Shape {
        self.shape
    }
}
