//! Multi-radix trie over fixed-width filter chunks (BFTrie).
//!
//! A filter is cut into chunks of 4 or 8 bits starting from the least
//! significant end. Each trie level consumes one chunk, and every inner node
//! keeps one child per chunk value present below it, sorted by value:
//!
//! ```text
//! filter bits:   ... [chunk 2][chunk 1][chunk 0]
//!                         │       │        │
//! root ── slot[chunk 0] ──┴─ slot[chunk 1] ┴── slot[chunk 2] ── ... ── leaf
//! ```
//!
//! # Pruned Search
//!
//! A stored filter contains the query iff every chunk of the stored filter
//! contains the corresponding query chunk. For each chunk value `q` the trie
//! precomputes the list of values `v` with `v & q == q`, so a search at each
//! level only visits children in that list. Nodes with fewer children than
//! candidates are scanned directly instead:
//!
//! | Query chunk | Candidate slots (width 4) |
//! |-------------|---------------------------|
//! | `0000` | all 16 |
//! | `1010` | `1010`, `1011`, `1110`, `1111` |
//! | `1111` | `1111` |
//!
//! # Residual Bits
//!
//! The trie is `bits / width` levels deep. When the width does not divide the
//! shape's bit count, the top `bits % width` bits are never routed on, so a
//! leaf may hold several distinct filters and a search re-checks full
//! containment there. Otherwise reaching a leaf through superset slots alone
//! proves the match.

use crate::core::{Filter, FilterIndex, Shape};
use crate::error::{BloomIndexError, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of filter bits consumed per trie level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ChunkWidth {
    /// 16-way fan-out.
    Four,
    /// 256-way fan-out.
    Eight,
}

impl ChunkWidth {
    /// Width in bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::Four => 4,
            Self::Eight => 8,
        }
    }

    /// Number of child slots per inner node.
    #[must_use]
    pub const fn fan_out(self) -> usize {
        1 << self.bits()
    }

    /// Parse a width given in bits.
    ///
    /// # Errors
    ///
    /// [`BloomIndexError::InvalidChunkWidth`] unless `bits` is 4 or 8.
    pub fn from_bits(bits: u32) -> Result<Self> {
        match bits {
            4 => Ok(Self::Four),
            8 => Ok(Self::Eight),
            other => Err(BloomIndexError::invalid_chunk_width(other)),
        }
    }
}

/// `table[q]` lists every chunk value `v` with `v & q == q`, ascending.
#[derive(Debug, Clone)]
struct SupersetTable {
    entries: Vec<Box<[u16]>>,
}

impl SupersetTable {
    fn new(width: ChunkWidth) -> Self {
        let fan_out = width.fan_out();
        let entries = (0..fan_out)
            .map(|q| {
                (0..fan_out)
                    .filter(|v| v & q == q)
                    .map(|v| v as u16)
                    .collect::<Vec<_>>()
                    .into_boxed_slice()
            })
            .collect();
        Self { entries }
    }

    #[inline]
    fn supersets(&self, chunk: usize) -> &[u16] {
        &self.entries[chunk]
    }
}

#[derive(Debug, Clone)]
struct LeafEntry {
    filter: Filter,
    count: usize,
}

/// Inner nodes keep only occupied slots, sorted by chunk value.
#[derive(Debug, Clone)]
enum TrieNode {
    Inner(Vec<(u16, TrieNode)>),
    Leaf(Vec<LeafEntry>),
}

impl TrieNode {
    fn is_empty(&self) -> bool {
        match self {
            Self::Inner(children) => children.is_empty(),
            Self::Leaf(entries) => entries.is_empty(),
        }
    }

    fn node_count(&self) -> usize {
        match self {
            Self::Inner(children) => {
                1 + children.iter().map(|(_, c)| c.node_count()).sum::<usize>()
            }
            Self::Leaf(_) => 1,
        }
    }
}

/// Per-instance routing parameters threaded through the recursive helpers.
#[derive(Debug, Clone)]
struct Layout {
    width: ChunkWidth,
    depth: usize,
    verify: bool,
    table: SupersetTable,
}

impl Layout {
    #[inline]
    fn chunk(&self, filter: &Filter, level: usize) -> u16 {
        filter.chunk(level * self.width.bits() as usize, self.width.bits()) as u16
    }

    fn new_child(&self, level: usize) -> TrieNode {
        if level + 1 < self.depth {
            TrieNode::Inner(Vec::new())
        } else {
            TrieNode::Leaf(Vec::new())
        }
    }
}

/// Bloom filter trie with 4- or 8-bit radix.
///
/// # Examples
///
/// ```
/// use bloomindex::core::{Filter, FilterIndex, Shape};
/// use bloomindex::index::{BfTrie, ChunkWidth};
///
/// let shape = Shape::new(20, 3).unwrap();
/// let mut trie = BfTrie::new(shape, ChunkWidth::Four);
///
/// let a = Filter::from_words(shape, vec![0b1_0011]).unwrap();
/// let b = Filter::from_words(shape, vec![0b1_0111]).unwrap();
/// trie.add(a.clone());
/// trie.add(b.clone());
///
/// assert_eq!(trie.count(&a), 2);
/// assert_eq!(trie.count(&b), 1);
/// assert_eq!(trie.name(), "BFTrie4");
/// ```
#[derive(Debug, Clone)]
pub struct BfTrie {
    shape: Shape,
    layout: Layout,
    root: TrieNode,
    size: usize,
}

impl BfTrie {
    /// Create an empty trie for `shape` with the given radix.
    #[must_use]
    pub fn new(shape: Shape, width: ChunkWidth) -> Self {
        let bits = shape.bits() as usize;
        let chunk_bits = width.bits() as usize;
        let depth = bits / chunk_bits;
        let layout = Layout {
            width,
            depth,
            verify: bits % chunk_bits != 0,
            table: SupersetTable::new(width),
        };

        #[cfg(feature = "trace")]
        tracing::debug!(
            shape = %shape,
            width = chunk_bits,
            depth,
            verify = layout.verify,
            "BfTrie::new"
        );

        let root = if depth == 0 {
            TrieNode::Leaf(Vec::new())
        } else {
            TrieNode::Inner(Vec::new())
        };

        Self {
            shape,
            layout,
            root,
            size: 0,
        }
    }

    /// Create a trie from a width given in bits.
    ///
    /// # Errors
    ///
    /// [`BloomIndexError::InvalidChunkWidth`] unless `width_bits` is 4 or 8.
    pub fn with_width_bits(shape: Shape, width_bits: u32) -> Result<Self> {
        Ok(Self::new(shape, ChunkWidth::from_bits(width_bits)?))
    }

    /// Radix in use.
    #[must_use]
    pub fn chunk_width(&self) -> ChunkWidth {
        self.layout.width
    }

    /// Number of chunk levels between the root and the leaves.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.layout.depth
    }

    /// `true` if leaves re-check containment because of residual high bits.
    #[must_use]
    pub fn verifies_leaves(&self) -> bool {
        self.layout.verify
    }

    /// Number of live trie nodes, root included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }

    fn insert(layout: &Layout, node: &mut TrieNode, level: usize, filter: Filter) {
        match node {
            TrieNode::Inner(children) => {
                let chunk = layout.chunk(&filter, level);
                let i = match children.binary_search_by_key(&chunk, |(c, _)| *c) {
                    Ok(i) => i,
                    Err(i) => {
                        children.insert(i, (chunk, layout.new_child(level)));
                        i
                    }
                };
                Self::insert(layout, &mut children[i].1, level + 1, filter);
            }
            TrieNode::Leaf(entries) => {
                match entries.iter_mut().find(|e| e.filter == filter) {
                    Some(entry) => entry.count += 1,
                    None => entries.push(LeafEntry { filter, count: 1 }),
                }
            }
        }
    }

    fn remove(layout: &Layout, node: &mut TrieNode, level: usize, filter: &Filter) -> bool {
        match node {
            TrieNode::Inner(children) => {
                let chunk = layout.chunk(filter, level);
                let Ok(i) = children.binary_search_by_key(&chunk, |(c, _)| *c) else {
                    return false;
                };
                if !Self::remove(layout, &mut children[i].1, level + 1, filter) {
                    return false;
                }
                if children[i].1.is_empty() {
                    children.remove(i);
                }
                true
            }
            TrieNode::Leaf(entries) => {
                let Some(pos) = entries.iter().position(|e| &e.filter == filter) else {
                    return false;
                };
                entries[pos].count -= 1;
                if entries[pos].count == 0 {
                    entries.swap_remove(pos);
                }
                true
            }
        }
    }

    fn walk(
        layout: &Layout,
        node: &TrieNode,
        level: usize,
        query: &Filter,
        on_match: &mut dyn FnMut(&LeafEntry),
    ) {
        match node {
            TrieNode::Inner(children) => {
                let q = layout.chunk(query, level);
                let candidates = layout.table.supersets(q as usize);
                if children.len() < candidates.len() {
                    // Sparse node: cheaper to scan what exists
                    for (v, child) in children {
                        if v & q == q {
                            Self::walk(layout, child, level + 1, query, on_match);
                        }
                    }
                } else {
                    for v in candidates {
                        if let Ok(i) = children.binary_search_by_key(v, |(c, _)| *c) {
                            Self::walk(layout, &children[i].1, level + 1, query, on_match);
                        }
                    }
                }
            }
            TrieNode::Leaf(entries) => {
                for entry in entries {
                    if !layout.verify || entry.filter.contains(query) {
                        on_match(entry);
                    }
                }
            }
        }
    }
}

impl FilterIndex for BfTrie {
    fn add(&mut self, filter: Filter) {
        self.shape.assert_same(&filter.shape());
        Self::insert(&self.layout, &mut self.root, 0, filter);
        self.size += 1;
    }

    fn delete(&mut self, filter: &Filter) -> bool {
        self.shape.assert_same(&filter.shape());
        let removed = Self::remove(&self.layout, &mut self.root, 0, filter);
        if removed {
            self.size -= 1;
        }
        removed
    }

    fn count(&self, query: &Filter) -> usize {
        self.shape.assert_same(&query.shape());
        let mut total = 0;
        Self::walk(&self.layout, &self.root, 0, query, &mut |e| total += e.count);
        total
    }

    fn search(&self, query: &Filter, visit: &mut dyn FnMut(&Filter)) {
        self.shape.assert_same(&query.shape());
        Self::walk(&self.layout, &self.root, 0, query, &mut |e| {
            for _ in 0..e.count {
                visit(&e.filter);
            }
        });
    }

    fn size(&self) -> usize {
        self.size
    }

    fn name(&self) -> &'static str {
        match self.layout.width {
            ChunkWidth::Four => "BFTrie4",
            ChunkWidth::Eight => "BFTrie8",
        }
    }

    fn shape(&self) -> Shape {
        self.shape
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f(shape: Shape, word: u64) -> Filter {
        Filter::from_words(shape, vec![word]).unwrap()
    }

    #[test]
    fn test_chunk_width_from_bits() {
        assert_eq!(ChunkWidth::from_bits(4).unwrap(), ChunkWidth::Four);
        assert_eq!(ChunkWidth::from_bits(8).unwrap(), ChunkWidth::Eight);
        assert_eq!(
            ChunkWidth::from_bits(5).unwrap_err(),
            BloomIndexError::invalid_chunk_width(5)
        );
        assert!(BfTrie::with_width_bits(Shape::new(16, 1).unwrap(), 3).is_err());
    }

    #[test]
    fn test_superset_table_four() {
        let table = SupersetTable::new(ChunkWidth::Four);
        assert_eq!(table.supersets(0).len(), 16);
        assert_eq!(table.supersets(0b1111), &[0b1111]);
        assert_eq!(table.supersets(0b1010), &[0b1010, 0b1011, 0b1110, 0b1111]);
    }

    #[test]
    fn test_superset_table_eight_sizes() {
        let table = SupersetTable::new(ChunkWidth::Eight);
        for q in 0..256usize {
            let expected = 1usize << (8 - q.count_ones());
            assert_eq!(table.supersets(q).len(), expected, "chunk {q:#010b}");
            assert!(table.supersets(q).iter().all(|&v| v as usize & q == q));
        }
    }

    #[test]
    fn test_layout_depth_and_verify() {
        let exact = BfTrie::new(Shape::new(64, 3).unwrap(), ChunkWidth::Eight);
        assert_eq!(exact.depth(), 8);
        assert!(!exact.verifies_leaves());

        let residual = BfTrie::new(Shape::new(20, 3).unwrap(), ChunkWidth::Eight);
        assert_eq!(residual.depth(), 2);
        assert!(residual.verifies_leaves());

        let tiny = BfTrie::new(Shape::new(3, 1).unwrap(), ChunkWidth::Four);
        assert_eq!(tiny.depth(), 0);
        assert_eq!(tiny.node_count(), 1);
    }

    #[test]
    fn test_reference_scenario_both_widths() {
        let shape = Shape::new(20, 3).unwrap();
        for width in [ChunkWidth::Four, ChunkWidth::Eight] {
            let mut trie = BfTrie::new(shape, width);
            let a = f(shape, 0b1_0011);
            let b = f(shape, 0b1_0111);
            let c = f(shape, 0b10_0000);
            trie.add(a.clone());
            trie.add(b.clone());
            trie.add(c.clone());

            assert_eq!(trie.count(&a), 2, "{}", trie.name());
            assert_eq!(trie.count(&b), 1);
            assert_eq!(trie.count(&c), 1);

            assert!(trie.delete(&b));
            assert_eq!(trie.count(&a), 1);
        }
    }

    #[test]
    fn test_residual_bits_are_verified() {
        // Width 8 over 20 bits leaves bits 16..20 unrouted
        let shape = Shape::new(20, 3).unwrap();
        let mut trie = BfTrie::new(shape, ChunkWidth::Eight);
        let low = f(shape, 0b1);
        let high = f(shape, 0b1 | 1 << 17);
        trie.add(low.clone());
        trie.add(high.clone());

        assert_eq!(trie.count(&low), 2);
        assert_eq!(trie.count(&high), 1);
        assert_eq!(trie.count(&f(shape, 1 << 18)), 0);
    }

    #[test]
    fn test_zero_query_matches_everything() {
        let shape = Shape::new(16, 2).unwrap();
        let mut trie = BfTrie::new(shape, ChunkWidth::Four);
        for word in [0x0001, 0x00F0, 0x0F00, 0xF000, 0xFFFF] {
            trie.add(f(shape, word));
        }
        assert_eq!(trie.count(&Filter::new(shape)), 5);
        assert_eq!(trie.count(&f(shape, 0x0100)), 2);
    }

    #[test]
    fn test_duplicates_and_search() {
        let shape = Shape::new(16, 2).unwrap();
        let mut trie = BfTrie::new(shape, ChunkWidth::Four);
        let a = f(shape, 0x1234);
        trie.add(a.clone());
        trie.add(a.clone());
        assert_eq!(trie.size(), 2);

        let mut seen = 0;
        trie.search(&f(shape, 0x0204), &mut |m| {
            assert_eq!(m, &a);
            seen += 1;
        });
        assert_eq!(seen, 2);

        assert!(trie.delete(&a));
        assert_eq!(trie.count(&a), 1);
        assert!(trie.delete(&a));
        assert_eq!(trie.count(&a), 0);
        assert!(!trie.delete(&a));
    }

    #[test]
    fn test_delete_prunes_empty_nodes() {
        let shape = Shape::new(16, 2).unwrap();
        let mut trie = BfTrie::new(shape, ChunkWidth::Four);
        assert_eq!(trie.node_count(), 1);

        let a = f(shape, 0x1234);
        let b = f(shape, 0x5234);
        trie.add(a.clone());
        trie.add(b.clone());
        // root + 3 shared inner levels + two leaves
        assert_eq!(trie.node_count(), 6);

        assert!(trie.delete(&a));
        assert_eq!(trie.node_count(), 5);
        assert!(trie.delete(&b));
        assert_eq!(trie.node_count(), 1);
        assert!(trie.is_empty());
    }

    #[test]
    fn test_delete_absent_leaves_trie_unchanged() {
        let shape = Shape::new(16, 2).unwrap();
        let mut trie = BfTrie::new(shape, ChunkWidth::Four);
        trie.add(f(shape, 0x1234));
        let nodes = trie.node_count();

        assert!(!trie.delete(&f(shape, 0x1235)));
        assert!(!trie.delete(&f(shape, 0x0234)));
        assert_eq!(trie.node_count(), nodes);
        assert_eq!(trie.size(), 1);
    }

    #[test]
    fn test_multiword_filters() {
        let shape = Shape::new(128, 4).unwrap();
        let mut trie = BfTrie::new(shape, ChunkWidth::Eight);
        let a = Filter::from_indices(shape, [3, 70, 127]).unwrap();
        let b = Filter::from_indices(shape, [3, 70]).unwrap();
        trie.add(a.clone());
        trie.add(b.clone());

        assert_eq!(trie.count(&b), 2);
        assert_eq!(trie.count(&a), 1);
        assert_eq!(trie.count(&Filter::from_indices(shape, [126]).unwrap()), 0);
    }
}
