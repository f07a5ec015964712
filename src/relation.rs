//! Node containment index
//!
//! Decodes the compact parent encoding into a bidirectional index:
//! `up` gives the single parent of a node, `down` its children in
//! encoding order. Parents always live at the next coarser node type.
//!
//! The encoding is one line per parent:
//!
//! ```text
//! 0-2,7<TAB>10
//! ```
//!
//! meaning nodes 0, 1, 2 and 7 are children of node 10.

use crate::bytes::{bs_atoi, bs_lines, bs_split_once};
use crate::corpus::{NodeId, NodeSet};
use crate::error::CorpusError;
use rustc_hash::FxHashMap;

/// Bidirectional parent/children index
#[derive(Debug, Clone, Default)]
pub struct RelationIndex {
    up: FxHashMap<NodeId, NodeId>,
    down: FxHashMap<NodeId, NodeSet>,
}

impl RelationIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the compact parent encoding
    pub fn decode(data: &[u8]) -> Result<Self, CorpusError> {
        let mut index = Self::new();

        for (line_num, line) in bs_lines(data) {
            let line = line.trim_ascii();
            if line.is_empty() {
                continue;
            }

            let Some((ranges, parent)) = bs_split_once(line, b'\t') else {
                return Err(CorpusError::malformed(line_num, "expected <ranges>TAB<parent>"));
            };
            let parent = bs_atoi(parent.trim_ascii()).ok_or_else(|| {
                CorpusError::malformed(
                    line_num,
                    format!("bad parent {:?}", String::from_utf8_lossy(parent)),
                )
            })?;

            for spec in ranges.split(|&b| b == b',') {
                let (first, last) = parse_range(spec.trim_ascii()).ok_or_else(|| {
                    CorpusError::malformed(
                        line_num,
                        format!("bad range {:?}", String::from_utf8_lossy(spec)),
                    )
                })?;
                for child in first..=last {
                    index.insert(child, parent);
                }
            }
        }

        Ok(index)
    }

    /// Build an index from explicit `(child, parent)` pairs
    pub fn from_pairs(pairs: impl IntoIterator<Item = (NodeId, NodeId)>) -> Self {
        let mut index = Self::new();
        for (child, parent) in pairs {
            index.insert(child, parent);
        }
        index
    }

    /// Record `parent` as the parent of `child`
    ///
    /// A later assignment wins; the child is moved out of the previous
    /// parent's children so `down` stays the inverse of `up`.
    pub fn insert(&mut self, child: NodeId, parent: NodeId) {
        if let Some(old) = self.up.insert(child, parent) {
            if old == parent {
                return;
            }
            if let Some(siblings) = self.down.get_mut(&old) {
                siblings.shift_remove(&child);
                if siblings.is_empty() {
                    self.down.remove(&old);
                }
            }
        }
        self.down.entry(parent).or_default().insert(child);
    }

    /// Get the parent of a node
    #[inline]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.up.get(&node).copied()
    }

    /// Get the children of a node (empty for leaves and unknown nodes)
    pub fn children(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.down.get(&node).into_iter().flat_map(|c| c.iter().copied())
    }

    pub fn has_children(&self, node: NodeId) -> bool {
        self.down.contains_key(&node)
    }

    /// Ancestors of a node, nearest first
    pub fn ancestors(&self, node: NodeId) -> Ancestors<'_> {
        Ancestors {
            index: self,
            current: node,
        }
    }

    /// Number of nodes that have a parent
    pub fn len(&self) -> usize {
        self.up.len()
    }

    pub fn is_empty(&self) -> bool {
        self.up.is_empty()
    }
}

/// Iterator walking `up` until a root is reached
pub struct Ancestors<'a> {
    index: &'a RelationIndex,
    current: NodeId,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let parent = self.index.parent(self.current)?;
        self.current = parent;
        Some(parent)
    }
}

/// Parse `n` or `a-b` into an inclusive pair
fn parse_range(spec: &[u8]) -> Option<(NodeId, NodeId)> {
    match bs_split_once(spec, b'-') {
        Some((a, b)) => Some((bs_atoi(a.trim_ascii())?, bs_atoi(b.trim_ascii())?)),
        None => {
            let n = bs_atoi(spec)?;
            Some((n, n))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two words of three characters each, one sentence over both words
    fn create_test_index() -> RelationIndex {
        RelationIndex::decode(b"0-2\t10\n3-5\t11\n10,11\t20\n").unwrap()
    }

    #[test]
    fn test_decode_ranges() {
        let index = create_test_index();

        assert_eq!(index.parent(0), Some(10));
        assert_eq!(index.parent(2), Some(10));
        assert_eq!(index.parent(3), Some(11));
        assert_eq!(index.parent(11), Some(20));
        assert_eq!(index.parent(20), None);
        assert_eq!(index.children(10).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(index.children(20).collect::<Vec<_>>(), vec![10, 11]);
        assert_eq!(index.children(0).count(), 0);
        assert_eq!(index.len(), 8);
    }

    #[test]
    fn test_down_contains_child_of_up() {
        let index = create_test_index();
        for n in [0, 1, 2, 3, 4, 5, 10, 11] {
            let parent = index.parent(n).unwrap();
            assert!(index.children(parent).any(|c| c == n));
        }
    }

    #[test]
    fn test_ancestors() {
        let index = create_test_index();
        assert_eq!(index.ancestors(4).collect::<Vec<_>>(), vec![11, 20]);
        assert_eq!(index.ancestors(20).count(), 0);
    }

    #[test]
    fn test_last_write_wins() {
        let index = RelationIndex::decode(b"0-2\t10\n2\t11\n").unwrap();

        assert_eq!(index.parent(2), Some(11));
        assert_eq!(index.children(10).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(index.children(11).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_blank_lines_and_crlf() {
        let index = RelationIndex::decode(b"\r\n0 - 1\t5\r\n\n").unwrap();
        assert_eq!(index.parent(1), Some(5));
    }

    #[test]
    fn test_reversed_range_is_empty() {
        let index = RelationIndex::decode(b"3-1\t10\n").unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_malformed() {
        for bad in [&b"0-2 10"[..], b"0-x\t10", b"0-2\tten", b"1,,2\t3", b"-\t3"] {
            match RelationIndex::decode(bad) {
                Err(CorpusError::MalformedEncoding { line, .. }) => assert_eq!(line, 1),
                other => panic!("expected MalformedEncoding for {:?}, got {:?}", bad, other),
            }
        }

        match RelationIndex::decode(b"0\t1\nbad\n") {
            Err(CorpusError::MalformedEncoding { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected MalformedEncoding, got {:?}", other),
        }
    }
}
