//! Character offset to node index
//!
//! For every position key (a layer, or several layers sharing the same
//! segmentation) the index maps each character offset of the layer text
//! to the node owning it, and each node to its offsets in ascending order.
//!
//! Position data comes in one of two layouts, chosen for the whole corpus:
//!
//! - **direct**: the offset-to-node table is stored as is (`null` for
//!   unowned offsets such as separators)
//! - **derived**: a boundary table per key. Slot 0 holds the node base;
//!   offsets `[boundaries[i], boundaries[i+1])` belong to node
//!   `boundaries[0] + i`, and the last slot only closes the last node
//!
//! Both produce the same logical index.

use crate::corpus::NodeId;
use crate::error::CorpusError;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Boundary table of the derived layout, stored as a bare JSON array
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct BoundaryTable {
    pub boundaries: Vec<usize>,
}

impl BoundaryTable {
    pub fn new(boundaries: Vec<usize>) -> Self {
        Self { boundaries }
    }

    /// Node of slot 0; slot `i` holds node `base + i`
    pub fn node_base(&self) -> NodeId {
        self.boundaries.first().copied().unwrap_or(0)
    }
}

/// Raw position data, keyed by position key
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "mode", content = "data", rename_all = "lowercase")]
pub enum PositionData {
    Direct(FxHashMap<String, Vec<Option<NodeId>>>),
    Derived(FxHashMap<String, BoundaryTable>),
}

/// Positions of one key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerPositions {
    by_offset: Vec<Option<NodeId>>,
    by_node: FxHashMap<NodeId, Vec<usize>>,
}

impl LayerPositions {
    /// Build from a materialized offset-to-node table
    pub fn from_offsets(by_offset: Vec<Option<NodeId>>) -> Self {
        let mut by_node: FxHashMap<NodeId, Vec<usize>> = FxHashMap::default();
        for (offset, node) in by_offset.iter().enumerate() {
            if let Some(node) = node {
                by_node.entry(*node).or_default().push(offset);
            }
        }
        Self { by_offset, by_node }
    }

    /// Build from a boundary table, covering `text_length` offsets
    pub fn from_boundaries(table: &BoundaryTable, text_length: usize) -> Result<Self, CorpusError> {
        let bounds = &table.boundaries;
        let base = table.node_base();

        // slot 0 is the node base, not an offset
        if let Some(i) = bounds.windows(2).skip(1).position(|w| w[0] > w[1]) {
            let i = i + 1;
            return Err(CorpusError::malformed(
                i + 2,
                format!("boundary {} precedes {}", bounds[i + 1], bounds[i]),
            ));
        }

        let mut by_offset = vec![None; text_length];
        let mut by_node: FxHashMap<NodeId, Vec<usize>> = FxHashMap::default();

        for i in 1..bounds.len().saturating_sub(1) {
            let start = bounds[i].min(text_length);
            let end = bounds[i + 1].min(text_length);
            if start == end {
                continue;
            }
            let node = base + i;
            by_offset[start..end].fill(Some(node));
            by_node.insert(node, (start..end).collect());
        }

        Ok(Self { by_offset, by_node })
    }

    #[inline]
    pub fn offset_to_node(&self, offset: usize) -> Option<NodeId> {
        self.by_offset.get(offset).copied().flatten()
    }

    #[inline]
    pub fn node_to_offsets(&self, node: NodeId) -> &[usize] {
        self.by_node.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of offsets covered, owned or not
    pub fn len(&self) -> usize {
        self.by_offset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_offset.is_empty()
    }
}

/// Position index over all keys
#[derive(Debug, Clone, Default)]
pub struct PositionIndex {
    keys: FxHashMap<String, LayerPositions>,
}

impl PositionIndex {
    /// Build the index for every key in `data`
    ///
    /// `text_lengths` gives the text length per key; the derived layout
    /// needs it to size the offset table.
    pub fn build(
        data: PositionData,
        text_lengths: &FxHashMap<String, usize>,
    ) -> Result<Self, CorpusError> {
        let mut keys = FxHashMap::default();

        match data {
            PositionData::Direct(tables) => {
                for (key, by_offset) in tables {
                    let positions = LayerPositions::from_offsets(by_offset);
                    debug!(key = %key, offsets = positions.len(), "position layer built (direct)");
                    keys.insert(key, positions);
                }
            }
            PositionData::Derived(tables) => {
                for (key, table) in tables {
                    let text_length = match text_lengths.get(&key) {
                        Some(&n) => n,
                        None => table.boundaries.last().copied().unwrap_or(0),
                    };
                    let positions = LayerPositions::from_boundaries(&table, text_length)?;
                    debug!(key = %key, offsets = positions.len(), "position layer built (derived)");
                    keys.insert(key, positions);
                }
            }
        }

        Ok(Self { keys })
    }

    /// Positions of one key
    pub fn get(&self, key: &str) -> Option<&LayerPositions> {
        self.keys.get(key)
    }

    pub fn offset_to_node(&self, key: &str, offset: usize) -> Option<NodeId> {
        self.keys.get(key)?.offset_to_node(offset)
    }

    pub fn node_to_offsets(&self, key: &str, node: NodeId) -> &[usize] {
        self.keys
            .get(key)
            .map(|p| p.node_to_offsets(node))
            .unwrap_or(&[])
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// "ab cd": node 1 owns "ab", node 2 owns "cd", the space is unowned
    fn create_direct() -> LayerPositions {
        LayerPositions::from_offsets(vec![Some(1), Some(1), None, Some(2), Some(2)])
    }

    #[test]
    fn test_direct_layout() {
        let positions = create_direct();

        assert_eq!(positions.offset_to_node(0), Some(1));
        assert_eq!(positions.offset_to_node(2), None);
        assert_eq!(positions.offset_to_node(4), Some(2));
        assert_eq!(positions.offset_to_node(5), None);
        assert_eq!(positions.node_to_offsets(1), &[0, 1]);
        assert_eq!(positions.node_to_offsets(2), &[3, 4]);
        assert!(positions.node_to_offsets(3).is_empty());
    }

    #[test]
    fn test_derived_layout() {
        // base 0, node 1 at [0,2), node 2 at [2,4), node 3 at [4,6)
        let table = BoundaryTable::new(vec![0, 0, 2, 4, 6]);
        let positions = LayerPositions::from_boundaries(&table, 6).unwrap();

        assert_eq!(positions.offset_to_node(0), Some(1));
        assert_eq!(positions.offset_to_node(3), Some(2));
        assert_eq!(positions.offset_to_node(5), Some(3));
        assert_eq!(positions.node_to_offsets(3), &[4, 5]);
        // the last slot only closes node 3
        assert!(positions.node_to_offsets(4).is_empty());
    }

    #[test]
    fn test_layouts_agree() {
        // node 11 at [0,3), node 12 at [3,4), node 13 at [4,6)
        let table = BoundaryTable::new(vec![10, 0, 3, 4, 6]);
        let derived = LayerPositions::from_boundaries(&table, 6).unwrap();
        let direct = LayerPositions::from_offsets(vec![
            Some(11),
            Some(11),
            Some(11),
            Some(12),
            Some(13),
            Some(13),
        ]);

        assert_eq!(derived, direct);
    }

    #[test]
    fn test_mutual_inverse() {
        let positions = create_direct();
        for offset in 0..positions.len() {
            if let Some(node) = positions.offset_to_node(offset) {
                assert!(positions.node_to_offsets(node).contains(&offset));
            }
        }
        for node in [1, 2] {
            for &offset in positions.node_to_offsets(node) {
                assert_eq!(positions.offset_to_node(offset), Some(node));
            }
        }
    }

    #[test]
    fn test_derived_clips_to_text_length() {
        let table = BoundaryTable::new(vec![0, 0, 2, 9]);
        let positions = LayerPositions::from_boundaries(&table, 4).unwrap();
        assert_eq!(positions.len(), 4);
        assert_eq!(positions.node_to_offsets(2), &[2, 3]);
    }

    #[test]
    fn test_derived_base_above_offsets() {
        // slot 0 holds node base 99, larger than every offset
        let table = BoundaryTable::new(vec![99, 0, 3, 6]);
        let positions = LayerPositions::from_boundaries(&table, 6).unwrap();

        assert_eq!(positions.offset_to_node(0), Some(100));
        assert_eq!(positions.offset_to_node(5), Some(101));
        assert_eq!(positions.node_to_offsets(100), &[0, 1, 2]);
        assert!(positions.node_to_offsets(99).is_empty());
    }

    #[test]
    fn test_derived_table_from_json() {
        let data: PositionData =
            serde_json::from_str(r#"{"mode": "derived", "data": {"w": [99, 0, 3, 6]}}"#).unwrap();
        let mut lengths = FxHashMap::default();
        lengths.insert("w".to_string(), 6);
        let index = PositionIndex::build(data, &lengths).unwrap();

        assert_eq!(index.offset_to_node("w", 4), Some(101));
    }

    #[test]
    fn test_derived_rejects_decreasing() {
        let table = BoundaryTable::new(vec![0, 0, 3, 2, 4]);
        assert!(matches!(
            LayerPositions::from_boundaries(&table, 4),
            Err(CorpusError::MalformedEncoding { .. })
        ));
    }

    #[test]
    fn test_index_build_both_modes() {
        let mut lengths = FxHashMap::default();
        lengths.insert("w".to_string(), 5);

        let mut direct = FxHashMap::default();
        direct.insert("w".to_string(), vec![Some(1), Some(1), None, Some(2), Some(2)]);
        let a = PositionIndex::build(PositionData::Direct(direct), &lengths).unwrap();

        let mut derived = FxHashMap::default();
        derived.insert(
            "w".to_string(),
            BoundaryTable::new(vec![0, 0, 2, 3, 5]),
        );
        let b = PositionIndex::build(PositionData::Derived(derived), &lengths).unwrap();

        assert_eq!(a.node_to_offsets("w", 1), b.node_to_offsets("w", 1));
        assert_eq!(a.node_to_offsets("w", 2), b.node_to_offsets("w", 3));
        assert_eq!(a.offset_to_node("missing", 0), None);
    }
}
