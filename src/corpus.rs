//! Corpus data structures
//!
//! A corpus is a fixed sequence of node types, finest first, each carrying
//! zero or more text layers. Nodes of adjacent types are linked through the
//! [`RelationIndex`]; layer text is linked to nodes through the
//! [`PositionIndex`]. Everything here is built once and read-only after.

use crate::error::CorpusError;
use crate::position::{PositionData, PositionIndex};
use crate::relation::RelationIndex;
use indexmap::{IndexMap, IndexSet};
use rustc_hash::{FxBuildHasher, FxHashMap};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Unique identifier for a node
pub type NodeId = usize;

/// Index of a node type, 0 being the finest
pub type TypeIdx = usize;

/// Insertion-ordered node set
pub type NodeSet = IndexSet<NodeId, FxBuildHasher>;

/// Value acronym table used for tooltips
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ValueMap {
    List(Vec<String>),
    Map(IndexMap<String, String>),
}

/// Metadata of one layer
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerInfo {
    #[serde(default)]
    pub label: Option<String>,
    pub text_length: usize,
    pub position_key: String,
    #[serde(default)]
    pub value_map: Option<ValueMap>,
    #[serde(default)]
    pub tooltip: bool,
}

/// Declarative corpus description
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusDescription {
    /// Node type names, finest first
    pub node_types: Vec<String>,
    /// First node of each node type, for per-type sequence numbers
    #[serde(default)]
    pub first_nodes: IndexMap<String, NodeId>,
    /// Layers per node type, in display order
    #[serde(default)]
    pub layers: IndexMap<String, IndexMap<String, LayerInfo>>,
}

/// Text of a layer, addressable by character offset
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LayerText {
    text: String,
    /// Byte offset of every char; `None` for ASCII text where the two coincide
    char_starts: Option<Vec<usize>>,
}

impl LayerText {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let char_starts = if text.is_ascii() {
            None
        } else {
            Some(text.char_indices().map(|(b, _)| b).collect())
        };
        Self { text, char_starts }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length in characters
    pub fn char_len(&self) -> usize {
        match &self.char_starts {
            Some(starts) => starts.len(),
            None => self.text.len(),
        }
    }

    /// Character at a character offset
    pub fn char_at(&self, offset: usize) -> Option<char> {
        match &self.char_starts {
            Some(starts) => self.text[*starts.get(offset)?..].chars().next(),
            None => self.text.as_bytes().get(offset).map(|&b| b as char),
        }
    }

    /// Character offset of a byte offset lying on a char boundary
    #[inline]
    pub fn char_offset(&self, byte: usize) -> usize {
        match &self.char_starts {
            Some(starts) => starts.partition_point(|&b| b < byte),
            None => byte,
        }
    }
}

/// One layer of a node type
#[derive(Debug, Clone)]
pub struct Layer {
    pub name: String,
    pub info: LayerInfo,
    pub text: LayerText,
}

impl Layer {
    pub fn label(&self) -> &str {
        self.info.label.as_deref().unwrap_or(&self.name)
    }
}

/// One level of the containment hierarchy
#[derive(Debug, Clone)]
pub struct NodeType {
    pub name: String,
    /// First node of this type, when known
    pub first_node: Option<NodeId>,
    pub layers: Vec<Layer>,
}

impl NodeType {
    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// 1-based position of a node among the nodes of this type
    ///
    /// Falls back to the node itself when the first node is unknown.
    pub fn seqno(&self, node: NodeId) -> NodeId {
        match self.first_node {
            Some(first) => node.saturating_sub(first) + 1,
            None => node,
        }
    }
}

/// A loaded corpus: node types, relation index and position index
#[derive(Debug, Clone)]
pub struct Corpus {
    types: Vec<NodeType>,
    relation: RelationIndex,
    positions: PositionIndex,
}

impl Corpus {
    /// Build a corpus from its description and raw data
    ///
    /// `texts` holds the text per node type and layer; every layer named
    /// in the description needs one, and every position key it refers to
    /// must be present in `positions`.
    pub fn build(
        description: CorpusDescription,
        mut texts: FxHashMap<(String, String), String>,
        up: &[u8],
        positions: PositionData,
    ) -> Result<Self, CorpusError> {
        for type_name in description.layers.keys().chain(description.first_nodes.keys()) {
            if !description.node_types.contains(type_name) {
                return Err(CorpusError::UnknownType(type_name.clone()));
            }
        }

        let mut text_lengths: FxHashMap<String, usize> = FxHashMap::default();
        let mut types = Vec::with_capacity(description.node_types.len());

        for type_name in &description.node_types {
            let mut layers = Vec::new();
            if let Some(infos) = description.layers.get(type_name) {
                for (layer_name, info) in infos {
                    let key = (type_name.clone(), layer_name.clone());
                    let text = texts.remove(&key).ok_or_else(|| CorpusError::UnknownLayer {
                        node_type: type_name.clone(),
                        layer: layer_name.clone(),
                    })?;
                    text_lengths
                        .entry(info.position_key.clone())
                        .or_insert(info.text_length);
                    layers.push(Layer {
                        name: layer_name.clone(),
                        info: info.clone(),
                        text: LayerText::new(text),
                    });
                }
            }
            types.push(NodeType {
                name: type_name.clone(),
                first_node: description.first_nodes.get(type_name).copied(),
                layers,
            });
        }

        let relation = RelationIndex::decode(up)?;
        debug!(nodes = relation.len(), "relation index built");

        let positions = PositionIndex::build(positions, &text_lengths)?;
        for key in text_lengths.keys() {
            if !positions.contains_key(key) {
                return Err(CorpusError::MissingPositions(key.clone()));
            }
        }

        Ok(Self {
            types,
            relation,
            positions,
        })
    }

    /// Assemble a corpus from already built parts
    pub fn from_parts(
        types: Vec<NodeType>,
        relation: RelationIndex,
        positions: PositionIndex,
    ) -> Self {
        Self {
            types,
            relation,
            positions,
        }
    }

    pub fn types(&self) -> &[NodeType] {
        &self.types
    }

    pub fn n_types(&self) -> usize {
        self.types.len()
    }

    pub fn node_type(&self, t: TypeIdx) -> Option<&NodeType> {
        self.types.get(t)
    }

    /// Look up a node type index by name
    pub fn type_index(&self, name: &str) -> Option<TypeIdx> {
        self.types.iter().position(|t| t.name == name)
    }

    pub fn type_name(&self, t: TypeIdx) -> &str {
        self.types.get(t).map(|t| t.name.as_str()).unwrap_or("")
    }

    pub fn layer(&self, t: TypeIdx, name: &str) -> Option<&Layer> {
        self.types.get(t)?.layer(name)
    }

    pub fn relation(&self) -> &RelationIndex {
        &self.relation
    }

    pub fn positions(&self) -> &PositionIndex {
        &self.positions
    }

    /// Offsets of a node in one layer, ascending
    pub fn offsets(&self, layer: &Layer, node: NodeId) -> &[usize] {
        self.positions.node_to_offsets(&layer.info.position_key, node)
    }
}
