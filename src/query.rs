//! Query object
//!
//! A query holds, per node type and per layer, a regular expression with
//! its flags and an enabled switch, plus the focus type, the visible
//! layers and two display toggles. Queries are plain serde data so the
//! surrounding application can store and restore them as JSON.

use crate::corpus::{Corpus, TypeIdx};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pseudo-layer name meaning "show the node identifier"
pub const NODE_LAYER: &str = "_";

/// Error type for queries that do not fit the corpus
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("Query error: Unknown node type: {0}")]
    UnknownType(String),

    #[error("Query error: Unknown layer {layer} for node type {node_type}")]
    UnknownLayer { node_type: String, layer: String },

    #[error("Query error: No focus type")]
    NoFocusType,
}

/// Regular expression flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Flags {
    /// Case-insensitive
    pub i: bool,
    /// `^` and `$` match at line boundaries
    pub m: bool,
    /// `.` matches newline
    pub s: bool,
}

/// Pattern of one layer
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LayerQuery {
    pub pattern: String,
    pub flags: Flags,
    pub enabled: bool,
}

impl Default for LayerQuery {
    fn default() -> Self {
        Self {
            pattern: String::new(),
            flags: Flags::default(),
            enabled: true,
        }
    }
}

impl LayerQuery {
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            ..Self::default()
        }
    }

    pub fn with_flags(mut self, flags: Flags) -> Self {
        self.flags = flags;
        self
    }

    /// A layer takes part in a run when it is enabled and has a pattern
    pub fn is_active(&self) -> bool {
        self.enabled && !self.pattern.is_empty()
    }
}

/// Patterns and visible layers of one node type
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TypeQuery {
    pub layers: IndexMap<String, LayerQuery>,
    /// Visible layers in display order; may contain [`NODE_LAYER`]
    pub visible: IndexMap<String, bool>,
}

impl TypeQuery {
    pub fn active_layers(&self) -> impl Iterator<Item = (&str, &LayerQuery)> {
        self.layers
            .iter()
            .filter(|(_, q)| q.is_active())
            .map(|(name, q)| (name.as_str(), q))
    }

    pub fn visible_layers(&self) -> impl Iterator<Item = &str> {
        self.visible
            .iter()
            .filter(|(_, on)| **on)
            .map(|(name, _)| name.as_str())
    }
}

/// Multi-group highlighting toggle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MultiGroup {
    On,
    #[default]
    Off,
    /// The host cannot report capture offsets
    Unsupported,
}

/// A complete query
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Query {
    pub focus_type: String,
    pub types: IndexMap<String, TypeQuery>,
    pub multi_group: MultiGroup,
    pub sequence_numbering: bool,
}

impl Query {
    pub fn new(focus_type: &str) -> Self {
        Self {
            focus_type: focus_type.to_string(),
            ..Self::default()
        }
    }

    /// Set the pattern of a layer
    pub fn with_pattern(mut self, node_type: &str, layer: &str, pattern: LayerQuery) -> Self {
        self.types
            .entry(node_type.to_string())
            .or_default()
            .layers
            .insert(layer.to_string(), pattern);
        self
    }

    /// Make a layer (or [`NODE_LAYER`]) visible
    pub fn with_visible(mut self, node_type: &str, layer: &str) -> Self {
        self.types
            .entry(node_type.to_string())
            .or_default()
            .visible
            .insert(layer.to_string(), true);
        self
    }

    pub fn type_query(&self, node_type: &str) -> Option<&TypeQuery> {
        self.types.get(node_type)
    }

    /// Check that every named type and layer exists, returning the focus type
    pub fn validate(&self, corpus: &Corpus) -> Result<TypeIdx, QueryError> {
        for (type_name, type_query) in &self.types {
            let t = corpus
                .type_index(type_name)
                .ok_or_else(|| QueryError::UnknownType(type_name.clone()))?;
            let names = type_query
                .layers
                .keys()
                .chain(type_query.visible.keys().filter(|name| *name != NODE_LAYER));
            for layer in names {
                if corpus.layer(t, layer).is_none() {
                    return Err(QueryError::UnknownLayer {
                        node_type: type_name.clone(),
                        layer: layer.clone(),
                    });
                }
            }
        }

        if self.focus_type.is_empty() {
            return Err(QueryError::NoFocusType);
        }
        corpus
            .type_index(&self.focus_type)
            .ok_or_else(|| QueryError::UnknownType(self.focus_type.clone()))
    }
}
