//! Per-layer regular expression matching
//!
//! A layer pattern is run over the whole layer text. Every character
//! offset covered by a match is marked with a group index and resolved to
//! the node owning it:
//!
//! - with multi-group highlighting, group `g` of each match marks the
//!   offsets it spans with `g`, groups in ascending order so the highest
//!   numbered group wins where groups overlap
//! - otherwise every offset of the whole match is marked with 0
//!
//! Offsets that no node owns are dropped.

use crate::corpus::{Corpus, LayerText, NodeId, NodeSet, TypeIdx};
use crate::error::{LayerPatternError, PatternError, Stage, StageError};
use crate::position::LayerPositions;
use crate::query::{Flags, TypeQuery};
use indexmap::IndexMap;
use regex::{Regex, RegexBuilder};
use rustc_hash::{FxBuildHasher, FxHashMap};
use tracing::{debug, warn};

/// Longest pattern accepted, in characters
pub const MAX_PATTERN_CHARS: usize = 1000;

/// Offset to group index, for one node
pub type NodeMatches = FxHashMap<usize, usize>;

/// Matches of one layer, nodes in the order they were first hit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerMatches {
    by_node: IndexMap<NodeId, NodeMatches, FxBuildHasher>,
}

impl LayerMatches {
    fn mark(&mut self, node: NodeId, offset: usize, group: usize) {
        self.by_node.entry(node).or_default().insert(offset, group);
    }

    /// Marked offsets of a node
    pub fn get(&self, node: NodeId) -> Option<&NodeMatches> {
        self.by_node.get(&node)
    }

    /// Nodes touched by the pattern
    pub fn nodes(&self) -> NodeSet {
        self.by_node.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.by_node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_node.is_empty()
    }
}

/// Matching outcome of one node type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeResult {
    /// Matches per active layer
    pub matches: IndexMap<String, LayerMatches>,
    /// `None` when no layer of the type had an active pattern
    pub nodes: Option<NodeSet>,
}

impl TypeResult {
    pub fn with_nodes(nodes: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            matches: IndexMap::new(),
            nodes: Some(nodes.into_iter().collect()),
        }
    }
}

/// What the regex engine can report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Offsets of individual capture groups are available
    pub capture_offsets: bool,
}

impl Capabilities {
    /// Probe the regex engine once
    pub fn detect() -> Self {
        let capture_offsets = Regex::new("(a)(b)")
            .ok()
            .and_then(|re| {
                let caps = re.captures("ab")?;
                Some(caps.get(2)?.start() == 1)
            })
            .unwrap_or(false);
        Self { capture_offsets }
    }
}

/// Compile a layer pattern with its flags
pub fn compile_pattern(
    pattern: &str,
    flags: Flags,
    max_chars: usize,
) -> Result<Regex, PatternError> {
    let len = pattern.chars().count();
    if len > max_chars {
        return Err(PatternError::TooLong {
            len,
            max: max_chars,
        });
    }
    RegexBuilder::new(pattern)
        .case_insensitive(flags.i)
        .multi_line(flags.m)
        .dot_matches_new_line(flags.s)
        .build()
        .map_err(|e| PatternError::Invalid(e.to_string()))
}

/// Run a compiled pattern over one layer
pub fn match_layer(
    text: &LayerText,
    positions: &LayerPositions,
    regex: &Regex,
    multi_group: bool,
) -> LayerMatches {
    let mut matches = LayerMatches::default();
    let haystack = text.as_str();

    let mut mark_span = |start: usize, end: usize, group: usize| {
        let first = text.char_offset(start);
        for (k, _) in haystack[start..end].chars().enumerate() {
            let offset = first + k;
            if let Some(node) = positions.offset_to_node(offset) {
                matches.mark(node, offset, group);
            }
        }
    };

    if multi_group {
        for caps in regex.captures_iter(haystack) {
            for (group, m) in caps.iter().enumerate() {
                if let Some(m) = m {
                    mark_span(m.start(), m.end(), group);
                }
            }
        }
    } else {
        for m in regex.find_iter(haystack) {
            mark_span(m.start(), m.end(), 0);
        }
    }

    matches
}

/// Match every active layer of a node type and intersect the node sets
///
/// Layers whose pattern does not compile are reported and left out. A
/// layer missing from the corpus, or without position data, fails the
/// match stage.
pub fn match_type(
    corpus: &Corpus,
    t: TypeIdx,
    type_query: Option<&TypeQuery>,
    multi_group: bool,
    max_chars: usize,
) -> Result<(TypeResult, Vec<LayerPatternError>), StageError> {
    let mut result = TypeResult::default();
    let mut errors = Vec::new();
    let Some(type_query) = type_query else {
        return Ok((result, errors));
    };
    let type_name = corpus.type_name(t);

    for (layer_name, layer_query) in type_query.active_layers() {
        let Some(layer) = corpus.layer(t, layer_name) else {
            return Err(StageError::new(
                Stage::Match,
                format!("unknown layer {} for node type {}", layer_name, type_name),
            ));
        };
        let regex = match compile_pattern(&layer_query.pattern, layer_query.flags, max_chars) {
            Ok(regex) => regex,
            Err(error) => {
                warn!(node_type = type_name, layer = layer_name, %error, "pattern skipped");
                errors.push(LayerPatternError {
                    node_type: type_name.to_string(),
                    layer: layer_name.to_string(),
                    error,
                });
                continue;
            }
        };
        let key = &layer.info.position_key;
        let Some(positions) = corpus.positions().get(key) else {
            return Err(StageError::new(
                Stage::Match,
                format!("no position data for key {} ({}.{})", key, type_name, layer_name),
            ));
        };

        let layer_matches = match_layer(&layer.text, positions, &regex, multi_group);
        debug!(
            node_type = type_name,
            layer = layer_name,
            nodes = layer_matches.len(),
            "layer matched"
        );

        let layer_nodes = layer_matches.nodes();
        result.nodes = Some(match result.nodes.take() {
            None => layer_nodes,
            Some(mut nodes) => {
                nodes.retain(|n| layer_nodes.contains(n));
                nodes
            }
        });
        result.matches.insert(layer_name.to_string(), layer_matches);
    }

    Ok((result, errors))
}
