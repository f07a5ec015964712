//! Result composition
//!
//! Every surviving node of the focus type becomes one result: the focus
//! node itself, its single ancestor at each coarser type, and the full
//! forest of its descendants at each finer type. Descendants are not
//! filtered by the weeded node sets; rendering shows which of them
//! matched.

use crate::corpus::{NodeId, TypeIdx};
use crate::error::{Stage, StageError};
use crate::matcher::TypeResult;
use crate::relation::RelationIndex;
use std::collections::BTreeMap;

/// Cursor value before any navigation happened
pub const UNSET: isize = -2;
/// Cursor value just before the first result
pub const START: isize = -1;

/// A node inside a composed result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Leaf(NodeId),
    /// A node with in-scope children, keyed by the children's type
    Branch(NodeId, Composed),
}

impl Entry {
    pub fn node(&self) -> NodeId {
        match self {
            Entry::Leaf(n) | Entry::Branch(n, _) => *n,
        }
    }
}

/// Nodes keyed by type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Composed {
    pub levels: BTreeMap<TypeIdx, Vec<Entry>>,
}

impl Composed {
    /// All nodes of one type, in tree order
    pub fn nodes_of(&self, t: TypeIdx) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect(t, &mut out);
        out
    }

    fn collect(&self, t: TypeIdx, out: &mut Vec<NodeId>) {
        for (&level, entries) in &self.levels {
            for entry in entries {
                if level == t {
                    out.push(entry.node());
                }
                if let Entry::Branch(_, children) = entry {
                    children.collect(t, out);
                }
            }
        }
    }

    /// Types that have at least one node in this result
    pub fn types(&self) -> Vec<TypeIdx> {
        let mut types = Vec::new();
        self.collect_types(&mut types);
        types.sort_unstable();
        types.dedup();
        types
    }

    fn collect_types(&self, out: &mut Vec<TypeIdx>) {
        for (&level, entries) in &self.levels {
            if !entries.is_empty() {
                out.push(level);
            }
            for entry in entries {
                if let Entry::Branch(_, children) = entry {
                    children.collect_types(out);
                }
            }
        }
    }
}

/// Build the result of one focus node among `n_types` node types
pub fn compose_one(
    focus_node: NodeId,
    focus: TypeIdx,
    n_types: usize,
    relation: &RelationIndex,
) -> Composed {
    let mut composed = Composed::default();
    composed.levels.insert(focus, vec![Entry::Leaf(focus_node)]);

    for (t, ancestor) in (focus + 1..n_types).zip(relation.ancestors(focus_node)) {
        composed.levels.insert(t, vec![Entry::Leaf(ancestor)]);
    }

    if focus > 0 {
        let children = descendants(focus_node, focus - 1, relation);
        if !children.is_empty() {
            composed.levels.insert(focus - 1, children);
        }
    }

    composed
}

/// All children of `node`, which live at type `t`
///
/// Children at the finest type are leaves; coarser children are branches,
/// possibly without children of their own.
fn descendants(node: NodeId, t: TypeIdx, relation: &RelationIndex) -> Vec<Entry> {
    relation
        .children(node)
        .map(|child| {
            if t == 0 {
                return Entry::Leaf(child);
            }
            let mut sub = Composed::default();
            let grandchildren = descendants(child, t - 1, relation);
            if !grandchildren.is_empty() {
                sub.levels.insert(t - 1, grandchildren);
            }
            Entry::Branch(child, sub)
        })
        .collect()
}

/// Build one result per surviving focus node, in node set order
///
/// Fails when `focus` is not one of the node types in `results`.
pub fn compose(
    focus: TypeIdx,
    results: &[TypeResult],
    relation: &RelationIndex,
) -> Result<Vec<Composed>, StageError> {
    let Some(result) = results.get(focus) else {
        return Err(StageError::new(
            Stage::Compose,
            format!("focus type {} out of range ({} node types)", focus, results.len()),
        ));
    };
    let Some(nodes) = result.nodes.as_ref() else {
        return Ok(Vec::new());
    };
    Ok(nodes
        .iter()
        .map(|&f| compose_one(f, focus, results.len(), relation))
        .collect())
}

/// How cursors follow a recomposition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recompose {
    /// Keep cursors, moving them to the first result when unset or out
    /// of range
    Keep,
    /// The results were edited: forget the cursors
    Stale,
    /// Move cursors to the same relative position (focus type switch)
    Relative,
}

/// Current and previous focus position in the result sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub focus_pos: isize,
    pub prev_focus_pos: isize,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            focus_pos: UNSET,
            prev_focus_pos: UNSET,
        }
    }
}

impl Cursor {
    /// Move to a new focus position, remembering the current one
    pub fn set(&mut self, pos: isize) {
        self.prev_focus_pos = self.focus_pos;
        self.focus_pos = pos;
    }

    /// Adapt the cursors to a result sequence that went from `old_len`
    /// to `new_len` entries
    pub fn adjust(&mut self, mode: Recompose, old_len: usize, new_len: usize) {
        match mode {
            Recompose::Stale => *self = Self::default(),
            Recompose::Relative => {
                self.focus_pos = rescale(self.focus_pos, old_len, new_len);
                self.prev_focus_pos = rescale(self.prev_focus_pos, old_len, new_len);
            }
            Recompose::Keep => {
                if self.focus_pos == UNSET {
                    self.focus_pos = if new_len == 0 { START } else { 0 };
                    self.prev_focus_pos = UNSET;
                } else if self.focus_pos > new_len as isize {
                    self.focus_pos = 0;
                    self.prev_focus_pos = UNSET;
                }
            }
        }
    }
}

fn rescale(pos: isize, old_len: usize, new_len: usize) -> isize {
    let ratio = pos as f64 / old_len.max(1) as f64;
    let scaled = (ratio * new_len as f64).round() as isize;
    scaled.clamp(0, new_len as isize)
}
