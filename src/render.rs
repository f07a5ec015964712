//! Text and highlight projection
//!
//! [`project`] turns the offsets of one node in one layer into runs of
//! text sharing the same highlight group. Interactive display and the
//! tabular export both go through it, so a node looks the same in both.

use crate::compose::Composed;
use crate::corpus::{Corpus, LayerText, NodeId, TypeIdx, ValueMap};
use crate::matcher::{NodeMatches, TypeResult};
use crate::query::{NODE_LAYER, Query};

/// Consecutive characters with the same highlight group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    /// `None` for text outside any match
    pub group: Option<usize>,
    pub text: String,
}

/// Rendering of one node in one layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    pub runs: Vec<Run>,
    /// Value map entry for the node's raw text, when the layer has a keyed map
    pub tooltip: Option<String>,
}

impl Projection {
    /// Plain text of all runs
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// Project the offsets of a node onto runs
///
/// Offsets are taken in the order given. With `tooltip` set and a keyed
/// value map, the digits of the node's text are looked up in the map.
pub fn project(
    offsets: &[usize],
    matches: Option<&NodeMatches>,
    text: &LayerText,
    value_map: Option<&ValueMap>,
    tooltip: bool,
) -> Projection {
    let mut runs: Vec<Run> = Vec::new();
    let keyed = match value_map {
        Some(ValueMap::Map(map)) if tooltip => Some(map),
        _ => None,
    };
    let mut raw = String::new();

    for &offset in offsets {
        let Some(c) = text.char_at(offset) else {
            continue;
        };
        if keyed.is_some() {
            raw.push(c);
        }
        let group = matches.and_then(|m| m.get(&offset).copied());
        match runs.last_mut() {
            Some(run) if run.group == group => run.text.push(c),
            _ => runs.push(Run {
                group,
                text: c.to_string(),
            }),
        }
    }

    let tooltip = keyed.and_then(|map| map.get(&acronym_key(&raw)).cloned());
    Projection { runs, tooltip }
}

/// Value map key of a node text: its digits only
fn acronym_key(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Format a projection as export text
///
/// Highlighted runs get `«…»` markup when `highlight` is on; a tooltip is
/// appended as `(=tip)` after every run.
pub fn format_projection(projection: &Projection, highlight: bool) -> String {
    let tip = projection
        .tooltip
        .as_ref()
        .map(|t| format!("(={})", t))
        .unwrap_or_default();
    let mut out = String::new();
    for run in &projection.runs {
        match run.group {
            Some(0) if highlight => out.push_str(&format!("«{}»", run.text)),
            Some(g) if highlight => out.push_str(&format!("«{}={}»", g, run.text)),
            _ => out.push_str(&run.text),
        }
        out.push_str(&tip);
    }
    out
}

/// Project one node of type `t` in one layer
///
/// The `_` layer gives the node identifier, or its 1-based position within
/// its type when `seqno` is on.
pub fn render_node(
    corpus: &Corpus,
    results: &[TypeResult],
    t: TypeIdx,
    layer_name: &str,
    node: NodeId,
    seqno: bool,
) -> Option<Projection> {
    if layer_name == NODE_LAYER {
        let node_type = corpus.node_type(t)?;
        let number = if seqno { node_type.seqno(node) } else { node };
        return Some(Projection {
            runs: vec![Run {
                group: None,
                text: number.to_string(),
            }],
            tooltip: None,
        });
    }
    let layer = corpus.layer(t, layer_name)?;
    let matches = results
        .get(t)
        .and_then(|r| r.matches.get(layer_name))
        .and_then(|m| m.get(node));
    Some(project(
        corpus.offsets(layer, node),
        matches,
        &layer.text,
        layer.info.value_map.as_ref(),
        layer.info.tooltip,
    ))
}

/// Column layout of the export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColumnPolicy {
    /// One column per visible layer of each type
    #[default]
    PerLayer,
    /// One column per type
    PerType,
}

/// Row layout of the export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RowPolicy {
    /// One row per result
    #[default]
    PerResult,
    /// One row per visible layer, for types showing several layers
    PerExtraLayer,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportOptions {
    pub columns: ColumnPolicy,
    pub rows: RowPolicy,
    /// Wrap highlighted runs in `«…»`
    pub highlight: bool,
}

/// Export composed results as tab separated text with a header row
pub fn export(
    corpus: &Corpus,
    query: &Query,
    results: &[TypeResult],
    composed: &[Composed],
    options: ExportOptions,
) -> String {
    // coarsest type first
    let columns: Vec<(TypeIdx, Vec<&str>)> = (0..corpus.n_types())
        .rev()
        .filter_map(|t| {
            let layers: Vec<&str> = query
                .type_query(corpus.type_name(t))?
                .visible_layers()
                .filter(|name| *name == NODE_LAYER || corpus.layer(t, name).is_some())
                .collect();
            (!layers.is_empty()).then_some((t, layers))
        })
        .collect();

    let seqno = query.sequence_numbering;
    let node_label = if seqno { "seqno" } else { "node" };

    let mut out = String::from("nr");
    for (t, layers) in &columns {
        let type_name = corpus.type_name(*t);
        match options.columns {
            ColumnPolicy::PerLayer => {
                for layer in layers {
                    let label = if *layer == NODE_LAYER { node_label } else { *layer };
                    out.push_str(&format!("\t{}.{}", type_name, label));
                }
            }
            ColumnPolicy::PerType => out.push_str(&format!("\t{}", type_name)),
        }
    }
    out.push('\n');

    for (i, result) in composed.iter().enumerate() {
        let nr = (i + 1).to_string();

        let cells: Vec<Vec<String>> = columns
            .iter()
            .map(|(t, layers)| {
                let nodes = result.nodes_of(*t);
                layers
                    .iter()
                    .map(|layer| {
                        let node_cells = nodes.iter().filter_map(|&node| {
                            render_node(corpus, results, *t, layer, node, seqno)
                        });
                        render_cell(node_cells, options.highlight)
                    })
                    .collect()
            })
            .collect();

        let n_rows = match options.rows {
            RowPolicy::PerResult => 1,
            RowPolicy::PerExtraLayer => {
                let present = result.types();
                columns
                    .iter()
                    .filter(|(t, _)| present.contains(t))
                    .map(|(_, layers)| layers.len())
                    .max()
                    .unwrap_or(0)
                    .max(1)
            }
        };

        for row in 0..n_rows {
            out.push_str(&nr);
            for layer_cells in &cells {
                match (options.columns, options.rows) {
                    (ColumnPolicy::PerLayer, RowPolicy::PerResult) => {
                        for cell in layer_cells {
                            out.push('\t');
                            out.push_str(cell);
                        }
                    }
                    (ColumnPolicy::PerLayer, RowPolicy::PerExtraLayer) => {
                        for (j, cell) in layer_cells.iter().enumerate() {
                            out.push('\t');
                            if j == row {
                                out.push_str(cell);
                            }
                        }
                    }
                    (ColumnPolicy::PerType, RowPolicy::PerResult) => {
                        out.push('\t');
                        out.push_str(&layer_cells.join(" | "));
                    }
                    (ColumnPolicy::PerType, RowPolicy::PerExtraLayer) => {
                        out.push('\t');
                        if let Some(cell) = layer_cells.get(row) {
                            out.push_str(cell);
                        }
                    }
                }
            }
            out.push('\n');
        }
    }

    out
}

/// Nodes of one cell, separated by a space
fn render_cell(projections: impl Iterator<Item = Projection>, highlight: bool) -> String {
    let rendered: Vec<String> = projections
        .map(|p| format_projection(&p, highlight))
        .collect();
    sanitize(&rendered.join(" "))
}

/// Tabs and line breaks would break the record structure
fn sanitize(text: &str) -> String {
    text.replace(['\t', '\n', '\r'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn create_matches(pairs: &[(usize, usize)]) -> NodeMatches {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_project_merges_runs() {
        let text = LayerText::new("foobar");
        let matches = create_matches(&[(1, 0), (2, 0), (4, 1)]);

        let p = project(&[0, 1, 2, 3, 4, 5], Some(&matches), &text, None, false);

        assert_eq!(
            p.runs,
            vec![
                Run { group: None, text: "f".into() },
                Run { group: Some(0), text: "oo".into() },
                Run { group: None, text: "b".into() },
                Run { group: Some(1), text: "a".into() },
                Run { group: None, text: "r".into() },
            ]
        );
        assert_eq!(p.text(), "foobar");
        assert_eq!(p.tooltip, None);
    }

    #[test]
    fn test_project_keeps_given_order() {
        let text = LayerText::new("abc");
        let p = project(&[2, 0], None, &text, None, false);
        assert_eq!(p.text(), "ca");
        assert_eq!(p.runs.len(), 1);
    }

    fn create_value_map() -> ValueMap {
        let mut map = IndexMap::new();
        map.insert("12".to_string(), "twelve".to_string());
        ValueMap::Map(map)
    }

    #[test]
    fn test_project_tooltip_uses_digits() {
        let text = LayerText::new("a12");
        let p = project(&[0, 1, 2], None, &text, Some(&create_value_map()), true);
        assert_eq!(p.tooltip.as_deref(), Some("twelve"));
        assert_eq!(p.text(), "a12");
    }

    #[test]
    fn test_project_tooltip_needs_flag() {
        let text = LayerText::new("a12");
        let p = project(&[0, 1, 2], None, &text, Some(&create_value_map()), false);
        assert_eq!(p.tooltip, None);
    }

    #[test]
    fn test_project_tooltip_not_from_list() {
        let text = LayerText::new("12");
        let listed = ValueMap::List(vec!["12".to_string()]);
        let p = project(&[0, 1], None, &text, Some(&listed), true);
        assert_eq!(p.tooltip, None);
    }

    #[test]
    fn test_format_projection() {
        let p = Projection {
            runs: vec![
                Run { group: None, text: "f".into() },
                Run { group: Some(0), text: "oo".into() },
                Run { group: Some(2), text: "b".into() },
            ],
            tooltip: None,
        };
        assert_eq!(format_projection(&p, true), "f«oo»«2=b»");
        assert_eq!(format_projection(&p, false), "foob");
    }

    #[test]
    fn test_format_projection_tooltip() {
        let p = Projection {
            runs: vec![
                Run { group: None, text: "a".into() },
                Run { group: Some(0), text: "12".into() },
            ],
            tooltip: Some("twelve".to_string()),
        };
        assert_eq!(format_projection(&p, true), "a(=twelve)«12»(=twelve)");
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("a\tb\nc\r\nd"), "a b c  d");
    }
}
