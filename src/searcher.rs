//! End-to-end query execution
//!
//! The [`Engine`] runs the query pipeline over a loaded corpus:
//! 1. Validate the query against the corpus
//! 2. Match every active layer and intersect per node type
//! 3. Weed the node sets through the containment hierarchy
//! 4. Compose one result per surviving focus node
//!
//! A run either commits a complete new state or leaves the previous one
//! in place. Rendering reads the committed state on demand.

use crate::compose::{Composed, Cursor, Recompose, compose};
use crate::corpus::{Corpus, NodeId, TypeIdx};
use crate::error::{LayerPatternError, RunFailure, Stage, StageError};
use crate::matcher::{Capabilities, MAX_PATTERN_CHARS, TypeResult, match_type};
use crate::query::{MultiGroup, Query};
use crate::render::{ExportOptions, Projection, export, render_node};
use crate::weed::{Stats, weed};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Engine settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Longest accepted pattern, in characters
    pub max_pattern_chars: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_pattern_chars: MAX_PATTERN_CHARS,
        }
    }
}

/// Everything one successful run produced
#[derive(Debug, Clone)]
pub struct RunState {
    pub query: Query,
    pub focus: TypeIdx,
    pub results: Vec<TypeResult>,
    pub stats: Stats,
    pub composed: Vec<Composed>,
}

/// Outcome of a successful run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Layers left out because their pattern did not compile
    pub pattern_errors: Vec<LayerPatternError>,
}

/// Query engine over one corpus
#[derive(Debug)]
pub struct Engine {
    corpus: Arc<Corpus>,
    options: EngineOptions,
    capabilities: Capabilities,
    state: Option<RunState>,
    cursor: Cursor,
    stale: bool,
}

impl Engine {
    pub fn new(corpus: Arc<Corpus>) -> Self {
        Self::with_options(corpus, EngineOptions::default())
    }

    pub fn with_options(corpus: Arc<Corpus>, options: EngineOptions) -> Self {
        let capabilities = Capabilities::detect();
        debug!(capture_offsets = capabilities.capture_offsets, "engine created");
        Self {
            corpus,
            options,
            capabilities,
            state: None,
            cursor: Cursor::default(),
            stale: false,
        }
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Run a query from scratch
    ///
    /// On failure the previous state stays in place.
    pub fn execute(&mut self, query: &Query) -> Result<RunReport, RunFailure> {
        let corpus = Arc::clone(&self.corpus);

        // Stage 1: match
        let focus = query
            .validate(&corpus)
            .map_err(|e| fail(StageError::new(Stage::Match, e), Vec::new()))?;
        let multi_group = match query.multi_group {
            MultiGroup::On if self.capabilities.capture_offsets => true,
            MultiGroup::On => {
                debug!("capture offsets unavailable, single group highlighting");
                false
            }
            MultiGroup::Off | MultiGroup::Unsupported => false,
        };

        let mut pattern_errors = Vec::new();
        let mut results = Vec::with_capacity(corpus.n_types());
        for t in 0..corpus.n_types() {
            let matched = match_type(
                &corpus,
                t,
                query.type_query(corpus.type_name(t)),
                multi_group,
                self.options.max_pattern_chars,
            );
            match matched {
                Ok((result, errors)) => {
                    pattern_errors.extend(errors);
                    results.push(result);
                }
                Err(error) => return Err(fail(error, pattern_errors)),
            }
        }

        // Stage 2: weed
        let stats = weed(&mut results, corpus.relation());

        // Stage 3: compose
        let composed = match compose(focus, &results, corpus.relation()) {
            Ok(composed) => composed,
            Err(error) => return Err(fail(error, pattern_errors)),
        };

        let old_len = self.state.as_ref().map_or(0, |s| s.composed.len());
        let mode = if self.stale {
            Recompose::Stale
        } else {
            Recompose::Keep
        };
        self.cursor.adjust(mode, old_len, composed.len());
        self.stale = false;

        info!(
            focus = corpus.type_name(focus),
            results = composed.len(),
            stats = ?self.named(&stats),
            "query run complete"
        );

        self.state = Some(RunState {
            query: query.clone(),
            focus,
            results,
            stats,
            composed,
        });

        Ok(RunReport { pattern_errors })
    }

    /// Recompose the last run for another focus type
    pub fn recompose(&mut self, focus_type: &str, mode: Recompose) -> Result<(), RunFailure> {
        let corpus = Arc::clone(&self.corpus);
        let Some(state) = self.state.as_mut() else {
            return Err(fail(
                StageError::new(Stage::Compose, "no query has been run"),
                Vec::new(),
            ));
        };
        let Some(focus) = corpus.type_index(focus_type) else {
            return Err(fail(
                StageError::new(Stage::Compose, format!("unknown focus type: {}", focus_type)),
                Vec::new(),
            ));
        };

        let composed = compose(focus, &state.results, corpus.relation())
            .map_err(|e| fail(e, Vec::new()))?;
        let mode = if self.stale { Recompose::Stale } else { mode };
        self.cursor.adjust(mode, state.composed.len(), composed.len());
        self.stale = false;

        state.focus = focus;
        state.query.focus_type = focus_type.to_string();
        state.composed = composed;
        Ok(())
    }

    /// The displayed results no longer reflect the query
    pub fn mark_stale(&mut self) {
        self.stale = true;
    }

    pub fn state(&self) -> Option<&RunState> {
        self.state.as_ref()
    }

    pub fn stats(&self) -> Option<&Stats> {
        self.state.as_ref().map(|s| &s.stats)
    }

    /// Stats keyed by node type name
    pub fn named_stats(&self) -> Vec<(&str, usize)> {
        self.stats().map(|s| self.named(s)).unwrap_or_default()
    }

    fn named(&self, stats: &Stats) -> Vec<(&str, usize)> {
        stats
            .iter()
            .map(|(&t, &n)| (self.corpus.type_name(t), n))
            .collect()
    }

    pub fn composed(&self) -> Option<&[Composed]> {
        self.state.as_ref().map(|s| s.composed.as_slice())
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn set_focus_pos(&mut self, pos: isize) {
        self.cursor.set(pos);
    }

    /// Render one node of one layer
    ///
    /// `_` gives the node identifier, or its sequence number when the last
    /// query asked for sequence numbering.
    pub fn render(
        &self,
        node_type: &str,
        layer: &str,
        node: NodeId,
    ) -> Result<Projection, StageError> {
        let t = self.corpus.type_index(node_type).ok_or_else(|| {
            StageError::new(Stage::Render, format!("unknown node type: {}", node_type))
        })?;
        let (results, seqno) = match &self.state {
            Some(state) => (state.results.as_slice(), state.query.sequence_numbering),
            None => (&[][..], false),
        };
        render_node(&self.corpus, results, t, layer, node, seqno).ok_or_else(|| {
            StageError::new(
                Stage::Render,
                format!("unknown layer {} for node type {}", layer, node_type),
            )
        })
    }

    /// Tabular export of the last run
    pub fn export(&self, options: ExportOptions) -> Result<String, StageError> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| StageError::new(Stage::Render, "no query has been run"))?;
        Ok(export(
            &self.corpus,
            &state.query,
            &state.results,
            &state.composed,
            options,
        ))
    }
}

fn fail(error: StageError, pattern_errors: Vec<LayerPatternError>) -> RunFailure {
    warn!(%error, "query run failed");
    RunFailure {
        errors: vec![error],
        pattern_errors,
    }
}
