//! Error types
//!
//! Corpus errors are fatal to a corpus load. Pattern errors are local to
//! one layer of one run. Stage errors abort the rest of a run but leave the
//! engine usable.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Error while building or loading corpus data
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Malformed encoding at line {line}: {message}")]
    MalformedEncoding { line: usize, message: String },

    #[error("Unknown node type: {0}")]
    UnknownType(String),

    #[error("Unknown layer {layer} for node type {node_type}")]
    UnknownLayer { node_type: String, layer: String },

    #[error("Missing position data for key {0}")]
    MissingPositions(String),

    #[error("Failed to open {path}: {source}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CorpusError {
    pub(crate) fn malformed(line: usize, message: impl Into<String>) -> Self {
        CorpusError::MalformedEncoding {
            line,
            message: message.into(),
        }
    }
}

/// Error compiling a layer pattern
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("Invalid pattern: {0}")]
    Invalid(String),

    #[error("Pattern too long: {len} characters (maximum {max})")]
    TooLong { len: usize, max: usize },
}

/// The query stage an error was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Match,
    Weed,
    Compose,
    Render,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Match => "match",
            Stage::Weed => "weed",
            Stage::Compose => "compose",
            Stage::Render => "render",
        };
        f.write_str(name)
    }
}

/// Error captured inside one stage of a query run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{stage} stage failed: {error}")]
pub struct StageError {
    pub stage: Stage,
    pub error: String,
}

impl StageError {
    pub fn new(stage: Stage, error: impl ToString) -> Self {
        Self {
            stage,
            error: error.to_string(),
        }
    }
}

/// Pattern error tagged with the layer it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerPatternError {
    pub node_type: String,
    pub layer: String,
    pub error: PatternError,
}

/// A query run that did not complete
///
/// The engine keeps showing the state of its last successful run.
#[derive(Debug, Clone, Error)]
#[error("query run failed ({} stage error(s))", .errors.len())]
pub struct RunFailure {
    pub errors: Vec<StageError>,
    pub pattern_errors: Vec<LayerPatternError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_error_display() {
        let err = StageError::new(Stage::Compose, "unknown focus type: clause");
        assert_eq!(
            err.to_string(),
            "compose stage failed: unknown focus type: clause"
        );
    }

    #[test]
    fn test_malformed_display() {
        let err = CorpusError::malformed(3, "bad range 1-x");
        assert_eq!(
            err.to_string(),
            "Malformed encoding at line 3: bad range 1-x"
        );
    }
}
