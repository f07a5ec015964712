//! Layersearch: regular-expression search over layered corpora
//!
//! A corpus is a hierarchy of node types (say character ⊂ word ⊂ sentence),
//! each with one or more independent text layers. A query gives a pattern
//! per layer; the engine finds the nodes of a chosen focus type that are
//! consistent with every pattern across the hierarchy.

// Corpus data
pub mod bytes; // Byte helpers for the compact encodings
pub mod corpus; // Node types, layers, layer text
pub mod loader; // Reading corpus bundles from disk
pub mod position; // Character offset <-> node index
pub mod relation; // Parent/children index

// Query pipeline
pub mod compose; // Result trees per focus node
pub mod error;
pub mod matcher; // Per-layer regex matching
pub mod query; // Query object
pub mod render; // Run projection and tabular export
pub mod searcher; // Engine: match + weed + compose
pub mod weed; // Constraint propagation across node types

// Re-exports for convenience
pub use compose::{Composed, Cursor, Entry, Recompose};
pub use corpus::{Corpus, CorpusDescription, NodeId, NodeSet, TypeIdx};
pub use error::{CorpusError, PatternError, RunFailure, Stage, StageError};
pub use loader::{CorpusBundle, load_corpus};
pub use query::{Flags, LayerQuery, MultiGroup, NODE_LAYER, Query};
pub use render::{ColumnPolicy, ExportOptions, Projection, RowPolicy, Run};
pub use searcher::{Engine, EngineOptions, RunReport};
pub use weed::Stats;
