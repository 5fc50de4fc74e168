//! Error types for the export pass.
//!
//! Every failure here is fatal: the pass has no partial-success mode, and
//! any error leaves the caller's trace state untouched.

use ember_core::ir::NodeId;
use thiserror::Error;

/// Result type for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Errors that can occur while rewriting a traced graph.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The trace state expired before the pass started.
    #[error("trace state is expired")]
    StaleTraceState,

    /// A node was consulted before it was visited. Indicates a visitation
    /// order bug or a reference into the graph from outside it.
    #[error("dangling node reference: node {node} was never visited")]
    DanglingReference { node: NodeId },

    /// A node mapped to "elided" was looked up by a consumer: some rule
    /// dropped an output the graph still needs.
    #[error("node {node} was elided during lowering but is still used")]
    UsedElidedOutput { node: NodeId },

    /// No lowering rule is registered for a traced operator kind.
    #[error("no symbolic rule registered for operator '{op}'")]
    MissingSymbolic { op: String },

    /// A rule produced the wrong number of outputs.
    #[error(
        "symbolic for {op} produced an incorrect number of outputs \
         (expected {expected}, but got {actual})"
    )]
    ArityMismatch {
        op: String,
        expected: usize,
        actual: usize,
    },

    /// A rule returned something that is not a node of the new graph.
    #[error("symbolic for {op} returned an invalid result: {reason}")]
    BadSymbolicResult { op: String, reason: String },

    /// A rule returned `None` for an output the graph still uses.
    #[error(
        "symbolic for {op} returned None for output {index} (indicating conversion \
         for that output is not supported), but the graph uses this output later"
    )]
    DroppedUsedOutput { op: String, index: usize },

    /// An instance operator declared a calling-convention tag outside the
    /// two known kinds.
    #[error("unexpected calling convention tag '{tag}' for operator '{op}'")]
    BadCallingConvention { op: String, tag: char },

    /// A calling convention consumed more arguments than the instance
    /// provides.
    #[error("calling convention mismatch for operator '{op}': {detail}")]
    CallingConventionMismatch { op: String, detail: String },

    /// Graph-library or rule-internal failure.
    #[error(transparent)]
    Core(#[from] ember_core::Error),
}
