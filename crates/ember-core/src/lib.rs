//! Core trace-graph IR, lowering contracts, and rule registry for Ember.
//!
//! This crate provides the foundational abstractions the export pass is built
//! on:
//! - Trace-graph IR (`Graph`, `Node`, `NodeKind`) with definition-order nodes
//! - Value typing (`ValueType`, `DataType`) and operator attributes
//! - The live trace-state handle (`TraceState`) consumed by the export pass
//! - Symbolic lowering contracts (`KindSymbolic`, `InstanceSymbolic`,
//!   `NativeSymbolic`) and the rule registry (`SymbolicRegistry`)

pub mod ir;
pub mod registry;
pub mod symbolic;
pub mod trace;
pub mod types;

// Re-export commonly used types
pub use ir::{Graph, Node, NodeId, NodeKind, Use};
pub use registry::SymbolicRegistry;
pub use symbolic::{
    InstanceOp, InstanceSymbolic, KindSymbolic, NativeOp, NativeSymbolic, SymbolicArg,
    SymbolicCtx, SymbolicOutcome,
};
pub use trace::{BufferKey, TraceState};
pub use types::{AttributeValue, DataType, SourceLocation, TensorMeta, ValueType};

/// Result type using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for graph and rule operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid graph structure: {0}")]
    InvalidGraph(String),

    #[error("Missing attribute: {0}")]
    MissingAttribute(String),

    #[error("Attribute type mismatch: expected {expected}, got {actual}")]
    AttributeTypeMismatch { expected: String, actual: String },

    #[error("Symbolic rule error: {0}")]
    Symbolic(String),
}
