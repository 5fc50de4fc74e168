//! Export pass for Ember: rewrites traced graphs into the ONNX operator
//! vocabulary.
//!
//! The pass is a single transformation over one graph: every traced node is
//! either structurally cloned or lowered through a symbolic rule
//! ([`ember_core::SymbolicRegistry`]); the resulting graph replaces the
//! trace state's graph atomically on success.
//!
//! # Example
//!
//! ```no_run
//! use ember_core::{SymbolicRegistry, TraceState};
//! use ember_export::to_onnx;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let mut state = TraceState::new(ember_core::Graph::new());
//! let registry = SymbolicRegistry::new();
//! to_onnx(&mut state, &registry)?;
//!
//! println!("rewrote {} nodes", state.graph.node_count());
//! # Ok(())
//! # }
//! ```

pub mod env;
pub mod error;
pub mod pass;

pub use env::{Mapping, NodeMap};
pub use error::{ExportError, Result};
pub use pass::to_onnx;
