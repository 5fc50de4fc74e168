//! Collapsed rule families for elementwise operators.

mod elementwise;

pub use elementwise::{BinaryElementwiseSymbolic, UnaryElementwiseSymbolic};
