//! Core rule registry.
//!
//! Provides a pre-populated registry with the built-in lowering rules.

use ember_core::SymbolicRegistry;

use crate::families::{BinaryElementwiseSymbolic, UnaryElementwiseSymbolic};
use crate::operators::{MaxPool2dSymbolic, ViewSymbolic};

/// Returns a rule registry pre-populated with the built-in lowering rules.
///
/// The registry includes:
/// - 4 binary elementwise rules (add, sub, mul, div)
/// - 5 unary elementwise rules (neg, tanh, sigmoid, exp, sqrt)
/// - 1 pooling rule (max_pool2d)
/// - 1 shape manipulation rule (view)
///
/// Custom rules can be added to the returned registry via
/// `registry.register(kind, rule)`.
pub fn core_symbolic_registry() -> SymbolicRegistry {
    let mut registry = SymbolicRegistry::new();

    // Binary elementwise rules
    registry.register("add", BinaryElementwiseSymbolic::add());
    registry.register("sub", BinaryElementwiseSymbolic::sub());
    registry.register("mul", BinaryElementwiseSymbolic::mul());
    registry.register("div", BinaryElementwiseSymbolic::div());

    // Unary elementwise rules
    registry.register("neg", UnaryElementwiseSymbolic::neg());
    registry.register("tanh", UnaryElementwiseSymbolic::tanh());
    registry.register("sigmoid", UnaryElementwiseSymbolic::sigmoid());
    registry.register("exp", UnaryElementwiseSymbolic::exp());
    registry.register("sqrt", UnaryElementwiseSymbolic::sqrt());

    // Pooling rules
    registry.register("max_pool2d", MaxPool2dSymbolic);

    // Shape manipulation rules
    registry.register("view", ViewSymbolic);

    registry
}
