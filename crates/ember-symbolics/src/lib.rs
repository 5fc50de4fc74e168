//! Standard lowering rules for traced-operator kinds.
//!
//! This crate provides the built-in [`KindSymbolic`] rule set used by the
//! export pass, with repetitive elementwise rules collapsed into families.
//!
//! # Rule Families
//!
//! - **Binary elementwise**: add, sub, mul, div
//! - **Unary elementwise**: neg, tanh, sigmoid, exp, sqrt
//!
//! # Individual Rules
//!
//! Rules with nontrivial lowering shapes:
//! - Pooling (max_pool2d: drops the unused indices output)
//! - Shape manipulation (view)
//!
//! [`KindSymbolic`]: ember_core::KindSymbolic

pub mod families;
pub mod operators;

mod registry;

pub use families::{BinaryElementwiseSymbolic, UnaryElementwiseSymbolic};
pub use registry::core_symbolic_registry;
