//! Symbolic lowering contracts.
//!
//! Lowering a traced operator into the interchange vocabulary is delegated to
//! externally supplied rules. Three flavors exist, matching the three ways an
//! operator can carry its lowering:
//!
//! - [`KindSymbolic`]: keyed by operator kind, looked up in a
//!   [`SymbolicRegistry`](crate::registry::SymbolicRegistry).
//! - [`InstanceSymbolic`]: attached to a single externally defined operator
//!   instance, invoked with calling-convention-ordered arguments.
//! - [`NativeSymbolic`]: attached to a native operator implementation.
//!
//! Rules receive a [`SymbolicCtx`] giving mutable access to the graph being
//! built (never the original graph, which stays read-only for the whole
//! pass).

use crate::ir::{Graph, Node, NodeId};
use crate::trace::BufferKey;
use crate::types::AttributeValue;
use crate::Result;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Context handed to symbolic rules: the graph under construction and the
/// buffer correspondence map being rebuilt alongside it.
pub struct SymbolicCtx<'a> {
    /// The new graph. Nodes a rule creates here are stamped with the stage of
    /// the node currently being lowered.
    pub graph: &'a mut Graph,

    /// Correspondence map from opaque external keys to nodes of the new
    /// graph. Rules that materialize buffers may register entries.
    pub buffer_map: &'a mut HashMap<BufferKey, NodeId>,
}

/// Result of invoking a symbolic rule.
#[derive(Debug)]
pub enum SymbolicOutcome {
    /// The rule declines to lower this node; the pass clones it verbatim.
    Unsupported,

    /// A single replacement node, for single-output operators.
    Node(NodeId),

    /// One entry per non-handle output of the original node. `None` marks an
    /// output the lowered form does not produce; only legal if that output
    /// is unused.
    Nodes(Vec<Option<NodeId>>),
}

/// One argument marshaled for a per-instance lowering routine, in calling
/// convention order.
#[derive(Debug, Clone)]
pub enum SymbolicArg {
    /// A compile-time scalar literal ('s' tag).
    Scalar(AttributeValue),

    /// A graph-carried tensor value, already resolved into the new graph
    /// ('t' tag).
    Value(NodeId),
}

/// Kind-keyed lowering rule: maps one traced operator kind to zero or more
/// interchange-format nodes.
pub trait KindSymbolic: Send + Sync {
    /// The traced operator kind this rule lowers (registry key).
    fn name(&self) -> &str;

    /// Lower `node` into the new graph. `inputs` are the node's inputs
    /// already resolved into the new graph, in argument order.
    fn lower(
        &self,
        ctx: &mut SymbolicCtx<'_>,
        node: &Node,
        inputs: &[NodeId],
    ) -> Result<SymbolicOutcome>;
}

/// Per-instance lowering routine for an externally defined operator.
pub trait InstanceSymbolic: Send + Sync {
    /// Lower the instance. `args` follow the instance's calling convention:
    /// scalar literals and resolved tensor values interleaved as declared.
    fn lower(&self, ctx: &mut SymbolicCtx<'_>, args: &[SymbolicArg]) -> Result<SymbolicOutcome>;
}

/// Lowering capability attached to a native operator implementation.
pub trait NativeSymbolic: Send + Sync {
    /// Lower the operator. Returns one entry per non-handle output.
    fn lower(&self, ctx: &mut SymbolicCtx<'_>, inputs: &[NodeId]) -> Result<Vec<Option<NodeId>>>;
}

/// A native operator payload: name plus optionally attached lowering.
#[derive(Clone)]
pub struct NativeOp {
    /// Operator name for diagnostics and registry-free dispatch.
    pub name: String,

    /// Attached lowering routine, if the implementation provides one.
    /// Absent means the node is structurally cloned.
    pub symbolic: Option<Arc<dyn NativeSymbolic>>,
}

impl NativeOp {
    /// Create a native operator without a lowering capability.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbolic: None,
        }
    }

    /// Attach a lowering routine.
    pub fn with_symbolic(mut self, symbolic: Arc<dyn NativeSymbolic>) -> Self {
        self.symbolic = Some(symbolic);
        self
    }
}

impl fmt::Debug for NativeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeOp")
            .field("name", &self.name)
            .field("symbolic", &self.symbolic.is_some())
            .finish()
    }
}

/// An externally defined operator instance.
///
/// The calling convention is an ordered tag string as it arrives from the
/// host-language boundary: 's' marks a scalar literal argument, 't' a
/// graph-carried tensor value. Any other tag is rejected by the export pass.
#[derive(Clone)]
pub struct InstanceOp {
    /// Operator name for diagnostics.
    pub name: String,

    /// Calling-convention tag string.
    pub cconv: String,

    /// Scalar literal arguments, consumed left to right by 's' tags.
    pub scalar_args: Vec<AttributeValue>,

    /// Per-instance lowering routine, if the instance exposes one.
    pub symbolic: Option<Arc<dyn InstanceSymbolic>>,
}

impl InstanceOp {
    /// Create an instance operator without a lowering routine.
    pub fn new(name: impl Into<String>, cconv: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cconv: cconv.into(),
            scalar_args: Vec::new(),
            symbolic: None,
        }
    }

    /// Set the scalar literal arguments.
    pub fn with_scalar_args(mut self, scalar_args: Vec<AttributeValue>) -> Self {
        self.scalar_args = scalar_args;
        self
    }

    /// Attach a lowering routine.
    pub fn with_symbolic(mut self, symbolic: Arc<dyn InstanceSymbolic>) -> Self {
        self.symbolic = Some(symbolic);
        self
    }
}

impl fmt::Debug for InstanceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceOp")
            .field("name", &self.name)
            .field("cconv", &self.cconv)
            .field("scalar_args", &self.scalar_args)
            .field("symbolic", &self.symbolic.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct IdentityRule;

    impl KindSymbolic for IdentityRule {
        fn name(&self) -> &str {
            "identity"
        }

        fn lower(
            &self,
            _ctx: &mut SymbolicCtx<'_>,
            _node: &Node,
            inputs: &[NodeId],
        ) -> Result<SymbolicOutcome> {
            Ok(SymbolicOutcome::Node(inputs[0]))
        }
    }

    #[test]
    fn test_kind_symbolic_trait_object() {
        let rule: Box<dyn KindSymbolic> = Box::new(IdentityRule);
        assert_eq!(rule.name(), "identity");
    }

    #[test]
    fn test_op_payload_builders() {
        let native = NativeOp::new("custom_native");
        assert!(native.symbolic.is_none());

        let instance = InstanceOp::new("MyFn", "tst")
            .with_scalar_args(vec![AttributeValue::Int(3)]);
        assert_eq!(instance.cconv, "tst");
        assert_eq!(instance.scalar_args.len(), 1);
        assert!(instance.symbolic.is_none());
    }
}
