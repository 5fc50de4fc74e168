//! Elementwise rule families.
//!
//! Covers: add, sub, mul, div, neg, tanh, sigmoid, exp, sqrt

use ember_core::{KindSymbolic, Node, NodeId, Result, SymbolicCtx, SymbolicOutcome};
use tracing::trace;

/// Binary elementwise lowering family.
///
/// All binary elementwise kinds lower the same way: one replacement node with
/// the interchange-format name and the same two inputs. The only differences
/// are the names and whether the traced kind carries a scaling factor.
///
/// Traced `add` and `sub` may carry an `alpha` attribute ("self + alpha *
/// other"). Only `alpha == 1` has a direct counterpart; any other value makes
/// the rule decline, and the node survives as a structural clone.
pub struct BinaryElementwiseSymbolic {
    kind: &'static str,
    onnx_name: &'static str,
    has_alpha: bool,
}

impl BinaryElementwiseSymbolic {
    /// Create the `add` rule.
    pub fn add() -> Self {
        Self {
            kind: "add",
            onnx_name: "Add",
            has_alpha: true,
        }
    }

    /// Create the `sub` rule.
    pub fn sub() -> Self {
        Self {
            kind: "sub",
            onnx_name: "Sub",
            has_alpha: true,
        }
    }

    /// Create the `mul` rule.
    pub fn mul() -> Self {
        Self {
            kind: "mul",
            onnx_name: "Mul",
            has_alpha: false,
        }
    }

    /// Create the `div` rule.
    pub fn div() -> Self {
        Self {
            kind: "div",
            onnx_name: "Div",
            has_alpha: false,
        }
    }
}

impl KindSymbolic for BinaryElementwiseSymbolic {
    fn name(&self) -> &str {
        self.kind
    }

    fn lower(
        &self,
        ctx: &mut SymbolicCtx<'_>,
        node: &Node,
        inputs: &[NodeId],
    ) -> Result<SymbolicOutcome> {
        if self.has_alpha && node.has_attr("alpha") {
            let alpha: f32 = node.attr("alpha")?;
            if alpha != 1.0 {
                trace!(kind = self.kind, alpha, "scaled form has no counterpart");
                return Ok(SymbolicOutcome::Unsupported);
            }
        }

        let mut out = Node::generic(self.onnx_name);
        out.inputs = inputs.to_vec();
        let id = ctx.graph.add_node(out)?;
        Ok(SymbolicOutcome::Node(id))
    }
}

/// Unary elementwise lowering family: a pure rename with one input.
pub struct UnaryElementwiseSymbolic {
    kind: &'static str,
    onnx_name: &'static str,
}

impl UnaryElementwiseSymbolic {
    /// Create the `neg` rule.
    pub fn neg() -> Self {
        Self {
            kind: "neg",
            onnx_name: "Neg",
        }
    }

    /// Create the `tanh` rule.
    pub fn tanh() -> Self {
        Self {
            kind: "tanh",
            onnx_name: "Tanh",
        }
    }

    /// Create the `sigmoid` rule.
    pub fn sigmoid() -> Self {
        Self {
            kind: "sigmoid",
            onnx_name: "Sigmoid",
        }
    }

    /// Create the `exp` rule.
    pub fn exp() -> Self {
        Self {
            kind: "exp",
            onnx_name: "Exp",
        }
    }

    /// Create the `sqrt` rule.
    pub fn sqrt() -> Self {
        Self {
            kind: "sqrt",
            onnx_name: "Sqrt",
        }
    }
}

impl KindSymbolic for UnaryElementwiseSymbolic {
    fn name(&self) -> &str {
        self.kind
    }

    fn lower(
        &self,
        ctx: &mut SymbolicCtx<'_>,
        _node: &Node,
        inputs: &[NodeId],
    ) -> Result<SymbolicOutcome> {
        let mut out = Node::generic(self.onnx_name);
        out.inputs = inputs.to_vec();
        let id = ctx.graph.add_node(out)?;
        Ok(SymbolicOutcome::Node(id))
    }
}
