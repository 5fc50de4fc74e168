//! Pooling lowering rules.

use ember_core::{
    AttributeValue, Error, KindSymbolic, Node, NodeId, Result, SymbolicCtx, SymbolicOutcome,
};

/// Lowers traced `max_pool2d` to a `MaxPool` node.
///
/// The traced form has two outputs: the pooled tensor and the argmax indices.
/// `MaxPool` here produces only the pooled tensor, so the indices output is
/// dropped; the pass rejects the lowering if anything reads it.
///
/// Attribute translation:
/// - `kernel_size` → `kernel_shape`
/// - `stride` → `strides` (defaults to `kernel_size` when absent, matching
///   the traced operator's semantics)
/// - `padding` `[p0, p1]` → symmetric `pads` `[p0, p1, p0, p1]`
/// - `ceil_mode` → `ceil_mode`
///
/// Dilated pooling has no counterpart; the rule declines and the node is
/// cloned.
pub struct MaxPool2dSymbolic;

impl KindSymbolic for MaxPool2dSymbolic {
    fn name(&self) -> &str {
        "max_pool2d"
    }

    fn lower(
        &self,
        ctx: &mut SymbolicCtx<'_>,
        node: &Node,
        inputs: &[NodeId],
    ) -> Result<SymbolicOutcome> {
        if node.has_attr("dilation") {
            let dilation: Vec<i64> = node.attr("dilation")?;
            if dilation.iter().any(|&d| d != 1) {
                return Ok(SymbolicOutcome::Unsupported);
            }
        }

        let kernel: Vec<i64> = node.attr("kernel_size")?;
        let strides: Vec<i64> = if node.has_attr("stride") {
            node.attr("stride")?
        } else {
            kernel.clone()
        };

        let mut pads = Vec::new();
        if node.has_attr("padding") {
            let padding: Vec<i64> = node.attr("padding")?;
            pads.extend_from_slice(&padding);
            pads.extend_from_slice(&padding);
        }

        let &input = inputs.first().ok_or_else(|| {
            Error::Symbolic("max_pool2d requires an input tensor".to_string())
        })?;

        let mut pool = Node::generic("MaxPool");
        pool.add_input(input);
        pool.set_attribute("kernel_shape", AttributeValue::Ints(kernel));
        pool.set_attribute("strides", AttributeValue::Ints(strides));
        if !pads.is_empty() {
            pool.set_attribute("pads", AttributeValue::Ints(pads));
        }
        if node.has_attr("ceil_mode") {
            let ceil_mode: i64 = node.attr("ceil_mode")?;
            pool.set_attribute("ceil_mode", AttributeValue::Int(ceil_mode));
        }
        let pool_id = ctx.graph.add_node(pool)?;

        // Pooled tensor, then the dropped indices output.
        Ok(SymbolicOutcome::Nodes(vec![Some(pool_id), None]))
    }
}
