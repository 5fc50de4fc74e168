//! Shape manipulation lowering rules.

use ember_core::{
    AttributeValue, Error, KindSymbolic, Node, NodeId, Result, SymbolicCtx, SymbolicOutcome,
};

/// Lowers traced `view` to a `Reshape` node.
///
/// Tracing records the requested sizes as the `size` attribute; the lowered
/// node carries them as its `shape` attribute.
pub struct ViewSymbolic;

impl KindSymbolic for ViewSymbolic {
    fn name(&self) -> &str {
        "view"
    }

    fn lower(
        &self,
        ctx: &mut SymbolicCtx<'_>,
        node: &Node,
        inputs: &[NodeId],
    ) -> Result<SymbolicOutcome> {
        let size: Vec<i64> = node.attr("size")?;
        let &input = inputs
            .first()
            .ok_or_else(|| Error::Symbolic("view requires an input tensor".to_string()))?;

        let mut reshape = Node::generic("Reshape");
        reshape.add_input(input);
        reshape.set_attribute("shape", AttributeValue::Ints(size));
        let id = ctx.graph.add_node(reshape)?;
        Ok(SymbolicOutcome::Node(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::{DataType, Graph, ValueType};
    use std::collections::HashMap;

    #[test]
    fn test_view_lowers_to_reshape() {
        let mut graph = Graph::new();
        let a = graph.add_input(ValueType::tensor(DataType::F32, vec![2, 6]));
        let mut buffer_map = HashMap::new();
        let mut ctx = SymbolicCtx {
            graph: &mut graph,
            buffer_map: &mut buffer_map,
        };

        let mut node = Node::generic("view");
        node.add_input(0);
        node.set_attribute("size", AttributeValue::Ints(vec![3, 4]));

        let outcome = ViewSymbolic.lower(&mut ctx, &node, &[a]).unwrap();
        let SymbolicOutcome::Node(id) = outcome else {
            panic!("expected a single node");
        };
        let reshape = graph.node(id).unwrap();
        assert_eq!(reshape.op_name(), "Reshape");
        let shape: Vec<i64> = reshape.attr("shape").unwrap();
        assert_eq!(shape, vec![3, 4]);
    }

    #[test]
    fn test_view_without_size_fails() {
        let mut graph = Graph::new();
        let a = graph.add_input(ValueType::tensor(DataType::F32, vec![2, 6]));
        let mut buffer_map = HashMap::new();
        let mut ctx = SymbolicCtx {
            graph: &mut graph,
            buffer_map: &mut buffer_map,
        };

        let node = Node::generic("view");
        assert!(ViewSymbolic.lower(&mut ctx, &node, &[a]).is_err());
    }
}
