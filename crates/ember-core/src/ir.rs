//! Trace-graph intermediate representation.
//!
//! The IR is a flat node list where definition order *is* topological order:
//! tracing appends nodes as operations execute, so every input of a node
//! refers to an earlier node. Passes rely on this invariant and visit nodes
//! by index.
//!
//! A node produces a single value, except multi-output nodes: those carry the
//! `ValueType::Multi` marker and their individual results are projected by
//! `Select` consumer nodes. Node identity is therefore value identity, with
//! selects standing in for tuple elements.

use crate::symbolic::{InstanceOp, NativeOp};
use crate::types::{AttributeValue, SourceLocation, ValueType};
use crate::{Error, Result};
use std::collections::HashMap;

/// Unique identifier for a node in the graph (index into the node list).
pub type NodeId = usize;

/// A recorded read of a node's value: which node consumes it, at which input
/// slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Use {
    /// The consuming node.
    pub consumer: NodeId,

    /// Input position within the consumer.
    pub slot: usize,
}

/// Operator tag of a node. A closed set: the export pass dispatches by
/// matching on this enum rather than by inspecting runtime types.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Graph input. Cloned verbatim by the export pass, never lowered.
    Param,

    /// Projection of one result of a multi-output node. The single input
    /// references the defining node; `index` picks the result.
    Select { index: usize },

    /// Reserved "intentionally absent tensor" operator (e.g. an omitted
    /// optional bias). Always survives lowering unchanged so downstream
    /// tooling can detect leftovers.
    Undefined,

    /// Operator defined natively by the runtime, optionally carrying its own
    /// lowering routine.
    Native(NativeOp),

    /// Externally defined (host-language) operator instance with a calling
    /// convention and scalar literal arguments.
    Instance(InstanceOp),

    /// Ordinary traced operator, lowered through the kind-keyed registry.
    Generic { op_type: String },
}

/// A node in the trace graph.
#[derive(Debug, Clone)]
pub struct Node {
    /// Operator tag.
    pub kind: NodeKind,

    /// Nodes whose values this node reads, in argument order.
    pub inputs: Vec<NodeId>,

    /// Type of the value this node produces, if known. `Some(Multi)` marks a
    /// multi-output node whose results are read through selects.
    pub ty: Option<ValueType>,

    /// Operator attributes (e.g. kernel_shape, alpha).
    pub attributes: HashMap<String, AttributeValue>,

    /// Execution-phase tag, stamped from the graph's current stage on
    /// insertion.
    pub stage: u32,

    /// Where in the traced program this node came from.
    pub source_location: Option<SourceLocation>,

    /// Recorded reads of this node's value, maintained by the graph.
    uses: Vec<Use>,
}

impl Node {
    /// Create a new node with the given kind and no inputs.
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            inputs: Vec::new(),
            ty: None,
            attributes: HashMap::new(),
            stage: 0,
            source_location: None,
            uses: Vec::new(),
        }
    }

    /// Create a generic traced operator node.
    pub fn generic(op_type: impl Into<String>) -> Self {
        Self::new(NodeKind::Generic {
            op_type: op_type.into(),
        })
    }

    /// Create a graph-input node with the given value type.
    pub fn param(ty: ValueType) -> Self {
        let mut node = Self::new(NodeKind::Param);
        node.ty = Some(ty);
        node
    }

    /// Create a select node projecting result `index` of `producer`.
    pub fn select(producer: NodeId, index: usize) -> Self {
        let mut node = Self::new(NodeKind::Select { index });
        node.inputs.push(producer);
        node
    }

    /// Create an undefined-value node.
    pub fn undefined() -> Self {
        Self::new(NodeKind::Undefined)
    }

    /// Add an input edge.
    pub fn add_input(&mut self, input: NodeId) {
        self.inputs.push(input);
    }

    /// Set an attribute.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.attributes.insert(key.into(), value);
    }

    /// Get an attribute value, converted to the requested type.
    pub fn attr<T>(&self, name: &str) -> Result<T>
    where
        T: TryFrom<AttributeValue>,
        T::Error: std::fmt::Display,
    {
        let value = self
            .attributes
            .get(name)
            .ok_or_else(|| Error::MissingAttribute(name.to_string()))?;

        T::try_from(value.clone()).map_err(|e| Error::AttributeTypeMismatch {
            expected: std::any::type_name::<T>().to_string(),
            actual: format!("{}", e),
        })
    }

    /// Check if an attribute exists.
    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Recorded reads of this node's value.
    pub fn uses(&self) -> &[Use] {
        &self.uses
    }

    /// Check if this is a multi-output node (results read through selects).
    pub fn is_multi_output(&self) -> bool {
        matches!(self.ty, Some(ValueType::Multi))
    }

    /// Operator name for diagnostics.
    pub fn op_name(&self) -> &str {
        match &self.kind {
            NodeKind::Param => "param",
            NodeKind::Select { .. } => "select",
            NodeKind::Undefined => "undefined",
            NodeKind::Native(op) => &op.name,
            NodeKind::Instance(op) => &op.name,
            NodeKind::Generic { op_type } => op_type,
        }
    }
}

/// Trace graph: nodes in definition order plus designated inputs/outputs.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    /// All nodes, in definition order (= topological order).
    nodes: Vec<Node>,

    /// Graph input node ids (always `Param` nodes).
    pub inputs: Vec<NodeId>,

    /// Graph output node ids.
    pub outputs: Vec<NodeId>,

    /// Execution-phase tag of the graph as a whole.
    stage: u32,

    /// Stage stamped onto newly inserted nodes.
    current_stage: u32,
}

impl Graph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an immutable reference to a node.
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| Error::InvalidGraph(format!("Node {} not found", id)))
    }

    /// Get a mutable reference to a node.
    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| Error::InvalidGraph(format!("Node {} not found", id)))
    }

    /// Check if a node id is valid in this graph.
    pub fn contains(&self, id: NodeId) -> bool {
        id < self.nodes.len()
    }

    /// Get the number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Iterate over node ids in definition order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        0..self.nodes.len()
    }

    /// Iterate over all nodes in definition order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate()
    }

    /// Add a node to the graph and return its id.
    ///
    /// Stamps the node with the graph's current stage and records a use on
    /// every input. Inputs must reference nodes already in the graph; the
    /// definition-order invariant forbids forward references.
    pub fn add_node(&mut self, mut node: Node) -> Result<NodeId> {
        let id = self.nodes.len();

        for &input in &node.inputs {
            if input >= id {
                return Err(Error::InvalidGraph(format!(
                    "Node {} input references node {} which is not yet defined",
                    id, input
                )));
            }
        }

        node.stage = self.current_stage;
        node.uses.clear();

        for (slot, &input) in node.inputs.iter().enumerate() {
            self.nodes[input].uses.push(Use { consumer: id, slot });
        }

        self.nodes.push(node);
        Ok(id)
    }

    /// Add a graph-input node with the given value type and return its id.
    pub fn add_input(&mut self, ty: ValueType) -> NodeId {
        let id = self.nodes.len();
        let mut node = Node::param(ty);
        node.stage = self.current_stage;
        self.nodes.push(node);
        self.inputs.push(id);
        id
    }

    /// Clone a node (possibly from another graph) into this graph, remapping
    /// its inputs through `resolve`.
    ///
    /// Copies kind, type, attributes, and source location; the clone is
    /// stamped with this graph's current stage.
    pub fn append_clone<E>(
        &mut self,
        node: &Node,
        mut resolve: impl FnMut(NodeId) -> std::result::Result<NodeId, E>,
    ) -> std::result::Result<NodeId, E>
    where
        E: From<Error>,
    {
        let mut inputs = Vec::with_capacity(node.inputs.len());
        for &input in &node.inputs {
            inputs.push(resolve(input)?);
        }

        let clone = Node {
            kind: node.kind.clone(),
            inputs,
            ty: node.ty.clone(),
            attributes: node.attributes.clone(),
            stage: 0, // stamped by add_node
            source_location: node.source_location.clone(),
            uses: Vec::new(),
        };

        self.add_node(clone).map_err(E::from)
    }

    /// The value outputs of a node: the node itself for single-output nodes,
    /// or its select projections in index order for multi-output nodes.
    pub fn value_outputs(&self, id: NodeId) -> Result<Vec<NodeId>> {
        let node = self.node(id)?;
        if !node.is_multi_output() {
            return Ok(vec![id]);
        }

        let mut selects = Vec::with_capacity(node.uses.len());
        for use_ in &node.uses {
            match self.nodes[use_.consumer].kind {
                NodeKind::Select { index } => selects.push((index, use_.consumer)),
                _ => {
                    return Err(Error::InvalidGraph(format!(
                        "Multi-output node {} has non-select consumer {}",
                        id, use_.consumer
                    )))
                }
            }
        }
        selects.sort_by_key(|&(index, _)| index);
        Ok(selects.into_iter().map(|(_, select)| select).collect())
    }

    /// Check if a node's value is read anywhere, counting graph outputs as
    /// uses.
    pub fn value_is_used(&self, id: NodeId) -> Result<bool> {
        let node = self.node(id)?;
        Ok(!node.uses.is_empty() || self.outputs.contains(&id))
    }

    /// Execution-phase tag of the graph.
    pub fn stage(&self) -> u32 {
        self.stage
    }

    /// Set the graph's execution-phase tag.
    pub fn set_stage(&mut self, stage: u32) {
        self.stage = stage;
    }

    /// Stage stamped onto newly inserted nodes.
    pub fn current_stage(&self) -> u32 {
        self.current_stage
    }

    /// Set the stage for newly inserted nodes, returning the previous value
    /// so callers can restore it.
    pub fn set_current_stage(&mut self, stage: u32) -> u32 {
        std::mem::replace(&mut self.current_stage, stage)
    }

    /// Validate graph structure.
    ///
    /// Checks that inputs are `Param` nodes, that outputs exist, and that
    /// select nodes project from multi-output producers.
    pub fn validate(&self) -> Result<()> {
        for &input in &self.inputs {
            let node = self.node(input)?;
            if !matches!(node.kind, NodeKind::Param) {
                return Err(Error::InvalidGraph(format!(
                    "Graph input {} is not a param node",
                    input
                )));
            }
        }

        for &output in &self.outputs {
            self.node(output)?;
        }

        for (id, node) in self.nodes() {
            if let NodeKind::Select { .. } = node.kind {
                let producer = *node.inputs.first().ok_or_else(|| {
                    Error::InvalidGraph(format!("Select node {} has no producer input", id))
                })?;
                if !self.node(producer)?.is_multi_output() {
                    return Err(Error::InvalidGraph(format!(
                        "Select node {} projects from single-output node {}",
                        id, producer
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;

    fn f32_tensor() -> ValueType {
        ValueType::tensor(DataType::F32, vec![2, 2])
    }

    #[test]
    fn test_create_empty_graph() {
        let graph = Graph::new();
        assert_eq!(graph.node_count(), 0);
        assert!(graph.inputs.is_empty());
        assert!(graph.outputs.is_empty());
    }

    #[test]
    fn test_add_node_records_uses() {
        let mut graph = Graph::new();
        let a = graph.add_input(f32_tensor());
        let b = graph.add_input(f32_tensor());

        let mut add = Node::generic("add");
        add.add_input(a);
        add.add_input(b);
        add.ty = Some(f32_tensor());
        let add_id = graph.add_node(add).unwrap();

        assert_eq!(graph.node(a).unwrap().uses(), &[Use { consumer: add_id, slot: 0 }]);
        assert_eq!(graph.node(b).unwrap().uses(), &[Use { consumer: add_id, slot: 1 }]);
        assert!(graph.value_is_used(a).unwrap());
        assert!(!graph.value_is_used(add_id).unwrap());
    }

    #[test]
    fn test_graph_output_counts_as_use() {
        let mut graph = Graph::new();
        let a = graph.add_input(f32_tensor());
        graph.outputs.push(a);
        assert!(graph.value_is_used(a).unwrap());
    }

    #[test]
    fn test_add_node_rejects_forward_reference() {
        let mut graph = Graph::new();
        let mut node = Node::generic("add");
        node.add_input(7);
        assert!(graph.add_node(node).is_err());
    }

    #[test]
    fn test_value_outputs_single() {
        let mut graph = Graph::new();
        let a = graph.add_input(f32_tensor());
        assert_eq!(graph.value_outputs(a).unwrap(), vec![a]);
    }

    #[test]
    fn test_value_outputs_multi_in_index_order() {
        let mut graph = Graph::new();
        let a = graph.add_input(f32_tensor());

        let mut pool = Node::generic("max_pool2d");
        pool.add_input(a);
        pool.ty = Some(ValueType::Multi);
        let pool_id = graph.add_node(pool).unwrap();

        // Register selects out of order; value_outputs sorts by index.
        let mut sel1 = Node::select(pool_id, 1);
        sel1.ty = Some(f32_tensor());
        let sel1_id = graph.add_node(sel1).unwrap();

        let mut sel0 = Node::select(pool_id, 0);
        sel0.ty = Some(f32_tensor());
        let sel0_id = graph.add_node(sel0).unwrap();

        assert_eq!(graph.value_outputs(pool_id).unwrap(), vec![sel0_id, sel1_id]);
    }

    #[test]
    fn test_value_outputs_rejects_non_select_consumer() {
        let mut graph = Graph::new();
        let a = graph.add_input(f32_tensor());

        let mut multi = Node::generic("multi");
        multi.add_input(a);
        multi.ty = Some(ValueType::Multi);
        let multi_id = graph.add_node(multi).unwrap();

        let mut bad = Node::generic("consumer");
        bad.add_input(multi_id);
        graph.add_node(bad).unwrap();

        assert!(graph.value_outputs(multi_id).is_err());
    }

    #[test]
    fn test_stage_stamping_and_restore() {
        let mut graph = Graph::new();
        let previous = graph.set_current_stage(2);
        assert_eq!(previous, 0);

        let a = graph.add_input(f32_tensor());
        assert_eq!(graph.node(a).unwrap().stage, 2);

        graph.set_current_stage(previous);
        let b = graph.add_input(f32_tensor());
        assert_eq!(graph.node(b).unwrap().stage, 0);
    }

    #[test]
    fn test_append_clone_remaps_inputs() {
        let mut source = Graph::new();
        let a = source.add_input(f32_tensor());
        let mut neg = Node::generic("neg");
        neg.add_input(a);
        neg.ty = Some(f32_tensor());
        neg.source_location = Some(crate::types::SourceLocation::new("model.forward:12"));
        let neg_id = source.add_node(neg).unwrap();

        let mut target = Graph::new();
        let new_a = target.add_input(f32_tensor());

        let cloned = target
            .append_clone::<Error>(source.node(neg_id).unwrap(), |id| {
                assert_eq!(id, a);
                Ok(new_a)
            })
            .unwrap();

        let clone = target.node(cloned).unwrap();
        assert_eq!(clone.inputs, vec![new_a]);
        assert_eq!(clone.op_name(), "neg");
        assert_eq!(clone.ty, Some(f32_tensor()));
        assert!(clone.source_location.is_some());
    }

    #[test]
    fn test_attr_access() {
        let mut node = Node::generic("conv");
        node.set_attribute("kernel_size", AttributeValue::Ints(vec![3, 3]));

        let kernel: Vec<i64> = node.attr("kernel_size").unwrap();
        assert_eq!(kernel, vec![3, 3]);
        assert!(node.has_attr("kernel_size"));
        assert!(node.attr::<f32>("kernel_size").is_err());
        assert!(node.attr::<i64>("missing").is_err());
    }

    #[test]
    fn test_validate() {
        let mut graph = Graph::new();
        let a = graph.add_input(f32_tensor());
        let mut neg = Node::generic("neg");
        neg.add_input(a);
        let neg_id = graph.add_node(neg).unwrap();
        graph.outputs.push(neg_id);

        assert!(graph.validate().is_ok());

        // A select projecting from a single-output node is malformed.
        let sel = Node::select(neg_id, 0);
        graph.add_node(sel).unwrap();
        assert!(graph.validate().is_err());
    }
}
