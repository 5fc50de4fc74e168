//! The graph-rewriting pass: traced graph in, ONNX-vocabulary graph out.
//!
//! [`to_onnx`] visits the original graph's nodes strictly in definition
//! order, dispatches each to structural cloning or a symbolic lowering rule,
//! reconciles the rule's outputs back into the node mapping, and finally
//! swaps the rewritten graph into the trace state. The original graph is
//! read-only throughout; any failure aborts the pass before the swap, so a
//! failed export leaves the trace state exactly as it was.

use crate::env::NodeMap;
use crate::error::{ExportError, Result};
use ember_core::ir::{Graph, NodeId, NodeKind};
use ember_core::registry::SymbolicRegistry;
use ember_core::symbolic::{InstanceOp, SymbolicArg, SymbolicCtx, SymbolicOutcome};
use ember_core::trace::{BufferKey, TraceState};
use std::collections::HashMap;
use tracing::trace;

/// The handle output of a multi-output node, if it has one: the trailing
/// select projection typed as an opaque handle.
fn handle_output(graph: &Graph, id: NodeId) -> Result<Option<NodeId>> {
    if !graph.node(id)?.is_multi_output() {
        return Ok(None);
    }
    let outputs = graph.value_outputs(id)?;
    if let Some(&last) = outputs.last() {
        if graph
            .node(last)?
            .ty
            .as_ref()
            .is_some_and(|ty| ty.is_handle())
        {
            return Ok(Some(last));
        }
    }
    Ok(None)
}

/// Whether a node has a handle output with recorded uses. Such a node cannot
/// be lowered: its behavior is unknown without the consumer.
fn has_used_handle(graph: &Graph, id: NodeId) -> Result<bool> {
    match handle_output(graph, id)? {
        Some(handle) => Ok(graph.value_is_used(handle)?),
        None => Ok(false),
    }
}

/// Single-use rewriting state: the graph under construction, the node
/// mapping, and the buffer map being rebuilt alongside them.
struct Exporter<'a> {
    /// The original graph, read-only for the whole pass.
    source: &'a Graph,

    /// Kind-keyed lowering rules.
    registry: &'a SymbolicRegistry,

    /// The new graph, exclusively owned until the final swap.
    graph: Graph,

    /// Buffer correspondence map for the new graph.
    buffer_map: HashMap<BufferKey, NodeId>,

    /// Mapping from original nodes to new nodes.
    env: NodeMap,
}

impl<'a> Exporter<'a> {
    fn new(source: &'a Graph, registry: &'a SymbolicRegistry) -> Self {
        Self {
            source,
            registry,
            graph: Graph::new(),
            buffer_map: HashMap::new(),
            env: NodeMap::new(),
        }
    }

    /// Resolve the original node's inputs into the new graph.
    fn resolve_inputs(&self, inputs: &[NodeId]) -> Result<Vec<NodeId>> {
        inputs.iter().map(|&input| self.env.resolve(input)).collect()
    }

    /// Scope the new graph's current stage to `stage` around `f`, restoring
    /// the previous stage on both success and error.
    fn with_node_stage(
        &mut self,
        stage: u32,
        f: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<()> {
        let previous = self.graph.set_current_stage(stage);
        let result = f(self);
        self.graph.set_current_stage(previous);
        result
    }

    /// Structurally clone a node into the new graph, unchanged.
    ///
    /// For multi-output nodes the select projections are cloned along with
    /// the node, preserving the multi-output contract exactly. This is the
    /// fallback for any node dispatch decides not to lower.
    fn clone_node(&mut self, id: NodeId) -> Result<()> {
        let source = self.source;
        let node = source.node(id)?;

        let env = &self.env;
        let new_id = self.graph.append_clone(node, |input| env.resolve(input))?;
        self.env.insert(id, new_id);

        if node.is_multi_output() {
            for use_ in node.uses() {
                let user = source.node(use_.consumer)?;
                let env = &self.env;
                let new_user = self.graph.append_clone(user, |input| env.resolve(input))?;
                self.env.insert(use_.consumer, new_user);
            }
        }
        Ok(())
    }

    /// Validate a rule's result list and install it into the node mapping.
    fn reconcile_outputs(&mut self, op: &str, id: NodeId, results: &[Option<NodeId>]) -> Result<()> {
        let source = self.source;
        let node = source.node(id)?;
        let outputs = source.value_outputs(id)?;
        let handle = handle_output(source, id)?;

        // Count outputs, excluding the handle.
        let expected = outputs.len() - usize::from(handle.is_some());
        if results.len() != expected {
            return Err(ExportError::ArityMismatch {
                op: op.to_string(),
                expected,
                actual: results.len(),
            });
        }

        for (index, (&old, result)) in outputs.iter().zip(results).enumerate() {
            match *result {
                Some(new_id) => {
                    if !self.graph.contains(new_id) {
                        return Err(ExportError::BadSymbolicResult {
                            op: op.to_string(),
                            reason: format!(
                                "output {} references node {} outside the rewritten graph",
                                index, new_id
                            ),
                        });
                    }
                    // Rules may skip typing their results; fill from the
                    // original output, but never overwrite a type the rule
                    // provided.
                    let old_ty = source.node(old)?.ty.clone();
                    let location = node.source_location.clone();
                    let new_node = self.graph.node_mut(new_id)?;
                    if new_node.ty.is_none() {
                        new_node.ty = old_ty;
                    }
                    new_node.source_location = location;
                    self.env.insert(old, new_id);
                }
                None => {
                    // The lowered form has no counterpart for this output;
                    // legal only while nothing reads it.
                    if source.value_is_used(old)? {
                        return Err(ExportError::DroppedUsedOutput {
                            op: op.to_string(),
                            index,
                        });
                    }
                    self.env.elide(old);
                }
            }
        }

        if let Some(handle) = handle {
            // A used handle never reaches reconciliation; dispatch clones
            // the node instead.
            self.env.elide(handle);
        }
        Ok(())
    }

    /// Route a rule's outcome: `Unsupported` defers to structural cloning,
    /// anything else goes through output reconciliation.
    fn process_outcome(&mut self, op: &str, id: NodeId, outcome: SymbolicOutcome) -> Result<()> {
        match outcome {
            SymbolicOutcome::Unsupported => {
                trace!(node = id, op, "rule declined, cloning");
                self.clone_node(id)
            }
            SymbolicOutcome::Node(new_id) => self.reconcile_outputs(op, id, &[Some(new_id)]),
            SymbolicOutcome::Nodes(list) => self.reconcile_outputs(op, id, &list),
        }
    }

    /// Lower a generic node through the kind-keyed registry.
    fn lower_generic(&mut self, id: NodeId, op_type: &str) -> Result<()> {
        let source = self.source;
        let registry = self.registry;
        let rule = registry
            .get(op_type)
            .ok_or_else(|| ExportError::MissingSymbolic {
                op: op_type.to_string(),
            })?;

        let node = source.node(id)?;
        let inputs = self.resolve_inputs(&node.inputs)?;
        let outcome = {
            let mut ctx = SymbolicCtx {
                graph: &mut self.graph,
                buffer_map: &mut self.buffer_map,
            };
            rule.lower(&mut ctx, node, &inputs)?
        };
        self.process_outcome(op_type, id, outcome)
    }

    /// Lower an externally defined operator instance through its attached
    /// routine, marshaling arguments per the declared calling convention.
    fn lower_instance(&mut self, id: NodeId, op: &InstanceOp) -> Result<()> {
        let source = self.source;
        let node = source.node(id)?;

        let Some(symbolic) = op.symbolic.clone() else {
            return self.clone_node(id);
        };

        let mut args = Vec::with_capacity(op.cconv.len());
        let mut tensors = node.inputs.iter();
        let mut scalars = op.scalar_args.iter();
        for tag in op.cconv.chars() {
            match tag {
                's' => {
                    let scalar = scalars.next().ok_or_else(|| {
                        ExportError::CallingConventionMismatch {
                            op: op.name.clone(),
                            detail: "more scalar tags than scalar arguments".to_string(),
                        }
                    })?;
                    args.push(SymbolicArg::Scalar(scalar.clone()));
                }
                't' => {
                    let &input = tensors.next().ok_or_else(|| {
                        ExportError::CallingConventionMismatch {
                            op: op.name.clone(),
                            detail: "more tensor tags than inputs".to_string(),
                        }
                    })?;
                    args.push(SymbolicArg::Value(self.env.resolve(input)?));
                }
                other => {
                    return Err(ExportError::BadCallingConvention {
                        op: op.name.clone(),
                        tag: other,
                    })
                }
            }
        }

        let outcome = {
            let mut ctx = SymbolicCtx {
                graph: &mut self.graph,
                buffer_map: &mut self.buffer_map,
            };
            symbolic.lower(&mut ctx, &args)?
        };
        self.process_outcome(&op.name, id, outcome)
    }

    /// Dispatch one node: structural clone, direct handling, or delegation
    /// to a lowering rule. Each node goes through here exactly once.
    fn dispatch(&mut self, id: NodeId) -> Result<()> {
        let source = self.source;
        let node = source.node(id)?;

        if node.is_multi_output() && has_used_handle(source, id)? {
            // The handle is consumed downstream; the node's true semantics
            // are opaque, so clone it and its selects verbatim.
            trace!(node = id, op = node.op_name(), "used handle, cloning verbatim");
            return self.clone_node(id);
        }

        match &node.kind {
            // Params were mapped while cloning the graph inputs.
            NodeKind::Param => Ok(()),

            // Selects are populated by their defining multi-output node.
            NodeKind::Select { .. } => {
                if self.env.contains(id) {
                    Ok(())
                } else {
                    Err(ExportError::DanglingReference { node: id })
                }
            }

            // Undefined values stand for intentionally absent tensors and
            // must survive unlowered so downstream tooling can detect any
            // that remain in use.
            NodeKind::Undefined => self.clone_node(id),

            NodeKind::Native(op) => match &op.symbolic {
                Some(symbolic) => {
                    let inputs = self.resolve_inputs(&node.inputs)?;
                    let results = {
                        let mut ctx = SymbolicCtx {
                            graph: &mut self.graph,
                            buffer_map: &mut self.buffer_map,
                        };
                        symbolic.lower(&mut ctx, &inputs)?
                    };
                    self.reconcile_outputs(&op.name, id, &results)
                }
                None => self.clone_node(id),
            },

            NodeKind::Instance(op) => self.lower_instance(id, op),

            NodeKind::Generic { op_type } => self.lower_generic(id, op_type),
        }
    }

    /// Run the rewrite: clone inputs, dispatch every node in definition
    /// order, resolve outputs, and copy the graph-level stage.
    fn run(&mut self) -> Result<()> {
        let source = self.source;

        // Inputs are cloned verbatim, preserving their per-input stage tags.
        for &input in &source.inputs {
            let node = source.node(input)?;
            let env = &self.env;
            let new_id = self.graph.append_clone(node, |i| env.resolve(i))?;
            self.graph.node_mut(new_id)?.stage = node.stage;
            self.graph.inputs.push(new_id);
            self.env.insert(input, new_id);
        }

        for id in 0..source.node_count() {
            let stage = source.node(id)?.stage;
            // Nodes created while lowering this node inherit its stage.
            self.with_node_stage(stage, |exporter| exporter.dispatch(id))?;
        }

        for &output in &source.outputs {
            let new_id = self.env.resolve(output)?;
            self.graph.outputs.push(new_id);
        }

        self.graph.set_stage(source.stage());
        Ok(())
    }

    /// Re-key the trace's buffer correspondence map through the node
    /// mapping. Entries registered by rules during lowering take precedence.
    fn translate_buffers(&mut self, buffers: &HashMap<BufferKey, NodeId>) -> Result<()> {
        for (&key, &old) in buffers {
            let new = self.env.resolve(old)?;
            self.buffer_map.entry(key).or_insert(new);
        }
        Ok(())
    }
}

/// Rewrite the trace state's graph into the ONNX operator vocabulary.
///
/// On success the state's graph and buffer map are replaced in place; the
/// old graph is discarded. On error the state is left untouched — the swap
/// is the pass's only externally observable effect and happens last.
#[tracing::instrument(skip_all, fields(
    nodes = state.graph.node_count(),
    inputs = state.graph.inputs.len(),
    outputs = state.graph.outputs.len(),
))]
pub fn to_onnx(state: &mut TraceState, registry: &SymbolicRegistry) -> Result<()> {
    if state.is_expired() {
        return Err(ExportError::StaleTraceState);
    }

    let mut exporter = Exporter::new(&state.graph, registry);
    exporter.run()?;
    exporter.translate_buffers(&state.buffer_map)?;

    let Exporter {
        graph, buffer_map, ..
    } = exporter;
    state.graph = graph;
    state.buffer_map = buffer_map;
    Ok(())
}
