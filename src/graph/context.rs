//! The graph IR
//!
//! `Graph` is the central structure for working with computation graphs.
//! Operations live in an index-addressed arena behind shared pointers; the
//! derived lookup maps are built once at construction.

use std::sync::Arc;

use crate::error::ValidationError;

use super::attr::Metadata;
use super::maps::{
    build_consumer_map, build_op_index, build_producer_map, ConsumerMap, OpId, OpIndexMap,
    ProducerMap, TensorRef, TensorUse,
};
use super::op::{OpInfo, TensorInfo};
use super::validation::{check_topo_order, topo_sort};

/// Operations plus everything derived from them
#[derive(Debug)]
pub(crate) struct OpArena {
    pub(crate) ops: Vec<Arc<OpInfo>>,
    pub(crate) op_index: OpIndexMap,
    pub(crate) producer_map: ProducerMap,
    pub(crate) consumer_map: ConsumerMap,
    pub(crate) topo_order: Vec<OpId>,
    pub(crate) output_nodes: Vec<OpId>,
}

impl OpArena {
    /// Build and validate an arena
    ///
    /// `topo_order` is checked when given, computed otherwise.
    pub(crate) fn build(
        ops: Vec<Arc<OpInfo>>,
        output_nodes: &[String],
        topo_order: Option<Vec<OpId>>,
    ) -> Result<Self, ValidationError> {
        let op_index = build_op_index(&ops)?;
        let producer_map = build_producer_map(&ops)?;
        let consumer_map = build_consumer_map(&ops, &producer_map)?;

        let topo_order = match topo_order {
            Some(order) => {
                check_topo_order(&ops, &producer_map, &order)?;
                order
            }
            None => topo_sort(&ops, &producer_map)?,
        };

        let mut outputs: Vec<OpId> = Vec::with_capacity(output_nodes.len());
        for name in output_nodes {
            let id = *op_index
                .get(name)
                .ok_or_else(|| ValidationError::UnknownOutput(name.clone()))?;
            if !outputs.contains(&id) {
                outputs.push(id);
            }
        }

        Ok(Self {
            ops,
            op_index,
            producer_map,
            consumer_map,
            topo_order,
            output_nodes: outputs,
        })
    }
}

/// An immutable, validated computation graph
///
/// Every instance satisfies:
/// 1. the op graph is acyclic
/// 2. every input resolves to an output of an op in the same graph
/// 3. `topo_order` places producers before consumers
/// 4. `output_nodes` are ops of the graph
///
/// Cloning is cheap and yields an independent value: nothing reachable from a
/// `Graph` can be mutated.
#[derive(Debug, Clone)]
pub struct Graph {
    pub(crate) arena: Arc<OpArena>,
    pub(crate) metadata: Metadata,
}

impl Graph {
    /// Build a graph from operations and output node names
    ///
    /// Fails if the operations contain a cycle, reference an unknown tensor,
    /// repeat an op or tensor name, or if an output node is not an op.
    pub fn new<I, S>(ops: Vec<OpInfo>, output_nodes: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let outputs: Vec<String> = output_nodes.into_iter().map(Into::into).collect();
        let ops = ops.into_iter().map(Arc::new).collect();
        Self::from_shared(ops, &outputs, None, Metadata::new())
    }

    pub(crate) fn from_shared(
        ops: Vec<Arc<OpInfo>>,
        output_nodes: &[String],
        topo_order: Option<Vec<OpId>>,
        metadata: Metadata,
    ) -> Result<Self, ValidationError> {
        let arena = OpArena::build(ops, output_nodes, topo_order)?;
        Ok(Self {
            arena: Arc::new(arena),
            metadata,
        })
    }

    // ========================================================================
    // Op accessors
    // ========================================================================

    /// Get an op by name
    pub fn op(&self, name: &str) -> Option<&OpInfo> {
        self.op_id(name).map(|id| self.op_by_id(id))
    }

    /// Get an op by name, failing with [`ValidationError::UnknownOp`]
    pub fn require_op(&self, name: &str) -> Result<&OpInfo, ValidationError> {
        self.op(name)
            .ok_or_else(|| ValidationError::UnknownOp(name.to_string()))
    }

    /// Arena id of an op
    pub fn op_id(&self, name: &str) -> Option<OpId> {
        self.arena.op_index.get(name).copied()
    }

    /// Get an op by arena id
    ///
    /// Ids are only meaningful for the graph that handed them out.
    pub fn op_by_id(&self, id: OpId) -> &OpInfo {
        &self.arena.ops[id.index()]
    }

    /// Check if an op exists
    pub fn has_op(&self, name: &str) -> bool {
        self.arena.op_index.contains_key(name)
    }

    /// Number of ops
    pub fn op_count(&self) -> usize {
        self.arena.ops.len()
    }

    /// Iterate over ops in insertion order
    pub fn ops(&self) -> impl Iterator<Item = &OpInfo> {
        self.arena.ops.iter().map(|op| op.as_ref())
    }

    /// Iterate over (id, op) in insertion order
    pub fn ops_with_ids(&self) -> impl Iterator<Item = (OpId, &OpInfo)> {
        self.arena
            .ops
            .iter()
            .enumerate()
            .map(|(idx, op)| (OpId::new(idx), op.as_ref()))
    }

    /// Iterate over op names in insertion order
    pub fn op_names(&self) -> impl Iterator<Item = &String> {
        self.arena.op_index.keys()
    }

    // ========================================================================
    // Ordering and outputs
    // ========================================================================

    /// The topological order
    pub fn topo_order(&self) -> &[OpId] {
        &self.arena.topo_order
    }

    /// Ops in topological order
    pub fn topo_ops(&self) -> impl DoubleEndedIterator<Item = &OpInfo> {
        self.arena
            .topo_order
            .iter()
            .map(move |&id| self.op_by_id(id))
    }

    /// Op names in topological order
    pub fn topo_names(&self) -> Vec<&str> {
        self.topo_ops().map(|op| op.name.as_str()).collect()
    }

    /// Ids of the designated output nodes
    pub fn output_ids(&self) -> &[OpId] {
        &self.arena.output_nodes
    }

    /// Names of the designated output nodes
    pub fn output_nodes(&self) -> Vec<&str> {
        self.output_ops().map(|op| op.name.as_str()).collect()
    }

    /// Resolve the output nodes to their ops
    pub fn output_ops(&self) -> impl Iterator<Item = &OpInfo> {
        self.arena
            .output_nodes
            .iter()
            .map(move |&id| self.op_by_id(id))
    }

    /// Check if an op is a designated output
    pub fn is_output(&self, id: OpId) -> bool {
        self.arena.output_nodes.contains(&id)
    }

    // ========================================================================
    // Tensor traversal
    // ========================================================================

    /// Locate a tensor
    pub fn tensor_ref(&self, tensor_name: &str) -> Option<TensorRef> {
        self.arena.producer_map.get(tensor_name).copied()
    }

    /// Get a tensor record by name
    pub fn tensor(&self, tensor_name: &str) -> Option<&TensorInfo> {
        let location = self.tensor_ref(tensor_name)?;
        self.op_by_id(location.op).outputs.get(location.slot)
    }

    /// Number of tensors
    pub fn tensor_count(&self) -> usize {
        self.arena.producer_map.len()
    }

    /// Get the producer op of a tensor
    pub fn producer(&self, tensor_name: &str) -> Option<&OpInfo> {
        self.tensor_ref(tensor_name)
            .map(|location| self.op_by_id(location.op))
    }

    /// Every (op, slot) that reads a tensor
    pub fn tensor_uses(&self, tensor_name: &str) -> &[TensorUse] {
        self.arena
            .consumer_map
            .get(tensor_name)
            .map(|uses| uses.as_slice())
            .unwrap_or(&[])
    }

    /// Distinct consumer ops of a tensor
    pub fn consumers(&self, tensor_name: &str) -> Vec<&OpInfo> {
        let mut seen: Vec<OpId> = Vec::new();
        for tensor_use in self.tensor_uses(tensor_name) {
            if !seen.contains(&tensor_use.op) {
                seen.push(tensor_use.op);
            }
        }
        seen.into_iter().map(|id| self.op_by_id(id)).collect()
    }

    /// Producer ids of an op's operands, in operand order (duplicates kept)
    pub fn input_op_ids(&self, op: &OpInfo) -> Vec<OpId> {
        op.inputs
            .iter()
            .filter_map(|input| self.tensor_ref(input))
            .map(|location| location.op)
            .collect()
    }

    /// Producer ops of an op's operands, in operand order (duplicates kept)
    pub fn input_ops(&self, op: &OpInfo) -> Vec<&OpInfo> {
        self.input_op_ids(op)
            .into_iter()
            .map(|id| self.op_by_id(id))
            .collect()
    }

    /// Input tensor records of an op, in operand order
    pub fn input_tensors(&self, op: &OpInfo) -> Vec<&TensorInfo> {
        op.inputs
            .iter()
            .filter_map(|input| self.tensor(input))
            .collect()
    }

    // ========================================================================
    // Metadata and sharing
    // ========================================================================

    /// Pass metadata side-table
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Whether two graphs share the same op arena
    pub fn shares_ops_with(&self, other: &Graph) -> bool {
        Arc::ptr_eq(&self.arena, &other.arena)
    }

    /// Whether op `name` is the same shared entry in both graphs
    pub fn shares_op_with(&self, other: &Graph, name: &str) -> bool {
        match (self.op_id(name), other.op_id(name)) {
            (Some(a), Some(b)) => Arc::ptr_eq(&self.arena.ops[a.index()], &other.arena.ops[b.index()]),
            _ => false,
        }
    }
}

impl PartialEq for Graph {
    /// Structural equality: same ops in the same arena order, same topological
    /// order, same outputs, same metadata
    fn eq(&self, other: &Self) -> bool {
        self.arena.ops.len() == other.arena.ops.len()
            && self
                .arena
                .ops
                .iter()
                .zip(&other.arena.ops)
                .all(|(a, b)| a == b)
            && self.arena.topo_order == other.arena.topo_order
            && self.arena.output_nodes == other.arena.output_nodes
            && self.metadata == other.metadata
    }
}
