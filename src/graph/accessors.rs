//! Higher-level graph queries
//!
//! Lookup by operator type, reachability, quantized-marker detection and the
//! emitter-facing [`OpView`].

use rustc_hash::FxHashSet;

use crate::error::ValidationError;

use super::attr::{AttrMap, MetaValue, Namespace, Namespaced};
use super::context::Graph;
use super::maps::OpId;
use super::op::{OpInfo, TensorInfo};

/// Operator types that mark a graph as already quantized
pub const QUANTIZED_OP_TYPES: &[&str] = &[
    "Dequantize",
    "QuantizedMaxPool",
    "QuantizeV2",
    "QuantizedMatMul",
    "QuantizedRelu",
    "QuantizedAdd",
    "RequantizationRange",
    "Requantize",
    "QuantizedReshape",
    "QuantizedConv2D",
];

/// Everything the emitter needs to know about one op
#[derive(Debug, Clone)]
pub struct OpView<'a> {
    /// Op name
    pub name: &'a str,
    /// Operator-type tag
    pub op_type: &'a str,
    /// Operand tensors in operand order
    pub inputs: Vec<&'a TensorInfo>,
    /// Owned outputs in output order
    pub outputs: &'a [TensorInfo],
    /// Operator parameters
    pub attrs: &'a AttrMap,
    /// Pass metadata as (`<namespace>__<kind>`, value)
    pub metadata: Vec<(String, &'a MetaValue)>,
}

impl<'a> OpView<'a> {
    /// Metadata value by rendered key
    pub fn meta(&self, key: &str) -> Option<&'a MetaValue> {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| *value)
    }
}

impl Graph {
    // ========================================================================
    // Operator-type queries
    // ========================================================================

    /// Find ops by type, in insertion order
    pub fn ops_by_type(&self, op_type: &str) -> Vec<&OpInfo> {
        self.ops().filter(|op| op.op_type == op_type).collect()
    }

    /// Find op ids by type, in insertion order
    pub fn op_ids_by_type(&self, op_type: &str) -> Vec<OpId> {
        self.ops_with_ids()
            .filter(|(_, op)| op.op_type == op_type)
            .map(|(id, _)| id)
            .collect()
    }

    /// Find ops by type, failing if the type does not occur
    pub fn require_ops_by_type(&self, op_type: &str) -> Result<Vec<&OpInfo>, ValidationError> {
        let ops = self.ops_by_type(op_type);
        if ops.is_empty() {
            Err(ValidationError::UnknownOpType(op_type.to_string()))
        } else {
            Ok(ops)
        }
    }

    /// Find ops matching any of the given types
    pub fn ops_by_types(&self, op_types: &[&str]) -> Vec<&OpInfo> {
        self.ops().filter(|op| op.is_op_type_in(op_types)).collect()
    }

    // ========================================================================
    // Reachability
    // ========================================================================

    /// Ids of every op from which one of `roots` is reachable, roots included
    pub fn ancestors_of(&self, roots: &[OpId]) -> FxHashSet<OpId> {
        let mut visited: FxHashSet<OpId> = FxHashSet::default();
        let mut stack: Vec<OpId> = roots.to_vec();

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            for producer in self.input_op_ids(self.op_by_id(id)) {
                if !visited.contains(&producer) {
                    stack.push(producer);
                }
            }
        }

        visited
    }

    // ========================================================================
    // Quantized markers
    // ========================================================================

    /// Ops whose type marks the graph as quantized
    pub fn quantized_ops(&self) -> Vec<&OpInfo> {
        self.ops_by_types(QUANTIZED_OP_TYPES)
    }

    /// Whether the graph contains quantized operators
    pub fn is_quantized(&self) -> bool {
        self.ops().any(|op| op.is_op_type_in(QUANTIZED_OP_TYPES))
    }

    // ========================================================================
    // Metadata views
    // ========================================================================

    /// One namespace of one op's metadata
    pub fn namespaced<'a>(
        &'a self,
        op_name: &str,
        namespace: &'a Namespace,
    ) -> Result<Namespaced<'a>, ValidationError> {
        let id = self
            .op_id(op_name)
            .ok_or_else(|| ValidationError::UnknownOp(op_name.to_string()))?;
        Ok(Namespaced::new(self.metadata.for_op(id), namespace))
    }

    /// Emitter-facing view of an op
    pub fn op_view(&self, op_name: &str) -> Result<OpView<'_>, ValidationError> {
        let id = self
            .op_id(op_name)
            .ok_or_else(|| ValidationError::UnknownOp(op_name.to_string()))?;
        Ok(self.op_view_by_id(id))
    }

    /// Emitter-facing view of an op by id
    pub fn op_view_by_id(&self, id: OpId) -> OpView<'_> {
        let op = self.op_by_id(id);
        let metadata = self
            .metadata
            .for_op(id)
            .map(|values| {
                values
                    .iter()
                    .map(|((ns, kind), value)| (ns.key(kind), value))
                    .collect()
            })
            .unwrap_or_default();

        OpView {
            name: &op.name,
            op_type: &op.op_type,
            inputs: self.input_tensors(op),
            outputs: &op.outputs,
            attrs: &op.attrs,
            metadata,
        }
    }

    /// Views of every op in topological order
    pub fn topo_views(&self) -> Vec<OpView<'_>> {
        self.topo_order()
            .iter()
            .map(|&id| self.op_view_by_id(id))
            .collect()
    }
}
