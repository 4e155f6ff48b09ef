//! Graph map types and builders
//!
//! Defines the arena indices and the derived lookup maps used for efficient
//! graph traversal.

use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::error::ValidationError;

use super::op::OpInfo;

/// Index of an operation in its graph's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpId(u32);

impl OpId {
    /// Create an id from an arena index
    pub fn new(index: usize) -> Self {
        Self(index as u32)
    }

    /// Arena index
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Location of a tensor: the producing op and the output slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TensorRef {
    /// Producing operation
    pub op: OpId,
    /// Output index on the producer
    pub slot: usize,
}

/// A use of a tensor: the consuming op and the input slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TensorUse {
    /// Consuming operation
    pub op: OpId,
    /// Input index on the consumer
    pub slot: usize,
}

/// Type alias for op index: op_name → OpId (order preserved)
pub type OpIndexMap = IndexMap<String, OpId>;

/// Type alias for producer map: tensor_name → TensorRef
pub type ProducerMap = FxHashMap<String, TensorRef>;

/// Type alias for consumer map: tensor_name → [uses]
/// SmallVec optimized for common case of 1-4 consumers
pub type ConsumerMap = FxHashMap<String, SmallVec<[TensorUse; 4]>>;

/// Type alias for input count map: tensor_name → reference count
pub type InputCountMap = FxHashMap<String, usize>;

/// Build op index from arena
///
/// Preserves arena order using IndexMap.
pub fn build_op_index(ops: &[Arc<OpInfo>]) -> Result<OpIndexMap, ValidationError> {
    let mut map = IndexMap::with_capacity(ops.len());

    for (idx, op) in ops.iter().enumerate() {
        if map.insert(op.name.clone(), OpId::new(idx)).is_some() {
            return Err(ValidationError::DuplicateOp(op.name.clone()));
        }
    }

    Ok(map)
}

/// Build producer map from arena
///
/// Maps each output tensor name to the op and slot that produce it.
pub fn build_producer_map(ops: &[Arc<OpInfo>]) -> Result<ProducerMap, ValidationError> {
    let mut map = FxHashMap::default();

    for (idx, op) in ops.iter().enumerate() {
        for (slot, output) in op.outputs.iter().enumerate() {
            let location = TensorRef {
                op: OpId::new(idx),
                slot,
            };
            if map.insert(output.name.clone(), location).is_some() {
                return Err(ValidationError::DuplicateTensor(output.name.clone()));
            }
        }
    }

    Ok(map)
}

/// Build consumer map from arena
///
/// Maps each tensor name to every (op, slot) that reads it. Every input must
/// resolve in `producers`.
pub fn build_consumer_map(
    ops: &[Arc<OpInfo>],
    producers: &ProducerMap,
) -> Result<ConsumerMap, ValidationError> {
    let mut map: ConsumerMap = FxHashMap::default();

    for (idx, op) in ops.iter().enumerate() {
        for (slot, input) in op.inputs.iter().enumerate() {
            if !producers.contains_key(input) {
                return Err(ValidationError::DanglingTensor {
                    op: op.name.clone(),
                    tensor: input.clone(),
                });
            }
            map.entry(input.clone()).or_default().push(TensorUse {
                op: OpId::new(idx),
                slot,
            });
        }
    }

    Ok(map)
}

/// Build input count map (reference counting for tensors)
///
/// Counts every (op, input slot) pair; a tensor read twice by the same op
/// counts twice.
pub fn build_input_count_map<'a, I>(ops: I) -> InputCountMap
where
    I: IntoIterator<Item = &'a OpInfo>,
{
    let mut map: InputCountMap = FxHashMap::default();

    for op in ops {
        for input in &op.inputs {
            *map.entry(input.clone()).or_insert(0) += 1;
        }
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::op::OpInfo;
    use crate::tensor::{DataType, Shape};

    fn make_test_ops() -> Vec<Arc<OpInfo>> {
        vec![
            Arc::new(
                OpInfo::new("x", "Placeholder").with_output(DataType::Float, Shape::fixed(&[4])),
            ),
            Arc::new(OpInfo::new("w", "Const").with_output(DataType::Float, Shape::fixed(&[4]))),
            Arc::new(
                OpInfo::new("mul", "Mul")
                    .with_inputs(["x:0", "w:0"])
                    .with_output(DataType::Float, Shape::fixed(&[4])),
            ),
            Arc::new(
                OpInfo::new("add", "Add")
                    .with_inputs(["mul:0", "x:0"])
                    .with_output(DataType::Float, Shape::fixed(&[4])),
            ),
        ]
    }

    #[test]
    fn test_build_op_index_preserves_order() {
        let ops = make_test_ops();
        let map = build_op_index(&ops).unwrap();

        let keys: Vec<_> = map.keys().collect();
        assert_eq!(keys, vec!["x", "w", "mul", "add"]);
        assert_eq!(map["mul"], OpId::new(2));
    }

    #[test]
    fn test_build_op_index_rejects_duplicates() {
        let mut ops = make_test_ops();
        ops.push(Arc::new(OpInfo::new("x", "Identity")));

        assert_eq!(
            build_op_index(&ops).unwrap_err(),
            ValidationError::DuplicateOp("x".to_string())
        );
    }

    #[test]
    fn test_build_producer_map() {
        let ops = make_test_ops();
        let map = build_producer_map(&ops).unwrap();

        assert_eq!(
            map.get("mul:0"),
            Some(&TensorRef {
                op: OpId::new(2),
                slot: 0
            })
        );
        assert!(map.get("missing:0").is_none());
    }

    #[test]
    fn test_build_consumer_map() {
        let ops = make_test_ops();
        let producers = build_producer_map(&ops).unwrap();
        let map = build_consumer_map(&ops, &producers).unwrap();

        let uses = map.get("x:0").unwrap();
        assert_eq!(uses.len(), 2);
        assert_eq!(
            uses[1],
            TensorUse {
                op: OpId::new(3),
                slot: 1
            }
        );
        assert!(map.get("add:0").is_none());
    }

    #[test]
    fn test_build_consumer_map_dangling() {
        let mut ops = make_test_ops();
        ops.push(Arc::new(OpInfo::new("relu", "Relu").with_input("nope:0")));
        let producers = build_producer_map(&ops).unwrap();

        let err = build_consumer_map(&ops, &producers).unwrap_err();
        assert_eq!(
            err,
            ValidationError::DanglingTensor {
                op: "relu".to_string(),
                tensor: "nope:0".to_string()
            }
        );
    }

    #[test]
    fn test_build_input_count_map() {
        let ops = make_test_ops();
        let map = build_input_count_map(ops.iter().map(|op| op.as_ref()));

        assert_eq!(map.get("x:0"), Some(&2));
        assert_eq!(map.get("mul:0"), Some(&1));
        assert_eq!(map.get("add:0"), None);
    }
}
