//! Graph ↔ snapshot record conversion
//!
//! Encoding never fails. Decoding rebuilds the graph through the same
//! validation as [`Graph::new`], checking the stored topological order instead
//! of recomputing it.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::{OptResult, TransformError, ValidationError};
use crate::graph::{
    AttrMap, AttrValue, Graph, MetaValue, Metadata, Namespace, OpId, OpInfo, TensorInfo,
};
use crate::tensor::{i32_to_dtype, Dim, Shape};

use super::{
    attr_record, metadata_record, AttrRecord, CountList, FloatList, GraphRecord, IntList,
    MetadataRecord, OpRecord, ShapeRecord, StrList, TensorRecord,
};

// ============================================================================
// Encoding
// ============================================================================

/// Encode a graph as a snapshot record
pub fn to_record(graph: &Graph) -> GraphRecord {
    let metadata = graph
        .metadata()
        .iter()
        .map(|(id, ns, kind, value)| MetadataRecord {
            op: graph.op_by_id(id).name.clone(),
            namespace: ns.as_str().to_string(),
            kind: kind.to_string(),
            value: Some(encode_meta(value)),
        })
        .collect();

    GraphRecord {
        ops: graph.ops().map(encode_op).collect(),
        output_nodes: graph
            .output_nodes()
            .into_iter()
            .map(str::to_string)
            .collect(),
        topo_order: graph
            .topo_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
        metadata,
    }
}

fn encode_op(op: &OpInfo) -> OpRecord {
    OpRecord {
        name: op.name.clone(),
        op_type: op.op_type.clone(),
        inputs: op.inputs.clone(),
        outputs: op.outputs.iter().map(encode_tensor).collect(),
        attrs: op
            .attrs
            .iter()
            .map(|(name, value)| AttrRecord {
                name: name.clone(),
                value: Some(encode_attr(value)),
            })
            .collect(),
    }
}

fn encode_tensor(tensor: &TensorInfo) -> TensorRecord {
    TensorRecord {
        name: tensor.name.clone(),
        dtype: tensor.dtype as i32,
        shape: Some(encode_shape(&tensor.shape)),
    }
}

fn encode_shape(shape: &Shape) -> ShapeRecord {
    match shape.dims() {
        Some(dims) => ShapeRecord {
            known: true,
            dims: dims.iter().map(|d| d.to_i64()).collect(),
        },
        None => ShapeRecord::default(),
    }
}

fn encode_attr(value: &AttrValue) -> attr_record::Value {
    use attr_record::Value;

    match value {
        AttrValue::Bool(v) => Value::Bool(*v),
        AttrValue::Int(v) => Value::Int(*v),
        AttrValue::Float(v) => Value::Float(*v),
        AttrValue::Str(v) => Value::Str(v.clone()),
        AttrValue::Ints(v) => Value::Ints(IntList { values: v.clone() }),
        AttrValue::Floats(v) => Value::Floats(FloatList { values: v.clone() }),
        AttrValue::Strs(v) => Value::Strs(StrList { values: v.clone() }),
        AttrValue::DType(v) => Value::DType(*v as i32),
        AttrValue::Shape(v) => Value::Shape(encode_shape(v)),
    }
}

fn encode_meta(value: &MetaValue) -> metadata_record::Value {
    use metadata_record::Value;

    match value {
        MetaValue::Flag(v) => Value::Flag(*v),
        MetaValue::Count(v) => Value::Count(*v as u64),
        MetaValue::Counts(v) => Value::Counts(CountList {
            values: v.iter().map(|&c| c as u64).collect(),
        }),
        MetaValue::Int(v) => Value::Int(*v),
        MetaValue::Text(v) => Value::Text(v.clone()),
    }
}

// ============================================================================
// Decoding
// ============================================================================

/// Rebuild a graph from a snapshot record
///
/// An empty `topo_order` is recomputed; a non-empty one must be a valid
/// linearization of exactly the stored ops.
pub fn from_record(record: GraphRecord) -> OptResult<Graph> {
    let GraphRecord {
        ops,
        output_nodes,
        topo_order,
        metadata,
    } = record;

    let ops = ops
        .into_iter()
        .map(decode_op)
        .collect::<OptResult<Vec<_>>>()?;

    let positions: FxHashMap<&str, OpId> = ops
        .iter()
        .enumerate()
        .map(|(idx, op)| (op.name.as_str(), OpId::new(idx)))
        .collect();
    let lookup = |name: &str| positions.get(name).copied();

    let order = if topo_order.is_empty() {
        None
    } else {
        let ids = topo_order
            .iter()
            .map(|name| {
                lookup(name.as_str()).ok_or_else(|| {
                    ValidationError::InvalidTopoOrder(format!("unknown op '{}'", name))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Some(ids)
    };

    let mut table = Metadata::new();
    for entry in metadata {
        let id = lookup(entry.op.as_str())
            .ok_or_else(|| ValidationError::UnknownOp(entry.op.clone()))?;
        let namespace = Namespace::new(entry.namespace)?;
        let value = entry.value.ok_or_else(|| {
            TransformError::InvalidSnapshot(format!(
                "metadata '{}' of op '{}' has no value",
                entry.kind, entry.op
            ))
        })?;
        table.insert(id, namespace, entry.kind, decode_meta(value));
    }

    let ops = ops.into_iter().map(Arc::new).collect();
    Ok(Graph::from_shared(ops, &output_nodes, order, table)?)
}

fn decode_op(record: OpRecord) -> OptResult<OpInfo> {
    let outputs = record
        .outputs
        .into_iter()
        .map(decode_tensor)
        .collect::<OptResult<Vec<_>>>()?;

    let mut attrs = AttrMap::with_capacity(record.attrs.len());
    for attr in record.attrs {
        let value = attr.value.ok_or_else(|| {
            TransformError::InvalidSnapshot(format!(
                "attribute '{}' of op '{}' has no value",
                attr.name, record.name
            ))
        })?;
        attrs.insert(attr.name, decode_attr(value)?);
    }

    Ok(OpInfo {
        name: record.name,
        op_type: record.op_type,
        inputs: record.inputs,
        outputs,
        attrs,
    })
}

fn decode_tensor(record: TensorRecord) -> OptResult<TensorInfo> {
    let dtype = i32_to_dtype(record.dtype)?;
    let shape = record.shape.map(decode_shape).unwrap_or_default();
    Ok(TensorInfo::new(record.name, dtype, shape))
}

fn decode_shape(record: ShapeRecord) -> Shape {
    if record.known {
        Shape::from_dims(record.dims.into_iter().map(Dim::from_i64))
    } else {
        Shape::unknown()
    }
}

fn decode_attr(value: attr_record::Value) -> OptResult<AttrValue> {
    use attr_record::Value;

    Ok(match value {
        Value::Bool(v) => AttrValue::Bool(v),
        Value::Int(v) => AttrValue::Int(v),
        Value::Float(v) => AttrValue::Float(v),
        Value::Str(v) => AttrValue::Str(v),
        Value::Ints(v) => AttrValue::Ints(v.values),
        Value::Floats(v) => AttrValue::Floats(v.values),
        Value::Strs(v) => AttrValue::Strs(v.values),
        Value::DType(v) => AttrValue::DType(i32_to_dtype(v)?),
        Value::Shape(v) => AttrValue::Shape(decode_shape(v)),
    })
}

fn decode_meta(value: metadata_record::Value) -> MetaValue {
    use metadata_record::Value;

    match value {
        Value::Flag(v) => MetaValue::Flag(v),
        Value::Count(v) => MetaValue::Count(v as usize),
        Value::Counts(v) => MetaValue::Counts(v.values.into_iter().map(|c| c as usize).collect()),
        Value::Int(v) => MetaValue::Int(v),
        Value::Text(v) => MetaValue::Text(v),
    }
}
