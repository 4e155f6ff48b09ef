//! Snapshot protocol buffer messages
//!
//! The messages are declared directly with `prost` derives. A snapshot stores
//! the ops in arena order together with the topological order and output
//! nodes (by name) and the pass metadata, so a reloaded graph compares equal
//! to the graph that was saved.
//!
//! Conversion to and from [`Graph`](crate::graph::Graph) lives in the
//! [`convert`] submodule.

#![allow(missing_docs)]

use crate::tensor::DataType;

pub mod convert;

pub use convert::{from_record, to_record};

/// A whole graph
#[derive(Clone, PartialEq, prost::Message)]
pub struct GraphRecord {
    /// Ops in arena order
    #[prost(message, repeated, tag = "1")]
    pub ops: Vec<OpRecord>,
    /// Output node names
    #[prost(string, repeated, tag = "2")]
    pub output_nodes: Vec<String>,
    /// Op names in topological order
    #[prost(string, repeated, tag = "3")]
    pub topo_order: Vec<String>,
    /// Pass metadata
    #[prost(message, repeated, tag = "4")]
    pub metadata: Vec<MetadataRecord>,
}

/// A single op
#[derive(Clone, PartialEq, prost::Message)]
pub struct OpRecord {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub op_type: String,
    #[prost(string, repeated, tag = "3")]
    pub inputs: Vec<String>,
    #[prost(message, repeated, tag = "4")]
    pub outputs: Vec<TensorRecord>,
    #[prost(message, repeated, tag = "5")]
    pub attrs: Vec<AttrRecord>,
}

/// An op output
#[derive(Clone, PartialEq, prost::Message)]
pub struct TensorRecord {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(enumeration = "DataType", tag = "2")]
    pub dtype: i32,
    #[prost(message, optional, tag = "3")]
    pub shape: Option<ShapeRecord>,
}

/// Shape descriptor; negative dims are dynamic
#[derive(Clone, PartialEq, prost::Message)]
pub struct ShapeRecord {
    /// Whether the rank is known
    #[prost(bool, tag = "1")]
    pub known: bool,
    #[prost(int64, repeated, tag = "2")]
    pub dims: Vec<i64>,
}

/// A named operator parameter
#[derive(Clone, PartialEq, prost::Message)]
pub struct AttrRecord {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(oneof = "attr_record::Value", tags = "2, 3, 4, 5, 6, 7, 8, 9, 10")]
    pub value: Option<attr_record::Value>,
}

/// Nested types for [`AttrRecord`]
pub mod attr_record {
    use super::{FloatList, IntList, ShapeRecord, StrList};

    /// Attribute payload
    #[allow(missing_docs)]
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Value {
        #[prost(bool, tag = "2")]
        Bool(bool),
        #[prost(int64, tag = "3")]
        Int(i64),
        #[prost(float, tag = "4")]
        Float(f32),
        #[prost(string, tag = "5")]
        Str(String),
        #[prost(message, tag = "6")]
        Ints(IntList),
        #[prost(message, tag = "7")]
        Floats(FloatList),
        #[prost(message, tag = "8")]
        Strs(StrList),
        #[prost(enumeration = "crate::tensor::DataType", tag = "9")]
        DType(i32),
        #[prost(message, tag = "10")]
        Shape(ShapeRecord),
    }
}

/// Repeated int64 wrapper
#[derive(Clone, PartialEq, prost::Message)]
pub struct IntList {
    #[prost(int64, repeated, tag = "1")]
    pub values: Vec<i64>,
}

/// Repeated float wrapper
#[derive(Clone, PartialEq, prost::Message)]
pub struct FloatList {
    #[prost(float, repeated, tag = "1")]
    pub values: Vec<f32>,
}

/// Repeated string wrapper
#[derive(Clone, PartialEq, prost::Message)]
pub struct StrList {
    #[prost(string, repeated, tag = "1")]
    pub values: Vec<String>,
}

/// Repeated uint64 wrapper
#[derive(Clone, PartialEq, prost::Message)]
pub struct CountList {
    #[prost(uint64, repeated, tag = "1")]
    pub values: Vec<u64>,
}

/// One pass metadata value
#[derive(Clone, PartialEq, prost::Message)]
pub struct MetadataRecord {
    #[prost(string, tag = "1")]
    pub op: String,
    #[prost(string, tag = "2")]
    pub namespace: String,
    #[prost(string, tag = "3")]
    pub kind: String,
    #[prost(oneof = "metadata_record::Value", tags = "4, 5, 6, 7, 8")]
    pub value: Option<metadata_record::Value>,
}

/// Nested types for [`MetadataRecord`]
pub mod metadata_record {
    use super::CountList;

    /// Metadata payload
    #[allow(missing_docs)]
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Value {
        #[prost(bool, tag = "4")]
        Flag(bool),
        #[prost(uint64, tag = "5")]
        Count(u64),
        #[prost(message, tag = "6")]
        Counts(CountList),
        #[prost(int64, tag = "7")]
        Int(i64),
        #[prost(string, tag = "8")]
        Text(String),
    }
}
