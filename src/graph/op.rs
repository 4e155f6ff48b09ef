//! Operation and tensor records
//!
//! An [`OpInfo`] owns its output [`TensorInfo`]s; inputs are references to
//! tensors owned by other operations, kept by name so that an operation can be
//! shared unchanged between graph instances.

use crate::tensor::{DataType, Shape};

use super::attr::{AttrMap, AttrValue};

/// A tensor produced by an operation
#[derive(Debug, Clone, PartialEq)]
pub struct TensorInfo {
    /// Unique name, conventionally `<producer>:<index>`
    pub name: String,
    /// Element datatype
    pub dtype: DataType,
    /// Shape descriptor
    pub shape: Shape,
}

impl TensorInfo {
    /// Create a tensor record
    pub fn new(name: impl Into<String>, dtype: DataType, shape: Shape) -> Self {
        Self {
            name: name.into(),
            dtype,
            shape,
        }
    }

    /// Name of the producing op, following the `<producer>:<index>` convention
    pub fn conventional_producer(&self) -> &str {
        match self.name.rsplit_once(':') {
            Some((op, index)) if index.parse::<usize>().is_ok() => op,
            _ => &self.name,
        }
    }
}

/// Canonical tensor name for output `index` of `op`
pub fn tensor_name(op: &str, index: usize) -> String {
    format!("{}:{}", op, index)
}

/// A single operation of the graph
#[derive(Debug, Clone, PartialEq)]
pub struct OpInfo {
    /// Unique name within the graph
    pub name: String,
    /// Operator-type tag (open vocabulary)
    pub op_type: String,
    /// Ordered operand list (tensor names)
    pub inputs: Vec<String>,
    /// Owned outputs, ordered by output index
    pub outputs: Vec<TensorInfo>,
    /// Operator parameters
    pub attrs: AttrMap,
}

impl OpInfo {
    /// Create an op with no inputs, outputs, or attributes
    pub fn new(name: impl Into<String>, op_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            op_type: op_type.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            attrs: AttrMap::new(),
        }
    }

    /// Append an operand
    pub fn with_input(mut self, tensor: impl Into<String>) -> Self {
        self.inputs.push(tensor.into());
        self
    }

    /// Append several operands
    pub fn with_inputs<I, S>(mut self, tensors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.extend(tensors.into_iter().map(Into::into));
        self
    }

    /// Append an output named `<op>:<index>`
    pub fn with_output(mut self, dtype: DataType, shape: Shape) -> Self {
        let name = tensor_name(&self.name, self.outputs.len());
        self.outputs.push(TensorInfo::new(name, dtype, shape));
        self
    }

    /// Append an explicitly named output
    pub fn with_named_output(mut self, tensor: TensorInfo) -> Self {
        self.outputs.push(tensor);
        self
    }

    /// Set a parameter
    pub fn with_attr(mut self, key: impl Into<String>, value: AttrValue) -> Self {
        self.attrs.insert(key.into(), value);
        self
    }

    /// Number of operands
    pub fn n_inputs(&self) -> usize {
        self.inputs.len()
    }

    /// Check the operator type
    pub fn is_op_type(&self, op_type: &str) -> bool {
        self.op_type == op_type
    }

    /// Check if this op's type is in the given list
    pub fn is_op_type_in(&self, op_types: &[&str]) -> bool {
        op_types.contains(&self.op_type.as_str())
    }

    /// Output tensor at `index`
    pub fn output(&self, index: usize) -> Option<&TensorInfo> {
        self.outputs.get(index)
    }

    /// Parameter by key
    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.get(key)
    }
}
