//! Tensor vocabulary
//!
//! This module provides the element datatypes and shape descriptors carried
//! by every [`TensorInfo`](crate::graph::TensorInfo):
//! - Data type mappings (`dtype`)
//! - Shape descriptors (`shape`)

pub mod dtype;
pub mod shape;

// Re-export commonly used items
pub use dtype::{dtype_size, i32_to_dtype, is_float_type, is_quantized_type, DataType};
pub use shape::{Dim, Shape};
