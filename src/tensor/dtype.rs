//! Element data types
//!
//! The datatype vocabulary follows the frozen-graph exporters: plain numeric
//! types plus the quantized variants emitted by quantization tooling.

use crate::error::{OptResult, TransformError};

/// Element datatype of a tensor
///
/// The first variant doubles as the `Default` value.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum DataType {
    /// Unknown element type
    Undefined = 0,
    Float = 1,
    Uint8 = 2,
    Int8 = 3,
    Uint16 = 4,
    Int16 = 5,
    Int32 = 6,
    Int64 = 7,
    String = 8,
    Bool = 9,
    Float16 = 10,
    Double = 11,
    Uint32 = 12,
    Uint64 = 13,
    Bfloat16 = 16,
    /// Quantized signed 8-bit
    Qint8 = 20,
    /// Quantized unsigned 8-bit
    Quint8 = 21,
    /// Quantized 32-bit accumulator
    Qint32 = 22,
}

/// Size in bytes for each data type
pub fn dtype_size(dtype: DataType) -> OptResult<usize> {
    match dtype {
        DataType::Float => Ok(4),
        DataType::Uint8 | DataType::Int8 | DataType::Bool => Ok(1),
        DataType::Qint8 | DataType::Quint8 => Ok(1),
        DataType::Uint16 | DataType::Int16 => Ok(2),
        DataType::Float16 | DataType::Bfloat16 => Ok(2),
        DataType::Int32 | DataType::Uint32 | DataType::Qint32 => Ok(4),
        DataType::Int64 | DataType::Uint64 | DataType::Double => Ok(8),
        DataType::String | DataType::Undefined => Err(TransformError::Internal(format!(
            "{:?} has no fixed element size",
            dtype
        ))),
    }
}

/// Convert i32 to DataType enum
pub fn i32_to_dtype(value: i32) -> OptResult<DataType> {
    DataType::try_from(value)
        .map_err(|_| TransformError::Internal(format!("invalid data type: {}", value)))
}

/// Check if data type is floating point
pub fn is_float_type(dtype: DataType) -> bool {
    matches!(
        dtype,
        DataType::Float | DataType::Double | DataType::Float16 | DataType::Bfloat16
    )
}

/// Check if data type is one of the quantized types
pub fn is_quantized_type(dtype: DataType) -> bool {
    matches!(dtype, DataType::Qint8 | DataType::Quint8 | DataType::Qint32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtype_size() {
        assert_eq!(dtype_size(DataType::Float).unwrap(), 4);
        assert_eq!(dtype_size(DataType::Int64).unwrap(), 8);
        assert_eq!(dtype_size(DataType::Quint8).unwrap(), 1);
        assert!(dtype_size(DataType::Undefined).is_err());
    }

    #[test]
    fn test_i32_to_dtype() {
        assert_eq!(i32_to_dtype(1).unwrap(), DataType::Float);
        assert_eq!(i32_to_dtype(21).unwrap(), DataType::Quint8);
        assert!(i32_to_dtype(999).is_err());
    }

    #[test]
    fn test_type_classes() {
        assert!(is_float_type(DataType::Float));
        assert!(!is_float_type(DataType::Int32));
        assert!(is_quantized_type(DataType::Qint8));
        assert!(!is_quantized_type(DataType::Int8));
    }
}
