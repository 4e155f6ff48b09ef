//! Error types for ugraph-optimizer
//!
//! This module defines all error types used throughout the crate.
//! [`ValidationError`] covers violations of the graph invariants;
//! [`TransformError`] is the crate-wide error that wraps it.

use thiserror::Error;

/// A graph violates one of the IR invariants
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The operation graph contains a cycle
    #[error("graph contains a cycle through: {}", .ops.join(", "))]
    Cycle {
        /// Operations that could not be linearized
        ops: Vec<String>,
    },

    /// An input references a tensor no operation produces
    #[error("op '{op}' references unknown tensor '{tensor}'")]
    DanglingTensor {
        /// Consuming operation
        op: String,
        /// Unresolved tensor name
        tensor: String,
    },

    /// Two operations share a name
    #[error("duplicate op name: {0}")]
    DuplicateOp(String),

    /// Two tensors share a name
    #[error("duplicate tensor name: {0}")]
    DuplicateTensor(String),

    /// An output node is not an operation of the graph
    #[error("output node '{0}' is not an op of the graph")]
    UnknownOutput(String),

    /// A query named an operation that does not exist
    #[error("unknown op: {0}")]
    UnknownOp(String),

    /// A query named an operator type that does not occur in the graph
    #[error("no op of type '{0}' in graph")]
    UnknownOpType(String),

    /// A stored topological order is not a valid linearization
    #[error("invalid topological order: {0}")]
    InvalidTopoOrder(String),

    /// A metadata namespace is malformed
    #[error("invalid metadata namespace '{0}'")]
    InvalidNamespace(String),
}

/// Main error type for graph transformation operations
#[derive(Error, Debug)]
pub enum TransformError {
    /// Graph invariant violated
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Pipeline names a pass the registry does not know
    #[error("Unknown pass: {0}")]
    UnknownPass(String),

    /// A pass name was registered twice
    #[error("Duplicate pass registration: {0}")]
    DuplicatePass(String),

    /// A pass rejected its keyword configuration
    #[error("Invalid config for pass '{pass}': {reason}")]
    InvalidConfig {
        /// Pass name
        pass: String,
        /// What was wrong
        reason: String,
    },

    /// A pass failed while the pipeline was running
    #[error("Pass '{pass}' failed: {source}")]
    PassFailed {
        /// Pass name
        pass: String,
        /// Underlying failure
        #[source]
        source: Box<TransformError>,
    },

    /// Associativity registered twice for the same operator type
    #[error("Duplicate associativity definition for {0}")]
    DuplicateAssociation(String),

    /// Compatibility registered twice, or an operator made compatible with itself
    #[error("Conflicting compatibility definition: {0} <-> {1}")]
    DuplicateCompatibility(String, String),

    /// A registered permutation is not a permutation of its operand positions
    #[error("Invalid permutation {perm:?} for {op_type}")]
    InvalidPermutation {
        /// Operator type
        op_type: String,
        /// Offending permutation
        perm: Vec<usize>,
    },

    /// A pattern graph cannot be used for matching
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// A decoded snapshot is structurally incomplete
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Protobuf decode error
    #[error("Protobuf decode error: {0}")]
    ProtoDecode(#[from] prost::DecodeError),

    /// Configuration document could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TransformError {
    /// Build an [`TransformError::InvalidConfig`] for a pass
    pub fn invalid_config(pass: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            pass: pass.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for graph operations
pub type OptResult<T> = Result<T, TransformError>;
