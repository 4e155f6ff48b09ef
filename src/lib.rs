//! # uGraph Optimizer
//!
//! Graph IR, transformation pipeline and subgraph matcher for deploying frozen
//! neural-network graphs to memory-constrained targets.
//!
//! This crate takes a computation graph handed over by a frontend loader and
//! prepares it for code generation: passes annotate or rewrite the graph, and
//! the matcher locates subgraphs a backend can replace with fused kernels.
//!
//! ## Features
//!
//! - **Graph IR**: arena of shared ops with a validated topological order and a
//!   namespaced metadata side-table
//! - **Pipelines**: named passes resolved from a registry and run in sequence
//! - **Reference Counting**: per-tensor read counts for early buffer release
//! - **Pattern Matching**: subgraph search modulo commutativity and
//!   plain/quantized operator equivalence
//! - **Snapshots**: lossless protobuf persistence of an annotated graph
//!
//! ## Example
//!
//! ```ignore
//! use ugraph_optimizer::prelude::*;
//!
//! let (graph, stats) = optimize_graph(def, &OptimizeOptions::default())?;
//! let info = RefCntAnnotation::read(&graph, "conv_1")?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// ============================================================================
// Module declarations
// ============================================================================

pub mod error;
pub mod graph;
pub mod io;
pub mod pattern;
pub mod proto;
pub mod tensor;
pub mod traits;
pub mod transform;
pub mod transformers;

// ============================================================================
// Prelude module for convenient imports
// ============================================================================

/// Prelude module - import commonly used types with `use ugraph_optimizer::prelude::*`
pub mod prelude {
    pub use crate::error::{OptResult, TransformError, ValidationError};
    pub use crate::graph::{
        AttrValue, Graph, GraphDef, GraphEdit, MetaValue, Namespace, OpInfo, OpView, TensorInfo,
    };
    pub use crate::io::{
        load_graph, optimize_graph, save_graph, OptimizeOptions, OptimizeStats,
    };
    pub use crate::pattern::{EquivalenceRegistry, GraphMatch, GraphMatcher};
    pub use crate::tensor::{DataType, Shape};
    pub use crate::traits::Transformer;
    pub use crate::transform::{PassConfig, PassRegistry, Pipeline, PipelineConfig};
    pub use crate::transformers::{PruneGraph, RefCntAnnotation, RefCntOptimizer};
}

// ============================================================================
// Crate-level re-exports
// ============================================================================

pub use error::{OptResult, TransformError};
pub use traits::Transformer;

// ============================================================================
// Version information
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
