//! Graph transformers
//!
//! This module provides the built-in optimization passes:
//!
//! - **Reference counting** (`refcnt`): per-output read counts and the
//!   needs-eval flag used by a memory-constrained runtime
//! - **Pruning** (`prune`): removal of ops that no output depends on
//!
//! # Overview
//!
//! Each transformer implements the [`Transformer`](crate::traits::Transformer)
//! trait and can be applied individually or through a
//! [`Pipeline`](crate::transform::Pipeline).
//!
//! # Example
//!
//! ```ignore
//! use ugraph_optimizer::transformers::{PruneGraph, RefCntAnnotation, RefCntOptimizer};
//! use ugraph_optimizer::traits::Transformer;
//!
//! let pruned = PruneGraph::new().transform(&graph)?;
//! let annotated = RefCntOptimizer::new().transform(&pruned)?;
//!
//! let info = RefCntAnnotation::read(&annotated, "conv_1")?;
//! ```

/// Dead-op removal
pub mod prune;
/// Reference-count annotation
pub mod refcnt;

pub use prune::PruneGraph;
pub use refcnt::{RefCntAnnotation, RefCntOptimizer};
