//! Core traits for ugraph-optimizer
//!
//! Defines the fundamental interface for graph transformation.

use crate::error::OptResult;
use crate::graph::Graph;

/// Transformer trait for graph transformations
///
/// This is the core abstraction for every optimization pass. A transformer
/// takes a graph by shared reference and returns a new, independent graph; the
/// argument is never modified. Implementations must be deterministic.
///
/// # Example
///
/// ```ignore
/// struct Noop;
///
/// impl Transformer for Noop {
///     fn name(&self) -> &str {
///         "noop"
///     }
///
///     fn transform(&self, graph: &Graph) -> OptResult<Graph> {
///         Ok(graph.clone())
///     }
/// }
/// ```
pub trait Transformer: Send + Sync {
    /// Registered name of the pass
    fn name(&self) -> &str;

    /// Transform the given graph
    ///
    /// # Arguments
    /// * `graph` - The input graph
    ///
    /// # Returns
    /// * `OptResult<Graph>` - The transformed graph or an error
    fn transform(&self, graph: &Graph) -> OptResult<Graph>;
}
