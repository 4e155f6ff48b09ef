//! Dead-op removal
//!
//! Removes every op from which no output node can be reached. Surviving ops
//! keep their relative order, their shared storage and their metadata.

use tracing::debug;

use crate::error::OptResult;
use crate::graph::{Graph, GraphEdit};
use crate::traits::Transformer;
use crate::transform::PassConfig;

/// Prune pass
///
/// A graph without output nodes is returned unchanged, since every op would
/// otherwise be removed.
#[derive(Debug, Clone, Default)]
pub struct PruneGraph {
    keep_types: Vec<String>,
}

impl PruneGraph {
    /// Registered pass name
    pub const NAME: &'static str = "prune";

    /// Create the pass
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep unreachable ops of the given types
    pub fn with_keep_types<I, S>(mut self, op_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keep_types = op_types.into_iter().map(Into::into).collect();
        self
    }

    /// Factory for the pass registry
    ///
    /// Keywords: `keep_types` (list of operator types).
    pub fn from_config(config: &PassConfig) -> OptResult<Box<dyn Transformer>> {
        config.deny_unknown(Self::NAME, &["keep_types"])?;
        let keep_types = config
            .get_strs(Self::NAME, "keep_types")?
            .unwrap_or_default();
        Ok(Box::new(Self::new().with_keep_types(keep_types)))
    }

    fn keeps(&self, op_type: &str) -> bool {
        self.keep_types.iter().any(|t| t == op_type)
    }
}

impl Transformer for PruneGraph {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn transform(&self, graph: &Graph) -> OptResult<Graph> {
        if graph.output_ids().is_empty() {
            return Ok(graph.clone());
        }

        let mut roots = graph.output_ids().to_vec();
        roots.extend(
            graph
                .ops_with_ids()
                .filter(|(_, op)| self.keeps(&op.op_type))
                .map(|(id, _)| id),
        );
        let live = graph.ancestors_of(&roots);

        if live.len() == graph.op_count() {
            return Ok(graph.clone());
        }

        let mut edit = GraphEdit::new(graph);
        for (id, op) in graph.ops_with_ids() {
            if !live.contains(&id) {
                debug!(op = %op.name, op_type = %op.op_type, "Pruning unreachable op");
                edit.remove_op(&op.name)?;
            }
        }

        Ok(edit.finish()?)
    }
}
