//! Reference-count annotation
//!
//! Annotates every op with the number of times each of its outputs is read and
//! with whether the op has to be evaluated by the runtime. A runtime can free a
//! tensor as soon as its count drops to zero.

use crate::error::OptResult;
use crate::graph::{build_input_count_map, Graph, GraphEdit, MetaValue, Namespace};
use crate::traits::Transformer;
use crate::transform::PassConfig;

/// Operator types whose values are never computed at run time
const NEVER_EVALUATED: &[&str] = &["Const", "Placeholder"];

/// Reference-count pass
///
/// Stores, per op:
/// - `refcnt__ref_counts`: read count of each output, aligned by output index
/// - `refcnt__to_eval`: `false` for output nodes, `Const` and `Placeholder`,
///   `true` otherwise
///
/// The graph structure is left untouched.
#[derive(Debug, Clone)]
pub struct RefCntOptimizer {
    namespace: Namespace,
}

impl Default for RefCntOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl RefCntOptimizer {
    /// Registered pass name
    pub const NAME: &'static str = "refcnt";
    /// Metadata namespace
    pub const NAMESPACE: &'static str = "refcnt";
    /// Kind of the per-output reference counts
    pub const REF_COUNTS: &'static str = "ref_counts";
    /// Kind of the needs-eval flag
    pub const TO_EVAL: &'static str = "to_eval";

    /// Create the pass
    pub fn new() -> Self {
        Self {
            namespace: Namespace::builtin(Self::NAMESPACE),
        }
    }

    /// Factory for the pass registry; the pass takes no keywords
    pub fn from_config(config: &PassConfig) -> OptResult<Box<dyn Transformer>> {
        config.deny_unknown(Self::NAME, &[])?;
        Ok(Box::new(Self::new()))
    }

    /// The namespace this pass writes to
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }
}

impl Transformer for RefCntOptimizer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn transform(&self, graph: &Graph) -> OptResult<Graph> {
        let counts = build_input_count_map(graph.ops());
        let mut edit = GraphEdit::new(graph);

        for &id in graph.topo_order().iter().rev() {
            let op = graph.op_by_id(id);

            let to_eval = !(graph.is_output(id) || op.is_op_type_in(NEVER_EVALUATED));
            let ref_counts = op
                .outputs
                .iter()
                .map(|tensor| counts.get(&tensor.name).copied().unwrap_or(0))
                .collect();

            edit.set_meta_by_id(id, &self.namespace, Self::TO_EVAL, MetaValue::Flag(to_eval));
            edit.set_meta_by_id(
                id,
                &self.namespace,
                Self::REF_COUNTS,
                MetaValue::Counts(ref_counts),
            );
        }

        Ok(edit.finish()?)
    }
}

/// What the emitter reads back for one op
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefCntAnnotation {
    /// Whether the runtime evaluates the op
    pub to_eval: bool,
    /// Read count per output
    pub ref_counts: Vec<usize>,
}

impl RefCntAnnotation {
    /// Read the annotation of an op; `None` if the pass has not run on it
    pub fn read(graph: &Graph, op_name: &str) -> OptResult<Option<Self>> {
        let namespace = Namespace::builtin(RefCntOptimizer::NAMESPACE);
        let parser = graph.namespaced(op_name, &namespace)?;

        let annotation = match (
            parser.flag(RefCntOptimizer::TO_EVAL),
            parser.counts(RefCntOptimizer::REF_COUNTS),
        ) {
            (Some(to_eval), Some(ref_counts)) => Some(Self {
                to_eval,
                ref_counts: ref_counts.to_vec(),
            }),
            _ => None,
        };
        Ok(annotation)
    }

    /// Count of the first output, `0` when the op has none
    pub fn primary_count(&self) -> usize {
        self.ref_counts.first().copied().unwrap_or(0)
    }
}
