//! Sequential pass execution

use std::fmt;

use tracing::{debug, info};

use crate::error::{OptResult, TransformError};
use crate::graph::Graph;
use crate::traits::Transformer;

use super::config::PipelineConfig;
use super::registry::PassRegistry;

/// What one pass did to the graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    /// Pass name
    pub name: String,
    /// Op count before the pass
    pub ops_before: usize,
    /// Op count after the pass
    pub ops_after: usize,
    /// Metadata values before the pass
    pub metadata_before: usize,
    /// Metadata values after the pass
    pub metadata_after: usize,
}

impl PassReport {
    /// Number of ops the pass removed
    pub fn ops_removed(&self) -> usize {
        self.ops_before.saturating_sub(self.ops_after)
    }
}

/// Per-pass reports of a pipeline run, in execution order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// One entry per executed pass
    pub passes: Vec<PassReport>,
}

impl PipelineReport {
    /// Total ops removed across all passes
    pub fn ops_removed(&self) -> usize {
        self.passes.iter().map(PassReport::ops_removed).sum()
    }
}

/// Ordered list of resolved passes
///
/// Construction resolves and configures every pass, so an unknown pass name or
/// a rejected configuration is reported before anything runs.
pub struct Pipeline {
    passes: Vec<Box<dyn Transformer>>,
}

impl Pipeline {
    /// Resolve a pipeline description against a registry
    pub fn new(config: &PipelineConfig, registry: &PassRegistry) -> OptResult<Self> {
        let passes = config
            .passes
            .iter()
            .map(|spec| registry.create(&spec.name, &spec.config))
            .collect::<OptResult<Vec<_>>>()?;
        Ok(Self { passes })
    }

    /// Pipeline from already built passes
    pub fn from_transformers(passes: Vec<Box<dyn Transformer>>) -> Self {
        Self { passes }
    }

    /// Number of passes
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Pass names in execution order
    pub fn names(&self) -> Vec<&str> {
        self.passes.iter().map(|pass| pass.name()).collect()
    }

    /// Human-readable pass sequence (`a -> b -> c`)
    pub fn describe(&self) -> String {
        self.names().join(" -> ")
    }

    /// Run every pass in order
    ///
    /// Returns the output of the last pass. If any pass fails the whole run
    /// fails and no graph is produced.
    pub fn run(&self, graph: &Graph) -> OptResult<Graph> {
        self.run_with_report(graph).map(|(graph, _)| graph)
    }

    /// Run every pass in order, reporting what each one did
    pub fn run_with_report(&self, graph: &Graph) -> OptResult<(Graph, PipelineReport)> {
        info!("Transform pipeline: {}", self.describe());

        let mut report = PipelineReport::default();
        let mut current = graph.clone();

        for pass in &self.passes {
            debug!(pass = pass.name(), ops = current.op_count(), "Running pass");

            let next = pass
                .transform(&current)
                .map_err(|source| TransformError::PassFailed {
                    pass: pass.name().to_string(),
                    source: Box::new(source),
                })?;

            report.passes.push(PassReport {
                name: pass.name().to_string(),
                ops_before: current.op_count(),
                ops_after: next.op_count(),
                metadata_before: current.metadata().len(),
                metadata_after: next.metadata().len(),
            });
            current = next;
        }

        Ok((current, report))
    }
}

impl Transformer for Pipeline {
    fn name(&self) -> &str {
        "pipeline"
    }

    fn transform(&self, graph: &Graph) -> OptResult<Graph> {
        self.run(graph)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("passes", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphEdit, MetaValue, Namespace, OpInfo};
    use crate::tensor::{DataType, Shape};
    use crate::transform::{PassConfig, PassSpec};

    /// Tags every op with the pass name
    struct Tag(&'static str);

    impl Transformer for Tag {
        fn name(&self) -> &str {
            self.0
        }

        fn transform(&self, graph: &Graph) -> OptResult<Graph> {
            let ns = Namespace::new(self.0)?;
            let mut edit = GraphEdit::new(graph);
            for (id, _) in graph.ops_with_ids() {
                edit.set_meta_by_id(id, &ns, "seen", MetaValue::Flag(true));
            }
            Ok(edit.finish()?)
        }
    }

    struct Fail;

    impl Transformer for Fail {
        fn name(&self) -> &str {
            "fail"
        }

        fn transform(&self, _graph: &Graph) -> OptResult<Graph> {
            Err(TransformError::Internal("boom".to_string()))
        }
    }

    fn make_test_graph() -> Graph {
        Graph::new(
            vec![
                OpInfo::new("x", "Placeholder").with_output(DataType::Float, Shape::unknown()),
                OpInfo::new("c", "Const").with_output(DataType::Float, Shape::unknown()),
                OpInfo::new("add", "Add")
                    .with_inputs(["x:0", "c:0"])
                    .with_output(DataType::Float, Shape::unknown()),
            ],
            ["add"],
        )
        .unwrap()
    }

    #[test]
    fn test_unknown_pass_fails_at_construction() {
        let config = PipelineConfig::from_names(["refcnt", "fold_everything"]);
        let err = Pipeline::new(&config, &PassRegistry::with_defaults()).unwrap_err();

        assert!(matches!(err, TransformError::UnknownPass(name) if name == "fold_everything"));
    }

    #[test]
    fn test_rejected_config_fails_at_construction() {
        let config = PipelineConfig::new().with_pass(
            PassSpec::new("refcnt").with_config(PassConfig::new().with("prune_graph", true)),
        );

        assert!(matches!(
            Pipeline::new(&config, &PassRegistry::with_defaults()),
            Err(TransformError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_composition() {
        let graph = make_test_graph();

        let both = Pipeline::from_transformers(vec![Box::new(Tag("a")), Box::new(Tag("b"))]);
        let sequential = Tag("b").transform(&Tag("a").transform(&graph).unwrap()).unwrap();

        assert_eq!(both.run(&graph).unwrap(), sequential);
        assert_eq!(both.describe(), "a -> b");
    }

    #[test]
    fn test_failure_aborts_without_output() {
        let graph = make_test_graph();
        let pipeline =
            Pipeline::from_transformers(vec![Box::new(Tag("a")), Box::new(Fail), Box::new(Tag("b"))]);

        let err = pipeline.run(&graph).unwrap_err();
        assert!(matches!(err, TransformError::PassFailed { ref pass, .. } if pass == "fail"));
        // caller's graph untouched
        assert!(graph.metadata().is_empty());
    }

    #[test]
    fn test_empty_pipeline_is_identity() {
        let graph = make_test_graph();
        let pipeline = Pipeline::from_transformers(Vec::new());

        assert!(pipeline.is_empty());
        assert_eq!(pipeline.run(&graph).unwrap(), graph);
    }

    #[test]
    fn test_report() {
        let graph = make_test_graph();
        let config = PipelineConfig::from_names(["refcnt"]);
        let pipeline = Pipeline::new(&config, &PassRegistry::with_defaults()).unwrap();

        let (_, report) = pipeline.run_with_report(&graph).unwrap();
        assert_eq!(report.passes.len(), 1);
        assert_eq!(report.passes[0].metadata_before, 0);
        assert_eq!(report.passes[0].metadata_after, 6);
        assert_eq!(report.ops_removed(), 0);
    }
}
