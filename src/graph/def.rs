//! Loader hand-off format
//!
//! A [`GraphDef`] is what an importer produces from an interchange file: the
//! ops in file order plus the names of the output nodes. Nothing is checked
//! until it is turned into a [`Graph`].

use crate::error::ValidationError;

use super::context::Graph;
use super::op::OpInfo;

/// Unvalidated graph description
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphDef {
    /// Ops in file order
    pub ops: Vec<OpInfo>,
    /// Names of the designated output nodes
    pub output_nodes: Vec<String>,
}

impl GraphDef {
    /// Empty description
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an op
    pub fn with_op(mut self, op: OpInfo) -> Self {
        self.ops.push(op);
        self
    }

    /// Designate an output node
    pub fn with_output(mut self, name: impl Into<String>) -> Self {
        self.output_nodes.push(name.into());
        self
    }

    /// Validate and build the graph
    pub fn build(self) -> Result<Graph, ValidationError> {
        Graph::new(self.ops, self.output_nodes)
    }
}

impl TryFrom<GraphDef> for Graph {
    type Error = ValidationError;

    fn try_from(def: GraphDef) -> Result<Self, Self::Error> {
        def.build()
    }
}

impl From<&Graph> for GraphDef {
    fn from(graph: &Graph) -> Self {
        Self {
            ops: graph.ops().cloned().collect(),
            output_nodes: graph
                .output_nodes()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}
