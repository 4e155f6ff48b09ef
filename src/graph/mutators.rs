//! Copy-on-write graph edits
//!
//! Graphs never change after construction. A pass that needs a different
//! graph records its changes on a [`GraphEdit`] and calls
//! [`GraphEdit::finish`], which validates the result and returns a new graph.
//! Ops the edit does not touch stay shared with the source graph; an edit that
//! only writes metadata shares the whole op arena.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::ValidationError;

use super::attr::{MetaValue, Metadata, Namespace};
use super::context::Graph;
use super::maps::OpId;
use super::op::OpInfo;

/// Pending changes against a source graph
#[derive(Debug)]
pub struct GraphEdit<'g> {
    source: &'g Graph,
    /// Arena slots; `None` marks a removed op. Source ops keep their ids and
    /// inserted ops are appended.
    ops: Vec<Option<Arc<OpInfo>>>,
    inserted: FxHashMap<String, OpId>,
    output_nodes: Option<Vec<String>>,
    metadata: Metadata,
    removed_any: bool,
    rewired: bool,
}

impl<'g> GraphEdit<'g> {
    /// Start an edit of `source`
    pub fn new(source: &'g Graph) -> Self {
        Self {
            source,
            ops: source.arena.ops.iter().cloned().map(Some).collect(),
            inserted: FxHashMap::default(),
            output_nodes: None,
            metadata: source.metadata.clone(),
            removed_any: false,
            rewired: false,
        }
    }

    /// The graph being edited
    pub fn source(&self) -> &'g Graph {
        self.source
    }

    /// Resolve a live op name to its id in this edit
    pub fn resolve(&self, name: &str) -> Result<OpId, ValidationError> {
        let id = self
            .source
            .op_id(name)
            .or_else(|| self.inserted.get(name).copied())
            .ok_or_else(|| ValidationError::UnknownOp(name.to_string()))?;

        match self.ops.get(id.index()) {
            Some(Some(_)) => Ok(id),
            _ => Err(ValidationError::UnknownOp(name.to_string())),
        }
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    /// Store a metadata value on an op
    pub fn set_meta(
        &mut self,
        op_name: &str,
        namespace: &Namespace,
        kind: &str,
        value: MetaValue,
    ) -> Result<Option<MetaValue>, ValidationError> {
        let id = self.resolve(op_name)?;
        Ok(self.set_meta_by_id(id, namespace, kind, value))
    }

    /// Store a metadata value on an op by id
    ///
    /// Ids of the source graph stay valid throughout the edit.
    pub fn set_meta_by_id(
        &mut self,
        id: OpId,
        namespace: &Namespace,
        kind: &str,
        value: MetaValue,
    ) -> Option<MetaValue> {
        self.metadata.insert(id, namespace.clone(), kind, value)
    }

    // ========================================================================
    // Structure
    // ========================================================================

    /// Remove an op (and its metadata)
    ///
    /// Consumers of its outputs must be removed or rewired before
    /// [`finish`](Self::finish), otherwise validation fails.
    pub fn remove_op(&mut self, name: &str) -> Result<Arc<OpInfo>, ValidationError> {
        let id = self.resolve(name)?;
        let removed = self.ops[id.index()]
            .take()
            .ok_or_else(|| ValidationError::UnknownOp(name.to_string()))?;
        self.metadata.remove_op(id);
        self.removed_any = true;
        Ok(removed)
    }

    /// Replace an op with a new version carrying the same name
    pub fn replace_op(&mut self, op: OpInfo) -> Result<Arc<OpInfo>, ValidationError> {
        let id = self.resolve(&op.name)?;
        let name = op.name.clone();
        let old = self.ops[id.index()]
            .replace(Arc::new(op))
            .ok_or(ValidationError::UnknownOp(name))?;
        self.rewired = true;
        Ok(old)
    }

    /// Append a new op
    pub fn insert_op(&mut self, op: OpInfo) -> Result<OpId, ValidationError> {
        if self.resolve(&op.name).is_ok() {
            return Err(ValidationError::DuplicateOp(op.name));
        }
        let id = OpId::new(self.ops.len());
        self.inserted.insert(op.name.clone(), id);
        self.ops.push(Some(Arc::new(op)));
        self.rewired = true;
        Ok(id)
    }

    /// Designate a new set of output nodes
    pub fn set_output_nodes<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_nodes = Some(names.into_iter().map(Into::into).collect());
    }

    /// Validate and build the edited graph
    pub fn finish(self) -> Result<Graph, ValidationError> {
        let structural = self.removed_any || self.rewired || self.output_nodes.is_some();
        if !structural {
            return Ok(Graph {
                arena: Arc::clone(&self.source.arena),
                metadata: self.metadata,
            });
        }

        // Compact the arena and renumber
        let mut remap: Vec<Option<OpId>> = Vec::with_capacity(self.ops.len());
        let mut ops: Vec<Arc<OpInfo>> = Vec::with_capacity(self.ops.len());
        for slot in self.ops {
            match slot {
                Some(op) => {
                    remap.push(Some(OpId::new(ops.len())));
                    ops.push(op);
                }
                None => remap.push(None),
            }
        }

        let output_nodes: Vec<String> = match self.output_nodes {
            Some(names) => names,
            None => self
                .source
                .output_ids()
                .iter()
                .filter(|id| remap[id.index()].is_some())
                .map(|&id| self.source.op_by_id(id).name.clone())
                .collect(),
        };

        // Removing ops keeps the surviving relative order valid; anything else
        // needs a fresh sort.
        let topo_order = if self.rewired {
            None
        } else {
            Some(
                self.source
                    .topo_order()
                    .iter()
                    .filter_map(|id| remap[id.index()])
                    .collect(),
            )
        };

        let metadata = self.metadata.remap(|id| remap.get(id.index()).copied().flatten());

        Graph::from_shared(ops, &output_nodes, topo_order, metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::{DataType, Shape};

    fn make_test_graph() -> Graph {
        Graph::new(
            vec![
                OpInfo::new("x", "Placeholder").with_output(DataType::Float, Shape::unknown()),
                OpInfo::new("id", "Identity")
                    .with_input("x:0")
                    .with_output(DataType::Float, Shape::unknown()),
                OpInfo::new("relu", "Relu")
                    .with_input("id:0")
                    .with_output(DataType::Float, Shape::unknown()),
            ],
            ["relu"],
        )
        .unwrap()
    }

    #[test]
    fn test_metadata_only_edit_shares_arena() {
        let graph = make_test_graph();
        let ns = Namespace::new("test").unwrap();

        let mut edit = GraphEdit::new(&graph);
        edit.set_meta("relu", &ns, "seen", MetaValue::Flag(true))
            .unwrap();
        let edited = edit.finish().unwrap();

        assert!(edited.shares_ops_with(&graph));
        assert!(graph.metadata().is_empty());
        assert_eq!(edited.metadata().len(), 1);
    }

    #[test]
    fn test_set_meta_unknown_op() {
        let graph = make_test_graph();
        let ns = Namespace::new("test").unwrap();

        let mut edit = GraphEdit::new(&graph);
        assert!(edit
            .set_meta("ghost", &ns, "k", MetaValue::Flag(true))
            .is_err());
    }

    #[test]
    fn test_rewire_and_remove() {
        let graph = make_test_graph();

        let mut edit = GraphEdit::new(&graph);
        let relu = graph.op("relu").unwrap().clone();
        edit.replace_op(OpInfo {
            inputs: vec!["x:0".to_string()],
            ..relu
        })
        .unwrap();
        edit.remove_op("id").unwrap();
        let edited = edit.finish().unwrap();

        assert_eq!(edited.op_count(), 2);
        assert!(!edited.has_op("id"));
        assert_eq!(edited.producer("x:0").unwrap().name, "x");
        assert!(edited.shares_op_with(&graph, "x"));
        assert!(!edited.shares_op_with(&graph, "relu"));
        // source untouched
        assert_eq!(graph.op_count(), 3);
    }

    #[test]
    fn test_remove_with_live_consumer_fails() {
        let graph = make_test_graph();

        let mut edit = GraphEdit::new(&graph);
        edit.remove_op("id").unwrap();
        assert!(matches!(
            edit.finish(),
            Err(ValidationError::DanglingTensor { .. })
        ));
    }

    #[test]
    fn test_insert_op_and_outputs() {
        let graph = make_test_graph();

        let mut edit = GraphEdit::new(&graph);
        edit.insert_op(
            OpInfo::new("sig", "Sigmoid")
                .with_input("relu:0")
                .with_output(DataType::Float, Shape::unknown()),
        )
        .unwrap();
        edit.set_output_nodes(["sig"]);
        let edited = edit.finish().unwrap();

        assert_eq!(edited.output_nodes(), vec!["sig"]);
        assert_eq!(edited.topo_names(), vec!["x", "id", "relu", "sig"]);
    }

    #[test]
    fn test_insert_duplicate_rejected() {
        let graph = make_test_graph();

        let mut edit = GraphEdit::new(&graph);
        assert_eq!(
            edit.insert_op(OpInfo::new("relu", "Relu")).unwrap_err(),
            ValidationError::DuplicateOp("relu".to_string())
        );
    }

    #[test]
    fn test_removal_remaps_metadata() {
        let graph = make_test_graph();
        let ns = Namespace::new("test").unwrap();

        let mut edit = GraphEdit::new(&graph);
        edit.set_meta("relu", &ns, "k", MetaValue::Int(7)).unwrap();
        let annotated = edit.finish().unwrap();

        let mut edit = GraphEdit::new(&annotated);
        let relu = annotated.op("relu").unwrap().clone();
        edit.replace_op(OpInfo {
            inputs: vec!["x:0".to_string()],
            ..relu
        })
        .unwrap();
        edit.remove_op("id").unwrap();
        let pruned = edit.finish().unwrap();

        let id = pruned.op_id("relu").unwrap();
        assert_eq!(id, OpId::new(1));
        assert_eq!(pruned.metadata().get(id, &ns, "k"), Some(&MetaValue::Int(7)));
    }
}
