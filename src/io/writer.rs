//! Graph snapshot writer
//!
//! Save graphs, including their pass metadata, to files or bytes.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use prost::Message;

use crate::error::{OptResult, TransformError};
use crate::graph::Graph;
use crate::proto::to_record;

/// Save a graph snapshot to a file
///
/// # Example
///
/// ```ignore
/// use ugraph_optimizer::io::save_graph;
///
/// save_graph(&annotated, "annotated.ugraph")?;
/// ```
pub fn save_graph<P: AsRef<Path>>(graph: &Graph, path: P) -> OptResult<()> {
    let bytes = graph_to_bytes(graph);
    write_bytes(&bytes, path.as_ref())
}

/// Encode a graph snapshot to bytes
pub fn graph_to_bytes(graph: &Graph) -> Vec<u8> {
    to_record(graph).encode_to_vec()
}

/// Calculate the size of an encoded snapshot in bytes
pub fn snapshot_size(graph: &Graph) -> usize {
    to_record(graph).encoded_len()
}

/// Snapshot statistics
#[derive(Debug, Clone)]
pub struct SaveStats {
    /// Size in bytes
    pub size_bytes: usize,
    /// Number of ops
    pub op_count: usize,
    /// Number of stored metadata values
    pub metadata_count: usize,
}

/// Save a graph snapshot and return statistics
pub fn save_graph_with_stats<P: AsRef<Path>>(graph: &Graph, path: P) -> OptResult<SaveStats> {
    let bytes = graph_to_bytes(graph);
    let stats = SaveStats {
        size_bytes: bytes.len(),
        op_count: graph.op_count(),
        metadata_count: graph.metadata().len(),
    };

    write_bytes(&bytes, path.as_ref())?;
    Ok(stats)
}

fn write_bytes(bytes: &[u8], path: &Path) -> OptResult<()> {
    let file = File::create(path).map_err(|e| {
        TransformError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to create file '{}': {}", path.display(), e),
        ))
    })?;

    let mut writer = BufWriter::new(file);
    writer.write_all(bytes)?;
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphEdit, MetaValue, Namespace, OpInfo};
    use crate::io::reader::load_graph;
    use crate::tensor::{DataType, Shape};

    fn create_test_graph() -> Graph {
        let graph = Graph::new(
            vec![
                OpInfo::new("x", "Placeholder").with_output(DataType::Float, Shape::fixed(&[2])),
                OpInfo::new("relu", "Relu")
                    .with_input("x:0")
                    .with_output(DataType::Float, Shape::fixed(&[2])),
            ],
            ["relu"],
        )
        .unwrap();

        let ns = Namespace::new("refcnt").unwrap();
        let mut edit = GraphEdit::new(&graph);
        edit.set_meta("relu", &ns, "to_eval", MetaValue::Flag(false))
            .unwrap();
        edit.finish().unwrap()
    }

    #[test]
    fn test_snapshot_size() {
        let graph = create_test_graph();
        assert_eq!(snapshot_size(&graph), graph_to_bytes(&graph).len());
    }

    #[test]
    fn test_save_and_load() {
        let graph = create_test_graph();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.ugraph");

        save_graph(&graph, &path).unwrap();
        let loaded = load_graph(&path).unwrap();

        assert_eq!(loaded, graph);
    }

    #[test]
    fn test_save_with_stats() {
        let graph = create_test_graph();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.ugraph");

        let stats = save_graph_with_stats(&graph, &path).unwrap();

        assert!(stats.size_bytes > 0);
        assert_eq!(stats.op_count, 2);
        assert_eq!(stats.metadata_count, 1);
    }

    #[test]
    fn test_save_to_missing_dir_fails() {
        let graph = create_test_graph();
        assert!(save_graph(&graph, "/nonexistent/dir/graph.ugraph").is_err());
    }
}
