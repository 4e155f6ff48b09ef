//! Graph snapshot reader
//!
//! Load graph snapshots from files or bytes.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use prost::Message;

use crate::error::{OptResult, TransformError};
use crate::graph::Graph;
use crate::proto::{from_record, GraphRecord};

/// Load a graph snapshot from a file path
///
/// # Example
///
/// ```ignore
/// use ugraph_optimizer::io::load_graph;
///
/// let graph = load_graph("annotated.ugraph")?;
/// println!("{} ops", graph.op_count());
/// ```
pub fn load_graph<P: AsRef<Path>>(path: P) -> OptResult<Graph> {
    let path = path.as_ref();

    let file = File::open(path).map_err(|e| {
        TransformError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to open file '{}': {}", path.display(), e),
        ))
    })?;

    let mut reader = BufReader::new(file);
    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer)?;

    load_graph_from_bytes(&buffer)
}

/// Load a graph snapshot from bytes
///
/// The decoded graph goes through full validation.
pub fn load_graph_from_bytes(bytes: &[u8]) -> OptResult<Graph> {
    let record = load_record_from_bytes(bytes)?;
    from_record(record)
}

/// Decode the raw snapshot record without building a graph
pub fn load_record_from_bytes(bytes: &[u8]) -> OptResult<GraphRecord> {
    Ok(GraphRecord::decode(bytes)?)
}

/// Summary of a snapshot, read without validating the graph
#[derive(Debug, Clone)]
pub struct SnapshotInfo {
    /// Number of ops
    pub op_count: usize,
    /// Number of op outputs
    pub tensor_count: usize,
    /// Output node names
    pub output_nodes: Vec<String>,
    /// Number of stored metadata values
    pub metadata_count: usize,
    /// Distinct metadata namespaces, sorted
    pub namespaces: Vec<String>,
}

impl SnapshotInfo {
    /// Extract a summary from a record
    pub fn from_record(record: &GraphRecord) -> Self {
        let mut namespaces: Vec<String> = record
            .metadata
            .iter()
            .map(|entry| entry.namespace.clone())
            .collect();
        namespaces.sort();
        namespaces.dedup();

        Self {
            op_count: record.ops.len(),
            tensor_count: record.ops.iter().map(|op| op.outputs.len()).sum(),
            output_nodes: record.output_nodes.clone(),
            metadata_count: record.metadata.len(),
            namespaces,
        }
    }
}

/// Get snapshot information without building the graph
pub fn get_snapshot_info<P: AsRef<Path>>(path: P) -> OptResult<SnapshotInfo> {
    let bytes = std::fs::read(path)?;
    let record = load_record_from_bytes(&bytes)?;
    Ok(SnapshotInfo::from_record(&record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{OpRecord, TensorRecord};

    fn create_test_record() -> GraphRecord {
        GraphRecord {
            ops: vec![
                OpRecord {
                    name: "x".to_string(),
                    op_type: "Placeholder".to_string(),
                    outputs: vec![TensorRecord {
                        name: "x:0".to_string(),
                        dtype: 1,
                        shape: None,
                    }],
                    ..Default::default()
                },
                OpRecord {
                    name: "relu".to_string(),
                    op_type: "Relu".to_string(),
                    inputs: vec!["x:0".to_string()],
                    outputs: vec![TensorRecord {
                        name: "relu:0".to_string(),
                        dtype: 1,
                        shape: None,
                    }],
                    ..Default::default()
                },
            ],
            output_nodes: vec!["relu".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_load_from_bytes() {
        let bytes = create_test_record().encode_to_vec();

        let graph = load_graph_from_bytes(&bytes).unwrap();
        assert_eq!(graph.op_count(), 2);
        assert_eq!(graph.output_nodes(), vec!["relu"]);
    }

    #[test]
    fn test_snapshot_info() {
        let info = SnapshotInfo::from_record(&create_test_record());

        assert_eq!(info.op_count, 2);
        assert_eq!(info.tensor_count, 2);
        assert_eq!(info.output_nodes, vec!["relu"]);
        assert!(info.namespaces.is_empty());
    }

    #[test]
    fn test_load_invalid_bytes() {
        let result = load_graph_from_bytes(&[0xff, 0xff, 0xff, 0xff]);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_dangling_input_rejected() {
        let mut record = create_test_record();
        record.ops[1].inputs = vec!["ghost:0".to_string()];

        let result = load_graph_from_bytes(&record.encode_to_vec());
        assert!(matches!(result, Err(TransformError::Validation(_))));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            load_graph("/nonexistent/graph.ugraph"),
            Err(TransformError::Io(_))
        ));
    }
}
