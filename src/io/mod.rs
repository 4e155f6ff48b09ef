//! Graph I/O and the optimization driver
//!
//! This module provides functions for loading and saving graph snapshots, and
//! the end-to-end entry point that turns a loaded graph definition into an
//! annotated graph.
//!
//! # Example
//!
//! ```ignore
//! use ugraph_optimizer::io::{load_graph, optimize_graph, OptimizeOptions};
//!
//! // One-shot optimization
//! let (graph, stats) = optimize_graph(def, &OptimizeOptions::default())?;
//! println!("{} -> {} ops", stats.original_ops, stats.optimized_ops);
//!
//! // Reload a saved snapshot
//! let graph = load_graph("model.ugraph")?;
//! ```

pub mod reader;
pub mod writer;

// Re-exports
pub use reader::{
    get_snapshot_info, load_graph, load_graph_from_bytes, load_record_from_bytes, SnapshotInfo,
};
pub use writer::{graph_to_bytes, save_graph, save_graph_with_stats, snapshot_size, SaveStats};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::OptResult;
use crate::graph::{Graph, GraphDef};
use crate::transform::{PassRegistry, Pipeline, PipelineConfig, PipelineReport};
use crate::transformers::RefCntOptimizer;

/// Optimization statistics
#[derive(Debug, Clone, Default)]
pub struct OptimizeStats {
    /// Op count of the input graph
    pub original_ops: usize,
    /// Op count of the result
    pub optimized_ops: usize,
    /// Ops removed by the passes
    pub ops_removed: usize,
    /// Metadata values on the result
    pub metadata_count: usize,
    /// Whether the input carried quantized operators
    pub quantized: bool,
    /// Per-pass statistics
    pub passes: PipelineReport,
    /// Snapshot statistics, if one was written
    pub saved: Option<SaveStats>,
}

impl OptimizeStats {
    /// Calculate op reduction percentage
    pub fn op_reduction_percent(&self) -> f64 {
        if self.original_ops == 0 {
            0.0
        } else {
            (self.ops_removed as f64 / self.original_ops as f64) * 100.0
        }
    }
}

/// Optimization options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizeOptions {
    /// Passes to run
    pub pipeline: PipelineConfig,
    /// Write a snapshot of the result here
    pub save_graph: Option<PathBuf>,
    /// Log a warning when the graph contains quantized operators
    pub warn_quantized: bool,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::from_names([RefCntOptimizer::NAME]),
            save_graph: None,
            warn_quantized: true,
        }
    }
}

impl OptimizeOptions {
    /// Options running the given pipeline
    pub fn with_pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Save a snapshot of the result
    pub fn with_save_graph(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_graph = Some(path.into());
        self
    }

    /// Parse options from a JSON document
    pub fn from_json_str(content: &str) -> OptResult<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

/// Optimize a graph definition with the built-in passes
pub fn optimize_graph(def: GraphDef, options: &OptimizeOptions) -> OptResult<(Graph, OptimizeStats)> {
    optimize_graph_with(def, options, &PassRegistry::with_defaults())
}

/// Optimize a graph definition, resolving passes against `registry`
///
/// Builds and validates the graph, resolves the whole pipeline, runs it, and
/// saves a snapshot when asked to. Nothing is written if any step fails.
pub fn optimize_graph_with(
    def: GraphDef,
    options: &OptimizeOptions,
    registry: &PassRegistry,
) -> OptResult<(Graph, OptimizeStats)> {
    let graph = def.build()?;
    optimize(&graph, options, registry)
}

/// Re-run a pipeline over a saved snapshot and save the result
pub fn optimize_file<P1: AsRef<Path>, P2: AsRef<Path>>(
    input: P1,
    output: P2,
    options: &OptimizeOptions,
) -> OptResult<OptimizeStats> {
    let graph = load_graph(input)?;
    let options = options.clone().with_save_graph(output.as_ref());
    let (_, stats) = optimize(&graph, &options, &PassRegistry::with_defaults())?;
    Ok(stats)
}

fn optimize(
    graph: &Graph,
    options: &OptimizeOptions,
    registry: &PassRegistry,
) -> OptResult<(Graph, OptimizeStats)> {
    let quantized = graph.is_quantized();
    if quantized && options.warn_quantized {
        let quantized_ops = graph.quantized_ops();
        warn!(
            count = quantized_ops.len(),
            first = %quantized_ops.first().map_or("", |op| op.name.as_str()),
            "Graph contains quantized operators"
        );
    }

    let pipeline = Pipeline::new(&options.pipeline, registry)?;
    let (optimized, report) = pipeline.run_with_report(graph)?;

    let saved = match &options.save_graph {
        Some(path) => {
            let stats = save_graph_with_stats(&optimized, path)?;
            info!(
                path = %path.display(),
                bytes = stats.size_bytes,
                "Saved graph snapshot"
            );
            Some(stats)
        }
        None => None,
    };

    let stats = OptimizeStats {
        original_ops: graph.op_count(),
        optimized_ops: optimized.op_count(),
        ops_removed: report.ops_removed(),
        metadata_count: optimized.metadata().len(),
        quantized,
        passes: report,
        saved,
    };

    Ok((optimized, stats))
}
