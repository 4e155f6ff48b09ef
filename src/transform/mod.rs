//! Graph transformation pipeline
//!
//! This module provides the infrastructure that strings passes together:
//!
//! - [`PipelineConfig`]: ordered pass names with keyword configuration
//! - [`PassRegistry`]: name → pass factory table
//! - [`Pipeline`]: resolved passes, run sequentially
//!
//! # Overview
//!
//! Every pass consumes a graph by shared reference and produces a new one, so
//! the caller's graph is never modified. The typical workflow is:
//!
//! 1. Describe the pipeline (in code or as JSON)
//! 2. Resolve it against a registry with `Pipeline::new`
//! 3. Run it with `Pipeline::run`
//!
//! # Example
//!
//! ```ignore
//! use ugraph_optimizer::transform::{PassRegistry, Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::from_json_str(r#"{ "passes": [{ "name": "refcnt" }] }"#)?;
//! let pipeline = Pipeline::new(&config, &PassRegistry::with_defaults())?;
//!
//! let annotated = pipeline.run(&graph)?;
//! ```

pub mod config;
pub mod pipeline;
pub mod registry;

// Re-export main types
pub use config::{PassConfig, PassSpec, PipelineConfig};
pub use pipeline::{PassReport, Pipeline, PipelineReport};
pub use registry::{PassFactory, PassRegistry};
