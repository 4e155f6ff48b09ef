//! Graph IR
//!
//! This module provides the core infrastructure for working with computation
//! graphs:
//!
//! - [`Graph`]: immutable, validated graph with O(1) lookups
//! - [`GraphEdit`]: copy-on-write edits that produce a new graph
//! - [`GraphDef`]: the unvalidated description handed over by a loader
//! - [`maps`]: arena ids and the derived lookup maps
//! - [`attr`]: typed operator parameters and the pass metadata side-table
//!
//! # Example
//!
//! ```ignore
//! use ugraph_optimizer::graph::{Graph, OpInfo};
//! use ugraph_optimizer::tensor::{DataType, Shape};
//!
//! let graph = Graph::new(
//!     vec![
//!         OpInfo::new("x", "Placeholder").with_output(DataType::Float, Shape::fixed(&[1, 4])),
//!         OpInfo::new("relu", "Relu")
//!             .with_input("x:0")
//!             .with_output(DataType::Float, Shape::fixed(&[1, 4])),
//!     ],
//!     ["relu"],
//! )?;
//!
//! let relus = graph.ops_by_type("Relu");
//! let producer = graph.producer("x:0");
//! for op in graph.topo_ops() {
//!     println!("{} ({})", op.name, op.op_type);
//! }
//! ```
//!
//! # Maps
//!
//! The graph maintains several maps for O(1) lookups:
//!
//! | Map | Description |
//! |-----|-------------|
//! | `op_index` | op_name → OpId (insertion order preserved) |
//! | `producer_map` | tensor_name → (producer, output slot) |
//! | `consumer_map` | tensor_name → [(consumer, input slot)] |

pub mod accessors;
pub mod attr;
pub mod context;
pub mod def;
pub mod maps;
pub mod mutators;
pub mod op;
pub mod validation;

// Re-export main types
pub use accessors::{OpView, QUANTIZED_OP_TYPES};
pub use attr::{AttrMap, AttrValue, MetaValue, Metadata, Namespace, Namespaced, OpMetadata};
pub use context::Graph;
pub use def::GraphDef;
pub use maps::{
    build_input_count_map, ConsumerMap, InputCountMap, OpId, OpIndexMap, ProducerMap, TensorRef,
    TensorUse,
};
pub use mutators::GraphEdit;
pub use op::{tensor_name, OpInfo, TensorInfo};
pub use validation::{check_topo_order, topo_sort};
