//! Subgraph pattern matching
//!
//! This module finds occurrences of a small pattern graph inside a larger
//! subject graph, which is the first step of any rewrite that replaces a known
//! op sequence with a fused or target-specific kernel.
//!
//! # Overview
//!
//! The matching system works by:
//! 1. Declaring operator equivalences (commutative operands, plain/quantized
//!    pairs) in an [`EquivalenceRegistry`]
//! 2. Binding pattern ops from the outputs backwards, branching on every
//!    admissible operand permutation
//! 3. Returning each distinct complete binding as a [`GraphMatch`]
//!
//! # Example
//!
//! ```ignore
//! use ugraph_optimizer::pattern::{EquivalenceRegistry, GraphMatcher};
//!
//! let registry = EquivalenceRegistry::with_defaults();
//! let matcher = GraphMatcher::new(&pattern, &registry)?;
//!
//! for m in matcher.match_all(&subject) {
//!     println!("conv bound to {:?}", m.subject_op("conv"));
//! }
//! ```
//!
//! # Traversal
//!
//! The module also provides breadth-first traversal over a graph:
//!
//! ```ignore
//! use ugraph_optimizer::pattern::traversal::BfsIterator;
//!
//! for id in BfsIterator::backward(&graph, graph.output_ids()) {
//!     println!("Visiting: {}", graph.op_by_id(id).name);
//! }
//! ```

pub mod equivalence;
pub mod matcher;
mod state;
pub mod traversal;

// Re-export main types
pub use equivalence::{
    identity, Equivalence, EquivalenceRegistry, EquivalenceRegistryBuilder, Permutation,
};
pub use matcher::{find_matches, GraphMatcher, WILDCARD_OP_TYPE};
pub use state::GraphMatch;
pub use traversal::{consumption_order, BfsIterator, Direction};
