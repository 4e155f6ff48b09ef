//! Graph traversal utilities
//!
//! Breadth-first traversal over an arena [`Graph`], used by the matcher to fix
//! the order in which pattern operations are bound.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use crate::graph::{Graph, OpId};

/// Direction of traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Forward: follow consumer edges (input → output)
    Forward,
    /// Backward: follow producer edges (output → input)
    Backward,
}

/// BFS traversal iterator
///
/// Every op is yielded at most once. Neighbours are queued in operand order
/// (backward) or in use order (forward).
pub struct BfsIterator<'a> {
    graph: &'a Graph,
    queue: VecDeque<OpId>,
    visited: FxHashSet<OpId>,
    direction: Direction,
}

impl<'a> BfsIterator<'a> {
    /// Create a new BFS iterator starting from the given ops, in order
    pub fn new(graph: &'a Graph, roots: &[OpId], direction: Direction) -> Self {
        let mut queue = VecDeque::with_capacity(roots.len());
        let mut visited = FxHashSet::default();

        for &root in roots {
            if root.index() < graph.op_count() && visited.insert(root) {
                queue.push_back(root);
            }
        }

        Self {
            graph,
            queue,
            visited,
            direction,
        }
    }

    /// Create forward BFS (follows consumers)
    pub fn forward(graph: &'a Graph, roots: &[OpId]) -> Self {
        Self::new(graph, roots, Direction::Forward)
    }

    /// Create backward BFS (follows producers)
    pub fn backward(graph: &'a Graph, roots: &[OpId]) -> Self {
        Self::new(graph, roots, Direction::Backward)
    }

    fn enqueue(&mut self, id: OpId) {
        if self.visited.insert(id) {
            self.queue.push_back(id);
        }
    }
}

impl<'a> Iterator for BfsIterator<'a> {
    type Item = OpId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.queue.pop_front()?;
        let graph = self.graph;
        let op = graph.op_by_id(id);

        match self.direction {
            Direction::Forward => {
                for output in &op.outputs {
                    for tensor_use in graph.tensor_uses(&output.name) {
                        self.enqueue(tensor_use.op);
                    }
                }
            }
            Direction::Backward => {
                for producer in graph.input_op_ids(op) {
                    self.enqueue(producer);
                }
            }
        }

        Some(id)
    }
}

/// Order in which a pattern's ops are consumed during matching
///
/// Breadth-first from the output nodes towards the inputs. The output nodes
/// come first, in declaration order, and every op appears once. Ops from which
/// no output is reachable are absent.
pub fn consumption_order(pattern: &Graph) -> Vec<OpId> {
    BfsIterator::backward(pattern, pattern.output_ids()).collect()
}
