//! Structural invariants
//!
//! Topological ordering and the checks that back [`ValidationError`]: a graph
//! is only ever constructed after these pass.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;

use crate::error::ValidationError;

use super::maps::{OpId, ProducerMap};
use super::op::OpInfo;

/// Compute a topological order (Kahn's algorithm)
///
/// Ties are broken by arena order, so the result is deterministic and equals
/// the arena order whenever that order is already valid.
pub fn topo_sort(
    ops: &[Arc<OpInfo>],
    producers: &ProducerMap,
) -> Result<Vec<OpId>, ValidationError> {
    let n = ops.len();
    let mut in_degree = vec![0usize; n];
    let mut dependents: Vec<Vec<OpId>> = vec![Vec::new(); n];

    for (idx, op) in ops.iter().enumerate() {
        for input in &op.inputs {
            let producer = producers
                .get(input)
                .ok_or_else(|| ValidationError::DanglingTensor {
                    op: op.name.clone(),
                    tensor: input.clone(),
                })?;
            in_degree[idx] += 1;
            dependents[producer.op.index()].push(OpId::new(idx));
        }
    }

    let mut ready: BinaryHeap<Reverse<OpId>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &d)| d == 0)
        .map(|(idx, _)| Reverse(OpId::new(idx)))
        .collect();

    let mut order = Vec::with_capacity(n);
    while let Some(Reverse(id)) = ready.pop() {
        order.push(id);
        for &dependent in &dependents[id.index()] {
            let degree = &mut in_degree[dependent.index()];
            *degree -= 1;
            if *degree == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }

    if order.len() != n {
        let ops = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &d)| d > 0)
            .map(|(idx, _)| ops[idx].name.clone())
            .collect();
        return Err(ValidationError::Cycle { ops });
    }

    Ok(order)
}

/// Check that `order` is a valid linearization of the arena
///
/// Every op must appear exactly once and every producer must precede its
/// consumers.
pub fn check_topo_order(
    ops: &[Arc<OpInfo>],
    producers: &ProducerMap,
    order: &[OpId],
) -> Result<(), ValidationError> {
    if order.len() != ops.len() {
        return Err(ValidationError::InvalidTopoOrder(format!(
            "{} entries for {} ops",
            order.len(),
            ops.len()
        )));
    }

    let mut position = vec![usize::MAX; ops.len()];
    for (pos, id) in order.iter().enumerate() {
        let slot = position.get_mut(id.index()).ok_or_else(|| {
            ValidationError::InvalidTopoOrder(format!("op index {} out of range", id.index()))
        })?;
        if *slot != usize::MAX {
            return Err(ValidationError::InvalidTopoOrder(format!(
                "op '{}' listed twice",
                ops[id.index()].name
            )));
        }
        *slot = pos;
    }

    for (idx, op) in ops.iter().enumerate() {
        for input in &op.inputs {
            let producer = producers
                .get(input)
                .ok_or_else(|| ValidationError::DanglingTensor {
                    op: op.name.clone(),
                    tensor: input.clone(),
                })?;
            if position[producer.op.index()] >= position[idx] {
                return Err(ValidationError::InvalidTopoOrder(format!(
                    "'{}' must come before '{}'",
                    ops[producer.op.index()].name,
                    op.name
                )));
            }
        }
    }

    Ok(())
}
