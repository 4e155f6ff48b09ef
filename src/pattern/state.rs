//! Match bookkeeping
//!
//! A [`MatchRecord`] holds the partial correspondence built along one search
//! branch. Every extension returns a new record, so sibling branches never
//! see each other's bindings. A finished record is turned into an owned
//! [`GraphMatch`].

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::graph::{Graph, OpId};

/// A complete occurrence of a pattern in a subject graph
///
/// Correspondences are kept in both directions, by name. Op pairs are listed
/// in the order they were bound.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphMatch {
    pattern_ops: IndexMap<String, String>,
    subject_ops: IndexMap<String, String>,
    pattern_tensors: IndexMap<String, String>,
    subject_tensors: IndexMap<String, String>,
}

impl GraphMatch {
    /// Subject op bound to a pattern op
    pub fn subject_op(&self, pattern_op: &str) -> Option<&str> {
        self.pattern_ops.get(pattern_op).map(String::as_str)
    }

    /// Pattern op bound to a subject op
    pub fn pattern_op(&self, subject_op: &str) -> Option<&str> {
        self.subject_ops.get(subject_op).map(String::as_str)
    }

    /// Subject tensor bound to a pattern tensor
    pub fn subject_tensor(&self, pattern_tensor: &str) -> Option<&str> {
        self.pattern_tensors.get(pattern_tensor).map(String::as_str)
    }

    /// Pattern tensor bound to a subject tensor
    pub fn pattern_tensor(&self, subject_tensor: &str) -> Option<&str> {
        self.subject_tensors.get(subject_tensor).map(String::as_str)
    }

    /// (pattern op, subject op) pairs
    pub fn op_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pattern_ops
            .iter()
            .map(|(p, s)| (p.as_str(), s.as_str()))
    }

    /// (pattern tensor, subject tensor) pairs
    pub fn tensor_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pattern_tensors
            .iter()
            .map(|(p, s)| (p.as_str(), s.as_str()))
    }

    /// Names of the subject ops covered by the match
    pub fn subject_op_names(&self) -> impl Iterator<Item = &str> {
        self.pattern_ops.values().map(String::as_str)
    }

    /// Number of bound ops
    pub fn len(&self) -> usize {
        self.pattern_ops.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.pattern_ops.is_empty()
    }
}

/// Identity of a finished record, independent of binding order
pub(crate) type MatchKey<'p, 's> = (Vec<(OpId, OpId)>, Vec<(&'p str, &'s str)>);

/// Partial correspondence between a pattern (`'p`) and a subject (`'s`)
#[derive(Debug, Clone, Default)]
pub(crate) struct MatchRecord<'p, 's> {
    ops: IndexMap<OpId, OpId>,
    op_owners: FxHashMap<OpId, OpId>,
    tensors: IndexMap<&'p str, &'s str>,
    tensor_owners: FxHashMap<&'s str, &'p str>,
}

impl<'p, 's> MatchRecord<'p, 's> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_bound(&self, pattern_op: OpId) -> bool {
        self.ops.contains_key(&pattern_op)
    }

    pub(crate) fn is_claimed(&self, subject_op: OpId) -> bool {
        self.op_owners.contains_key(&subject_op)
    }

    pub(crate) fn subject_op(&self, pattern_op: OpId) -> Option<OpId> {
        self.ops.get(&pattern_op).copied()
    }

    pub(crate) fn tensor_pairs(&self) -> impl Iterator<Item = (&'p str, &'s str)> + '_ {
        self.tensors.iter().map(|(p, s)| (*p, *s))
    }

    pub(crate) fn subject_tensor(&self, pattern_tensor: &str) -> Option<&'s str> {
        self.tensors.get(pattern_tensor).copied()
    }

    /// Whether pairing the two tensors keeps the tensor map bijective
    pub(crate) fn tensor_agrees(&self, pattern_tensor: &str, subject_tensor: &str) -> bool {
        match self.tensors.get(pattern_tensor) {
            Some(bound) => *bound == subject_tensor,
            None => !self.tensor_owners.contains_key(subject_tensor),
        }
    }

    /// Whether `perm` lines the operands up with the bindings made so far
    pub(crate) fn aligns(&self, pattern_inputs: &[String], subject_inputs: &[String], perm: &[usize]) -> bool {
        perm.iter().enumerate().all(|(k, &j)| {
            match (pattern_inputs.get(j), subject_inputs.get(k)) {
                (Some(pt), Some(st)) => self.tensor_agrees(pt, st),
                _ => false,
            }
        })
    }

    /// Extend the record with an op pair and the tensor pairs it implies
    ///
    /// Returns `None` on contradiction: the subject op already belongs to
    /// another pattern op, or a tensor pair breaks bijectivity.
    pub(crate) fn bind<I>(&self, pattern_op: OpId, subject_op: OpId, tensor_pairs: I) -> Option<Self>
    where
        I: IntoIterator<Item = (&'p str, &'s str)>,
    {
        match self.op_owners.get(&subject_op) {
            Some(&owner) if owner != pattern_op => return None,
            _ => {}
        }

        let mut next = self.clone();
        next.ops.insert(pattern_op, subject_op);
        next.op_owners.insert(subject_op, pattern_op);

        for (pt, st) in tensor_pairs {
            if !next.tensor_agrees(pt, st) {
                return None;
            }
            next.tensors.insert(pt, st);
            next.tensor_owners.insert(st, pt);
        }

        Some(next)
    }

    pub(crate) fn key(&self) -> MatchKey<'p, 's> {
        let mut ops: Vec<_> = self.ops.iter().map(|(p, s)| (*p, *s)).collect();
        ops.sort_unstable();
        let mut tensors: Vec<_> = self.tensors.iter().map(|(p, s)| (*p, *s)).collect();
        tensors.sort_unstable();
        (ops, tensors)
    }

    pub(crate) fn to_match(&self, pattern: &Graph, subject: &Graph) -> GraphMatch {
        let mut result = GraphMatch::default();

        for (&p, &s) in &self.ops {
            let p_name = pattern.op_by_id(p).name.clone();
            let s_name = subject.op_by_id(s).name.clone();
            result.subject_ops.insert(s_name.clone(), p_name.clone());
            result.pattern_ops.insert(p_name, s_name);
        }
        for (&pt, &st) in &self.tensors {
            result.pattern_tensors.insert(pt.to_string(), st.to_string());
            result.subject_tensors.insert(st.to_string(), pt.to_string());
        }

        result
    }
}

/// One pending branch of the search
#[derive(Debug, Clone)]
pub(crate) struct SearchState<'p, 's> {
    /// Bindings made along this branch
    pub(crate) record: MatchRecord<'p, 's>,
    /// Position in the pattern's consumption order
    pub(crate) cursor: usize,
}

impl<'p, 's> SearchState<'p, 's> {
    pub(crate) fn root() -> Self {
        Self {
            record: MatchRecord::new(),
            cursor: 0,
        }
    }

    pub(crate) fn advance(&self, record: MatchRecord<'p, 's>) -> Self {
        Self {
            record,
            cursor: self.cursor + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_is_persistent() {
        let root = MatchRecord::new();
        let bound = root
            .bind(OpId::new(0), OpId::new(5), [("a:0", "x:0")])
            .unwrap();

        assert!(bound.is_bound(OpId::new(0)));
        assert!(bound.is_claimed(OpId::new(5)));
        assert!(!root.is_bound(OpId::new(0)));
        assert_eq!(bound.subject_tensor("a:0"), Some("x:0"));
    }

    #[test]
    fn test_op_injectivity() {
        let record = MatchRecord::new()
            .bind(OpId::new(0), OpId::new(5), std::iter::empty())
            .unwrap();

        assert!(record
            .bind(OpId::new(1), OpId::new(5), std::iter::empty())
            .is_none());
    }

    #[test]
    fn test_tensor_bijectivity() {
        let record = MatchRecord::new()
            .bind(OpId::new(0), OpId::new(5), [("a:0", "x:0")])
            .unwrap();

        // same pattern tensor, other subject tensor
        assert!(record
            .bind(OpId::new(1), OpId::new(6), [("a:0", "y:0")])
            .is_none());
        // other pattern tensor, same subject tensor
        assert!(record
            .bind(OpId::new(1), OpId::new(6), [("b:0", "x:0")])
            .is_none());
        // repeated pair is fine
        assert!(record
            .bind(OpId::new(1), OpId::new(6), [("a:0", "x:0")])
            .is_some());
    }

    #[test]
    fn test_aligns() {
        let record = MatchRecord::new()
            .bind(OpId::new(0), OpId::new(5), [("a:0", "x:0")])
            .unwrap();
        let pattern_inputs = vec!["a:0".to_string(), "b:0".to_string()];
        let subject_inputs = vec!["y:0".to_string(), "x:0".to_string()];

        assert!(!record.aligns(&pattern_inputs, &subject_inputs, &[0, 1]));
        assert!(record.aligns(&pattern_inputs, &subject_inputs, &[1, 0]));
        assert!(!record.aligns(&pattern_inputs, &subject_inputs, &[2, 0]));
    }

    #[test]
    fn test_key_ignores_binding_order() {
        let first = MatchRecord::new()
            .bind(OpId::new(0), OpId::new(5), [("a:0", "x:0")])
            .and_then(|r| r.bind(OpId::new(1), OpId::new(6), [("b:0", "y:0")]))
            .unwrap();
        let second = MatchRecord::new()
            .bind(OpId::new(1), OpId::new(6), [("b:0", "y:0")])
            .and_then(|r| r.bind(OpId::new(0), OpId::new(5), [("a:0", "x:0")]))
            .unwrap();

        assert_eq!(first.key(), second.key());
    }
}
