//! Subgraph matcher
//!
//! Finds every occurrence of a pattern graph inside a subject graph, modulo the
//! operator equivalences of an [`EquivalenceRegistry`].
//!
//! # Algorithm
//!
//! Pattern ops are bound one at a time in [consumption order](consumption_order):
//! the output nodes first, then breadth-first towards the inputs. Output nodes
//! are seeded with every subject op of the same type. Any other op is bound to
//! the subject op producing the tensors its consumers were already paired
//! with. For each accepted operand permutation the search branches, so a
//! commutative op yields one branch per admissible operand order.
//!
//! Branches live on an explicit stack; each owns its bindings, so a failed
//! branch is simply dropped. Complete matches are returned in discovery order
//! with duplicates removed.
//!
//! A pattern op of type `Placeholder` without inputs is a wildcard: it binds
//! to whatever subject op produces the tensor it stands for.

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::error::{OptResult, TransformError};
use crate::graph::{Graph, OpId, OpInfo};

use super::equivalence::EquivalenceRegistry;
use super::state::{GraphMatch, MatchRecord, SearchState};
use super::traversal::consumption_order;

/// Operator type of wildcard pattern inputs
pub const WILDCARD_OP_TYPE: &str = "Placeholder";

fn is_wildcard(op: &OpInfo) -> bool {
    op.op_type == WILDCARD_OP_TYPE && op.inputs.is_empty()
}

/// Matcher for one pattern
///
/// The pattern is validated once and can then be matched against any number
/// of subject graphs.
#[derive(Debug, Clone)]
pub struct GraphMatcher<'r> {
    pattern: Graph,
    registry: &'r EquivalenceRegistry,
    order: Vec<OpId>,
}

impl<'r> GraphMatcher<'r> {
    /// Create a matcher
    ///
    /// Fails if the pattern has no output nodes or contains an op that does
    /// not feed any of them.
    pub fn new(pattern: &Graph, registry: &'r EquivalenceRegistry) -> OptResult<Self> {
        if pattern.output_ids().is_empty() {
            return Err(TransformError::InvalidPattern(
                "pattern has no output nodes".to_string(),
            ));
        }

        let order = consumption_order(pattern);
        if order.len() != pattern.op_count() {
            let reached: FxHashSet<OpId> = order.iter().copied().collect();
            let stray = pattern
                .ops_with_ids()
                .find(|(id, _)| !reached.contains(id))
                .map(|(_, op)| op.name.clone())
                .unwrap_or_default();
            return Err(TransformError::InvalidPattern(format!(
                "op '{}' does not feed any output node",
                stray
            )));
        }

        Ok(Self {
            pattern: pattern.clone(),
            registry,
            order,
        })
    }

    /// The pattern graph
    pub fn pattern(&self) -> &Graph {
        &self.pattern
    }

    /// Pattern op names in the order they are bound
    pub fn consumption_order(&self) -> Vec<&str> {
        self.order
            .iter()
            .map(|&id| self.pattern.op_by_id(id).name.as_str())
            .collect()
    }

    /// Every distinct occurrence of the pattern in `subject`
    pub fn match_all(&self, subject: &Graph) -> Vec<GraphMatch> {
        for op in self.pattern.output_ops() {
            if subject.op_ids_by_type(&op.op_type).is_empty() {
                debug!(op_type = %op.op_type, "Pattern output type absent from subject");
                return Vec::new();
            }
        }

        let mut matches = Vec::new();
        let mut seen = FxHashSet::default();
        let mut stack = vec![SearchState::root()];
        let mut explored = 0usize;

        while let Some(state) = stack.pop() {
            explored += 1;

            let Some(&pattern_op) = self.order.get(state.cursor) else {
                if self.preserves_producers(subject, &state.record)
                    && seen.insert(state.record.key())
                {
                    matches.push(state.record.to_match(&self.pattern, subject));
                }
                continue;
            };

            if state.record.is_bound(pattern_op) {
                let record = state.record.clone();
                stack.push(state.advance(record));
                continue;
            }

            let children = self.expand(subject, &state.record, pattern_op);
            // reversed so the first candidate is explored first
            stack.extend(
                children
                    .into_iter()
                    .rev()
                    .map(|record| state.advance(record)),
            );
        }

        debug!(
            pattern_ops = self.pattern.op_count(),
            subject_ops = subject.op_count(),
            explored,
            matches = matches.len(),
            "Pattern matching finished"
        );

        matches
    }

    /// Check whether the pattern occurs at least once
    pub fn is_match(&self, subject: &Graph) -> bool {
        !self.match_all(subject).is_empty()
    }

    /// Subject ops a pattern op may be bound to next
    fn candidates(&self, subject: &Graph, record: &MatchRecord<'_, '_>, pattern_op: OpId) -> Vec<OpId> {
        let op = self.pattern.op_by_id(pattern_op);
        let wildcard = is_wildcard(op);
        let mut producer: Option<OpId> = None;

        for (slot, tensor) in op.outputs.iter().enumerate() {
            let Some(subject_tensor) = record.subject_tensor(&tensor.name) else {
                continue;
            };
            let Some(location) = subject.tensor_ref(subject_tensor) else {
                return Vec::new();
            };
            if !wildcard && location.slot != slot {
                return Vec::new();
            }
            match producer {
                Some(known) if known != location.op => return Vec::new(),
                _ => producer = Some(location.op),
            }
        }

        let seeds = match producer {
            Some(id) => {
                let same_type = subject.op_by_id(id).op_type == op.op_type;
                if self.pattern.is_output(pattern_op) && !same_type {
                    Vec::new()
                } else {
                    vec![id]
                }
            }
            None if self.pattern.is_output(pattern_op) => subject.op_ids_by_type(&op.op_type),
            None => Vec::new(),
        };

        seeds
            .into_iter()
            .filter(|&id| !record.is_claimed(id))
            .collect()
    }

    /// Every extension of `record` that binds `pattern_op`
    fn expand<'p, 's>(
        &'p self,
        subject: &'s Graph,
        record: &MatchRecord<'p, 's>,
        pattern_op: OpId,
    ) -> Vec<MatchRecord<'p, 's>> {
        let p_op = self.pattern.op_by_id(pattern_op);
        let mut children = Vec::new();

        for subject_op in self.candidates(subject, record, pattern_op) {
            let s_op = subject.op_by_id(subject_op);

            if is_wildcard(p_op) {
                // the consumer already paired the tensor this wildcard stands for
                children.extend(record.bind(pattern_op, subject_op, std::iter::empty()));
                continue;
            }

            let perms = self.registry.admissible_permutations(p_op, s_op, |perm| {
                record.aligns(&p_op.inputs, &s_op.inputs, perm)
            });

            for perm in perms {
                let inputs = perm.iter().enumerate().filter_map(|(k, &j)| {
                    Some((p_op.inputs.get(j)?.as_str(), s_op.inputs.get(k)?.as_str()))
                });
                let outputs = p_op
                    .outputs
                    .iter()
                    .zip(&s_op.outputs)
                    .map(|(pt, st)| (pt.name.as_str(), st.name.as_str()));

                children.extend(record.bind(pattern_op, subject_op, inputs.chain(outputs)));
            }
        }

        children
    }

    /// Every paired tensor comes from a pair of bound ops
    fn preserves_producers(&self, subject: &Graph, record: &MatchRecord<'_, '_>) -> bool {
        record.tensor_pairs().all(|(pt, st)| {
            match (self.pattern.tensor_ref(pt), subject.tensor_ref(st)) {
                (Some(p), Some(s)) => record.subject_op(p.op) == Some(s.op),
                _ => false,
            }
        })
    }
}

/// Convenience function: match a pattern with the built-in equivalences
pub fn find_matches(pattern: &Graph, subject: &Graph) -> OptResult<Vec<GraphMatch>> {
    let registry = EquivalenceRegistry::with_defaults();
    Ok(GraphMatcher::new(pattern, &registry)?.match_all(subject))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::{DataType, Shape};

    fn placeholder(name: &str) -> OpInfo {
        OpInfo::new(name, "Placeholder").with_output(DataType::Float, Shape::unknown())
    }

    fn unary(name: &str, op_type: &str, input: &str) -> OpInfo {
        OpInfo::new(name, op_type)
            .with_input(input)
            .with_output(DataType::Float, Shape::unknown())
    }

    fn binary(name: &str, op_type: &str, a: &str, b: &str) -> OpInfo {
        OpInfo::new(name, op_type)
            .with_inputs([a, b])
            .with_output(DataType::Float, Shape::unknown())
    }

    fn graph(ops: Vec<OpInfo>, outputs: &[&str]) -> Graph {
        Graph::new(ops, outputs.iter().copied()).unwrap()
    }

    fn add_pattern() -> Graph {
        graph(
            vec![
                placeholder("a"),
                placeholder("b"),
                binary("add", "Add", "a:0", "b:0"),
            ],
            &["add"],
        )
    }

    #[test]
    fn test_commutative_add_matches_twice() {
        let subject = graph(
            vec![
                placeholder("x"),
                placeholder("y"),
                binary("sum", "Add", "x:0", "y:0"),
            ],
            &["sum"],
        );
        let registry = EquivalenceRegistry::with_defaults();
        let matches = GraphMatcher::new(&add_pattern(), &registry)
            .unwrap()
            .match_all(&subject);

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].subject_op("add"), Some("sum"));
        assert_eq!(matches[0].subject_op("a"), Some("x"));
        assert_eq!(matches[0].subject_op("b"), Some("y"));
        assert_eq!(matches[1].subject_op("a"), Some("y"));
        assert_eq!(matches[1].subject_tensor("b:0"), Some("x:0"));
        assert_eq!(matches[1].pattern_op("y"), Some("a"));
        assert_eq!(matches[1].pattern_tensor("sum:0"), Some("add:0"));
    }

    #[test]
    fn test_non_commutative_matches_once() {
        let pattern = graph(
            vec![
                placeholder("a"),
                placeholder("b"),
                binary("sub", "Sub", "a:0", "b:0"),
            ],
            &["sub"],
        );
        let subject = graph(
            vec![
                placeholder("x"),
                placeholder("y"),
                binary("diff", "Sub", "x:0", "y:0"),
            ],
            &["diff"],
        );

        let matches = find_matches(&pattern, &subject).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].subject_op("a"), Some("x"));
    }

    #[test]
    fn test_absent_output_type() {
        let pattern = graph(
            vec![placeholder("x"), unary("conv", "Conv2D", "x:0")],
            &["conv"],
        );
        let subject = add_pattern();

        assert!(find_matches(&pattern, &subject).unwrap().is_empty());
    }

    #[test]
    fn test_chain() {
        // x -> relu -> conv(relu, w)
        let pattern = graph(
            vec![
                placeholder("x"),
                placeholder("w"),
                unary("relu", "Relu", "x:0"),
                binary("conv", "Conv2D", "relu:0", "w:0"),
            ],
            &["conv"],
        );
        let subject = graph(
            vec![
                placeholder("in"),
                OpInfo::new("kernel", "Const").with_output(DataType::Float, Shape::unknown()),
                unary("act", "Relu", "in:0"),
                binary("conv_1", "Conv2D", "act:0", "kernel:0"),
                unary("sig", "Sigmoid", "conv_1:0"),
                binary("conv_2", "Conv2D", "sig:0", "kernel:0"),
            ],
            &["conv_2"],
        );

        let matches = find_matches(&pattern, &subject).unwrap();

        assert_eq!(matches.len(), 1);
        let m = &matches[0];
        assert_eq!(m.subject_op("conv"), Some("conv_1"));
        assert_eq!(m.subject_op("relu"), Some("act"));
        assert_eq!(m.subject_op("x"), Some("in"));
        assert_eq!(m.subject_op("w"), Some("kernel"));
        assert_eq!(m.len(), 4);
    }

    #[test]
    fn test_compatible_quantized_op() {
        let pattern = graph(
            vec![
                placeholder("x"),
                placeholder("y"),
                unary("relu", "Relu", "x:0"),
                binary("add", "Add", "relu:0", "y:0"),
            ],
            &["add"],
        );
        let subject = graph(
            vec![
                placeholder("q"),
                OpInfo::new("min", "Const").with_output(DataType::Float, Shape::scalar()),
                OpInfo::new("max", "Const").with_output(DataType::Float, Shape::scalar()),
                OpInfo::new("qrelu", "QuantizedRelu")
                    .with_inputs(["q:0", "min:0", "max:0"])
                    .with_output(DataType::Quint8, Shape::unknown()),
                placeholder("bias"),
                binary("out", "Add", "qrelu:0", "bias:0"),
            ],
            &["out"],
        );

        let matches = find_matches(&pattern, &subject).unwrap();

        // the commutative branch pairs relu with bias, a Placeholder, and fails
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].subject_op("relu"), Some("qrelu"));
        assert_eq!(matches[0].subject_op("x"), Some("q"));
        assert_eq!(matches[0].subject_op("y"), Some("bias"));
    }

    #[test]
    fn test_distinct_pattern_tensors_need_distinct_subject_tensors() {
        let subject = graph(
            vec![placeholder("x"), binary("sq", "Add", "x:0", "x:0")],
            &["sq"],
        );

        assert!(find_matches(&add_pattern(), &subject).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_matches_removed() {
        let pattern = graph(
            vec![placeholder("a"), binary("dbl", "Add", "a:0", "a:0")],
            &["dbl"],
        );
        let subject = graph(
            vec![placeholder("x"), binary("sq", "Add", "x:0", "x:0")],
            &["sq"],
        );

        assert_eq!(find_matches(&pattern, &subject).unwrap().len(), 1);
    }

    #[test]
    fn test_multiple_outputs() {
        let pattern = graph(
            vec![
                placeholder("x"),
                unary("r1", "Relu", "x:0"),
                unary("r2", "Relu", "x:0"),
            ],
            &["r1", "r2"],
        );
        let subject = graph(
            vec![
                placeholder("in"),
                placeholder("other"),
                unary("a", "Relu", "in:0"),
                unary("b", "Relu", "in:0"),
                unary("c", "Relu", "other:0"),
            ],
            &["a", "b", "c"],
        );

        let matches = find_matches(&pattern, &subject).unwrap();
        let pairs: Vec<_> = matches
            .iter()
            .map(|m| (m.subject_op("r1").unwrap(), m.subject_op("r2").unwrap()))
            .collect();

        assert_eq!(pairs, vec![("a", "b"), ("b", "a")]);
    }

    #[test]
    fn test_output_slots_must_line_up() {
        let pattern = graph(
            vec![
                placeholder("x"),
                OpInfo::new("split", "Split")
                    .with_input("x:0")
                    .with_output(DataType::Float, Shape::unknown())
                    .with_output(DataType::Float, Shape::unknown()),
                binary("sub", "Sub", "split:0", "split:1"),
            ],
            &["sub"],
        );
        let halves = |first: &str, second: &str| {
            graph(
                vec![
                    placeholder("in"),
                    OpInfo::new("s", "Split")
                        .with_input("in:0")
                        .with_output(DataType::Float, Shape::unknown())
                        .with_output(DataType::Float, Shape::unknown()),
                    binary("d", "Sub", first, second),
                ],
                &["d"],
            )
        };

        assert_eq!(
            find_matches(&pattern, &halves("s:0", "s:1")).unwrap().len(),
            1
        );
        assert!(find_matches(&pattern, &halves("s:1", "s:0"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_wildcard_binds_any_producer() {
        let pattern = graph(
            vec![placeholder("x"), unary("relu", "Relu", "x:0")],
            &["relu"],
        );
        let subject = graph(
            vec![
                placeholder("in"),
                binary("conv", "Conv2D", "in:0", "in:0"),
                unary("act", "Relu", "conv:0"),
            ],
            &["act"],
        );

        let matches = find_matches(&pattern, &subject).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].subject_op("x"), Some("conv"));
    }

    #[test]
    fn test_invalid_patterns() {
        let registry = EquivalenceRegistry::with_defaults();

        let no_outputs = graph(vec![placeholder("x")], &[]);
        assert!(matches!(
            GraphMatcher::new(&no_outputs, &registry),
            Err(TransformError::InvalidPattern(_))
        ));

        let stray = graph(
            vec![placeholder("x"), placeholder("y"), unary("r", "Relu", "x:0")],
            &["r"],
        );
        let err = GraphMatcher::new(&stray, &registry).unwrap_err();
        assert!(err.to_string().contains("'y'"));
    }

    #[test]
    fn test_consumption_order() {
        let registry = EquivalenceRegistry::with_defaults();
        let matcher = GraphMatcher::new(&add_pattern(), &registry).unwrap();

        assert_eq!(matcher.consumption_order(), vec!["add", "a", "b"]);
    }
}
