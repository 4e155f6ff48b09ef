//! Operator equivalence registry
//!
//! Two tables decide whether a pattern op may stand for a subject op:
//!
//! | Table | Meaning |
//! |-------|---------|
//! | association | op type → operand permutations that leave the op unchanged |
//! | compatibility | op type → other op types it is interchangeable with |
//!
//! The tables are filled through an [`EquivalenceRegistryBuilder`] and frozen
//! by [`EquivalenceRegistryBuilder::build`]; the resulting registry is passed
//! by reference to whoever needs it.
//!
//! A permutation `perm` lines up op `A` with op `B` when `A.inputs[perm[k]]`
//! corresponds to `B.inputs[k]` for every position `k`.

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::error::{OptResult, TransformError};
use crate::graph::OpInfo;

/// Operand permutation
pub type Permutation = SmallVec<[usize; 4]>;

/// Identity permutation of the given arity
pub fn identity(arity: usize) -> Permutation {
    (0..arity).collect()
}

/// Result of comparing two ops
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Equivalence {
    /// Whether the ops are interchangeable
    pub is_equal: bool,
    /// Accepted operand permutation; `None` when `is_equal` is false
    pub input_permutation: Option<Permutation>,
}

impl Equivalence {
    fn accepted(perm: Permutation) -> Self {
        Self {
            is_equal: true,
            input_permutation: Some(perm),
        }
    }

    fn rejected() -> Self {
        Self {
            is_equal: false,
            input_permutation: None,
        }
    }
}

fn check_permutation(op_type: &str, perm: &[usize], arity: usize) -> OptResult<()> {
    let mut seen = vec![false; arity];
    let valid = perm.len() == arity
        && perm.iter().all(|&i| {
            if i >= arity || seen[i] {
                false
            } else {
                seen[i] = true;
                true
            }
        });

    if valid {
        Ok(())
    } else {
        Err(TransformError::InvalidPermutation {
            op_type: op_type.to_string(),
            perm: perm.to_vec(),
        })
    }
}

/// Registration phase of an [`EquivalenceRegistry`]
#[derive(Debug, Clone, Default)]
pub struct EquivalenceRegistryBuilder {
    associations: FxHashMap<String, Vec<Permutation>>,
    compatibility: FxHashMap<String, FxHashSet<String>>,
}

impl EquivalenceRegistryBuilder {
    /// Empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pre-filled with the built-in tables
    ///
    /// `Add` and `Mul` are commutative; every plain op that has a quantized
    /// variant is compatible with it.
    pub fn with_defaults() -> Self {
        let mut builder = Self::new();
        for op_type in ["Add", "Mul"] {
            builder.associations.insert(
                op_type.to_string(),
                vec![Permutation::from_slice(&[0, 1]), Permutation::from_slice(&[1, 0])],
            );
        }
        for (plain, quantized) in [
            ("Conv2D", "QuantizedConv2D"),
            ("MatMul", "QuantizedMatMul"),
            ("Add", "QuantizedAdd"),
            ("Relu", "QuantizedRelu"),
            ("MaxPool", "QuantizedMaxPool"),
            ("Reshape", "QuantizedReshape"),
        ] {
            builder.link(plain, quantized);
        }
        builder
    }

    /// Register the operand permutations of an op type
    ///
    /// Every permutation must permute the same number of operands. An op type
    /// can only be registered once; repeated permutations collapse.
    pub fn register_association<I, P>(&mut self, op_type: &str, permutations: I) -> OptResult<()>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[usize]>,
    {
        if self.associations.contains_key(op_type) {
            return Err(TransformError::DuplicateAssociation(op_type.to_string()));
        }

        let mut perms: Vec<Permutation> = Vec::new();
        for perm in permutations {
            let perm = perm.as_ref();
            let arity = perms.first().map_or(perm.len(), |first| first.len());
            check_permutation(op_type, perm, arity)?;
            if !perms.iter().any(|p| p.as_slice() == perm) {
                perms.push(Permutation::from_slice(perm));
            }
        }

        if perms.is_empty() {
            return Err(TransformError::InvalidPermutation {
                op_type: op_type.to_string(),
                perm: Vec::new(),
            });
        }

        self.associations.insert(op_type.to_string(), perms);
        Ok(())
    }

    /// Declare two op types interchangeable (in both directions)
    pub fn register_compatibility(&mut self, a: &str, b: &str) -> OptResult<()> {
        let known = self
            .compatibility
            .get(a)
            .map_or(false, |others| others.contains(b));
        if a == b || known {
            return Err(TransformError::DuplicateCompatibility(
                a.to_string(),
                b.to_string(),
            ));
        }
        self.link(a, b);
        Ok(())
    }

    fn link(&mut self, a: &str, b: &str) {
        self.compatibility
            .entry(a.to_string())
            .or_default()
            .insert(b.to_string());
        self.compatibility
            .entry(b.to_string())
            .or_default()
            .insert(a.to_string());
    }

    /// Freeze the tables
    pub fn build(self) -> EquivalenceRegistry {
        EquivalenceRegistry {
            associations: self.associations,
            compatibility: self.compatibility,
        }
    }
}

/// Frozen operator equivalence tables
#[derive(Debug, Clone, Default)]
pub struct EquivalenceRegistry {
    associations: FxHashMap<String, Vec<Permutation>>,
    compatibility: FxHashMap<String, FxHashSet<String>>,
}

impl EquivalenceRegistry {
    /// Start a registration phase
    pub fn builder() -> EquivalenceRegistryBuilder {
        EquivalenceRegistryBuilder::new()
    }

    /// Registry holding only the built-in tables
    pub fn with_defaults() -> Self {
        EquivalenceRegistryBuilder::with_defaults().build()
    }

    /// Permutations allowed for an op type with `arity` operands
    ///
    /// Unregistered op types allow only the identity.
    pub fn permutations(&self, op_type: &str, arity: usize) -> Vec<Permutation> {
        match self.associations.get(op_type) {
            Some(perms) => perms
                .iter()
                .filter(|perm| perm.len() == arity)
                .cloned()
                .collect(),
            None => vec![identity(arity)],
        }
    }

    /// Whether two distinct op types were registered as interchangeable
    pub fn is_compatible(&self, a: &str, b: &str) -> bool {
        self.compatibility
            .get(a)
            .map_or(false, |others| others.contains(b))
    }

    /// Compare two ops
    pub fn query_equivalence(&self, this: &OpInfo, other: &OpInfo) -> Equivalence {
        self.query_equivalence_with(this, other, |_| true)
    }

    /// Compare two ops, accepting only permutations `align` agrees with
    ///
    /// Same-type ops are equal when one of the registered permutations (in
    /// registration order) has the right arity and passes `align`.
    /// Compatible types are equal under the identity over the shorter operand
    /// list, which is also subject to `align`.
    pub fn query_equivalence_with<F>(&self, this: &OpInfo, other: &OpInfo, align: F) -> Equivalence
    where
        F: FnMut(&[usize]) -> bool,
    {
        match self.admissible_permutations(this, other, align).into_iter().next() {
            Some(perm) => Equivalence::accepted(perm),
            None => Equivalence::rejected(),
        }
    }

    /// Every permutation under which `this` may stand for `other`
    pub fn admissible_permutations<F>(
        &self,
        this: &OpInfo,
        other: &OpInfo,
        mut align: F,
    ) -> Vec<Permutation>
    where
        F: FnMut(&[usize]) -> bool,
    {
        if this.op_type == other.op_type {
            if this.n_inputs() != other.n_inputs() {
                return Vec::new();
            }
            return self
                .permutations(&this.op_type, this.n_inputs())
                .into_iter()
                .filter(|perm| align(perm.as_slice()))
                .collect();
        }

        if self.is_compatible(&this.op_type, &other.op_type) {
            let perm = identity(this.n_inputs().min(other.n_inputs()));
            if align(perm.as_slice()) {
                return vec![perm];
            }
        }

        Vec::new()
    }
}
