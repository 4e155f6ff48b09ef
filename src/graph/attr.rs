//! Operator attributes and pass metadata
//!
//! Operator parameters live on each [`OpInfo`](super::OpInfo) as a typed
//! [`AttrMap`]. Pass-private results are kept apart in a [`Metadata`]
//! side-table keyed by (operation, namespace, kind) so that two passes can
//! never overwrite each other's keys.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::ValidationError;
use crate::tensor::{DataType, Shape};

use super::maps::OpId;

/// Separator between namespace and kind in rendered metadata keys
pub const NAMESPACE_SEPARATOR: &str = "__";

/// Typed operator parameter
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Boolean flag
    Bool(bool),
    /// Integer scalar
    Int(i64),
    /// Float scalar
    Float(f32),
    /// String scalar
    Str(String),
    /// Integer list (strides, paddings, permutations, ...)
    Ints(Vec<i64>),
    /// Float list
    Floats(Vec<f32>),
    /// String list
    Strs(Vec<String>),
    /// Element datatype (`T`, `dtype`, `out_type`, ...)
    DType(DataType),
    /// Shape parameter
    Shape(Shape),
}

impl AttrValue {
    /// Integer value, if this is an `Int`
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Float value, if this is a `Float`
    pub fn as_float(&self) -> Option<f32> {
        match self {
            AttrValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// String value, if this is a `Str`
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Integer list, if this is `Ints`
    pub fn as_ints(&self) -> Option<&[i64]> {
        match self {
            AttrValue::Ints(v) => Some(v),
            _ => None,
        }
    }
}

/// Operator parameters, in insertion order
pub type AttrMap = IndexMap<String, AttrValue>;

/// Validated metadata namespace owned by one pass
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace(String);

impl Namespace {
    /// Create a namespace
    ///
    /// Must be non-empty ASCII alphanumerics or `_`, and must not contain the
    /// `__` separator.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        let well_formed = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !name.contains(NAMESPACE_SEPARATOR);
        if well_formed {
            Ok(Self(name))
        } else {
            Err(ValidationError::InvalidNamespace(name))
        }
    }

    /// Namespace of a built-in pass
    pub(crate) fn builtin(name: &'static str) -> Self {
        debug_assert!(Self::new(name).is_ok(), "malformed namespace {}", name);
        Self(name.to_string())
    }

    /// The namespace string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Render a full attribute key (`<namespace>__<kind>`)
    pub fn key(&self, kind: &str) -> String {
        format!("{}{}{}", self.0, NAMESPACE_SEPARATOR, kind)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Typed value stored by a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaValue {
    /// Boolean flag
    Flag(bool),
    /// Single count
    Count(usize),
    /// Counts aligned with something (e.g. output index)
    Counts(Vec<usize>),
    /// Integer
    Int(i64),
    /// Free text
    Text(String),
}

impl MetaValue {
    /// Flag value, if this is a `Flag`
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            MetaValue::Flag(v) => Some(*v),
            _ => None,
        }
    }

    /// Counts, if this is `Counts`
    pub fn as_counts(&self) -> Option<&[usize]> {
        match self {
            MetaValue::Counts(v) => Some(v),
            _ => None,
        }
    }
}

/// Metadata of a single operation: (namespace, kind) → value
pub type OpMetadata = BTreeMap<(Namespace, String), MetaValue>;

/// Side-table of pass metadata
///
/// Cloning is cheap: the table is shared until one of the clones writes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    entries: Arc<BTreeMap<OpId, OpMetadata>>,
}

impl Metadata {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a single value
    pub fn get(&self, op: OpId, namespace: &Namespace, kind: &str) -> Option<&MetaValue> {
        self.entries
            .get(&op)?
            .get(&(namespace.clone(), kind.to_string()))
    }

    /// All metadata of an operation
    pub fn for_op(&self, op: OpId) -> Option<&OpMetadata> {
        self.entries.get(&op)
    }

    /// Insert or overwrite a value, returning the previous one
    pub fn insert(
        &mut self,
        op: OpId,
        namespace: Namespace,
        kind: impl Into<String>,
        value: MetaValue,
    ) -> Option<MetaValue> {
        Arc::make_mut(&mut self.entries)
            .entry(op)
            .or_default()
            .insert((namespace, kind.into()), value)
    }

    /// Remove every value of an operation
    pub fn remove_op(&mut self, op: OpId) -> Option<OpMetadata> {
        if !self.entries.contains_key(&op) {
            return None;
        }
        Arc::make_mut(&mut self.entries).remove(&op)
    }

    /// Iterate over (op, namespace, kind, value)
    pub fn iter(&self) -> impl Iterator<Item = (OpId, &Namespace, &str, &MetaValue)> {
        self.entries.iter().flat_map(|(op, values)| {
            values
                .iter()
                .map(move |((ns, kind), value)| (*op, ns, kind.as_str(), value))
        })
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.entries.values().map(|m| m.len()).sum()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rebuild the table under a new op numbering; entries mapped to `None` are dropped
    pub(crate) fn remap<F>(&self, mut map: F) -> Self
    where
        F: FnMut(OpId) -> Option<OpId>,
    {
        let entries = self
            .entries
            .iter()
            .filter_map(|(op, values)| map(*op).map(|new_id| (new_id, values.clone())))
            .collect();
        Self {
            entries: Arc::new(entries),
        }
    }

    pub(crate) fn shares_storage_with(&self, other: &Metadata) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }
}

/// Read-only view of one namespace of one operation
///
/// Lets a consumer ask for `kind` without spelling out the namespace on every
/// lookup.
#[derive(Debug, Clone, Copy)]
pub struct Namespaced<'a> {
    entries: Option<&'a OpMetadata>,
    namespace: &'a Namespace,
}

impl<'a> Namespaced<'a> {
    pub(crate) fn new(entries: Option<&'a OpMetadata>, namespace: &'a Namespace) -> Self {
        Self { entries, namespace }
    }

    /// Value stored under `kind`
    pub fn get(&self, kind: &str) -> Option<&'a MetaValue> {
        self.entries?
            .get(&(self.namespace.clone(), kind.to_string()))
    }

    /// Value stored under `kind`, or `default`
    pub fn get_or(&self, kind: &str, default: &'a MetaValue) -> &'a MetaValue {
        self.get(kind).unwrap_or(default)
    }

    /// Flag stored under `kind`
    pub fn flag(&self, kind: &str) -> Option<bool> {
        self.get(kind).and_then(MetaValue::as_flag)
    }

    /// Counts stored under `kind`
    pub fn counts(&self, kind: &str) -> Option<&'a [usize]> {
        self.get(kind).and_then(MetaValue::as_counts)
    }

    /// Kinds present in this namespace
    pub fn kinds(&self) -> Vec<&'a str> {
        self.entries
            .map(|m| {
                m.keys()
                    .filter(|(ns, _)| ns == self.namespace)
                    .map(|(_, kind)| kind.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_validation() {
        assert!(Namespace::new("refcnt").is_ok());
        assert!(Namespace::new("_private_1").is_ok());
        assert!(Namespace::new("").is_err());
        assert!(Namespace::new("a__b").is_err());
        assert!(Namespace::new("with space").is_err());
    }

    #[test]
    fn test_namespace_key() {
        let ns = Namespace::new("refcnt").unwrap();
        assert_eq!(ns.key("ref_counts"), "refcnt__ref_counts");
    }

    #[test]
    fn test_metadata_namespaces_do_not_collide() {
        let a = Namespace::new("a").unwrap();
        let b = Namespace::new("b").unwrap();
        let op = OpId::new(0);

        let mut meta = Metadata::new();
        meta.insert(op, a.clone(), "flag", MetaValue::Flag(true));
        meta.insert(op, b.clone(), "flag", MetaValue::Flag(false));

        assert_eq!(meta.get(op, &a, "flag"), Some(&MetaValue::Flag(true)));
        assert_eq!(meta.get(op, &b, "flag"), Some(&MetaValue::Flag(false)));
        assert_eq!(meta.len(), 2);
    }

    #[test]
    fn test_metadata_copy_on_write() {
        let ns = Namespace::new("ns").unwrap();
        let mut original = Metadata::new();
        original.insert(OpId::new(0), ns.clone(), "k", MetaValue::Int(1));

        let mut copy = original.clone();
        assert!(copy.shares_storage_with(&original));

        copy.insert(OpId::new(0), ns.clone(), "k", MetaValue::Int(2));
        assert!(!copy.shares_storage_with(&original));
        assert_eq!(
            original.get(OpId::new(0), &ns, "k"),
            Some(&MetaValue::Int(1))
        );
    }

    #[test]
    fn test_remap_drops_unmapped() {
        let ns = Namespace::new("ns").unwrap();
        let mut meta = Metadata::new();
        meta.insert(OpId::new(0), ns.clone(), "k", MetaValue::Int(0));
        meta.insert(OpId::new(2), ns.clone(), "k", MetaValue::Int(2));

        let remapped = meta.remap(|op| (op.index() == 2).then(|| OpId::new(0)));
        assert_eq!(remapped.len(), 1);
        assert_eq!(
            remapped.get(OpId::new(0), &ns, "k"),
            Some(&MetaValue::Int(2))
        );
    }

    #[test]
    fn test_namespaced_view() {
        let ns = Namespace::new("refcnt").unwrap();
        let other = Namespace::new("other").unwrap();
        let mut meta = Metadata::new();
        meta.insert(OpId::new(0), ns.clone(), "to_eval", MetaValue::Flag(true));
        meta.insert(OpId::new(0), other, "x", MetaValue::Int(1));

        let view = Namespaced::new(meta.for_op(OpId::new(0)), &ns);
        assert_eq!(view.flag("to_eval"), Some(true));
        assert_eq!(view.kinds(), vec!["to_eval"]);
        assert!(view.get("x").is_none());

        let fallback = MetaValue::Counts(vec![0]);
        assert_eq!(view.get_or("ref_counts", &fallback), &fallback);
    }
}
