//! Shape descriptors
//!
//! Frozen graphs frequently carry partially known shapes: the rank may be
//! unknown altogether, or individual dimensions (typically the batch) may be
//! dynamic.

use std::fmt;

use smallvec::SmallVec;

/// A single dimension of a shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dim {
    /// Statically known extent
    Fixed(usize),
    /// Extent only known at run time
    Dynamic,
}

impl Dim {
    /// The extent, if statically known
    pub fn value(self) -> Option<usize> {
        match self {
            Dim::Fixed(v) => Some(v),
            Dim::Dynamic => None,
        }
    }

    /// Encode for the snapshot format (`-1` for dynamic)
    pub fn to_i64(self) -> i64 {
        match self {
            Dim::Fixed(v) => v as i64,
            Dim::Dynamic => -1,
        }
    }

    /// Decode from the snapshot format (negative means dynamic)
    pub fn from_i64(v: i64) -> Self {
        if v < 0 {
            Dim::Dynamic
        } else {
            Dim::Fixed(v as usize)
        }
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dim::Fixed(v) => write!(f, "{}", v),
            Dim::Dynamic => write!(f, "?"),
        }
    }
}

/// Shape of a tensor; `dims == None` means the rank is unknown
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Shape {
    dims: Option<SmallVec<[Dim; 4]>>,
}

impl Shape {
    /// Shape with unknown rank
    pub fn unknown() -> Self {
        Self { dims: None }
    }

    /// Rank-0 shape
    pub fn scalar() -> Self {
        Self {
            dims: Some(SmallVec::new()),
        }
    }

    /// Fully static shape
    pub fn fixed(dims: &[usize]) -> Self {
        Self {
            dims: Some(dims.iter().map(|&d| Dim::Fixed(d)).collect()),
        }
    }

    /// Shape from explicit dimensions
    pub fn from_dims(dims: impl IntoIterator<Item = Dim>) -> Self {
        Self {
            dims: Some(dims.into_iter().collect()),
        }
    }

    /// Dimensions, if the rank is known
    pub fn dims(&self) -> Option<&[Dim]> {
        self.dims.as_deref()
    }

    /// Rank, if known
    pub fn rank(&self) -> Option<usize> {
        self.dims.as_ref().map(|d| d.len())
    }

    /// Whether the rank is known
    pub fn is_known(&self) -> bool {
        self.dims.is_some()
    }

    /// Whether any dimension (or the rank) is unknown
    pub fn is_dynamic(&self) -> bool {
        match &self.dims {
            None => true,
            Some(dims) => dims.iter().any(|d| matches!(d, Dim::Dynamic)),
        }
    }

    /// Total number of elements, if the shape is fully static
    pub fn numel(&self) -> Option<usize> {
        let dims = self.dims.as_ref()?;
        dims.iter().map(|d| d.value()).product()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.dims {
            None => write!(f, "<unknown>"),
            Some(dims) => {
                write!(f, "[")?;
                for (i, d) in dims.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", d)?;
                }
                write!(f, "]")
            }
        }
    }
}
