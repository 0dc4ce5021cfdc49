mod ops;
pub use ops::merge;
pub(crate) use ops::merge_all;

use std::{borrow::Cow, fmt};

use crate::{Error, Result};

/// Label of an array axis.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Dim(Cow<'static, str>);

impl Dim {
    pub const X: Dim = Dim(Cow::Borrowed("x"));
    pub const Y: Dim = Dim(Cow::Borrowed("y"));
    pub const Z: Dim = Dim(Cow::Borrowed("z"));
    pub const EVENT: Dim = Dim(Cow::Borrowed("event"));
    pub const SPECTRUM: Dim = Dim(Cow::Borrowed("spectrum"));
    pub const TOF: Dim = Dim(Cow::Borrowed("tof"));
    pub(crate) const INTERNAL0: Dim = Dim(Cow::Borrowed("::internal0"));

    pub fn new(label: impl Into<String>) -> Self {
        Self(Cow::Owned(label.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for Dim {
    fn from(label: &'static str) -> Self {
        Self(Cow::Borrowed(label))
    }
}

impl From<String> for Dim {
    fn from(label: String) -> Self {
        Self(Cow::Owned(label))
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered mapping from dimension label to extent, outermost first.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Dimensions {
    labels: Vec<Dim>,
    shape: Vec<usize>,
}

impl Dimensions {
    pub fn new<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Dim, usize)>,
    {
        let mut dims = Self::default();
        for (label, extent) in pairs {
            dims.add(label, extent)?;
        }
        Ok(dims)
    }

    pub fn scalar() -> Self {
        Self::default()
    }

    /// Appends `label` as the new innermost dimension.
    pub fn add(&mut self, label: Dim, extent: usize) -> Result<()> {
        if self.contains(&label) {
            return Err(Error::Dimension(format!(
                "duplicate dimension {} in {}",
                label, self
            )));
        }
        self.labels.push(label);
        self.shape.push(extent);
        Ok(())
    }

    pub fn contains(&self, label: &Dim) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// True if every label of `other` is present here with the same extent.
    pub fn includes(&self, other: &Dimensions) -> bool {
        other
            .iter()
            .all(|(label, extent)| self.position(label).map(|i| self.shape[i]) == Some(extent))
    }

    pub fn position(&self, label: &Dim) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    pub fn index(&self, label: &Dim) -> Result<usize> {
        self.position(label)
            .ok_or_else(|| Error::NotFound(format!("dimension {} not in {}", label, self)))
    }

    pub fn extent(&self, label: &Dim) -> Result<usize> {
        Ok(self.shape[self.index(label)?])
    }

    pub fn labels(&self) -> &[Dim] {
        &self.labels
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.labels.len()
    }

    pub fn is_scalar(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn volume(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn inner(&self) -> Option<&Dim> {
        self.labels.last()
    }

    pub fn outer(&self) -> Option<&Dim> {
        self.labels.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Dim, usize)> + '_ {
        self.labels.iter().zip(self.shape.iter().copied())
    }

    /// Shape restricted to `[begin, end)` along `label`.
    pub fn slice(&self, label: &Dim, begin: usize, end: usize) -> Result<Self> {
        let i = self.index(label)?;
        check_range(label, begin, end, self.shape[i])?;
        let mut out = self.clone();
        out.shape[i] = end - begin;
        Ok(out)
    }

    pub fn erase(&mut self, label: &Dim) -> Result<()> {
        let i = self.index(label)?;
        self.labels.remove(i);
        self.shape.remove(i);
        Ok(())
    }

    pub fn resize(&mut self, label: &Dim, extent: usize) -> Result<()> {
        let i = self.index(label)?;
        self.shape[i] = extent;
        Ok(())
    }

    pub fn rename(&mut self, from: &Dim, to: Dim) -> Result<()> {
        let i = self.index(from)?;
        if *from != to && self.contains(&to) {
            return Err(Error::Dimension(format!(
                "cannot rename {} to {}: {} already in {}",
                from, to, to, self
            )));
        }
        self.labels[i] = to;
        Ok(())
    }

    /// Same labels in the given order.
    pub fn transpose(&self, order: &[Dim]) -> Result<Self> {
        if order.len() != self.ndim() || !order.iter().all(|l| self.contains(l)) {
            return Err(Error::Dimension(format!(
                "cannot transpose {} to order {:?}",
                self, order
            )));
        }
        Self::new(order.iter().map(|l| (l.clone(), self.shape[self.position(l).unwrap_or(0)])))
    }

    /// True if both hold the same labels with the same extents, in any order.
    pub fn is_permutation_of(&self, other: &Dimensions) -> bool {
        self.ndim() == other.ndim() && self.includes(other)
    }
}

pub(crate) fn check_range(label: &Dim, begin: usize, end: usize, extent: usize) -> Result<()> {
    if begin > end || end > extent {
        return Err(Error::Range(format!(
            "slice [{}, {}) invalid for dimension {} with extent {}",
            begin, end, label, extent
        )));
    }
    Ok(())
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (label, extent)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", label, extent)?;
        }
        f.write_str("}")
    }
}
