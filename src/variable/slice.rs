use core::ops::{Bound, RangeBounds};

use crate::{storage::Layout, Dim, Result};

/// Selection along one labeled dimension.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Slice {
    dim: Dim,
    kind: Kind,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
enum Kind {
    Index(usize),
    Range { start: Bound<usize>, end: Bound<usize> },
}

impl Slice {
    /// Single position; the dimension is dropped from the result.
    pub fn index(dim: Dim, index: usize) -> Self {
        Self {
            dim,
            kind: Kind::Index(index),
        }
    }

    /// Sub-range; the dimension is kept with reduced extent.
    pub fn range<R>(dim: Dim, range: R) -> Self
    where
        R: RangeBounds<usize>,
    {
        Self {
            dim,
            kind: Kind::Range {
                start: range.start_bound().cloned(),
                end: range.end_bound().cloned(),
            },
        }
    }

    pub fn dim(&self) -> &Dim {
        &self.dim
    }

    pub fn is_range(&self) -> bool {
        matches!(self.kind, Kind::Range { .. })
    }

    fn bounds(start: Bound<usize>, end: Bound<usize>, extent: usize) -> (usize, usize) {
        let begin = match start {
            Bound::Included(x) => x,
            Bound::Excluded(x) => x.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let end = match end {
            Bound::Included(x) => x.saturating_add(1),
            Bound::Excluded(x) => x,
            Bound::Unbounded => extent,
        };
        (begin, end)
    }

    pub(crate) fn apply(&self, layout: &Layout) -> Result<Layout> {
        match self.kind {
            Kind::Index(i) => layout.slice_index(&self.dim, i),
            Kind::Range { start, end } => {
                let extent = layout.dims().extent(&self.dim)?;
                let (begin, end) = Self::bounds(start, end, extent);
                layout.slice_range(&self.dim, begin, end)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Slice;
    use crate::{storage::Layout, Dim, Dimensions, Error, Result};

    #[test]
    fn resolve_bounds() -> Result<()> {
        let layout = Layout::contiguous(Dimensions::new([(Dim::X, 5)])?);

        assert_eq!(Slice::range(Dim::X, 1..3).apply(&layout)?.volume(), 2);
        assert_eq!(Slice::range(Dim::X, 1..=3).apply(&layout)?.volume(), 3);
        assert_eq!(Slice::range(Dim::X, 2..).apply(&layout)?.offset(), 2);
        assert_eq!(Slice::range(Dim::X, ..).apply(&layout)?, layout);
        assert!(Slice::index(Dim::X, 4).apply(&layout)?.dims().is_scalar());
        assert!(matches!(
            Slice::range(Dim::X, 3..7).apply(&layout),
            Err(Error::Range(_))
        ));
        assert!(!Slice::index(Dim::X, 0).is_range());

        Ok(())
    }
}
