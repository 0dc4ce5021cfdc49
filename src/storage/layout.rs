use crate::{dimension::check_range, Dim, Dimensions, Error, Result};

/// Strided view of a flat buffer: dimensions, per-dimension strides and the
/// offset of the first element.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Layout {
    dims: Dimensions,
    strides: Vec<isize>,
    offset: usize,
}

pub(crate) fn default_strides(shape: &[usize]) -> Vec<isize> {
    let mut strides = vec![0_isize; shape.len()];
    strides
        .iter_mut()
        .zip(shape.iter())
        .rfold(1_isize, |acc, (stride, &dim)| {
            *stride = acc;
            acc * (dim as isize).max(1)
        });
    strides
}

pub(crate) fn shift_offset(offset: usize, index: usize, stride: isize) -> Result<usize> {
    let shifted = isize::try_from(offset)? + isize::try_from(index)? * stride;
    Ok(usize::try_from(shifted)?)
}

impl Layout {
    pub fn contiguous(dims: Dimensions) -> Self {
        let strides = default_strides(dims.shape());
        Self {
            dims,
            strides,
            offset: 0,
        }
    }

    pub fn dims(&self) -> &Dimensions {
        &self.dims
    }

    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn volume(&self) -> usize {
        self.dims.volume()
    }

    pub fn stride(&self, label: &Dim) -> Result<isize> {
        Ok(self.strides[self.dims.index(label)?])
    }

    /// Number of buffer elements spanned, from the offset to one past the
    /// last addressed element.
    pub fn span(&self) -> usize {
        if self.volume() == 0 {
            return 0;
        }
        let last = self
            .dims
            .shape()
            .iter()
            .zip(&self.strides)
            .fold(0_isize, |acc, (&dim, &stride)| {
                acc + (dim as isize - 1) * stride
            });
        last.max(0) as usize + 1
    }

    pub fn slice_range(&self, label: &Dim, begin: usize, end: usize) -> Result<Self> {
        let i = self.dims.index(label)?;
        check_range(label, begin, end, self.dims.shape()[i])?;
        let mut out = self.clone();
        out.dims.resize(label, end - begin)?;
        if begin < end {
            out.offset = shift_offset(self.offset, begin, self.strides[i])?;
        }
        Ok(out)
    }

    /// Drops `label`, keeping the element at `index` along it.
    pub fn slice_index(&self, label: &Dim, index: usize) -> Result<Self> {
        let i = self.dims.index(label)?;
        let extent = self.dims.shape()[i];
        if index >= extent {
            return Err(Error::Range(format!(
                "index {} out of range for dimension {} with extent {}",
                index, label, extent
            )));
        }
        let mut out = self.clone();
        out.offset = shift_offset(self.offset, index, self.strides[i])?;
        out.dims.erase(label)?;
        out.strides.remove(i);
        Ok(out)
    }

    /// Strides for walking this layout over `target`. Labels missing here or
    /// with extent 1 get stride 0. Labels present here must appear in
    /// `target` unless their extent is 1.
    pub fn aligned_strides(&self, target: &Dimensions) -> Result<Vec<isize>> {
        for (label, extent) in self.dims.iter() {
            if extent != 1 && !target.contains(label) {
                return Err(Error::Dimension(format!(
                    "cannot align {} to {}: missing {}",
                    self.dims, target, label
                )));
            }
        }
        target
            .iter()
            .map(|(label, extent)| match self.dims.position(label) {
                None => Ok(0),
                Some(i) => {
                    let own = self.dims.shape()[i];
                    if own == extent {
                        Ok(if extent == 1 { 0 } else { self.strides[i] })
                    } else if own == 1 {
                        Ok(0)
                    } else {
                        Err(Error::Dimension(format!(
                            "cannot align {} to {}: extents of {} differ",
                            self.dims, target, label
                        )))
                    }
                }
            })
            .collect()
    }

    /// Layout presenting this data with `target` dimensions. Broadcast
    /// dimensions get stride 0, so the result aliases elements.
    pub fn broadcast(&self, target: &Dimensions) -> Result<Self> {
        Ok(Self {
            strides: self.aligned_strides(target)?,
            dims: target.clone(),
            offset: self.offset,
        })
    }

    pub fn transpose(&self, order: &[Dim]) -> Result<Self> {
        let dims = self.dims.transpose(order)?;
        let strides = order
            .iter()
            .map(|label| self.stride(label))
            .collect::<Result<_>>()?;
        Ok(Self {
            dims,
            strides,
            offset: self.offset,
        })
    }

    pub fn rename(&mut self, from: &Dim, to: Dim) -> Result<()> {
        self.dims.rename(from, to)
    }

    /// Same elements with new dimensions, only for contiguous layouts.
    pub fn reshape(&self, dims: Dimensions) -> Result<Self> {
        if dims.volume() != self.volume() {
            return Err(Error::Dimension(format!(
                "cannot reshape {} to {}: volumes differ",
                self.dims, dims
            )));
        }
        if !self.is_contiguous() {
            return Err(Error::Dimension(format!(
                "cannot reshape non-contiguous layout {}",
                self.dims
            )));
        }
        let mut out = Self::contiguous(dims);
        out.offset = self.offset;
        Ok(out)
    }

    /// True if the elements occupy a dense row-major block.
    pub fn is_contiguous(&self) -> bool {
        let mut stride_expected = 1_usize;
        for (&dim, &stride) in self
            .dims
            .shape()
            .iter()
            .rev()
            .zip(self.strides.iter().rev())
        {
            if dim == 1 {
                continue;
            }
            if stride != stride_expected as isize {
                return false;
            }
            stride_expected *= dim;
        }
        true
    }

    /// True if no two indices address the same element.
    pub fn is_injective(&self) -> bool {
        self.dims
            .shape()
            .iter()
            .zip(&self.strides)
            .all(|(&dim, &stride)| dim <= 1 || stride != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::{default_strides, Layout};
    use crate::{Dim, Dimensions, Error, Result};

    fn xy(x: usize, y: usize) -> Result<Dimensions> {
        Dimensions::new([(Dim::X, x), (Dim::Y, y)])
    }

    #[test]
    fn row_major_strides() {
        assert_eq!(default_strides(&[2, 3, 4]), vec![12, 4, 1]);
        assert_eq!(default_strides(&[2, 0, 4]), vec![4, 4, 1]);
        assert!(default_strides(&[]).is_empty());
    }

    #[test]
    fn slice_layout() -> Result<()> {
        let layout = Layout::contiguous(xy(4, 3)?);

        let range = layout.slice_range(&Dim::X, 1, 3)?;
        assert_eq!(range.dims().shape(), &[2, 3]);
        assert_eq!(range.offset(), 3);
        assert!(range.is_contiguous());

        let column = layout.slice_index(&Dim::Y, 2)?;
        assert_eq!(column.dims().labels(), &[Dim::X]);
        assert_eq!(column.strides(), &[3]);
        assert_eq!(column.offset(), 2);
        assert!(!column.is_contiguous());

        assert!(matches!(
            layout.slice_index(&Dim::Y, 3),
            Err(Error::Range(_))
        ));
        assert!(matches!(
            layout.slice_range(&Dim::Z, 0, 1),
            Err(Error::NotFound(_))
        ));

        Ok(())
    }

    #[test]
    fn broadcast_and_align() -> Result<()> {
        let layout = Layout::contiguous(Dimensions::new([(Dim::Y, 3)])?);

        let b = layout.broadcast(&xy(2, 3)?)?;
        assert_eq!(b.strides(), &[0, 1]);
        assert!(!b.is_injective());

        let wide = Layout::contiguous(xy(2, 3)?);
        assert!(matches!(
            wide.aligned_strides(&Dimensions::new([(Dim::Y, 3)])?),
            Err(Error::Dimension(_))
        ));
        assert!(matches!(
            layout.aligned_strides(&Dimensions::new([(Dim::Y, 4)])?),
            Err(Error::Dimension(_))
        ));

        Ok(())
    }

    #[test]
    fn transpose_and_reshape() -> Result<()> {
        let layout = Layout::contiguous(xy(2, 3)?);

        let t = layout.transpose(&[Dim::Y, Dim::X])?;
        assert_eq!(t.strides(), &[1, 3]);
        assert!(!t.is_contiguous());
        assert!(t.reshape(Dimensions::new([(Dim::Z, 6)])?).is_err());

        let r = layout.reshape(Dimensions::new([(Dim::Z, 6)])?)?;
        assert_eq!(r.strides(), &[1]);
        assert_eq!(r.span(), 6);

        Ok(())
    }
}
