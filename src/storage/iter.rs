use core::{iter::FusedIterator, marker::PhantomData, ptr::NonNull};

use super::Layout;

/// Row-major walk over a shape yielding the flat offsets of `N` operands
/// with independent strides.
#[derive(Clone, Debug)]
pub(crate) struct MultiIndex<const N: usize> {
    shape: Vec<usize>,
    strides: [Vec<isize>; N],
    indices: Vec<usize>,
    offsets: [isize; N],
    len: usize,
}

impl<const N: usize> MultiIndex<N> {
    pub(crate) fn new(shape: &[usize], strides: [Vec<isize>; N], offsets: [usize; N]) -> Self {
        debug_assert!(strides.iter().all(|s| s.len() == shape.len()));
        Self {
            shape: shape.to_vec(),
            strides,
            indices: vec![0; shape.len()],
            offsets: offsets.map(|o| o as isize),
            len: shape.iter().product(),
        }
    }

    #[inline]
    fn increment_indices(&mut self) {
        for d in (0..self.shape.len()).rev() {
            self.indices[d] += 1;
            if self.indices[d] < self.shape[d] {
                for (offset, strides) in self.offsets.iter_mut().zip(&self.strides) {
                    *offset += strides[d];
                }
                return;
            }
            self.indices[d] = 0;
            let wrap = self.shape[d] as isize - 1;
            for (offset, strides) in self.offsets.iter_mut().zip(&self.strides) {
                *offset -= strides[d] * wrap;
            }
        }
    }
}

impl<const N: usize> Iterator for MultiIndex<N> {
    type Item = [usize; N];

    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }
        let current = self.offsets.map(|o| o as usize);
        self.len -= 1;
        if self.len > 0 {
            self.increment_indices();
        }
        Some(current)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<const N: usize> ExactSizeIterator for MultiIndex<N> {}

impl<const N: usize> FusedIterator for MultiIndex<N> {}

/// Elements of a strided view in row-major order.
pub struct Iter<'a, T> {
    data: &'a [T],
    index: MultiIndex<1>,
}

impl<'a, T> Iter<'a, T> {
    pub(crate) fn new(data: &'a [T], layout: &Layout) -> Self {
        Self {
            data,
            index: MultiIndex::new(
                layout.dims().shape(),
                [layout.strides().to_vec()],
                [layout.offset()],
            ),
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let data = self.data;
        self.index.next().map(|[offset]| &data[offset])
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.index.size_hint()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

/// Mutable elements of an injective strided view in row-major order.
pub struct IterMut<'a, T> {
    ptr: NonNull<T>,
    len: usize,
    index: MultiIndex<1>,
    phantom: PhantomData<&'a mut T>,
}

impl<'a, T> IterMut<'a, T> {
    pub(crate) fn new(data: &'a mut [T], layout: &Layout) -> Self {
        debug_assert!(layout.is_injective());
        debug_assert!(layout.volume() == 0 || layout.offset() + layout.span() <= data.len());
        let len = data.len();
        Self {
            ptr: NonNull::from(data).cast(),
            len,
            index: MultiIndex::new(
                layout.dims().shape(),
                [layout.strides().to_vec()],
                [layout.offset()],
            ),
            phantom: PhantomData,
        }
    }
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<Self::Item> {
        let [offset] = self.index.next()?;
        debug_assert!(offset < self.len);
        // SAFETY: the layout is injective and lies within the borrowed slice,
        // so every offset is in bounds and yielded at most once.
        unsafe { Some(&mut *self.ptr.as_ptr().add(offset)) }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.index.size_hint()
    }
}

impl<T> ExactSizeIterator for IterMut<'_, T> {}

impl<T> FusedIterator for IterMut<'_, T> {}

// SAFETY: `IterMut` behaves like `&mut [T]`.
unsafe impl<T: Send> Send for IterMut<'_, T> {}
unsafe impl<T: Sync> Sync for IterMut<'_, T> {}

#[cfg(test)]
mod tests {
    use super::{Iter, IterMut, MultiIndex};
    use crate::{storage::Layout, Dim, Dimensions, Result};

    #[test]
    fn walk_two_operands() {
        let offsets: Vec<_> = MultiIndex::new(&[2, 3], [vec![3, 1], vec![0, 1]], [0, 10]).collect();

        assert_eq!(
            offsets,
            vec![[0, 10], [1, 11], [2, 12], [3, 10], [4, 11], [5, 12]]
        );
    }

    #[test]
    fn walk_scalar_and_empty() {
        assert_eq!(
            MultiIndex::new(&[], [vec![]], [4]).collect::<Vec<_>>(),
            vec![[4]]
        );
        assert_eq!(MultiIndex::new(&[2, 0], [vec![0, 1]], [0]).count(), 0);
    }

    #[test]
    fn iterate_transposed() -> Result<()> {
        let data = vec![1, 2, 3, 4, 5, 6];
        let layout = Layout::contiguous(Dimensions::new([(Dim::X, 2), (Dim::Y, 3)])?)
            .transpose(&[Dim::Y, Dim::X])?;
        let iter = Iter::new(&data, &layout);

        assert_eq!(iter.len(), 6);
        assert_eq!(iter.copied().collect::<Vec<_>>(), vec![1, 4, 2, 5, 3, 6]);

        Ok(())
    }

    #[test]
    fn iterate_mut_slice() -> Result<()> {
        let mut data = vec![1, 2, 3, 4, 5, 6];
        let layout = Layout::contiguous(Dimensions::new([(Dim::X, 2), (Dim::Y, 3)])?)
            .slice_index(&Dim::Y, 1)?;
        for x in IterMut::new(&mut data, &layout) {
            *x *= 10;
        }

        assert_eq!(data, vec![1, 20, 3, 4, 50, 6]);

        Ok(())
    }
}
