use crate::{
    storage::{Iter, IterMut, Layout},
    Dimensions, Error, Result,
};

fn flat_offset(layout: &Layout, mut index: usize) -> usize {
    let mut offset = layout.offset() as isize;
    for (&extent, &stride) in layout
        .dims()
        .shape()
        .iter()
        .rev()
        .zip(layout.strides().iter().rev())
    {
        offset += (index % extent) as isize * stride;
        index /= extent;
    }
    offset as usize
}

/// Typed read access to the elements of a variable in logical order.
#[derive(Clone, Copy, Debug)]
pub struct ElementArrayView<'a, T> {
    data: &'a [T],
    layout: &'a Layout,
}

impl<'a, T> ElementArrayView<'a, T> {
    pub(crate) fn new(data: &'a [T], layout: &'a Layout) -> Self {
        Self { data, layout }
    }

    pub fn dims(&self) -> &'a Dimensions {
        self.layout.dims()
    }

    pub fn len(&self) -> usize {
        self.layout.volume()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> Iter<'a, T> {
        Iter::new(self.data, self.layout)
    }

    /// Element at row-major position `index`.
    pub fn get(&self, index: usize) -> Option<&'a T> {
        if index >= self.len() {
            return None;
        }
        self.data.get(flat_offset(self.layout, index))
    }

    /// The elements as one slice if they are stored contiguously.
    pub fn as_slice(&self) -> Option<&'a [T]> {
        if !self.layout.is_contiguous() {
            return None;
        }
        let begin = self.layout.offset();
        self.data.get(begin..begin + self.len())
    }
}

impl<T> ElementArrayView<'_, T>
where
    T: Clone,
{
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

impl<'a, T> IntoIterator for ElementArrayView<'a, T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Typed write access to the elements of a variable in logical order.
#[derive(Debug)]
pub struct ElementArrayViewMut<'a, T> {
    data: &'a mut [T],
    layout: &'a Layout,
}

impl<'a, T> ElementArrayViewMut<'a, T> {
    pub(crate) fn new(data: &'a mut [T], layout: &'a Layout) -> Self {
        Self { data, layout }
    }

    pub fn dims(&self) -> &Dimensions {
        self.layout.dims()
    }

    pub fn len(&self) -> usize {
        self.layout.volume()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self.data, self.layout)
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut::new(self.data, self.layout)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index >= self.len() {
            return None;
        }
        self.data.get_mut(flat_offset(self.layout, index))
    }
}

impl<T> ElementArrayViewMut<'_, T>
where
    T: Clone,
{
    pub fn fill(&mut self, value: T) {
        for x in self.iter_mut() {
            *x = value.clone();
        }
    }

    /// Overwrites all elements, in logical order.
    pub fn assign(&mut self, values: &[T]) -> Result<()> {
        if values.len() != self.len() {
            return Err(Error::Dimension(format!(
                "cannot assign {} values to {}",
                values.len(),
                self.dims()
            )));
        }
        for (dst, src) in self.iter_mut().zip(values) {
            *dst = src.clone();
        }
        Ok(())
    }
}
