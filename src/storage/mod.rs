mod iter;
mod layout;

pub use iter::{Iter, IterMut};
pub(crate) use iter::MultiIndex;
pub use layout::Layout;

use std::sync::Arc;

use num_complex::Complex64;

use crate::{bins::BinBuffer, DType, Element, IndexPair};

/// Flat element array backing a variable.
pub trait Storage {
    fn dtype(&self) -> DType;
    fn len(&self) -> usize;
    fn has_variances(&self) -> bool;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Values with optional per-element variances of equal length.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Buffer<T> {
    pub(crate) values: Vec<T>,
    pub(crate) variances: Option<Vec<T>>,
}

impl<T> Buffer<T>
where
    T: Element,
{
    pub fn new(values: Vec<T>, variances: Option<Vec<T>>) -> Self {
        debug_assert!(variances
            .as_ref()
            .map_or(true, |v| v.len() == values.len()));
        Self { values, variances }
    }

    pub fn filled(len: usize, value: T, with_variances: bool) -> Self {
        Self {
            values: vec![value; len],
            variances: with_variances.then(|| vec![T::default(); len]),
        }
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn variances(&self) -> Option<&[T]> {
        self.variances.as_deref()
    }
}

impl<T> Storage for Buffer<T>
where
    T: Element,
{
    fn dtype(&self) -> DType {
        T::DTYPE
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn has_variances(&self) -> bool {
        self.variances.is_some()
    }
}

/// Reference-counted storage of any supported element type.
///
/// Cloning a handle shares the underlying buffer. Writers detach through
/// [`DataHandle::make_unique`] before mutating.
#[derive(Clone, Debug)]
pub enum DataHandle {
    Float64(Arc<Buffer<f64>>),
    Float32(Arc<Buffer<f32>>),
    Int64(Arc<Buffer<i64>>),
    Int32(Arc<Buffer<i32>>),
    Bool(Arc<Buffer<bool>>),
    Complex64(Arc<Buffer<Complex64>>),
    String(Arc<Buffer<String>>),
    IndexPair(Arc<Buffer<IndexPair>>),
    Bins(Arc<BinBuffer>),
}

macro_rules! with_storage {
    ($handle:expr, $s:ident => $body:expr) => {
        match $handle {
            DataHandle::Float64($s) => $body,
            DataHandle::Float32($s) => $body,
            DataHandle::Int64($s) => $body,
            DataHandle::Int32($s) => $body,
            DataHandle::Bool($s) => $body,
            DataHandle::Complex64($s) => $body,
            DataHandle::String($s) => $body,
            DataHandle::IndexPair($s) => $body,
            DataHandle::Bins($s) => $body,
        }
    };
}

impl DataHandle {
    pub fn dtype(&self) -> DType {
        with_storage!(self, s => s.dtype())
    }

    pub fn len(&self) -> usize {
        with_storage!(self, s => s.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_variances(&self) -> bool {
        with_storage!(self, s => s.has_variances())
    }

    fn as_ptr(&self) -> *const () {
        with_storage!(self, s => Arc::as_ptr(s) as *const ())
    }

    /// True if both handles refer to the same buffer.
    pub fn ptr_eq(&self, other: &DataHandle) -> bool {
        self.as_ptr() == other.as_ptr()
    }

    pub fn is_unique(&self) -> bool {
        with_storage!(self, s => Arc::strong_count(s) == 1)
    }

    /// Detaches from other owners by cloning the buffer if it is shared.
    /// Returns whether a copy was made.
    pub(crate) fn make_unique(&mut self) -> bool {
        with_storage!(self, s => {
            let shared = Arc::strong_count(s) > 1;
            Arc::make_mut(s);
            shared
        })
    }

    pub(crate) fn buffer<T>(&self) -> Option<&Buffer<T>>
    where
        T: Element,
    {
        T::buffer(self).map(|b| b.as_ref())
    }

    pub(crate) fn buffer_mut<T>(&mut self) -> Option<&mut Buffer<T>>
    where
        T: Element,
    {
        T::buffer_mut(self).map(Arc::make_mut)
    }

    pub(crate) fn set_variances<T>(&mut self, variances: Option<Vec<T>>) -> bool
    where
        T: Element,
    {
        match self.buffer_mut::<T>() {
            Some(b) => {
                b.variances = variances;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Buffer, DataHandle, Storage};
    use crate::{DType, Element};

    #[test]
    fn filled_buffer() {
        let buf = Buffer::filled(3, 1.5_f64, true);

        assert_eq!(buf.values(), &[1.5, 1.5, 1.5]);
        assert_eq!(buf.variances(), Some(&[0.0, 0.0, 0.0][..]));
        assert_eq!(buf.dtype(), DType::Float64);
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn handle_is_copy_on_write() {
        let a = <i64 as Element>::into_handle(Buffer::new(vec![1, 2, 3], None));
        let mut b = a.clone();

        assert!(a.ptr_eq(&b));
        assert!(!a.is_unique());

        assert!(b.make_unique());
        assert!(!a.ptr_eq(&b));
        assert!(b.is_unique());
        assert!(!b.make_unique());

        if let Some(buf) = b.buffer_mut::<i64>() {
            buf.values[0] = 10;
        }
        assert_eq!(a.buffer::<i64>().map(|b| b.values()), Some(&[1, 2, 3][..]));
        assert_eq!(b.buffer::<i64>().map(|b| b.values()), Some(&[10, 2, 3][..]));
        assert!(b.buffer::<f64>().is_none());
    }

    #[test]
    fn handle_reports_dtype() {
        let h: DataHandle = Element::into_handle(Buffer::new(vec![String::from("a")], None));

        assert_eq!(h.dtype(), DType::String);
        assert_eq!(h.len(), 1);
        assert!(!h.has_variances());
    }
}
