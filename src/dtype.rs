use core::fmt;
use std::sync::Arc;

use num_complex::Complex64;

use crate::storage::{Buffer, DataHandle};

/// Tag of the closed set of element types a [`Variable`](crate::Variable) can hold.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DType {
    Float64,
    Float32,
    Int64,
    Int32,
    Bool,
    Complex64,
    String,
    IndexPair,
    Bins,
}

impl DType {
    pub fn can_have_variances(self) -> bool {
        matches!(self, Self::Float64 | Self::Float32)
    }

    /// Booleans, bin indices and bins are always dimensionless.
    pub fn can_have_unit(self) -> bool {
        !matches!(self, Self::Bool | Self::IndexPair | Self::Bins)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Float64 => "float64",
            Self::Float32 => "float32",
            Self::Int64 => "int64",
            Self::Int32 => "int32",
            Self::Bool => "bool",
            Self::Complex64 => "complex64",
            Self::String => "string",
            Self::IndexPair => "index_pair",
            Self::Bins => "bins",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `[begin, end)` range of one bin inside the bin dimension of a buffer.
pub type IndexPair = (usize, usize);

mod private {
    pub trait Sealed {}
}

pub trait Element:
    private::Sealed + Clone + Default + fmt::Debug + PartialEq + Send + Sync + 'static
{
    const DTYPE: DType;

    #[doc(hidden)]
    fn buffer(handle: &DataHandle) -> Option<&Arc<Buffer<Self>>>;
    #[doc(hidden)]
    fn buffer_mut(handle: &mut DataHandle) -> Option<&mut Arc<Buffer<Self>>>;
    #[doc(hidden)]
    fn into_handle(buffer: Buffer<Self>) -> DataHandle;

    fn is_nan(&self) -> bool {
        false
    }
}

macro_rules! impl_element {
    ($type:ty, $variant:ident) => {
        impl_element!($type, $variant, |_x: &$type| false);
    };
    ($type:ty, $variant:ident, $nan:expr) => {
        impl private::Sealed for $type {}

        impl Element for $type {
            const DTYPE: DType = DType::$variant;

            fn buffer(handle: &DataHandle) -> Option<&Arc<Buffer<Self>>> {
                match handle {
                    DataHandle::$variant(b) => Some(b),
                    _ => None,
                }
            }

            fn buffer_mut(handle: &mut DataHandle) -> Option<&mut Arc<Buffer<Self>>> {
                match handle {
                    DataHandle::$variant(b) => Some(b),
                    _ => None,
                }
            }

            fn into_handle(buffer: Buffer<Self>) -> DataHandle {
                DataHandle::$variant(Arc::new(buffer))
            }

            fn is_nan(&self) -> bool {
                let nan: fn(&$type) -> bool = $nan;
                nan(self)
            }
        }
    };
}

/// Runs `$body` with `$t` bound to the element type tagged by `$dtype`, or
/// `$bins` for bucket-typed data.
macro_rules! with_dtype {
    ($dtype:expr, $t:ident => $body:expr, bins => $bins:expr) => {
        match $dtype {
            $crate::DType::Float64 => {
                type $t = f64;
                $body
            }
            $crate::DType::Float32 => {
                type $t = f32;
                $body
            }
            $crate::DType::Int64 => {
                type $t = i64;
                $body
            }
            $crate::DType::Int32 => {
                type $t = i32;
                $body
            }
            $crate::DType::Bool => {
                type $t = bool;
                $body
            }
            $crate::DType::Complex64 => {
                type $t = ::num_complex::Complex64;
                $body
            }
            $crate::DType::String => {
                type $t = ::std::string::String;
                $body
            }
            $crate::DType::IndexPair => {
                type $t = $crate::IndexPair;
                $body
            }
            $crate::DType::Bins => $bins,
        }
    };
}
pub(crate) use with_dtype;

impl_element!(f64, Float64, |x: &f64| f64::is_nan(*x));
impl_element!(f32, Float32, |x: &f32| f32::is_nan(*x));
impl_element!(i64, Int64);
impl_element!(i32, Int32);
impl_element!(bool, Bool);
impl_element!(Complex64, Complex64, |x: &Complex64| f64::is_nan(x.re)
    || f64::is_nan(x.im));
impl_element!(String, String);
impl_element!(IndexPair, IndexPair);

#[cfg(test)]
mod tests {
    use num_complex::Complex64;

    use super::{DType, Element, IndexPair};

    #[test]
    fn dtype_tags() {
        assert_eq!(<f64 as Element>::DTYPE, DType::Float64);
        assert_eq!(<f32 as Element>::DTYPE, DType::Float32);
        assert_eq!(<String as Element>::DTYPE, DType::String);
        assert_eq!(<IndexPair as Element>::DTYPE, DType::IndexPair);
        assert_eq!(DType::Complex64.to_string(), "complex64");
    }

    #[test]
    fn variances_and_units() {
        assert!(DType::Float64.can_have_variances());
        assert!(!DType::Int64.can_have_variances());
        assert!(!DType::Bool.can_have_unit());
        assert!(!DType::Bins.can_have_unit());
        assert!(DType::Int32.can_have_unit());
    }

    #[test]
    fn nan_detection() {
        assert!(Element::is_nan(&f64::NAN));
        assert!(!Element::is_nan(&1.0_f32));
        assert!(Element::is_nan(&Complex64::new(0.0, f64::NAN)));
        assert!(!Element::is_nan(&3_i64));
    }
}
