use core::marker::PhantomData;

use num_traits::AsPrimitive;

use crate::{
    transform::{unary_op, Operation, UnaryKernel, UnaryOp},
    units::UnitRule,
    DType, Element, Error, Result, ValueAndVariance, Variable,
};

/// Numeric conversion to `U`.
pub struct AsType<U>(PhantomData<fn() -> U>);

impl<U> AsType<U> {
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<U> Operation for AsType<U> {
    const NAME: &'static str = "astype";
    const UNIT: UnitRule = UnitRule::Preserve;
}

impl<A, U> UnaryKernel<A> for AsType<U>
where
    A: Element + AsPrimitive<U>,
    U: Element + Copy,
{
    type Out = U;
    const VARIANCES: bool = true;

    fn value(&self, a: A) -> U {
        a.as_()
    }

    fn value_and_variance(&self, a: ValueAndVariance<A>) -> ValueAndVariance<U> {
        a.cast()
    }
}

unary_op!(AsType<f64>: f64, f32, i64, i32);
unary_op!(AsType<f32>: f64, f32, i64, i32);
unary_op!(AsType<i64>: f64, f32, i64, i32, bool);
unary_op!(AsType<i32>: f64, f32, i64, i32, bool);

/// Converts the elements of `var` to `dtype`. Returns a buffer-sharing
/// clone if `var` already has that dtype.
pub fn astype(var: &Variable, dtype: DType) -> Result<Variable> {
    if var.dtype() == dtype {
        return Ok(var.clone());
    }
    match dtype {
        DType::Float64 => AsType::<f64>::new().apply(var),
        DType::Float32 => AsType::<f32>::new().apply(var),
        DType::Int64 => AsType::<i64>::new().apply(var),
        DType::Int32 => AsType::<i32>::new().apply(var),
        _ => Err(Error::unsupported_dtypes("astype", &[var.dtype(), dtype])),
    }
}
