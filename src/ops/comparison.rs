use num_complex::Complex64;
use num_traits::Float;

use super::{
    arithmetic::{abs, add, multiply, sqrt},
    convert::astype,
    logical::and,
};
use crate::{
    transform::{binary_op, ternary_op, BinaryKernel, BinaryOp, Operation, TernaryKernel, TernaryOp},
    units::UnitRule,
    Element, NanComparisons, Result, Variable,
};

pub struct Less;
pub struct Greater;
pub struct LessEqual;
pub struct GreaterEqual;
pub struct Equal;
pub struct NotEqual;

macro_rules! comparison {
    ($($kernel:ident => $name:literal, $op:tt, $bound:ident;)+) => {$(
        impl Operation for $kernel {
            const NAME: &'static str = $name;
            const UNIT: UnitRule = UnitRule::Compare;
        }

        impl<T> BinaryKernel<T, T> for $kernel
        where
            T: Element + $bound,
        {
            type Out = bool;

            fn value(&self, a: T, b: T) -> bool {
                a $op b
            }
        }
    )+};
}

comparison! {
    Less => "less", <, PartialOrd;
    Greater => "greater", >, PartialOrd;
    LessEqual => "less_equal", <=, PartialOrd;
    GreaterEqual => "greater_equal", >=, PartialOrd;
    Equal => "equal", ==, PartialEq;
    NotEqual => "not_equal", !=, PartialEq;
}

binary_op!(Less: (f64, f64), (f32, f32), (i64, i64), (i32, i32));
binary_op!(Greater: (f64, f64), (f32, f32), (i64, i64), (i32, i32));
binary_op!(LessEqual: (f64, f64), (f32, f32), (i64, i64), (i32, i32));
binary_op!(GreaterEqual: (f64, f64), (f32, f32), (i64, i64), (i32, i32));
binary_op!(Equal:
    (f64, f64), (f32, f32), (i64, i64), (i32, i32),
    (bool, bool), (Complex64, Complex64), (String, String),
);
binary_op!(NotEqual:
    (f64, f64), (f32, f32), (i64, i64), (i32, i32),
    (bool, bool), (Complex64, Complex64), (String, String),
);

/// `|a - b| <= tol`, with the NaN policy of [`NanComparisons`].
pub struct IsClose {
    equal_nans: bool,
}

impl Operation for IsClose {
    const NAME: &'static str = "is_close";
    const UNIT: UnitRule = UnitRule::Compare;
}

impl<T> TernaryKernel<T, T, T> for IsClose
where
    T: Element + Float,
{
    type Out = bool;

    fn value(&self, a: T, b: T, tol: T) -> bool {
        if self.equal_nans && Float::is_nan(a) && Float::is_nan(b) {
            return true;
        }
        a == b || (a - b).abs() <= tol
    }
}

ternary_op!(IsClose: (f64, f64, f64), (f32, f32, f32));

pub fn less(a: &Variable, b: &Variable) -> Result<Variable> {
    Less.apply(a, b)
}

pub fn greater(a: &Variable, b: &Variable) -> Result<Variable> {
    Greater.apply(a, b)
}

pub fn less_equal(a: &Variable, b: &Variable) -> Result<Variable> {
    LessEqual.apply(a, b)
}

pub fn greater_equal(a: &Variable, b: &Variable) -> Result<Variable> {
    GreaterEqual.apply(a, b)
}

pub fn equal(a: &Variable, b: &Variable) -> Result<Variable> {
    Equal.apply(a, b)
}

pub fn not_equal(a: &Variable, b: &Variable) -> Result<Variable> {
    NotEqual.apply(a, b)
}

/// Element-wise `|a - b| <= atol + rtol * |b|`.
///
/// `atol` has the unit of the operands and `rtol` is dimensionless. If both
/// operands have variances, their standard deviations must be close as well,
/// compared with the same tolerances.
pub fn is_close(
    a: &Variable,
    b: &Variable,
    rtol: &Variable,
    atol: &Variable,
    nan: NanComparisons,
) -> Result<Variable> {
    let kernel = IsClose {
        equal_nans: nan == NanComparisons::Equal,
    };
    let b_values = b.values_only()?;
    let tol = add(atol, &multiply(rtol, &abs(&b_values)?)?)?;
    let close = kernel.apply(&a.values_only()?, &b_values, &astype(&tol, a.dtype())?)?;
    if !(a.has_variances() && b.has_variances()) {
        return Ok(close);
    }
    let a_errors = sqrt(&a.variances_as_values()?)?;
    let b_errors = sqrt(&b.variances_as_values()?)?;
    let tol = add(atol, &multiply(rtol, &b_errors)?)?;
    let errors_close = kernel.apply(&a_errors, &b_errors, &astype(&tol, a.dtype())?)?;
    and(&close, &errors_close)
}

#[cfg(test)]
mod tests {
    use super::{equal, is_close, less, not_equal};
    use crate::{DType, Dim, Dimensions, Error, NanComparisons, Result, Unit, Variable};

    fn x(values: Vec<f64>, unit: Unit) -> Result<Variable> {
        Variable::new(Dimensions::new([(Dim::X, values.len())])?, unit, values, None)
    }

    #[test]
    fn comparison_erases_unit() -> Result<()> {
        let a = x(vec![1.0, 2.0, 3.0], Unit::M)?;
        let b = Variable::scalar(2.0, Unit::M)?;
        let c = less(&a, &b)?;

        assert_eq!(c.dtype(), DType::Bool);
        assert_eq!(c.unit(), Unit::ONE);
        assert_eq!(c.values::<bool>()?.to_vec(), vec![true, false, false]);
        assert!(matches!(
            less(&a, &Variable::scalar(2.0, Unit::S)?),
            Err(Error::Unit(_))
        ));

        Ok(())
    }

    #[test]
    fn equality_of_strings() -> Result<()> {
        let a = Variable::new(
            Dimensions::new([(Dim::X, 2)])?,
            Unit::ONE,
            vec![String::from("a"), String::from("b")],
            None,
        )?;
        let b = Variable::scalar(String::from("b"), Unit::ONE)?;

        assert_eq!(equal(&a, &b)?.values::<bool>()?.to_vec(), vec![false, true]);
        assert_eq!(not_equal(&a, &b)?.values::<bool>()?.to_vec(), vec![true, false]);
        assert!(matches!(less(&a, &b), Err(Error::Type(_))));

        Ok(())
    }

    #[test]
    fn close_within_tolerance() -> Result<()> {
        let a = x(vec![1.0, 2.0, f64::NAN], Unit::M)?;
        let b = x(vec![1.05, 2.5, f64::NAN], Unit::M)?;
        let rtol = Variable::scalar(0.0, Unit::ONE)?;
        let atol = Variable::scalar(0.1, Unit::M)?;

        let close = is_close(&a, &b, &rtol, &atol, NanComparisons::Unequal)?;
        assert_eq!(close.values::<bool>()?.to_vec(), vec![true, false, false]);
        let close = is_close(&a, &b, &rtol, &atol, NanComparisons::Equal)?;
        assert_eq!(close.values::<bool>()?.to_vec(), vec![true, false, true]);

        let relative = is_close(
            &a,
            &b,
            &Variable::scalar(0.3, Unit::ONE)?,
            &Variable::scalar(0.0, Unit::M)?,
            NanComparisons::Unequal,
        )?;
        assert_eq!(relative.values::<bool>()?.to_vec(), vec![true, true, false]);

        Ok(())
    }

    #[test]
    fn close_compares_variances() -> Result<()> {
        let a = Variable::scalar_with_variance(1.0, 4.0, Unit::M)?;
        let b = Variable::scalar_with_variance(1.0, 9.0, Unit::M)?;
        let rtol = Variable::scalar(0.0, Unit::ONE)?;

        let atol = Variable::scalar(0.5, Unit::M)?;
        let strict = is_close(&a, &b, &rtol, &atol, NanComparisons::Unequal)?;
        assert!(!strict.value::<bool>()?);
        let atol = Variable::scalar(1.5, Unit::M)?;
        let loose = is_close(&a, &b, &rtol, &atol, NanComparisons::Unequal)?;
        assert!(loose.value::<bool>()?);

        Ok(())
    }
}
