//! Broadcasting element-wise execution.
//!
//! A kernel is a unit struct implementing [`Operation`] plus one of the typed
//! kernel traits for every admissible dtype combination. The `*_op!` macros
//! generate the runtime dispatch from dtype tags to those typed instances.

pub(crate) mod engine;
mod kernel;

pub use engine::{binary, binary_into, in_place, ternary, unary};
pub(crate) use engine::{in_place_region, Input, Output, Plan};
pub use kernel::{
    BinaryKernel, CumulativeKernel, InPlaceKernel, InPlaceKernel2, Operation, TernaryKernel,
    UnaryKernel,
};

use crate::{
    config::{self, Tuning},
    dtype::with_dtype,
    storage::Layout,
    units::UnitRule,
    Element, Error, Result, ValueAndVariance, Variable,
};

pub trait UnaryOp: Operation {
    fn apply_with(&self, tuning: &Tuning, a: &Variable) -> Result<Variable>;

    fn apply(&self, a: &Variable) -> Result<Variable> {
        self.apply_with(&config::global().tuning, a)
    }
}

pub trait BinaryOp: Operation {
    fn apply_with(&self, tuning: &Tuning, a: &Variable, b: &Variable) -> Result<Variable>;

    fn apply_into_with(
        &self,
        tuning: &Tuning,
        a: &Variable,
        b: &Variable,
        out: &mut Variable,
    ) -> Result<()>;

    fn apply(&self, a: &Variable, b: &Variable) -> Result<Variable> {
        self.apply_with(&config::global().tuning, a, b)
    }

    fn apply_into(&self, a: &Variable, b: &Variable, out: &mut Variable) -> Result<()> {
        self.apply_into_with(&config::global().tuning, a, b, out)
    }
}

pub trait TernaryOp: Operation {
    fn apply_with(&self, tuning: &Tuning, a: &Variable, b: &Variable, c: &Variable)
        -> Result<Variable>;

    fn apply(&self, a: &Variable, b: &Variable, c: &Variable) -> Result<Variable> {
        self.apply_with(&config::global().tuning, a, b, c)
    }
}

/// Kernels that update their first operand, either element-wise or by
/// accumulating many elements of the second operand into one.
pub trait InPlaceOp: Operation {
    fn apply_in_place_with(&self, tuning: &Tuning, a: &mut Variable, b: &Variable) -> Result<()>;

    fn accumulate_with(&self, tuning: &Tuning, out: &mut Variable, b: &Variable) -> Result<()>;

    fn apply_in_place(&self, a: &mut Variable, b: &Variable) -> Result<()> {
        self.apply_in_place_with(&config::global().tuning, a, b)
    }

    fn accumulate(&self, out: &mut Variable, b: &Variable) -> Result<()> {
        self.accumulate_with(&config::global().tuning, out, b)
    }
}

/// Kernels accumulating two operands into one output.
pub trait InPlaceOp2: Operation {
    fn accumulate_with(
        &self,
        tuning: &Tuning,
        out: &mut Variable,
        a: &Variable,
        b: &Variable,
    ) -> Result<()>;

    fn accumulate(&self, out: &mut Variable, a: &Variable, b: &Variable) -> Result<()> {
        self.accumulate_with(&config::global().tuning, out, a, b)
    }
}

/// Order-dependent kernels, always run serially.
pub trait CumulativeOp: Operation {
    fn accumulate_cumulative(&self, state: &mut Variable, x: &mut Variable) -> Result<()>;
}

macro_rules! unary_op {
    ($op:ty: $($a:ty),+ $(,)?) => {
        impl $crate::transform::UnaryOp for $op {
            fn apply_with(
                &self,
                tuning: &$crate::config::Tuning,
                a: &$crate::Variable,
            ) -> $crate::Result<$crate::Variable> {
                $(
                    if a.dtype() == <$a as $crate::Element>::DTYPE {
                        return $crate::transform::unary::<$a, Self>(tuning, self, a);
                    }
                )+
                Err($crate::Error::unsupported_dtypes(
                    <Self as $crate::transform::Operation>::NAME,
                    &[a.dtype()],
                ))
            }
        }
    };
}

macro_rules! binary_op {
    ($op:ty: $(($a:ty, $b:ty)),+ $(,)?) => {
        impl $crate::transform::BinaryOp for $op {
            fn apply_with(
                &self,
                tuning: &$crate::config::Tuning,
                a: &$crate::Variable,
                b: &$crate::Variable,
            ) -> $crate::Result<$crate::Variable> {
                $(
                    if a.dtype() == <$a as $crate::Element>::DTYPE
                        && b.dtype() == <$b as $crate::Element>::DTYPE
                    {
                        return $crate::transform::binary::<$a, $b, Self>(tuning, self, a, b);
                    }
                )+
                Err($crate::Error::unsupported_dtypes(
                    <Self as $crate::transform::Operation>::NAME,
                    &[a.dtype(), b.dtype()],
                ))
            }

            fn apply_into_with(
                &self,
                tuning: &$crate::config::Tuning,
                a: &$crate::Variable,
                b: &$crate::Variable,
                out: &mut $crate::Variable,
            ) -> $crate::Result<()> {
                $(
                    if a.dtype() == <$a as $crate::Element>::DTYPE
                        && b.dtype() == <$b as $crate::Element>::DTYPE
                    {
                        return $crate::transform::binary_into::<$a, $b, Self>(
                            tuning, self, a, b, out,
                        );
                    }
                )+
                Err($crate::Error::unsupported_dtypes(
                    <Self as $crate::transform::Operation>::NAME,
                    &[a.dtype(), b.dtype()],
                ))
            }
        }
    };
}

macro_rules! ternary_op {
    ($op:ty: $(($a:ty, $b:ty, $c:ty)),+ $(,)?) => {
        impl $crate::transform::TernaryOp for $op {
            fn apply_with(
                &self,
                tuning: &$crate::config::Tuning,
                a: &$crate::Variable,
                b: &$crate::Variable,
                c: &$crate::Variable,
            ) -> $crate::Result<$crate::Variable> {
                $(
                    if a.dtype() == <$a as $crate::Element>::DTYPE
                        && b.dtype() == <$b as $crate::Element>::DTYPE
                        && c.dtype() == <$c as $crate::Element>::DTYPE
                    {
                        return $crate::transform::ternary::<$a, $b, $c, Self>(
                            tuning, self, a, b, c,
                        );
                    }
                )+
                Err($crate::Error::unsupported_dtypes(
                    <Self as $crate::transform::Operation>::NAME,
                    &[a.dtype(), b.dtype(), c.dtype()],
                ))
            }
        }
    };
}

macro_rules! in_place_op {
    ($op:ty: $(($a:ty, $b:ty)),+ $(,)?) => {
        impl $crate::transform::InPlaceOp for $op {
            fn apply_in_place_with(
                &self,
                tuning: &$crate::config::Tuning,
                a: &mut $crate::Variable,
                b: &$crate::Variable,
            ) -> $crate::Result<()> {
                $(
                    if a.dtype() == <$a as $crate::Element>::DTYPE
                        && b.dtype() == <$b as $crate::Element>::DTYPE
                    {
                        return $crate::transform::in_place::<$a, $b, Self>(tuning, self, a, b);
                    }
                )+
                Err($crate::Error::unsupported_dtypes(
                    <Self as $crate::transform::Operation>::NAME,
                    &[a.dtype(), b.dtype()],
                ))
            }

            fn accumulate_with(
                &self,
                tuning: &$crate::config::Tuning,
                out: &mut $crate::Variable,
                b: &$crate::Variable,
            ) -> $crate::Result<()> {
                $(
                    if out.dtype() == <$a as $crate::Element>::DTYPE
                        && b.dtype() == <$b as $crate::Element>::DTYPE
                    {
                        return $crate::accumulate::accumulate_in_place::<$a, $b, Self>(
                            tuning, self, out, b,
                        );
                    }
                )+
                Err($crate::Error::unsupported_dtypes(
                    <Self as $crate::transform::Operation>::NAME,
                    &[out.dtype(), b.dtype()],
                ))
            }
        }
    };
}

macro_rules! in_place_op2 {
    ($op:ty: $(($o:ty, $a:ty, $b:ty)),+ $(,)?) => {
        impl $crate::transform::InPlaceOp2 for $op {
            fn accumulate_with(
                &self,
                tuning: &$crate::config::Tuning,
                out: &mut $crate::Variable,
                a: &$crate::Variable,
                b: &$crate::Variable,
            ) -> $crate::Result<()> {
                $(
                    if out.dtype() == <$o as $crate::Element>::DTYPE
                        && a.dtype() == <$a as $crate::Element>::DTYPE
                        && b.dtype() == <$b as $crate::Element>::DTYPE
                    {
                        return $crate::accumulate::accumulate_in_place2::<$o, $a, $b, Self>(
                            tuning, self, out, a, b,
                        );
                    }
                )+
                Err($crate::Error::unsupported_dtypes(
                    <Self as $crate::transform::Operation>::NAME,
                    &[out.dtype(), a.dtype(), b.dtype()],
                ))
            }
        }
    };
}

macro_rules! cumulative_op {
    ($op:ty: $($a:ty),+ $(,)?) => {
        impl $crate::transform::CumulativeOp for $op {
            fn accumulate_cumulative(
                &self,
                state: &mut $crate::Variable,
                x: &mut $crate::Variable,
            ) -> $crate::Result<()> {
                $(
                    if state.dtype() == <$a as $crate::Element>::DTYPE
                        && x.dtype() == <$a as $crate::Element>::DTYPE
                    {
                        return $crate::accumulate::accumulate_cumulative::<$a, Self>(
                            self, state, x,
                        );
                    }
                )+
                Err($crate::Error::unsupported_dtypes(
                    <Self as $crate::transform::Operation>::NAME,
                    &[state.dtype(), x.dtype()],
                ))
            }
        }
    };
}

pub(crate) use {binary_op, cumulative_op, in_place_op, in_place_op2, ternary_op, unary_op};

/// Element-wise assignment, defined for every dtype.
struct Assign;

impl Operation for Assign {
    const NAME: &'static str = "assign";
    const UNIT: UnitRule = UnitRule::Preserve;
}

impl<T> InPlaceKernel<T, T> for Assign
where
    T: Element,
{
    const VARIANCES: bool = true;

    fn update(&self, a: &mut T, b: T) {
        *a = b;
    }

    fn update_with_variance(&self, a: &mut ValueAndVariance<T>, b: ValueAndVariance<T>) {
        *a = b;
    }
}

/// Copies `src` into `dst`, broadcasting `src` as needed.
pub(crate) fn assign(src: &Variable, dst: &mut Variable) -> Result<()> {
    let region = dst.layout().clone();
    assign_region(src, dst, &region)
}

/// Copies `src` into the elements of `dst`'s buffer addressed by `region`.
pub(crate) fn assign_region(src: &Variable, dst: &mut Variable, region: &Layout) -> Result<()> {
    let tuning = &config::global().tuning;
    with_dtype!(src.dtype(), T => {
        in_place_region::<T, T, Assign>(tuning, &Assign, dst, src, region)
    }, bins => {
        Err(Error::Type(String::from(
            "bins cannot be assigned element-wise, copy the bin buffer instead",
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::{binary, binary_into, unary, BinaryKernel, BinaryOp, Operation, UnaryKernel};
    use crate::{
        config::Tuning, ops::Plus, units::UnitRule, Dim, Dimensions, Error, Result, Unit,
        ValueAndVariance, Variable,
    };

    struct Twice;

    impl Operation for Twice {
        const NAME: &'static str = "twice";
        const UNIT: UnitRule = UnitRule::Preserve;
    }

    impl UnaryKernel<i64> for Twice {
        type Out = i64;

        fn value(&self, a: i64) -> i64 {
            2 * a
        }
    }

    struct Hypot;

    impl Operation for Hypot {
        const NAME: &'static str = "hypot";
        const UNIT: UnitRule = UnitRule::Equal;
    }

    impl BinaryKernel<f64, f64> for Hypot {
        type Out = f64;

        fn value(&self, a: f64, b: f64) -> f64 {
            a.hypot(b)
        }
    }

    struct Sum;

    impl Operation for Sum {
        const NAME: &'static str = "sum";
        const UNIT: UnitRule = UnitRule::Equal;
    }

    impl BinaryKernel<f64, f64> for Sum {
        type Out = f64;
        const VARIANCES: bool = true;

        fn value(&self, a: f64, b: f64) -> f64 {
            a + b
        }

        fn value_and_variance(
            &self,
            a: ValueAndVariance<f64>,
            b: ValueAndVariance<f64>,
        ) -> ValueAndVariance<f64> {
            a + b
        }
    }

    #[test]
    fn custom_unary_kernel() -> Result<()> {
        let a = Variable::new(Dimensions::new([(Dim::X, 3)])?, Unit::M, vec![1_i64, 2, 3], None)?;
        let b = unary::<i64, _>(&Tuning::default(), &Twice, &a)?;

        assert_eq!(b.values::<i64>()?.to_vec(), vec![2, 4, 6]);
        assert_eq!(b.unit(), Unit::M);
        assert!(matches!(
            unary::<i64, _>(&Tuning::default(), &Twice, &Variable::scalar(1.0, Unit::ONE)?),
            Err(Error::Type(_))
        ));

        Ok(())
    }

    #[test]
    fn kernel_without_variance_formula() -> Result<()> {
        let a = Variable::scalar_with_variance(3.0, 1.0, Unit::M)?;
        let b = Variable::scalar(4.0, Unit::M)?;

        assert!(matches!(
            binary::<f64, f64, _>(&Tuning::default(), &Hypot, &a, &b),
            Err(Error::Variances(_))
        ));
        let c = binary::<f64, f64, _>(&Tuning::default(), &Hypot, &a.values_only()?, &b)?;
        assert_eq!(c.value::<f64>()?, 5.0);

        Ok(())
    }

    #[test]
    fn eager_and_serial_agree() -> Result<()> {
        let dims = Dimensions::new([(Dim::X, 64), (Dim::Y, 33)])?;
        let values: Vec<f64> = (0..64 * 33).map(|i| i as f64).collect();
        let a = Variable::new(dims.clone(), Unit::S, values.clone(), Some(values))?;
        let b = Variable::new(Dimensions::new([(Dim::Y, 33)])?, Unit::S, vec![0.5; 33], None)?;

        let serial = binary::<f64, f64, _>(&Tuning::serial(), &Sum, &a, &b)?;
        let eager = binary::<f64, f64, _>(&Tuning::eager(), &Sum, &a, &b)?;

        assert_eq!(serial, eager);
        assert_eq!(serial.dims(), &dims);
        assert_eq!(eager.values::<f64>()?.get(34), Some(&34.5));
        assert_eq!(eager.variances::<f64>()?.get(34), Some(&34.0));

        Ok(())
    }

    fn operands() -> Result<(Variable, Variable)> {
        let a = Variable::new(
            Dimensions::new([(Dim::X, 2), (Dim::Y, 3)])?,
            Unit::S,
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            None,
        )?;
        let b = Variable::new(
            Dimensions::new([(Dim::Y, 3)])?,
            Unit::S,
            vec![10.0, 20.0, 30.0],
            None,
        )?;
        Ok((a, b))
    }

    #[test]
    fn write_into_caller_output() -> Result<()> {
        let (a, b) = operands()?;
        let expected = binary::<f64, f64, _>(&Tuning::default(), &Sum, &a, &b)?;
        let yx = Dimensions::new([(Dim::Y, 3), (Dim::X, 2)])?;

        let mut out = Variable::zeros::<f64>(yx.clone(), Unit::ONE, false)?;
        binary_into::<f64, f64, _>(&Tuning::serial(), &Sum, &a, &b, &mut out)?;
        assert_eq!(out.dims(), &yx);
        assert_eq!(out.unit(), Unit::S);
        assert_eq!(
            out.values::<f64>()?.to_vec(),
            vec![11.0, 14.0, 22.0, 25.0, 33.0, 36.0]
        );
        assert_eq!(out, expected);

        let mut eager = Variable::zeros::<f64>(yx, Unit::ONE, false)?;
        binary_into::<f64, f64, _>(&Tuning::eager(), &Sum, &a, &b, &mut eager)?;
        assert_eq!(eager, expected);

        let mut dispatched = Variable::zeros::<f64>(a.dims().clone(), Unit::ONE, false)?;
        Plus.apply_into(&a, &b, &mut dispatched)?;
        assert_eq!(dispatched, expected);

        Ok(())
    }

    #[test]
    fn caller_output_is_checked() -> Result<()> {
        let (a, b) = operands()?;
        let tuning = Tuning::default();
        let xy = a.dims().clone();

        let mut short = Variable::zeros::<f64>(Dimensions::new([(Dim::X, 2)])?, Unit::ONE, false)?;
        assert!(matches!(
            binary_into::<f64, f64, _>(&tuning, &Sum, &a, &b, &mut short),
            Err(Error::Dimension(_))
        ));

        let mut ints = Variable::zeros::<i64>(xy.clone(), Unit::ONE, false)?;
        assert!(matches!(
            binary_into::<f64, f64, _>(&tuning, &Sum, &a, &b, &mut ints),
            Err(Error::Type(_))
        ));

        let mut with_variances = Variable::zeros::<f64>(xy.clone(), Unit::ONE, true)?;
        assert!(matches!(
            binary_into::<f64, f64, _>(&tuning, &Sum, &a, &b, &mut with_variances),
            Err(Error::Variances(_))
        ));
        assert_eq!(with_variances.values::<f64>()?.to_vec(), vec![0.0; 6]);
        assert_eq!(with_variances.unit(), Unit::ONE);

        let uncertain = Variable::new(b.dims().clone(), Unit::S, vec![1.0; 3], Some(vec![1.0; 3]))?;
        let mut plain = Variable::zeros::<f64>(xy.clone(), Unit::ONE, false)?;
        assert!(matches!(
            binary_into::<f64, f64, _>(&tuning, &Sum, &a, &uncertain, &mut plain),
            Err(Error::Variances(_))
        ));

        let mut frozen = Variable::zeros::<f64>(xy.clone(), Unit::ONE, false)?.as_const();
        assert!(matches!(
            binary_into::<f64, f64, _>(&tuning, &Sum, &a, &b, &mut frozen),
            Err(Error::Readonly(_))
        ));

        let metres = Variable::scalar(1.0, Unit::M)?;
        assert!(matches!(
            binary_into::<f64, f64, _>(&tuning, &Sum, &a, &metres, &mut plain),
            Err(Error::Unit(_))
        ));
        assert_eq!(plain.values::<f64>()?.to_vec(), vec![0.0; 6]);

        let flags = Variable::scalar(true, Unit::ONE)?;
        assert!(matches!(
            Plus.apply_into(&flags, &flags, &mut plain),
            Err(Error::Type(_))
        ));

        Ok(())
    }
}
