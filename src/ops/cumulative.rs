use core::ops::Add;

use crate::{
    transform::{cumulative_op, CumulativeKernel, CumulativeOp, Operation},
    units::UnitRule,
    Dim, Dimensions, Result, ValueAndVariance, Variable,
};

/// Whether position `i` of a cumulative sum includes element `i`.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum CumSumMode {
    #[default]
    Inclusive,
    Exclusive,
}

pub struct CumSum {
    mode: CumSumMode,
}

impl Operation for CumSum {
    const NAME: &'static str = "cumsum";
    const UNIT: UnitRule = UnitRule::Equal;
}

fn scan<T, F>(mode: CumSumMode, acc: &mut T, x: &mut T, add: F)
where
    T: Copy,
    F: Fn(T, T) -> T,
{
    let next = add(*acc, *x);
    match mode {
        CumSumMode::Inclusive => *x = next,
        CumSumMode::Exclusive => *x = *acc,
    }
    *acc = next;
}

macro_rules! float_scan {
    ($($t:ty),+) => {$(
        impl CumulativeKernel<$t> for CumSum {
            const VARIANCES: bool = true;

            fn step(&self, acc: &mut $t, x: &mut $t) {
                scan(self.mode, acc, x, Add::add);
            }

            fn step_with_variance(
                &self,
                acc: &mut ValueAndVariance<$t>,
                x: &mut ValueAndVariance<$t>,
            ) {
                scan(self.mode, acc, x, Add::add);
            }
        }
    )+};
}

macro_rules! int_scan {
    ($($t:ty),+) => {$(
        impl CumulativeKernel<$t> for CumSum {
            fn step(&self, acc: &mut $t, x: &mut $t) {
                scan(self.mode, acc, x, <$t>::wrapping_add);
            }
        }
    )+};
}

float_scan!(f64, f32);
int_scan!(i64, i32);

cumulative_op!(CumSum: f64, f32, i64, i32);

/// Cumulative sum along `dim`.
pub fn cumsum(var: &Variable, dim: &Dim, mode: CumSumMode) -> Result<Variable> {
    let mut out = var.copy()?;
    let mut dims = var.dims().clone();
    dims.erase(dim)?;
    let mut state = Variable::default_init(var.dtype(), dims, var.unit(), var.has_variances())?;
    CumSum { mode }.accumulate_cumulative(&mut state, &mut out)?;
    Ok(out)
}

/// Cumulative sum over all elements in memory order of the dimensions.
pub fn cumsum_all(var: &Variable, mode: CumSumMode) -> Result<Variable> {
    let flat = Dimensions::new([(Dim::INTERNAL0, var.volume())])?;
    let out = cumsum(&var.copy()?.reshape(flat)?, &Dim::INTERNAL0, mode)?;
    out.reshape(var.dims().clone())
}

#[cfg(test)]
mod tests {
    use super::{cumsum, cumsum_all, CumSumMode};
    use crate::{Dim, Dimensions, Error, Result, Unit, Variable};

    fn xy() -> Result<Variable> {
        Variable::new(
            Dimensions::new([(Dim::X, 2), (Dim::Y, 3)])?,
            Unit::M,
            vec![1_i64, 2, 3, 4, 5, 6],
            None,
        )
    }

    #[test]
    fn inclusive_and_exclusive() -> Result<()> {
        let v = xy()?;

        let inner = cumsum(&v, &Dim::Y, CumSumMode::Inclusive)?;
        assert_eq!(inner.values::<i64>()?.to_vec(), vec![1, 3, 6, 4, 9, 15]);
        assert_eq!(inner.unit(), Unit::M);

        let outer = cumsum(&v, &Dim::X, CumSumMode::Exclusive)?;
        assert_eq!(outer.values::<i64>()?.to_vec(), vec![0, 0, 0, 1, 2, 3]);

        assert_eq!(v.values::<i64>()?.to_vec(), vec![1, 2, 3, 4, 5, 6]);

        Ok(())
    }

    #[test]
    fn over_all_dimensions() -> Result<()> {
        let v = xy()?;
        let all = cumsum_all(&v, CumSumMode::Exclusive)?;

        assert_eq!(all.dims(), v.dims());
        assert_eq!(all.values::<i64>()?.to_vec(), vec![0, 1, 3, 6, 10, 15]);

        let t = cumsum_all(&v.transpose(&[Dim::Y, Dim::X])?, CumSumMode::Inclusive)?;
        assert_eq!(t.values::<i64>()?.to_vec(), vec![1, 5, 7, 12, 15, 21]);

        Ok(())
    }

    #[test]
    fn variances_accumulate() -> Result<()> {
        let v = Variable::new(
            Dimensions::new([(Dim::X, 3)])?,
            Unit::ONE,
            vec![1.0, 2.0, 3.0],
            Some(vec![0.5, 0.5, 0.5]),
        )?;
        let c = cumsum(&v, &Dim::X, CumSumMode::Inclusive)?;

        assert_eq!(c.values::<f64>()?.to_vec(), vec![1.0, 3.0, 6.0]);
        assert_eq!(c.variances::<f64>()?.to_vec(), vec![0.5, 1.0, 1.5]);
        assert!(matches!(
            cumsum(&Variable::scalar(true, Unit::ONE)?, &Dim::X, CumSumMode::Inclusive),
            Err(Error::NotFound(_))
        ));

        Ok(())
    }
}
