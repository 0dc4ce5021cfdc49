use num_complex::Complex64;

use super::{
    arithmetic::divide,
    convert::astype,
    logical::{And, Or},
};
use crate::{
    dimension::merge,
    transform::{
        in_place_op, in_place_op2, InPlaceKernel, InPlaceKernel2, InPlaceOp, InPlaceOp2, Operation,
    },
    units::UnitRule,
    DType, Dim, Dimensions, Element, Error, Result, Slice, Unit, ValueAndVariance, Variable,
};

pub struct Sum;
pub struct NanSum;
pub struct Max;
pub struct Min;
pub struct NanMax;
pub struct NanMin;
pub struct SumProduct;

/// Counts elements that are not NaN.
struct NanCount;

macro_rules! operation {
    ($($kernel:ty, $name:literal, $rule:ident;)+) => {$(
        impl Operation for $kernel {
            const NAME: &'static str = $name;
            const UNIT: UnitRule = UnitRule::$rule;
        }
    )+};
}

operation! {
    Sum, "sum", Equal;
    NanSum, "nansum", Equal;
    Max, "max", Equal;
    Min, "min", Equal;
    NanMax, "nanmax", Equal;
    NanMin, "nanmin", Equal;
    SumProduct, "dot", Product;
    NanCount, "nan_count", Dimensionless;
}

macro_rules! float_sums {
    ($($t:ty),+) => {$(
        impl InPlaceKernel<$t, $t> for Sum {
            const VARIANCES: bool = true;

            fn update(&self, a: &mut $t, b: $t) {
                *a += b;
            }

            fn update_with_variance(&self, a: &mut ValueAndVariance<$t>, b: ValueAndVariance<$t>) {
                *a = *a + b;
            }
        }

        impl InPlaceKernel<$t, $t> for NanSum {
            const VARIANCES: bool = true;

            fn update(&self, a: &mut $t, b: $t) {
                if !b.is_nan() {
                    *a += b;
                }
            }

            fn update_with_variance(&self, a: &mut ValueAndVariance<$t>, b: ValueAndVariance<$t>) {
                if !b.value.is_nan() {
                    *a = *a + b;
                }
            }
        }

        impl InPlaceKernel2<$t, $t, $t> for SumProduct {
            const VARIANCES: bool = true;

            fn update(&self, a: &mut $t, b: $t, c: $t) {
                *a += b * c;
            }

            fn update_with_variance(
                &self,
                a: &mut ValueAndVariance<$t>,
                b: ValueAndVariance<$t>,
                c: ValueAndVariance<$t>,
            ) {
                *a = *a + b * c;
            }
        }

        impl InPlaceKernel<i64, $t> for NanCount {
            fn update(&self, a: &mut i64, b: $t) {
                if !b.is_nan() {
                    *a += 1;
                }
            }
        }
    )+};
}

macro_rules! int_sums {
    ($($t:ty),+) => {$(
        impl InPlaceKernel<$t, $t> for Sum {
            fn update(&self, a: &mut $t, b: $t) {
                *a = a.wrapping_add(b);
            }
        }

        impl InPlaceKernel<$t, $t> for NanSum {
            fn update(&self, a: &mut $t, b: $t) {
                *a = a.wrapping_add(b);
            }
        }

        impl InPlaceKernel2<$t, $t, $t> for SumProduct {
            fn update(&self, a: &mut $t, b: $t, c: $t) {
                *a = a.wrapping_add(b.wrapping_mul(c));
            }
        }
    )+};
}

float_sums!(f64, f32);
int_sums!(i64, i32);

impl InPlaceKernel<i64, bool> for Sum {
    fn update(&self, a: &mut i64, b: bool) {
        *a += i64::from(b);
    }
}

impl InPlaceKernel<Complex64, Complex64> for Sum {
    fn update(&self, a: &mut Complex64, b: Complex64) {
        *a += b;
    }
}

// Combines partial counts.
impl InPlaceKernel<i64, i64> for NanCount {
    fn update(&self, a: &mut i64, b: i64) {
        *a += b;
    }
}

macro_rules! extremum {
    ($($kernel:ident, $op:tt;)+) => {$(
        impl<T> InPlaceKernel<T, T> for $kernel
        where
            T: Element + PartialOrd,
        {
            const VARIANCES: bool = true;

            fn update(&self, a: &mut T, b: T) {
                if b $op *a {
                    *a = b;
                }
            }

            fn update_with_variance(&self, a: &mut ValueAndVariance<T>, b: ValueAndVariance<T>) {
                if b.value $op a.value {
                    *a = b;
                }
            }
        }
    )+};
}

extremum! {
    Max, >;
    Min, <;
}

// A NaN accumulator is replaced by the next element, so NaN only survives
// when every element is NaN.
macro_rules! nan_extremum {
    ($($kernel:ident, $op:tt: $($t:ty),+;)+) => {$($(
        impl InPlaceKernel<$t, $t> for $kernel {
            const VARIANCES: bool = true;

            fn update(&self, a: &mut $t, b: $t) {
                if b $op *a || a.is_nan() {
                    *a = b;
                }
            }

            fn update_with_variance(&self, a: &mut ValueAndVariance<$t>, b: ValueAndVariance<$t>) {
                if b.value $op a.value || a.value.is_nan() {
                    *a = b;
                }
            }
        }
    )+)+};
}

nan_extremum! {
    NanMax, >: f64, f32;
    NanMin, <: f64, f32;
}

macro_rules! int_extremum {
    ($($kernel:ident, $op:tt: $($t:ty),+;)+) => {$($(
        impl InPlaceKernel<$t, $t> for $kernel {
            fn update(&self, a: &mut $t, b: $t) {
                if b $op *a {
                    *a = b;
                }
            }
        }
    )+)+};
}

int_extremum! {
    NanMax, >: i64, i32;
    NanMin, <: i64, i32;
}

in_place_op!(Sum:
    (f64, f64), (f32, f32), (i64, i64), (i32, i32), (i64, bool), (Complex64, Complex64),
);
in_place_op!(NanSum: (f64, f64), (f32, f32), (i64, i64), (i32, i32));
in_place_op!(Max: (f64, f64), (f32, f32), (i64, i64), (i32, i32));
in_place_op!(Min: (f64, f64), (f32, f32), (i64, i64), (i32, i32));
in_place_op!(NanMax: (f64, f64), (f32, f32), (i64, i64), (i32, i32));
in_place_op!(NanMin: (f64, f64), (f32, f32), (i64, i64), (i32, i32));
in_place_op!(NanCount: (i64, f64), (i64, f32));
in_place_op2!(SumProduct: (f64, f64, f64), (f32, f32, f32), (i64, i64, i64), (i32, i32, i32));

fn reduced_dims(dims: &Dimensions, dim: &Dim) -> Result<Dimensions> {
    let mut dims = dims.clone();
    dims.erase(dim)?;
    Ok(dims)
}

/// `var` as a one-dimensional variable, copied only if it is not contiguous.
fn flatten(var: &Variable) -> Result<Variable> {
    var.reshape(Dimensions::new([(Dim::INTERNAL0, var.volume())])?)
}

fn is_float(dtype: DType) -> bool {
    matches!(dtype, DType::Float64 | DType::Float32)
}

fn sum_dtype(dtype: DType) -> DType {
    match dtype {
        DType::Bool => DType::Int64,
        dtype => dtype,
    }
}

fn accumulate_new<K>(kernel: &K, var: &Variable, dims: Dimensions) -> Result<Variable>
where
    K: InPlaceOp,
{
    let dtype = sum_dtype(var.dtype());
    let mut out = Variable::default_init(dtype, dims, var.unit(), var.has_variances())?;
    kernel.accumulate(&mut out, var)?;
    Ok(out)
}

/// Sum along `dim`. Booleans are counted into `int64`.
pub fn sum(var: &Variable, dim: &Dim) -> Result<Variable> {
    accumulate_new(&Sum, var, reduced_dims(var.dims(), dim)?)
}

/// Sum of all elements.
pub fn sum_all(var: &Variable) -> Result<Variable> {
    accumulate_new(&Sum, var, Dimensions::scalar())
}

/// Sum along `dim` skipping NaN elements.
pub fn nansum(var: &Variable, dim: &Dim) -> Result<Variable> {
    accumulate_new(&NanSum, var, reduced_dims(var.dims(), dim)?)
}

pub fn nansum_all(var: &Variable) -> Result<Variable> {
    accumulate_new(&NanSum, var, Dimensions::scalar())
}

/// Sum along `dim` written into `out`, whose previous values are discarded.
/// `out` is left untouched when the sum fails.
pub fn sum_into(var: &Variable, dim: &Dim, out: &mut Variable) -> Result<()> {
    let dims = reduced_dims(var.dims(), dim)?;
    if !out.dims().is_permutation_of(&dims) {
        return Err(Error::Dimension(format!(
            "sum of {} along {} cannot be written to {}",
            var.dims(),
            dim,
            out.dims()
        )));
    }
    out.check_writable()?;
    let mut total = Variable::default_init(
        out.dtype(),
        out.dims().clone(),
        var.unit(),
        out.has_variances(),
    )?;
    Sum.accumulate(&mut total, var)?;
    out.set_unit(var.unit())?;
    total.copy_into(out)
}

/// `total` divided by `count`, in the float dtype of `total`.
fn divide_by_count(total: &Variable, count: usize) -> Result<Variable> {
    let count = match total.dtype() {
        DType::Float32 => Variable::scalar(count as f32, Unit::ONE)?,
        _ => Variable::scalar(count as f64, Unit::ONE)?,
    };
    divide(total, &count)
}

/// Arithmetic mean along `dim`. Integer input gives a `float64` result.
pub fn mean(var: &Variable, dim: &Dim) -> Result<Variable> {
    divide_by_count(&sum(var, dim)?, var.dims().extent(dim)?)
}

/// Arithmetic mean of all elements.
pub fn mean_all(var: &Variable) -> Result<Variable> {
    divide_by_count(&sum_all(var)?, var.volume())
}

fn nanmean_into(var: &Variable, dims: Dimensions) -> Result<Variable> {
    let total = accumulate_new(&NanSum, var, dims.clone())?;
    let mut count = Variable::zeros::<i64>(dims, Unit::ONE, false)?;
    NanCount.accumulate(&mut count, &var.values_only()?)?;
    divide(&total, &astype(&count, total.dtype())?)
}

/// Mean along `dim` of the elements that are not NaN. All-NaN rows give NaN.
pub fn nanmean(var: &Variable, dim: &Dim) -> Result<Variable> {
    if !is_float(var.dtype()) {
        return mean(var, dim);
    }
    nanmean_into(var, reduced_dims(var.dims(), dim)?)
}

pub fn nanmean_all(var: &Variable) -> Result<Variable> {
    if !is_float(var.dtype()) {
        return mean_all(var);
    }
    nanmean_into(var, Dimensions::scalar())
}

fn extremum<K>(kernel: &K, var: &Variable, dim: &Dim) -> Result<Variable>
where
    K: InPlaceOp,
{
    let mut out = var.slice(Slice::index(dim.clone(), 0))?.copy()?;
    kernel.accumulate(&mut out, &var.slice(Slice::range(dim.clone(), 1..))?)?;
    Ok(out)
}

/// Maximum along `dim`, which must not be empty.
pub fn max(var: &Variable, dim: &Dim) -> Result<Variable> {
    extremum(&Max, var, dim)
}

/// Maximum of all elements, of which there must be at least one.
pub fn max_all(var: &Variable) -> Result<Variable> {
    extremum(&Max, &flatten(var)?, &Dim::INTERNAL0)
}

/// Minimum along `dim`, which must not be empty.
pub fn min(var: &Variable, dim: &Dim) -> Result<Variable> {
    extremum(&Min, var, dim)
}

pub fn min_all(var: &Variable) -> Result<Variable> {
    extremum(&Min, &flatten(var)?, &Dim::INTERNAL0)
}

/// Maximum along `dim` ignoring NaN elements.
pub fn nanmax(var: &Variable, dim: &Dim) -> Result<Variable> {
    extremum(&NanMax, var, dim)
}

pub fn nanmax_all(var: &Variable) -> Result<Variable> {
    extremum(&NanMax, &flatten(var)?, &Dim::INTERNAL0)
}

/// Minimum along `dim` ignoring NaN elements.
pub fn nanmin(var: &Variable, dim: &Dim) -> Result<Variable> {
    extremum(&NanMin, var, dim)
}

pub fn nanmin_all(var: &Variable) -> Result<Variable> {
    extremum(&NanMin, &flatten(var)?, &Dim::INTERNAL0)
}

fn fold_bool<K>(kernel: &K, init: bool, var: &Variable, dims: Dimensions) -> Result<Variable>
where
    K: InPlaceOp,
{
    let volume = dims.volume();
    let mut out = Variable::new(dims, Unit::ONE, vec![init; volume], None)?;
    kernel.accumulate(&mut out, var)?;
    Ok(out)
}

/// True where every element along `dim` is true.
pub fn all(var: &Variable, dim: &Dim) -> Result<Variable> {
    fold_bool(&And, true, var, reduced_dims(var.dims(), dim)?)
}

/// True if every element is true.
pub fn all_of(var: &Variable) -> Result<Variable> {
    fold_bool(&And, true, var, Dimensions::scalar())
}

/// True where any element along `dim` is true.
pub fn any(var: &Variable, dim: &Dim) -> Result<Variable> {
    fold_bool(&Or, false, var, reduced_dims(var.dims(), dim)?)
}

pub fn any_of(var: &Variable) -> Result<Variable> {
    fold_bool(&Or, false, var, Dimensions::scalar())
}

/// Sum of `a * b` along `dim`, with `a` and `b` broadcast against each other.
pub fn dot(a: &Variable, b: &Variable, dim: &Dim) -> Result<Variable> {
    let dims = reduced_dims(&merge(a.dims(), b.dims())?, dim)?;
    let unit = SumProduct::UNIT.apply(SumProduct::NAME, &[a.unit(), b.unit()])?;
    let variances = a.has_variances() || b.has_variances();
    let mut out = Variable::default_init(a.dtype(), dims, unit, variances)?;
    SumProduct.accumulate(&mut out, a, b)?;
    Ok(out)
}
