//! Element-wise operations and reductions on [`Variable`]s.
//!
//! Operators are implemented on references and return [`Result`], since
//! dimensions, units and dtypes are only checked at runtime:
//!
//! ```
//! use scivar::{Dim, Dimensions, Unit, Variable};
//!
//! let a = Variable::new(Dimensions::new([(Dim::X, 2)])?, Unit::M, vec![1.0, 2.0], None)?;
//! let b = Variable::scalar(2.0, Unit::S)?;
//! let c = (&a * &b)?;
//! assert_eq!(c.unit(), (Unit::M * Unit::S)?);
//! # Ok::<(), scivar::Error>(())
//! ```

mod arithmetic;
mod comparison;
mod convert;
mod cumulative;
mod logical;
mod reduction;

pub use arithmetic::{
    abs, add, add_assign, divide, divide_assign, multiply, multiply_assign, negative, sqrt,
    subtract, subtract_assign, Abs, Divide, Minus, Negate, Plus, Sqrt, Times,
};
pub use comparison::{
    equal, greater, greater_equal, is_close, less, less_equal, not_equal, Equal, Greater,
    GreaterEqual, IsClose, Less, LessEqual, NotEqual,
};
pub use convert::{astype, AsType};
pub use cumulative::{cumsum, cumsum_all, CumSum, CumSumMode};
pub use logical::{and, not, or, xor, And, Not, Or, Xor};
pub use reduction::{
    all, all_of, any, any_of, dot, max, max_all, mean, mean_all, min, min_all, nanmax,
    nanmax_all, nanmean, nanmean_all, nanmin, nanmin_all, nansum, nansum_all, sum, sum_all,
    sum_into, Max, Min, NanMax, NanMin, NanSum, Sum, SumProduct,
};

use core::ops;

use crate::{Result, Variable};

macro_rules! binary_operator {
    ($($trait:ident, $method:ident => $f:path;)+) => {$(
        impl ops::$trait<&Variable> for &Variable {
            type Output = Result<Variable>;

            fn $method(self, rhs: &Variable) -> Result<Variable> {
                $f(self, rhs)
            }
        }
    )+};
}

binary_operator! {
    Add, add => add;
    Sub, sub => subtract;
    Mul, mul => multiply;
    Div, div => divide;
    BitAnd, bitand => and;
    BitOr, bitor => or;
    BitXor, bitxor => xor;
}

impl ops::Neg for &Variable {
    type Output = Result<Variable>;

    fn neg(self) -> Result<Variable> {
        negative(self)
    }
}

impl ops::Not for &Variable {
    type Output = Result<Variable>;

    fn not(self) -> Result<Variable> {
        not(self)
    }
}
