use num_complex::Complex64;
use num_traits::AsPrimitive;

use crate::{
    transform::{
        binary_op, in_place_op, unary_op, BinaryKernel, BinaryOp, InPlaceKernel, InPlaceOp,
        Operation, UnaryKernel, UnaryOp,
    },
    units::UnitRule,
    Result, ValueAndVariance, Variable,
};

pub struct Plus;
pub struct Minus;
pub struct Times;
pub struct Divide;
pub struct Negate;
pub struct Abs;
pub struct Sqrt;

macro_rules! operation {
    ($($kernel:ident => $name:literal, $unit:ident;)+) => {$(
        impl Operation for $kernel {
            const NAME: &'static str = $name;
            const UNIT: UnitRule = UnitRule::$unit;
        }
    )+};
}

operation! {
    Plus => "add", Equal;
    Minus => "subtract", Equal;
    Times => "multiply", Product;
    Divide => "divide", Quotient;
    Negate => "negative", Preserve;
    Abs => "abs", Preserve;
    Sqrt => "sqrt", Sqrt;
}

macro_rules! float_binary {
    ($kernel:ident, $op:tt: $(($a:ty, $b:ty) => $out:ty),+ $(,)?) => {$(
        impl BinaryKernel<$a, $b> for $kernel {
            type Out = $out;
            const VARIANCES: bool = true;

            fn value(&self, a: $a, b: $b) -> $out {
                AsPrimitive::<$out>::as_(a) $op AsPrimitive::<$out>::as_(b)
            }

            fn value_and_variance(
                &self,
                a: ValueAndVariance<$a>,
                b: ValueAndVariance<$b>,
            ) -> ValueAndVariance<$out> {
                a.cast::<$out>() $op b.cast::<$out>()
            }
        }
    )+};
}

macro_rules! float_in_place {
    ($kernel:ident, $op:tt: $(($a:ty, $b:ty)),+ $(,)?) => {$(
        impl InPlaceKernel<$a, $b> for $kernel {
            const VARIANCES: bool = true;

            fn update(&self, a: &mut $a, b: $b) {
                *a = *a $op AsPrimitive::<$a>::as_(b);
            }

            fn update_with_variance(&self, a: &mut ValueAndVariance<$a>, b: ValueAndVariance<$b>) {
                *a = *a $op b.cast::<$a>();
            }
        }
    )+};
}

macro_rules! int_binary {
    ($kernel:ident, $method:ident: $(($a:ty, $b:ty) => $out:ty),+ $(,)?) => {$(
        impl BinaryKernel<$a, $b> for $kernel {
            type Out = $out;

            fn value(&self, a: $a, b: $b) -> $out {
                AsPrimitive::<$out>::as_(a).$method(AsPrimitive::<$out>::as_(b))
            }
        }
    )+};
}

macro_rules! int_in_place {
    ($kernel:ident, $method:ident: $(($a:ty, $b:ty)),+ $(,)?) => {$(
        impl InPlaceKernel<$a, $b> for $kernel {
            fn update(&self, a: &mut $a, b: $b) {
                *a = a.$method(AsPrimitive::<$a>::as_(b));
            }
        }
    )+};
}

macro_rules! complex {
    ($($kernel:ident, $op:tt;)+) => {$(
        impl BinaryKernel<Complex64, Complex64> for $kernel {
            type Out = Complex64;

            fn value(&self, a: Complex64, b: Complex64) -> Complex64 {
                a $op b
            }
        }

        impl InPlaceKernel<Complex64, Complex64> for $kernel {
            fn update(&self, a: &mut Complex64, b: Complex64) {
                *a = *a $op b;
            }
        }
    )+};
}

macro_rules! arithmetic {
    ($($kernel:ident, $op:tt, $method:ident;)+) => {$(
        float_binary!($kernel, $op:
            (f64, f64) => f64, (f32, f32) => f32, (f64, f32) => f64, (f32, f64) => f64,
            (f64, i64) => f64, (i64, f64) => f64, (f64, i32) => f64, (i32, f64) => f64,
        );
        float_in_place!($kernel, $op: (f64, f64), (f32, f32), (f64, f32), (f64, i64), (f64, i32));
        int_binary!($kernel, $method:
            (i64, i64) => i64, (i32, i32) => i32, (i64, i32) => i64, (i32, i64) => i64,
        );
        int_in_place!($kernel, $method: (i64, i64), (i32, i32), (i64, i32));
        binary_op!($kernel:
            (f64, f64), (f32, f32), (f64, f32), (f32, f64),
            (f64, i64), (i64, f64), (f64, i32), (i32, f64),
            (i64, i64), (i32, i32), (i64, i32), (i32, i64),
            (Complex64, Complex64),
        );
        in_place_op!($kernel:
            (f64, f64), (f32, f32), (f64, f32), (f64, i64), (f64, i32),
            (i64, i64), (i32, i32), (i64, i32),
            (Complex64, Complex64),
        );
    )+};
}

arithmetic! {
    Plus, +, wrapping_add;
    Minus, -, wrapping_sub;
    Times, *, wrapping_mul;
}

complex! {
    Plus, +;
    Minus, -;
    Times, *;
    Divide, /;
}

// Integer quotients are true divisions.
float_binary!(Divide, /:
    (f64, f64) => f64, (f32, f32) => f32, (f64, f32) => f64, (f32, f64) => f64,
    (f64, i64) => f64, (i64, f64) => f64, (f64, i32) => f64, (i32, f64) => f64,
    (i64, i64) => f64, (i32, i32) => f64, (i64, i32) => f64, (i32, i64) => f64,
);
float_in_place!(Divide, /: (f64, f64), (f32, f32), (f64, f32), (f64, i64), (f64, i32));
binary_op!(Divide:
    (f64, f64), (f32, f32), (f64, f32), (f32, f64),
    (f64, i64), (i64, f64), (f64, i32), (i32, f64),
    (i64, i64), (i32, i32), (i64, i32), (i32, i64),
    (Complex64, Complex64),
);
in_place_op!(
    Divide: (f64, f64), (f32, f32), (f64, f32), (f64, i64), (f64, i32), (Complex64, Complex64)
);

macro_rules! float_unary {
    ($($t:ty),+) => {$(
        impl UnaryKernel<$t> for Negate {
            type Out = $t;
            const VARIANCES: bool = true;

            fn value(&self, a: $t) -> $t {
                -a
            }

            fn value_and_variance(&self, a: ValueAndVariance<$t>) -> ValueAndVariance<$t> {
                -a
            }
        }

        impl UnaryKernel<$t> for Abs {
            type Out = $t;
            const VARIANCES: bool = true;

            fn value(&self, a: $t) -> $t {
                a.abs()
            }

            fn value_and_variance(&self, a: ValueAndVariance<$t>) -> ValueAndVariance<$t> {
                a.abs()
            }
        }

        impl UnaryKernel<$t> for Sqrt {
            type Out = $t;
            const VARIANCES: bool = true;

            fn value(&self, a: $t) -> $t {
                a.sqrt()
            }

            fn value_and_variance(&self, a: ValueAndVariance<$t>) -> ValueAndVariance<$t> {
                a.sqrt()
            }
        }
    )+};
}

macro_rules! int_unary {
    ($($t:ty),+) => {$(
        impl UnaryKernel<$t> for Negate {
            type Out = $t;

            fn value(&self, a: $t) -> $t {
                a.wrapping_neg()
            }
        }

        impl UnaryKernel<$t> for Abs {
            type Out = $t;

            fn value(&self, a: $t) -> $t {
                a.wrapping_abs()
            }
        }
    )+};
}

float_unary!(f64, f32);
int_unary!(i64, i32);

impl UnaryKernel<Complex64> for Negate {
    type Out = Complex64;

    fn value(&self, a: Complex64) -> Complex64 {
        -a
    }
}

unary_op!(Negate: f64, f32, i64, i32, Complex64);
unary_op!(Abs: f64, f32, i64, i32);
unary_op!(Sqrt: f64, f32);

pub fn add(a: &Variable, b: &Variable) -> Result<Variable> {
    Plus.apply(a, b)
}

pub fn subtract(a: &Variable, b: &Variable) -> Result<Variable> {
    Minus.apply(a, b)
}

pub fn multiply(a: &Variable, b: &Variable) -> Result<Variable> {
    Times.apply(a, b)
}

/// Quotient of `a` and `b`. Integer operands give a `float64` result.
pub fn divide(a: &Variable, b: &Variable) -> Result<Variable> {
    Divide.apply(a, b)
}

pub fn negative(a: &Variable) -> Result<Variable> {
    Negate.apply(a)
}

pub fn abs(a: &Variable) -> Result<Variable> {
    Abs.apply(a)
}

pub fn sqrt(a: &Variable) -> Result<Variable> {
    Sqrt.apply(a)
}

pub fn add_assign(a: &mut Variable, b: &Variable) -> Result<()> {
    Plus.apply_in_place(a, b)
}

pub fn subtract_assign(a: &mut Variable, b: &Variable) -> Result<()> {
    Minus.apply_in_place(a, b)
}

pub fn multiply_assign(a: &mut Variable, b: &Variable) -> Result<()> {
    Times.apply_in_place(a, b)
}

pub fn divide_assign(a: &mut Variable, b: &Variable) -> Result<()> {
    Divide.apply_in_place(a, b)
}
