use crate::{
    transform::{
        binary_op, in_place_op, unary_op, BinaryKernel, BinaryOp, InPlaceKernel, Operation,
        UnaryKernel, UnaryOp,
    },
    units::UnitRule,
    Result, Variable,
};

pub struct And;
pub struct Or;
pub struct Xor;
pub struct Not;

macro_rules! logical {
    ($($kernel:ident => $name:literal, $op:tt;)+) => {$(
        impl Operation for $kernel {
            const NAME: &'static str = $name;
            const UNIT: UnitRule = UnitRule::Dimensionless;
        }

        impl BinaryKernel<bool, bool> for $kernel {
            type Out = bool;

            fn value(&self, a: bool, b: bool) -> bool {
                a $op b
            }
        }

        impl InPlaceKernel<bool, bool> for $kernel {
            fn update(&self, a: &mut bool, b: bool) {
                *a = *a $op b;
            }
        }

        binary_op!($kernel: (bool, bool));
        in_place_op!($kernel: (bool, bool));
    )+};
}

logical! {
    And => "and", &;
    Or => "or", |;
    Xor => "xor", ^;
}

impl Operation for Not {
    const NAME: &'static str = "not";
    const UNIT: UnitRule = UnitRule::Dimensionless;
}

impl UnaryKernel<bool> for Not {
    type Out = bool;

    fn value(&self, a: bool) -> bool {
        !a
    }
}

unary_op!(Not: bool);

pub fn and(a: &Variable, b: &Variable) -> Result<Variable> {
    And.apply(a, b)
}

pub fn or(a: &Variable, b: &Variable) -> Result<Variable> {
    Or.apply(a, b)
}

pub fn xor(a: &Variable, b: &Variable) -> Result<Variable> {
    Xor.apply(a, b)
}

pub fn not(a: &Variable) -> Result<Variable> {
    Not.apply(a)
}
