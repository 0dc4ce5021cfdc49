mod rule;
pub use rule::UnitRule;

use core::ops::{Div, Mul};
use std::fmt;

use crate::{Error, Result};

const N_BASE: usize = 8;
const BASE_NAMES: [&str; N_BASE] = ["m", "kg", "s", "A", "K", "mol", "cd", "counts"];

/// Physical unit as a vector of base-dimension exponents.
///
/// Units form a commutative group under multiplication with [`Unit::ONE`]
/// (dimensionless) as identity.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Unit {
    exponents: [i8; N_BASE],
}

const fn base(i: usize) -> Unit {
    let mut exponents = [0; N_BASE];
    exponents[i] = 1;
    Unit { exponents }
}

impl Unit {
    pub const ONE: Unit = Unit {
        exponents: [0; N_BASE],
    };
    pub const M: Unit = base(0);
    pub const KG: Unit = base(1);
    pub const S: Unit = base(2);
    pub const A: Unit = base(3);
    pub const K: Unit = base(4);
    pub const MOL: Unit = base(5);
    pub const CD: Unit = base(6);
    pub const COUNTS: Unit = base(7);

    pub fn is_dimensionless(&self) -> bool {
        *self == Self::ONE
    }

    pub fn exponents(&self) -> &[i8] {
        &self.exponents
    }

    pub fn powi(self, n: i32) -> Result<Self> {
        let mut out = Self::ONE;
        for (dst, &e) in out.exponents.iter_mut().zip(&self.exponents) {
            *dst = i32::from(e)
                .checked_mul(n)
                .and_then(|v| i8::try_from(v).ok())
                .ok_or_else(|| Error::Unit(format!("{} to the power of {} overflows", self, n)))?;
        }
        Ok(out)
    }

    pub fn sqrt(self) -> Result<Self> {
        let mut out = Self::ONE;
        for (dst, &e) in out.exponents.iter_mut().zip(&self.exponents) {
            if e % 2 != 0 {
                return Err(Error::Unit(format!("square root of {} is not a unit", self)));
            }
            *dst = e / 2;
        }
        Ok(out)
    }

    fn combine(self, rhs: Self, sign: i8, op: char) -> Result<Self> {
        let mut out = self;
        for (dst, &e) in out.exponents.iter_mut().zip(&rhs.exponents) {
            let exponent = sign.checked_mul(e).and_then(|e| dst.checked_add(e));
            *dst = exponent
                .ok_or_else(|| Error::Unit(format!("{} {} {} overflows", self, op, rhs)))?;
        }
        Ok(out)
    }
}

/// Fails with a unit error if an exponent overflows.
impl Mul for Unit {
    type Output = Result<Unit>;

    fn mul(self, rhs: Unit) -> Result<Unit> {
        self.combine(rhs, 1, '*')
    }
}

/// Fails with a unit error if an exponent overflows.
impl Div for Unit {
    type Output = Result<Unit>;

    fn div(self, rhs: Unit) -> Result<Unit> {
        self.combine(rhs, -1, '/')
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dimensionless() {
            return f.write_str("dimensionless");
        }
        let mut first = true;
        for (name, &e) in BASE_NAMES.iter().zip(&self.exponents) {
            if e == 0 {
                continue;
            }
            if !first {
                f.write_str("*")?;
            }
            first = false;
            if e == 1 {
                f.write_str(name)?;
            } else {
                write!(f, "{}^{}", name, e)?;
            }
        }
        Ok(())
    }
}
