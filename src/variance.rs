use core::ops::{Add, Div, Mul, Neg, Sub};

use num_traits::{AsPrimitive, Float};

/// A value paired with its variance, propagated to first order assuming
/// uncorrelated operands.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ValueAndVariance<T> {
    pub value: T,
    pub variance: T,
}

impl<T> ValueAndVariance<T> {
    pub const fn new(value: T, variance: T) -> Self {
        Self { value, variance }
    }

    /// Numeric conversion of both parts.
    pub fn cast<U>(self) -> ValueAndVariance<U>
    where
        T: AsPrimitive<U>,
        U: Copy + 'static,
    {
        ValueAndVariance::new(self.value.as_(), self.variance.as_())
    }
}

impl<T> ValueAndVariance<T>
where
    T: Float,
{
    pub fn sqrt(self) -> Self {
        let value = self.value.sqrt();
        let four = T::one() + T::one() + T::one() + T::one();
        Self::new(value, self.variance / (four * self.value))
    }

    pub fn abs(self) -> Self {
        Self::new(self.value.abs(), self.variance)
    }
}

impl<T> Add for ValueAndVariance<T>
where
    T: Float,
{
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.value + rhs.value, self.variance + rhs.variance)
    }
}

impl<T> Sub for ValueAndVariance<T>
where
    T: Float,
{
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.value - rhs.value, self.variance + rhs.variance)
    }
}

impl<T> Mul for ValueAndVariance<T>
where
    T: Float,
{
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.value * rhs.value,
            self.variance * rhs.value * rhs.value + rhs.variance * self.value * self.value,
        )
    }
}

impl<T> Div for ValueAndVariance<T>
where
    T: Float,
{
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        let value = self.value / rhs.value;
        Self::new(
            value,
            (self.variance + rhs.variance * value * value) / (rhs.value * rhs.value),
        )
    }
}

impl<T> Neg for ValueAndVariance<T>
where
    T: Float,
{
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.value, self.variance)
    }
}
