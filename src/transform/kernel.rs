use crate::{units::UnitRule, Element, ValueAndVariance};

/// Name and unit rule shared by every typed instance of an operation.
pub trait Operation: Sync {
    const NAME: &'static str;
    const UNIT: UnitRule;
}

/// `out = f(a)`.
pub trait UnaryKernel<A>: Operation
where
    A: Element,
{
    type Out: Element;
    const VARIANCES: bool = false;

    fn value(&self, a: A) -> Self::Out;

    fn value_and_variance(&self, a: ValueAndVariance<A>) -> ValueAndVariance<Self::Out> {
        ValueAndVariance::new(self.value(a.value), Self::Out::default())
    }
}

/// `out = f(a, b)`.
pub trait BinaryKernel<A, B>: Operation
where
    A: Element,
    B: Element,
{
    type Out: Element;
    const VARIANCES: bool = false;

    fn value(&self, a: A, b: B) -> Self::Out;

    fn value_and_variance(
        &self,
        a: ValueAndVariance<A>,
        b: ValueAndVariance<B>,
    ) -> ValueAndVariance<Self::Out> {
        ValueAndVariance::new(self.value(a.value, b.value), Self::Out::default())
    }
}

/// `out = f(a, b, c)`.
pub trait TernaryKernel<A, B, C>: Operation
where
    A: Element,
    B: Element,
    C: Element,
{
    type Out: Element;
    const VARIANCES: bool = false;

    fn value(&self, a: A, b: B, c: C) -> Self::Out;

    fn value_and_variance(
        &self,
        a: ValueAndVariance<A>,
        b: ValueAndVariance<B>,
        c: ValueAndVariance<C>,
    ) -> ValueAndVariance<Self::Out> {
        ValueAndVariance::new(self.value(a.value, b.value, c.value), Self::Out::default())
    }
}

/// `a = f(a, b)`, used by in-place transforms and by accumulation.
pub trait InPlaceKernel<A, B>: Operation
where
    A: Element,
    B: Element,
{
    const VARIANCES: bool = false;

    fn update(&self, a: &mut A, b: B);

    fn update_with_variance(&self, a: &mut ValueAndVariance<A>, b: ValueAndVariance<B>) {
        self.update(&mut a.value, b.value);
    }
}

/// `a = f(a, b, c)`, used by two-operand accumulation such as dot products.
pub trait InPlaceKernel2<A, B, C>: Operation
where
    A: Element,
    B: Element,
    C: Element,
{
    const VARIANCES: bool = false;

    fn update(&self, a: &mut A, b: B, c: C);

    fn update_with_variance(
        &self,
        a: &mut ValueAndVariance<A>,
        b: ValueAndVariance<B>,
        c: ValueAndVariance<C>,
    ) {
        self.update(&mut a.value, b.value, c.value);
    }
}

/// Order-dependent step: combines the running state `acc` with `x` and
/// writes the output for this position into `x`.
pub trait CumulativeKernel<A>: Operation
where
    A: Element,
{
    const VARIANCES: bool = false;

    fn step(&self, acc: &mut A, x: &mut A);

    fn step_with_variance(&self, acc: &mut ValueAndVariance<A>, x: &mut ValueAndVariance<A>) {
        self.step(&mut acc.value, &mut x.value);
    }
}
