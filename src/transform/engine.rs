use core::{marker::PhantomData, ops::Range};

use super::kernel::{BinaryKernel, InPlaceKernel, TernaryKernel, UnaryKernel};
use crate::{
    config::Tuning,
    dimension::{merge, merge_all},
    parallel,
    storage::{Buffer, Layout, MultiIndex},
    variable::type_mismatch,
    Dimensions, Element, Error, Result, ValueAndVariance, Variable,
};

/// Aligned strides and offsets of `N` operands over one iteration shape.
#[derive(Clone, Debug)]
pub(crate) struct Plan<const N: usize> {
    shape: Vec<usize>,
    strides: [Vec<isize>; N],
    offsets: [usize; N],
}

impl<const N: usize> Plan<N> {
    pub(crate) fn new(dims: &Dimensions, layouts: [&Layout; N]) -> Result<Self> {
        let strides = layouts
            .iter()
            .map(|layout| layout.aligned_strides(dims))
            .collect::<Result<Vec<_>>>()?;
        let strides = <[Vec<isize>; N]>::try_from(strides)
            .map_err(|_| Error::Dimension(String::from("operand count mismatch")))?;
        Ok(Self {
            shape: dims.shape().to_vec(),
            strides,
            offsets: layouts.map(Layout::offset),
        })
    }

    pub(crate) fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub(crate) fn volume(&self) -> usize {
        self.shape.iter().product()
    }

    pub(crate) fn extent(&self, d: usize) -> usize {
        self.shape[d]
    }

    /// Restriction to `range` along dimension `d`.
    pub(crate) fn chunk(&self, d: usize, range: Range<usize>) -> Self {
        let mut out = self.clone();
        out.shape[d] = range.len();
        for (offset, strides) in out.offsets.iter_mut().zip(&self.strides) {
            *offset = (*offset as isize + range.start as isize * strides[d]) as usize;
        }
        out
    }

    pub(crate) fn iter(&self) -> MultiIndex<N> {
        MultiIndex::new(&self.shape, self.strides.clone(), self.offsets)
    }
}

/// Read access to the buffer of an input operand.
pub(crate) struct Input<'a, T> {
    values: &'a [T],
    variances: Option<&'a [T]>,
}

impl<'a, T> Input<'a, T>
where
    T: Element,
{
    pub(crate) fn of(var: &'a Variable) -> Result<Self> {
        Ok(Self::new(var.buffer::<T>()?))
    }

    pub(crate) fn new(buffer: &'a Buffer<T>) -> Self {
        Self {
            values: buffer.values(),
            variances: buffer.variances(),
        }
    }

    #[inline]
    pub(crate) fn value(&self, i: usize) -> T {
        self.values[i].clone()
    }

    #[inline]
    pub(crate) fn value_and_variance(&self, i: usize) -> ValueAndVariance<T> {
        let variance = self.variances.map_or_else(T::default, |v| v[i].clone());
        ValueAndVariance::new(self.values[i].clone(), variance)
    }
}

/// Shared write access to the buffer of an output operand.
///
/// Workers hold it concurrently; each one writes a disjoint set of indices.
pub(crate) struct Output<'a, T> {
    values: *mut T,
    variances: Option<*mut T>,
    len: usize,
    phantom: PhantomData<&'a mut [T]>,
}

// SAFETY: concurrent users write disjoint elements only.
unsafe impl<T: Send> Send for Output<'_, T> {}
unsafe impl<T: Send> Sync for Output<'_, T> {}

impl<'a, T> Output<'a, T>
where
    T: Element,
{
    /// Detaches `var` from other owners before handing out write access.
    pub(crate) fn of(var: &'a mut Variable) -> Result<Self> {
        Ok(Self::new(var.buffer_mut::<T>()?))
    }

    pub(crate) fn new(buffer: &'a mut Buffer<T>) -> Self {
        let len = buffer.values.len();
        let values = buffer.values.as_mut_ptr();
        let variances = buffer.variances.as_mut().map(|v| v.as_mut_ptr());
        Self {
            values,
            variances,
            len,
            phantom: PhantomData,
        }
    }

    pub(crate) fn has_variances(&self) -> bool {
        self.variances.is_some()
    }

    /// # Safety
    ///
    /// `i` must be in bounds and not accessed by another thread meanwhile.
    #[inline]
    pub(crate) unsafe fn set(&self, i: usize, value: T) {
        debug_assert!(i < self.len);
        *self.values.add(i) = value;
    }

    /// # Safety
    ///
    /// See [`Output::set`].
    #[inline]
    pub(crate) unsafe fn set_value_and_variance(&self, i: usize, x: ValueAndVariance<T>) {
        debug_assert!(i < self.len);
        *self.values.add(i) = x.value;
        if let Some(variances) = self.variances {
            *variances.add(i) = x.variance;
        }
    }

    /// # Safety
    ///
    /// See [`Output::set`].
    #[inline]
    pub(crate) unsafe fn get(&self, i: usize) -> ValueAndVariance<T> {
        debug_assert!(i < self.len);
        let variance = self
            .variances
            .map_or_else(T::default, |v| (*v.add(i)).clone());
        ValueAndVariance::new((*self.values.add(i)).clone(), variance)
    }

    /// Contiguous copy of the elements addressed by `region`.
    ///
    /// # Safety
    ///
    /// `region` must lie in the buffer and no other thread may write to it
    /// meanwhile.
    pub(crate) unsafe fn gather(&self, region: &Layout) -> Buffer<T> {
        let mut values = Vec::with_capacity(region.volume());
        let mut variances = self
            .variances
            .map(|_| Vec::with_capacity(region.volume()));
        for [i] in region_offsets(region) {
            let x = self.get(i);
            values.push(x.value);
            if let Some(v) = variances.as_mut() {
                v.push(x.variance);
            }
        }
        Buffer::new(values, variances)
    }

    /// Writes a contiguous `buffer` back to the elements addressed by `region`.
    ///
    /// # Safety
    ///
    /// `region` must lie in the buffer, address every element at most once
    /// and not be accessed by another thread meanwhile.
    pub(crate) unsafe fn scatter(&self, region: &Layout, buffer: &Buffer<T>) {
        let input = Input::new(buffer);
        for (k, [i]) in region_offsets(region).enumerate() {
            self.set_value_and_variance(i, input.value_and_variance(k));
        }
    }

    /// # Safety
    ///
    /// See [`Output::set`].
    #[inline]
    pub(crate) unsafe fn update<F>(&self, i: usize, f: F)
    where
        F: FnOnce(&mut T),
    {
        debug_assert!(i < self.len);
        f(&mut *self.values.add(i));
    }

    /// # Safety
    ///
    /// See [`Output::set`].
    #[inline]
    pub(crate) unsafe fn update_with_variance<F>(&self, i: usize, f: F)
    where
        F: FnOnce(&mut ValueAndVariance<T>),
    {
        debug_assert!(i < self.len);
        let value = &mut *self.values.add(i);
        match self.variances {
            Some(variances) => {
                let variance = &mut *variances.add(i);
                let mut x = ValueAndVariance::new(value.clone(), variance.clone());
                f(&mut x);
                *value = x.value;
                *variance = x.variance;
            }
            None => {
                let mut x = ValueAndVariance::new(value.clone(), T::default());
                f(&mut x);
                *value = x.value;
            }
        }
    }
}

fn region_offsets(region: &Layout) -> MultiIndex<1> {
    MultiIndex::new(
        region.dims().shape(),
        [region.strides().to_vec()],
        [region.offset()],
    )
}

/// Runs `body` over `plan`, split along the outer dimension when the plan
/// is large enough. Every element of the output operand must be reached by
/// exactly one outer index.
pub(crate) fn run<const N: usize, F>(
    tuning: &Tuning,
    name: &str,
    plan: &Plan<N>,
    body: F,
) -> Result<()>
where
    F: Fn(&Plan<N>) -> Result<()> + Send + Sync,
{
    if plan.ndim() == 0 || plan.volume() < tuning.transform_min_volume || plan.extent(0) < 2 {
        return body(plan);
    }
    log::debug!(
        "'{}' splits {} elements along outer extent {}",
        name,
        plan.volume(),
        plan.extent(0)
    );
    parallel::parallel_for(0..plan.extent(0), |range| body(&plan.chunk(0, range)))
}

fn output_variances(name: &str, supported: bool, inputs: &[&Variable]) -> Result<bool> {
    let any = inputs.iter().any(|v| v.has_variances());
    if any && !supported {
        return Err(Error::Variances(format!(
            "'{}' does not support variances",
            name
        )));
    }
    Ok(any)
}

fn check_output<T>(out: &Variable, dims: &Dimensions, variances: bool) -> Result<()>
where
    T: Element,
{
    out.check_writable()?;
    if !out.dims().is_permutation_of(dims) {
        return Err(Error::Dimension(format!(
            "output has dimensions {}, expected {}",
            out.dims(),
            dims
        )));
    }
    if out.dtype() != T::DTYPE {
        return Err(type_mismatch(T::DTYPE, out.dtype()));
    }
    if out.has_variances() != variances {
        return Err(Error::Variances(String::from(
            "output variances do not match the inputs",
        )));
    }
    Ok(())
}

pub fn unary<A, K>(tuning: &Tuning, kernel: &K, a: &Variable) -> Result<Variable>
where
    A: Element,
    K: UnaryKernel<A>,
{
    let unit = K::UNIT.apply(K::NAME, &[a.unit()])?;
    let variances = output_variances(K::NAME, K::VARIANCES, &[a])?;
    let mut out = Variable::zeros::<K::Out>(a.dims().clone(), unit, variances)?;
    let plan = Plan::new(out.dims(), [out.layout(), a.layout()])?;
    let input = Input::<A>::of(a)?;
    let output = Output::<K::Out>::of(&mut out)?;
    run(tuning, K::NAME, &plan, |chunk| {
        for [o, i] in chunk.iter() {
            // SAFETY: `o` is unique to this chunk.
            unsafe {
                if output.has_variances() {
                    let x = kernel.value_and_variance(input.value_and_variance(i));
                    output.set_value_and_variance(o, x);
                } else {
                    output.set(o, kernel.value(input.value(i)));
                }
            }
        }
        Ok(())
    })?;
    Ok(out)
}

fn binary_kernel<A, B, K>(
    tuning: &Tuning,
    kernel: &K,
    a: &Variable,
    b: &Variable,
    out: &mut Variable,
) -> Result<()>
where
    A: Element,
    B: Element,
    K: BinaryKernel<A, B>,
{
    let plan = Plan::new(out.dims(), [out.layout(), a.layout(), b.layout()])?;
    let lhs = Input::<A>::of(a)?;
    let rhs = Input::<B>::of(b)?;
    let output = Output::<K::Out>::of(out)?;
    run(tuning, K::NAME, &plan, |chunk| {
        for [o, i, j] in chunk.iter() {
            // SAFETY: `o` is unique to this chunk.
            unsafe {
                if output.has_variances() {
                    output.set_value_and_variance(
                        o,
                        kernel.value_and_variance(
                            lhs.value_and_variance(i),
                            rhs.value_and_variance(j),
                        ),
                    );
                } else {
                    output.set(o, kernel.value(lhs.value(i), rhs.value(j)));
                }
            }
        }
        Ok(())
    })
}

/// Applies `kernel` to `a` and `b` broadcast against each other. The
/// result has the merged dimensions of both, those of `a` first.
pub fn binary<A, B, K>(tuning: &Tuning, kernel: &K, a: &Variable, b: &Variable) -> Result<Variable>
where
    A: Element,
    B: Element,
    K: BinaryKernel<A, B>,
{
    let unit = K::UNIT.apply(K::NAME, &[a.unit(), b.unit()])?;
    let variances = output_variances(K::NAME, K::VARIANCES, &[a, b])?;
    let dims = merge(a.dims(), b.dims())?;
    let mut out = Variable::zeros::<K::Out>(dims, unit, variances)?;
    binary_kernel(tuning, kernel, a, b, &mut out)?;
    Ok(out)
}

/// Like [`binary`], writing into `out`, which must have the merged
/// dimensions (in any order), the output dtype and matching variances.
pub fn binary_into<A, B, K>(
    tuning: &Tuning,
    kernel: &K,
    a: &Variable,
    b: &Variable,
    out: &mut Variable,
) -> Result<()>
where
    A: Element,
    B: Element,
    K: BinaryKernel<A, B>,
{
    let unit = K::UNIT.apply(K::NAME, &[a.unit(), b.unit()])?;
    let variances = output_variances(K::NAME, K::VARIANCES, &[a, b])?;
    let dims = merge(a.dims(), b.dims())?;
    check_output::<K::Out>(out, &dims, variances)?;
    binary_kernel(tuning, kernel, a, b, out)?;
    out.set_unit(unit)
}

pub fn ternary<A, B, C, K>(
    tuning: &Tuning,
    kernel: &K,
    a: &Variable,
    b: &Variable,
    c: &Variable,
) -> Result<Variable>
where
    A: Element,
    B: Element,
    C: Element,
    K: TernaryKernel<A, B, C>,
{
    let unit = K::UNIT.apply(K::NAME, &[a.unit(), b.unit(), c.unit()])?;
    let variances = output_variances(K::NAME, K::VARIANCES, &[a, b, c])?;
    let dims = merge_all([a.dims(), b.dims(), c.dims()])?;
    let mut out = Variable::zeros::<K::Out>(dims, unit, variances)?;
    let plan = Plan::new(out.dims(), [out.layout(), a.layout(), b.layout(), c.layout()])?;
    let x = Input::<A>::of(a)?;
    let y = Input::<B>::of(b)?;
    let z = Input::<C>::of(c)?;
    let output = Output::<K::Out>::of(&mut out)?;
    run(tuning, K::NAME, &plan, |chunk| {
        for [o, i, j, k] in chunk.iter() {
            // SAFETY: `o` is unique to this chunk.
            unsafe {
                if output.has_variances() {
                    output.set_value_and_variance(
                        o,
                        kernel.value_and_variance(
                            x.value_and_variance(i),
                            y.value_and_variance(j),
                            z.value_and_variance(k),
                        ),
                    );
                } else {
                    output.set(o, kernel.value(x.value(i), y.value(j), z.value(k)));
                }
            }
        }
        Ok(())
    })?;
    Ok(out)
}

/// Updates `a` from `b` broadcast to the dimensions of `a`.
pub fn in_place<A, B, K>(tuning: &Tuning, kernel: &K, a: &mut Variable, b: &Variable) -> Result<()>
where
    A: Element,
    B: Element,
    K: InPlaceKernel<A, B>,
{
    let region = a.layout().clone();
    in_place_region(tuning, kernel, a, b, &region)
}

/// Like [`in_place`], restricted to the elements of `a`'s buffer addressed
/// by `region`.
pub(crate) fn in_place_region<A, B, K>(
    tuning: &Tuning,
    kernel: &K,
    a: &mut Variable,
    b: &Variable,
    region: &Layout,
) -> Result<()>
where
    A: Element,
    B: Element,
    K: InPlaceKernel<A, B>,
{
    a.check_writable()?;
    let unit = K::UNIT.apply(K::NAME, &[a.unit(), b.unit()])?;
    if b.has_variances() && !a.has_variances() {
        return Err(Error::Variances(format!(
            "'{}' cannot add variances in place",
            K::NAME
        )));
    }
    output_variances(K::NAME, K::VARIANCES, &[&*a, b])?;
    let plan = Plan::new(region.dims(), [region, b.layout()])?;
    let input = Input::<B>::of(b)?;
    let output = Output::<A>::of(a)?;
    run(tuning, K::NAME, &plan, |chunk| {
        for [o, i] in chunk.iter() {
            // SAFETY: `o` is unique to this chunk.
            unsafe {
                if output.has_variances() {
                    output.update_with_variance(o, |x| {
                        kernel.update_with_variance(x, input.value_and_variance(i))
                    });
                } else {
                    output.update(o, |x| kernel.update(x, input.value(i)));
                }
            }
        }
        Ok(())
    })?;
    a.set_unit(unit)
}
