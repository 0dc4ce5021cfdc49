//! Reductions on top of the transform machinery.
//!
//! Accumulation reverses the broadcast direction of an in-place transform:
//! the output may lack dimensions of the inputs, so one output element
//! receives many updates. The output unit is never touched.

use core::ops::Range;

use crate::{
    config::Tuning,
    dimension::merge,
    parallel,
    storage::{Buffer, Layout},
    transform::{CumulativeKernel, InPlaceKernel, InPlaceKernel2, Input, Output, Plan},
    Dim, Dimensions, Element, Error, Result, Variable,
};

/// How an accumulation is spread over workers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Strategy {
    Serial,
    /// Split the input's outer dimension into `nchunk` pieces, each reduced
    /// into a private full-size copy of the output, then combine the copies.
    OuterChunks { nchunk: usize },
    /// Split the output's outer dimension across workers.
    OutputChunks,
}

/// Picks the strategy for accumulating `others` into an output of `out`.
pub fn select_strategy(tuning: &Tuning, out: &Dimensions, others: &[&Dimensions]) -> Strategy {
    if others.iter().any(|d| !d.includes(out))
        || others.iter().all(|d| d.volume() < tuning.small_input)
        || (others.len() != 1 && out.ndim() == 0)
    {
        return Strategy::Serial;
    }
    if let [other] = others {
        let outer = match other.outer() {
            Some(outer) => outer,
            None => return Strategy::Serial,
        };
        let reduce_outer = !out.contains(outer);
        if out.ndim() == 0 || (reduce_outer && out.shape()[0] < tuning.chunking_limit) {
            let nchunk = tuning.max_outer_chunks.min(other.shape()[0]);
            if nchunk < 2 {
                return Strategy::Serial;
            }
            return Strategy::OuterChunks { nchunk };
        }
    }
    Strategy::OutputChunks
}

fn check_variances(
    name: &str,
    supported: bool,
    out: &Variable,
    others: &[&Variable],
) -> Result<()> {
    let any = others.iter().any(|v| v.has_variances());
    if any && !out.has_variances() {
        return Err(Error::Variances(format!(
            "'{}' cannot accumulate variances into an output without",
            name
        )));
    }
    if (any || out.has_variances()) && !supported {
        return Err(Error::Variances(format!(
            "'{}' does not support variances",
            name
        )));
    }
    Ok(())
}

fn apply_serial<O, B, K>(kernel: &K, output: &Output<'_, O>, input: &Input<'_, B>, plan: &Plan<2>)
where
    O: Element,
    B: Element,
    K: InPlaceKernel<O, B>,
{
    for [o, i] in plan.iter() {
        // SAFETY: the caller owns every output element addressed by `plan`.
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
}

fn apply_serial2<O, A, B, K>(
    kernel: &K,
    output: &Output<'_, O>,
    a: &Input<'_, A>,
    b: &Input<'_, B>,
    plan: &Plan<3>,
) where
    O: Element,
    A: Element,
    B: Element,
    K: InPlaceKernel2<O, A, B>,
{
    for [o, i, j] in plan.iter() {
        // SAFETY: the caller owns every output element addressed by `plan`.
        unsafe {
            if output.has_variances() {
                output.update_with_variance(o, |x| {
                    kernel.update_with_variance(x, a.value_and_variance(i), b.value_and_variance(j))
                });
            } else {
                output.update(o, |x| kernel.update(x, a.value(i), b.value(j)));
            }
        }
    }
}

/// Runs `reduce` over disjoint ranges of the output's outer dimension.
/// Small ranges are reduced into a private copy that is written back
/// afterwards.
fn run_output_chunks<O, F>(
    tuning: &Tuning,
    name: &str,
    out_layout: &Layout,
    output: &Output<'_, O>,
    reduce: F,
) -> Result<()>
where
    O: Element,
    F: Fn(&Output<'_, O>, &Layout, &Dim, Range<usize>) -> Result<()> + Send + Sync,
{
    let dim = out_layout
        .dims()
        .outer()
        .ok_or_else(|| Error::Dimension(format!("'{}' cannot split a scalar output", name)))?;
    let extent = out_layout.dims().shape()[0];
    log::debug!(
        "'{}' accumulates over {} chunks of output dimension {}",
        name,
        extent.min(parallel::num_threads() * 4),
        dim
    );
    parallel::parallel_for(0..extent, |range| {
        let region = out_layout.slice_range(dim, range.start, range.end)?;
        if region.volume() < tuning.false_sharing_volume {
            // SAFETY: ranges are disjoint, so is each region.
            let mut tmp = unsafe { output.gather(&region) };
            let local = Layout::contiguous(region.dims().clone());
            reduce(&Output::new(&mut tmp), &local, dim, range)?;
            unsafe { output.scatter(&region, &tmp) };
            Ok(())
        } else {
            reduce(output, &region, dim, range)
        }
    })
}

pub fn accumulate_in_place<O, B, K>(
    tuning: &Tuning,
    kernel: &K,
    out: &mut Variable,
    other: &Variable,
) -> Result<()>
where
    O: Element,
    B: Element,
    K: InPlaceKernel<O, B> + InPlaceKernel<O, O>,
{
    out.check_writable()?;
    check_variances(K::NAME, <K as InPlaceKernel<O, B>>::VARIANCES, out, &[other])?;
    let out_layout = out.layout().clone();
    let other_layout = other.layout();
    let strategy = select_strategy(tuning, out_layout.dims(), &[other.dims()]);
    let input = Input::<B>::of(other)?;
    match strategy {
        Strategy::Serial => {
            let dims = merge(other.dims(), out_layout.dims())?;
            let plan = Plan::new(&dims, [&out_layout, other_layout])?;
            let output = Output::<O>::of(out)?;
            apply_serial::<O, B, K>(kernel, &output, &input, &plan);
            Ok(())
        }
        Strategy::OuterChunks { nchunk } => {
            log::debug!(
                "'{}' accumulates {} elements into {} partial outputs",
                K::NAME,
                other.volume(),
                nchunk
            );
            let outer = other.dims().outer().cloned().ok_or_else(|| {
                Error::Dimension(format!("'{}' cannot split a scalar input", K::NAME))
            })?;
            let outer_size = other.dims().shape()[0];
            let chunk_size = (outer_size + nchunk - 1) / nchunk;
            let local = Layout::contiguous(out_layout.dims().clone());
            let output = Output::<O>::of(out)?;
            // SAFETY: no workers are running yet.
            let init = unsafe { output.gather(&out_layout) };
            let mut partials: Vec<Buffer<O>> = vec![init; nchunk];
            parallel::for_each_mut(&mut partials, |i, partial| {
                let begin = (i * chunk_size).min(outer_size);
                let end = ((i + 1) * chunk_size).min(outer_size);
                let region = other_layout.slice_range(&outer, begin, end)?;
                let plan = Plan::new(region.dims(), [&local, &region])?;
                apply_serial::<O, B, K>(kernel, &Output::new(partial), &input, &plan);
                Ok(())
            })?;
            let plan = Plan::new(out_layout.dims(), [&out_layout, &local])?;
            for partial in &partials {
                apply_serial::<O, O, K>(kernel, &output, &Input::new(partial), &plan);
            }
            Ok(())
        }
        Strategy::OutputChunks => {
            let output = Output::<O>::of(out)?;
            run_output_chunks(tuning, K::NAME, &out_layout, &output, |target, layout, dim, range| {
                let region = other_layout.slice_range(dim, range.start, range.end)?;
                let plan = Plan::new(region.dims(), [layout, &region])?;
                apply_serial::<O, B, K>(kernel, target, &input, &plan);
                Ok(())
            })
        }
    }
}

/// Accumulates `kernel(out, a, b)` with `a` and `b` broadcast against each
/// other.
pub fn accumulate_in_place2<O, A, B, K>(
    tuning: &Tuning,
    kernel: &K,
    out: &mut Variable,
    a: &Variable,
    b: &Variable,
) -> Result<()>
where
    O: Element,
    A: Element,
    B: Element,
    K: InPlaceKernel2<O, A, B>,
{
    out.check_writable()?;
    check_variances(K::NAME, K::VARIANCES, out, &[a, b])?;
    let out_layout = out.layout().clone();
    let (a_layout, b_layout) = (a.layout(), b.layout());
    let strategy = select_strategy(tuning, out_layout.dims(), &[a.dims(), b.dims()]);
    let x = Input::<A>::of(a)?;
    let y = Input::<B>::of(b)?;
    let output = Output::<O>::of(out)?;
    match strategy {
        Strategy::OutputChunks => {
            run_output_chunks(tuning, K::NAME, &out_layout, &output, |target, layout, dim, range| {
                let a_region = a_layout.slice_range(dim, range.start, range.end)?;
                let b_region = b_layout.slice_range(dim, range.start, range.end)?;
                let dims = merge(a_region.dims(), b_region.dims())?;
                let plan = Plan::new(&dims, [layout, &a_region, &b_region])?;
                apply_serial2(kernel, target, &x, &y, &plan);
                Ok(())
            })
        }
        _ => {
            let dims = merge(&merge(a.dims(), b.dims())?, out_layout.dims())?;
            let plan = Plan::new(&dims, [&out_layout, a_layout, b_layout])?;
            apply_serial2(kernel, &output, &x, &y, &plan);
            Ok(())
        }
    }
}

/// Runs an order-dependent accumulation along the dimensions of `x` that
/// `state` lacks. Both operands are updated. Always serial.
pub fn accumulate_cumulative<T, K>(kernel: &K, state: &mut Variable, x: &mut Variable) -> Result<()>
where
    T: Element,
    K: CumulativeKernel<T>,
{
    state.check_writable()?;
    x.check_writable()?;
    if state.has_variances() != x.has_variances() {
        return Err(Error::Variances(format!(
            "'{}' needs variances on both operands or on neither",
            K::NAME
        )));
    }
    if x.has_variances() && !K::VARIANCES {
        return Err(Error::Variances(format!(
            "'{}' does not support variances",
            K::NAME
        )));
    }
    let plan = Plan::new(x.dims(), [state.layout(), x.layout()])?;
    let acc = Output::<T>::of(state)?;
    let out = Output::<T>::of(x)?;
    for [s, i] in plan.iter() {
        // SAFETY: single-threaded; `state` and `x` are distinct buffers.
        unsafe {
            if out.has_variances() {
                acc.update_with_variance(s, |a| {
                    out.update_with_variance(i, |v| kernel.step_with_variance(a, v))
                });
            } else {
                acc.update(s, |a| out.update(i, |v| kernel.step(a, v)));
            }
        }
    }
    Ok(())
}
