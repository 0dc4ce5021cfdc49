use std::{ops::Range, sync::OnceLock};

use rayon::prelude::*;

use crate::{config, Result};

fn pool() -> Option<&'static rayon::ThreadPool> {
    static POOL: OnceLock<Option<rayon::ThreadPool>> = OnceLock::new();
    POOL.get_or_init(|| {
        let n = config::global().num_threads?;
        match rayon::ThreadPoolBuilder::new().num_threads(n).build() {
            Ok(pool) => {
                log::debug!("using dedicated pool with {} threads", n);
                Some(pool)
            }
            Err(e) => {
                log::warn!("cannot build pool with {} threads: {}", n, e);
                None
            }
        }
    })
    .as_ref()
}

fn install<R, F>(op: F) -> R
where
    F: FnOnce() -> R + Send,
    R: Send,
{
    match pool() {
        Some(pool) => pool.install(op),
        None => op(),
    }
}

pub fn num_threads() -> usize {
    install(rayon::current_num_threads)
}

/// Splits `range` into at most `n` contiguous, non-empty, ordered pieces.
pub fn blocked_ranges(range: Range<usize>, n: usize) -> Vec<Range<usize>> {
    let len = range.len();
    let n = n.clamp(1, len.max(1));
    let base = len / n;
    let extra = len % n;
    let mut begin = range.start;
    (0..n)
        .map(|i| {
            let size = base + usize::from(i < extra);
            let piece = begin..begin + size;
            begin += size;
            piece
        })
        .filter(|r| !r.is_empty())
        .collect()
}

/// Runs `f` over the given pieces on the worker pool. Every piece runs to
/// completion before the first error, if any, is returned.
pub fn for_each_range<F>(ranges: Vec<Range<usize>>, f: F) -> Result<()>
where
    F: Fn(Range<usize>) -> Result<()> + Send + Sync,
{
    let results: Vec<Result<()>> = install(|| ranges.into_par_iter().map(|r| f(r)).collect());
    results.into_iter().collect()
}

/// Runs `f` on every item with its index. Every call completes before the
/// first error, if any, is returned.
pub fn for_each_mut<T, F>(items: &mut [T], f: F) -> Result<()>
where
    T: Send,
    F: Fn(usize, &mut T) -> Result<()> + Send + Sync,
{
    let results: Vec<Result<()>> = install(|| {
        items
            .par_iter_mut()
            .enumerate()
            .map(|(i, x)| f(i, x))
            .collect()
    });
    results.into_iter().collect()
}

/// Runs `f` over a partition of `range` sized for the worker pool.
pub fn parallel_for<F>(range: Range<usize>, f: F) -> Result<()>
where
    F: Fn(Range<usize>) -> Result<()> + Send + Sync,
{
    if range.is_empty() {
        return Ok(());
    }
    let ranges = blocked_ranges(range, num_threads() * 4);
    for_each_range(ranges, f)
}
