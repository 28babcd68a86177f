//! Worker pool and the small set of data-parallel loops the convolutions need.
//!
//! With the `parallel` feature every loop runs on the instance's own rayon pool, otherwise the
//! same loops run serially. Work items are always data-disjoint, so the numerical result does
//! not depend on the number of threads.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::errors::Result;

/// A fixed-size pool of worker threads owned by one convolution instance.
#[derive(Debug)]
pub struct WorkerPool {
    threads: usize,
    #[cfg(feature = "parallel")]
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    /// Creates a pool with exactly `threads` workers.
    pub(crate) fn new(threads: usize) -> Result<Self> {
        debug_assert!(threads > 0);
        Ok(Self {
            threads,
            #[cfg(feature = "parallel")]
            pool: rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("dealias-{i}"))
                .build()?,
        })
    }

    /// Number of worker threads in the pool.
    #[must_use]
    pub const fn threads(&self) -> usize {
        self.threads
    }

    /// Runs `op` inside the pool so that nested parallel loops use its workers.
    pub(crate) fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        #[cfg(feature = "parallel")]
        return self.pool.install(op);

        #[cfg(not(feature = "parallel"))]
        op()
    }
}

/// Applies a fallible `op` to matching pairs of `left` and `right`.
pub(crate) fn try_for_each_zip<A, B, F>(left: &mut [A], right: &mut [B], op: F) -> Result<()>
where
    A: Send,
    B: Send,
    F: Fn(&mut A, &mut B) -> Result<()> + Sync + Send,
{
    debug_assert_eq!(left.len(), right.len());

    #[cfg(feature = "parallel")]
    return left
        .par_iter_mut()
        .zip(right.par_iter_mut())
        .try_for_each(|(a, b)| op(a, b));

    #[cfg(not(feature = "parallel"))]
    left.iter_mut()
        .zip(right.iter_mut())
        .try_for_each(|(a, b)| op(a, b))
}

/// Applies `op` to every owned item together with its position.
pub(crate) fn for_each_indexed<T, F>(items: Vec<T>, op: F)
where
    T: Send,
    F: Fn(usize, T) + Sync + Send,
{
    #[cfg(feature = "parallel")]
    items
        .into_par_iter()
        .enumerate()
        .for_each(|(i, item)| op(i, item));

    #[cfg(not(feature = "parallel"))]
    items
        .into_iter()
        .enumerate()
        .for_each(|(i, item)| op(i, item));
}

/// Length of each contiguous partition when `len` items are shared by `threads` workers.
pub(crate) const fn partition_len(len: usize, threads: usize) -> usize {
    let threads = if threads == 0 { 1 } else { threads };
    let chunk = len.div_ceil(threads);
    if chunk == 0 { 1 } else { chunk }
}
