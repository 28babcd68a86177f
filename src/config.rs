use std::{fmt::Display, num::NonZeroUsize, thread::available_parallelism};

use serde::Serialize;

use crate::{
    errors::{ConvolutionError, Result},
    parallel::WorkerPool,
};

/// Runtime configuration shared by every convolution constructor.
///
/// The thread count is consulted once, when a convolution instance is built, and stays fixed
/// for the lifetime of that instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConvolutionConfig {
    /// Maximum number of worker threads.
    pub(crate) threads: usize,
}

impl ConvolutionConfig {
    /// A configuration running everything on the calling thread.
    #[must_use]
    pub const fn single_threaded() -> Self {
        Self { threads: 1 }
    }

    /// Overrides the maximum number of worker threads.
    #[must_use]
    pub const fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// The configured maximum number of worker threads.
    #[must_use]
    pub const fn threads(&self) -> usize {
        self.threads
    }

    /// Number of threads actually used, after accounting for the `parallel` feature.
    #[must_use]
    pub const fn effective_threads(&self) -> usize {
        if cfg!(feature = "parallel") {
            self.threads
        } else {
            1
        }
    }

    /// Checks the configuration for consistency.
    pub const fn check_validity(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(ConvolutionError::ZeroThreads);
        }
        Ok(())
    }

    /// Builds the worker pool a convolution instance keeps for its lifetime.
    pub(crate) fn build_pool(&self) -> Result<WorkerPool> {
        self.check_validity()?;
        WorkerPool::new(self.effective_threads())
    }
}

impl Default for ConvolutionConfig {
    fn default() -> Self {
        Self {
            threads: available_parallelism().map_or(1, NonZeroUsize::get),
        }
    }
}

impl Display for ConvolutionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "threads={}", self.threads)
    }
}
