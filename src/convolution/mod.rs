//! Dealiased linear convolutions.
//!
//! - [`implicit::ImplicitConvolution`]: complex sequences, implicit padding.
//! - [`hermitian::ImplicitHConvolution`]: Hermitian sequences, implicit padding.
//! - [`explicit`]: zero-padded baselines.
//! - [`direct`]: O(m²) ground truth.

use crate::errors::{ConvolutionError, Result, check_len};

pub mod direct;
pub mod explicit;
pub mod hermitian;
pub mod implicit;

#[cfg(test)]
mod tests;

pub use direct::{DirectConvolution, DirectHConvolution};
pub use explicit::{ExplicitConvolution, ExplicitHConvolution};
pub use hermitian::{ImplicitHConvolution, StorageMode};
pub use implicit::ImplicitConvolution;

/// Requires `inputs >= 1` and `1 <= outputs <= inputs`.
pub(crate) const fn check_arity(inputs: usize, outputs: usize) -> Result<()> {
    if inputs == 0 {
        return Err(ConvolutionError::ZeroInputs);
    }
    if outputs == 0 || outputs > inputs {
        return Err(ConvolutionError::InvalidOutputs { outputs, inputs });
    }
    Ok(())
}

/// Validates the lanes handed to `convolve` before any transform runs.
pub(crate) fn check_lanes<T>(
    inputs: usize,
    len: usize,
    multiplier_inputs: usize,
    lanes: &[&mut [T]],
) -> Result<()> {
    if multiplier_inputs != inputs {
        return Err(ConvolutionError::ArityMismatch {
            expected: inputs,
            found: multiplier_inputs,
        });
    }
    if lanes.len() != inputs {
        return Err(ConvolutionError::SequenceCount {
            expected: inputs,
            found: lanes.len(),
        });
    }
    lanes.iter().try_for_each(|lane| check_len(len, lane.len()))
}
