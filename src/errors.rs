//! Error types for convolution construction and execution.

use thiserror::Error;

/// Top-level error type for convolution operations.
///
/// Every variant is detected eagerly: configuration problems at construction, buffer
/// problems at the start of `convolve`, before any transform work begins.
#[derive(Error, Debug)]
pub enum ConvolutionError {
    /// Sequences must contain at least one element.
    #[error("sequence length must be positive")]
    ZeroLength,

    /// A convolution needs at least one input sequence.
    #[error("number of inputs must be positive")]
    ZeroInputs,

    /// The number of outputs must satisfy `1 <= outputs <= inputs`.
    #[error("{outputs} outputs requested for {inputs} inputs")]
    InvalidOutputs { outputs: usize, inputs: usize },

    /// No built-in multiplier exists for this number of inputs.
    #[error("no built-in multiplier for {0} inputs, supply a custom multiplier")]
    UnsupportedArity(usize),

    /// The multiplier consumes a different number of inputs than the convolution was built for.
    #[error("multiplier expects {found} inputs but the convolution was built for {expected}")]
    ArityMismatch { expected: usize, found: usize },

    /// The sequence set holds a different number of sequences than the convolution was built for.
    #[error("expected {expected} input sequences, found {found}")]
    SequenceCount { expected: usize, found: usize },

    /// Hermitian storage length does not match the compact/non-compact mode.
    #[error("Hermitian storage expects sequences of length {expected}, found {found}")]
    StorageMode { expected: usize, found: usize },

    /// The explicit padded length cannot hold the linear convolution.
    #[error("padded length {n} is below the dealiasing minimum {minimum}")]
    PaddingTooSmall { n: usize, minimum: usize },

    /// At least one worker thread is required.
    #[error("thread count must be positive")]
    ZeroThreads,

    /// A buffer handed to `convolve` does not have the size the plan was built for.
    #[error("buffer of length {found} does not match the planned length {expected}")]
    SizeMismatch { expected: usize, found: usize },

    /// The real-to-complex transform engine rejected a buffer.
    #[error(transparent)]
    Transform(#[from] realfft::FftError),

    /// The worker pool could not be created.
    #[cfg(feature = "parallel")]
    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl ConvolutionError {
    /// Whether the error stems from an invalid configuration rather than a bad buffer.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        !matches!(self, Self::SizeMismatch { .. } | Self::Transform(_))
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, ConvolutionError>;

/// Checks that a buffer has exactly the planned length.
pub(crate) const fn check_len(expected: usize, found: usize) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(ConvolutionError::SizeMismatch { expected, found })
    }
}
