//! Implicitly dealiased convolutions.
//!
//! Linear convolutions computed in transform space are normally dealiased by zero padding the
//! inputs to `2m` (complex) or `3m` (Hermitian) points. The implicit convolutions in
//! [`convolution`] obtain the same result from several phase-shifted transforms of length `m`,
//! so no buffer ever holds the padded data. A [`multiplier::Multiplier`] combines any number of
//! transformed inputs into one or more outputs.

pub mod config;
pub mod convolution;
pub mod errors;
pub mod fft;
pub mod multiplier;
pub mod parallel;
pub mod sequence;

pub use config::ConvolutionConfig;
pub use convolution::{
    DirectConvolution, DirectHConvolution, ExplicitConvolution, ExplicitHConvolution,
    ImplicitConvolution, ImplicitHConvolution, StorageMode,
};
pub use errors::{ConvolutionError, Result};
pub use multiplier::{FnMultiplier, Multiplier, Product};
pub use rustfft::num_complex::Complex64;
pub use sequence::SequenceSet;
