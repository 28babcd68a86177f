//! Transform engine adapter.
//!
//! Wraps `rustfft` for complex transforms and `realfft` for the real/half-complex pair. Plans
//! are bound to one length and direction and never hold mutable state, so a single plan can be
//! executed concurrently from several workers as long as each brings its own scratch buffer.
//!
//! None of the transforms normalise: a forward transform followed by an inverse transform of
//! length `n` multiplies the data by `n`.

use std::{
    fmt,
    sync::{Arc, LazyLock, Mutex, PoisonError},
};

use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use rustfft::{Fft, FftPlanner, num_complex::Complex64};
pub use rustfft::FftDirection;

use crate::errors::{ConvolutionError, Result, check_len};

pub mod utils;

/// Process-wide engine shared by every convolution, so that planners reuse their tables.
static ENGINE_CACHE: LazyLock<Arc<TransformEngine>> =
    LazyLock::new(|| Arc::new(TransformEngine::new()));

/// Factory for transform plans.
///
/// The planners are kept behind mutexes; plan creation happens once per convolution instance,
/// never on the hot path.
pub struct TransformEngine {
    complex: Mutex<FftPlanner<f64>>,
    real: Mutex<RealFftPlanner<f64>>,
}

impl TransformEngine {
    /// Creates an engine with empty planner caches.
    #[must_use]
    pub fn new() -> Self {
        Self {
            complex: Mutex::new(FftPlanner::new()),
            real: Mutex::new(RealFftPlanner::new()),
        }
    }

    /// Returns the shared engine.
    #[must_use]
    pub fn new_from_cache() -> Arc<Self> {
        Arc::clone(&ENGINE_CACHE)
    }

    /// Plans an in-place complex transform of `len` points.
    #[must_use]
    pub fn plan_complex(&self, len: usize, direction: FftDirection) -> ComplexPlan {
        let fft = self
            .complex
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .plan_fft(len, direction);
        ComplexPlan { len, fft }
    }

    /// Plans a real-to-complex transform of `len` real points into `len / 2 + 1` bins.
    #[must_use]
    pub fn plan_forward_real(&self, len: usize) -> ForwardRealPlan {
        let r2c = self
            .real
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .plan_fft_forward(len);
        ForwardRealPlan { len, r2c }
    }

    /// Plans a complex-to-real transform of `len / 2 + 1` bins into `len` real points.
    #[must_use]
    pub fn plan_inverse_real(&self, len: usize) -> InverseRealPlan {
        let c2r = self
            .real
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .plan_fft_inverse(len);
        InverseRealPlan { len, c2r }
    }
}

impl Default for TransformEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TransformEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformEngine").finish_non_exhaustive()
    }
}

/// Verifies that a caller-provided scratch buffer is large enough.
const fn check_scratch(required: usize, found: usize) -> Result<()> {
    if found < required {
        Err(ConvolutionError::SizeMismatch {
            expected: required,
            found,
        })
    } else {
        Ok(())
    }
}

/// In-place complex transform of a fixed length and direction.
#[derive(Clone)]
pub struct ComplexPlan {
    len: usize,
    fft: Arc<dyn Fft<f64>>,
}

impl ComplexPlan {
    /// Transform length.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the plan transforms empty buffers.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Direction of the transform.
    #[must_use]
    pub fn direction(&self) -> FftDirection {
        self.fft.fft_direction()
    }

    /// Allocates a scratch buffer suitable for [`Self::execute`].
    #[must_use]
    pub fn make_scratch(&self) -> Vec<Complex64> {
        vec![Complex64::default(); self.fft.get_inplace_scratch_len()]
    }

    /// Transforms `buffer` in place.
    pub fn execute(&self, buffer: &mut [Complex64], scratch: &mut [Complex64]) -> Result<()> {
        check_len(self.len, buffer.len())?;
        check_scratch(self.fft.get_inplace_scratch_len(), scratch.len())?;
        self.fft.process_with_scratch(buffer, scratch);
        Ok(())
    }
}

impl fmt::Debug for ComplexPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComplexPlan")
            .field("len", &self.len)
            .field("direction", &self.direction())
            .finish_non_exhaustive()
    }
}

/// Real-to-complex forward transform.
#[derive(Clone)]
pub struct ForwardRealPlan {
    len: usize,
    r2c: Arc<dyn RealToComplex<f64>>,
}

impl ForwardRealPlan {
    /// Number of real input points.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the plan transforms empty buffers.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of complex output bins.
    #[must_use]
    pub const fn spectrum_len(&self) -> usize {
        utils::half_len(self.len)
    }

    /// Allocates a scratch buffer suitable for [`Self::execute`].
    #[must_use]
    pub fn make_scratch(&self) -> Vec<Complex64> {
        self.r2c.make_scratch_vec()
    }

    /// Transforms `input` into `output`. The input is used as workspace and left unspecified.
    pub fn execute(
        &self,
        input: &mut [f64],
        output: &mut [Complex64],
        scratch: &mut [Complex64],
    ) -> Result<()> {
        check_len(self.len, input.len())?;
        check_len(self.spectrum_len(), output.len())?;
        self.r2c.process_with_scratch(input, output, scratch)?;
        Ok(())
    }
}

impl fmt::Debug for ForwardRealPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwardRealPlan")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

/// Complex-to-real inverse transform.
#[derive(Clone)]
pub struct InverseRealPlan {
    len: usize,
    c2r: Arc<dyn ComplexToReal<f64>>,
}

impl InverseRealPlan {
    /// Number of real output points.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the plan transforms empty buffers.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of complex input bins.
    #[must_use]
    pub const fn spectrum_len(&self) -> usize {
        utils::half_len(self.len)
    }

    /// Allocates a scratch buffer suitable for [`Self::execute`].
    #[must_use]
    pub fn make_scratch(&self) -> Vec<Complex64> {
        self.c2r.make_scratch_vec()
    }

    /// Transforms the half spectrum `input` into `output`.
    ///
    /// The imaginary parts of the zero bin and, for even lengths, the Nyquist bin carry no
    /// information for a real signal and are discarded. The input is left unspecified.
    pub fn execute(
        &self,
        input: &mut [Complex64],
        output: &mut [f64],
        scratch: &mut [Complex64],
    ) -> Result<()> {
        check_len(self.spectrum_len(), input.len())?;
        check_len(self.len, output.len())?;
        input[0].im = 0.0;
        if self.len % 2 == 0 {
            input[self.len / 2].im = 0.0;
        }
        self.c2r.process_with_scratch(input, output, scratch)?;
        Ok(())
    }
}

impl fmt::Debug for InverseRealPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InverseRealPlan")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}
