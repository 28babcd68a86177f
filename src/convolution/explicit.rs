//! Zero-padded convolutions.
//!
//! These are the textbook dealiasing baselines: every input is padded with zeros to a length
//! where the circular convolution computed by the transform has no wraparound inside the
//! first `m` outputs.

use rustfft::num_complex::Complex64;
use tracing::{debug, instrument};

use crate::{
    config::ConvolutionConfig,
    errors::{ConvolutionError, Result, check_len},
    fft::{
        ComplexPlan, FftDirection, ForwardRealPlan, InverseRealPlan, TransformEngine,
        utils::{half_len, scale},
    },
    parallel::{WorkerPool, try_for_each_zip},
};

/// Checks the common constructor arguments.
const fn check_padding(n: usize, m: usize, minimum: usize) -> Result<()> {
    if m == 0 {
        return Err(ConvolutionError::ZeroLength);
    }
    if n < minimum {
        return Err(ConvolutionError::PaddingTooSmall { n, minimum });
    }
    Ok(())
}

/// Binary complex convolution through transforms of a padded length `n >= 2m - 1`.
#[derive(Debug)]
pub struct ExplicitConvolution {
    n: usize,
    m: usize,
    forward: ComplexPlan,
    inverse: ComplexPlan,
    scratch: [Vec<Complex64>; 2],
    pool: WorkerPool,
}

impl ExplicitConvolution {
    /// Creates a convolution of `m` points padded to `n`.
    ///
    /// [`crate::fft::utils::complex_padding`] gives the smallest fast `n`.
    pub fn new(n: usize, m: usize, config: &ConvolutionConfig) -> Result<Self> {
        check_padding(n, m, 2 * m.max(1) - 1)?;
        let pool = config.build_pool()?;

        let engine = TransformEngine::new_from_cache();
        let forward = engine.plan_complex(n, FftDirection::Forward);
        let inverse = engine.plan_complex(n, FftDirection::Inverse);
        let scratch_len = forward.make_scratch().len().max(inverse.make_scratch().len());
        debug!(n, m, threads = pool.threads(), "explicit convolution planned");

        Ok(Self {
            n,
            m,
            forward,
            inverse,
            scratch: [
                vec![Complex64::default(); scratch_len],
                vec![Complex64::default(); scratch_len],
            ],
            pool,
        })
    }

    /// Padded length every buffer must have.
    #[must_use]
    pub const fn padded_len(&self) -> usize {
        self.n
    }

    /// Number of meaningful points.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.m
    }

    /// Always false: zero-length convolutions cannot be built.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Convolves `f` with `g`, both of length `n` with data in the first `m` entries.
    ///
    /// The linear convolution is left in `f[..m]`; the rest of `f` and all of `g` are
    /// overwritten.
    #[instrument(skip_all, fields(n = self.n, m = self.m), level = "debug")]
    pub fn convolve(&mut self, f: &mut [Complex64], g: &mut [Complex64]) -> Result<()> {
        check_len(self.n, f.len())?;
        check_len(self.n, g.len())?;

        let (m, forward) = (self.m, &self.forward);
        let mut buffers = [f, g];
        self.pool.install(|| {
            try_for_each_zip(&mut buffers, &mut self.scratch, |buffer, scratch| {
                buffer[m..].fill(Complex64::default());
                forward.execute(buffer, scratch)
            })
        })?;

        let [f, g] = buffers;
        for (x, y) in f.iter_mut().zip(g.iter()) {
            *x *= *y;
        }
        self.inverse.execute(f, &mut self.scratch[0])?;
        scale(f, 1.0 / self.n as f64);
        Ok(())
    }
}

/// Binary Hermitian convolution through real transforms of a padded length `n >= 3m - 2`.
///
/// Buffers hold the half spectrum `n / 2 + 1` of a real signal of length `n`.
#[derive(Debug)]
pub struct ExplicitHConvolution {
    n: usize,
    m: usize,
    backward: InverseRealPlan,
    forward: ForwardRealPlan,
    lanes: [HLane; 2],
    forward_scratch: Vec<Complex64>,
    pool: WorkerPool,
}

/// Real-space workspace of one input.
#[derive(Debug)]
struct HLane {
    real: Vec<f64>,
    scratch: Vec<Complex64>,
}

impl ExplicitHConvolution {
    /// Creates a Hermitian convolution of `m` modes padded to `n` real points.
    ///
    /// [`crate::fft::utils::hermitian_padding`] gives the smallest fast `n`.
    pub fn new(n: usize, m: usize, config: &ConvolutionConfig) -> Result<Self> {
        check_padding(n, m, 3 * m.max(1) - 2)?;
        let pool = config.build_pool()?;

        let engine = TransformEngine::new_from_cache();
        let backward = engine.plan_inverse_real(n);
        let forward = engine.plan_forward_real(n);
        let lanes = [(); 2].map(|()| HLane {
            real: vec![0.0; n],
            scratch: backward.make_scratch(),
        });
        debug!(n, m, threads = pool.threads(), "explicit Hermitian convolution planned");

        Ok(Self {
            n,
            m,
            forward_scratch: forward.make_scratch(),
            backward,
            forward,
            lanes,
            pool,
        })
    }

    /// Length every buffer must have.
    #[must_use]
    pub const fn spectrum_len(&self) -> usize {
        half_len(self.n)
    }

    /// Number of meaningful modes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.m
    }

    /// Always false: zero-length convolutions cannot be built.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Convolves the half spectra `f` and `g`, both of length `n / 2 + 1`.
    ///
    /// The result is left in `f[..m]`; the rest of `f` and all of `g` are overwritten.
    #[instrument(skip_all, fields(n = self.n, m = self.m), level = "debug")]
    pub fn convolve(&mut self, f: &mut [Complex64], g: &mut [Complex64]) -> Result<()> {
        let np = self.spectrum_len();
        check_len(np, f.len())?;
        check_len(np, g.len())?;

        let (m, backward) = (self.m, &self.backward);
        let mut spectra = [f, g];
        self.pool.install(|| {
            try_for_each_zip(&mut spectra, &mut self.lanes, |spectrum, lane| {
                spectrum[m..].fill(Complex64::default());
                backward.execute(spectrum, &mut lane.real, &mut lane.scratch)
            })
        })?;

        let [left, right] = &mut self.lanes;
        for (x, y) in left.real.iter_mut().zip(right.real.iter()) {
            *x *= *y;
        }

        let [f, _] = spectra;
        self.forward
            .execute(&mut left.real, f, &mut self.forward_scratch)?;
        scale(f, 1.0 / self.n as f64);
        Ok(())
    }
}
