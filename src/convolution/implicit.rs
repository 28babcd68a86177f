//! Implicitly dealiased convolution of complex sequences.
//!
//! A linear convolution of two length-`m` sequences is the circular convolution of their
//! zero-padded length-`2m` extensions. The padded transform never has to be formed: its even
//! bins are the length-`m` transform of the data, and its odd bins are the length-`m`
//! transform of the data multiplied by `ζ^k`, `ζ = e^{-iπ/m}`. Both halves are multiplied
//! separately, inverted separately, and the first `m` outputs of the padded inverse are
//!
//! ```text
//!     h[k] = (IDFT(even)[k] + conj(ζ^k) · IDFT(odd)[k]) / 2m.
//! ```
//!
//! The odd half lives in one scratch buffer per input, so memory grows with `m`, never `2m`,
//! per input beyond the caller's own buffer.

use itertools::izip;
use rustfft::num_complex::Complex64;
use tracing::{debug, instrument};

use super::{check_arity, check_lanes};
use crate::{
    config::ConvolutionConfig,
    errors::{ConvolutionError, Result},
    fft::{ComplexPlan, FftDirection, TransformEngine, utils::twiddles},
    multiplier::{Multiplier, Product, dispatch},
    parallel::{WorkerPool, try_for_each_zip},
    sequence::SequenceSet,
};

/// Scratch owned by the convolution for one input sequence.
#[derive(Debug)]
struct Workspace {
    /// Phase-shifted copy of the input, i.e. the odd bins of the padded transform.
    shifted: Vec<Complex64>,
    scratch: Vec<Complex64>,
}

/// Implicitly dealiased convolution of `A` complex inputs into `B` outputs of `m` points.
#[derive(Debug)]
pub struct ImplicitConvolution {
    m: usize,
    inputs: usize,
    outputs: usize,
    forward: ComplexPlan,
    inverse: ComplexPlan,
    /// `ζ^k` for `k < m`.
    twiddles: Vec<Complex64>,
    workspaces: Vec<Workspace>,
    pool: WorkerPool,
}

impl ImplicitConvolution {
    /// Plans a convolution of `inputs` sequences of `m` points producing `outputs` results.
    pub fn new(
        m: usize,
        inputs: usize,
        outputs: usize,
        config: &ConvolutionConfig,
    ) -> Result<Self> {
        if m == 0 {
            return Err(ConvolutionError::ZeroLength);
        }
        check_arity(inputs, outputs)?;
        let pool = config.build_pool()?;

        let engine = TransformEngine::new_from_cache();
        let forward = engine.plan_complex(m, FftDirection::Forward);
        let inverse = engine.plan_complex(m, FftDirection::Inverse);
        let scratch_len = forward.make_scratch().len().max(inverse.make_scratch().len());
        let workspaces = (0..inputs)
            .map(|_| Workspace {
                shifted: vec![Complex64::default(); m],
                scratch: vec![Complex64::default(); scratch_len],
            })
            .collect();
        debug!(m, inputs, outputs, threads = pool.threads(), "implicit convolution planned");

        Ok(Self {
            m,
            inputs,
            outputs,
            forward,
            inverse,
            twiddles: twiddles(m, 2 * m, -1.0),
            workspaces,
            pool,
        })
    }

    /// Number of points per sequence.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.m
    }

    /// Always false: zero-length convolutions cannot be built.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Number of input sequences `A`.
    #[must_use]
    pub const fn inputs(&self) -> usize {
        self.inputs
    }

    /// Number of output sequences `B`.
    #[must_use]
    pub const fn outputs(&self) -> usize {
        self.outputs
    }

    /// Number of worker threads, fixed at construction.
    #[must_use]
    pub const fn threads(&self) -> usize {
        self.pool.threads()
    }

    /// Convolves the sequences of `set`, leaving the `B` results in its leading sequences.
    ///
    /// All sequences are overwritten.
    pub fn convolve<M>(&mut self, set: &mut SequenceSet<Complex64>, multiplier: &M) -> Result<()>
    where
        M: Multiplier<Complex64> + ?Sized,
    {
        self.convolve_lanes(&mut set.lanes_mut(), multiplier)
    }

    /// Binary convolution: `f <- f * g`. `g` is overwritten.
    pub fn convolve_pair(&mut self, f: &mut [Complex64], g: &mut [Complex64]) -> Result<()> {
        self.convolve_lanes(&mut [f, g], &Product::Binary)
    }

    /// Convolves independently owned sequences.
    #[instrument(skip_all, fields(m = self.m, inputs = self.inputs, outputs = self.outputs), level = "debug")]
    pub fn convolve_lanes<M>(&mut self, lanes: &mut [&mut [Complex64]], multiplier: &M) -> Result<()>
    where
        M: Multiplier<Complex64> + ?Sized,
    {
        check_lanes(self.inputs, self.m, multiplier.inputs(), lanes)?;

        let threads = self.pool.threads();
        let (outputs, scale) = (self.outputs, 0.5 / self.m as f64);
        let (forward, inverse, twiddles) = (&self.forward, &self.inverse, &self.twiddles[..]);
        let workspaces = &mut self.workspaces;

        self.pool.install(|| {
            // Even and odd halves of the padded forward transform.
            try_for_each_zip(lanes, workspaces, |f, w| {
                for (u, x, z) in izip!(&mut w.shifted, f.iter(), twiddles) {
                    *u = x * z;
                }
                forward.execute(f, &mut w.scratch)?;
                forward.execute(&mut w.shifted, &mut w.scratch)
            })?;

            dispatch(multiplier, lanes, threads);
            let mut shifted: Vec<&mut [Complex64]> = workspaces
                .iter_mut()
                .map(|w| w.shifted.as_mut_slice())
                .collect();
            dispatch(multiplier, &mut shifted, threads);

            try_for_each_zip(
                &mut lanes[..outputs],
                &mut workspaces[..outputs],
                |h, w| {
                    inverse.execute(h, &mut w.scratch)?;
                    inverse.execute(&mut w.shifted, &mut w.scratch)?;
                    for (x, u, z) in izip!(h.iter_mut(), &w.shifted, twiddles) {
                        *x = (*x + z.conj() * u) * scale;
                    }
                    Ok(())
                },
            )
        })
    }
}
