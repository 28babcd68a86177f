//! Implicitly dealiased convolution of Hermitian sequences.
//!
//! A Hermitian sequence stores the modes `f[0..m]` of a spectrum whose negative modes are
//! `f[-k] = conj(f[k])`, i.e. the spectrum of a real signal. The full spectrum has `2m - 1`
//! modes, so dealiasing needs `N = 3m` real points (the 2/3 rule). Instead of one transform of
//! length `3m`, the real points `x = 3l + r` are computed in three residue classes, each a
//! complex-to-real transform of length `m` of the folded, twisted spectrum
//!
//! ```text
//!     F_r[k] = ω^{kr} (f[k] + ζ₃^{-r} conj(f[m - k])),   ω = e^{2πi/3m},  ζ₃ = e^{2πi/3}.
//! ```
//!
//! The multiplier combines the inputs pointwise in each residue class. The products are
//! transformed back and recombined into the first `m` modes of the padded spectrum:
//!
//! ```text
//!     h[k] = (1/3m) Σ_r ω^{-kr} P_r[k].
//! ```

use rustfft::num_complex::Complex64;
use serde::Serialize;
use tracing::{debug, instrument};

use super::{check_arity, check_lanes};
use crate::{
    config::ConvolutionConfig,
    errors::{ConvolutionError, Result},
    fft::{
        ForwardRealPlan, InverseRealPlan, TransformEngine,
        utils::{half_len, twiddles},
    },
    multiplier::{Multiplier, Product, dispatch},
    parallel::{WorkerPool, try_for_each_zip},
    sequence::SequenceSet,
};

/// Number of residue classes of the implicitly padded real signal.
const RESIDUES: usize = 3;

/// Storage layout of a Hermitian sequence of `m` modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StorageMode {
    /// Exactly `m` values.
    Compact,
    /// `m` values followed by one guard element, which is ignored on input and zero on output.
    NonCompact,
}

impl StorageMode {
    /// Length of a stored sequence of `m` modes.
    #[must_use]
    pub const fn sequence_len(self, m: usize) -> usize {
        match self {
            Self::Compact => m,
            Self::NonCompact => m + 1,
        }
    }

    /// The other mode.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Compact => Self::NonCompact,
            Self::NonCompact => Self::Compact,
        }
    }
}

/// Scratch owned by the convolution for one input sequence.
#[derive(Debug)]
struct Workspace {
    /// Real signal of each residue class.
    residues: [Vec<f64>; RESIDUES],
    /// Half spectrum of length `m / 2 + 1`.
    spectrum: Vec<Complex64>,
    backward_scratch: Vec<Complex64>,
    forward_scratch: Vec<Complex64>,
}

/// Implicitly dealiased convolution of `A` Hermitian inputs into `B` outputs of `m` modes.
#[derive(Debug)]
pub struct ImplicitHConvolution {
    m: usize,
    storage: StorageMode,
    inputs: usize,
    outputs: usize,
    backward: InverseRealPlan,
    forward: ForwardRealPlan,
    /// `ω^j` for `j < 2m`.
    omega: Vec<Complex64>,
    /// `ζ₃^{-r}` for `r < 3`.
    zeta3: Vec<Complex64>,
    workspaces: Vec<Workspace>,
    pool: WorkerPool,
}

impl ImplicitHConvolution {
    /// Plans a convolution of `inputs` Hermitian sequences of `m` modes producing `outputs`
    /// results.
    pub fn new(
        m: usize,
        storage: StorageMode,
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
        let backward = engine.plan_inverse_real(m);
        let forward = engine.plan_forward_real(m);
        let workspaces = (0..inputs)
            .map(|_| Workspace {
                residues: [(); RESIDUES].map(|()| vec![0.0; m]),
                spectrum: vec![Complex64::default(); half_len(m)],
                backward_scratch: backward.make_scratch(),
                forward_scratch: forward.make_scratch(),
            })
            .collect();
        debug!(
            m,
            ?storage,
            inputs,
            outputs,
            threads = pool.threads(),
            "implicit Hermitian convolution planned"
        );

        Ok(Self {
            m,
            storage,
            inputs,
            outputs,
            backward,
            forward,
            omega: twiddles(2 * m, RESIDUES * m, 1.0),
            zeta3: twiddles(RESIDUES, RESIDUES, -1.0),
            workspaces,
            pool,
        })
    }

    /// Number of modes per sequence.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.m
    }

    /// Always false: zero-length convolutions cannot be built.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Storage layout of the sequences.
    #[must_use]
    pub const fn storage(&self) -> StorageMode {
        self.storage
    }

    /// Length every stored sequence must have.
    #[must_use]
    pub const fn sequence_len(&self) -> usize {
        self.storage.sequence_len(self.m)
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
        M: Multiplier<f64> + ?Sized,
    {
        self.convolve_lanes(&mut set.lanes_mut(), multiplier)
    }

    /// Binary convolution: `f <- f * g`. `g` is overwritten.
    pub fn convolve_pair(&mut self, f: &mut [Complex64], g: &mut [Complex64]) -> Result<()> {
        self.convolve_lanes(&mut [f, g], &Product::Binary)
    }

    /// Rejects sequences stored in the other mode before any other check.
    fn check_storage(&self, lanes: &[&mut [Complex64]]) -> Result<()> {
        let other = self.storage.other().sequence_len(self.m);
        match lanes.iter().find(|lane| lane.len() == other) {
            Some(_) => Err(ConvolutionError::StorageMode {
                expected: self.sequence_len(),
                found: other,
            }),
            None => Ok(()),
        }
    }

    /// Convolves independently owned sequences.
    #[instrument(skip_all, fields(m = self.m, inputs = self.inputs, outputs = self.outputs), level = "debug")]
    pub fn convolve_lanes<M>(&mut self, lanes: &mut [&mut [Complex64]], multiplier: &M) -> Result<()>
    where
        M: Multiplier<f64> + ?Sized,
    {
        self.check_storage(lanes)?;
        check_lanes(self.inputs, self.sequence_len(), multiplier.inputs(), lanes)?;

        let m = self.m;
        let threads = self.pool.threads();
        let (outputs, scale) = (self.outputs, 1.0 / (RESIDUES * m) as f64);
        let (backward, forward) = (&self.backward, &self.forward);
        let (omega, zeta3) = (&self.omega[..], &self.zeta3[..]);
        let workspaces = &mut self.workspaces;

        self.pool.install(|| {
            try_for_each_zip(lanes, workspaces, |f, w| {
                let f = &f[..m];
                for (r, residue) in w.residues.iter_mut().enumerate() {
                    fold(f, omega, zeta3[r], r, &mut w.spectrum);
                    backward.execute(&mut w.spectrum, residue, &mut w.backward_scratch)?;
                }
                Ok(())
            })?;

            for r in 0..RESIDUES {
                let mut residues: Vec<&mut [f64]> = workspaces
                    .iter_mut()
                    .map(|w| w.residues[r].as_mut_slice())
                    .collect();
                dispatch(multiplier, &mut residues, threads);
            }

            try_for_each_zip(
                &mut lanes[..outputs],
                &mut workspaces[..outputs],
                |h, w| {
                    let (h, guard) = h.split_at_mut(m);
                    guard.fill(Complex64::default());
                    h.fill(Complex64::default());
                    for (r, residue) in w.residues.iter_mut().enumerate() {
                        forward.execute(residue, &mut w.spectrum, &mut w.forward_scratch)?;
                        unfold(&w.spectrum, omega, r, h);
                    }
                    h.iter_mut().for_each(|x| *x *= scale);
                    Ok(())
                },
            )
        })
    }
}

/// Writes the half spectrum `F_r[0..=m/2]` of residue class `r` into `spectrum`.
fn fold(f: &[Complex64], omega: &[Complex64], zeta: Complex64, r: usize, spectrum: &mut [Complex64]) {
    let m = f.len();
    spectrum[0] = Complex64::new(f[0].re, 0.0);
    for (k, out) in spectrum.iter_mut().enumerate().skip(1) {
        let folded = f[k] + zeta * f[m - k].conj();
        *out = if r == 0 { folded } else { omega[k * r] * folded };
    }
}

/// Accumulates `ω^{-kr} P_r[k]` into `h[k]` for every `k < m`.
fn unfold(spectrum: &[Complex64], omega: &[Complex64], r: usize, h: &mut [Complex64]) {
    let m = h.len();
    let half = spectrum.len();
    for (k, out) in h.iter_mut().enumerate() {
        let p = if k < half { spectrum[k] } else { spectrum[m - k].conj() };
        *out += if r == 0 { p } else { omega[k * r].conj() * p };
    }
}
