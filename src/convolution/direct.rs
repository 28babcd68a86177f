//! Brute-force O(m²) convolutions, used as a reference for the transform-based methods.

use rustfft::num_complex::Complex64;

use crate::errors::{ConvolutionError, Result, check_len};

/// Direct linear convolution of complex sequences.
#[derive(Debug, Clone, Copy)]
pub struct DirectConvolution {
    m: usize,
}

impl DirectConvolution {
    /// Creates a direct convolution of `m` points.
    pub const fn new(m: usize) -> Result<Self> {
        if m == 0 {
            return Err(ConvolutionError::ZeroLength);
        }
        Ok(Self { m })
    }

    /// Number of points.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.m
    }

    /// Always false: zero-length convolutions cannot be built.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// `h[k] = sum_{i <= k} f[i] g[k - i]` for `k < m`.
    pub fn convolve(&self, h: &mut [Complex64], f: &[Complex64], g: &[Complex64]) -> Result<()> {
        check_len(self.m, h.len())?;
        check_len(self.m, f.len())?;
        check_len(self.m, g.len())?;

        for (k, out) in h.iter_mut().enumerate() {
            *out = f[..=k].iter().zip(g[..=k].iter().rev()).map(|(a, b)| a * b).sum();
        }
        Ok(())
    }

    /// `h[k] = sum_{i <= k} f[i] f[k - i]` for `k < m`.
    pub fn autoconvolve(&self, h: &mut [Complex64], f: &[Complex64]) -> Result<()> {
        self.convolve(h, f, f)
    }
}

/// Direct convolution of Hermitian sequences.
///
/// Only the non-negative modes `f[0..m]` are stored; `f[-k] = conj(f[k])`.
#[derive(Debug, Clone, Copy)]
pub struct DirectHConvolution {
    m: usize,
}

impl DirectHConvolution {
    /// Creates a direct Hermitian convolution of `m` modes.
    pub const fn new(m: usize) -> Result<Self> {
        if m == 0 {
            return Err(ConvolutionError::ZeroLength);
        }
        Ok(Self { m })
    }

    /// Number of stored modes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.m
    }

    /// Always false: zero-length convolutions cannot be built.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// `h[k] = sum_p f[p] g[k - p]` over all `|p| < m` with `|k - p| < m`, for `0 <= k < m`.
    pub fn convolve(&self, h: &mut [Complex64], f: &[Complex64], g: &[Complex64]) -> Result<()> {
        let m = self.m;
        check_len(m, h.len())?;
        check_len(m, f.len())?;
        check_len(m, g.len())?;

        for (k, out) in h.iter_mut().enumerate() {
            // 0 <= p <= k
            let mut sum: Complex64 = (0..=k).map(|p| f[p] * g[k - p]).sum();
            // k < p < m, so k - p < 0
            sum += (k + 1..m).map(|p| f[p] * g[p - k].conj()).sum::<Complex64>();
            // -(m - k) < p < 0
            sum += (1..m - k).map(|p| f[p].conj() * g[k + p]).sum::<Complex64>();
            *out = sum;
        }
        Ok(())
    }
}
