use core::f64::consts::TAU;

use rustfft::num_complex::Complex64;

/// Primes the transform engine handles with its specialised butterflies.
const SMOOTH_PRIMES: [usize; 4] = [2, 3, 5, 7];

/// Whether every prime factor of `n` is in `{2, 3, 5, 7}`.
///
/// Zero is not smooth.
#[must_use]
pub const fn is_smooth(mut n: usize) -> bool {
    if n == 0 {
        return false;
    }
    let mut i = 0;
    while i < SMOOTH_PRIMES.len() {
        let p = SMOOTH_PRIMES[i];
        while n % p == 0 {
            n /= p;
        }
        i += 1;
    }
    n == 1
}

/// Smallest smooth integer that is at least `n`.
#[must_use]
pub const fn next_smooth(n: usize) -> usize {
    let mut candidate = if n == 0 { 1 } else { n };
    while !is_smooth(candidate) {
        candidate += 1;
    }
    candidate
}

/// Padded length for an explicitly dealiased complex convolution of `m` points.
///
/// A linear convolution of two length-`m` sequences has `2m - 1` terms.
#[must_use]
pub const fn complex_padding(m: usize) -> usize {
    next_smooth((2 * m).saturating_sub(1))
}

/// Padded length for an explicitly dealiased Hermitian convolution of `m` modes.
///
/// The full spectrum spans `2m - 1` modes, so the `2/3` rule requires `3m - 2` points.
#[must_use]
pub const fn hermitian_padding(m: usize) -> usize {
    next_smooth((3 * m).saturating_sub(2))
}

/// Number of complex values in the half spectrum of a real sequence of length `n`.
#[must_use]
pub const fn half_len(n: usize) -> usize {
    n / 2 + 1
}

/// Returns `[e^{sign·2πi·k/denominator} : k < count]`.
///
/// Every factor is computed from its own angle, so there is no accumulated rounding error.
#[must_use]
pub fn twiddles(count: usize, denominator: usize, sign: f64) -> Vec<Complex64> {
    let step = sign * TAU / denominator as f64;
    (0..count)
        .map(|k| {
            let (sin, cos) = (step * k as f64).sin_cos();
            Complex64::new(cos, sin)
        })
        .collect()
}

/// Multiplies every value by `scale`.
pub fn scale<T>(values: &mut [T], scale: f64)
where
    T: core::ops::MulAssign<f64>,
{
    values.iter_mut().for_each(|v| *v *= scale);
}
