use proptest::prelude::*;
use rand::{Rng, SeedableRng, rngs::StdRng};
use rustfft::num_complex::Complex64;

use super::*;
use crate::{
    config::ConvolutionConfig,
    multiplier::{FnMultiplier, Multiplier, Product},
    sequence::SequenceSet,
};

fn relative_error(a: &[Complex64], b: &[Complex64]) -> f64 {
    let err: f64 = a.iter().zip(b).map(|(x, y)| (x - y).norm_sqr()).sum();
    let norm: f64 = b.iter().map(Complex64::norm_sqr).sum();
    if norm > 0.0 { (err / norm).sqrt() } else { err.sqrt() }
}

/// `f[k] = (k, k + 1)`, `g[k] = (k, 2k + 1)`.
fn complex_pair(m: usize) -> (Vec<Complex64>, Vec<Complex64>) {
    let f = (0..m).map(|k| Complex64::new(k as f64, k as f64 + 1.0)).collect();
    let g = (0..m)
        .map(|k| Complex64::new(k as f64, 2.0 * k as f64 + 1.0))
        .collect();
    (f, g)
}

/// Same as [`complex_pair`] with a real zero mode.
fn hermitian_pair(m: usize) -> (Vec<Complex64>, Vec<Complex64>) {
    let (mut f, mut g) = complex_pair(m);
    f[0] = Complex64::new(1.0, 0.0);
    g[0] = Complex64::new(2.0, 0.0);
    (f, g)
}

fn direct(m: usize, f: &[Complex64], g: &[Complex64]) -> Vec<Complex64> {
    let mut h = vec![Complex64::default(); m];
    DirectConvolution::new(m)
        .unwrap()
        .convolve(&mut h, f, g)
        .unwrap();
    h
}

fn direct_hermitian(m: usize, f: &[Complex64], g: &[Complex64]) -> Vec<Complex64> {
    let mut h = vec![Complex64::default(); m];
    DirectHConvolution::new(m)
        .unwrap()
        .convolve(&mut h, f, g)
        .unwrap();
    h
}

/// Splits one pair into `2M` inputs whose pair-sum equals the pair's product:
/// `F_s = (1 + s) f / sqrt(M)` and `F_{s+M} = g / ((1 + s) sqrt(M))`.
fn split_pair(f: &[Complex64], g: &[Complex64], pairs: usize) -> Vec<Vec<Complex64>> {
    let root = (pairs as f64).sqrt();
    let left = (0..pairs).map(|s| {
        let c = (1 + s) as f64 / root;
        f.iter().map(|x| x * c).collect::<Vec<_>>()
    });
    let right = (0..pairs).map(|s| {
        let c = 1.0 / ((1 + s) as f64 * root);
        g.iter().map(|x| x * c).collect::<Vec<_>>()
    });
    left.chain(right).collect()
}

#[test]
fn test_pair_sum_arities_match_binary() {
    let m = 11;
    let (f, g) = complex_pair(m);
    let expected = direct(m, &f, &g);

    for inputs in [4, 6, 8, 16] {
        let product = Product::for_inputs(inputs).unwrap();
        let mut set = SequenceSet::from_sequences(split_pair(&f, &g, inputs / 2)).unwrap();
        let mut conv =
            ImplicitConvolution::new(m, inputs, 1, &ConvolutionConfig::default()).unwrap();
        conv.convolve(&mut set, &product).unwrap();
        assert!(relative_error(&set[0], &expected) < 1e-12, "A = {inputs}");
    }
}

#[test]
fn test_hermitian_pair_sum_arities_match_binary() {
    let m = 12;
    let (f, g) = hermitian_pair(m);
    let expected = direct_hermitian(m, &f, &g);

    for inputs in [2, 4, 6, 8, 16] {
        let sequences = if inputs == 2 {
            vec![f.clone(), g.clone()]
        } else {
            split_pair(&f, &g, inputs / 2)
        };
        let mut set = SequenceSet::from_sequences(sequences).unwrap();
        let mut conv = ImplicitHConvolution::new(
            m,
            StorageMode::Compact,
            inputs,
            1,
            &ConvolutionConfig::default(),
        )
        .unwrap();
        conv.convolve(&mut set, &Product::for_inputs(inputs).unwrap())
            .unwrap();
        assert!(relative_error(&set[0], &expected) < 1e-12, "A = {inputs}");
    }
}

#[test]
fn test_unsupported_arity() {
    assert!(matches!(
        Product::for_inputs(3),
        Err(ConvolutionError::UnsupportedArity(3))
    ));
}

#[test]
fn test_autoconvolution_closed_form() {
    for m in [11, 17] {
        let mut set = SequenceSet::<Complex64>::new(1, m);
        for (k, x) in set[0].iter_mut().enumerate() {
            *x = Complex64::new(k as f64, 0.0);
        }
        let mut conv =
            ImplicitConvolution::new(m, 1, 1, &ConvolutionConfig::default()).unwrap();
        conv.convolve(&mut set, &Product::Autoconvolution).unwrap();

        let expected: Vec<_> = (0..m)
            .map(|k| {
                let k = k as f64;
                Complex64::new(
                    k * (0.5 * k * (k + 1.0)) - k * (k + 1.0) * (2.0 * k + 1.0) / 6.0,
                    0.0,
                )
            })
            .collect();
        assert!(relative_error(&set[0], &expected) < 1e-12, "m = {m}");
    }
}

#[test]
fn test_hermitian_closed_form() {
    // f[k] = F e^{ik} and g[k] = G e^{ik} give h[k] = F G (2m - 1 - k) e^{ik}.
    let m = 10;
    let (cf, cg) = (3f64.sqrt(), 5f64.sqrt());
    let mut f: Vec<_> = (0..m).map(|k| Complex64::from_polar(cf, k as f64)).collect();
    let mut g: Vec<_> = (0..m).map(|k| Complex64::from_polar(cg, k as f64)).collect();

    let mut conv = ImplicitHConvolution::new(
        m,
        StorageMode::Compact,
        2,
        1,
        &ConvolutionConfig::default(),
    )
    .unwrap();
    conv.convolve_pair(&mut f, &mut g).unwrap();

    for (k, value) in f.iter().enumerate() {
        let expected = Complex64::from_polar(cf * cg * (2 * m - 1 - k) as f64, k as f64);
        assert!((value - expected).norm() < 1e-12 * expected.norm());
    }
}

#[test]
fn test_thread_count_does_not_change_results() {
    let m = 64;
    let (f, g) = complex_pair(m);
    let (hf, hg) = hermitian_pair(m);

    let run = |threads: usize| {
        let config = ConvolutionConfig::single_threaded().with_threads(threads);
        let (mut f, mut g) = (f.clone(), g.clone());
        ImplicitConvolution::new(m, 2, 1, &config)
            .unwrap()
            .convolve_pair(&mut f, &mut g)
            .unwrap();
        let (mut hf, mut hg) = (hf.clone(), hg.clone());
        ImplicitHConvolution::new(m, StorageMode::Compact, 2, 1, &config)
            .unwrap()
            .convolve_pair(&mut hf, &mut hg)
            .unwrap();
        (f, hf)
    };

    let reference = run(1);
    for threads in [2, 3, ConvolutionConfig::default().threads()] {
        assert_eq!(run(threads), reference, "threads = {threads}");
    }
}

#[test]
fn test_hermitian_matches_complex_on_full_spectrum() {
    // The full spectrum f[-(m-1)..m] of a Hermitian sequence, convolved as a complex sequence
    // of length 3m - 2, holds mode k of the Hermitian result at index 2m - 2 + k.
    let m = 8;
    let (mut f, mut g) = hermitian_pair(m);
    let full = |x: &[Complex64]| -> Vec<Complex64> {
        let mut out: Vec<_> = x[1..].iter().rev().map(|v| v.conj()).collect();
        out.extend_from_slice(x);
        out.resize(3 * m - 2, Complex64::default());
        out
    };
    let (mut ff, mut gg) = (full(&f), full(&g));

    let mut complex = ImplicitConvolution::new(3 * m - 2, 2, 1, &ConvolutionConfig::default())
        .unwrap();
    complex.convolve_pair(&mut ff, &mut gg).unwrap();

    let mut hermitian = ImplicitHConvolution::new(
        m,
        StorageMode::Compact,
        2,
        1,
        &ConvolutionConfig::default(),
    )
    .unwrap();
    hermitian.convolve_pair(&mut f, &mut g).unwrap();

    let centre = 2 * m - 2;
    assert!(relative_error(&f, &ff[centre..centre + m]) < 1e-12);
    // The complex result is itself Hermitian about the centre.
    let scale = ff.iter().map(|x| x.norm()).fold(1.0, f64::max);
    for k in 1..m {
        assert!((ff[centre - k] - ff[centre + k].conj()).norm() < 1e-12 * scale);
    }
}

#[test]
fn test_custom_multiplier_with_two_outputs() {
    // Lane 0 receives f * g and lane 1 receives f * f.
    let both = FnMultiplier::new(2, |lanes: &mut [&mut [Complex64]], _: usize| {
        let [f, g] = lanes else { return };
        for (x, y) in f.iter_mut().zip(g.iter_mut()) {
            let x0 = *x;
            *x = x0 * *y;
            *y = x0 * x0;
        }
    });

    let m = 13;
    let (f, g) = complex_pair(m);
    let mut set = SequenceSet::from_sequences([&f, &g]).unwrap();
    let mut conv = ImplicitConvolution::new(m, 2, 2, &ConvolutionConfig::default()).unwrap();
    conv.convolve(&mut set, &both).unwrap();

    assert!(relative_error(&set[0], &direct(m, &f, &g)) < 1e-12);
    assert!(relative_error(&set[1], &direct(m, &f, &f)) < 1e-12);
}

#[test]
fn test_hermitian_custom_multiplier_with_two_outputs() {
    // Real-space products: lane 0 receives f * g and lane 1 receives f * f.
    let both = FnMultiplier::new(2, |lanes: &mut [&mut [f64]], _: usize| {
        let [f, g] = lanes else { return };
        for (x, y) in f.iter_mut().zip(g.iter_mut()) {
            let x0 = *x;
            *x = x0 * *y;
            *y = x0 * x0;
        }
    });

    let m = 12;
    let (f, g) = hermitian_pair(m);
    let expected = [direct_hermitian(m, &f, &g), direct_hermitian(m, &f, &f)];
    let config = ConvolutionConfig::single_threaded().with_threads(3);

    for storage in [StorageMode::Compact, StorageMode::NonCompact] {
        let len = storage.sequence_len(m);
        let mut set = SequenceSet::<Complex64>::new(2, len);
        set[0][..m].copy_from_slice(&f);
        set[1][..m].copy_from_slice(&g);

        let mut conv = ImplicitHConvolution::new(m, storage, 2, 2, &config).unwrap();
        conv.convolve(&mut set, &both).unwrap();

        for (lane, expected) in expected.iter().enumerate() {
            assert!(
                relative_error(&set[lane][..m], expected) < 1e-12,
                "{storage:?}, lane {lane}"
            );
            assert!(set[lane][m..].iter().all(|x| *x == Complex64::default()));
        }
    }
}

#[test]
fn test_hermitian_autoconvolution() {
    let m = 9;
    let (f, _) = hermitian_pair(m);
    let expected = direct_hermitian(m, &f, &f);

    let mut set = SequenceSet::from_sequences([&f]).unwrap();
    let mut conv = ImplicitHConvolution::new(
        m,
        StorageMode::Compact,
        1,
        1,
        &ConvolutionConfig::default(),
    )
    .unwrap();
    conv.convolve(&mut set, &Product::Autoconvolution).unwrap();
    assert!(relative_error(&set[0], &expected) < 1e-12);
}

#[test]
fn test_hermitian_non_compact_pair_sum_with_two_outputs() {
    // Four non-compact lanes with garbage guards; both output lanes end with a zero guard,
    // lane 0 holds f * g and lane 1, untouched by the product, is transformed back unchanged.
    let m = 11;
    let (f, g) = hermitian_pair(m);
    let expected = direct_hermitian(m, &f, &g);
    let inputs = split_pair(&f, &g, 2);

    let mut set = SequenceSet::<Complex64>::new(4, m + 1);
    for (s, input) in inputs.iter().enumerate() {
        set[s][..m].copy_from_slice(input);
        set[s][m] = Complex64::new(7.0, -3.0);
    }

    let mut conv = ImplicitHConvolution::new(
        m,
        StorageMode::NonCompact,
        4,
        2,
        &ConvolutionConfig::default(),
    )
    .unwrap();
    conv.convolve(&mut set, &Product::PairSum(2)).unwrap();

    assert!(relative_error(&set[0][..m], &expected) < 1e-12);
    assert!(relative_error(&set[1][..m], &inputs[1]) < 1e-12);
    assert_eq!(set[0][m], Complex64::default());
    assert_eq!(set[1][m], Complex64::default());
}

#[test]
fn test_multiplier_sees_thread_ids_below_thread_count() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let highest = AtomicUsize::new(0);
    let recorder = FnMultiplier::new(2, |lanes: &mut [&mut [Complex64]], thread: usize| {
        highest.fetch_max(thread, Ordering::Relaxed);
        Multiplier::multiply(&Product::Binary, lanes, thread);
    });

    let config = ConvolutionConfig::single_threaded().with_threads(4);
    let mut conv = ImplicitConvolution::new(100, 2, 1, &config).unwrap();
    let (mut f, mut g) = complex_pair(100);
    conv.convolve_lanes(&mut [&mut f[..], &mut g[..]], &recorder).unwrap();
    assert!(highest.load(Ordering::Relaxed) < config.effective_threads());
}

#[test]
fn test_implicit_matches_explicit_on_random_data() {
    let mut rng = StdRng::seed_from_u64(7);
    let m = 50;
    let mut random = |len: usize| -> Vec<Complex64> {
        (0..len)
            .map(|_| Complex64::new(rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0)))
            .collect()
    };
    let (f, g) = (random(m), random(m));

    let n = crate::fft::utils::complex_padding(m);
    let (mut fp, mut gp) = (f.clone(), g.clone());
    fp.resize(n, Complex64::default());
    gp.resize(n, Complex64::default());
    ExplicitConvolution::new(n, m, &ConvolutionConfig::default())
        .unwrap()
        .convolve(&mut fp, &mut gp)
        .unwrap();

    let (mut fi, mut gi) = (f, g);
    ImplicitConvolution::new(m, 2, 1, &ConvolutionConfig::default())
        .unwrap()
        .convolve_pair(&mut fi, &mut gi)
        .unwrap();

    assert!(relative_error(&fi, &fp[..m]) < 1e-12);
}

fn complex_vec(len: usize) -> impl Strategy<Value = Vec<Complex64>> {
    prop::collection::vec((-10.0..10.0f64, -10.0..10.0f64), len)
        .prop_map(|v| v.into_iter().map(|(re, im)| Complex64::new(re, im)).collect())
}

fn complex_pair_strategy() -> impl Strategy<Value = (Vec<Complex64>, Vec<Complex64>)> {
    (1usize..=40).prop_flat_map(|m| (complex_vec(m), complex_vec(m)))
}

proptest! {
    #[test]
    fn prop_implicit_matches_direct((f, g) in complex_pair_strategy()) {
        let m = f.len();
        let expected = direct(m, &f, &g);
        let (mut fi, mut gi) = (f, g);
        ImplicitConvolution::new(m, 2, 1, &ConvolutionConfig::single_threaded())
            .unwrap()
            .convolve_pair(&mut fi, &mut gi)
            .unwrap();
        let scale = expected.iter().map(|x| x.norm()).fold(1.0, f64::max);
        for (x, y) in fi.iter().zip(&expected) {
            prop_assert!((x - y).norm() < 1e-10 * scale);
        }
    }

    #[test]
    fn prop_hermitian_implicit_matches_direct((mut f, mut g) in complex_pair_strategy()) {
        let m = f.len();
        f[0].im = 0.0;
        g[0].im = 0.0;
        let expected = direct_hermitian(m, &f, &g);
        ImplicitHConvolution::new(m, StorageMode::Compact, 2, 1, &ConvolutionConfig::single_threaded())
            .unwrap()
            .convolve_pair(&mut f, &mut g)
            .unwrap();
        let scale = expected.iter().map(|x| x.norm()).fold(1.0, f64::max);
        for (x, y) in f.iter().zip(&expected) {
            prop_assert!((x - y).norm() < 1e-10 * scale);
        }
    }
}
