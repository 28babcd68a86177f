use std::time::{Duration, Instant};

use clap::Parser;
use dealias::{
    Complex64, ConvolutionConfig, DirectConvolution, DirectHConvolution, ExplicitConvolution,
    ExplicitHConvolution, ImplicitConvolution, ImplicitHConvolution, Product, SequenceSet,
    StorageMode,
    fft::utils::{complex_padding, hermitian_padding},
};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::info;
use tracing_forest::{ForestLayer, util::LevelFilter};
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Runs one dealiased convolution and checks it against the direct sum", long_about = None)]
struct Args {
    /// Number of points (complex) or modes (Hermitian).
    #[arg(short = 'm', long, default_value = "11")]
    size: usize,

    /// Number of input sequences.
    #[arg(short = 'a', long, default_value = "2")]
    inputs: usize,

    /// Number of output sequences.
    #[arg(short = 'b', long, default_value = "1")]
    outputs: usize,

    /// Worker threads, defaults to the available parallelism.
    #[arg(short = 't', long)]
    threads: Option<usize>,

    /// Convolve Hermitian sequences.
    #[arg(long)]
    hermitian: bool,

    /// Store Hermitian sequences with a trailing guard element.
    #[arg(long)]
    non_compact: bool,

    /// Use the zero-padded convolution instead of the implicit one.
    #[arg(long)]
    explicit: bool,

    /// Number of repetitions to time.
    #[arg(short = 'n', long, default_value = "1")]
    repeats: usize,

    /// Fill the inputs with random data from this seed instead of the reference sequences.
    #[arg(short = 's', long)]
    seed: Option<u64>,
}

/// Input pair: either random or `f[k] = (k, k + 1)`, `g[k] = (k, 2k + 1)`.
fn input_pair(m: usize, hermitian: bool, seed: Option<u64>) -> (Vec<Complex64>, Vec<Complex64>) {
    let (mut f, mut g): (Vec<_>, Vec<_>) = match seed {
        Some(seed) => {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..m)
                .map(|_| {
                    let mut sample = || Complex64::new(rng.random(), rng.random());
                    (sample(), sample())
                })
                .unzip()
        }
        None => (0..m)
            .map(|k| {
                let k = k as f64;
                (Complex64::new(k, k + 1.0), Complex64::new(k, 2.0 * k + 1.0))
            })
            .unzip(),
    };
    if hermitian {
        f[0] = Complex64::new(1.0, 0.0);
        g[0] = Complex64::new(2.0, 0.0);
    }
    (f, g)
}

/// Spreads the pair over `inputs` sequences so that the built-in product still yields `f * g`.
fn spread(f: &[Complex64], g: &[Complex64], inputs: usize) -> Vec<Vec<Complex64>> {
    match inputs {
        1 => vec![f.to_vec()],
        2 => vec![f.to_vec(), g.to_vec()],
        _ => {
            let pairs = inputs / 2;
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
    }
}

fn max_error(result: &[Complex64], expected: &[Complex64]) -> f64 {
    let norm = expected.iter().map(|x| x.norm()).fold(1.0, f64::max);
    result
        .iter()
        .zip(expected)
        .map(|(x, y)| (x - y).norm())
        .fold(0.0, f64::max)
        / norm
}

fn main() -> dealias::Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    Registry::default()
        .with(env_filter)
        .with(ForestLayer::default())
        .init();

    let args = Args::parse();
    let m = args.size;
    let config = args.threads.map_or_else(ConvolutionConfig::default, |threads| {
        ConvolutionConfig::single_threaded().with_threads(threads)
    });
    config.check_validity()?;
    let product = Product::for_inputs(args.inputs)?;
    let storage = if args.non_compact {
        StorageMode::NonCompact
    } else {
        StorageMode::Compact
    };

    let (f, g) = input_pair(m, args.hermitian, args.seed);
    let mut expected = vec![Complex64::default(); m];
    let g_or_f = if args.inputs == 1 { &f } else { &g };
    if args.hermitian {
        DirectHConvolution::new(m)?.convolve(&mut expected, &f, g_or_f)?;
    } else {
        DirectConvolution::new(m)?.convolve(&mut expected, &f, g_or_f)?;
    }

    println!("=========================================");
    println!(
        "{} {} convolution, m = {m}, A = {}, B = {}, {config}",
        if args.explicit { "explicit" } else { "implicit" },
        if args.hermitian { "Hermitian" } else { "complex" },
        args.inputs,
        args.outputs,
    );

    let repeats = args.repeats.max(1);
    let mut elapsed = Duration::ZERO;
    // Plans are built once; only the convolutions themselves are timed.
    let mut timed = |op: &mut dyn FnMut() -> dealias::Result<()>| -> dealias::Result<()> {
        let start = Instant::now();
        op()?;
        elapsed += start.elapsed();
        Ok(())
    };

    let mut result = Vec::new();
    match (args.explicit, args.hermitian) {
        (true, false) => {
            let n = complex_padding(m);
            let mut conv = ExplicitConvolution::new(n, m, &config)?;
            for _ in 0..repeats {
                let (mut fp, mut gp) = (f.clone(), g_or_f.clone());
                fp.resize(n, Complex64::default());
                gp.resize(n, Complex64::default());
                timed(&mut || conv.convolve(&mut fp, &mut gp))?;
                fp.truncate(m);
                result = fp;
            }
        }
        (true, true) => {
            let mut conv = ExplicitHConvolution::new(hermitian_padding(m), m, &config)?;
            let len = conv.spectrum_len();
            for _ in 0..repeats {
                let (mut fp, mut gp) = (f.clone(), g_or_f.clone());
                fp.resize(len, Complex64::default());
                gp.resize(len, Complex64::default());
                timed(&mut || conv.convolve(&mut fp, &mut gp))?;
                fp.truncate(m);
                result = fp;
            }
        }
        (false, false) => {
            let mut conv = ImplicitConvolution::new(m, args.inputs, args.outputs, &config)?;
            for _ in 0..repeats {
                let mut set = SequenceSet::from_sequences(spread(&f, &g, args.inputs))?;
                timed(&mut || conv.convolve(&mut set, &product))?;
                result = set[0].to_vec();
            }
        }
        (false, true) => {
            let mut conv =
                ImplicitHConvolution::new(m, storage, args.inputs, args.outputs, &config)?;
            let len = storage.sequence_len(m);
            for _ in 0..repeats {
                let sequences = spread(&f, &g, args.inputs).into_iter().map(|mut s| {
                    s.resize(len, Complex64::default());
                    s
                });
                let mut set = SequenceSet::from_sequences(sequences)?;
                timed(&mut || conv.convolve(&mut set, &product))?;
                result = set[0][..m].to_vec();
            }
        }
    }
    let elapsed = Duration::from_secs_f64(elapsed.as_secs_f64() / repeats as f64);

    info!(?elapsed, "convolution finished");
    if m < 20 {
        for (k, value) in result.iter().enumerate() {
            println!("{k:>4}  {value:.6}");
        }
    }
    println!("Error against direct sum: {:.3e}", max_error(&result, &expected));
    println!("Time per convolution: {elapsed:?}");
    Ok(())
}
