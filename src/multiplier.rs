//! Pointwise kernels applied between the forward and the inverse transforms.
//!
//! A multiplier sees one contiguous index range of every input lane and combines the `A` values
//! found at each index into at most `B` values written back into the leading lanes. Calls on
//! different ranges may run concurrently, so a multiplier must only write inside the lanes it
//! is handed.

use core::{
    fmt,
    ops::{AddAssign, Mul},
};

use crate::{
    errors::{ConvolutionError, Result},
    parallel::{for_each_indexed, partition_len},
};

/// Pointwise combination of `A` transformed sequences.
pub trait Multiplier<T>: Sync {
    /// Number of input lanes `A` the multiplier consumes.
    fn inputs(&self) -> usize;

    /// Combines the lanes index by index.
    ///
    /// All lanes have the same length. `thread` identifies the partition being processed and
    /// is smaller than the configured thread count.
    fn multiply(&self, lanes: &mut [&mut [T]], thread: usize);
}

/// The built-in products.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Product {
    /// `F0 <- F0 * F0`, one input.
    Autoconvolution,
    /// `F0 <- F0 * F1`, two inputs.
    Binary,
    /// `F0 <- sum over s < M of F_s * F_{s+M}`, `2M` inputs.
    PairSum(usize),
}

impl Product {
    /// Input counts that have a built-in product.
    pub const SUPPORTED_INPUTS: [usize; 6] = [1, 2, 4, 6, 8, 16];

    /// Selects the built-in product for `inputs` sequences.
    pub const fn for_inputs(inputs: usize) -> Result<Self> {
        match inputs {
            1 => Ok(Self::Autoconvolution),
            2 => Ok(Self::Binary),
            4 | 6 | 8 | 16 => Ok(Self::PairSum(inputs / 2)),
            _ => Err(ConvolutionError::UnsupportedArity(inputs)),
        }
    }

    /// Number of inputs the product consumes.
    #[must_use]
    pub const fn inputs(&self) -> usize {
        match self {
            Self::Autoconvolution => 1,
            Self::Binary => 2,
            Self::PairSum(pairs) => 2 * *pairs,
        }
    }
}

impl<T> Multiplier<T> for Product
where
    T: Copy + Mul<Output = T> + AddAssign,
{
    fn inputs(&self) -> usize {
        Self::inputs(self)
    }

    /// Panics when handed fewer lanes than [`Product::inputs`].
    fn multiply(&self, lanes: &mut [&mut [T]], _thread: usize) {
        match (*self, lanes) {
            (Self::Autoconvolution, [f, ..]) => f.iter_mut().for_each(|x| *x = *x * *x),
            (Self::Binary, [f, g, ..]) => {
                for (x, y) in f.iter_mut().zip(g.iter()) {
                    *x = *x * *y;
                }
            }
            (Self::PairSum(pairs), lanes) if pairs > 0 && lanes.len() >= 2 * pairs => {
                let (first, rest) = lanes.split_at_mut(1);
                for (i, out) in first[0].iter_mut().enumerate() {
                    let mut acc = *out * rest[pairs - 1][i];
                    for s in 1..pairs {
                        acc += rest[s - 1][i] * rest[s + pairs - 1][i];
                    }
                    *out = acc;
                }
            }
            (product, lanes) => panic!(
                "{product:?} needs {} lanes, called with {}",
                product.inputs(),
                lanes.len()
            ),
        }
    }
}

/// Adapts a closure into a [`Multiplier`].
pub struct FnMultiplier<F> {
    inputs: usize,
    f: F,
}

impl<F> FnMultiplier<F> {
    /// Wraps `f`, which consumes `inputs` lanes.
    pub const fn new(inputs: usize, f: F) -> Self {
        Self { inputs, f }
    }
}

impl<T, F> Multiplier<T> for FnMultiplier<F>
where
    F: Fn(&mut [&mut [T]], usize) + Sync,
{
    fn inputs(&self) -> usize {
        self.inputs
    }

    fn multiply(&self, lanes: &mut [&mut [T]], thread: usize) {
        (self.f)(lanes, thread);
    }
}

impl<F> fmt::Debug for FnMultiplier<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMultiplier")
            .field("inputs", &self.inputs)
            .finish_non_exhaustive()
    }
}

/// Runs `multiplier` over `lanes`, split into at most `threads` index partitions.
pub(crate) fn dispatch<T, M>(multiplier: &M, lanes: &mut [&mut [T]], threads: usize)
where
    T: Send,
    M: Multiplier<T> + ?Sized,
{
    let len = lanes.first().map_or(0, |lane| lane.len());
    debug_assert!(lanes.iter().all(|lane| lane.len() == len));

    let chunk = partition_len(len, threads);
    let mut partitions: Vec<Vec<&mut [T]>> = (0..len.div_ceil(chunk))
        .map(|_| Vec::with_capacity(lanes.len()))
        .collect();
    for lane in lanes.iter_mut() {
        for (partition, piece) in partitions.iter_mut().zip(lane.chunks_mut(chunk)) {
            partition.push(piece);
        }
    }

    for_each_indexed(partitions, |thread, mut partition| {
        multiplier.multiply(&mut partition, thread);
    });
}
