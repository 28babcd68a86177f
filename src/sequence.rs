use core::ops::{Index, IndexMut};

use crate::errors::{ConvolutionError, Result};

/// An ordered set of equally long sequences stored back to back in one allocation.
///
/// Sequence `s` occupies `data[s * stride..s * stride + len]`. Position in the set is the only
/// identity a sequence has: multipliers pair inputs by index.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceSet<T> {
    data: Vec<T>,
    count: usize,
    len: usize,
    stride: usize,
}

impl<T: Clone + Default> SequenceSet<T> {
    /// Creates `count` sequences of `len` default values.
    #[must_use]
    pub fn new(count: usize, len: usize) -> Self {
        Self::with_stride(count, len, len)
    }

    /// Creates `count` sequences of `len` values placed `stride` elements apart.
    ///
    /// The `stride - len` trailing elements of every slot are padding and never exposed.
    #[must_use]
    pub fn with_stride(count: usize, len: usize, stride: usize) -> Self {
        assert!(stride >= len, "stride {stride} shorter than sequence length {len}");
        Self {
            data: vec![T::default(); count * stride],
            count,
            len,
            stride,
        }
    }

    /// Builds a set from individually owned sequences, which must all have the same length.
    pub fn from_sequences<I, S>(sequences: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[T]>,
    {
        let mut data = Vec::new();
        let mut count = 0;
        let mut len = None;
        for sequence in sequences {
            let sequence = sequence.as_ref();
            let expected = *len.get_or_insert(sequence.len());
            if sequence.len() != expected {
                return Err(ConvolutionError::SizeMismatch {
                    expected,
                    found: sequence.len(),
                });
            }
            data.extend_from_slice(sequence);
            count += 1;
        }
        let len = len.unwrap_or_default();
        Ok(Self {
            data,
            count,
            len,
            stride: len,
        })
    }
}

impl<T> SequenceSet<T> {
    /// Number of sequences.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Length of every sequence.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the sequences are empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Distance in elements between the starts of consecutive sequences.
    #[must_use]
    pub const fn stride(&self) -> usize {
        self.stride
    }

    /// Borrows sequence `s`.
    #[must_use]
    pub fn sequence(&self, s: usize) -> &[T] {
        assert!(s < self.count, "sequence {s} out of range for {} sequences", self.count);
        let start = s * self.stride;
        &self.data[start..start + self.len]
    }

    /// Mutably borrows sequence `s`.
    #[must_use]
    pub fn sequence_mut(&mut self, s: usize) -> &mut [T] {
        assert!(s < self.count, "sequence {s} out of range for {} sequences", self.count);
        let start = s * self.stride;
        &mut self.data[start..start + self.len]
    }

    /// Iterates over the sequences in order.
    pub fn iter(&self) -> impl Iterator<Item = &[T]> {
        self.data
            .chunks_exact(self.stride.max(1))
            .take(self.count)
            .map(|chunk| &chunk[..self.len])
    }

    /// Mutably borrows every sequence at once, in order.
    #[must_use]
    pub fn lanes_mut(&mut self) -> Vec<&mut [T]> {
        let len = self.len;
        self.data
            .chunks_exact_mut(self.stride.max(1))
            .take(self.count)
            .map(|chunk| &mut chunk[..len])
            .collect()
    }

    /// Consumes the set, returning each sequence separately.
    #[must_use]
    pub fn into_sequences(self) -> Vec<Vec<T>>
    where
        T: Clone,
    {
        self.iter().map(<[T]>::to_vec).collect()
    }
}

impl<T> Index<usize> for SequenceSet<T> {
    type Output = [T];

    fn index(&self, s: usize) -> &[T] {
        self.sequence(s)
    }
}

impl<T> IndexMut<usize> for SequenceSet<T> {
    fn index_mut(&mut self, s: usize) -> &mut [T] {
        self.sequence_mut(s)
    }
}
