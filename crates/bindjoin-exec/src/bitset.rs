//! Variable-subset bitsets.
//!
//! A [`VarBitSet`] records which variables of a reference [`JoinKey`] a row
//! binds: bit `i` is set iff the row binds `reference[i]`. [`to_bitset`] and
//! [`to_key`] convert between the two views and are inverses.

use std::fmt;

use bindjoin_types::Binding;
use smallvec::SmallVec;

use crate::join_key::{JoinKey, JoinKeyBuilder};

const WORD_BITS: usize = u64::BITS as usize;

/// Fixed-width bitset over the positions of a reference key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct VarBitSet {
    width: usize,
    words: SmallVec<[u64; 1]>,
}

impl VarBitSet {
    /// All-clear bitset of `width` bits.
    #[must_use]
    pub fn new(width: usize) -> Self {
        Self {
            width,
            words: smallvec::smallvec![0; width.div_ceil(WORD_BITS)],
        }
    }

    /// All-set bitset of `width` bits.
    #[must_use]
    pub fn full(width: usize) -> Self {
        let mut bits = Self::new(width);
        for idx in 0..width {
            bits.set(idx);
        }
        bits
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn set(&mut self, idx: usize) {
        debug_assert!(idx < self.width, "bit {idx} out of range {}", self.width);
        self.words[idx / WORD_BITS] |= 1_u64 << (idx % WORD_BITS);
    }

    #[must_use]
    pub fn contains(&self, idx: usize) -> bool {
        idx < self.width && self.words[idx / WORD_BITS] & (1_u64 << (idx % WORD_BITS)) != 0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Bitwise AND. Both sides must share a width.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        debug_assert_eq!(self.width, other.width);
        Self {
            width: self.width,
            words: self
                .words
                .iter()
                .zip(other.words.iter())
                .map(|(a, b)| a & b)
                .collect(),
        }
    }

    /// Positions of set bits, ascending.
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.width).filter(|idx| self.contains(*idx))
    }
}

impl fmt::Debug for VarBitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for idx in 0..self.width {
            f.write_str(if self.contains(idx) { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Bits of `reference` that `row` binds.
///
/// Walks whichever side is shorter: the row's own variables (looked up in
/// the reference) or the reference list (looked up in the row).
#[must_use]
pub fn to_bitset(reference: &JoinKey, row: &Binding) -> VarBitSet {
    let mut bits = VarBitSet::new(reference.len());
    if row.len() < reference.len() {
        for var in row.vars() {
            if let Some(idx) = reference.position(var) {
                bits.set(idx);
            }
        }
    } else {
        for (idx, var) in reference.iter().enumerate() {
            if row.contains(var) {
                bits.set(idx);
            }
        }
    }
    bits
}

/// Variables of `reference` at the set positions of `bits`, in reference order.
#[must_use]
pub fn to_key(reference: &JoinKey, bits: &VarBitSet) -> JoinKey {
    let mut builder = JoinKeyBuilder::new();
    for idx in bits.ones() {
        if let Some(var) = reference.get(idx) {
            builder.add(var.clone());
        }
    }
    builder.build()
}

/// Bits of `reference` occupied by the variables of `key`.
#[must_use]
pub fn key_bits(reference: &JoinKey, key: &JoinKey) -> VarBitSet {
    let mut bits = VarBitSet::new(reference.len());
    for var in key {
        if let Some(idx) = reference.position(var) {
            bits.set(idx);
        }
    }
    bits
}
