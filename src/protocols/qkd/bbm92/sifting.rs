//! Sifting: keep only the rounds where both parties measured in the same basis.

use crate::core::errors::SiftError;
use crate::core::round::{BasisAnnouncement, RawSequence};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Ascending round indices where the two announced bases agree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiftedIndexSet {
    indices: Vec<usize>,
}

impl SiftedIndexSet {
    /// Wraps indices that are already sorted and free of duplicates.
    pub fn from_sorted(indices: Vec<usize>) -> Self {
        debug_assert!(indices.windows(2).all(|w| w[0] < w[1]));
        Self { indices }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.binary_search(&index).is_ok()
    }
}

/// Computes the sifted index set from two basis announcements.
///
/// The result depends only on which rounds agree, so both parties get the same
/// set whichever announcement they pass as `local`.
pub fn sift(
    local: &BasisAnnouncement,
    peer: &BasisAnnouncement,
) -> Result<SiftedIndexSet, SiftError> {
    if local.len() != peer.len() {
        return Err(SiftError::AnnouncementLengthMismatch {
            local: local.len(),
            peer: peer.len(),
        });
    }

    let indices = local
        .bases
        .iter()
        .zip(peer.bases.iter())
        .enumerate()
        .filter_map(|(i, (a, b))| (a == b).then_some(i))
        .collect();

    Ok(SiftedIndexSet { indices })
}

/// One party's outcomes on the sifted rounds, labelled with their round index.
#[derive(Debug, Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SiftedBitString {
    indices: Vec<usize>,
    bits: Vec<bool>,
}

impl SiftedBitString {
    /// Reduces a raw sequence to the rounds in `sifted`, in index order.
    ///
    /// `sifted` must come from [`sift`] over this sequence's announcement, so
    /// every index is in range.
    pub fn from_raw(raw: &RawSequence, sifted: &SiftedIndexSet) -> Self {
        let mut indices = Vec::with_capacity(sifted.len());
        let mut bits = Vec::with_capacity(sifted.len());
        for &i in sifted.indices() {
            if let Some(bit) = raw.outcome(i) {
                indices.push(i);
                bits.push(bit);
            }
        }
        Self { indices, bits }
    }

    /// Builds a bit string from `(round index, bit)` pairs in ascending index order.
    pub fn from_labelled(labelled: impl IntoIterator<Item = (usize, bool)>) -> Self {
        let (indices, bits) = labelled.into_iter().unzip();
        Self { indices, bits }
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Bit measured in round `index`, if that round was sifted.
    pub fn bit(&self, index: usize) -> Option<bool> {
        self.indices
            .binary_search(&index)
            .ok()
            .map(|pos| self.bits[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, bool)> + '_ {
        self.indices.iter().copied().zip(self.bits.iter().copied())
    }
}
