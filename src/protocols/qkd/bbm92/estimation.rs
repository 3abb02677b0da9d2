//! QBER estimation on a publicly disclosed sample of sifted bits.

use super::sifting::SiftedBitString;
use crate::core::errors::EstimationError;
use crate::core::utils::find_duplicate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bits one party reveals for error estimation, keyed by round index.
///
/// Once sent, these rounds are burned and never feed the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisclosedSample {
    indices: Vec<usize>,
    bits: Vec<bool>,
}

impl DisclosedSample {
    /// Collects the local bits at `sample_indices`.
    pub fn from_local(
        local: &SiftedBitString,
        sample_indices: &[usize],
    ) -> Result<Self, EstimationError> {
        if let Some(dup) = find_duplicate(sample_indices) {
            return Err(EstimationError::DuplicateSampleIndex(dup));
        }

        let bits = sample_indices
            .iter()
            .map(|&i| local.bit(i).ok_or(EstimationError::SampleNotSifted(i)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            indices: sample_indices.to_vec(),
            bits,
        })
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

    /// Disclosed bit for round `index`.
    pub fn bit(&self, index: usize) -> Option<bool> {
        self.indices
            .iter()
            .position(|&i| i == index)
            .and_then(|pos| self.bits.get(pos).copied())
    }

    /// Checks that the peer disclosed exactly the positions we expected.
    pub fn matches_sample(&self, sample_indices: &[usize]) -> Result<(), EstimationError> {
        if self.indices != sample_indices {
            return Err(EstimationError::DisclosureMismatch {
                local: sample_indices.len(),
                peer: self.indices.len(),
            });
        }
        Ok(())
    }
}

/// Quantum bit error rate, kept as the exact ratio `errors / sample_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Qber {
    pub errors: usize,
    pub sample_size: usize,
}

impl Qber {
    /// Counts the disagreements in a [`compare_sample`] result.
    pub fn from_checks(checks: &[(usize, bool)]) -> Self {
        Self {
            errors: checks.iter().filter(|(_, agreed)| !agreed).count(),
            sample_size: checks.len(),
        }
    }

    pub fn value(&self) -> f64 {
        if self.sample_size == 0 {
            return 0.0;
        }
        self.errors as f64 / self.sample_size as f64
    }

    /// True when the estimate is strictly above `threshold`.
    pub fn exceeds(&self, threshold: f64) -> bool {
        self.value() > threshold
    }
}

impl fmt::Display for Qber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} ({:.4})",
            self.errors,
            self.sample_size,
            self.value()
        )
    }
}

/// Compares local and peer bits over the sample.
///
/// # Returns
///
/// One `(round index, agreed)` entry per sample index, in sample order.
pub fn compare_sample(
    local_bits: &SiftedBitString,
    peer_disclosed: &DisclosedSample,
    sample_indices: &[usize],
) -> Result<Vec<(usize, bool)>, EstimationError> {
    if sample_indices.is_empty() {
        return Err(EstimationError::EmptySample);
    }
    if let Some(dup) = find_duplicate(sample_indices) {
        return Err(EstimationError::DuplicateSampleIndex(dup));
    }

    sample_indices
        .iter()
        .map(|&i| {
            let local = local_bits
                .bit(i)
                .ok_or(EstimationError::SampleNotSifted(i))?;
            let peer = peer_disclosed
                .bit(i)
                .ok_or(EstimationError::MissingDisclosure(i))?;
            Ok((i, local == peer))
        })
        .collect()
}

/// Estimates the QBER as the fraction of sample positions where the local
/// bit differs from the peer's disclosed bit.
pub fn estimate(
    local_bits: &SiftedBitString,
    peer_disclosed: &DisclosedSample,
    sample_indices: &[usize],
) -> Result<Qber, EstimationError> {
    let checks = compare_sample(local_bits, peer_disclosed, sample_indices)?;
    Ok(Qber::from_checks(&checks))
}
