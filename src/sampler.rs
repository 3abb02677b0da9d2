use crate::core::basis::Basis;
use crate::core::errors::EstimationError;
use crate::core::round::BasisAnnouncement;
use crate::protocols::qkd::bbm92::SiftedIndexSet;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// How many sifted bits to sacrifice for error estimation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleSize {
    /// A fixed number of bits.
    Count(usize),
    /// A fraction of the sifted length, rounded to the nearest bit.
    Fraction(f64),
}

impl Default for SampleSize {
    fn default() -> Self {
        SampleSize::Fraction(0.25)
    }
}

impl SampleSize {
    /// Resolves the sample size against the number of sifted bits.
    ///
    /// The size is clamped to `sifted_len`. A resolved size of zero cannot be
    /// used to estimate the QBER.
    pub fn resolve(&self, sifted_len: usize) -> Result<usize, EstimationError> {
        let size = match *self {
            SampleSize::Count(n) => n,
            SampleSize::Fraction(f) => (sifted_len as f64 * f).round() as usize,
        }
        .min(sifted_len);

        if size == 0 {
            return Err(EstimationError::EmptySample);
        }
        Ok(size)
    }
}

/// Rule both parties apply to pick the disclosed positions.
///
/// Whichever strategy is configured, both sides derive the same sample from
/// data they already share, so choosing it costs no extra message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleStrategy {
    /// The first `n` sifted indices.
    Prefix,
    /// `n` sifted indices drawn without replacement by a generator seeded
    /// from both basis announcements.
    #[default]
    Seeded,
}

/// Seed shared by both parties once the basis announcements are exchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleSeed([u8; 32]);

impl SampleSeed {
    /// Derives the seed as SHA-256 over Alice's and then Bob's announcement.
    ///
    /// The bases are fixed only after every round is measured, so the seed
    /// cannot be known while pairs are still in flight.
    pub fn derive(alice: &BasisAnnouncement, bob: &BasisAnnouncement) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"bbm92/disclosure-sample/v1");
        for announcement in [alice, bob] {
            hasher.update((announcement.len() as u64).to_le_bytes());
            hasher.update(
                announcement
                    .bases
                    .iter()
                    .map(|b: &Basis| b.tag())
                    .collect::<Vec<u8>>(),
            );
        }
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl SampleStrategy {
    /// Selects `size` sample indices out of `sifted`.
    ///
    /// # Arguments
    ///
    /// * `sifted` - The sifted index set, in ascending order.
    /// * `size` - Number of indices to disclose, already resolved by [`SampleSize::resolve`].
    /// * `seed` - Shared seed, only consulted by [`SampleStrategy::Seeded`].
    ///
    /// # Returns
    ///
    /// Round indices in ascending order, a subset of `sifted`.
    pub fn select(&self, sifted: &SiftedIndexSet, size: usize, seed: &SampleSeed) -> Vec<usize> {
        let indices = sifted.indices();
        let size = size.min(indices.len());

        match self {
            SampleStrategy::Prefix => indices[..size].to_vec(),
            SampleStrategy::Seeded => {
                let mut rng = StdRng::from_seed(seed.0);
                let mut positions = index::sample(&mut rng, indices.len(), size).into_vec();
                positions.sort_unstable();
                positions.into_iter().map(|p| indices[p]).collect()
            }
        }
    }
}
