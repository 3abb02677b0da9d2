//! Measurement bases and per-round basis selection.

use crate::config::ProtocolConfig;
use crate::core::errors::ConfigError;
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

/// A single-qubit measurement basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Basis {
    /// Computational basis {|0>, |1>}.
    Z,
    /// Hadamard basis {|+>, |->}.
    X,
    /// Circular basis {|+i>, |-i>}.
    Y,
}

impl Basis {
    /// Single byte tag, used when hashing announcements.
    pub fn tag(self) -> u8 {
        match self {
            Basis::Z => 0,
            Basis::X => 1,
            Basis::Y => 2,
        }
    }
}

impl Zeroize for Basis {
    fn zeroize(&mut self) {
        *self = Basis::Z;
    }
}

impl fmt::Display for Basis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Basis::Z => "Z",
            Basis::X => "X",
            Basis::Y => "Y",
        };
        f.write_str(name)
    }
}

/// Source of per-round basis choices for one party.
///
/// Implementations must draw every round independently. A basis choice
/// cannot fail.
pub trait ChooseBasis {
    fn choose_basis(&mut self, round_index: usize) -> Basis;
}

/// Draws bases from an injected RNG, uniformly or with configured weights.
#[derive(Debug, Clone)]
pub struct RandomBasisSelector<R: Rng> {
    bases: Vec<Basis>,
    weights: Option<WeightedIndex<f64>>,
    rng: R,
}

impl<R: Rng> RandomBasisSelector<R> {
    /// Uniform selection over `bases`, each listed exactly once.
    pub fn uniform(bases: Vec<Basis>, rng: R) -> Result<Self, ConfigError> {
        check_basis_set(&bases)?;

        Ok(Self {
            bases,
            weights: None,
            rng,
        })
    }

    /// Biased selection, `weights[i]` being the relative weight of `bases[i]`.
    pub fn weighted(bases: Vec<Basis>, weights: &[f64], rng: R) -> Result<Self, ConfigError> {
        let mut selector = Self::uniform(bases, rng)?;

        if weights.len() != selector.bases.len() {
            return Err(ConfigError::WeightCountMismatch {
                weights: weights.len(),
                bases: selector.bases.len(),
            });
        }
        if let Some(&bad) = weights.iter().find(|w| !w.is_finite() || **w <= 0.0) {
            return Err(ConfigError::InvalidWeight(bad));
        }

        let dist = WeightedIndex::new(weights.iter().copied())
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        selector.weights = Some(dist);
        Ok(selector)
    }

    /// Selector over the configured basis set, weighted when the
    /// configuration gives `basis_weights`.
    pub fn from_config(config: &ProtocolConfig, rng: R) -> Result<Self, ConfigError> {
        match &config.basis_weights {
            Some(weights) => Self::weighted(config.basis_set.clone(), weights, rng),
            None => Self::uniform(config.basis_set.clone(), rng),
        }
    }

    pub fn bases(&self) -> &[Basis] {
        &self.bases
    }
}

impl<R: Rng> ChooseBasis for RandomBasisSelector<R> {
    fn choose_basis(&mut self, _round_index: usize) -> Basis {
        let idx = match &self.weights {
            Some(dist) => dist.sample(&mut self.rng),
            None => self.rng.random_range(0..self.bases.len()),
        };
        self.bases[idx]
    }
}

/// A basis set needs two or more distinct bases and no repeats, otherwise
/// indexing into it would not be uniform.
pub(crate) fn check_basis_set(bases: &[Basis]) -> Result<(), ConfigError> {
    let mut seen: Vec<Basis> = bases.to_vec();
    seen.sort();
    seen.dedup();
    if seen.len() < 2 {
        return Err(ConfigError::TooFewBases(seen.len()));
    }

    for (i, basis) in bases.iter().enumerate() {
        if bases[..i].contains(basis) {
            return Err(ConfigError::DuplicateBasis(*basis));
        }
    }
    Ok(())
}
