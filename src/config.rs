//! Protocol configuration.
//!
//! Every option has a default, so an empty TOML document is a valid
//! configuration:
//!
//! ```toml
//! total_rounds = 144
//! basis_set = ["Z", "X"]
//! sample_size = { fraction = 0.25 }
//! sample_strategy = "seeded"
//! abort_threshold = 0.11
//! target_key_length = 16
//! channel_timeout = 30000 # milliseconds
//! ```

use crate::core::basis::{Basis, check_basis_set};
use crate::core::errors::ConfigError;
use crate::sampler::{SampleSize, SampleStrategy};
use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, serde_as};
use std::time::Duration;

/// Options recognized by a BBM92 session.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProtocolConfig {
    /// Number of entangled pairs measured per run.
    pub total_rounds: usize,

    /// Bases each party chooses from.
    pub basis_set: Vec<Basis>,

    /// Relative weight per entry of `basis_set`. Uniform when absent.
    pub basis_weights: Option<Vec<f64>>,

    /// Number of sifted bits disclosed for QBER estimation.
    pub sample_size: SampleSize,

    /// Rule used to pick which sifted bits are disclosed.
    pub sample_strategy: SampleStrategy,

    /// Largest tolerated QBER. A higher estimate aborts the run.
    pub abort_threshold: f64,

    /// Length of the extracted key, in bits.
    pub target_key_length: usize,

    /// How long to wait for each peer message.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub channel_timeout: Duration,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            total_rounds: 144,
            basis_set: vec![Basis::Z, Basis::X],
            basis_weights: None,
            sample_size: SampleSize::default(),
            sample_strategy: SampleStrategy::default(),
            abort_threshold: 0.11,
            target_key_length: 16,
            channel_timeout: Duration::from_secs(30),
        }
    }
}

impl ProtocolConfig {
    /// Parses a TOML document and validates the result.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: ProtocolConfig =
            toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Checks every option against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_rounds == 0 {
            return Err(ConfigError::NoRounds);
        }

        check_basis_set(&self.basis_set)?;

        if let Some(weights) = &self.basis_weights {
            if weights.len() != self.basis_set.len() {
                return Err(ConfigError::WeightCountMismatch {
                    weights: weights.len(),
                    bases: self.basis_set.len(),
                });
            }
            if let Some(&bad) = weights.iter().find(|w| !w.is_finite() || **w <= 0.0) {
                return Err(ConfigError::InvalidWeight(bad));
            }
        }

        match self.sample_size {
            SampleSize::Count(0) => return Err(ConfigError::EmptySampleCount),
            SampleSize::Fraction(f) if !(f > 0.0 && f <= 1.0) => {
                return Err(ConfigError::InvalidSampleFraction(f));
            }
            _ => {}
        }

        if !(0.0..=1.0).contains(&self.abort_threshold) {
            return Err(ConfigError::InvalidThreshold(self.abort_threshold));
        }

        if self.target_key_length == 0 {
            return Err(ConfigError::EmptyKey);
        }

        if self.channel_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }

        Ok(())
    }
}
