//! Quantum-pair source seam.

use crate::core::basis::Basis;
use crate::core::errors::MeasurementFailure;

/// Delivers this party's half of each entangled pair, measured in the
/// requested basis.
///
/// Calls are synchronous and made once per round, in round order. A failure
/// aborts the whole session.
pub trait PairSource {
    fn measure(&mut self, round_index: usize, basis: Basis) -> Result<bool, MeasurementFailure>;
}
