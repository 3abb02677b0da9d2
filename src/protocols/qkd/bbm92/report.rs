use super::estimation::Qber;
use super::sifting::SiftedIndexSet;
use crate::core::basis::Basis;
use crate::core::round::{BasisAnnouncement, RawSequence};
use crate::core::utils::key_rate_potential;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Public per-round bookkeeping. Outcomes are deliberately absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoundRow {
    pub index: usize,
    pub basis: Basis,
    /// Whether the peer announced the same basis.
    pub same_basis: bool,
    /// `Some(agreed)` for disclosed rounds, `None` for the rest.
    pub check: Option<bool>,
}

/// Diagnostics returned next to the key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub total_rounds: usize,
    /// Rounds this party measured in each basis.
    pub basis_counts: BTreeMap<Basis, usize>,
    /// Rounds where both parties used the same basis.
    pub sifted_length: usize,
    /// Sifted rounds disclosed for error estimation.
    pub sample_size: usize,
    /// Disclosed rounds where the outcomes differed.
    pub diff_outcome_count: usize,
    pub qber: Qber,
    pub key_length: usize,
    /// Asymptotic secure fraction of the raw key, `1 - 2h(QBER)`.
    pub key_rate_potential: f64,
    pub rows: Vec<RoundRow>,
}

impl RunReport {
    pub(crate) fn new(
        local: &RawSequence,
        peer: &BasisAnnouncement,
        sifted: &SiftedIndexSet,
        checks: &[(usize, bool)],
        qber: Qber,
        key_length: usize,
    ) -> Self {
        let checks: HashMap<usize, bool> = checks.iter().copied().collect();

        let rows = local
            .rounds()
            .iter()
            .zip(peer.bases.iter())
            .map(|(round, &peer_basis)| RoundRow {
                index: round.index,
                basis: round.basis,
                same_basis: round.basis == peer_basis,
                check: checks.get(&round.index).copied(),
            })
            .collect();

        Self {
            total_rounds: local.len(),
            basis_counts: local.basis_counts(),
            sifted_length: sifted.len(),
            sample_size: qber.sample_size,
            diff_outcome_count: qber.errors,
            qber,
            key_length,
            key_rate_potential: key_rate_potential(qber.value()),
            rows,
        }
    }
}
