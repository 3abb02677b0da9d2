//! Per-round measurement records and the raw sequence they build up.

use crate::core::basis::Basis;
use crate::core::errors::SequenceError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// One measured half of an entangled pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Zeroize)]
pub struct Round {
    /// Position in the pair stream (0-based).
    pub index: usize,
    /// Basis the party measured in.
    pub basis: Basis,
    /// Measurement outcome.
    pub outcome: bool,
}

/// The full, index-aligned list of rounds measured by one party.
///
/// Holds secret outcomes and is wiped on drop.
#[derive(Debug, Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct RawSequence {
    rounds: Vec<Round>,
}

impl RawSequence {
    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    /// Outcome of round `index`, if it exists.
    pub fn outcome(&self, index: usize) -> Option<bool> {
        self.rounds.get(index).map(|r| r.outcome)
    }

    /// Projects the sequence onto its bases. Outcomes are not carried.
    pub fn announcement(&self) -> BasisAnnouncement {
        BasisAnnouncement {
            bases: self.rounds.iter().map(|r| r.basis).collect(),
        }
    }

    /// Number of rounds measured in each basis.
    pub fn basis_counts(&self) -> BTreeMap<Basis, usize> {
        let mut counts = BTreeMap::new();
        for round in &self.rounds {
            *counts.entry(round.basis).or_insert(0) += 1;
        }
        counts
    }
}

/// Basis-only view of a [`RawSequence`], exchanged over the classical channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasisAnnouncement {
    pub bases: Vec<Basis>,
}

impl BasisAnnouncement {
    pub fn new(bases: Vec<Basis>) -> Self {
        Self { bases }
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }
}

/// Accumulates rounds strictly in index order and freezes them once complete.
#[derive(Debug)]
pub struct RoundRecorder {
    total_rounds: usize,
    rounds: Vec<Round>,
    frozen: Option<RawSequence>,
}

impl RoundRecorder {
    pub fn new(total_rounds: usize) -> Self {
        Self {
            total_rounds,
            rounds: Vec::with_capacity(total_rounds),
            frozen: None,
        }
    }

    /// Number of rounds recorded so far.
    pub fn recorded(&self) -> usize {
        self.frozen
            .as_ref()
            .map_or(self.rounds.len(), RawSequence::len)
    }

    /// Records the outcome of `round_index`.
    ///
    /// Rounds must arrive as 0, 1, 2, ... so that both parties stay index
    /// aligned.
    pub fn record(
        &mut self,
        round_index: usize,
        basis: Basis,
        outcome: bool,
    ) -> Result<Round, SequenceError> {
        if self.frozen.is_some() {
            return Err(SequenceError::SequenceFrozen);
        }
        if round_index >= self.total_rounds {
            return Err(SequenceError::RoundOutOfRange {
                index: round_index,
                total: self.total_rounds,
            });
        }

        let expected = self.rounds.len();
        if round_index < expected {
            return Err(SequenceError::DuplicateRound(round_index));
        }
        if round_index > expected {
            return Err(SequenceError::OutOfOrderRound {
                expected,
                got: round_index,
            });
        }

        let round = Round {
            index: round_index,
            basis,
            outcome,
        };
        self.rounds.push(round);
        Ok(round)
    }

    /// Freezes the sequence.
    ///
    /// The first call checks that every configured round was recorded. Later
    /// calls return the already frozen sequence as is.
    pub fn finalize(&mut self) -> Result<&RawSequence, SequenceError> {
        if self.frozen.is_none() {
            if self.rounds.len() != self.total_rounds {
                return Err(SequenceError::IncompleteSequence {
                    recorded: self.rounds.len(),
                    expected: self.total_rounds,
                });
            }
            let rounds = std::mem::take(&mut self.rounds);
            self.frozen = Some(RawSequence { rounds });
        }

        self.frozen.as_ref().ok_or(SequenceError::SequenceFrozen)
    }
}

impl Drop for RoundRecorder {
    fn drop(&mut self) {
        self.rounds.zeroize();
    }
}
