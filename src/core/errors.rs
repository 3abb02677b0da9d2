use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::basis::Basis;
use crate::protocols::qkd::bbm92::Phase;

/// Coarse classification of a [`ProtocolError`].
///
/// Sent along with an abort notice, so the peer sees why the session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Local bookkeeping bug. Not recoverable by retry.
    Sequencing,
    /// The two parties disagree about the classical exchange.
    Synchronization,
    /// The run was stopped to protect key secrecy.
    SecurityPolicy,
    /// Too few rounds for the requested key. Raise `total_rounds`.
    Capacity,
    /// The configuration itself is invalid.
    Configuration,
    /// The pair source failed to deliver an outcome.
    Measurement,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SequenceError {
    #[error("Round {0} was already recorded")]
    DuplicateRound(usize),

    #[error("Round {got} recorded out of order, expected round {expected}")]
    OutOfOrderRound { expected: usize, got: usize },

    #[error("Round {index} is outside the configured {total} rounds")]
    RoundOutOfRange { index: usize, total: usize },

    #[error("Sequence is frozen, no more rounds can be recorded")]
    SequenceFrozen,

    #[error("Sequence incomplete: {recorded} of {expected} rounds recorded")]
    IncompleteSequence { recorded: usize, expected: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SiftError {
    #[error("Basis announcements differ in length (local {local}, peer {peer})")]
    AnnouncementLengthMismatch { local: usize, peer: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EstimationError {
    #[error("Disclosure sample is empty, QBER cannot be estimated")]
    EmptySample,

    #[error("Sample index {0} is not part of the sifted set")]
    SampleNotSifted(usize),

    #[error("Duplicate sample index found: {0}")]
    DuplicateSampleIndex(usize),

    #[error("Peer did not disclose a bit for sample index {0}")]
    MissingDisclosure(usize),

    #[error("Peer disclosed a different sample ({peer} indices) than expected ({local} indices)")]
    DisclosureMismatch { local: usize, peer: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Insufficient key material: {available} undisclosed sifted bits, {required} required")]
    InsufficientKeyMaterial { available: usize, required: usize },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("total_rounds must be at least 1")]
    NoRounds,

    #[error("basis_set needs at least two distinct bases, got {0}")]
    TooFewBases(usize),

    #[error("Basis {0} is listed more than once in basis_set")]
    DuplicateBasis(Basis),

    #[error("basis_weights has {weights} entries but basis_set has {bases}")]
    WeightCountMismatch { weights: usize, bases: usize },

    #[error("Invalid basis weight: {0}. Weights must be finite and positive")]
    InvalidWeight(f64),

    #[error("Invalid sample fraction: {0}. Must be in (0.0, 1.0]")]
    InvalidSampleFraction(f64),

    #[error("Sample count must be at least 1")]
    EmptySampleCount,

    #[error("Invalid abort threshold: {0}. Must be between 0.0 and 1.0")]
    InvalidThreshold(f64),

    #[error("target_key_length must be at least 1")]
    EmptyKey,

    #[error("channel_timeout must be non-zero")]
    ZeroTimeout,

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Classical channel closed by peer")]
    Closed,

    #[error("Failed to send on classical channel: {0}")]
    Send(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Measurement failed in round {round_index}: {reason}")]
pub struct MeasurementFailure {
    pub round_index: usize,
    pub reason: String,
}

#[derive(Error, Debug, Clone)]
pub enum ProtocolError {
    #[error("Sequencing error: {0}")]
    Sequence(#[from] SequenceError),

    #[error("Sifting error: {0}")]
    Sift(#[from] SiftError),

    #[error("Estimation error: {0}")]
    Estimation(#[from] EstimationError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Measurement(#[from] MeasurementFailure),

    #[error("Channel error during {phase}: {source}")]
    Channel { phase: Phase, source: ChannelError },

    #[error("Timed out waiting for peer during {phase}")]
    ChannelTimeout { phase: Phase },

    #[error("Classical channel does not guarantee origin authentication and integrity")]
    UnauthenticatedChannel,

    #[error("Failed to encode message: {0}")]
    Encode(String),

    #[error("Failed to decode peer message: {0}")]
    Decode(String),

    #[error("Expected {expected} message from peer, got {got}")]
    UnexpectedMessage {
        expected: &'static str,
        got: &'static str,
    },

    #[error("No sifted bits: the parties never chose the same basis")]
    InsufficientSiftedBits,

    #[error(
        "aborted: possible eavesdropping or excessive noise \
         (QBER {qber:.4} exceeds threshold {threshold:.4})"
    )]
    EavesdroppingSuspected { qber: f64, threshold: f64 },

    #[error("Peer summary disagrees with local bookkeeping: {0}")]
    SummaryMismatch(String),

    #[error("Peer aborted the session: {reason}")]
    PeerAborted { class: ErrorClass, reason: String },

    #[error("Invalid phase transition from {from} to {to}")]
    InvalidTransition { from: Phase, to: Phase },
}

impl ProtocolError {
    /// Classifies the error so callers can tell a suspected eavesdropper
    /// apart from a plain channel failure or a capacity problem.
    pub fn class(&self) -> ErrorClass {
        match self {
            ProtocolError::Sequence(_) | ProtocolError::InvalidTransition { .. } => {
                ErrorClass::Sequencing
            }
            ProtocolError::Sift(_)
            | ProtocolError::Channel { .. }
            | ProtocolError::ChannelTimeout { .. }
            | ProtocolError::Encode(_)
            | ProtocolError::Decode(_)
            | ProtocolError::UnexpectedMessage { .. }
            | ProtocolError::SummaryMismatch(_) => ErrorClass::Synchronization,
            ProtocolError::PeerAborted { class, .. } => *class,
            ProtocolError::Estimation(EstimationError::EmptySample) => ErrorClass::Capacity,
            ProtocolError::Estimation(_) => ErrorClass::Synchronization,
            ProtocolError::EavesdroppingSuspected { .. }
            | ProtocolError::UnauthenticatedChannel => ErrorClass::SecurityPolicy,
            ProtocolError::InsufficientSiftedBits | ProtocolError::Extraction(_) => {
                ErrorClass::Capacity
            }
            ProtocolError::Config(_) => ErrorClass::Configuration,
            ProtocolError::Measurement(_) => ErrorClass::Measurement,
        }
    }
}
