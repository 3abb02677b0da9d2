use super::estimation::DisclosedSample;
use super::orchestrator::Phase;
use crate::core::errors::{ErrorClass, ProtocolError};
use crate::core::round::BasisAnnouncement;
use serde::{Deserialize, Serialize};

/// Everything the two parties say to each other over the classical channel.
///
/// Nothing here ever carries an undisclosed outcome or a key bit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    /// Bases used in every round, sent once measuring is over.
    Bases(BasisAnnouncement),
    /// Bits at the agreed sample positions.
    Disclosure(DisclosedSample),
    /// Final bookkeeping, compared by both sides before a key is released.
    Summary(SessionSummary),
    /// The sender gave up. The receiver must discard its state too.
    Abort(AbortNotice),
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Bases(_) => "bases",
            Message::Disclosure(_) => "disclosure",
            Message::Summary(_) => "summary",
            Message::Abort(_) => "abort",
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        bincode::serialize(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        bincode::deserialize(bytes).map_err(|e| ProtocolError::Decode(e.to_string()))
    }
}

/// Public metadata both parties must agree on for a run to finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub sifted_length: usize,
    pub sample_size: usize,
    pub qber_errors: usize,
    pub key_length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbortNotice {
    /// Phase the sender was in when it aborted.
    pub phase: Phase,
    /// Class of the error that ended the sender's session.
    pub class: ErrorClass,
    pub reason: String,
}
