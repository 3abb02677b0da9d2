//! BBM92 Quantum Key Distribution Protocol.
//!
//! BBM92 is an entanglement-based QKD protocol proposed by Bennett, Brassard, and Mermin in 1992.
//! A source distributes entangled pairs to Alice and Bob, who each measure their half in a
//! randomly chosen basis. Once every round is measured they announce their bases, keep the
//! rounds where the bases agree, sacrifice a sample of those to estimate the error rate and,
//! if the rate is acceptable, keep the rest as a shared key.
//!
//! The pieces below are usable on their own. [`Orchestrator`] strings them together for one
//! party talking to its peer over a [`ClassicalChannel`](crate::channel::ClassicalChannel).

mod estimation;
mod extraction;
mod messages;
mod orchestrator;
mod report;
mod sifting;

pub use estimation::{DisclosedSample, Qber, compare_sample, estimate};
pub use extraction::{KeyMaterial, extract};
pub use messages::{AbortNotice, Message, SessionSummary};
pub use orchestrator::{Orchestrator, Phase, Role, SessionContext, SessionOutcome};
pub use report::{RoundRow, RunReport};
pub use sifting::{SiftedBitString, SiftedIndexSet, sift};
