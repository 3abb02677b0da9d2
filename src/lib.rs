//! Entanglement-based quantum key distribution (BBM92) for two parties
//! connected by an authenticated classical channel.

pub mod channel;
pub mod config;
mod core;
pub mod protocols;
mod sampler;
pub mod source;

#[cfg(feature = "testkit")]
pub mod testkit;

pub use crate::channel::{ChannelGuarantees, ClassicalChannel, InMemoryChannel};
pub use crate::config::ProtocolConfig;
pub use crate::core::{
    Basis, BasisAnnouncement, ChooseBasis, RandomBasisSelector, RawSequence, Round,
    RoundRecorder, errors, utils,
};
pub use crate::protocols::bbm92::{
    KeyMaterial, Orchestrator, Phase, Role, RunReport, SessionContext, SessionOutcome,
};
pub use crate::sampler::{SampleSeed, SampleSize, SampleStrategy};
pub use crate::source::PairSource;
