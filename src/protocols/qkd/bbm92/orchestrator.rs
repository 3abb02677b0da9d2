//! Per-party BBM92 session driver.
//!
//! Each party runs its own [`Orchestrator`]. The two instances share nothing
//! but the classical channel and move through the same phases in lock step,
//! waiting on the peer wherever the next phase needs its data.

use super::estimation::{DisclosedSample, Qber, compare_sample};
use super::extraction::{KeyMaterial, extract};
use super::messages::{AbortNotice, Message, SessionSummary};
use super::report::RunReport;
use super::sifting::{SiftedBitString, sift};
use crate::channel::ClassicalChannel;
use crate::config::ProtocolConfig;
use crate::core::basis::ChooseBasis;
use crate::core::errors::{ChannelError, ProtocolError};
use crate::core::round::{BasisAnnouncement, RoundRecorder};
use crate::sampler::SampleSeed;
use crate::source::PairSource;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{Instrument, debug, info, info_span, warn};

/// Session phases, in the order they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    Measuring,
    Announcing,
    Sifting,
    Estimating,
    Extracting,
    Done,
    Aborted,
}

impl Phase {
    /// The phase that follows on success, if any.
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Idle => Some(Phase::Measuring),
            Phase::Measuring => Some(Phase::Announcing),
            Phase::Announcing => Some(Phase::Sifting),
            Phase::Sifting => Some(Phase::Estimating),
            Phase::Estimating => Some(Phase::Extracting),
            Phase::Extracting => Some(Phase::Done),
            Phase::Done | Phase::Aborted => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Done | Phase::Aborted)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Measuring => "measuring",
            Phase::Announcing => "announcing",
            Phase::Sifting => "sifting",
            Phase::Estimating => "estimating",
            Phase::Extracting => "extracting",
            Phase::Done => "done",
            Phase::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Which end of the pair stream this party holds.
///
/// Roles only fix the order in which announcements feed the shared sample
/// seed. Both roles run the same steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Alice,
    Bob,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Alice => f.write_str("alice"),
            Role::Bob => f.write_str("bob"),
        }
    }
}

/// Explicit per-session context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub role: Role,
    /// Free-form label attached to every log line of the session.
    pub label: String,
}

impl SessionContext {
    pub fn new(role: Role, label: impl Into<String>) -> Self {
        Self {
            role,
            label: label.into(),
        }
    }
}

/// What a successful session hands back to the caller.
#[derive(Debug)]
pub struct SessionOutcome {
    pub key: KeyMaterial,
    pub report: RunReport,
}

/// Drives one party through a BBM92 session.
pub struct Orchestrator<B, S, C> {
    context: SessionContext,
    config: ProtocolConfig,
    selector: B,
    source: S,
    channel: C,
    phase: Phase,
}

impl<B, S, C> Orchestrator<B, S, C>
where
    B: ChooseBasis,
    S: PairSource,
    C: ClassicalChannel,
{
    pub fn new(
        context: SessionContext,
        config: ProtocolConfig,
        selector: B,
        source: S,
        channel: C,
    ) -> Self {
        Self {
            context,
            config,
            selector,
            source,
            channel,
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Runs the session to completion.
    ///
    /// On any failure the local state is dropped, the peer is told to abort
    /// (best effort) and the error is returned. No key is ever returned
    /// alongside an error.
    pub async fn run(mut self) -> Result<SessionOutcome, ProtocolError> {
        let span = info_span!(
            "bbm92",
            role = %self.context.role,
            session = %self.context.label
        );

        async move {
            match self.execute().await {
                Ok(outcome) => Ok(outcome),
                Err(err) => {
                    self.abort(&err).await;
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(&mut self) -> Result<SessionOutcome, ProtocolError> {
        if !self.channel.guarantees().is_sufficient() {
            return Err(ProtocolError::UnauthenticatedChannel);
        }
        self.config.validate()?;

        // Measuring
        self.advance(Phase::Measuring)?;
        let total_rounds = self.config.total_rounds;
        let mut recorder = RoundRecorder::new(total_rounds);
        for round_index in 0..total_rounds {
            let basis = self.selector.choose_basis(round_index);
            let outcome = self.source.measure(round_index, basis)?;
            recorder.record(round_index, basis, outcome)?;
        }
        let raw = recorder.finalize()?;
        debug!(rounds = raw.len(), "all rounds measured");

        // Announcing
        self.advance(Phase::Announcing)?;
        let local_bases = raw.announcement();
        self.send_message(Message::Bases(local_bases.clone())).await?;
        let peer_bases = match self.receive_message().await? {
            Message::Bases(bases) => bases,
            other => return Err(unexpected("bases", &other)),
        };

        // Sifting
        self.advance(Phase::Sifting)?;
        let sifted = sift(&local_bases, &peer_bases)?;
        if sifted.is_empty() {
            return Err(ProtocolError::InsufficientSiftedBits);
        }
        let bits = SiftedBitString::from_raw(raw, &sifted);
        info!(sifted = sifted.len(), "bases reconciled");

        // Estimating
        self.advance(Phase::Estimating)?;
        let sample_size = self.config.sample_size.resolve(sifted.len())?;
        let seed = self.sample_seed(&local_bases, &peer_bases);
        let sample = self
            .config
            .sample_strategy
            .select(&sifted, sample_size, &seed);

        let disclosure = DisclosedSample::from_local(&bits, &sample)?;
        self.send_message(Message::Disclosure(disclosure)).await?;
        let peer_disclosure = match self.receive_message().await? {
            Message::Disclosure(disclosure) => disclosure,
            other => return Err(unexpected("disclosure", &other)),
        };
        peer_disclosure.matches_sample(&sample)?;

        let checks = compare_sample(&bits, &peer_disclosure, &sample)?;
        let qber = Qber::from_checks(&checks);
        info!(%qber, threshold = self.config.abort_threshold, "error rate estimated");
        if qber.exceeds(self.config.abort_threshold) {
            return Err(ProtocolError::EavesdroppingSuspected {
                qber: qber.value(),
                threshold: self.config.abort_threshold,
            });
        }

        // Extracting
        self.advance(Phase::Extracting)?;
        let key = extract(&bits, &sample, self.config.target_key_length)?;
        self.confirm_summary(summary_of(sifted.len(), qber, key.len())).await?;

        self.advance(Phase::Done)?;
        info!(key_length = key.len(), "key established");

        let report = RunReport::new(raw, &peer_bases, &sifted, &checks, qber, key.len());
        Ok(SessionOutcome { key, report })
    }

    /// Exchanges bookkeeping with the peer and fails unless both agree.
    async fn confirm_summary(&mut self, local: SessionSummary) -> Result<(), ProtocolError> {
        self.send_message(Message::Summary(local)).await?;
        let peer = match self.receive_message().await? {
            Message::Summary(summary) => summary,
            other => return Err(unexpected("summary", &other)),
        };

        if peer != local {
            return Err(ProtocolError::SummaryMismatch(format!(
                "local {:?}, peer {:?}",
                local, peer
            )));
        }
        Ok(())
    }

    fn sample_seed(&self, local: &BasisAnnouncement, peer: &BasisAnnouncement) -> SampleSeed {
        match self.context.role {
            Role::Alice => SampleSeed::derive(local, peer),
            Role::Bob => SampleSeed::derive(peer, local),
        }
    }

    /// Moves to `to`, which must be the phase right after the current one.
    fn advance(&mut self, to: Phase) -> Result<(), ProtocolError> {
        if self.phase.next() != Some(to) {
            return Err(ProtocolError::InvalidTransition {
                from: self.phase,
                to,
            });
        }
        debug!(from = %self.phase, %to, "phase transition");
        self.phase = to;
        Ok(())
    }

    async fn abort(&mut self, err: &ProtocolError) {
        let from = self.phase;
        self.phase = Phase::Aborted;
        warn!(phase = %from, class = ?err.class(), error = %err, "session aborted");

        let notify = !matches!(
            err,
            ProtocolError::PeerAborted { .. }
                | ProtocolError::UnauthenticatedChannel
                | ProtocolError::Channel {
                    source: ChannelError::Closed,
                    ..
                }
        );
        if notify {
            let notice = Message::Abort(AbortNotice {
                phase: from,
                class: err.class(),
                reason: err.to_string(),
            });
            if let Err(e) = self.send_message(notice).await {
                warn!(error = %e, "could not notify peer of abort");
            }
        }
    }

    async fn send_message(&mut self, message: Message) -> Result<(), ProtocolError> {
        let phase = self.phase;
        let bytes = message.encode()?;
        debug!(kind = message.kind(), len = bytes.len(), "sending");

        match tokio::time::timeout(self.config.channel_timeout, self.channel.send(bytes)).await {
            Err(_) => Err(ProtocolError::ChannelTimeout { phase }),
            Ok(Err(ChannelError::Closed)) => Err(self.left_notice(phase).await),
            Ok(Err(source)) => Err(ProtocolError::Channel { phase, source }),
            Ok(Ok(())) => Ok(()),
        }
    }

    /// The peer hung up. If it left an abort notice behind, report that
    /// instead of the bare closed channel.
    async fn left_notice(&mut self, phase: Phase) -> ProtocolError {
        let closed = ProtocolError::Channel {
            phase,
            source: ChannelError::Closed,
        };
        match tokio::time::timeout(self.config.channel_timeout, self.channel.receive()).await {
            Ok(Ok(bytes)) => match Message::decode(&bytes) {
                Ok(Message::Abort(notice)) => peer_aborted(notice),
                _ => closed,
            },
            _ => closed,
        }
    }

    /// Waits for the next peer message. An abort notice from the peer ends the
    /// session here.
    async fn receive_message(&mut self) -> Result<Message, ProtocolError> {
        let phase = self.phase;
        let bytes =
            match tokio::time::timeout(self.config.channel_timeout, self.channel.receive()).await {
                Err(_) => return Err(ProtocolError::ChannelTimeout { phase }),
                Ok(Err(source)) => return Err(ProtocolError::Channel { phase, source }),
                Ok(Ok(bytes)) => bytes,
            };

        let message = Message::decode(&bytes)?;
        debug!(kind = message.kind(), "received");

        if let Message::Abort(notice) = message {
            return Err(peer_aborted(notice));
        }
        Ok(message)
    }
}

fn peer_aborted(notice: AbortNotice) -> ProtocolError {
    ProtocolError::PeerAborted {
        class: notice.class,
        reason: format!("{} (peer phase: {})", notice.reason, notice.phase),
    }
}

fn summary_of(sifted_length: usize, qber: Qber, key_length: usize) -> SessionSummary {
    SessionSummary {
        sifted_length,
        sample_size: qber.sample_size,
        qber_errors: qber.errors,
        key_length,
    }
}

fn unexpected(expected: &'static str, got: &Message) -> ProtocolError {
    ProtocolError::UnexpectedMessage {
        expected,
        got: got.kind(),
    }
}
