//! Classical channel seam.
//!
//! The protocol assumes an ordered, reliable, authenticated channel between
//! the two parties. This module only describes what such a channel must offer.
//! How authentication is achieved is up to the implementation.

use crate::core::errors::ChannelError;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Security properties a channel implementation claims to provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelGuarantees {
    /// Every received message provably comes from the peer.
    pub origin_authenticated: bool,
    /// Received messages are exactly what the peer sent.
    pub integrity_protected: bool,
}

impl ChannelGuarantees {
    pub fn authenticated() -> Self {
        Self {
            origin_authenticated: true,
            integrity_protected: true,
        }
    }

    pub fn none() -> Self {
        Self {
            origin_authenticated: false,
            integrity_protected: false,
        }
    }

    /// Whether a BBM92 session may run over this channel.
    pub fn is_sufficient(&self) -> bool {
        self.origin_authenticated && self.integrity_protected
    }
}

/// Ordered, reliable, message-oriented link to the peer.
///
/// Messages are delivered once, in order. A session refuses to start unless
/// [`ClassicalChannel::guarantees`] reports authentication and integrity.
#[async_trait]
pub trait ClassicalChannel: Send {
    async fn send(&mut self, bytes: Vec<u8>) -> Result<(), ChannelError>;

    async fn receive(&mut self) -> Result<Vec<u8>, ChannelError>;

    fn guarantees(&self) -> ChannelGuarantees;
}

/// In-process channel made of two unbounded queues, one per direction.
///
/// Both ends live in the same process and nothing else can reach the queues,
/// so the pair is authentic by construction.
#[derive(Debug)]
pub struct InMemoryChannel {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
    guarantees: ChannelGuarantees,
}

impl InMemoryChannel {
    /// Two connected ends.
    pub fn pair() -> (Self, Self) {
        Self::pair_with(ChannelGuarantees::authenticated())
    }

    /// Two connected ends that claim no security properties.
    pub fn unauthenticated_pair() -> (Self, Self) {
        Self::pair_with(ChannelGuarantees::none())
    }

    fn pair_with(guarantees: ChannelGuarantees) -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        (
            Self {
                tx: a_tx,
                rx: a_rx,
                guarantees,
            },
            Self {
                tx: b_tx,
                rx: b_rx,
                guarantees,
            },
        )
    }
}

#[async_trait]
impl ClassicalChannel for InMemoryChannel {
    async fn send(&mut self, bytes: Vec<u8>) -> Result<(), ChannelError> {
        self.tx.send(bytes).map_err(|_| ChannelError::Closed)
    }

    async fn receive(&mut self) -> Result<Vec<u8>, ChannelError> {
        self.rx.recv().await.ok_or(ChannelError::Closed)
    }

    fn guarantees(&self) -> ChannelGuarantees {
        self.guarantees
    }
}
