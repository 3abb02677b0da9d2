use super::pairs::EntangledPairs;
use crate::channel::InMemoryChannel;
use crate::config::ProtocolConfig;
use crate::core::basis::ChooseBasis;
use crate::core::errors::ProtocolError;
use crate::protocols::bbm92::{Orchestrator, Role, SessionContext, SessionOutcome};

/// Runs Alice and Bob against each other over an in-memory channel and
/// returns both results, Alice's first.
pub async fn run_local_session<A, B>(
    config: ProtocolConfig,
    alice_bases: A,
    bob_bases: B,
    pairs: &EntangledPairs,
) -> (
    Result<SessionOutcome, ProtocolError>,
    Result<SessionOutcome, ProtocolError>,
)
where
    A: ChooseBasis,
    B: ChooseBasis,
{
    let (alice_channel, bob_channel) = InMemoryChannel::pair();
    let (alice_source, bob_source) = pairs.halves();

    let alice = Orchestrator::new(
        SessionContext::new(Role::Alice, "local"),
        config.clone(),
        alice_bases,
        alice_source,
        alice_channel,
    );
    let bob = Orchestrator::new(
        SessionContext::new(Role::Bob, "local"),
        config,
        bob_bases,
        bob_source,
        bob_channel,
    );

    tokio::join!(alice.run(), bob.run())
}
