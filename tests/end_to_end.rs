//! Full two-party sessions over the in-memory channel
mod common;

use std::time::Duration;

use qcrypto::errors::{ErrorClass, ExtractionError, ProtocolError, SiftError};
use qcrypto::protocols::bbm92::{Message, RoundRow, SessionSummary};
use qcrypto::testkit::{EntangledPairs, ScriptedBases, run_local_session};
use qcrypto::{
    Basis, ClassicalChannel, InMemoryChannel, Orchestrator, Phase, ProtocolConfig,
    RandomBasisSelector, Role, SessionContext,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

use common::{init_tracing, scripted_bases, scripted_config};

fn checked_rounds(rows: &[RoundRow]) -> Vec<usize> {
    rows.iter()
        .filter(|r| r.check.is_some())
        .map(|r| r.index)
        .collect()
}

#[tokio::test]
async fn test_keys_agree_without_noise() {
    init_tracing();

    let pairs = EntangledPairs::new(42);
    let (alice_bases, bob_bases) = scripted_bases(50, 26);
    let (alice, bob) =
        run_local_session(scripted_config(50, 10), alice_bases, bob_bases, &pairs).await;

    let alice = alice.unwrap();
    let bob = bob.unwrap();

    assert_eq!(alice.key.len(), 16);
    assert_eq!(alice.key, bob.key);
    // first 16 sifted rounds after the 10 disclosed ones
    assert_eq!(alice.key.source_indices(), (10..26).collect::<Vec<_>>());

    let report = &alice.report;
    assert_eq!(report.total_rounds, 50);
    assert_eq!(report.sifted_length, 26);
    assert_eq!(report.sample_size, 10);
    assert_eq!(report.diff_outcome_count, 0);
    assert_eq!(report.qber.value(), 0.0);
    assert_eq!(report.key_rate_potential, 1.0);
    assert_eq!(report.basis_counts[&Basis::Z], 50);
    assert_eq!(bob.report.basis_counts[&Basis::X], 24);
    assert_eq!(
        report.rows.iter().filter(|r| r.check.is_some()).count(),
        10
    );
    assert!(report.rows[30].check.is_none() && !report.rows[30].same_basis);
}

#[tokio::test]
async fn test_tampered_sample_aborts_both_parties() {
    init_tracing();

    let pairs = EntangledPairs::new(42).with_tampered_rounds([1, 4, 7]);
    let (alice_bases, bob_bases) = scripted_bases(50, 26);
    let (alice, bob) =
        run_local_session(scripted_config(50, 10), alice_bases, bob_bases, &pairs).await;

    // both sides see the same disclosed bits, so each detects it on its own
    for result in [alice, bob] {
        let err = result.unwrap_err();
        match &err {
            ProtocolError::EavesdroppingSuspected { qber, threshold } => {
                assert!((qber - 0.3).abs() < 1e-12);
                assert_eq!(*threshold, 0.1);
                assert_eq!(err.class(), ErrorClass::SecurityPolicy);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

#[tokio::test]
async fn test_peer_sees_security_abort_class() {
    init_tracing();

    let (alice_channel, bob_channel) = InMemoryChannel::pair();
    let pairs = EntangledPairs::new(42).with_tampered_rounds([1, 4, 7]);
    let (alice_source, bob_source) = pairs.halves();
    let (alice_bases, bob_bases) = scripted_bases(50, 26);

    let strict = scripted_config(50, 10);
    let lenient = ProtocolConfig {
        abort_threshold: 0.5,
        ..scripted_config(50, 10)
    };

    let alice = Orchestrator::new(
        SessionContext::new(Role::Alice, "strict"),
        strict,
        alice_bases,
        alice_source,
        alice_channel,
    );
    let bob = Orchestrator::new(
        SessionContext::new(Role::Bob, "lenient"),
        lenient,
        bob_bases,
        bob_source,
        bob_channel,
    );

    let (alice, bob) = tokio::join!(alice.run(), bob.run());

    let alice = alice.unwrap_err();
    assert!(matches!(alice, ProtocolError::EavesdroppingSuspected { .. }));
    assert_eq!(alice.class(), ErrorClass::SecurityPolicy);

    // bob tolerates 0.3 but must not hold a key alice discarded
    let bob = bob.unwrap_err();
    assert!(
        matches!(
            bob,
            ProtocolError::PeerAborted {
                class: ErrorClass::SecurityPolicy,
                ..
            }
        ),
        "unexpected error: {bob}"
    );
    assert_eq!(bob.class(), ErrorClass::SecurityPolicy);
}

#[tokio::test]
async fn test_qber_at_threshold_is_accepted() {
    // 1 error in 10 is exactly the threshold
    let pairs = EntangledPairs::new(42).with_tampered_rounds([3]);
    let (alice_bases, bob_bases) = scripted_bases(50, 26);
    let (alice, bob) =
        run_local_session(scripted_config(50, 10), alice_bases, bob_bases, &pairs).await;

    let alice = alice.unwrap();
    assert_eq!(alice.report.diff_outcome_count, 1);
    assert_eq!(alice.key, bob.unwrap().key);
}

#[tokio::test]
async fn test_too_few_sifted_bits_for_key() {
    init_tracing();

    let pairs = EntangledPairs::new(5);
    let (alice_bases, bob_bases) = scripted_bases(50, 15);
    let (alice, bob) =
        run_local_session(scripted_config(50, 10), alice_bases, bob_bases, &pairs).await;

    for result in [alice, bob] {
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Extraction(ExtractionError::InsufficientKeyMaterial {
                available: 5,
                required: 16
            })
        ));
        assert_eq!(err.class(), ErrorClass::Capacity);
    }
}

#[tokio::test]
async fn test_no_matching_bases() {
    let pairs = EntangledPairs::new(5);
    let (alice_bases, bob_bases) = scripted_bases(20, 0);
    let (alice, bob) =
        run_local_session(scripted_config(20, 4), alice_bases, bob_bases, &pairs).await;

    assert!(matches!(
        alice.unwrap_err(),
        ProtocolError::InsufficientSiftedBits | ProtocolError::PeerAborted { .. }
    ));
    assert!(matches!(
        bob.unwrap_err(),
        ProtocolError::InsufficientSiftedBits | ProtocolError::PeerAborted { .. }
    ));
}

#[tokio::test]
async fn test_unauthenticated_channel_fails_closed() {
    let (alice_channel, bob_channel) = InMemoryChannel::unauthenticated_pair();
    let pairs = EntangledPairs::new(1);
    let (alice_source, bob_source) = pairs.halves();
    let (alice_bases, bob_bases) = scripted_bases(50, 26);

    let alice = Orchestrator::new(
        SessionContext::new(Role::Alice, "unauth"),
        scripted_config(50, 10),
        alice_bases,
        alice_source,
        alice_channel,
    );
    let bob = Orchestrator::new(
        SessionContext::new(Role::Bob, "unauth"),
        scripted_config(50, 10),
        bob_bases,
        bob_source,
        bob_channel,
    );

    let (alice, bob) = tokio::join!(alice.run(), bob.run());
    assert!(matches!(alice, Err(ProtocolError::UnauthenticatedChannel)));
    assert!(matches!(bob, Err(ProtocolError::UnauthenticatedChannel)));
}

#[tokio::test(start_paused = true)]
async fn test_silent_peer_times_out() {
    let (alice_channel, _silent_bob) = InMemoryChannel::pair();
    let pairs = EntangledPairs::new(1);
    let (alice_source, _) = pairs.halves();

    let config = ProtocolConfig {
        channel_timeout: Duration::from_millis(50),
        ..scripted_config(50, 10)
    };
    let alice = Orchestrator::new(
        SessionContext::new(Role::Alice, "timeout"),
        config,
        ScriptedBases::new(vec![Basis::Z]),
        alice_source,
        alice_channel,
    );

    let err = alice.run().await.unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::ChannelTimeout {
            phase: Phase::Announcing
        }
    ));
    assert_eq!(err.class(), ErrorClass::Synchronization);
}

#[tokio::test]
async fn test_announcement_length_mismatch() {
    let (alice_channel, bob_channel) = InMemoryChannel::pair();
    let pairs = EntangledPairs::new(1);
    let (alice_source, bob_source) = pairs.halves();
    let (alice_bases, bob_bases) = scripted_bases(50, 26);

    let alice = Orchestrator::new(
        SessionContext::new(Role::Alice, "mismatch"),
        scripted_config(50, 10),
        alice_bases,
        alice_source,
        alice_channel,
    );
    let bob = Orchestrator::new(
        SessionContext::new(Role::Bob, "mismatch"),
        scripted_config(40, 10),
        bob_bases,
        bob_source,
        bob_channel,
    );

    let (alice, bob) = tokio::join!(alice.run(), bob.run());
    for result in [alice, bob] {
        let err = result.unwrap_err();
        assert!(
            matches!(
                err,
                ProtocolError::Sift(SiftError::AnnouncementLengthMismatch { .. })
                    | ProtocolError::PeerAborted { .. }
            ),
            "unexpected error: {err}"
        );
    }
}

#[tokio::test]
async fn test_measurement_failure_aborts_both_parties() {
    init_tracing();

    let (alice_channel, bob_channel) = InMemoryChannel::pair();
    let pairs = EntangledPairs::new(9);
    let (alice_source, bob_source) = pairs.halves();
    let (alice_bases, bob_bases) = scripted_bases(50, 26);

    let alice = Orchestrator::new(
        SessionContext::new(Role::Alice, "detector"),
        scripted_config(50, 10),
        alice_bases,
        alice_source.failing_at(5),
        alice_channel,
    );
    let bob = Orchestrator::new(
        SessionContext::new(Role::Bob, "detector"),
        scripted_config(50, 10),
        bob_bases,
        bob_source,
        bob_channel,
    );

    let (alice, bob) = tokio::join!(alice.run(), bob.run());

    let alice = alice.unwrap_err();
    assert!(matches!(&alice, ProtocolError::Measurement(f) if f.round_index == 5));
    assert_eq!(alice.class(), ErrorClass::Measurement);

    let bob = bob.unwrap_err();
    assert!(matches!(
        bob,
        ProtocolError::PeerAborted { ref reason, .. } if reason.contains("round 5")
    ));
    assert_eq!(bob.class(), ErrorClass::Measurement);
}

#[tokio::test]
async fn test_seeded_sampling_with_random_bases() {
    init_tracing();

    let config = ProtocolConfig::default();
    let pairs = EntangledPairs::new(2024);
    let alice_bases = RandomBasisSelector::from_config(&config, StdRng::seed_from_u64(1)).unwrap();
    let bob_bases = RandomBasisSelector::from_config(&config, StdRng::seed_from_u64(2)).unwrap();

    let (alice, bob) = run_local_session(config, alice_bases, bob_bases, &pairs).await;
    let alice = alice.unwrap();
    let bob = bob.unwrap();

    assert_eq!(alice.key, bob.key);
    assert_eq!(alice.key.len(), 16);

    let alice_sample = checked_rounds(&alice.report.rows);
    assert_eq!(alice_sample, checked_rounds(&bob.report.rows));
    assert_eq!(alice_sample.len(), alice.report.sample_size);
    assert!(
        alice
            .key
            .source_indices()
            .iter()
            .all(|i| !alice_sample.contains(i))
    );
}

#[tokio::test]
async fn test_garbage_from_peer() {
    let (alice_channel, mut bob_channel) = InMemoryChannel::pair();
    let pairs = EntangledPairs::new(1);
    let (alice_source, _) = pairs.halves();

    bob_channel.send(vec![0xff; 7]).await.unwrap();

    let alice = Orchestrator::new(
        SessionContext::new(Role::Alice, "garbage"),
        scripted_config(50, 10),
        ScriptedBases::new(vec![Basis::Z]),
        alice_source,
        alice_channel,
    );
    let err = alice.run().await.unwrap_err();
    assert!(matches!(err, ProtocolError::Decode(_)));

    // alice still told us she gave up
    let notice = Message::decode(&bob_channel.receive().await.unwrap()).unwrap();
    assert_eq!(notice.kind(), "bases");
    let notice = Message::decode(&bob_channel.receive().await.unwrap()).unwrap();
    assert!(matches!(
        notice,
        Message::Abort(n) if n.phase == Phase::Announcing && n.class == ErrorClass::Synchronization
    ));
}

#[tokio::test]
async fn test_out_of_turn_message() {
    let (alice_channel, mut bob_channel) = InMemoryChannel::pair();
    let pairs = EntangledPairs::new(1);
    let (alice_source, _) = pairs.halves();

    let early = Message::Summary(SessionSummary {
        sifted_length: 26,
        sample_size: 10,
        qber_errors: 0,
        key_length: 16,
    });
    bob_channel.send(early.encode().unwrap()).await.unwrap();

    let alice = Orchestrator::new(
        SessionContext::new(Role::Alice, "early"),
        scripted_config(50, 10),
        ScriptedBases::new(vec![Basis::Z]),
        alice_source,
        alice_channel,
    );
    assert!(matches!(
        alice.run().await,
        Err(ProtocolError::UnexpectedMessage {
            expected: "bases",
            got: "summary"
        })
    ));
}
