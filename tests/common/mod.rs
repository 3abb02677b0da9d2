//! Shared setup for the session integration tests
#![allow(dead_code)]

use qcrypto::{Basis, ProtocolConfig, SampleSize, SampleStrategy};
use qcrypto::testkit::ScriptedBases;
use tracing_subscriber::EnvFilter;

/// Install a test-friendly subscriber, filtered by `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Config for the scripted scenarios: `rounds` rounds, a prefix sample of
/// `sample` bits and a 16-bit key
pub fn scripted_config(rounds: usize, sample: usize) -> ProtocolConfig {
    ProtocolConfig {
        total_rounds: rounds,
        sample_size: SampleSize::Count(sample),
        sample_strategy: SampleStrategy::Prefix,
        abort_threshold: 0.1,
        target_key_length: 16,
        ..Default::default()
    }
}

/// Alice always measures Z. Bob measures Z on the first `matching` rounds
/// and X afterwards, so exactly rounds `0..matching` survive sifting
pub fn scripted_bases(rounds: usize, matching: usize) -> (ScriptedBases, ScriptedBases) {
    (
        ScriptedBases::new(vec![Basis::Z; rounds]),
        ScriptedBases::from_fn(rounds, Basis::Z, Basis::X, |i| i < matching),
    )
}
