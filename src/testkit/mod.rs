/// Scripted collaborators for running both parties of a session in-process.
///
/// Nothing here models quantum physics. [`EntangledPairs`] only reproduces
/// the classical correlations a perfect pair source would give, plus whatever
/// noise or tampering a test asks for.
///
/// # Example
///
/// ```rust,ignore
/// use qcrypto::testkit::{EntangledPairs, ScriptedBases, run_local_session};
///
/// #[tokio::test]
/// async fn test_keys_agree() {
///     let pairs = EntangledPairs::new(7);
///     let (alice, bob) = run_local_session(
///         ProtocolConfig::default(),
///         ScriptedBases::new(vec![Basis::Z, Basis::X]),
///         ScriptedBases::new(vec![Basis::Z, Basis::Z]),
///         &pairs,
///     )
///     .await;
///
///     assert_eq!(alice.unwrap().key, bob.unwrap().key);
/// }
/// ```
mod bases;
mod pairs;
mod session;

pub use bases::ScriptedBases;
pub use pairs::{EntangledPairs, PairHalf};
pub use session::run_local_session;
