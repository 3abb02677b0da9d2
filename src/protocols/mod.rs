//! Quantum Cryptography Protocols.

pub mod qkd;
pub use qkd::bbm92;
