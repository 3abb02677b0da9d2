//! Quantum Key Distribution (QKD) Protocols.
//!
//! - **BBM92**: entanglement-based key distribution between two parties.

pub mod bbm92;
