//! Utility functions shared by the protocol stages.
//!
//! This module contains helper functions for:
//! - Duplicate detection in index lists.
//! - Information-theoretic bounds on the secure key rate.
//! - Packing key bits into bytes.

use std::collections::HashSet;

/// Find duplicate in a slice of usize
pub fn find_duplicate(indices: &[usize]) -> Option<usize> {
    let mut seen = HashSet::new();
    indices.iter().find(|&&idx| !seen.insert(idx)).copied()
}

/// Binary Shannon entropy $h(p) = -p \log_2 p - (1-p) \log_2 (1-p)$.
///
/// Defined as 0 at the endpoints.
pub fn binary_entropy(p: f64) -> f64 {
    if p <= 0.0 || p >= 1.0 {
        return 0.0;
    }
    -p * p.log2() - (1.0 - p) * (1.0 - p).log2()
}

/// Asymptotic fraction of the raw key that survives error correction and
/// privacy amplification, $1 - 2h(Q)$. Negative means no secure key.
pub fn key_rate_potential(qber: f64) -> f64 {
    1.0 - 2.0 * binary_entropy(qber)
}

/// Packs bits into bytes, least significant bit first. A trailing partial
/// byte is zero padded.
pub fn pack_bits(bits: &[bool]) -> Vec<u8> {
    bits.chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |acc, (i, &bit)| acc | ((bit as u8) << i))
        })
        .collect()
}
