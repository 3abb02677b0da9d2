//! Key extraction from the undisclosed part of the sifted string.

use super::sifting::SiftedBitString;
use crate::core::errors::ExtractionError;
use crate::core::utils::pack_bits;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// The shared secret produced by a successful run.
///
/// Wiped from memory on drop. `Debug` never prints the bits.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    bits: Vec<bool>,
    source_indices: Vec<usize>,
}

impl KeyMaterial {
    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    /// Rounds whose outcomes make up the key, in key order.
    pub fn source_indices(&self) -> &[usize] {
        &self.source_indices
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Key packed into bytes, least significant bit first.
    pub fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(pack_bits(&self.bits))
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("len", &self.bits.len())
            .finish_non_exhaustive()
    }
}

/// Takes the first `target_length` sifted bits that were not disclosed.
///
/// Both parties hold the same index ordering, so the slice boundary falls in
/// the same place on each side. A short key is an error, never a shorter result.
pub fn extract(
    sifted: &SiftedBitString,
    disclosed: &[usize],
    target_length: usize,
) -> Result<KeyMaterial, ExtractionError> {
    let mut burned = disclosed.to_vec();
    burned.sort_unstable();
    let kept = |index: usize| burned.binary_search(&index).is_err();

    let available = sifted.indices().iter().filter(|&&i| kept(i)).count();
    if available < target_length {
        return Err(ExtractionError::InsufficientKeyMaterial {
            available,
            required: target_length,
        });
    }

    let (source_indices, bits) = sifted
        .iter()
        .filter(|&(i, _)| kept(i))
        .take(target_length)
        .unzip();

    Ok(KeyMaterial {
        bits,
        source_indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sifted(n: usize) -> SiftedBitString {
        SiftedBitString::from_labelled((0..n).map(|i| (i * 2, i % 3 == 0)))
    }

    #[test]
    fn test_extract_skips_disclosed() {
        let bits = sifted(8);
        let key = extract(&bits, &[0, 4, 10], 4).unwrap();

        assert_eq!(key.source_indices(), &[2, 6, 8, 12]);
        assert_eq!(key.bits(), &[false, true, false, true]);
    }

    #[test]
    fn test_extract_exact_length() {
        let bits = sifted(5);
        let key = extract(&bits, &[], 5).unwrap();
        assert_eq!(key.len(), 5);
    }

    #[test]
    fn test_insufficient_key_material() {
        let bits = sifted(6);
        assert_eq!(
            extract(&bits, &[0, 2], 5),
            Err(ExtractionError::InsufficientKeyMaterial {
                available: 4,
                required: 5
            })
        );
    }

    #[test]
    fn test_to_bytes_packs_lsb_first() {
        let bits = SiftedBitString::from_labelled(
            [true, false, false, false, false, false, false, false, true]
                .into_iter()
                .enumerate(),
        );
        let key = extract(&bits, &[], 9).unwrap();
        assert_eq!(key.to_bytes().as_slice(), &[0b0000_0001, 0b0000_0001]);
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = extract(&sifted(3), &[], 3).unwrap();
        let printed = format!("{:?}", key);
        assert!(printed.contains("len: 3"));
        assert!(!printed.contains("true"));
    }
}
