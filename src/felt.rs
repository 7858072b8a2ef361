//! The prime field the trie commits over.
//!
//! Elements are scalars modulo `2^251 + 17 * 2^192 + 1`, represented in
//! Montgomery form over four 64-bit limbs. All trie keys and values at the
//! public boundary are elements of this field.

use ark_ff::{BigInteger, Fp256, MontBackend, MontConfig, PrimeField};

/// Montgomery parameters of the 252-bit prime field.
#[derive(MontConfig)]
#[modulus = "3618502788666131213697322783095070105623107215331596699973092056135872020481"]
#[generator = "3"]
pub struct FeltConfig;

/// A field element. `Copy`, 32 bytes, canonical byte form is big-endian.
pub type Felt = Fp256<MontBackend<FeltConfig, 4>>;

/// Number of bits needed to represent any field element.
pub const FELT_BITS: u8 = 252;

/// Canonical 32-byte big-endian serialization of a field element.
pub fn felt_to_be_bytes(felt: &Felt) -> [u8; 32] {
    let bytes = felt.into_bigint().to_bytes_be();
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    out
}

/// Interprets a big-endian byte slice as a field element, reducing modulo
/// the field order.
pub fn felt_from_be_bytes(bytes: &[u8]) -> Felt {
    Felt::from_be_bytes_mod_order(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::Zero;

    #[test]
    fn byte_round_trip_is_canonical() {
        for v in [0u64, 1, 2, 0xdead_beef, u64::MAX] {
            let felt = Felt::from(v);
            assert_eq!(felt_from_be_bytes(&felt_to_be_bytes(&felt)), felt);
        }
    }

    #[test]
    fn serialization_is_fixed_width_big_endian() {
        let bytes = felt_to_be_bytes(&Felt::from(0x0102u64));
        assert_eq!(bytes[30..], [0x01, 0x02]);
        assert!(bytes[..30].iter().all(|b| *b == 0));
    }

    #[test]
    fn oversized_input_reduces() {
        // 2^256 - 1 is beyond the modulus and must wrap, not panic.
        let reduced = felt_from_be_bytes(&[0xff; 32]);
        assert_ne!(reduced, Felt::zero());
        // The canonical bytes of the reduced element differ from the raw input.
        assert_ne!(felt_to_be_bytes(&reduced), [0xff; 32]);
        assert_eq!(felt_from_be_bytes(&felt_to_be_bytes(&reduced)), reduced);
    }
}
