//! Binary hash functions over pairs of field elements.
//!
//! The trie is parameterized on a [`TrieHasher`] at construction time. Two
//! variants are provided: an algebraic Poseidon instance over the trie's own
//! field, and a SHA-256 construction reduced into the field.

use crate::felt::{felt_from_be_bytes, felt_to_be_bytes, Felt};
use ark_ff::Zero;
use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};
use std::fmt::Debug;

/// A deterministic, collision-resistant two-to-one hash over field elements.
pub trait TrieHasher: Debug + Send + Sync {
    /// Hashes an ordered pair of field elements.
    fn hash(a: &Felt, b: &Felt) -> Felt;
}

/// Poseidon in its Hades form: width 3, x^3 S-box, 8 full and 83 partial
/// rounds, with the MDS matrix `[[3,1,1],[1,-1,1],[1,1,-2]]`.
///
/// The exponent 3 is invertible in this field (3 does not divide the group
/// order), which is what makes the S-box a permutation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoseidonHash;

/// SHA-256 over the concatenated big-endian operands, reduced into the field.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hash;

const STATE_WIDTH: usize = 3;
const HALF_FULL_ROUNDS: usize = 4;
const PARTIAL_ROUNDS: usize = 83;
const TOTAL_ROUNDS: usize = 2 * HALF_FULL_ROUNDS + PARTIAL_ROUNDS;

/// Round constants, derived once by expanding a fixed domain tag through
/// SHA-256. The derivation is part of the hash definition: changing the tag
/// changes every commitment.
static ROUND_CONSTANTS: Lazy<Vec<[Felt; STATE_WIDTH]>> = Lazy::new(|| {
    (0..TOTAL_ROUNDS as u32)
        .map(|round| {
            let mut constants = [Felt::zero(); STATE_WIDTH];
            for (position, slot) in constants.iter_mut().enumerate() {
                let mut hasher = Sha256::new();
                hasher.update(b"hades round constant");
                hasher.update(round.to_be_bytes());
                hasher.update((position as u32).to_be_bytes());
                *slot = felt_from_be_bytes(&hasher.finalize());
            }
            constants
        })
        .collect()
});

fn cube(x: Felt) -> Felt {
    x * x * x
}

/// Multiplication by the MDS matrix `[[3,1,1],[1,-1,1],[1,1,-2]]`.
fn mix(state: &mut [Felt; STATE_WIDTH]) {
    let sum = state[0] + state[1] + state[2];
    let s1 = state[1];
    let s2 = state[2];
    state[0] = sum + state[0] + state[0];
    state[1] = sum - s1 - s1;
    state[2] = sum - s2 - s2 - s2;
}

fn full_round(state: &mut [Felt; STATE_WIDTH], constants: &[Felt; STATE_WIDTH]) {
    for (slot, constant) in state.iter_mut().zip(constants) {
        *slot = cube(*slot + constant);
    }
    mix(state);
}

fn partial_round(state: &mut [Felt; STATE_WIDTH], constants: &[Felt; STATE_WIDTH]) {
    for (slot, constant) in state.iter_mut().zip(constants) {
        *slot += constant;
    }
    state[2] = cube(state[2]);
    mix(state);
}

fn permute(state: &mut [Felt; STATE_WIDTH]) {
    let constants = &*ROUND_CONSTANTS;
    let (head, tail) = constants.split_at(HALF_FULL_ROUNDS);
    let (middle, last) = tail.split_at(PARTIAL_ROUNDS);
    for round_constants in head {
        full_round(state, round_constants);
    }
    for round_constants in middle {
        partial_round(state, round_constants);
    }
    for round_constants in last {
        full_round(state, round_constants);
    }
}

impl TrieHasher for PoseidonHash {
    fn hash(a: &Felt, b: &Felt) -> Felt {
        // The third lane carries the two-to-one domain separator.
        let mut state = [*a, *b, Felt::from(2u64)];
        permute(&mut state);
        state[0]
    }
}

impl TrieHasher for Sha256Hash {
    fn hash(a: &Felt, b: &Felt) -> Felt {
        let mut hasher = Sha256::new();
        hasher.update(felt_to_be_bytes(a));
        hasher.update(felt_to_be_bytes(b));
        felt_from_be_bytes(&hasher.finalize())
    }
}
