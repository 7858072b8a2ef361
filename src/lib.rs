#![doc = include_str!("../README.md")]

pub mod constant;
pub mod error;
pub mod felt;
pub mod hasher;
pub mod key;
pub mod mem_store;
pub mod node;
pub mod traits;
pub mod trie;

pub use error::TrieError;
pub use felt::{Felt, FELT_BITS};
pub use hasher::{PoseidonHash, Sha256Hash, TrieHasher};
pub use key::TrieKey;
pub use mem_store::MemStore;
pub use node::Node;
pub use traits::TrieStore;
pub use trie::proof::{verify_trie, ProofNode};
pub use trie::trie::{with_temp_trie, Trie};

/// [`Trie`] committed with the Poseidon hasher.
pub type PoseidonTrie<'s, S> = Trie<'s, PoseidonHash, S>;
/// [`Trie`] committed with the SHA-256 hasher.
pub type Sha256Trie<'s, S> = Trie<'s, Sha256Hash, S>;
