//! Error type for trie operations.

use crate::felt::Felt;
use crate::key::TrieKey;
use std::fmt::Debug;
use thiserror::Error;

/// Failures surfaced by the trie and the proof verifier.
///
/// `E` is the storage backend's error type. Nothing is retried or swallowed:
/// every variant propagates to the caller, and the only internal recovery is
/// treating a missing leaf as the zero value during reads.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrieError<E: Debug> {
    /// The trie height does not fit in the field bit width.
    #[error("max trie height is 252, got {0}")]
    InvalidHeight(u8),

    /// An input key does not fit in the trie's key space.
    #[error("key {key} exceeds trie height {height}")]
    KeyOverflow { key: Felt, height: u8 },

    /// A linked node is missing or structurally impossible; the stored trie
    /// is corrupt (or a proof being replayed is inconsistent).
    #[error("missing or inconsistent node at {0:?}")]
    Corruption(TrieKey),

    /// A recomputed root disagrees with the commitment it was checked
    /// against. Verifier only.
    #[error("root mismatch: computed {computed}, expected {expected}")]
    RootMismatch { computed: Felt, expected: Felt },

    /// Opaque storage backend failure, passed through untouched.
    #[error("storage error: {0:?}")]
    Store(E),
}
