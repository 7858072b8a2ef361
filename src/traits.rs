//! The storage contract between the trie and its backend.

use crate::key::TrieKey;
use crate::node::Node;
use std::fmt::Debug;

/// Persistent mapping from node key to [`Node`], plus a single optional
/// root-key slot.
///
/// Nodes are keyed by their path from the root, not by content hash, so
/// lookups are O(1) in trie depth. A successful `put` followed by a `get`
/// of the same key in the same logical session returns the stored node.
///
/// All methods take `&self` and implementations must be `Send + Sync`: a
/// shared borrow of the store is the synchronized view the trie hands to
/// concurrent subtree tasks during root recomputation, and those tasks both
/// read and write through it.
pub trait TrieStore: Send + Sync {
    /// Backend error type. Lookup misses are `Ok(None)`, not errors.
    type Error: Debug + Send;

    /// Fetches the node stored at `key`, if any.
    fn get(&self, key: &TrieKey) -> Result<Option<Node>, Self::Error>;

    /// Stores `node` at `key`, replacing any previous node.
    fn put(&self, key: &TrieKey, node: Node) -> Result<(), Self::Error>;

    /// Removes the node at `key`. Removing an absent key is not an error.
    fn delete(&self, key: &TrieKey) -> Result<(), Self::Error>;

    /// Reads the root-key slot.
    fn root_key(&self) -> Result<Option<TrieKey>, Self::Error>;

    /// Writes the root-key slot.
    fn put_root_key(&self, key: &TrieKey) -> Result<(), Self::Error>;

    /// Clears the root-key slot. Clearing an empty slot is not an error.
    fn delete_root_key(&self) -> Result<(), Self::Error>;
}
