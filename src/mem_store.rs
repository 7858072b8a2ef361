//! In-memory storage backend.
//!
//! [`MemStore`] keeps nodes and the root-key slot in [`BTreeMap`]s behind
//! [`RwLock`]s. It is the backend used by the tests, the proof verifier's
//! reconstruction trie, and any caller that wants a scratch trie; durable
//! deployments implement [`TrieStore`] over a real database instead, using
//! the byte codecs on [`crate::key::TrieKey`] and [`crate::node::Node`].
//!
//! All operations are thread-safe: multiple readers or a single writer per
//! lock. The store itself cannot fail, so its error type is [`Infallible`].

use crate::key::TrieKey;
use crate::node::Node;
use crate::traits::TrieStore;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::RwLock;

/// Thread-safe in-memory [`TrieStore`].
#[derive(Debug, Default)]
pub struct MemStore {
    nodes: RwLock<BTreeMap<TrieKey, Node>>,
    root_key: RwLock<Option<TrieKey>>,
}

impl MemStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored nodes.
    pub fn len(&self) -> usize {
        self.nodes.read().expect("node lock poisoned").len()
    }

    /// True when no nodes are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every stored `(key, node)` pair, in key order.
    pub fn entries(&self) -> Vec<(TrieKey, Node)> {
        self.nodes
            .read()
            .expect("node lock poisoned")
            .iter()
            .map(|(key, node)| (*key, *node))
            .collect()
    }
}

impl Clone for MemStore {
    fn clone(&self) -> Self {
        Self {
            nodes: RwLock::new(self.nodes.read().expect("node lock poisoned").clone()),
            root_key: RwLock::new(*self.root_key.read().expect("root lock poisoned")),
        }
    }
}

impl TrieStore for MemStore {
    type Error = Infallible;

    fn get(&self, key: &TrieKey) -> Result<Option<Node>, Self::Error> {
        Ok(self.nodes.read().expect("node lock poisoned").get(key).copied())
    }

    fn put(&self, key: &TrieKey, node: Node) -> Result<(), Self::Error> {
        self.nodes.write().expect("node lock poisoned").insert(*key, node);
        Ok(())
    }

    fn delete(&self, key: &TrieKey) -> Result<(), Self::Error> {
        self.nodes.write().expect("node lock poisoned").remove(key);
        Ok(())
    }

    fn root_key(&self) -> Result<Option<TrieKey>, Self::Error> {
        Ok(*self.root_key.read().expect("root lock poisoned"))
    }

    fn put_root_key(&self, key: &TrieKey) -> Result<(), Self::Error> {
        *self.root_key.write().expect("root lock poisoned") = Some(*key);
        Ok(())
    }

    fn delete_root_key(&self) -> Result<(), Self::Error> {
        *self.root_key.write().expect("root lock poisoned") = None;
        Ok(())
    }
}
