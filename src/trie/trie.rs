//! This module implements [`Trie`], a dense binary Merkle Patricia Trie.
//!
//! The trie commits to a sparse mapping from field-element keys to
//! field-element values, but materializes only the occupied part of the key
//! space: every stored internal node has exactly two children. Nodes are
//! keyed in storage by their full path from the root, which makes reads O(1)
//! and structural updates O(height).
//!
//! The commitment is provably equal to that of the sparse reference trie
//! over the same key set. The bridge is the edge hash computed in
//! [`Node::hash`]: wherever the sparse trie would contain a run of one-child
//! nodes, the dense trie stores a single node and folds the skipped path
//! into its parent's commitment.
//!
//! Mutations only mark ancestors dirty; commitments are recomputed lazily
//! and in bulk by [`Trie::root`].

use crate::constant::CONCURRENCY_MAX_DEPTH;
use crate::error::TrieError;
use crate::felt::{felt_to_be_bytes, Felt, FELT_BITS};
use crate::hasher::TrieHasher;
use crate::key::TrieKey;
use crate::mem_store::MemStore;
use crate::node::Node;
use crate::traits::TrieStore;
use ark_ff::{Field, One, Zero};
use std::convert::Infallible;
use std::fmt;
use std::marker::PhantomData;
use tracing::{debug, trace};

/// A dense binary Merkle Patricia Trie over a storage backend.
///
/// The trie is single-writer: mutating operations must be externally
/// serialized on one instance. The only internal parallelism is inside
/// [`Trie::root`], which recomputes the two subtrees of a shallow dirty
/// node on concurrent tasks against the shared storage borrow.
pub struct Trie<'s, H, S> {
    height: u8,
    /// Largest admissible key, `2^height - 1`.
    max_key: Felt,
    root_key: Option<TrieKey>,
    store: &'s S,
    /// Keys whose ancestors carry stale commitments. Consumed by `root`.
    dirty_nodes: Vec<TrieKey>,
    root_key_dirty: bool,
    _hasher: PhantomData<H>,
}

impl<'s, H, S> Trie<'s, H, S>
where
    H: TrieHasher,
    S: TrieStore,
{
    /// Opens a trie of the given height over `store`, loading the persisted
    /// root key if one exists.
    pub fn new(store: &'s S, height: u8) -> Result<Self, TrieError<S::Error>> {
        if height > FELT_BITS {
            return Err(TrieError::InvalidHeight(height));
        }
        let max_key = Felt::from(2u64).pow([u64::from(height)]) - Felt::one();
        let root_key = store.root_key().map_err(TrieError::Store)?;
        Ok(Self {
            height,
            max_key,
            root_key,
            store,
            dirty_nodes: Vec::new(),
            root_key_dirty: false,
            _hasher: PhantomData,
        })
    }

    /// The storage key of the current root node, if the trie is non-empty.
    ///
    /// Reflects un-committed mutations; it is persisted on the next `root`
    /// or `commit`.
    pub fn root_key(&self) -> Option<TrieKey> {
        self.root_key
    }

    /// Height of the trie.
    pub fn height(&self) -> u8 {
        self.height
    }

    /// Looks up the value stored under `key`, with absent keys reading as
    /// zero.
    pub fn get(&self, key: &Felt) -> Result<Felt, TrieError<S::Error>> {
        self.check_key(key)?;
        let leaf_key = self.felt_to_key(key);
        match self.store.get(&leaf_key).map_err(TrieError::Store)? {
            Some(node) => Ok(node.value),
            None => Ok(Felt::zero()),
        }
    }

    /// Writes `value` under `key` and returns the previous value (zero if
    /// the key was absent).
    ///
    /// Writing zero deletes: an absent key is a no-op, a present key has its
    /// leaf removed and the one-child parent collapsed. Commitments are not
    /// recomputed here; affected ancestors are only marked dirty.
    pub fn put(&mut self, key: &Felt, value: &Felt) -> Result<Felt, TrieError<S::Error>> {
        self.check_key(key)?;
        let leaf_key = self.felt_to_key(key);
        self.put_key(leaf_key, value)
    }

    /// Inserts a node under an arbitrary-length key.
    ///
    /// This is the verifier's entry point for replaying sibling nodes from a
    /// proof; they sit at internal positions, so their keys are shorter than
    /// the trie height.
    pub fn set_proof_node(&mut self, key: TrieKey, value: &Felt) -> Result<(), TrieError<S::Error>> {
        self.put_key(key, value)?;
        Ok(())
    }

    /// Forces recomputation of every stale subtree commitment, persists the
    /// updated nodes and the root-key slot, and returns the root commitment.
    /// An empty trie commits to zero. The returned value is never stale.
    pub fn root(&mut self) -> Result<Felt, TrieError<S::Error>> {
        // Persist the root key before anything else, so a trie re-opened on
        // this storage can find the root node even if recomputation fails.
        if self.root_key_dirty {
            match &self.root_key {
                Some(key) => self.store.put_root_key(key).map_err(TrieError::Store)?,
                None => self.store.delete_root_key().map_err(TrieError::Store)?,
            }
            self.root_key_dirty = false;
        }

        let Some(root_key) = self.root_key else {
            return Ok(Felt::zero());
        };

        let root = self.update_if_dirty(&root_key)?;
        self.dirty_nodes.clear();

        let root_path = path(&root_key, None);
        let commitment = root.hash::<H>(&root_path);
        debug!(root_key = ?root_key, %commitment, "recomputed trie root");
        Ok(commitment)
    }

    /// [`Trie::root`] with the commitment discarded.
    pub fn commit(&mut self) -> Result<(), TrieError<S::Error>> {
        self.root().map(|_| ())
    }

    /// Renders the trie in a human-readable indented form, for debugging.
    pub fn write_tree(&self, out: &mut dyn fmt::Write) -> Result<(), TrieError<S::Error>> {
        self.write_subtree(out, self.root_key.as_ref(), None, 0)
    }

    fn write_subtree(
        &self,
        out: &mut dyn fmt::Write,
        key: Option<&TrieKey>,
        parent: Option<&TrieKey>,
        level: usize,
    ) -> Result<(), TrieError<S::Error>> {
        let indent = "  ".repeat(level);
        let Some(key) = key else {
            let _ = writeln!(out, "{indent}EMPTY");
            return Ok(());
        };
        let node = self.require(key)?;
        let node_path = path(key, parent);
        let _ = writeln!(
            out,
            "{indent}{key:?} path_len={} value={}",
            node_path.len(),
            node.value
        );
        if node.left.is_some() || node.right.is_some() {
            self.write_subtree(out, node.left.as_ref(), Some(key), level + 1)?;
            self.write_subtree(out, node.right.as_ref(), Some(key), level + 1)?;
        }
        Ok(())
    }

    pub(crate) fn felt_to_key(&self, felt: &Felt) -> TrieKey {
        TrieKey::new(self.height, &felt_to_be_bytes(felt))
    }

    fn check_key(&self, key: &Felt) -> Result<(), TrieError<S::Error>> {
        if *key > self.max_key {
            return Err(TrieError::KeyOverflow {
                key: *key,
                height: self.height,
            });
        }
        Ok(())
    }

    pub(crate) fn require(&self, key: &TrieKey) -> Result<Node, TrieError<S::Error>> {
        self.store
            .get(key)
            .map_err(TrieError::Store)?
            .ok_or(TrieError::Corruption(*key))
    }

    fn set_root_key(&mut self, key: Option<TrieKey>) {
        self.root_key = key;
        self.root_key_dirty = true;
    }

    /// Walks from the root toward `key`, collecting the visited nodes in
    /// descending order. The walk stops at the deepest node whose key is
    /// still a prefix of `key`, or at the first node that is not.
    pub(crate) fn nodes_from_root(
        &self,
        key: &TrieKey,
    ) -> Result<Vec<(TrieKey, Node)>, TrieError<S::Error>> {
        let mut nodes = Vec::new();
        let mut cursor = self.root_key;
        while let Some(current) = cursor {
            let node = self.require(&current)?;
            nodes.push((current, node));

            if current.len() >= key.len() || !is_subset(key, &current) {
                break;
            }

            cursor = if key.test(key.len() - current.len() - 1) {
                node.right
            } else {
                node.left
            };
        }
        Ok(nodes)
    }

    fn put_key(&mut self, node_key: TrieKey, value: &Felt) -> Result<Felt, TrieError<S::Error>> {
        let node = Node::leaf(*value);
        let nodes = self.nodes_from_root(&node_key)?;

        // Empty trie: a non-zero value becomes the root.
        let Some(&(sibling_key, sibling_node)) = nodes.last() else {
            if value.is_zero() {
                return Ok(Felt::zero());
            }
            self.store.put(&node_key, node).map_err(TrieError::Store)?;
            self.set_root_key(Some(node_key));
            return Ok(Felt::zero());
        };

        // The key already exists: overwrite or delete in place.
        if node_key == sibling_key {
            let old = sibling_node.value;
            if value.is_zero() {
                self.delete_last(&nodes)?;
                return Ok(old);
            }
            self.store.put(&node_key, node).map_err(TrieError::Store)?;
            self.dirty_nodes.push(node_key);
            return Ok(old);
        }

        // Writing zero to a key that does not exist is a no-op.
        if value.is_zero() {
            return Ok(Felt::zero());
        }

        // Split below the longest common prefix of the new key and the node
        // the walk stopped at; both hang off a fresh internal node there.
        let common = if node_key.len() > sibling_key.len() {
            find_common_key(&node_key, &sibling_key)
        } else {
            find_common_key(&sibling_key, &node_key)
        };
        if common.len() >= node_key.len() || common.len() >= sibling_key.len() {
            // One key is a strict prefix of the other; no binary node can
            // separate them. Reachable only through inconsistent proof data.
            return Err(TrieError::Corruption(node_key));
        }

        let goes_right = node_key.test(node_key.len() - common.len() - 1);
        let (left_key, right_key, left_node, right_node) = if goes_right {
            (sibling_key, node_key, sibling_node, node)
        } else {
            (node_key, sibling_key, node, sibling_node)
        };

        let left_path = path(&left_key, Some(&common));
        let right_path = path(&right_key, Some(&common));
        let new_parent = Node {
            value: H::hash(
                &left_node.hash::<H>(&left_path),
                &right_node.hash::<H>(&right_path),
            ),
            left: Some(left_key),
            right: Some(right_key),
        };
        self.store.put(&common, new_parent).map_err(TrieError::Store)?;

        if nodes.len() > 1 {
            // Re-point the sibling's parent at the new internal node.
            let (parent_key, mut parent_node) = nodes[nodes.len() - 2];
            if parent_node.left == Some(sibling_key) {
                parent_node.left = Some(common);
            } else {
                parent_node.right = Some(common);
            }
            self.store
                .put(&parent_key, parent_node)
                .map_err(TrieError::Store)?;
            self.dirty_nodes.push(common);
        } else {
            self.set_root_key(Some(common));
        }

        self.store.put(&node_key, node).map_err(TrieError::Store)?;
        trace!(key = ?node_key, split_at = ?common, "inserted leaf");
        Ok(Felt::zero())
    }

    /// Deletes the last node of a root-to-leaf walk, collapsing its parent.
    /// The dense invariant forbids one-child internal nodes, so the parent
    /// is removed and the sibling is promoted into its place.
    fn delete_last(&mut self, nodes: &[(TrieKey, Node)]) -> Result<(), TrieError<S::Error>> {
        let (leaf_key, _) = nodes[nodes.len() - 1];
        self.store.delete(&leaf_key).map_err(TrieError::Store)?;

        if nodes.len() == 1 {
            self.set_root_key(None);
            return Ok(());
        }

        let (parent_key, parent_node) = nodes[nodes.len() - 2];
        self.store.delete(&parent_key).map_err(TrieError::Store)?;

        let sibling_key = if parent_node.left == Some(leaf_key) {
            parent_node.right
        } else {
            parent_node.left
        }
        .ok_or(TrieError::Corruption(parent_key))?;

        if nodes.len() == 2 {
            // The parent was the root; its surviving child takes over.
            self.set_root_key(Some(sibling_key));
            return Ok(());
        }

        let (grandparent_key, mut grandparent_node) = nodes[nodes.len() - 3];
        if grandparent_node.left == Some(parent_key) {
            grandparent_node.left = Some(sibling_key);
        } else {
            grandparent_node.right = Some(sibling_key);
        }
        self.store
            .put(&grandparent_key, grandparent_node)
            .map_err(TrieError::Store)?;
        self.dirty_nodes.push(sibling_key);
        trace!(deleted = ?leaf_key, promoted = ?sibling_key, "collapsed one-child parent");
        Ok(())
    }

    /// Recomputes the commitment of the subtree at `key` if any dirty key
    /// lies strictly below it, persisting the refreshed node. Leaves are
    /// returned as stored: their value is their commitment.
    ///
    /// At depths up to [`CONCURRENCY_MAX_DEPTH`] the two children are
    /// recomputed on concurrent tasks over the shared storage borrow;
    /// deeper traversal is sequential to avoid spawn overhead. The parent
    /// hash is evaluated only after both child results have been joined.
    fn update_if_dirty(&self, key: &TrieKey) -> Result<Node, TrieError<S::Error>> {
        let node = self.require(key)?;
        if key.len() == self.height {
            return Ok(node);
        }

        let stale = self
            .dirty_nodes
            .iter()
            .any(|dirty| key.len() < dirty.len() && is_subset(dirty, key));
        if !stale {
            return Ok(node);
        }

        let left_key = node.left.ok_or(TrieError::Corruption(*key))?;
        let right_key = node.right.ok_or(TrieError::Corruption(*key))?;

        let (left_result, right_result) = if key.len() <= CONCURRENCY_MAX_DEPTH {
            rayon::join(
                || self.update_if_dirty(&left_key),
                || self.update_if_dirty(&right_key),
            )
        } else {
            (
                self.update_if_dirty(&left_key),
                self.update_if_dirty(&right_key),
            )
        };
        let (left, right) = (left_result?, right_result?);

        let left_path = path(&left_key, Some(key));
        let right_path = path(&right_key, Some(key));
        let mut node = node;
        node.value = H::hash(
            &left.hash::<H>(&left_path),
            &right.hash::<H>(&right_path),
        );
        self.store.put(key, node).map_err(TrieError::Store)?;
        Ok(node)
    }
}

/// Runs `f` against a fresh in-memory trie of the given height.
pub fn with_temp_trie<H, T>(
    height: u8,
    f: impl FnOnce(&mut Trie<'_, H, MemStore>) -> Result<T, TrieError<Infallible>>,
) -> Result<T, TrieError<Infallible>>
where
    H: TrieHasher,
{
    let store = MemStore::new();
    let mut trie = Trie::new(&store, height)?;
    f(&mut trie)
}

/// The residual path connecting `key` to the child slot of `parent`: the
/// parent's prefix is dropped, plus one more bit, since the left/right slot
/// already encodes it.
pub(crate) fn path(key: &TrieKey, parent: Option<&TrieKey>) -> TrieKey {
    let mut path = *key;
    if let Some(parent) = parent {
        path.truncate(path.len() - parent.len() - 1);
    }
    path
}

/// Index of the first bit (counting down from the MSB of each key, starting
/// at zero) where the two keys disagree. `shorter.len() + 1` means `shorter`
/// is a prefix of `longer`. Requires `longer.len() >= shorter.len()`.
fn find_divergent_bit(longer: &TrieKey, shorter: &TrieKey) -> u8 {
    debug_assert!(longer.len() >= shorter.len());
    let mut divergent = 0;
    while divergent <= shorter.len()
        && longer.test(longer.len() - divergent) == shorter.test(shorter.len() - divergent)
    {
        divergent += 1;
    }
    divergent
}

/// The longest common MSB-aligned prefix of the two keys.
fn find_common_key(longer: &TrieKey, shorter: &TrieKey) -> TrieKey {
    let divergent = find_divergent_bit(longer, shorter);
    let mut common = *shorter;
    common.delete_lsb(shorter.len() + 1 - divergent);
    common
}

/// True when `shorter` is an MSB-aligned prefix of `longer`.
pub(crate) fn is_subset(longer: &TrieKey, shorter: &TrieKey) -> bool {
    find_divergent_bit(longer, shorter) == shorter.len() + 1
}
