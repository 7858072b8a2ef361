//! Proof generation and verification.
//!
//! A proof is the list of sibling nodes hanging off the walk from the root
//! to a leaf: together with the leaf values it proves, it is exactly the
//! material needed to rebuild the root commitment. Range proofs concatenate
//! the trimmed sibling paths of both endpoints; verification replays the
//! claimed key-value pairs and the proof nodes into a fresh in-memory trie
//! and recomputes its root.

use crate::error::TrieError;
use crate::felt::Felt;
use crate::hasher::TrieHasher;
use crate::key::TrieKey;
use crate::mem_store::MemStore;
use crate::traits::TrieStore;
use crate::trie::trie::Trie;
use std::cmp::Ordering;
use std::convert::Infallible;

/// A sibling branch needed to reconstruct a root from a partial key set.
///
/// For the wire, `TrieKey::to_bytes` and the felt byte helpers give a
/// deterministic encoding; mapping to external JSON shapes is the caller's
/// concern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProofNode {
    /// Storage key of the sibling node.
    pub key: TrieKey,
    /// Its subtree commitment (or leaf value).
    pub value: Felt,
}

impl<'s, H, S> Trie<'s, H, S>
where
    H: TrieHasher,
    S: TrieStore,
{
    /// Sibling-only proof path for a single key, ordered root to leaf: for
    /// every node on the walk, the child the walk did not take.
    fn proofs_from_root(&self, key: &Felt) -> Result<Vec<ProofNode>, TrieError<S::Error>> {
        let leaf_key = self.felt_to_key(key);
        let nodes = self.nodes_from_root(&leaf_key)?;

        let mut proofs = Vec::with_capacity(nodes.len().saturating_sub(1));
        for window in nodes.windows(2) {
            let (_, current) = window[0];
            let (next_key, _) = window[1];
            let other = if current.left == Some(next_key) {
                current.right
            } else {
                current.left
            };
            let other = other.ok_or(TrieError::Corruption(next_key))?;
            let sibling = self.require(&other)?;
            proofs.push(ProofNode {
                key: other,
                value: sibling.value,
            });
        }
        Ok(proofs)
    }

    /// Proof covering every key in `from..=to`.
    ///
    /// For `from == to` this is the plain single-key path. Otherwise the
    /// `from`-path keeps only nodes that do not sit after `from`, and the
    /// `to`-path only nodes that do not sit before `to` (aligned compare):
    /// an untrimmed inner node could stand in for leaves inside the range
    /// and let a verifier accept a proof with leaves missing.
    pub fn range_proof(
        &self,
        from: &Felt,
        to: &Felt,
    ) -> Result<Vec<ProofNode>, TrieError<S::Error>> {
        if from == to {
            return self.proofs_from_root(from);
        }

        let left_proofs = self.proofs_from_root(from)?;
        let right_proofs = self.proofs_from_root(to)?;

        let from_key = self.felt_to_key(from);
        let to_key = self.felt_to_key(to);

        let mut combined = Vec::with_capacity(left_proofs.len() + right_proofs.len());
        combined.extend(
            left_proofs
                .into_iter()
                .filter(|proof| proof.key.cmp_aligned(&from_key) != Ordering::Greater),
        );
        combined.extend(
            right_proofs
                .into_iter()
                .filter(|proof| proof.key.cmp_aligned(&to_key) != Ordering::Less),
        );
        Ok(combined)
    }
}

/// Rebuilds a trie from claimed `(path, value)` pairs plus proof nodes and
/// checks its root against `expected_root`.
///
/// Returns whether the proof shows nodes past the last claimed path (the
/// range continues), or [`TrieError::RootMismatch`] when the recomputed
/// root disagrees. Construction and storage failures propagate instead of
/// being reported as a plain mismatch.
pub fn verify_trie<H: TrieHasher>(
    expected_root: &Felt,
    paths: &[Felt],
    values: &[Felt],
    proofs: &[ProofNode],
    height: u8,
) -> Result<bool, TrieError<Infallible>> {
    let store = MemStore::new();
    let mut trie = Trie::<H, _>::new(&store, height)?;

    for (path, value) in paths.iter().zip(values) {
        trie.put(path, value)?;
    }

    let last_path = paths.last().map(|path| trie.felt_to_key(path));
    let mut has_next = false;
    for proof in proofs {
        if let Some(last) = &last_path {
            if proof.key.cmp_aligned(last) == Ordering::Greater {
                has_next = true;
            }
        }
        trie.set_proof_node(proof.key, &proof.value)?;
    }

    let computed = trie.root()?;
    if computed != *expected_root {
        return Err(TrieError::RootMismatch {
            computed,
            expected: *expected_root,
        });
    }
    Ok(has_next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::{PoseidonHash, Sha256Hash};
    use crate::trie::trie::with_temp_trie;
    use ark_ff::Zero;

    fn felt(value: u64) -> Felt {
        Felt::from(value)
    }

    /// Builds a committed trie over the given `(key, value)` pairs and
    /// returns its root.
    fn committed<'s, H: TrieHasher>(
        store: &'s MemStore,
        height: u8,
        pairs: &[(u64, u64)],
    ) -> (Trie<'s, H, MemStore>, Felt) {
        let mut trie = Trie::new(store, height).unwrap();
        for (key, value) in pairs {
            trie.put(&felt(*key), &felt(*value)).unwrap();
        }
        let root = trie.root().unwrap();
        (trie, root)
    }

    /// Single-key proofs contain only siblings of the walk: nodes that
    /// diverge from the target key, never the target or its ancestors.
    #[test]
    fn single_key_proof_shape() {
        let store = MemStore::new();
        let (trie, _) =
            committed::<Sha256Hash>(&store, 251, &[(1, 10), (2, 20), (3, 30), (4, 40)]);

        let proof = trie.range_proof(&felt(2), &felt(2)).unwrap();
        assert_eq!(proof.len(), 3, "three siblings hang off the walk to 2");
        let target = trie.felt_to_key(&felt(2));
        for node in &proof {
            assert_ne!(node.key, target);
            assert!(
                !crate::trie::trie::is_subset(&target, &node.key),
                "{:?} lies on the walk to the target",
                node.key
            );
        }
    }

    /// A lone leaf proves with an empty sibling list.
    #[test]
    fn single_leaf_needs_no_siblings() {
        let store = MemStore::new();
        let (trie, root) = committed::<PoseidonHash>(&store, 251, &[(3, 7)]);

        let proof = trie.range_proof(&felt(3), &felt(3)).unwrap();
        assert!(proof.is_empty());

        let has_next =
            verify_trie::<PoseidonHash>(&root, &[felt(3)], &[felt(7)], &proof, 251).unwrap();
        assert!(!has_next);
    }

    /// The two-sided trim of a range proof and its verification round-trip:
    /// proving an inner window keeps the flanking siblings, and the
    /// remaining-keys flag reflects whether anything lies past the window.
    #[test]
    fn range_proof_round_trip() {
        let store = MemStore::new();
        let (trie, root) =
            committed::<PoseidonHash>(&store, 251, &[(1, 10), (2, 20), (3, 30), (4, 40)]);

        let inner = trie.range_proof(&felt(2), &felt(3)).unwrap();
        let has_next =
            verify_trie::<PoseidonHash>(&root, &[felt(2), felt(3)], &[felt(20), felt(30)], &inner, 251)
                .unwrap();
        assert!(has_next, "key 4 lies past the proven window");

        // The full range needs no siblings at all: every leaf is claimed.
        let full = trie.range_proof(&felt(1), &felt(4)).unwrap();
        let has_next = verify_trie::<PoseidonHash>(
            &root,
            &[felt(1), felt(2), felt(3), felt(4)],
            &[felt(10), felt(20), felt(30), felt(40)],
            &full,
            251,
        )
        .unwrap();
        assert!(!has_next);
    }

    /// Invariant sweep: every contiguous window of the sorted key set
    /// verifies against the root, and `has_next` is true exactly when the
    /// window stops short of the largest key.
    #[test]
    fn every_window_verifies() {
        let keys = [1u64, 2, 3, 4, 8, 12];
        let pairs: Vec<(u64, u64)> = keys.iter().map(|k| (*k, k * 7 + 1)).collect();
        let store = MemStore::new();
        let (trie, root) = committed::<Sha256Hash>(&store, 251, &pairs);

        for a in 0..keys.len() {
            for b in a..keys.len() {
                let proof = trie
                    .range_proof(&felt(keys[a]), &felt(keys[b]))
                    .unwrap();
                let paths: Vec<Felt> = keys[a..=b].iter().map(|k| felt(*k)).collect();
                let values: Vec<Felt> =
                    pairs[a..=b].iter().map(|(_, v)| felt(*v)).collect();
                let has_next =
                    verify_trie::<Sha256Hash>(&root, &paths, &values, &proof, 251).unwrap();
                assert_eq!(
                    has_next,
                    b != keys.len() - 1,
                    "window [{a}, {b}] misreported the remaining keys"
                );
            }
        }
    }

    /// Flipping any value in the claimed pairs or in the proof nodes makes
    /// verification fail with a root mismatch rather than pass or panic.
    #[test]
    fn tampering_is_rejected() {
        let store = MemStore::new();
        let (trie, root) = committed::<Sha256Hash>(&store, 251, &[(1, 10), (2, 20), (5, 50)]);
        let proof = trie.range_proof(&felt(1), &felt(2)).unwrap();
        let paths = [felt(1), felt(2)];
        let values = [felt(10), felt(20)];

        assert!(verify_trie::<Sha256Hash>(&root, &paths, &values, &proof, 251).is_ok());

        // Tampered claimed value.
        let mut bad_values = values;
        bad_values[1] += felt(1);
        assert!(matches!(
            verify_trie::<Sha256Hash>(&root, &paths, &bad_values, &proof, 251),
            Err(TrieError::RootMismatch { .. })
        ));

        // Tampered proof node commitment.
        if let Some(first) = proof.first() {
            let mut bad_proof = proof.clone();
            bad_proof[0] = ProofNode {
                key: first.key,
                value: first.value + felt(1),
            };
            assert!(matches!(
                verify_trie::<Sha256Hash>(&root, &paths, &values, &bad_proof, 251),
                Err(TrieError::RootMismatch { .. })
            ));
        }

        // Wrong expected root.
        assert!(matches!(
            verify_trie::<Sha256Hash>(&(root + felt(1)), &paths, &values, &proof, 251),
            Err(TrieError::RootMismatch { .. })
        ));

        // Dropping a claimed leaf from the middle of the window.
        assert!(matches!(
            verify_trie::<Sha256Hash>(&root, &[felt(1)], &[felt(10)], &proof, 251),
            Err(TrieError::RootMismatch { .. })
        ));
    }

    /// A proof generated under one hasher does not verify under the other.
    #[test]
    fn hasher_variants_are_not_interchangeable() {
        let store = MemStore::new();
        let (trie, root) = committed::<PoseidonHash>(&store, 251, &[(1, 10), (2, 20)]);
        let proof = trie.range_proof(&felt(1), &felt(1)).unwrap();

        assert!(matches!(
            verify_trie::<Sha256Hash>(&root, &[felt(1)], &[felt(10)], &proof, 251),
            Err(TrieError::RootMismatch { .. })
        ));
    }

    /// An empty trie commits to zero, and verification against that root
    /// with no material succeeds trivially.
    #[test]
    fn empty_trie_verifies_against_zero() {
        let root = with_temp_trie::<Sha256Hash, _>(251, |trie| trie.root()).unwrap();
        assert_eq!(root, Felt::zero());
        let has_next = verify_trie::<Sha256Hash>(&root, &[], &[], &[], 251).unwrap();
        assert!(!has_next);
    }

    /// Proof-node keys survive the storage byte codec, which callers use to
    /// ship proofs across a wire.
    #[test]
    fn proof_node_keys_round_trip_their_codec() {
        let store = MemStore::new();
        let (trie, _) = committed::<Sha256Hash>(&store, 251, &[(1, 10), (2, 20)]);
        let proof = trie.range_proof(&felt(1), &felt(1)).unwrap();

        for node in &proof {
            let key_bytes = node.key.to_bytes();
            let decoded = TrieKey::try_from(key_bytes.as_slice()).unwrap();
            assert_eq!(decoded, node.key);
        }
    }
}
