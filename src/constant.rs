//! Constants that bound the shape of the trie and its root computation.

/// Maximum node depth at which the two child subtrees of a dirty node are
/// recomputed on concurrent tasks. Below this depth the traversal runs
/// sequentially, since the spawn overhead outweighs the remaining work.
pub const CONCURRENCY_MAX_DEPTH: u8 = 8;
