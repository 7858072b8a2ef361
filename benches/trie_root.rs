//! Trie commitment benchmarks.
//!
//! Measures root computation under the two workloads that dominate real
//! usage: committing a freshly built trie (every ancestor dirty) and
//! recommitting after a small batch of updates (most subtrees clean, the
//! lazy dirty tracking should skip them).
//!
//! ```bash
//! cargo bench --bench trie_root
//! ```

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use dense_mpt::{Felt, MemStore, Sha256Trie};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

const HEIGHT: u8 = 251;

/// Generates `count` distinct random key-value pairs.
fn gen_pairs(count: usize, rng: &mut StdRng) -> Vec<(Felt, Felt)> {
    let mut seen = std::collections::HashSet::new();
    let mut pairs = Vec::with_capacity(count);
    while pairs.len() < count {
        let key: u128 = rng.gen();
        if seen.insert(key) {
            pairs.push((Felt::from(key), Felt::from(rng.gen::<u64>().max(1))));
        }
    }
    pairs
}

/// Builds a committed trie over `pairs` and returns its storage.
fn committed_store(pairs: &[(Felt, Felt)]) -> MemStore {
    let store = MemStore::new();
    let mut trie = Sha256Trie::new(&store, HEIGHT).expect("valid height");
    for (key, value) in pairs {
        trie.put(key, value).expect("in-memory put cannot fail");
    }
    trie.commit().expect("in-memory commit cannot fail");
    store
}

fn bench_fresh_commit(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    for size in [1_000usize, 10_000] {
        let pairs = gen_pairs(size, &mut rng);
        c.bench_function(&format!("fresh_commit/{size}"), |b| {
            b.iter_batched(
                MemStore::new,
                |store| {
                    let mut trie = Sha256Trie::new(&store, HEIGHT).expect("valid height");
                    for (key, value) in &pairs {
                        trie.put(key, value).expect("put");
                    }
                    black_box(trie.root().expect("root"))
                },
                BatchSize::LargeInput,
            );
        });
    }
}

fn bench_incremental_commit(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(43);
    let pairs = gen_pairs(10_000, &mut rng);
    let store = committed_store(&pairs);
    let updates = gen_pairs(100, &mut rng);

    c.bench_function("incremental_commit/100_of_10000", |b| {
        b.iter_batched(
            || store.clone(),
            |store| {
                let mut trie = Sha256Trie::new(&store, HEIGHT).expect("valid height");
                for (key, value) in &updates {
                    trie.put(key, value).expect("put");
                }
                black_box(trie.root().expect("root"))
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(benches, bench_fresh_commit, bench_incremental_commit);
criterion_main!(benches);
