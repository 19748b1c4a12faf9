//! Synopsis construction benchmark
//!
//! The synopsis is rebuilt from scratch on every peer query, so its cost
//! over deep chains is what bounds query throughput on a busy node.

use chainhost::testing::MemoryLedger;
use chainhost::{BlockId, PeerSyncService, SyncDelegate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

fn bench_synopsis(c: &mut Criterion) {
    let mut group = c.benchmark_group("blockchain_synopsis");
    for height in [1_000u32, 10_000, 100_000] {
        let ledger = Arc::new(MemoryLedger::with_blocks(height));
        let delegate = SyncDelegate::new(ledger);
        group.bench_with_input(BenchmarkId::from_parameter(height), &height, |b, _| {
            b.iter(|| {
                let synopsis = delegate
                    .get_blockchain_synopsis(black_box(BlockId::ZERO), 0)
                    .expect("synopsis over a healthy chain");
                black_box(synopsis)
            })
        });
    }
    group.finish();
}

fn bench_get_block_ids(c: &mut Criterion) {
    let ledger = Arc::new(MemoryLedger::with_blocks(10_000));
    let delegate = SyncDelegate::new(ledger);
    // An empty synopsis (a brand-new peer) forces the longest range scan.
    let empty: Vec<BlockId> = Vec::new();

    c.bench_function("get_block_ids_limit_500", |b| {
        b.iter(|| {
            let range = delegate
                .get_block_ids(black_box(&empty), 500)
                .expect("range");
            black_box(range)
        })
    });
}

criterion_group!(benches, bench_synopsis, bench_get_block_ids);
criterion_main!(benches);
