//! Benchmarks for treewalk
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::path::Path;
use std::sync::Arc;

fn benchmark_strategies(c: &mut Criterion) {
    use treewalk::fs::MemoryFs;
    use treewalk::processor::NoOp;
    use treewalk::walker::WalkContext;
    use treewalk::{PoolConfig, Strategy};

    // 1 + 6 + 36 + 216 directories, 8 files each
    let fs = Arc::new(MemoryFs::balanced("/bench", 3, 6, 8));
    let mut group = c.benchmark_group("traverse_memory_tree");

    for strategy in Strategy::ALL {
        let ctx = WalkContext::builder(Arc::new(NoOp))
            .filesystem(fs.clone())
            .build();
        let walker = strategy.build(ctx, PoolConfig::with_workers(4));

        group.bench_with_input(
            BenchmarkId::from_parameter(strategy),
            &walker,
            |b, walker| {
                b.iter(|| {
                    let stats = walker.traverse(Path::new("/bench")).unwrap();
                    black_box(stats);
                })
            },
        );
    }

    group.finish();
}

fn benchmark_pool_submit(c: &mut Criterion) {
    use treewalk::walker::WorkerPool;

    c.bench_function("pool_submit_wait", |b| {
        let pool = WorkerPool::new(4).unwrap();

        b.iter(|| {
            let handle = pool.submit("/bench/file".into(), || Ok(()));
            black_box(handle.wait()).unwrap();
        })
    });
}

fn benchmark_filter(c: &mut Criterion) {
    use treewalk::WalkFilter;

    c.bench_function("filter_admits", |b| {
        let filter = WalkFilter::new()
            .max_depth(8)
            .exclude(r"\.snapshot")
            .unwrap()
            .exclude(r"/node_modules/")
            .unwrap();
        let path = Path::new("/data/projects/app/src/lib/module.rs");

        b.iter(|| black_box(filter.admits(black_box(path), 5)))
    });
}

criterion_group!(
    benches,
    benchmark_strategies,
    benchmark_pool_submit,
    benchmark_filter
);
criterion_main!(benches);
