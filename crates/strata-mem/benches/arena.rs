// Arena allocator benchmarks
//
// Bump allocation of different sizes, save/restore cycles, and scratch
// acquisition through the per-thread registry.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use strata_mem::arena::{Arena, Fill};
use strata_mem::factory::ScratchFactory;
use strata_mem::scratch;

/// Benchmark sequential allocations of different sizes.
///
/// The arena is rewound every 1000 allocations so the measurement never
/// reaches the OOM path.
fn bench_sequential_allocations(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequential_alloc");

    for size in &[4usize, 16, 64, 256, 1024] {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let arena = Arena::with_capacity(size * 1024 + 4096);
            let mark = arena.save();
            let mut n = 0;
            b.iter(|| {
                if n == 1000 {
                    arena.restore(mark);
                    n = 0;
                }
                n += 1;
                black_box(arena.allocate(black_box(size), 8, 1, Fill::Uninit));
            });
        });
    }

    group.finish();
}

/// Zeroed versus uninitialized allocation of a 4 KiB block.
fn bench_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("fill");
    let arena = Arena::with_capacity(8192);

    group.bench_function("zeroed_4k", |b| {
        b.iter(|| {
            let scope = arena.scope();
            black_box(scope.alloc::<u8>(4096));
        });
    });

    group.bench_function("uninit_4k", |b| {
        b.iter(|| {
            let scope = arena.scope();
            black_box(scope.alloc_uninit::<u8>(4096));
        });
    });

    group.finish();
}

/// Save, allocate a handful of objects, restore.
fn bench_save_restore(c: &mut Criterion) {
    let arena = Arena::with_capacity(64 * 1024);

    c.bench_function("save_alloc_restore", |b| {
        b.iter(|| {
            let mark = arena.save();
            for i in 0..16u64 {
                black_box(arena.alloc_value(i));
            }
            arena.restore(mark);
        });
    });
}

/// Scratch acquisition with and without a conflicting arena.
fn bench_scratch(c: &mut Criterion) {
    let mut group = c.benchmark_group("scratch");
    let (arena0, _) = ScratchFactory::default()
        .install_for_current_thread()
        .expect("scratch arenas");

    group.bench_function("no_conflict", |b| {
        b.iter(|| {
            let temp = scratch::scratch_scope(&[]);
            black_box(temp.alloc::<u64>(8));
        });
    });

    group.bench_function("one_conflict", |b| {
        b.iter(|| {
            let temp = scratch::scratch_scope(black_box(&[arena0]));
            black_box(temp.alloc::<u64>(8));
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_sequential_allocations,
    bench_fill,
    bench_save_restore,
    bench_scratch
);
criterion_main!(benches);
