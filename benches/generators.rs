//! Benchmarks for key generation and batched loading.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use trie_bench::{
    BenchConfig, KeyCodec, MemoryTrie, SkewedGenerator, UniformGenerator, WorkloadDriver,
};

fn bench_key_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_generation");
    group.throughput(Throughput::Elements(1));

    group.bench_function("uniform", |b| {
        let mut gen = UniformGenerator::new(1, 1_000_000, 42);
        b.iter(|| black_box(gen.next()))
    });

    group.bench_function("skewed", |b| {
        let mut gen = SkewedGenerator::new(1_000_000, 42);
        b.iter(|| black_box(gen.next()))
    });

    group.bench_function("encode", |b| {
        let codec = KeyCodec::new(9);
        let mut n = 0u64;
        b.iter(|| {
            n += 1;
            black_box(codec.encode(n))
        })
    });

    group.finish();
}

fn bench_loading(c: &mut Criterion) {
    let mut group = c.benchmark_group("loading");

    for accounts in [1_000u64, 10_000] {
        group.throughput(Throughput::Elements(accounts));
        group.bench_with_input(
            BenchmarkId::new("load", accounts),
            &accounts,
            |b, &accounts| {
                b.iter(|| {
                    let mut engine = MemoryTrie::new();
                    let config = BenchConfig {
                        accounts,
                        load_batch_size: 1000,
                        ..BenchConfig::default()
                    };
                    let mut driver = WorkloadDriver::new(&mut engine, config);
                    black_box(driver.load().unwrap())
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_key_generation, bench_loading);
criterion_main!(benches);
