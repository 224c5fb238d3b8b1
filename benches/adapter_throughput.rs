// Micro-benchmark of every digest adapter on in-memory input, complementing
// the forked end-to-end runs of the `digestbench` binary.
// Run with: cargo bench

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use digestbench::digest::{new_adapter, BenchCase};
use digestbench::fixture::InputFixture;
use digestbench::runner::CHUNK_SIZE;
use std::hint::black_box;

fn bench_adapters(c: &mut Criterion) {
    let sizes: [(usize, &str); 3] = [(1024, "1KB"), (64 * 1024, "64KB"), (1024 * 1024, "1MB")];

    let mut group = c.benchmark_group("adapter_throughput");

    for (size, label) in sizes {
        let fixture = InputFixture::with_seed(size, 0).expect("non-empty fixture");
        let data = fixture.as_bytes();

        group.throughput(Throughput::Bytes(size as u64));

        for case in BenchCase::all() {
            group.bench_with_input(BenchmarkId::new(case.to_string(), label), data, |b, data| {
                b.iter(|| {
                    let mut adapter = new_adapter(case).unwrap();
                    for chunk in data.chunks(CHUNK_SIZE) {
                        adapter.update(chunk).unwrap();
                    }
                    black_box(hex::encode(adapter.finalize().unwrap()))
                })
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_adapters);
criterion_main!(benches);
