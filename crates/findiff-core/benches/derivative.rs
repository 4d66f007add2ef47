//! Benchmarks for the CPU derivative kernels.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use findiff_core::prelude::*;

fn cosine(domain: Domain) -> Field {
    Field::from_fn(domain, |i, j, k| {
        let x = i as f32 / (domain.mx - 1) as f32;
        let y = j as f32 / (domain.my - 1) as f32;
        let z = k as f32 / (domain.mz - 1) as f32;
        (std::f32::consts::TAU * x).cos() * (std::f32::consts::TAU * y).cos() * (std::f32::consts::TAU * z).cos()
    })
}

fn benchmark_lockstep(c: &mut Criterion) {
    let backend = CpuBackend::new(Schedule::Lockstep);
    let mut group = c.benchmark_group("lockstep");

    for n in [32usize, 64] {
        let config = DerivativeConfig::new(Domain::cubic(n)).expect("valid domain");
        let input = backend.upload(&cosine(config.domain())).expect("upload");
        let mut output = backend.allocate(config.domain()).expect("allocate");
        group.throughput(Throughput::Bytes(2 * config.domain().bytes() as u64));

        for kernel in config.kernels() {
            group.bench_with_input(BenchmarkId::new(kernel.name(), n), &kernel, |b, kernel| {
                b.iter(|| backend.launch(black_box(kernel), &input, &mut output))
            });
        }
    }

    group.finish();
}

fn benchmark_threaded(c: &mut Criterion) {
    let backend = CpuBackend::new(Schedule::Threaded);
    let config = DerivativeConfig::new(Domain::cubic(32)).expect("valid domain");
    let input = backend.upload(&cosine(config.domain())).expect("upload");
    let mut output = backend.allocate(config.domain()).expect("allocate");

    let mut group = c.benchmark_group("threaded");
    group.sample_size(10);

    for axis in Axis::ALL {
        let kernel = config.kernel(axis, PencilVariant::Small);
        group.bench_with_input(BenchmarkId::new(kernel.name(), 32), &kernel, |b, kernel| {
            b.iter(|| backend.launch(black_box(kernel), &input, &mut output))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_lockstep, benchmark_threaded);
criterion_main!(benches);
