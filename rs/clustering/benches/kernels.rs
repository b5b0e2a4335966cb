use clustering::kernel::{Kernel, ScalarKernel, Vector128Kernel, Vector64Kernel};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use utils::test_utils::generate_random_vector;

fn bench_squared_distance(c: &mut Criterion) {
    let mut group = c.benchmark_group("Squared Distance");
    for size in [2, 4, 8, 16, 32, 64, 128, 256, 512, 1024, 130, 384, 768] {
        let a = generate_random_vector(size);
        let b = generate_random_vector(size);

        group.bench_with_input(BenchmarkId::new("Scalar", size), &size, |bencher, _| {
            bencher.iter(|| {
                <ScalarKernel as Kernel<f32>>::distance(black_box(&a), black_box(&b))
            })
        });

        group.bench_with_input(BenchmarkId::new("Vector128", size), &size, |bencher, _| {
            bencher.iter(|| Vector128Kernel::squared_distance(black_box(&a), black_box(&b)))
        });

        group.bench_with_input(BenchmarkId::new("Vector64", size), &size, |bencher, _| {
            bencher.iter(|| Vector64Kernel::squared_distance(black_box(&a), black_box(&b)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_squared_distance);
criterion_main!(benches);
