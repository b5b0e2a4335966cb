use clustering::engine::Engine;
use clustering::seeding::CentroidSeed;
use config::clustering::ClusteringConfig;
use config::enums::HardwareType;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use utils::random::SegmentSampler;
use utils::test_utils::generate_clustered_points;

fn bench_kmeans(c: &mut Criterion) {
    let mut group = c.benchmark_group("K-Means");
    let num_clusters = 16;
    let points_per_cluster = 500;

    for dimension in [6, 128] {
        let points = generate_clustered_points(
            num_clusters,
            points_per_cluster,
            dimension,
            10.0,
            4.0,
            1024,
        );
        let mut sampler = SegmentSampler::new(1024);
        let centroids = CentroidSeed::Sampled {
            num_k: num_clusters,
            sampler: &mut sampler,
        }
        .initial_centroids(&points, dimension)
        .unwrap();

        for hardware in [HardwareType::Scalar, HardwareType::Auto] {
            let config = ClusteringConfig::default().with_hardware(hardware);
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", hardware), dimension),
                &dimension,
                |bencher, _| {
                    bencher.iter(|| {
                        let mut engine = Engine::build(
                            &points,
                            dimension,
                            CentroidSeed::Explicit(&centroids),
                            &config,
                        )
                        .unwrap();
                        black_box(engine.calc().unwrap())
                    })
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_kmeans);
criterion_main!(benches);
