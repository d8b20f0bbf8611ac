use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mapcluster::spatial_index::SpatialIndex;
use mapcluster::{ClusterEngine, ClusterOptions, Feature};

fn scattered(count: usize, seed: u64) -> Vec<Feature> {
    let mut state = seed;
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (state >> 33) as f64 / (1u64 << 31) as f64
    };
    (0..count)
        .map(|_| Feature::new(next() * 360.0 - 180.0, next() * 170.0 - 85.0))
        .collect()
}

fn bench_engine_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_build");
    for &count in &[1_000usize, 10_000, 50_000] {
        let features = scattered(count, 7);
        group.bench_with_input(BenchmarkId::from_parameter(count), &features, |b, features| {
            b.iter(|| {
                ClusterEngine::new(black_box(features.clone()), ClusterOptions::default())
                    .unwrap()
            })
        });
    }
    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let engine = ClusterEngine::new(scattered(10_000, 11), ClusterOptions::default()).unwrap();

    let mut group = c.benchmark_group("queries");
    group.bench_function("tile_z4", |b| {
        b.iter(|| black_box(engine.tile(4, 7, 6)))
    });
    group.bench_function("clusters_viewport_z6", |b| {
        b.iter(|| black_box(engine.clusters([-20.0, 30.0, 20.0, 60.0], 6)))
    });
    group.bench_function("clusters_world_z2", |b| {
        b.iter(|| black_box(engine.clusters([-180.0, -90.0, 180.0, 90.0], 2)))
    });
    group.finish();
}

fn bench_spatial_index(c: &mut Criterion) {
    let mut state = 3u64;
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (state >> 33) as f64 / (1u64 << 31) as f64
    };
    let points: Vec<(f64, f64)> = (0..100_000).map(|_| (next(), next())).collect();
    let index = SpatialIndex::build(&points);

    let mut group = c.benchmark_group("spatial_index");
    group.bench_function("build_100k", |b| {
        b.iter(|| black_box(SpatialIndex::build(black_box(&points))))
    });
    group.bench_function("range_query", |b| {
        b.iter(|| {
            let mut hits = 0u32;
            index.range(0.25, 0.25, 0.75, 0.75, |_| hits += 1);
            black_box(hits)
        })
    });
    group.bench_function("within_query", |b| {
        b.iter(|| {
            let mut hits = 0u32;
            index.within(0.5, 0.5, 0.1, |_| hits += 1);
            black_box(hits)
        })
    });
    group.finish();
}

criterion_group!(benches, bench_engine_build, bench_queries, bench_spatial_index);
criterion_main!(benches);
