use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use obstacles_core::PointCloud;
use obstacles_segmentation::{remove_dominant_plane, segment_obstacles, SegmentationConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Noisy floor with 20% of the points scattered above it.
fn floor_scene(n: usize, seed: u64) -> PointCloud {
    let mut rng = StdRng::seed_from_u64(seed);
    let floor = n * 4 / 5;
    let mut cloud = PointCloud::with_capacity(n);
    for i in 0..n {
        let z = if i < floor {
            rng.gen_range(-0.02f32..0.02)
        } else {
            rng.gen_range(0.3f32..3.0)
        };
        cloud
            .insert([rng.gen_range(-50.0f32..50.0), rng.gen_range(-50.0f32..50.0), z])
            .unwrap();
    }
    cloud
}

fn scene_config() -> SegmentationConfig {
    SegmentationConfig {
        min_pts_in_plane: 1_000,
        max_dist_from_plane: 0.05,
        min_pts_in_segment: 20,
        clustering_radius: 0.5,
        ransac_iterations: 200,
        ..Default::default()
    }
}

fn bench_remove_plane(c: &mut Criterion) {
    let mut group = c.benchmark_group("remove_dominant_plane");
    group.sample_size(20);
    for size in [20_000, 100_000] {
        let cloud = floor_scene(size, 42);
        let config = scene_config();
        group.bench_with_input(
            BenchmarkId::new("obstacles-rs", size),
            &cloud,
            |b, cloud| b.iter(|| remove_dominant_plane(cloud, &config)),
        );
    }
    group.finish();
}

fn bench_full_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("segment_obstacles");
    group.sample_size(10);
    for size in [20_000, 100_000] {
        let cloud = floor_scene(size, 7);
        let config = scene_config();
        group.bench_with_input(
            BenchmarkId::new("obstacles-rs", size),
            &cloud,
            |b, cloud| b.iter(|| segment_obstacles(cloud, &config)),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_remove_plane, bench_full_pipeline);
criterion_main!(benches);
