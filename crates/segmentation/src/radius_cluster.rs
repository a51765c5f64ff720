use crate::config::SegmentationConfig;
use crate::segment::ObjectSegment;
use hashbrown::HashMap;
use log::debug;
use obstacles_core::{canonical_cmp, PointCloud};
use obstacles_spatial::{squared_distance, AtomicUnionFind, NeighborGrid, UnionFind};
use rayon::prelude::*;
use std::cmp::Reverse;

/// Clouds at least this large search neighbours in parallel.
const PARALLEL_MIN_POINTS: usize = 10_000;

/// Objects found in a residual cloud, plus the points that belong to none.
#[derive(Debug, Clone)]
pub struct ClusterExtraction {
    pub objects: Vec<ObjectSegment>,
    pub unclassified: PointCloud,
}

/// Groups `residual` into objects using the configured radius and strictness.
///
/// Clusters smaller than `min_pts_in_segment` go to `unclassified`.
pub fn extract_clusters(residual: &PointCloud, config: &SegmentationConfig) -> ClusterExtraction {
    let radius = config.effective_clustering_radius();
    let clusters = radius_cluster(residual, radius, config.min_pts_in_segment);

    let clustered: Vec<usize> = clusters.iter().flatten().copied().collect();
    let objects: Vec<ObjectSegment> = clusters
        .iter()
        .filter_map(|indices| ObjectSegment::from_cloud(residual.select(indices)))
        .collect();
    let unclassified = residual.select_inverse(&clustered);

    debug!(
        "{} objects at radius {}, {} of {} points unclassified",
        objects.len(),
        radius,
        unclassified.len(),
        residual.len()
    );
    ClusterExtraction {
        objects,
        unclassified,
    }
}

/// Connected components of `cloud` under the rule "two points are adjacent
/// when their distance is at most `radius`".
///
/// Only components with at least `min_size` points are returned. Each
/// component lists slot indices in ascending order. Components are sorted by
/// size, largest first; equal sizes are ordered by their smallest point in
/// canonical coordinate order, so the result does not depend on insertion
/// order.
///
/// Returns nothing for an empty cloud or a radius that is not finite and
/// positive.
pub fn radius_cluster(cloud: &PointCloud, radius: f32, min_size: usize) -> Vec<Vec<usize>> {
    if cloud.is_empty() || !radius.is_finite() || radius <= 0.0 {
        return Vec::new();
    }

    let points = cloud.to_points();
    let roots = connected_components(&points, radius, points.len() >= PARALLEL_MIN_POINTS);

    let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
    for (i, &root) in roots.iter().enumerate() {
        groups.entry(root).or_default().push(i);
    }

    let mut clusters: Vec<(Vec<usize>, [f32; 3])> = groups
        .into_values()
        .filter(|members| members.len() >= min_size)
        .filter_map(|members| {
            let first = members
                .iter()
                .map(|&i| points[i])
                .min_by(canonical_cmp)?;
            Some((members, first))
        })
        .collect();

    clusters.sort_by(|a, b| {
        Reverse(a.0.len())
            .cmp(&Reverse(b.0.len()))
            .then_with(|| canonical_cmp(&a.1, &b.1))
    });
    clusters.into_iter().map(|(members, _)| members).collect()
}

/// Union-find root of every point.
///
/// Neighbours come from a hash grid with cell size `radius`; each pair is
/// examined from its lower index only. The parallel variant shares one grid
/// and one atomic union-find between workers, so the partition is the same
/// as the sequential one.
fn connected_components(points: &[[f32; 3]], radius: f32, parallel: bool) -> Vec<usize> {
    let grid = NeighborGrid::build(points, radius);
    let r2 = radius * radius;

    if parallel {
        let uf = AtomicUnionFind::new(points.len());
        (0..points.len()).into_par_iter().for_each(|i| {
            for j in grid.candidates(&points[i]) {
                if j > i && squared_distance(&points[i], &points[j]) <= r2 {
                    uf.union(i, j);
                }
            }
        });
        uf.roots()
    } else {
        let mut uf = UnionFind::new(points.len());
        for (i, p) in points.iter().enumerate() {
            for j in grid.candidates(p) {
                if j > i && squared_distance(p, &points[j]) <= r2 {
                    uf.union(i, j);
                }
            }
        }
        uf.roots()
    }
}
