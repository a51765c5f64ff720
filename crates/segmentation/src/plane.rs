use crate::config::SegmentationConfig;
use log::{debug, warn};
use obstacles_core::PointCloud;
use obstacles_normals::{estimate_normals_for_points, Normals};
use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;

/// Clouds at least this large score hypotheses in parallel.
const PARALLEL_MIN_POINTS: usize = 10_000;
const PARALLEL_MIN_SAMPLES: usize = 16;

/// A 3D plane model in the form `n . x + d = 0`, where `n` is a unit normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneModel {
    pub normal: [f32; 3],
    pub d: f32,
}

impl PlaneModel {
    /// Computes the absolute distance from a point to this plane.
    /// Assumes `normal` is a unit vector.
    #[inline]
    pub fn distance_to_point(&self, point: &[f32; 3]) -> f32 {
        (dot(&self.normal, point) + self.d).abs()
    }

    /// Whether `direction` is within the angle whose cosine is `cos_tol` of
    /// this plane's normal, ignoring orientation.
    #[inline]
    pub fn is_aligned_with(&self, direction: &[f32; 3], cos_tol: f32) -> bool {
        dot(&self.normal, direction).abs() >= cos_tol
    }
}

/// Result of removing the dominant plane from a cloud.
///
/// `residual` and `plane_points` partition the input. When no plane was
/// accepted, `plane_points` is empty, `model` is `None` and `residual` equals
/// the input.
#[derive(Debug, Clone)]
pub struct PlaneRemoval {
    pub residual: PointCloud,
    pub plane_points: PointCloud,
    pub model: Option<PlaneModel>,
}

impl PlaneRemoval {
    fn unchanged(cloud: &PointCloud) -> Self {
        Self {
            residual: cloud.clone(),
            plane_points: PointCloud::new(),
            model: None,
        }
    }

    pub fn removed_count(&self) -> usize {
        self.plane_points.len()
    }

    /// The residual cloud and the number of removed points.
    pub fn into_parts(self) -> (PointCloud, usize) {
        let removed = self.removed_count();
        (self.residual, removed)
    }
}

/// Finds the dominant plane of `cloud` and splits it off.
///
/// # Algorithm
///
/// 1. Order points canonically so sampling does not depend on insertion
///    order.
/// 2. Estimate a local surface normal per point (PCA over
///    `normal_neighbors` neighbours).
/// 3. Pre-generate `ransac_iterations` seeded triples and fit a plane through
///    each non-collinear one. With a `ground_normal`, hypotheses tilted more
///    than the angle tolerance away from it are skipped.
/// 4. A point supports a hypothesis when it lies within
///    `max_dist_from_plane` of it and its local normal, if defined, is within
///    `angle_tolerance_deg` of the hypothesis normal.
/// 5. Keep the best supported hypothesis; ties go to the earliest sample.
///    Large clouds score hypotheses in parallel, small clouds sequentially
///    with adaptive early termination.
/// 6. Remove the plane only if its support reaches `min_pts_in_plane`.
pub fn remove_dominant_plane(cloud: &PointCloud, config: &SegmentationConfig) -> PlaneRemoval {
    let n = cloud.len();
    if n < 3 || n < config.min_pts_in_plane {
        debug!(
            "plane removal skipped: {} points, {} required",
            n, config.min_pts_in_plane
        );
        return PlaneRemoval::unchanged(cloud);
    }

    let order = cloud.canonical_order();
    let points: Vec<[f32; 3]> = order.iter().map(|&slot| cloud.point(slot)).collect();
    let normals = estimate_normals_for_points(&points, config.normal_neighbors);

    let search = PlaneSearch::new(config);
    let Some((model, inliers)) = search.run(&points, &normals) else {
        return PlaneRemoval::unchanged(cloud);
    };

    if inliers.len() < config.min_pts_in_plane {
        debug!(
            "best plane has {} supporting points, {} required; nothing removed",
            inliers.len(),
            config.min_pts_in_plane
        );
        return PlaneRemoval::unchanged(cloud);
    }

    let slots: Vec<usize> = inliers.iter().map(|&i| order[i]).collect();
    debug!(
        "removed plane {:?} (d = {}) with {} of {} points",
        model.normal,
        model.d,
        slots.len(),
        n
    );
    PlaneRemoval {
        residual: cloud.select_inverse(&slots),
        plane_points: cloud.select(&slots),
        model: Some(model),
    }
}

struct PlaneSearch {
    max_dist: f32,
    cos_tol: f32,
    ground_normal: Option<[f32; 3]>,
    iterations: usize,
    seed: u64,
}

impl PlaneSearch {
    fn new(config: &SegmentationConfig) -> Self {
        // Slack for rounding at a zero tolerance
        let cos_tol = config.angle_tolerance_deg.to_radians().cos() - 1e-6;
        Self {
            max_dist: config.max_dist_from_plane,
            cos_tol,
            ground_normal: config.ground_normal,
            iterations: config.ransac_iterations,
            seed: config.ransac_seed,
        }
    }

    #[inline]
    fn supports(&self, model: &PlaneModel, point: &[f32; 3], normal: &[f32; 3]) -> bool {
        model.distance_to_point(point) <= self.max_dist
            && (*normal == [0.0; 3] || model.is_aligned_with(normal, self.cos_tol))
    }

    fn count_support(&self, points: &[[f32; 3]], normals: &Normals, model: &PlaneModel) -> usize {
        (0..points.len())
            .filter(|&i| self.supports(model, &points[i], &normals.normal(i)))
            .count()
    }

    fn hypothesis(&self, points: &[[f32; 3]], sample: (usize, usize, usize)) -> Option<PlaneModel> {
        let (i0, i1, i2) = sample;
        let model = fit_plane_from_three_points(&points[i0], &points[i1], &points[i2])?;
        match &self.ground_normal {
            Some(ground) if !model.is_aligned_with(ground, self.cos_tol) => None,
            _ => Some(model),
        }
    }

    /// Best hypothesis and the indices (into `points`) supporting it.
    fn run(&self, points: &[[f32; 3]], normals: &Normals) -> Option<(PlaneModel, Vec<usize>)> {
        let n = points.len();

        // Pre-generate all random samples for determinism
        let mut rng = StdRng::seed_from_u64(self.seed);
        let samples: Vec<(usize, usize, usize)> = (0..self.iterations)
            .filter_map(|_| sample_three_distinct(n, &mut rng))
            .collect();

        let use_parallel = n >= PARALLEL_MIN_POINTS && samples.len() >= PARALLEL_MIN_SAMPLES;

        let best = if use_parallel {
            samples
                .par_iter()
                .enumerate()
                .filter_map(|(k, &sample)| {
                    let model = self.hypothesis(points, sample)?;
                    Some((k, model, self.count_support(points, normals, &model)))
                })
                .reduce_with(|a, b| {
                    // Higher support wins; the earlier sample breaks ties
                    if a.2 > b.2 || (a.2 == b.2 && a.0 < b.0) {
                        a
                    } else {
                        b
                    }
                })
                .map(|(_, model, count)| (model, count))
        } else {
            let mut best: Option<(PlaneModel, usize)> = None;

            for (iter, &sample) in samples.iter().enumerate() {
                let Some(model) = self.hypothesis(points, sample) else {
                    continue;
                };
                let count = self.count_support(points, normals, &model);

                if best.map_or(true, |(_, best_count)| count > best_count) {
                    best = Some((model, count));

                    // Adaptive early termination
                    let w = count as f64 / n as f64;
                    if w > 0.5 {
                        let needed = (1.0 - 0.999f64).ln() / (1.0 - w.powi(3)).ln();
                        if (iter as f64) > needed {
                            break;
                        }
                    }
                }
            }

            best
        };

        let Some((model, _)) = best else {
            warn!(
                "no usable plane hypothesis among {} samples of {} points",
                samples.len(),
                n
            );
            return None;
        };

        let inliers: Vec<usize> = (0..n)
            .filter(|&i| self.supports(&model, &points[i], &normals.normal(i)))
            .collect();
        Some((model, inliers))
    }
}

/// Samples 3 distinct indices in [0, n).
fn sample_three_distinct(n: usize, rng: &mut StdRng) -> Option<(usize, usize, usize)> {
    if n < 3 {
        return None;
    }
    let i0 = rng.gen_range(0..n);
    let mut i1 = rng.gen_range(0..n);
    let mut attempts = 0;
    while i1 == i0 {
        if attempts > 100 {
            return None;
        }
        i1 = rng.gen_range(0..n);
        attempts += 1;
    }
    let mut i2 = rng.gen_range(0..n);
    attempts = 0;
    while i2 == i0 || i2 == i1 {
        if attempts > 100 {
            return None;
        }
        i2 = rng.gen_range(0..n);
        attempts += 1;
    }
    Some((i0, i1, i2))
}

/// Fits a plane through 3 points, returning `None` if they are collinear.
fn fit_plane_from_three_points(p0: &[f32; 3], p1: &[f32; 3], p2: &[f32; 3]) -> Option<PlaneModel> {
    let v1 = [p1[0] - p0[0], p1[1] - p0[1], p1[2] - p0[2]];
    let v2 = [p2[0] - p0[0], p2[1] - p0[1], p2[2] - p0[2]];

    let nx = v1[1] * v2[2] - v1[2] * v2[1];
    let ny = v1[2] * v2[0] - v1[0] * v2[2];
    let nz = v1[0] * v2[1] - v1[1] * v2[0];

    let len = (nx * nx + ny * ny + nz * nz).sqrt();
    if !(len >= 1e-10) {
        return None;
    }

    let normal = [nx / len, ny / len, nz / len];
    let d = -dot(&normal, p0);

    Some(PlaneModel { normal, d })
}

#[inline]
fn dot(a: &[f32; 3], b: &[f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}
