use obstacles_core::PointCloud;
use obstacles_spatial::KdTree;
use rayon::prelude::*;

/// Minimum neighbourhood size (query point included) that can span a surface.
pub const MIN_SURFACE_NEIGHBORS: usize = 3;

/// Unoriented unit surface normals, one per point, in structure-of-arrays
/// layout.
///
/// A zero vector marks a point whose neighbourhood is too small or too
/// degenerate (coincident or collinear) to define a surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Normals {
    pub nx: Vec<f32>,
    pub ny: Vec<f32>,
    pub nz: Vec<f32>,
}

impl Normals {
    pub fn len(&self) -> usize {
        self.nx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nx.is_empty()
    }

    pub fn normal(&self, i: usize) -> [f32; 3] {
        [self.nx[i], self.ny[i], self.nz[i]]
    }

    /// Whether point `i` has a usable normal.
    pub fn is_defined(&self, i: usize) -> bool {
        self.nx[i] != 0.0 || self.ny[i] != 0.0 || self.nz[i] != 0.0
    }
}

/// Estimate surface normals for each point in the cloud using PCA.
///
/// Normals are returned in the cloud's slot order. See
/// [`estimate_normals_for_points`].
pub fn estimate_normals(cloud: &PointCloud, k: usize) -> Normals {
    estimate_normals_for_points(&cloud.to_points(), k)
}

/// Estimate surface normals for a point slice using PCA.
///
/// For each point, the `k` nearest neighbours (the point itself included) are
/// found, a covariance matrix is built from their positions, and the
/// eigenvector of the smallest eigenvalue is taken as the surface normal.
/// Normals are not oriented; callers compare them up to sign.
///
/// The computation is parallelized across points using rayon.
pub fn estimate_normals_for_points(points: &[[f32; 3]], k: usize) -> Normals {
    if points.is_empty() || k == 0 {
        return Normals {
            nx: vec![],
            ny: vec![],
            nz: vec![],
        };
    }

    let tree = KdTree::from_points(points);

    let normals_vec: Vec<[f32; 3]> = points
        .par_iter()
        .map(|point| {
            let indices = tree.knn_indices(point, k);
            neighborhood_normal(points, &indices).unwrap_or([0.0; 3])
        })
        .collect();

    let n = points.len();
    let mut nx = Vec::with_capacity(n);
    let mut ny = Vec::with_capacity(n);
    let mut nz = Vec::with_capacity(n);
    for normal in &normals_vec {
        nx.push(normal[0]);
        ny.push(normal[1]);
        nz.push(normal[2]);
    }

    Normals { nx, ny, nz }
}

/// PCA normal of the points at `indices`, or `None` when they do not span a
/// surface.
fn neighborhood_normal(points: &[[f32; 3]], indices: &[usize]) -> Option<[f32; 3]> {
    if indices.len() < MIN_SURFACE_NEIGHBORS {
        return None;
    }
    let count = indices.len() as f64;

    let mut c = [0.0f64; 3];
    for &idx in indices {
        for axis in 0..3 {
            c[axis] += points[idx][axis] as f64;
        }
    }
    let c = c.map(|v| v / count);

    // Upper triangle of the symmetric covariance matrix
    let mut cov = SymMat3::default();
    for &idx in indices {
        let d = [0, 1, 2].map(|axis| points[idx][axis] as f64 - c[axis]);
        cov.a00 += d[0] * d[0];
        cov.a01 += d[0] * d[1];
        cov.a02 += d[0] * d[2];
        cov.a11 += d[1] * d[1];
        cov.a12 += d[1] * d[2];
        cov.a22 += d[2] * d[2];
    }

    let e = cov.smallest_eigenvector()?;
    Some(e.map(|v| v as f32))
}

#[derive(Debug, Default, Clone, Copy)]
struct SymMat3 {
    a00: f64,
    a01: f64,
    a02: f64,
    a11: f64,
    a12: f64,
    a22: f64,
}

impl SymMat3 {
    /// Unit eigenvector of the smallest eigenvalue.
    ///
    /// Eigenvalues come from Cardano's closed form; the eigenvector is the
    /// null direction of `A - λI`, taken as the longest cross product of two
    /// of its rows. Returns `None` for a (near) isotropic matrix or a
    /// null space of dimension > 1 (collinear or coincident points).
    fn smallest_eigenvector(&self) -> Option<[f64; 3]> {
        let SymMat3 {
            a00,
            a01,
            a02,
            a11,
            a12,
            a22,
        } = *self;

        let m = (a00 + a11 + a22) / 3.0;
        let b00 = a00 - m;
        let b11 = a11 - m;
        let b22 = a22 - m;

        // q = det(A - mI) / 2, p = |A - mI|_F^2 / 6
        let q = (b00 * (b11 * b22 - a12 * a12) - a01 * (a01 * b22 - a12 * a02)
            + a02 * (a01 * a12 - b11 * a02))
            / 2.0;
        let p = ((b00 * b00 + b11 * b11 + b22 * b22 + 2.0 * (a01 * a01 + a02 * a02 + a12 * a12))
            / 6.0)
            .max(0.0);

        if p < 1e-30 {
            return None;
        }

        let ratio = (q / (p * p.sqrt())).clamp(-1.0, 1.0);
        let phi = ratio.acos() / 3.0;
        let sqrt_p = p.sqrt();
        // Smallest root of the characteristic polynomial
        let lambda = m + 2.0 * sqrt_p * (phi + 2.0 * std::f64::consts::FRAC_PI_3).cos();

        let r0 = [a00 - lambda, a01, a02];
        let r1 = [a01, a11 - lambda, a12];
        let r2 = [a02, a12, a22 - lambda];

        let best = [cross(&r0, &r1), cross(&r0, &r2), cross(&r1, &r2)]
            .into_iter()
            .map(|v| (v, v[0] * v[0] + v[1] * v[1] + v[2] * v[2]))
            .max_by(|a, b| a.1.total_cmp(&b.1))?;

        let (v, len2) = best;
        // Relative to the matrix scale, a vanishing cross product means the
        // null space is not a single direction.
        if len2 <= 1e-20 * (p * p).max(1e-30) {
            return None;
        }
        let inv = 1.0 / len2.sqrt();
        Some(v.map(|c| c * inv))
    }
}

#[inline]
fn cross(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}
