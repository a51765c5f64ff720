use kiddo::float::distance::SquaredEuclidean;
use kiddo::immutable::float::kdtree::ImmutableKdTree;
use obstacles_core::PointCloud;
use std::num::NonZero;

/// A KdTree for nearest-neighbour queries on 3D point clouds.
///
/// Built on top of kiddo v5's `ImmutableKdTree`, which uses a cache-optimized
/// layout and tolerates many points sharing a value on one axis (planar
/// scans). The tree is built once and cannot be modified afterwards.
///
/// The tree stores `u32` indices mapping back to the source slot order.
#[derive(Debug, Clone)]
pub struct KdTree {
    tree: ImmutableKdTree<f32, u32, 3, 32>,
    num_points: usize,
}

impl KdTree {
    /// Build a KdTree over the points of a cloud, indexed by slot.
    pub fn build(cloud: &PointCloud) -> Self {
        Self::from_points(&cloud.to_points())
    }

    /// Build a KdTree over a contiguous point slice, indexed by position.
    pub fn from_points(points: &[[f32; 3]]) -> Self {
        Self {
            tree: ImmutableKdTree::new_from_slice(points),
            num_points: points.len(),
        }
    }

    /// Returns the number of points in the tree.
    pub fn len(&self) -> usize {
        self.num_points
    }

    /// Returns true if the tree is empty.
    pub fn is_empty(&self) -> bool {
        self.num_points == 0
    }

    /// Find the `k` nearest neighbours to `query`, returning only indices,
    /// nearest first. The query point itself is included when it belongs to
    /// the tree.
    ///
    /// Edge cases:
    /// - Returns empty if `k == 0`, the tree is empty, or query contains NaN.
    /// - If `k > len()`, returns all points.
    pub fn knn_indices(&self, query: &[f32; 3], k: usize) -> Vec<usize> {
        let Some(nz_k) = NonZero::new(k) else {
            return Vec::new();
        };
        if self.is_empty() || !query.iter().all(|v| v.is_finite()) {
            return Vec::new();
        }

        let results = self.tree.nearest_n::<SquaredEuclidean>(query, nz_k);

        results.iter().map(|nn| nn.item as usize).collect()
    }
}
