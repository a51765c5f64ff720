use obstacles_core::{Aabb, PointCloud};

/// One detected object: its points and their bounding geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSegment {
    pub cloud: PointCloud,
    pub aabb: Aabb,
    pub centroid: [f32; 3],
}

impl ObjectSegment {
    /// Wraps a non-empty cloud, computing its bounds. Returns `None` for an
    /// empty cloud.
    pub fn from_cloud(cloud: PointCloud) -> Option<Self> {
        let centroid = cloud.centroid()?;
        let aabb = cloud.aabb();
        Some(Self {
            cloud,
            aabb,
            centroid,
        })
    }

    /// Center of the bounding box.
    pub fn center(&self) -> [f32; 3] {
        self.aabb.center().unwrap_or(self.centroid)
    }

    /// Side lengths of the bounding box.
    pub fn extents(&self) -> [f32; 3] {
        self.aabb.extents()
    }

    pub fn len(&self) -> usize {
        self.cloud.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cloud.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn bounds_of_a_column() {
        let cloud =
            PointCloud::from_points((1..=4).map(|z| [1.0, 1.0, z as f32])).unwrap();
        let object = ObjectSegment::from_cloud(cloud).unwrap();

        assert_eq!(object.len(), 4);
        assert_eq!(object.aabb.min, [1.0, 1.0, 1.0]);
        assert_eq!(object.aabb.max, [1.0, 1.0, 4.0]);
        assert_eq!(object.center(), [1.0, 1.0, 2.5]);
        assert_eq!(object.extents(), [0.0, 0.0, 3.0]);
        assert_abs_diff_eq!(object.centroid[2], 2.5, epsilon = 1e-6);
    }

    #[test]
    fn centroid_differs_from_box_center_for_skewed_points() {
        let cloud = PointCloud::from_points([
            [0.0, 0.0, 0.0],
            [0.1, 0.0, 0.0],
            [0.2, 0.0, 0.0],
            [3.0, 0.0, 0.0],
        ])
        .unwrap();
        let object = ObjectSegment::from_cloud(cloud).unwrap();
        assert_abs_diff_eq!(object.center()[0], 1.5, epsilon = 1e-6);
        assert_abs_diff_eq!(object.centroid[0], 0.825, epsilon = 1e-6);
    }

    #[test]
    fn empty_cloud_is_not_an_object() {
        assert!(ObjectSegment::from_cloud(PointCloud::new()).is_none());
    }
}
