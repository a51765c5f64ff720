use crate::config::SegmentationConfig;
use crate::plane::{remove_dominant_plane, PlaneModel};
use crate::radius_cluster::extract_clusters;
use crate::segment::ObjectSegment;
use log::debug;
use obstacles_core::PointCloud;

/// Full result of segmenting one frame.
///
/// The object clouds, `plane_points` and `unclassified` partition the input.
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub objects: Vec<ObjectSegment>,
    pub plane: Option<PlaneModel>,
    pub plane_points: PointCloud,
    pub unclassified: PointCloud,
}

impl Segmentation {
    /// Total number of points across all parts.
    pub fn num_points(&self) -> usize {
        self.objects.iter().map(ObjectSegment::len).sum::<usize>()
            + self.plane_points.len()
            + self.unclassified.len()
    }
}

/// Removes the dominant plane from `cloud`, then clusters what is left into
/// objects.
pub fn segment_obstacles(cloud: &PointCloud, config: &SegmentationConfig) -> Segmentation {
    debug!("segmenting {} points", cloud.len());

    let removal = remove_dominant_plane(cloud, config);
    debug!(
        "plane stage: {} removed, {} remaining",
        removal.removed_count(),
        removal.residual.len()
    );

    let extraction = extract_clusters(&removal.residual, config);
    debug!(
        "cluster stage: {} objects, {} unclassified",
        extraction.objects.len(),
        extraction.unclassified.len()
    );

    Segmentation {
        objects: extraction.objects,
        plane: removal.model,
        plane_points: removal.plane_points,
        unclassified: extraction.unclassified,
    }
}
