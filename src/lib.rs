//! Obstacle detection on depth camera point clouds.
//!
//! Re-exports the workspace crates so applications can depend on a single
//! package: point cloud storage, spatial indexes, normal estimation, the
//! plane-removal and clustering pipeline, and the segmenter service.

#![forbid(unsafe_code)]

pub use obstacles_core::{canonical_cmp, Aabb, CloudError, PointCloud, PointData};
pub use obstacles_normals::{estimate_normals, Normals};
pub use obstacles_segmentation::{
    extract_clusters, radius_cluster, remove_dominant_plane, segment_obstacles, ConfigError,
    ObjectSegment, PlaneModel, PlaneRemoval, Segmentation, SegmentationConfig,
    SegmentationParams,
};
pub use obstacles_spatial::{KdTree, NeighborGrid};
pub use obstacles_vision::{
    from_fn, CallContext, Dependencies, ObstacleSegmenter, ObstaclesConfig, PointCloudSource,
    SegmenterError, StaticSource,
};
