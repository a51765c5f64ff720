//! Obstacle segmentation for single point cloud frames.
//!
//! The pipeline removes the dominant plane (floor, wall) with RANSAC, then
//! groups the remaining points into objects by radius clustering.

#![forbid(unsafe_code)]

pub mod config;
pub mod pipeline;
pub mod plane;
pub mod radius_cluster;
pub mod segment;

pub use config::{ConfigError, SegmentationConfig, SegmentationParams};
pub use pipeline::{segment_obstacles, Segmentation};
pub use plane::{remove_dominant_plane, PlaneModel, PlaneRemoval};
pub use radius_cluster::{extract_clusters, radius_cluster, ClusterExtraction};
pub use segment::ObjectSegment;
