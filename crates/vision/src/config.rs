use obstacles_segmentation::SegmentationParams;
use serde::{Deserialize, Serialize};

/// Attribute record of an obstacle segmenter: the segmentation parameters
/// plus an optional default camera.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObstaclesConfig {
    #[serde(flatten)]
    pub segmentation: SegmentationParams,

    /// Camera used when a call names none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_name: Option<String>,
}
