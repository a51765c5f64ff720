#![forbid(unsafe_code)]

pub mod capability;
pub mod config;
pub mod error;
pub mod segmenter;
pub mod source;

pub use capability::{Classification, Detection, Properties};
pub use config::ObstaclesConfig;
pub use error::{BoxError, Result, SegmenterError};
pub use segmenter::ObstacleSegmenter;
pub use source::{from_fn, CallContext, Dependencies, FnSource, PointCloudSource, StaticSource};
