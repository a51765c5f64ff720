use obstacles_segmentation::ConfigError;
use thiserror::Error;

/// Boxed error returned by point cloud sources.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum SegmenterError {
    #[error("invalid segmenter configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("could not find camera \"{0}\"")]
    CameraNotFound(String),

    #[error("Resource missing from dependencies. Resource: camera/{0}")]
    ResourceMissing(String),

    #[error("no camera name given and no default camera configured")]
    NoCamera,

    #[error("failed to acquire point cloud from camera \"{camera}\": {source}")]
    Acquisition {
        camera: String,
        #[source]
        source: BoxError,
    },

    #[error("obstacle segmenter does not implement {capability}")]
    Unsupported { capability: &'static str },

    #[error("call was cancelled")]
    Cancelled,

    #[error("call deadline exceeded")]
    DeadlineExceeded,
}

pub type Result<T> = std::result::Result<T, SegmenterError>;
