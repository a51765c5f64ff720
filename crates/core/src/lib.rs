#![forbid(unsafe_code)]

pub mod bbox;
pub mod cloud;
pub mod error;
pub mod point;

pub use bbox::Aabb;
pub use cloud::PointCloud;
pub use error::CloudError;
pub use point::{canonical_cmp, PointData, PointKey};
