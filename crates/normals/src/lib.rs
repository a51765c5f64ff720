#![forbid(unsafe_code)]

pub mod estimate;

pub use estimate::{estimate_normals, estimate_normals_for_points, Normals, MIN_SURFACE_NEIGHBORS};
