//! Segmentation parameters and their validation.
//!
//! [`SegmentationParams`] is the untrusted record as it arrives from a
//! configuration file; [`SegmentationConfig`] is the validated, immutable set
//! the algorithms run on.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_MIN_POINTS_IN_PLANE: usize = 500;
pub const DEFAULT_MAX_DIST_FROM_PLANE: f32 = 100.0;
pub const DEFAULT_MIN_POINTS_IN_SEGMENT: usize = 10;
pub const DEFAULT_ANGLE_TOLERANCE_DEG: f32 = 30.0;
pub const DEFAULT_CLUSTERING_RADIUS: f32 = 1.0;
pub const DEFAULT_CLUSTERING_STRICTNESS: f32 = 5.0;
pub const DEFAULT_RANSAC_ITERATIONS: usize = 2000;
pub const DEFAULT_RANSAC_SEED: u64 = 0x5EED;
pub const DEFAULT_NORMAL_NEIGHBORS: usize = 10;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("segmentation parameters cannot be nil")]
    MissingParameters,
    #[error("invalid {field}: expected {expected}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Raw segmentation parameters. Every field is optional; absent fields take
/// their defaults during validation.
///
/// Counts are signed so that negative input reaches validation instead of
/// failing deserialization with an unhelpful message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationParams {
    /// Minimum number of points for a plane to be accepted and removed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_points_in_plane: Option<i64>,

    /// Maximum perpendicular distance from the plane, in cloud units.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_dist_from_plane_mm: Option<f64>,

    /// Minimum cluster size reported as an object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_points_in_segment: Option<i64>,

    /// Maximum angle in degrees between a point's local normal and the plane
    /// normal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ground_angle_tolerance_degs: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub clustering_radius: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub clustering_strictness: Option<f64>,

    /// Expected orientation of the plane to remove, e.g. `[0, 0, 1]` for the
    /// floor of an upright camera.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ground_plane_normal_vec: Option<[f64; 3]>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ransac_iterations: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ransac_seed: Option<u64>,

    /// Neighbourhood size for local normal estimation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normal_neighbors: Option<i64>,
}

/// Validated segmentation parameters.
///
/// Build one with [`SegmentationConfig::from_params`] for untrusted input.
/// Fields are public so that callers can derive variants with struct update
/// syntax from [`SegmentationConfig::default`].
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationConfig {
    pub min_pts_in_plane: usize,
    pub max_dist_from_plane: f32,
    pub min_pts_in_segment: usize,
    pub angle_tolerance_deg: f32,
    pub clustering_radius: f32,
    pub clustering_strictness: f32,
    /// Unit normal the removed plane must be aligned with, if any.
    pub ground_normal: Option<[f32; 3]>,
    pub ransac_iterations: usize,
    pub ransac_seed: u64,
    pub normal_neighbors: usize,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            min_pts_in_plane: DEFAULT_MIN_POINTS_IN_PLANE,
            max_dist_from_plane: DEFAULT_MAX_DIST_FROM_PLANE,
            min_pts_in_segment: DEFAULT_MIN_POINTS_IN_SEGMENT,
            angle_tolerance_deg: DEFAULT_ANGLE_TOLERANCE_DEG,
            clustering_radius: DEFAULT_CLUSTERING_RADIUS,
            clustering_strictness: DEFAULT_CLUSTERING_STRICTNESS,
            ground_normal: None,
            ransac_iterations: DEFAULT_RANSAC_ITERATIONS,
            ransac_seed: DEFAULT_RANSAC_SEED,
            normal_neighbors: DEFAULT_NORMAL_NEIGHBORS,
        }
    }
}

impl SegmentationConfig {
    /// Validate a raw parameter record.
    ///
    /// Fails with [`ConfigError::MissingParameters`] when no record is given
    /// and with [`ConfigError::OutOfRange`] naming the first offending field.
    pub fn from_params(params: Option<&SegmentationParams>) -> Result<Self, ConfigError> {
        let params = params.ok_or(ConfigError::MissingParameters)?;
        let defaults = Self::default();

        let min_pts_in_plane = positive_count(
            "min_points_in_plane",
            params.min_points_in_plane,
            defaults.min_pts_in_plane,
        )?;
        let max_dist_from_plane = bounded_float(
            "max_dist_from_plane_mm",
            params.max_dist_from_plane_mm,
            defaults.max_dist_from_plane,
            |v| v >= 0.0,
            "a finite value >= 0",
        )?;
        let min_pts_in_segment = positive_count(
            "min_points_in_segment",
            params.min_points_in_segment,
            defaults.min_pts_in_segment,
        )?;
        let angle_tolerance_deg = bounded_float(
            "ground_angle_tolerance_degs",
            params.ground_angle_tolerance_degs,
            defaults.angle_tolerance_deg,
            |v| (0.0..=180.0).contains(&v),
            "an angle in [0, 180] degrees",
        )?;
        let clustering_radius = bounded_float(
            "clustering_radius",
            params.clustering_radius,
            defaults.clustering_radius,
            |v| v > 0.0,
            "a finite value > 0",
        )?;
        let clustering_strictness = bounded_float(
            "clustering_strictness",
            params.clustering_strictness,
            defaults.clustering_strictness,
            |v| v > 0.0,
            "a finite value > 0",
        )?;
        if !(clustering_radius * (1.0 + 1.0 / clustering_strictness)).is_finite() {
            let (field, value) = if (1.0 + 1.0 / clustering_strictness).is_finite() {
                ("clustering_radius", clustering_radius)
            } else {
                ("clustering_strictness", clustering_strictness)
            };
            return Err(ConfigError::OutOfRange {
                field,
                value: value.to_string(),
                expected: "a value keeping the effective clustering radius finite",
            });
        }
        let ground_normal = params
            .ground_plane_normal_vec
            .map(unit_normal)
            .transpose()?;
        let ransac_iterations = positive_count(
            "ransac_iterations",
            params.ransac_iterations,
            defaults.ransac_iterations,
        )?;
        let normal_neighbors = match params.normal_neighbors {
            None => defaults.normal_neighbors,
            Some(v) if v >= 3 => v as usize,
            Some(v) => {
                return Err(ConfigError::OutOfRange {
                    field: "normal_neighbors",
                    value: v.to_string(),
                    expected: "an integer >= 3",
                })
            }
        };

        Ok(Self {
            min_pts_in_plane,
            max_dist_from_plane,
            min_pts_in_segment,
            angle_tolerance_deg,
            clustering_radius,
            clustering_strictness,
            ground_normal,
            ransac_iterations,
            ransac_seed: params.ransac_seed.unwrap_or(defaults.ransac_seed),
            normal_neighbors,
        })
    }

    /// Adjacency radius used by clustering:
    /// `clustering_radius * (1 + 1 / clustering_strictness)`.
    ///
    /// Raising the strictness narrows the radius toward `clustering_radius`.
    pub fn effective_clustering_radius(&self) -> f32 {
        self.clustering_radius * (1.0 + 1.0 / self.clustering_strictness)
    }
}

fn positive_count(
    field: &'static str,
    value: Option<i64>,
    default: usize,
) -> Result<usize, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) if v > 0 => usize::try_from(v).map_err(|_| ConfigError::OutOfRange {
            field,
            value: v.to_string(),
            expected: "an integer that fits in usize",
        }),
        Some(v) => Err(ConfigError::OutOfRange {
            field,
            value: v.to_string(),
            expected: "an integer > 0",
        }),
    }
}

fn bounded_float(
    field: &'static str,
    value: Option<f64>,
    default: f32,
    in_range: impl Fn(f64) -> bool,
    expected: &'static str,
) -> Result<f32, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) if v.is_finite() && v <= f32::MAX as f64 && in_range(v) => Ok(v as f32),
        Some(v) => Err(ConfigError::OutOfRange {
            field,
            value: v.to_string(),
            expected,
        }),
    }
}

fn unit_normal(v: [f64; 3]) -> Result<[f32; 3], ConfigError> {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if !len.is_finite() || len < 1e-9 {
        return Err(ConfigError::OutOfRange {
            field: "ground_plane_normal_vec",
            value: format!("{:?}", v),
            expected: "a finite non-zero vector",
        });
    }
    Ok(v.map(|c| (c / len) as f32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn valid_params() -> SegmentationParams {
        SegmentationParams {
            min_points_in_plane: Some(100),
            max_dist_from_plane_mm: Some(10.0),
            min_points_in_segment: Some(3),
            ground_angle_tolerance_degs: Some(20.0),
            clustering_radius: Some(1.0),
            clustering_strictness: Some(3.0),
            ..Default::default()
        }
    }

    fn out_of_range_field(err: ConfigError) -> &'static str {
        match err {
            ConfigError::OutOfRange { field, .. } => field,
            other => panic!("expected OutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn missing_record_is_rejected() {
        let err = SegmentationConfig::from_params(None).unwrap_err();
        assert_eq!(err, ConfigError::MissingParameters);
        assert!(err.to_string().contains("cannot be nil"));
    }

    #[test]
    fn empty_record_takes_defaults() {
        let config = SegmentationConfig::from_params(Some(&SegmentationParams::default())).unwrap();
        assert_eq!(config, SegmentationConfig::default());
        assert_eq!(config.min_pts_in_plane, 500);
        assert_eq!(config.max_dist_from_plane, 100.0);
        assert_eq!(config.min_pts_in_segment, 10);
        assert_eq!(config.angle_tolerance_deg, 30.0);
        assert_eq!(config.clustering_radius, 1.0);
        assert_eq!(config.clustering_strictness, 5.0);
        assert!(config.ground_normal.is_none());
    }

    #[test]
    fn valid_record_is_carried_over() {
        let config = SegmentationConfig::from_params(Some(&valid_params())).unwrap();
        assert_eq!(config.min_pts_in_plane, 100);
        assert_eq!(config.max_dist_from_plane, 10.0);
        assert_eq!(config.min_pts_in_segment, 3);
        assert_eq!(config.angle_tolerance_deg, 20.0);
        assert_eq!(config.clustering_radius, 1.0);
        assert_eq!(config.clustering_strictness, 3.0);
    }

    #[test]
    fn validation_is_idempotent() {
        let params = valid_params();
        let a = SegmentationConfig::from_params(Some(&params)).unwrap();
        let b = SegmentationConfig::from_params(Some(&params)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn negative_clustering_radius_is_rejected() {
        let params = SegmentationParams {
            clustering_radius: Some(-3.0),
            ..valid_params()
        };
        let err = SegmentationConfig::from_params(Some(&params)).unwrap_err();
        assert!(err.to_string().contains("clustering_radius"));
        assert_eq!(out_of_range_field(err), "clustering_radius");
    }

    #[test]
    fn each_out_of_range_field_is_named() {
        let cases: Vec<(SegmentationParams, &str)> = vec![
            (
                SegmentationParams {
                    min_points_in_plane: Some(0),
                    ..valid_params()
                },
                "min_points_in_plane",
            ),
            (
                SegmentationParams {
                    max_dist_from_plane_mm: Some(-1.0),
                    ..valid_params()
                },
                "max_dist_from_plane_mm",
            ),
            (
                SegmentationParams {
                    max_dist_from_plane_mm: Some(f64::NAN),
                    ..valid_params()
                },
                "max_dist_from_plane_mm",
            ),
            (
                SegmentationParams {
                    min_points_in_segment: Some(-5),
                    ..valid_params()
                },
                "min_points_in_segment",
            ),
            (
                SegmentationParams {
                    ground_angle_tolerance_degs: Some(181.0),
                    ..valid_params()
                },
                "ground_angle_tolerance_degs",
            ),
            (
                SegmentationParams {
                    clustering_strictness: Some(0.0),
                    ..valid_params()
                },
                "clustering_strictness",
            ),
            (
                SegmentationParams {
                    ground_plane_normal_vec: Some([0.0, 0.0, 0.0]),
                    ..valid_params()
                },
                "ground_plane_normal_vec",
            ),
            (
                SegmentationParams {
                    ransac_iterations: Some(0),
                    ..valid_params()
                },
                "ransac_iterations",
            ),
            (
                SegmentationParams {
                    normal_neighbors: Some(2),
                    ..valid_params()
                },
                "normal_neighbors",
            ),
        ];

        for (params, field) in cases {
            let err = SegmentationConfig::from_params(Some(&params)).unwrap_err();
            assert_eq!(out_of_range_field(err), field);
        }
    }

    #[test]
    fn infinite_effective_radius_is_rejected() {
        let params = SegmentationParams {
            clustering_radius: Some(1.0),
            clustering_strictness: Some(1e-39),
            ..Default::default()
        };
        let err = SegmentationConfig::from_params(Some(&params)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::OutOfRange {
                field: "clustering_strictness",
                ..
            }
        ));

        let params = SegmentationParams {
            clustering_radius: Some(3e38),
            clustering_strictness: Some(1.0),
            ..Default::default()
        };
        let err = SegmentationConfig::from_params(Some(&params)).unwrap_err();
        assert!(err.to_string().contains("clustering_radius"), "{}", err);

        let params = SegmentationParams {
            clustering_radius: Some(1e30),
            clustering_strictness: Some(1.0),
            ..Default::default()
        };
        let config = SegmentationConfig::from_params(Some(&params)).unwrap();
        assert!(config.effective_clustering_radius().is_finite());
    }

    #[test]
    fn ground_normal_is_normalized() {
        let params = SegmentationParams {
            ground_plane_normal_vec: Some([0.0, 0.0, 5.0]),
            ..valid_params()
        };
        let config = SegmentationConfig::from_params(Some(&params)).unwrap();
        assert_eq!(config.ground_normal, Some([0.0, 0.0, 1.0]));

        let params = SegmentationParams {
            ground_plane_normal_vec: Some([1.0, 1.0, 0.0]),
            ..valid_params()
        };
        let n = SegmentationConfig::from_params(Some(&params))
            .unwrap()
            .ground_normal
            .unwrap();
        assert_relative_eq!(n[0], std::f32::consts::FRAC_1_SQRT_2, epsilon = 1e-6);
        assert_relative_eq!(n[1], std::f32::consts::FRAC_1_SQRT_2, epsilon = 1e-6);
    }

    #[test]
    fn effective_radius_narrows_with_strictness() {
        let loose = SegmentationConfig {
            clustering_radius: 1.0,
            clustering_strictness: 1.0,
            ..Default::default()
        };
        let strict = SegmentationConfig {
            clustering_strictness: 100.0,
            ..loose.clone()
        };
        assert_relative_eq!(loose.effective_clustering_radius(), 2.0);
        assert_relative_eq!(strict.effective_clustering_radius(), 1.01, epsilon = 1e-6);
    }

    #[test]
    fn deserializes_from_json() {
        let json = r#"{
            "min_points_in_plane": 100,
            "max_dist_from_plane_mm": 10,
            "min_points_in_segment": 3,
            "ground_angle_tolerance_degs": 20,
            "clustering_radius": 1,
            "clustering_strictness": 3
        }"#;
        let params: SegmentationParams = serde_json::from_str(json).unwrap();
        assert_eq!(params, valid_params());

        let partial: SegmentationParams = serde_json::from_str(r#"{"ransac_seed": 7}"#).unwrap();
        let config = SegmentationConfig::from_params(Some(&partial)).unwrap();
        assert_eq!(config.ransac_seed, 7);
        assert_eq!(config.min_pts_in_plane, DEFAULT_MIN_POINTS_IN_PLANE);
    }

    #[test]
    fn serializes_only_present_fields() {
        let params = SegmentationParams {
            clustering_radius: Some(2.5),
            ..Default::default()
        };
        let json = serde_json::to_string(&params).unwrap();
        assert_eq!(json, r#"{"clustering_radius":2.5}"#);
    }
}
