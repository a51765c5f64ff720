use crate::capability::{Classification, Detection, Properties};
use crate::config::ObstaclesConfig;
use crate::error::{Result, SegmenterError};
use crate::source::{CallContext, Dependencies};
use log::{debug, info};
use obstacles_core::PointCloud;
use obstacles_segmentation::{
    segment_obstacles, ConfigError, ObjectSegment, SegmentationConfig,
};
use std::sync::Arc;

const PROPERTIES: Properties = Properties {
    object_pcds_supported: true,
    detections_supported: false,
    classifications_supported: false,
};

/// Vision service that turns camera frames into obstacle point clouds.
///
/// A segmenter is immutable once registered and can serve concurrent calls.
#[derive(Debug, Clone)]
pub struct ObstacleSegmenter {
    name: String,
    config: Arc<SegmentationConfig>,
    default_camera: Option<String>,
    sources: Dependencies,
}

impl ObstacleSegmenter {
    /// Validates `params` and binds the segmenter to `deps`.
    ///
    /// Fails when `params` is absent or out of range, or when the configured
    /// default camera is not among `deps`.
    pub fn register(
        name: impl Into<String>,
        params: Option<&ObstaclesConfig>,
        deps: &Dependencies,
    ) -> Result<Self> {
        let name = name.into();
        let params = params.ok_or(ConfigError::MissingParameters)?;
        let config = SegmentationConfig::from_params(Some(&params.segmentation))?;

        let default_camera = match params.camera_name.as_deref() {
            None | Some("") => None,
            Some(camera) if deps.contains(camera) => Some(camera.to_string()),
            Some(camera) => return Err(SegmenterError::CameraNotFound(camera.to_string())),
        };

        info!(
            "registered obstacle segmenter {:?} (default camera: {:?}, clustering radius {})",
            name,
            default_camera,
            config.effective_clustering_radius()
        );

        Ok(Self {
            name,
            config: Arc::new(config),
            default_camera,
            sources: deps.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    pub fn default_camera(&self) -> Option<&str> {
        self.default_camera.as_deref()
    }

    pub fn properties(&self) -> Properties {
        PROPERTIES
    }

    /// Acquires a frame from `camera_name` and returns its objects, largest
    /// first. An empty name selects the default camera.
    pub fn object_point_clouds(
        &self,
        camera_name: &str,
        ctx: &CallContext,
    ) -> Result<Vec<ObjectSegment>> {
        let camera = match (camera_name, self.default_camera.as_deref()) {
            ("", Some(default)) => default,
            ("", None) => return Err(SegmenterError::NoCamera),
            (name, _) => name,
        };
        let source = self
            .sources
            .get(camera)
            .ok_or_else(|| SegmenterError::ResourceMissing(camera.to_string()))?;

        ctx.check()?;
        let cloud = source
            .next_point_cloud(ctx)
            .map_err(|source| SegmenterError::Acquisition {
                camera: camera.to_string(),
                source,
            })?;
        ctx.check()?;

        debug!("{}: {} points from {:?}", self.name, cloud.len(), camera);
        Ok(self.segment_cloud(&cloud))
    }

    /// Runs segmentation on an already acquired cloud.
    pub fn segment_cloud(&self, cloud: &PointCloud) -> Vec<ObjectSegment> {
        segment_obstacles(cloud, &self.config).objects
    }

    pub fn detections_from_camera(
        &self,
        _camera_name: &str,
        _ctx: &CallContext,
    ) -> Result<Vec<Detection>> {
        Err(SegmenterError::Unsupported {
            capability: "detections",
        })
    }

    pub fn classifications_from_camera(
        &self,
        _camera_name: &str,
        _n: usize,
        _ctx: &CallContext,
    ) -> Result<Vec<Classification>> {
        Err(SegmenterError::Unsupported {
            capability: "classifications",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{from_fn, StaticSource};
    use obstacles_segmentation::SegmentationParams;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn params(camera: Option<&str>) -> ObstaclesConfig {
        ObstaclesConfig {
            segmentation: SegmentationParams {
                min_points_in_plane: Some(100),
                max_dist_from_plane_mm: Some(10.0),
                min_points_in_segment: Some(3),
                ground_angle_tolerance_degs: Some(20.0),
                clustering_radius: Some(1.0),
                clustering_strictness: Some(3.0),
                ..Default::default()
            },
            camera_name: camera.map(str::to_string),
        }
    }

    fn two_columns() -> PointCloud {
        let mut cloud = PointCloud::new();
        for z in [1.0, 2.0, 3.0, 4.0] {
            cloud.insert([1.0, 1.0, z]).unwrap();
        }
        for z in [101.0, 102.0, 103.0, 104.0] {
            cloud.insert([2.0, 2.0, z]).unwrap();
        }
        cloud
    }

    fn deps() -> Dependencies {
        Dependencies::new().with("cam", StaticSource::new(two_columns()))
    }

    #[test]
    fn register_requires_parameters() {
        let err = ObstacleSegmenter::register("seg", None, &deps()).unwrap_err();
        assert!(matches!(err, SegmenterError::Config(ConfigError::MissingParameters)));
        assert!(err.to_string().contains("cannot be nil"));
    }

    #[test]
    fn register_rejects_out_of_range_values() {
        let mut p = params(None);
        p.segmentation.clustering_radius = Some(-3.0);
        let err = ObstacleSegmenter::register("seg", Some(&p), &deps()).unwrap_err();
        assert!(err.to_string().contains("clustering_radius"), "{}", err);
    }

    #[test]
    fn register_checks_default_camera() {
        let seg = ObstacleSegmenter::register("seg", Some(&params(Some("cam"))), &deps()).unwrap();
        assert_eq!(seg.name(), "seg");
        assert_eq!(seg.default_camera(), Some("cam"));
        assert_eq!(seg.config().clustering_strictness, 3.0);

        let err = ObstacleSegmenter::register("seg", Some(&params(Some("not-camera"))), &deps())
            .unwrap_err();
        assert!(err
            .to_string()
            .contains("could not find camera \"not-camera\""));
    }

    #[test]
    fn properties_are_fixed() {
        let seg = ObstacleSegmenter::register("seg", Some(&params(None)), &deps()).unwrap();
        let props = seg.properties();
        assert!(props.object_pcds_supported);
        assert!(!props.detections_supported);
        assert!(!props.classifications_supported);
    }

    #[test]
    fn empty_camera_name_uses_default() {
        let ctx = CallContext::new();
        let seg = ObstacleSegmenter::register("seg", Some(&params(Some("cam"))), &deps()).unwrap();
        assert_eq!(seg.object_point_clouds("", &ctx).unwrap().len(), 2);

        let seg = ObstacleSegmenter::register("seg", Some(&params(None)), &deps()).unwrap();
        assert!(matches!(
            seg.object_point_clouds("", &ctx),
            Err(SegmenterError::NoCamera)
        ));
        assert_eq!(seg.object_point_clouds("cam", &ctx).unwrap().len(), 2);
    }

    #[test]
    fn unknown_camera_is_a_lookup_error() {
        let seg = ObstacleSegmenter::register("seg", Some(&params(None)), &deps()).unwrap();
        let err = seg
            .object_point_clouds("no_camera", &CallContext::new())
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Resource missing from dependencies"), "{}", msg);
        assert!(msg.contains("no_camera"), "{}", msg);
    }

    #[test]
    fn cancelled_call_never_acquires() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let deps = Dependencies::new().with(
            "cam",
            from_fn(move |_ctx: &CallContext| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(two_columns())
            }),
        );
        let seg = ObstacleSegmenter::register("seg", Some(&params(None)), &deps).unwrap();

        let ctx = CallContext::new();
        ctx.cancel();
        assert!(matches!(
            seg.object_point_clouds("cam", &ctx),
            Err(SegmenterError::Cancelled)
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cancellation_during_acquisition_is_honored() {
        let deps = Dependencies::new().with(
            "cam",
            from_fn(|ctx: &CallContext| {
                ctx.cancel();
                Ok(two_columns())
            }),
        );
        let seg = ObstacleSegmenter::register("seg", Some(&params(None)), &deps).unwrap();
        assert!(matches!(
            seg.object_point_clouds("cam", &CallContext::new()),
            Err(SegmenterError::Cancelled)
        ));
    }

    #[test]
    fn unsupported_capabilities() {
        let seg = ObstacleSegmenter::register("seg", Some(&params(None)), &deps()).unwrap();
        let ctx = CallContext::new();
        let err = seg.detections_from_camera("cam", &ctx).unwrap_err();
        assert!(err.to_string().contains("does not implement"));
        let err = seg.classifications_from_camera("cam", 5, &ctx).unwrap_err();
        assert!(matches!(
            err,
            SegmenterError::Unsupported {
                capability: "classifications"
            }
        ));
    }

    #[test]
    fn segmenter_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ObstacleSegmenter>();
    }
}
