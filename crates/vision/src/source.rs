use crate::error::{BoxError, SegmenterError};
use obstacles_core::PointCloud;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-call cancellation state.
///
/// Clones share the cancellation flag, so a clone kept by the caller can
/// cancel a call running on another thread.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancelled: Arc::default(),
            deadline: Some(deadline),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fails if the call was cancelled or its deadline has passed.
    pub fn check(&self) -> Result<(), SegmenterError> {
        if self.is_cancelled() {
            return Err(SegmenterError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(SegmenterError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

/// Something that produces point cloud frames, typically a depth camera.
///
/// Implementations that block should give up when `ctx` is cancelled.
pub trait PointCloudSource: Send + Sync {
    fn next_point_cloud(&self, ctx: &CallContext) -> Result<PointCloud, BoxError>;
}

/// Source serving clones of a fixed cloud.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    cloud: PointCloud,
}

impl StaticSource {
    pub fn new(cloud: PointCloud) -> Self {
        Self { cloud }
    }
}

impl PointCloudSource for StaticSource {
    fn next_point_cloud(&self, _ctx: &CallContext) -> Result<PointCloud, BoxError> {
        Ok(self.cloud.clone())
    }
}

/// Source backed by a closure. See [`from_fn`].
#[derive(Clone)]
pub struct FnSource<F> {
    f: F,
}

impl<F> PointCloudSource for FnSource<F>
where
    F: Fn(&CallContext) -> Result<PointCloud, BoxError> + Send + Sync,
{
    fn next_point_cloud(&self, ctx: &CallContext) -> Result<PointCloud, BoxError> {
        (self.f)(ctx)
    }
}

impl<F> fmt::Debug for FnSource<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSource").finish_non_exhaustive()
    }
}

/// Wraps a closure as a [`PointCloudSource`].
pub fn from_fn<F>(f: F) -> FnSource<F>
where
    F: Fn(&CallContext) -> Result<PointCloud, BoxError> + Send + Sync,
{
    FnSource { f }
}

/// Named point cloud sources available to a segmenter.
#[derive(Clone, Default)]
pub struct Dependencies {
    sources: BTreeMap<String, Arc<dyn PointCloudSource>>,
}

impl Dependencies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `source` under `name`, replacing any previous source.
    pub fn insert<S>(&mut self, name: impl Into<String>, source: S)
    where
        S: PointCloudSource + 'static,
    {
        self.insert_shared(name, Arc::new(source));
    }

    pub fn insert_shared(&mut self, name: impl Into<String>, source: Arc<dyn PointCloudSource>) {
        self.sources.insert(name.into(), source);
    }

    pub fn with<S>(mut self, name: impl Into<String>, source: S) -> Self
    where
        S: PointCloudSource + 'static,
    {
        self.insert(name, source);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn PointCloudSource>> {
        self.sources.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    /// Source names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}
