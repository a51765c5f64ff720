use hashbrown::HashMap;

use crate::point::canonical_cmp;
use crate::{Aabb, CloudError, PointData, PointKey};

/// An unordered set of unique 3-D points with optional per-point data.
///
/// Storage is structure-of-arrays in insertion order, plus a hash index from
/// coordinate to slot. Points cannot be moved or removed once inserted; only
/// the data attached to a coordinate can be replaced through [`set`].
///
/// Equality is set equality: two clouds are equal when they hold the same
/// coordinates with the same data, whatever the insertion order.
///
/// [`set`]: PointCloud::set
#[derive(Debug, Clone)]
pub struct PointCloud {
    x: Vec<f32>,
    y: Vec<f32>,
    z: Vec<f32>,
    data: Vec<PointData>,
    index: HashMap<PointKey, usize>,
}

impl PointCloud {
    pub fn new() -> Self {
        Self {
            x: Vec::new(),
            y: Vec::new(),
            z: Vec::new(),
            data: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            x: Vec::with_capacity(capacity),
            y: Vec::with_capacity(capacity),
            z: Vec::with_capacity(capacity),
            data: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Builds a cloud from separate coordinate columns.
    ///
    /// Repeated coordinates collapse into one point.
    ///
    /// # Panics
    ///
    /// Panics if the columns differ in length.
    pub fn from_xyz(x: Vec<f32>, y: Vec<f32>, z: Vec<f32>) -> Result<Self, CloudError> {
        assert_eq!(x.len(), y.len(), "x and y must have same length");
        assert_eq!(x.len(), z.len(), "x and z must have same length");

        let mut cloud = Self::with_capacity(x.len());
        for ((px, py), pz) in x.into_iter().zip(y).zip(z) {
            cloud.insert([px, py, pz])?;
        }
        Ok(cloud)
    }

    pub fn from_points<I>(points: I) -> Result<Self, CloudError>
    where
        I: IntoIterator<Item = [f32; 3]>,
    {
        let iter = points.into_iter();
        let mut cloud = Self::with_capacity(iter.size_hint().0);
        for p in iter {
            cloud.insert(p)?;
        }
        Ok(cloud)
    }

    /// Inserts `point` with `data`, replacing the data if the coordinate is
    /// already present. Returns `true` when the point is new.
    pub fn set(&mut self, point: [f32; 3], data: PointData) -> Result<bool, CloudError> {
        let key = PointKey::new(point).ok_or(CloudError::NonFinite { point })?;
        if let Some(&slot) = self.index.get(&key) {
            self.data[slot] = data;
            return Ok(false);
        }
        self.push(key, point, data);
        Ok(true)
    }

    /// Inserts `point` with empty data. An existing coordinate keeps its data.
    /// Returns `true` when the point is new.
    pub fn insert(&mut self, point: [f32; 3]) -> Result<bool, CloudError> {
        let key = PointKey::new(point).ok_or(CloudError::NonFinite { point })?;
        if self.index.contains_key(&key) {
            return Ok(false);
        }
        self.push(key, point, PointData::default());
        Ok(true)
    }

    fn push(&mut self, key: PointKey, point: [f32; 3], data: PointData) {
        let point = point.map(|v| v + 0.0);
        self.index.insert(key, self.x.len());
        self.x.push(point[0]);
        self.y.push(point[1]);
        self.z.push(point[2]);
        self.data.push(data);
    }

    pub fn get(&self, point: &[f32; 3]) -> Option<&PointData> {
        self.index_of(point).map(|slot| &self.data[slot])
    }

    pub fn contains(&self, point: &[f32; 3]) -> bool {
        self.index_of(point).is_some()
    }

    pub fn index_of(&self, point: &[f32; 3]) -> Option<usize> {
        PointKey::new(*point).and_then(|key| self.index.get(&key).copied())
    }

    pub fn len(&self) -> usize {
        debug_assert_eq!(self.x.len(), self.y.len());
        debug_assert_eq!(self.x.len(), self.z.len());
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::from_points(self.iter_points())
    }

    /// Mean position of all points, or `None` for an empty cloud.
    pub fn centroid(&self) -> Option<[f32; 3]> {
        if self.is_empty() {
            return None;
        }
        // f64 accumulation keeps large clouds far from the origin stable
        let mut sum = [0.0f64; 3];
        for p in self.iter_points() {
            for axis in 0..3 {
                sum[axis] += p[axis] as f64;
            }
        }
        let n = self.len() as f64;
        Some(sum.map(|s| (s / n) as f32))
    }

    pub fn point(&self, i: usize) -> [f32; 3] {
        [self.x[i], self.y[i], self.z[i]]
    }

    pub fn data(&self, i: usize) -> &PointData {
        &self.data[i]
    }

    pub fn iter_points(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        self.x
            .iter()
            .zip(&self.y)
            .zip(&self.z)
            .map(|((x, y), z)| [*x, *y, *z])
    }

    pub fn iter(&self) -> impl Iterator<Item = ([f32; 3], &PointData)> + '_ {
        self.iter_points().zip(&self.data)
    }

    /// Copies the coordinates into a contiguous array.
    pub fn to_points(&self) -> Vec<[f32; 3]> {
        self.iter_points().collect()
    }

    /// Slot indices sorted by lexicographic `(x, y, z)` coordinate order.
    ///
    /// The result depends only on the set of points, never on insertion
    /// order, which makes it the reference order for tie-breaking.
    pub fn canonical_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_unstable_by(|&a, &b| canonical_cmp(&self.point(a), &self.point(b)));
        order
    }

    /// Builds a new cloud from the points at `indices`, keeping their data.
    ///
    /// Repeated indices select the point once.
    ///
    /// # Panics
    ///
    /// Panics if any index in `indices` is out of bounds.
    pub fn select(&self, indices: &[usize]) -> Self {
        let mut out = Self::with_capacity(indices.len());
        for &idx in indices {
            assert!(idx < self.len(), "index out of bounds in select");
            let point = self.point(idx);
            // Coordinates in `self` are finite, so a key always exists.
            if let Some(key) = PointKey::new(point) {
                if !out.index.contains_key(&key) {
                    out.push(key, point, self.data[idx]);
                }
            }
        }
        out
    }

    /// Select all points NOT in the given index set.
    ///
    /// This is the complement of [`select`]: if `select` returns points at
    /// the given indices, `select_inverse` returns all the rest.
    ///
    /// The returned cloud preserves the relative order of the retained points.
    ///
    /// # Panics
    ///
    /// Panics if any index in `indices` is out of bounds.
    ///
    /// [`select`]: PointCloud::select
    pub fn select_inverse(&self, indices: &[usize]) -> Self {
        let n = self.len();
        let mut exclude = vec![false; n];
        for &idx in indices {
            assert!(idx < n, "index out of bounds in select_inverse");
            exclude[idx] = true;
        }

        let kept: Vec<usize> = (0..n).filter(|&i| !exclude[i]).collect();
        self.select(&kept)
    }
}

impl Default for PointCloud {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for PointCloud {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(p, data)| other.get(&p).is_some_and(|d| d == data))
    }
}
