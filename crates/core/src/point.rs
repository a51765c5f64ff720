/// Optional per-point attributes carried alongside a coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointData {
    pub color: Option<[u8; 3]>,
    pub intensity: Option<f32>,
}

impl PointData {
    pub fn colored(rgb: [u8; 3]) -> Self {
        Self {
            color: Some(rgb),
            intensity: None,
        }
    }

    pub fn with_intensity(intensity: f32) -> Self {
        Self {
            color: None,
            intensity: Some(intensity),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.color.is_none() && self.intensity.is_none()
    }
}

/// Hashable identity of a finite coordinate.
///
/// Two coordinates map to the same key iff they compare equal component-wise,
/// so `-0.0` and `0.0` share a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointKey([u32; 3]);

impl PointKey {
    /// Returns `None` when any component is NaN or infinite.
    pub fn new(point: [f32; 3]) -> Option<Self> {
        if !point.iter().all(|v| v.is_finite()) {
            return None;
        }
        Some(Self(point.map(|v| if v == 0.0 { 0u32 } else { v.to_bits() })))
    }

    pub fn point(&self) -> [f32; 3] {
        self.0.map(f32::from_bits)
    }
}

/// Lexicographic `(x, y, z)` comparison under `f32::total_cmp`, with `-0.0`
/// equal to `0.0` as in [`PointKey`].
pub fn canonical_cmp(a: &[f32; 3], b: &[f32; 3]) -> std::cmp::Ordering {
    // Adding +0.0 maps -0.0 to +0.0 and leaves every other value unchanged
    let cmp = |i: usize| (a[i] + 0.0).total_cmp(&(b[i] + 0.0));
    cmp(0).then_with(|| cmp(1)).then_with(|| cmp(2))
}
