use hashbrown::HashMap;

type CellKey = (i64, i64, i64);

const NEIGHBOR_OFFSETS: [CellKey; 27] = {
    let mut offsets = [(0, 0, 0); 27];
    let mut i = 0;
    while i < 27 {
        offsets[i] = ((i / 9) as i64 - 1, ((i / 3) % 3) as i64 - 1, (i % 3) as i64 - 1);
        i += 1;
    }
    offsets
};

/// Uniform hash grid for fixed-radius neighbour queries.
///
/// Points are binned into cubic cells of side `cell_size`. With
/// `cell_size >= radius`, every point within `radius` of a query lies in the
/// query's cell or one of its 26 neighbours, so a radius query only has to
/// scan 27 cells. Only occupied cells are stored.
#[derive(Debug, Clone)]
pub struct NeighborGrid {
    cell_size: f32,
    cells: HashMap<CellKey, Vec<u32>>,
}

impl NeighborGrid {
    /// # Panics
    ///
    /// Panics if `cell_size` is not finite and positive.
    pub fn build(points: &[[f32; 3]], cell_size: f32) -> Self {
        assert!(
            cell_size.is_finite() && cell_size > 0.0,
            "cell_size must be > 0 and finite"
        );

        let mut cells: HashMap<CellKey, Vec<u32>> = HashMap::new();
        for (i, p) in points.iter().enumerate() {
            cells
                .entry(cell_key(p, cell_size))
                .or_default()
                .push(i as u32);
        }

        Self { cell_size, cells }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    /// Indices of every point in the 3x3x3 block of cells around `query`.
    ///
    /// This is a superset of the points within `cell_size` of `query`; callers
    /// filter by exact distance.
    pub fn candidates<'a>(&'a self, query: &[f32; 3]) -> impl Iterator<Item = usize> + 'a {
        let (cx, cy, cz) = cell_key(query, self.cell_size);
        NEIGHBOR_OFFSETS
            .iter()
            .filter_map(move |&(dx, dy, dz)| {
                self.cells.get(&(
                    cx.saturating_add(dx),
                    cy.saturating_add(dy),
                    cz.saturating_add(dz),
                ))
            })
            .flatten()
            .map(|&i| i as usize)
    }

    /// Indices of the points within `radius` (inclusive) of `query`, sorted
    /// ascending.
    ///
    /// # Panics
    ///
    /// Panics if `radius` exceeds the cell size, since neighbours could then
    /// lie outside the scanned cells.
    pub fn radius_search(&self, points: &[[f32; 3]], query: &[f32; 3], radius: f32) -> Vec<usize> {
        assert!(
            radius <= self.cell_size,
            "radius must not exceed the grid cell size"
        );
        let r2 = radius * radius;
        let mut out: Vec<usize> = self
            .candidates(query)
            .filter(|&j| squared_distance(&points[j], query) <= r2)
            .collect();
        out.sort_unstable();
        out
    }
}

#[inline]
fn cell_key(p: &[f32; 3], cell_size: f32) -> CellKey {
    (
        (p[0] / cell_size).floor() as i64,
        (p[1] / cell_size).floor() as i64,
        (p[2] / cell_size).floor() as i64,
    )
}

#[inline]
pub fn squared_distance(a: &[f32; 3], b: &[f32; 3]) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    dx * dx + dy * dy + dz * dz
}
