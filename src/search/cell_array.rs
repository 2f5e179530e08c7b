use super::BoundingBox;
use crate::base::{Metrics, BOUNDING_BOX_INFLATION};
use crate::StrError;

/// Implements a cell array (bucket grid) for radius queries over a point set
///
/// The bounding box of the points is partitioned into `nx × ny × nz` cells such that each cell
/// holds approximately one point. The points are sorted by cell index (counting sort) and
/// stored in that order; thus, all records in a row of cells along x are contiguous.
///
/// The records are identified by the index of the point in the input slice. The cell array
/// owns a copy of the coordinates; it is immutable after [CellArray::build] and can be
/// queried concurrently. A new point set requires a new build.
///
/// # Layout
///
/// ```text
/// cell index = cx + nx · (cy + ny · cz)
///
/// records of cell c: ids[first[c]..first[c+1]]
///
/// first.len() = nx · ny · nz + 1   (the last entry is a sentinel)
/// ```
#[derive(Clone, Debug)]
pub struct CellArray {
    /// Space dimension
    ndim: usize,

    /// Lower corner of the (inflated) bounding box
    xmin: [f64; 3],

    /// Number of cells along each axis (1 for unused or collapsed axes)
    ncell: [usize; 3],

    /// Inverse of the cell size along each axis (0 for collapsed axes)
    inv_size: [f64; 3],

    /// Offsets of the first record of each cell (plus the sentinel)
    first: Vec<usize>,

    /// Record ids sorted by cell
    ids: Vec<usize>,

    /// Record coordinates sorted by cell
    ///
    /// (npoint * ndim)
    coords: Vec<f64>,

    /// Maps the id to the position in the sorted arrays
    slot: Vec<usize>,
}

impl CellArray {
    /// Builds a new cell array
    ///
    /// # Input
    ///
    /// * `ndim` -- space dimension (1, 2, or 3)
    /// * `points` -- the coordinates; each entry must have at least `ndim` components
    ///
    /// **Note:** An empty point set yields an empty cell array (queries return nothing).
    pub fn build(ndim: usize, points: &[Vec<f64>]) -> Result<Self, StrError> {
        if ndim < 1 || ndim > 3 {
            return Err("ndim must be 1, 2, or 3");
        }
        if points.iter().any(|x| x.len() < ndim) {
            return Err("all points must have at least ndim coordinates");
        }
        if points.iter().any(|x| x[..ndim].iter().any(|v| !v.is_finite())) {
            return Err("all coordinates must be finite");
        }

        // bounding box and number of cells
        let npoint = points.len();
        let mut xmin = [0.0; 3];
        let mut ncell = [1; 3];
        let mut inv_size = [0.0; 3];
        if let Some(mut bbox) = BoundingBox::from_points(ndim, points) {
            bbox.inflate(BOUNDING_BOX_INFLATION);
            let extents: Vec<_> = (0..ndim).map(|k| bbox.extent(k)).collect();
            let counts = cell_counts(&extents, npoint);
            for k in 0..ndim {
                xmin[k] = bbox.xmin[k];
                ncell[k] = counts[k];
                if extents[k] > 0.0 {
                    inv_size[k] = (counts[k] as f64) / extents[k];
                }
            }
        }

        // allocate the cell array
        let ncell_total = ncell[0] * ncell[1] * ncell[2];
        let mut cell_array = CellArray {
            ndim,
            xmin,
            ncell,
            inv_size,
            first: vec![0; ncell_total + 1],
            ids: vec![0; npoint],
            coords: vec![0.0; npoint * ndim],
            slot: vec![0; npoint],
        };

        // counting sort: number of records per cell
        let cell_of: Vec<_> = points.iter().map(|x| cell_array.cell_index(x)).collect();
        for c in &cell_of {
            cell_array.first[c + 1] += 1;
        }

        // counting sort: prefix sum
        for c in 0..ncell_total {
            cell_array.first[c + 1] += cell_array.first[c];
        }

        // counting sort: scatter
        let mut cursor = cell_array.first.clone();
        for (id, c) in cell_of.iter().enumerate() {
            let s = cursor[*c];
            cursor[*c] += 1;
            cell_array.ids[s] = id;
            cell_array.slot[id] = s;
            cell_array.coords[s * ndim..(s + 1) * ndim].copy_from_slice(&points[id][..ndim]);
        }
        Ok(cell_array)
    }

    /// Returns the space dimension
    #[inline]
    pub fn ndim(&self) -> usize {
        self.ndim
    }

    /// Returns the number of records (points)
    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if there are no records
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns the number of cells along each axis
    pub fn ncell(&self) -> [usize; 3] {
        self.ncell
    }

    /// Returns the number of records in each cell
    pub fn cell_sizes(&self) -> Vec<usize> {
        self.first.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Returns the position of a record
    ///
    /// # Panics
    ///
    /// A panic occurs if `id` is out of range.
    #[inline]
    pub fn position(&self, id: usize) -> &[f64] {
        let s = self.slot[id];
        &self.coords[s * self.ndim..(s + 1) * self.ndim]
    }

    /// Returns the ids of the records within a distance `radius` of `x`
    ///
    /// The comparison is inclusive (`dist ≤ radius`). The order of the results is unspecified.
    ///
    /// # Panics
    ///
    /// A panic occurs if `x` has fewer than `ndim` components.
    pub fn query(&self, x: &[f64], radius: f64) -> Vec<usize> {
        let mut results = Vec::new();
        self.query_into(x, radius, &mut results);
        results
    }

    /// Finds the records within a distance `radius` of `x` and writes their ids to `results`
    ///
    /// The `results` vector is cleared first. Returns the number of candidate records
    /// examined before the exact distance filter.
    ///
    /// # Panics
    ///
    /// A panic occurs if `x` has fewer than `ndim` components.
    pub fn query_into(&self, x: &[f64], radius: f64, results: &mut Vec<usize>) -> usize {
        results.clear();
        if self.is_empty() || radius < 0.0 {
            return 0;
        }

        // range of cells covering the bounding cube of the ball
        let mut lo = [0; 3];
        let mut hi = [0; 3];
        for k in 0..self.ndim {
            let a = f64::floor((x[k] - radius - self.xmin[k]) * self.inv_size[k]);
            let b = f64::floor((x[k] + radius - self.xmin[k]) * self.inv_size[k]);
            let n = self.ncell[k] as f64;
            if b < 0.0 || a >= n {
                return 0; // the cube does not touch the grid
            }
            lo[k] = f64::max(a, 0.0) as usize;
            hi[k] = f64::min(b, n - 1.0) as usize;
        }

        // scan rows of cells along x; each row is a contiguous range of records
        let (nx, ny) = (self.ncell[0], self.ncell[1]);
        let r2 = radius * radius;
        let mut n_candidate = 0;
        for cz in lo[2]..=hi[2] {
            for cy in lo[1]..=hi[1] {
                let row = nx * (cy + ny * cz);
                let start = self.first[row + lo[0]];
                let end = self.first[row + hi[0] + 1];
                n_candidate += end - start;
                for s in start..end {
                    if self.dist2(s, x) <= r2 {
                        results.push(self.ids[s]);
                    }
                }
            }
        }
        n_candidate
    }

    /// Finds, for every record, all other records within a distance `radius`
    ///
    /// The records are visited in cell order; hence, consecutive queries touch the same cells.
    /// The result is indexed by id and does not include the record itself.
    pub fn all_neighbors(&self, radius: f64) -> (Vec<Vec<usize>>, Metrics) {
        let mut metrics = Metrics::new();
        let mut neighbors = vec![Vec::new(); self.len()];
        let mut found = Vec::new();
        for s in 0..self.len() {
            let id = self.ids[s];
            let x = &self.coords[s * self.ndim..(s + 1) * self.ndim];
            metrics.n_candidate += self.query_into(x, radius, &mut found);
            metrics.n_query += 1;
            found.retain(|other| *other != id);
            neighbors[id] = found.clone();
        }
        (neighbors, metrics)
    }

    /// Computes the index of the cell containing x (clamped to the grid)
    fn cell_index(&self, x: &[f64]) -> usize {
        let mut c = [0; 3];
        for k in 0..self.ndim {
            let a = f64::floor((x[k] - self.xmin[k]) * self.inv_size[k]);
            let n = self.ncell[k] as f64;
            c[k] = f64::min(f64::max(a, 0.0), n - 1.0) as usize;
        }
        c[0] + self.ncell[0] * (c[1] + self.ncell[1] * c[2])
    }

    /// Computes the squared distance between the record at slot s and x
    #[inline]
    fn dist2(&self, s: usize, x: &[f64]) -> f64 {
        let mut d2 = 0.0;
        for k in 0..self.ndim {
            let d = self.coords[s * self.ndim + k] - x[k];
            d2 += d * d;
        }
        d2
    }
}

/// Builds a cell array and finds, for every point, all other points within a distance `radius`
///
/// The result is indexed as the input slice and does not include the point itself.
pub fn batch_all_neighbors(ndim: usize, points: &[Vec<f64>], radius: f64) -> Result<Vec<Vec<usize>>, StrError> {
    let cell_array = CellArray::build(ndim, points)?;
    let (neighbors, _) = cell_array.all_neighbors(radius);
    Ok(neighbors)
}

/// Computes the number of cells along each axis such that the total is close to npoint
///
/// The axes are processed from the shortest to the longest. For each axis, the cell size is
/// the one that would give `target` cubic cells in the box spanned by the remaining axes;
/// then the target is divided by the number of cells chosen for this axis. Consequently, a
/// thin axis receives a single cell and the remaining axes share all the cells, avoiding
/// sparse grids for elongated point clouds. Axes with zero extent get a single cell.
fn cell_counts(extents: &[f64], npoint: usize) -> [usize; 3] {
    let mut counts = [1; 3];
    let mut axes: Vec<_> = (0..extents.len()).filter(|k| extents[*k] > 0.0).collect();
    axes.sort_by(|a, b| extents[*a].total_cmp(&extents[*b]));
    let mut target = f64::max(npoint as f64, 1.0);
    for (i, k) in axes.iter().enumerate() {
        let remaining = &axes[i..];
        let m = remaining.len() as f64;
        let ln_vol: f64 = remaining.iter().map(|j| f64::ln(extents[*j])).sum();
        let size = f64::exp((ln_vol - f64::ln(target)) / m);
        let n = f64::max(f64::round(extents[*k] / size), 1.0);
        counts[*k] = n as usize;
        target = f64::max(target / n, 1.0);
    }
    counts
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
