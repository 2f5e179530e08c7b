use serde::{Deserialize, Serialize};

/// Holds an axis-aligned bounding box
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct BoundingBox {
    /// Minimum coordinates
    ///
    /// (ndim)
    pub xmin: Vec<f64>,

    /// Maximum coordinates
    ///
    /// (ndim)
    pub xmax: Vec<f64>,
}

impl BoundingBox {
    /// Computes the bounding box of a set of points
    ///
    /// Returns None if there are no points.
    pub fn from_points(ndim: usize, points: &[Vec<f64>]) -> Option<Self> {
        let first = points.first()?;
        let mut xmin = first[..ndim].to_vec();
        let mut xmax = first[..ndim].to_vec();
        for x in points {
            for k in 0..ndim {
                xmin[k] = f64::min(xmin[k], x[k]);
                xmax[k] = f64::max(xmax[k], x[k]);
            }
        }
        Some(BoundingBox { xmin, xmax })
    }

    /// Returns the space dimension
    pub fn ndim(&self) -> usize {
        self.xmin.len()
    }

    /// Returns the extent along the k-th axis
    #[inline]
    pub fn extent(&self, k: usize) -> f64 {
        self.xmax[k] - self.xmin[k]
    }

    /// Returns the largest extent
    pub fn max_extent(&self) -> f64 {
        (0..self.ndim()).fold(0.0, |acc, k| f64::max(acc, self.extent(k)))
    }

    /// Inflates the box to avoid round-off errors with points on the boundary
    ///
    /// The padding is `rel · (max_extent + max_abs_coordinate)`, hence it is never
    /// smaller than the machine precision relative to the coordinates.
    ///
    /// **Note:** Axes with zero extent are not inflated.
    pub fn inflate(&mut self, rel: f64) {
        let mut max_abs = 0.0;
        for k in 0..self.ndim() {
            max_abs = f64::max(max_abs, f64::max(f64::abs(self.xmin[k]), f64::abs(self.xmax[k])));
        }
        let pad = rel * (self.max_extent() + max_abs);
        for k in 0..self.ndim() {
            if self.extent(k) > 0.0 {
                self.xmin[k] -= pad;
                self.xmax[k] += pad;
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::BoundingBox;
    use russell_lab::approx_eq;

    #[test]
    fn from_points_works() {
        assert_eq!(BoundingBox::from_points(2, &[]), None);
        let points = vec![vec![1.0, -2.0], vec![3.0, 4.0], vec![-1.0, 0.0]];
        let bbox = BoundingBox::from_points(2, &points).unwrap();
        assert_eq!(bbox.xmin, &[-1.0, -2.0]);
        assert_eq!(bbox.xmax, &[3.0, 4.0]);
        assert_eq!(bbox.ndim(), 2);
        assert_eq!(bbox.extent(0), 4.0);
        assert_eq!(bbox.extent(1), 6.0);
        assert_eq!(bbox.max_extent(), 6.0);
    }

    #[test]
    fn inflate_works() {
        let points = vec![vec![0.0, 5.0], vec![10.0, 5.0]];
        let mut bbox = BoundingBox::from_points(2, &points).unwrap();
        bbox.inflate(0.01);
        // pad = 0.01 * (10 + 10)
        approx_eq(bbox.xmin[0], -0.2, 1e-15);
        approx_eq(bbox.xmax[0], 10.2, 1e-15);
        // zero extent: unchanged
        assert_eq!(bbox.xmin[1], 5.0);
        assert_eq!(bbox.xmax[1], 5.0);
    }
}
