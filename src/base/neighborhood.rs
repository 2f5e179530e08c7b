use serde::{Deserialize, Serialize};

/// Holds the nodes around an evaluation point (identity and position)
///
/// A neighborhood is valid for one evaluation point at one instant. It is recomputed
/// instead of being modified after the basis has been calculated.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Neighborhood {
    /// Space dimension
    ndim: usize,

    /// Node identifiers
    ///
    /// (nnode)
    pub ids: Vec<usize>,

    /// Node coordinates stored contiguously
    ///
    /// (nnode * ndim)
    pub coords: Vec<f64>,
}

impl Neighborhood {
    /// Allocates a new (empty) instance
    pub fn new(ndim: usize) -> Self {
        Neighborhood {
            ndim,
            ids: Vec::new(),
            coords: Vec::new(),
        }
    }

    /// Allocates a new instance from a list of ids and a slice of all node positions
    pub fn from_ids(ndim: usize, ids: &[usize], positions: &[Vec<f64>]) -> Self {
        let mut neighborhood = Neighborhood::new(ndim);
        for id in ids {
            neighborhood.push(*id, &positions[*id]);
        }
        neighborhood
    }

    /// Adds a node
    pub fn push(&mut self, id: usize, x: &[f64]) {
        self.ids.push(id);
        self.coords.extend_from_slice(&x[..self.ndim]);
    }

    /// Returns the space dimension
    #[inline]
    pub fn ndim(&self) -> usize {
        self.ndim
    }

    /// Returns the number of nodes
    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if there are no nodes
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns the coordinates of the k-th node
    #[inline]
    pub fn x(&self, k: usize) -> &[f64] {
        &self.coords[k * self.ndim..(k + 1) * self.ndim]
    }

    /// Returns true if the node is in this neighborhood
    pub fn contains(&self, id: usize) -> bool {
        self.ids.contains(&id)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::Neighborhood;

    #[test]
    fn push_and_access_work() {
        let mut neighborhood = Neighborhood::new(2);
        assert!(neighborhood.is_empty());
        neighborhood.push(7, &[1.0, 2.0]);
        neighborhood.push(3, &[3.0, 4.0, 99.0]); // extra component is ignored
        assert_eq!(neighborhood.ndim(), 2);
        assert_eq!(neighborhood.len(), 2);
        assert_eq!(neighborhood.x(0), &[1.0, 2.0]);
        assert_eq!(neighborhood.x(1), &[3.0, 4.0]);
        assert!(neighborhood.contains(3));
        assert!(!neighborhood.contains(0));
    }

    #[test]
    fn from_ids_works() {
        let positions = vec![vec![0.0], vec![1.0], vec![2.0], vec![3.0]];
        let neighborhood = Neighborhood::from_ids(1, &[3, 1], &positions);
        assert_eq!(neighborhood.ids, &[3, 1]);
        assert_eq!(neighborhood.coords, &[3.0, 1.0]);
    }
}
