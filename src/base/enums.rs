use serde::{Deserialize, Serialize};

/// Defines the strategy used to compute the local basis (shape functions)
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub enum Basis {
    /// Local max-entropy basis
    ///
    /// The weights maximize the Shannon entropy subject to the partition of unity
    /// and the first-order consistency constraints. They are non-negative.
    MaxEnt,

    /// Moving least-squares basis with a cubic spline weight over the support
    ///
    /// The `order` of the polynomial basis must be 1 (linear) or 2 (quadratic).
    Mls { order: usize },
}

impl Basis {
    /// Returns the consistency order of the basis
    pub fn order(&self) -> usize {
        match self {
            Basis::MaxEnt => 1,
            Basis::Mls { order } => *order,
        }
    }

    /// Returns the minimum number of nodes in a neighborhood for the given space dimension
    ///
    /// ```text
    /// order 1: ndim + 1
    /// order 2: (ndim + 1) (ndim + 2) / 2
    /// ```
    pub fn min_neighbors(&self, ndim: usize) -> usize {
        match self.order() {
            1 => ndim + 1,
            _ => (ndim + 1) * (ndim + 2) / 2,
        }
    }
}

/// Defines the lifecycle of a material point
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum Lifecycle {
    /// No basis has been computed yet
    Fresh,

    /// The basis matches the current positions
    Valid,

    /// The positions (or the carrier/blacklist sets) changed since the last basis
    Stale,

    /// Excluded from further physics (terminal)
    Eroded,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{Basis, Lifecycle};

    #[test]
    fn derive_works() {
        let basis = Basis::Mls { order: 2 };
        let clone = basis.clone();
        assert_eq!(format!("{:?}", clone), "Mls { order: 2 }");
        let json = serde_json::to_string(&basis).unwrap();
        let read: Basis = serde_json::from_str(&json).unwrap();
        assert_eq!(read, basis);

        let state = Lifecycle::Stale;
        assert_eq!(format!("{:?}", state), "Stale");
    }

    #[test]
    fn min_neighbors_works() {
        assert_eq!(Basis::MaxEnt.order(), 1);
        assert_eq!(Basis::MaxEnt.min_neighbors(1), 2);
        assert_eq!(Basis::MaxEnt.min_neighbors(2), 3);
        assert_eq!(Basis::MaxEnt.min_neighbors(3), 4);
        assert_eq!(Basis::Mls { order: 1 }.min_neighbors(2), 3);
        assert_eq!(Basis::Mls { order: 2 }.order(), 2);
        assert_eq!(Basis::Mls { order: 2 }.min_neighbors(1), 3);
        assert_eq!(Basis::Mls { order: 2 }.min_neighbors(2), 6);
        assert_eq!(Basis::Mls { order: 2 }.min_neighbors(3), 10);
    }
}
