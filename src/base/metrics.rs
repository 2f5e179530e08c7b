use serde::{Deserialize, Serialize};

/// Holds computational-cost counters
///
/// Each operation returns its own counters; the caller aggregates them with [Metrics::add].
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Metrics {
    /// Number of spatial index queries
    pub n_query: usize,

    /// Number of candidate records examined by the queries (before the exact distance filter)
    pub n_candidate: usize,

    /// Number of support radius growths
    pub n_retry: usize,

    /// Number of basis evaluations
    pub n_basis: usize,

    /// Number of Newton iterations (including the exact 1D solver iterations)
    pub n_newton_iter: usize,

    /// Number of Nelder-Mead iterations
    pub n_simplex_iter: usize,

    /// Number of solutions obtained with the regularized solver
    pub n_regularized: usize,
}

impl Metrics {
    /// Allocates a new instance with zeroed counters
    pub fn new() -> Self {
        Metrics::default()
    }

    /// Accumulates the counters of another instance
    pub fn add(&mut self, other: &Metrics) {
        self.n_query += other.n_query;
        self.n_candidate += other.n_candidate;
        self.n_retry += other.n_retry;
        self.n_basis += other.n_basis;
        self.n_newton_iter += other.n_newton_iter;
        self.n_simplex_iter += other.n_simplex_iter;
        self.n_regularized += other.n_regularized;
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::Metrics;

    #[test]
    fn add_works() {
        let mut total = Metrics::new();
        let a = Metrics {
            n_query: 1,
            n_candidate: 10,
            n_retry: 2,
            n_basis: 1,
            n_newton_iter: 4,
            n_simplex_iter: 0,
            n_regularized: 0,
        };
        let b = Metrics {
            n_simplex_iter: 50,
            n_regularized: 1,
            ..a
        };
        total.add(&a);
        total.add(&b);
        assert_eq!(total.n_query, 2);
        assert_eq!(total.n_candidate, 20);
        assert_eq!(total.n_retry, 4);
        assert_eq!(total.n_basis, 2);
        assert_eq!(total.n_newton_iter, 8);
        assert_eq!(total.n_simplex_iter, 50);
        assert_eq!(total.n_regularized, 1);
    }
}
