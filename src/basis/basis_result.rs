use crate::base::Neighborhood;
use crate::StrError;
use russell_lab::{Matrix, Vector};
use serde::{Deserialize, Serialize};

/// Holds the basis (shape) functions and derivatives at an evaluation point
///
/// The k-th entry of each array corresponds to the node `ids[k]`, following the order of the
/// neighborhood given to the solver.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BasisResult {
    /// Node identifiers
    ///
    /// (nnode)
    pub ids: Vec<usize>,

    /// Weights (shape functions)
    ///
    /// (nnode)
    pub weights: Vector,

    /// Gradients of the weights w.r.t the evaluation point
    ///
    /// (nnode, ndim)
    pub gradients: Matrix,

    /// Second derivatives of the weights (optional)
    ///
    /// (nnode) × (ndim, ndim)
    pub hessians: Option<Vec<Matrix>>,

    /// Dual variable (Lagrange multipliers) of the max-entropy basis (empty for MLS)
    ///
    /// (ndim)
    pub lambda: Vec<f64>,
}

/// Defines the reasons of a hard failure of the basis solver
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum FailureReason {
    /// Newton's method and the regularized solver did not converge
    NotConverged,

    /// The moment matrix of the MLS basis is singular
    SingularMoments,

    /// The neighborhood is insufficient after all support growths
    InsufficientNeighborhood,
}

impl FailureReason {
    /// Returns a message describing the failure
    pub fn message(&self) -> StrError {
        match self {
            FailureReason::NotConverged => "max-ent solver did not converge (Newton and regularized fallback)",
            FailureReason::SingularMoments => "MLS moment matrix is singular",
            FailureReason::InsufficientNeighborhood => "neighborhood is insufficient after the maximum number of retries",
        }
    }
}

/// Defines the state of the basis solution
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum SolveStatus {
    /// The basis has not been computed
    NotSolved,

    /// Newton's method (or the exact 1D solver) converged
    Converged,

    /// The regularized (simplex) solver was needed
    Regularized,

    /// Hard failure
    Failed(FailureReason),
}

/// Holds the outcome of a basis computation
///
/// Only `Converged` and `Regularized` carry a valid basis.
#[derive(Clone, Debug)]
pub enum BasisOutcome {
    Converged(BasisResult),
    Regularized(BasisResult),
    Failed(FailureReason),
}

impl BasisOutcome {
    /// Returns the status corresponding to this outcome
    pub fn status(&self) -> SolveStatus {
        match self {
            BasisOutcome::Converged(..) => SolveStatus::Converged,
            BasisOutcome::Regularized(..) => SolveStatus::Regularized,
            BasisOutcome::Failed(reason) => SolveStatus::Failed(*reason),
        }
    }

    /// Returns the basis if the outcome is valid
    pub fn result(&self) -> Option<&BasisResult> {
        match self {
            BasisOutcome::Converged(res) | BasisOutcome::Regularized(res) => Some(res),
            BasisOutcome::Failed(..) => None,
        }
    }

    /// Converts the outcome into the basis or an error message
    pub fn into_result(self) -> Result<BasisResult, StrError> {
        match self {
            BasisOutcome::Converged(res) | BasisOutcome::Regularized(res) => Ok(res),
            BasisOutcome::Failed(reason) => Err(reason.message()),
        }
    }
}

impl BasisResult {
    /// Allocates a new instance with zeroed values
    pub fn new(ids: &[usize], ndim: usize, with_hessians: bool) -> Self {
        let nnode = ids.len();
        BasisResult {
            ids: ids.to_vec(),
            weights: Vector::new(nnode),
            gradients: Matrix::new(nnode, ndim),
            hessians: if with_hessians {
                Some(vec![Matrix::new(ndim, ndim); nnode])
            } else {
                None
            },
            lambda: Vec::new(),
        }
    }

    /// Returns the number of nodes
    pub fn nnode(&self) -> usize {
        self.ids.len()
    }

    /// Returns the weight of a node (None if the node is not in the basis)
    pub fn weight(&self, id: usize) -> Option<f64> {
        let k = self.ids.iter().position(|i| *i == id)?;
        Some(self.weights[k])
    }

    /// Returns the sum of weights (partition of unity)
    pub fn sum_weights(&self) -> f64 {
        self.weights.as_data().iter().sum()
    }

    /// Computes the interpolated position Σ wᵢ xᵢ (linear reproduction)
    pub fn reproduce(&self, neighborhood: &Neighborhood) -> Vec<f64> {
        let ndim = neighborhood.ndim();
        let mut x = vec![0.0; ndim];
        for k in 0..self.nnode() {
            let xk = neighborhood.x(k);
            for i in 0..ndim {
                x[i] += self.weights[k] * xk[i];
            }
        }
        x
    }

    /// Computes Σ xᵢ ⊗ ∇wᵢ (equal to the identity matrix for first-order consistent bases)
    pub fn reproduce_gradient(&self, neighborhood: &Neighborhood) -> Matrix {
        let ndim = neighborhood.ndim();
        let mut gg = Matrix::new(ndim, ndim);
        for k in 0..self.nnode() {
            let xk = neighborhood.x(k);
            for i in 0..ndim {
                for j in 0..ndim {
                    gg.add(i, j, xk[i] * self.gradients.get(k, j));
                }
            }
        }
        gg
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{BasisOutcome, BasisResult, FailureReason, SolveStatus};
    use crate::base::Neighborhood;

    fn sample_result() -> (BasisResult, Neighborhood) {
        let mut neighborhood = Neighborhood::new(1);
        neighborhood.push(5, &[0.0]);
        neighborhood.push(9, &[2.0]);
        let mut res = BasisResult::new(&[5, 9], 1, false);
        res.weights[0] = 0.75;
        res.weights[1] = 0.25;
        res.gradients.set(0, 0, -0.5);
        res.gradients.set(1, 0, 0.5);
        (res, neighborhood)
    }

    #[test]
    fn accessors_work() {
        let (res, neighborhood) = sample_result();
        assert_eq!(res.nnode(), 2);
        assert_eq!(res.weight(9), Some(0.25));
        assert_eq!(res.weight(1), None);
        assert_eq!(res.sum_weights(), 1.0);
        assert_eq!(res.reproduce(&neighborhood), &[0.5]);
        assert_eq!(res.reproduce_gradient(&neighborhood).get(0, 0), 1.0);
        assert!(res.hessians.is_none());
        let res = BasisResult::new(&[1, 2, 3], 2, true);
        assert_eq!(res.hessians.unwrap().len(), 3);
    }

    #[test]
    fn outcome_works() {
        let (res, _) = sample_result();
        let outcome = BasisOutcome::Converged(res.clone());
        assert_eq!(outcome.status(), SolveStatus::Converged);
        assert!(outcome.result().is_some());
        let outcome = BasisOutcome::Regularized(res);
        assert_eq!(outcome.status(), SolveStatus::Regularized);
        assert_eq!(outcome.into_result().unwrap().nnode(), 2);
        let outcome = BasisOutcome::Failed(FailureReason::NotConverged);
        assert_eq!(outcome.status(), SolveStatus::Failed(FailureReason::NotConverged));
        assert!(outcome.result().is_none());
        assert_eq!(
            outcome.into_result().err(),
            Some("max-ent solver did not converge (Newton and regularized fallback)")
        );
    }
}
