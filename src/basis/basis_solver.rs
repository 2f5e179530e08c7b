use super::{BasisOutcome, MaxEnt, Mls};
use crate::base::{Basis, Config, Metrics, Neighborhood};
use crate::StrError;

/// Computes local bases with the strategy selected in the configuration
///
/// Holds the scratch workspace of the solvers; hence, one instance should be allocated
/// per thread.
pub struct BasisSolver {
    /// Max-entropy solver (used if the configuration selects `Basis::MaxEnt`)
    max_ent: Option<MaxEnt>,

    /// MLS solver (used if the configuration selects `Basis::Mls`)
    mls: Option<Mls>,
}

impl BasisSolver {
    /// Allocates a new instance
    pub fn new(config: &Config) -> Result<Self, StrError> {
        if let Some(msg) = config.validate() {
            println!("ERROR: {}", msg);
            return Err("cannot allocate basis solver because config.validate() failed");
        }
        let (max_ent, mls) = match config.basis {
            Basis::MaxEnt => (Some(MaxEnt::new(config)), None),
            Basis::Mls { order } => (None, Some(Mls::new(config.ndim, order, config.singular_tol)?)),
        };
        Ok(BasisSolver { max_ent, mls })
    }

    /// Computes the basis at x
    ///
    /// # Input
    ///
    /// * `x` -- evaluation point (ndim)
    /// * `neighborhood` -- nodes around x (must not be empty)
    /// * `beta` -- locality parameter of the max-entropy basis
    /// * `support_radius` -- support radius of the MLS weight
    /// * `lambda0` -- optional initial dual variable of the max-entropy basis
    ///
    /// # Output
    ///
    /// Returns the outcome and the computational-cost counters of this call.
    pub fn compute_basis(
        &mut self,
        x: &[f64],
        neighborhood: &Neighborhood,
        beta: f64,
        support_radius: f64,
        lambda0: Option<&[f64]>,
    ) -> Result<(BasisOutcome, Metrics), StrError> {
        let mut metrics = Metrics::new();
        metrics.n_basis = 1;
        let outcome = if let Some(max_ent) = self.max_ent.as_mut() {
            let outcome = max_ent.compute(x, neighborhood, beta, lambda0)?;
            metrics.n_newton_iter = max_ent.n_newton_iter;
            metrics.n_simplex_iter = max_ent.n_simplex_iter;
            outcome
        } else if let Some(mls) = self.mls.as_mut() {
            mls.compute(x, neighborhood, support_radius)?
        } else {
            return Err("basis solver is not allocated");
        };
        if let BasisOutcome::Regularized(..) = outcome {
            metrics.n_regularized = 1;
        }
        Ok((outcome, metrics))
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
