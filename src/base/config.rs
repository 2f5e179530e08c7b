use super::{Basis, CONFIG_MIN_GROWTH_FACTOR, CONFIG_MIN_TOL};
use crate::StrError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Holds configuration parameters for neighbor searches and basis functions
///
/// # Locality and support
///
/// The max-entropy locality parameter is `β = γ / h²` where `h` is the nodal spacing
/// near the evaluation point. The support radius is the distance where the (unnormalized)
/// weight drops below `tol_zero`:
///
/// ```text
/// r = sqrt(-ln(tol_zero) / β)
/// ```
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    /// Space dimension (1, 2, or 3)
    pub ndim: usize,

    /// Strategy to compute the basis
    pub basis: Basis,

    /// Dimensionless locality parameter γ (β = γ / h²)
    pub gamma: f64,

    /// Weight value defining the cut-off radius of the support
    pub tol_zero: f64,

    /// Computes the second derivatives of the max-entropy basis
    pub hessian: bool,

    /// Tolerance on the (dimensionless) moment-balance residual for Newton's method
    pub newton_tol: f64,

    /// Maximum number of Newton iterations
    pub newton_max_iter: usize,

    /// Smallest allowed normalized determinant of the (dimensionless) Jacobian matrix
    ///
    /// Below this value, the neighborhood is considered degenerate (e.g., collinear)
    /// and the regularized solver is used instead of Newton's method.
    pub singular_tol: f64,

    /// Tolerance on the spread of function values for the Nelder-Mead simplex
    pub simplex_tol: f64,

    /// Maximum number of Nelder-Mead iterations
    pub simplex_max_iter: usize,

    /// Size of the initial simplex (dimensionless λ)
    pub simplex_step: f64,

    /// Tikhonov coefficient of the regularized log-partition function
    pub regularization: f64,

    /// Overrides the minimum number of neighbors required by the basis
    pub min_neighbors: Option<usize>,

    /// Multiplicative factor to grow the support radius when the neighborhood is insufficient
    pub growth_factor: f64,

    /// Maximum number of support growths per neighbor search
    pub max_retries: usize,

    /// Requires nodes on both sides of the evaluation point along each axis
    pub range_check: bool,

    /// Critical (nominal) strain of a node-point segment to flag the node as in tension
    pub critical_strain: f64,

    /// Minimum number of neighbors that must remain out of the tension set
    pub min_neighbors_tension: usize,

    /// Shows the support growth retries
    pub verbose_retries: bool,

    /// Shows when the regularized solver replaces Newton's method
    pub verbose_fallback: bool,

    /// Shows hard failures with diagnostics
    pub verbose_failures: bool,
}

impl Config {
    /// Allocates a new instance with default values
    pub fn new(ndim: usize) -> Self {
        Config {
            ndim,
            basis: Basis::MaxEnt,
            gamma: 1.8,
            tol_zero: 1e-6,
            hessian: false,
            newton_tol: 1e-12,
            newton_max_iter: 30,
            singular_tol: 1e-10,
            simplex_tol: 1e-15,
            simplex_max_iter: 5_000,
            simplex_step: 0.5,
            regularization: 1e-10,
            min_neighbors: None,
            growth_factor: 1.25,
            max_retries: 10,
            range_check: true,
            critical_strain: 0.5,
            min_neighbors_tension: ndim + 1,
            verbose_retries: false,
            verbose_fallback: false,
            verbose_failures: false,
        }
    }

    /// Sets the strategy to compute the basis
    pub fn set_basis(&mut self, basis: Basis) -> Result<&mut Self, StrError> {
        if let Basis::Mls { order } = basis {
            if order < 1 || order > 2 {
                return Err("the order of the MLS basis must be 1 or 2");
            }
        }
        self.basis = basis;
        Ok(self)
    }

    /// Sets the dimensionless locality parameter γ
    pub fn set_gamma(&mut self, value: f64) -> Result<&mut Self, StrError> {
        if value <= 0.0 {
            return Err("gamma must be > 0.0");
        }
        self.gamma = value;
        Ok(self)
    }

    /// Sets the weight value defining the cut-off radius
    pub fn set_tol_zero(&mut self, value: f64) -> Result<&mut Self, StrError> {
        if value <= 0.0 || value >= 1.0 {
            return Err("tol_zero must satisfy 0.0 < tol_zero < 1.0");
        }
        self.tol_zero = value;
        Ok(self)
    }

    /// Enables the computation of second derivatives
    pub fn set_hessian(&mut self, flag: bool) -> Result<&mut Self, StrError> {
        self.hessian = flag;
        Ok(self)
    }

    /// Sets the support growth parameters
    pub fn set_growth(&mut self, factor: f64, max_retries: usize) -> Result<&mut Self, StrError> {
        if factor < CONFIG_MIN_GROWTH_FACTOR {
            return Err("growth factor must be ≥ 1.01");
        }
        self.growth_factor = factor;
        self.max_retries = max_retries;
        Ok(self)
    }

    /// Sets the minimum number of neighbors (overrides the value required by the basis)
    pub fn set_min_neighbors(&mut self, value: usize) -> Result<&mut Self, StrError> {
        if value < 1 {
            return Err("the minimum number of neighbors must be ≥ 1");
        }
        self.min_neighbors = Some(value);
        Ok(self)
    }

    /// Sets the tension (separation) tracking parameters
    pub fn set_tension(&mut self, critical_strain: f64, min_neighbors: usize) -> Result<&mut Self, StrError> {
        if critical_strain <= 0.0 {
            return Err("critical strain must be > 0.0");
        }
        self.critical_strain = critical_strain;
        self.min_neighbors_tension = min_neighbors;
        Ok(self)
    }

    /// Returns the locality parameter β = γ / h² for a nodal spacing h
    pub fn beta(&self, spacing: f64) -> f64 {
        self.gamma / (spacing * spacing)
    }

    /// Returns the support radius corresponding to the locality parameter β
    pub fn support_radius(&self, beta: f64) -> f64 {
        f64::sqrt(-f64::ln(self.tol_zero) / beta)
    }

    /// Returns the minimum number of neighbors for the configured basis
    pub fn required_neighbors(&self) -> usize {
        match self.min_neighbors {
            Some(n) => n,
            None => self.basis.min_neighbors(self.ndim),
        }
    }

    /// Validates all data
    ///
    /// Returns a message with the inconsistent data, or returns None if everything is all right.
    pub fn validate(&self) -> Option<String> {
        if self.ndim < 1 || self.ndim > 3 {
            return Some(format!("ndim = {:?} is incorrect; it must be 1, 2, or 3", self.ndim));
        }
        if let Basis::Mls { order } = self.basis {
            if order < 1 || order > 2 {
                return Some(format!("MLS order = {:?} is incorrect; it must be 1 or 2", order));
            }
        }
        if self.gamma <= 0.0 {
            return Some(format!("gamma = {:?} is incorrect; it must be > 0.0", self.gamma));
        }
        if self.tol_zero <= 0.0 || self.tol_zero >= 1.0 {
            return Some(format!(
                "tol_zero = {:?} is incorrect; it must be 0.0 < tol_zero < 1.0",
                self.tol_zero
            ));
        }
        if self.newton_tol < CONFIG_MIN_TOL {
            return Some(format!(
                "newton_tol = {:?} is incorrect; it must be ≥ {:e}",
                self.newton_tol, CONFIG_MIN_TOL
            ));
        }
        if self.simplex_tol < CONFIG_MIN_TOL {
            return Some(format!(
                "simplex_tol = {:?} is incorrect; it must be ≥ {:e}",
                self.simplex_tol, CONFIG_MIN_TOL
            ));
        }
        if self.simplex_step <= 0.0 {
            return Some(format!(
                "simplex_step = {:?} is incorrect; it must be > 0.0",
                self.simplex_step
            ));
        }
        if self.regularization < 0.0 {
            return Some(format!(
                "regularization = {:?} is incorrect; it must be ≥ 0.0",
                self.regularization
            ));
        }
        if self.growth_factor < CONFIG_MIN_GROWTH_FACTOR {
            return Some(format!(
                "growth_factor = {:?} is incorrect; it must be ≥ {:?}",
                self.growth_factor, CONFIG_MIN_GROWTH_FACTOR
            ));
        }
        if self.critical_strain <= 0.0 {
            return Some(format!(
                "critical_strain = {:?} is incorrect; it must be > 0.0",
                self.critical_strain
            ));
        }
        None // all good
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration data\n")?;
        write!(f, "==================\n")?;
        write!(f, "ndim = {:?}\n", self.ndim)?;
        write!(f, "basis = {:?}\n", self.basis)?;
        write!(f, "gamma = {:?}\n", self.gamma)?;
        write!(f, "tol_zero = {:?}\n", self.tol_zero)?;
        write!(f, "hessian = {:?}\n", self.hessian)?;
        write!(f, "\nSolvers\n")?;
        write!(f, "=======\n")?;
        write!(f, "newton_tol = {:?}\n", self.newton_tol)?;
        write!(f, "newton_max_iter = {:?}\n", self.newton_max_iter)?;
        write!(f, "singular_tol = {:?}\n", self.singular_tol)?;
        write!(f, "simplex_tol = {:?}\n", self.simplex_tol)?;
        write!(f, "simplex_max_iter = {:?}\n", self.simplex_max_iter)?;
        write!(f, "simplex_step = {:?}\n", self.simplex_step)?;
        write!(f, "regularization = {:?}\n", self.regularization)?;
        write!(f, "\nNeighbors\n")?;
        write!(f, "=========\n")?;
        write!(f, "min_neighbors = {:?}\n", self.min_neighbors)?;
        write!(f, "growth_factor = {:?}\n", self.growth_factor)?;
        write!(f, "max_retries = {:?}\n", self.max_retries)?;
        write!(f, "range_check = {:?}\n", self.range_check)?;
        write!(f, "critical_strain = {:?}\n", self.critical_strain)?;
        write!(f, "min_neighbors_tension = {:?}\n", self.min_neighbors_tension)?;
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
