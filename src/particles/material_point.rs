use super::Failure;
use crate::base::{Config, Lifecycle, Metrics, Neighborhood};
use crate::basis::{BasisOutcome, BasisResult, BasisSolver, FailureReason, SolveStatus};
use crate::search::CellArray;
use crate::StrError;
use russell_tensor::{Mandel, Tensor2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Holds the state of a material point
///
/// A material point keeps its neighborhood and basis consistent with the node positions.
/// The basis is computed once by [MaterialPoint::advance] and cached until the point is
/// explicitly invalidated (moved, reset, support enlarged, or carrier/blacklist sets changed).
///
/// # Lifecycle
///
/// ```text
/// Fresh → Valid → Stale → Valid → … → Eroded (terminal)
/// ```
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MaterialPoint {
    /// Identifier (index in the collection)
    id: usize,

    /// Space dimension
    ndim: usize,

    /// Lifecycle state
    lifecycle: Lifecycle,

    /// Current position (centroid)
    position: Vec<f64>,

    /// Reference (initial) position
    position0: Vec<f64>,

    /// Current volume
    volume: f64,

    /// Reference (initial) volume
    volume0: f64,

    /// Locality parameter β = γ / h²
    beta: f64,

    /// Base support radius (changed by enlarge_support only)
    radius: f64,

    /// Support radius used in the last neighbor search (after growths)
    search_radius: f64,

    /// Number of support growths in the last neighbor search
    n_retry: usize,

    /// Nodes included regardless of their distance
    carriers: BTreeSet<usize>,

    /// Nodes excluded regardless of their distance
    blacklist: BTreeSet<usize>,

    /// Nodes in tension (separating from the material point)
    tension: BTreeSet<usize>,

    /// Last neighborhood
    neighborhood: Neighborhood,

    /// Last basis (valid if lifecycle is Valid)
    basis: Option<BasisResult>,

    /// Status of the last basis computation
    status: SolveStatus,

    /// Dual variable of the last max-ent solve (warm start)
    lambda: Option<Vec<f64>>,

    /// Deformation gradient F
    def_grad: Tensor2,

    /// History of det(F), one value per kinematic update
    jacobians: Vec<f64>,

    /// Diagnostics of the last failure
    failure: Option<Failure>,

    /// Computational-cost counters of the last advance (including failed ones)
    #[serde(default)]
    last_metrics: Metrics,
}

impl MaterialPoint {
    /// Allocates a new instance
    ///
    /// # Input
    ///
    /// * `id` -- identifier of the material point
    /// * `position` -- initial position (ndim)
    /// * `volume` -- initial volume (> 0)
    /// * `spacing` -- nodal spacing h around the point (> 0); the locality parameter is β = γ / h²
    /// * `config` -- configuration
    pub fn new(id: usize, position: &[f64], volume: f64, spacing: f64, config: &Config) -> Result<Self, StrError> {
        let ndim = config.ndim;
        if position.len() < ndim {
            return Err("position must have at least ndim components");
        }
        if !(volume > 0.0) {
            return Err("volume must be positive");
        }
        if !(spacing > 0.0) || !spacing.is_finite() {
            return Err("spacing must be finite and positive");
        }
        let beta = config.beta(spacing);
        let radius = config.support_radius(beta);
        Ok(MaterialPoint {
            id,
            ndim,
            lifecycle: Lifecycle::Fresh,
            position: position[..ndim].to_vec(),
            position0: position[..ndim].to_vec(),
            volume,
            volume0: volume,
            beta,
            radius,
            search_radius: radius,
            n_retry: 0,
            carriers: BTreeSet::new(),
            blacklist: BTreeSet::new(),
            tension: BTreeSet::new(),
            neighborhood: Neighborhood::new(ndim),
            basis: None,
            status: SolveStatus::NotSolved,
            lambda: None,
            def_grad: Tensor2::identity(Mandel::General),
            jacobians: Vec::new(),
            failure: None,
            last_metrics: Metrics::new(),
        })
    }

    /// Computes the neighborhood and basis if the point is Fresh or Stale
    ///
    /// Returns the computational-cost counters. Valid and Eroded points are left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the neighborhood remains insufficient after the maximum number of
    /// support growths or if the basis solver fails. The diagnostics are then available
    /// via [MaterialPoint::failure] and the counters spent by the failed attempt via
    /// [MaterialPoint::last_metrics].
    pub fn advance(&mut self, index: &CellArray, solver: &mut BasisSolver, config: &Config) -> Result<Metrics, StrError> {
        match self.lifecycle {
            Lifecycle::Valid | Lifecycle::Eroded => return Ok(Metrics::new()),
            Lifecycle::Fresh | Lifecycle::Stale => (),
        }
        self.failure = None;
        let mut metrics = Metrics::new();
        let res = self.compute_neighborhood_and_basis(index, solver, config, &mut metrics);
        self.last_metrics = metrics;
        res.map(|_| metrics)
    }

    /// Runs the neighbor search and the basis solver, accumulating the counters
    fn compute_neighborhood_and_basis(
        &mut self,
        index: &CellArray,
        solver: &mut BasisSolver,
        config: &Config,
        metrics: &mut Metrics,
    ) -> Result<(), StrError> {
        // neighborhood
        let (sufficient, search) = self.find_neighborhood(index, config)?;
        metrics.add(&search);
        if !sufficient {
            self.status = SolveStatus::Failed(FailureReason::InsufficientNeighborhood);
            self.record_failure(FailureReason::InsufficientNeighborhood, config);
            return Err("material point failed because its neighborhood is insufficient");
        }

        // basis
        let (outcome, solve) = solver.compute_basis(
            &self.position,
            &self.neighborhood,
            self.beta,
            self.search_radius,
            self.lambda.as_deref(),
        )?;
        metrics.add(&solve);
        self.status = outcome.status();
        match outcome {
            BasisOutcome::Converged(res) | BasisOutcome::Regularized(res) => {
                self.lambda = if res.lambda.is_empty() { None } else { Some(res.lambda.clone()) };
                self.basis = Some(res);
                self.lifecycle = Lifecycle::Valid;
                Ok(())
            }
            BasisOutcome::Failed(reason) => {
                self.basis = None;
                self.lambda = None;
                self.record_failure(reason, config);
                Err("material point failed because the basis solver failed")
            }
        }
    }

    /// Finds the neighborhood with bounded support growth
    ///
    /// Starts with the base support radius and multiplies the radius by the growth factor
    /// until the neighborhood is sufficient or the maximum number of retries is reached.
    /// The blacklisted nodes are removed from the query results and the carriers are added.
    ///
    /// A neighborhood is sufficient if it has at least the required number of nodes and,
    /// if the range check is enabled, nodes on both sides of the point along every axis.
    ///
    /// Returns `(sufficient, metrics)`.
    pub fn find_neighborhood(&mut self, index: &CellArray, config: &Config) -> Result<(bool, Metrics), StrError> {
        if index.ndim() != self.ndim {
            return Err("spatial index ndim is incompatible with the material point");
        }
        for id in &self.carriers {
            if *id >= index.len() {
                return Err("carrier node is not in the spatial index");
            }
        }
        let mut metrics = Metrics::new();
        let required = config.required_neighbors();
        let mut found = Vec::new();
        let mut radius = self.radius;
        self.n_retry = 0;
        loop {
            metrics.n_candidate += index.query_into(&self.position, radius, &mut found);
            metrics.n_query += 1;
            found.retain(|id| !self.blacklist.contains(id));
            for id in &self.carriers {
                if !found.contains(id) && !self.blacklist.contains(id) {
                    found.push(*id);
                }
            }
            self.neighborhood = Neighborhood::new(self.ndim);
            for id in &found {
                self.neighborhood.push(*id, index.position(*id));
            }
            self.search_radius = radius;
            let sufficient = found.len() >= required && (!config.range_check || self.has_range());
            if sufficient {
                return Ok((true, metrics));
            }
            if self.n_retry == config.max_retries {
                return Ok((false, metrics));
            }
            radius *= config.growth_factor;
            self.n_retry += 1;
            metrics.n_retry += 1;
            if config.verbose_retries {
                println!(
                    "MFSIM: material point {} has {} of {} nodes; growing the support radius to {:?}",
                    self.id,
                    found.len(),
                    required,
                    radius
                );
            }
        }
    }

    /// Moves the point and marks the basis as stale
    pub fn reset(&mut self, position: &[f64]) -> Result<(), StrError> {
        if position.len() < self.ndim {
            return Err("position must have at least ndim components");
        }
        self.position.copy_from_slice(&position[..self.ndim]);
        self.failure = None;
        self.invalidate();
        Ok(())
    }

    /// Multiplies the base support radius by a factor (≥ 1) and marks the basis as stale
    pub fn enlarge_support(&mut self, factor: f64) -> Result<(), StrError> {
        if !(factor >= 1.0) || !factor.is_finite() {
            return Err("the enlargement factor must be finite and ≥ 1");
        }
        self.radius *= factor;
        self.invalidate();
        Ok(())
    }

    /// Adds a node to the carrier set (always included in the neighborhood)
    pub fn add_carrier(&mut self, node: usize) {
        if self.carriers.insert(node) {
            self.invalidate();
        }
    }

    /// Removes a node from the carrier set
    pub fn remove_carrier(&mut self, node: usize) {
        if self.carriers.remove(&node) {
            self.invalidate();
        }
    }

    /// Adds a node to the blacklist (always excluded from the neighborhood)
    pub fn add_blacklist(&mut self, node: usize) {
        if self.blacklist.insert(node) {
            self.invalidate();
        }
    }

    /// Removes a node from the blacklist
    pub fn remove_blacklist(&mut self, node: usize) {
        if self.blacklist.remove(&node) {
            self.invalidate();
        }
    }

    /// Excludes the point from further computations (terminal state)
    pub fn erode(&mut self) {
        self.lifecycle = Lifecycle::Eroded;
        self.basis = None;
        self.neighborhood = Neighborhood::new(self.ndim);
        self.tension.clear();
    }

    /// Updates the position, deformation gradient, and volume using the nodal displacements
    ///
    /// Uses the current (valid) basis computed with the previous node positions:
    ///
    /// ```text
    /// x  ← Σ wₐ xₐ
    /// ΔF = Σ xₐ ⊗ ∇wₐ
    /// F  ← ΔF · F
    /// V  ← det(ΔF) V
    /// ```
    ///
    /// where xₐ are the new node positions. The basis becomes stale.
    pub fn update_kinematics(&mut self, nodes: &[Vec<f64>]) -> Result<(), StrError> {
        let ndim = self.ndim;
        let basis = match (&self.lifecycle, &self.basis) {
            (Lifecycle::Valid, Some(basis)) => basis,
            _ => return Err("kinematics require a valid basis"),
        };
        let mut position = vec![0.0; ndim];
        let mut df = [[0.0; 3]; 3];
        for i in ndim..3 {
            df[i][i] = 1.0;
        }
        for k in 0..basis.nnode() {
            let xa = nodes.get(basis.ids[k]).ok_or("node positions are incompatible with the basis")?;
            for i in 0..ndim {
                position[i] += basis.weights[k] * xa[i];
                for j in 0..ndim {
                    df[i][j] += xa[i] * basis.gradients.get(k, j);
                }
            }
        }
        let det_df = Tensor2::from_matrix(&df, Mandel::General)?.determinant();
        if !(det_df > 0.0) {
            return Err("the deformation increment must have a positive determinant");
        }
        let mut ff = [[0.0; 3]; 3];
        for i in 0..3 {
            for j in 0..3 {
                for k in 0..3 {
                    ff[i][j] += df[i][k] * self.def_grad.get(k, j);
                }
            }
        }
        self.def_grad = Tensor2::from_matrix(&ff, Mandel::General)?;
        self.jacobians.push(self.def_grad.determinant());
        self.volume *= det_df;
        self.position = position;
        self.invalidate();
        Ok(())
    }

    /// Updates the set of nodes in tension
    ///
    /// A node is in tension if its distance to the point has stretched by more than the
    /// critical strain w.r.t the reference configuration:
    ///
    /// ```text
    /// |xₐ - xₚ| / |Xₐ - Xₚ| - 1 > critical_strain
    /// ```
    ///
    /// The most stretched nodes are flagged first and at least `min_neighbors_tension` nodes
    /// of the neighborhood are kept out of the set.
    pub fn update_tension(&mut self, nodes: &[Vec<f64>], nodes0: &[Vec<f64>], config: &Config) -> Result<(), StrError> {
        self.tension.clear();
        if self.lifecycle == Lifecycle::Eroded {
            return Ok(());
        }
        let mut stretched = Vec::new();
        for id in &self.neighborhood.ids {
            let xa = nodes.get(*id).ok_or("node positions are incompatible with the neighborhood")?;
            let xa0 = nodes0.get(*id).ok_or("reference positions are incompatible with the neighborhood")?;
            let (mut l2, mut ll2) = (0.0, 0.0);
            for i in 0..self.ndim {
                l2 += (xa[i] - self.position[i]) * (xa[i] - self.position[i]);
                ll2 += (xa0[i] - self.position0[i]) * (xa0[i] - self.position0[i]);
            }
            if ll2 > 0.0 {
                let strain = f64::sqrt(l2 / ll2) - 1.0;
                if strain > config.critical_strain {
                    stretched.push((strain, *id));
                }
            }
        }
        let allowed = self.neighborhood.len().saturating_sub(config.min_neighbors_tension);
        stretched.sort_by(|a, b| b.0.total_cmp(&a.0));
        for (_, id) in stretched.iter().take(allowed) {
            self.tension.insert(*id);
        }
        Ok(())
    }

    /// Returns the identifier
    pub fn id(&self) -> usize {
        self.id
    }

    /// Returns the lifecycle state
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Returns the status of the last basis computation
    pub fn status(&self) -> SolveStatus {
        self.status
    }

    /// Returns the current position (centroid)
    pub fn position(&self) -> &[f64] {
        &self.position
    }

    /// Returns the current volume
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Returns the reference volume
    pub fn volume0(&self) -> f64 {
        self.volume0
    }

    /// Returns the locality parameter
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Returns the base support radius
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Returns the support radius used in the last neighbor search
    pub fn search_radius(&self) -> f64 {
        self.search_radius
    }

    /// Returns the number of support growths in the last neighbor search
    pub fn n_retry(&self) -> usize {
        self.n_retry
    }

    /// Returns the last neighborhood
    pub fn neighborhood(&self) -> &Neighborhood {
        &self.neighborhood
    }

    /// Returns the basis if it matches the current positions
    pub fn basis(&self) -> Option<&BasisResult> {
        match self.lifecycle {
            Lifecycle::Valid => self.basis.as_ref(),
            _ => None,
        }
    }

    /// Returns the deformation gradient F
    pub fn deformation_gradient(&self) -> &Tensor2 {
        &self.def_grad
    }

    /// Returns the current deformation Jacobian det(F)
    pub fn jacobian(&self) -> f64 {
        self.jacobians.last().copied().unwrap_or(1.0)
    }

    /// Returns the history of det(F)
    pub fn jacobians(&self) -> &[f64] {
        &self.jacobians
    }

    /// Returns the carrier set
    pub fn carriers(&self) -> &BTreeSet<usize> {
        &self.carriers
    }

    /// Returns the blacklist
    pub fn blacklist(&self) -> &BTreeSet<usize> {
        &self.blacklist
    }

    /// Returns the nodes in tension
    pub fn tension(&self) -> &BTreeSet<usize> {
        &self.tension
    }

    /// Returns true if the point has been eroded
    pub fn is_eroded(&self) -> bool {
        self.lifecycle == Lifecycle::Eroded
    }

    /// Returns the diagnostics of the last failure
    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    /// Returns the computational-cost counters of the last advance that did some work
    pub fn last_metrics(&self) -> &Metrics {
        &self.last_metrics
    }

    /// Marks the basis as stale (Eroded is terminal)
    fn invalidate(&mut self) {
        if self.lifecycle != Lifecycle::Eroded {
            self.lifecycle = Lifecycle::Stale;
        }
    }

    /// Checks whether there are nodes on both sides of the point along every axis
    fn has_range(&self) -> bool {
        (0..self.ndim).all(|i| {
            let mut below = false;
            let mut above = false;
            for k in 0..self.neighborhood.len() {
                let d = self.neighborhood.x(k)[i] - self.position[i];
                below |= d < 0.0;
                above |= d > 0.0;
            }
            below && above
        })
    }

    /// Stores the diagnostics of a failure
    fn record_failure(&mut self, reason: FailureReason, config: &Config) {
        let failure = Failure {
            point: self.id,
            position: self.position.clone(),
            nnode: self.neighborhood.len(),
            radius: self.search_radius,
            n_retry: self.n_retry,
            reason,
        };
        if config.verbose_failures {
            println!("MFSIM: {}", failure);
        }
        self.failure = Some(failure);
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
