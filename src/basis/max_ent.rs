use super::{BasisOutcome, BasisResult, FailureReason, NelderMead};
use crate::base::{Config, Neighborhood};
use crate::StrError;
use russell_lab::{mat_inverse, Matrix, RootFinder};

/// Maximum number of step halvings in the Newton line search
const MAX_BACKTRACK: usize = 30;

/// Sufficient decrease coefficient of the line search
const ARMIJO: f64 = 1e-4;

/// Residual below which the full Newton step is accepted without line search
const FULL_STEP_RESIDUAL: f64 = 1e-6;

/// Maximum number of expansions of the 1D bracket
const MAX_BRACKET: usize = 64;

/// Implements the local max-entropy basis
///
/// The weights are
///
/// ```text
///        exp(-β |dᵢ|² + λ·dᵢ)
/// wᵢ = ─────────────────────     with dᵢ = xᵢ - x
///              Z(λ)
/// ```
///
/// where λ is the root of the moment residual `r(λ) = Σ wᵢ dᵢ`. The Jacobian of the residual
/// is the covariance `J = Σ wᵢ dᵢ⊗dᵢ - r⊗r`. The computations are carried out with the offsets
/// scaled by the largest |dᵢ|; hence, the tolerances are dimensionless.
///
/// The gradients are `∇wᵢ = wᵢ J⁻¹ dᵢ` and the Hessians are
///
/// ```text
/// Hᵢ = wᵢ (gᵢ⊗gᵢ - Σⱼ wⱼ (dⱼ·gᵢ) gⱼ⊗gⱼ - J⁻¹)     with gᵢ = J⁻¹ dᵢ
/// ```
pub struct MaxEnt {
    ndim: usize,
    with_hessians: bool,
    newton_tol: f64,
    newton_max_iter: usize,
    singular_tol: f64,
    regularization: f64,
    verbose_fallback: bool,
    simplex: NelderMead,

    /// Scaled offsets (nnode * ndim)
    dd: Vec<f64>,

    /// Weights (nnode)
    ww: Vec<f64>,

    /// Residual (ndim ≤ 3)
    rr: [f64; 3],

    /// Jacobian (ndim, ndim)
    jj: Matrix,

    /// Inverse of the Jacobian (ndim, ndim)
    jj_inv: Matrix,

    /// Number of Newton iterations of the last solve
    pub n_newton_iter: usize,

    /// Number of simplex iterations of the last solve
    pub n_simplex_iter: usize,
}

impl MaxEnt {
    /// Allocates a new instance
    pub fn new(config: &Config) -> Self {
        MaxEnt {
            ndim: config.ndim,
            with_hessians: config.hessian,
            newton_tol: config.newton_tol,
            newton_max_iter: config.newton_max_iter,
            singular_tol: config.singular_tol,
            regularization: config.regularization,
            verbose_fallback: config.verbose_fallback,
            simplex: NelderMead::new(config.simplex_tol, config.simplex_max_iter, config.simplex_step),
            dd: Vec::new(),
            ww: Vec::new(),
            rr: [0.0; 3],
            jj: Matrix::new(config.ndim, config.ndim),
            jj_inv: Matrix::new(config.ndim, config.ndim),
            n_newton_iter: 0,
            n_simplex_iter: 0,
        }
    }

    /// Computes the weights, gradients and (optionally) Hessians at x
    ///
    /// # Input
    ///
    /// * `x` -- evaluation point (ndim)
    /// * `neighborhood` -- nodes around x
    /// * `beta` -- locality parameter (≥ 0)
    /// * `lambda0` -- optional initial dual variable (e.g., from the previous time step)
    pub fn compute(
        &mut self,
        x: &[f64],
        neighborhood: &Neighborhood,
        beta: f64,
        lambda0: Option<&[f64]>,
    ) -> Result<BasisOutcome, StrError> {
        let ndim = self.ndim;
        let nnode = neighborhood.len();
        if nnode == 0 {
            return Err("neighborhood must not be empty");
        }
        if neighborhood.ndim() != ndim {
            return Err("neighborhood ndim is incompatible with the configuration");
        }
        if x.len() < ndim {
            return Err("x must have at least ndim components");
        }
        if !beta.is_finite() || beta < 0.0 {
            return Err("beta must be finite and non-negative");
        }
        self.n_newton_iter = 0;
        self.n_simplex_iter = 0;

        // scaled offsets
        self.dd.clear();
        self.ww.resize(nnode, 0.0);
        let mut h = 0.0;
        for k in 0..nnode {
            let xk = neighborhood.x(k);
            let mut len2 = 0.0;
            for i in 0..ndim {
                let d = xk[i] - x[i];
                self.dd.push(d);
                len2 += d * d;
            }
            h = f64::max(h, f64::sqrt(len2));
        }
        if !h.is_finite() {
            return Err("coordinates must be finite");
        }

        // all nodes coincide with x
        if h == 0.0 {
            let mut res = BasisResult::new(&neighborhood.ids, ndim, self.with_hessians);
            res.weights.fill(1.0 / (nnode as f64));
            res.lambda = vec![0.0; ndim];
            return Ok(BasisOutcome::Regularized(res));
        }
        for d in self.dd.iter_mut() {
            *d /= h;
        }
        let bt = beta * h * h;

        // initial (scaled) dual variable
        let mut lambda = [0.0; 3];
        if let Some(l0) = lambda0 {
            if l0.len() >= ndim && l0[..ndim].iter().all(|v| v.is_finite()) {
                for i in 0..ndim {
                    lambda[i] = l0[i] * h;
                }
            }
        }

        // Newton (or the exact 1D solver)
        let converged = if ndim == 1 {
            self.solve_exact_1d(bt, &mut lambda)?
        } else {
            self.solve_newton(bt, &mut lambda)
        };

        // regularized fallback
        let mut regularized = false;
        if !converged {
            if self.verbose_fallback {
                println!(
                    "MFSIM: max-ent Newton failed at x = {:?} with {} nodes; using the regularized solver",
                    &x[..ndim],
                    nnode
                );
            }
            if !self.solve_regularized(bt, &mut lambda)? {
                return Ok(BasisOutcome::Failed(FailureReason::NotConverged));
            }
            regularized = true;
        }

        // results
        let mut res = BasisResult::new(&neighborhood.ids, ndim, self.with_hessians);
        if !self.derivatives(h, &mut res) {
            return Ok(BasisOutcome::Failed(FailureReason::NotConverged));
        }
        res.lambda = lambda[..ndim].iter().map(|l| l / h).collect();
        if regularized {
            Ok(BasisOutcome::Regularized(res))
        } else {
            Ok(BasisOutcome::Converged(res))
        }
    }

    /// Solves r(λ) = 0 with Newton's method and a backtracking line search on ln Z
    ///
    /// Returns true if converged. Returns false if the Jacobian is nearly singular,
    /// the line search stalls, or the maximum number of iterations is reached.
    fn solve_newton(&mut self, bt: f64, lambda: &mut [f64; 3]) -> bool {
        let ndim = self.ndim;
        let mut f = log_partition(&self.dd, ndim, bt, &lambda[..ndim], &mut self.ww);
        let mut trial = [0.0; 3];
        let mut delta = [0.0; 3];
        for _ in 0..self.newton_max_iter {
            moments(&self.dd, ndim, &self.ww, &mut self.rr, &mut self.jj);
            let norm_r = norm_inf(&self.rr[..ndim]);
            if norm_r < self.newton_tol {
                return true;
            }
            if self.is_singular() {
                return false;
            }
            self.n_newton_iter += 1;

            // δ = J⁻¹ r
            let mut decrease = 0.0;
            for i in 0..ndim {
                delta[i] = 0.0;
                for j in 0..ndim {
                    delta[i] += self.jj_inv.get(i, j) * self.rr[j];
                }
                decrease += self.rr[i] * delta[i];
            }

            // line search
            let mut t = 1.0;
            let mut accepted = false;
            for _ in 0..MAX_BACKTRACK {
                for i in 0..ndim {
                    trial[i] = lambda[i] - t * delta[i];
                }
                let f_trial = log_partition(&self.dd, ndim, bt, &trial[..ndim], &mut self.ww);
                let sufficient = f_trial <= f - ARMIJO * t * decrease;
                if sufficient || (norm_r < FULL_STEP_RESIDUAL && f_trial.is_finite()) {
                    lambda[..ndim].copy_from_slice(&trial[..ndim]);
                    f = f_trial;
                    accepted = true;
                    break;
                }
                t *= 0.5;
            }
            if !accepted {
                log_partition(&self.dd, ndim, bt, &lambda[..ndim], &mut self.ww);
                moments(&self.dd, ndim, &self.ww, &mut self.rr, &mut self.jj);
                return norm_inf(&self.rr[..ndim]) < self.newton_tol;
            }
        }
        moments(&self.dd, ndim, &self.ww, &mut self.rr, &mut self.jj);
        norm_inf(&self.rr[..ndim]) < self.newton_tol
    }

    /// Solves r(λ) = 0 in 1D
    ///
    /// Two nodes on opposite sides of x yield the closed-form solution
    ///
    /// ```text
    ///     ln(|d₂|/|d₁|) + β (d₁² - d₂²)
    /// λ = ─────────────────────────────
    ///               d₁ - d₂
    /// ```
    ///
    /// Otherwise, the root of the (monotonic) residual is bracketed and found with Brent's method.
    /// A few Newton iterations polish the root. Returns false if x is not strictly inside the
    /// range of the nodes or if the residual does not reach the tolerance.
    fn solve_exact_1d(&mut self, bt: f64, lambda: &mut [f64; 3]) -> Result<bool, StrError> {
        let nnode = self.ww.len();
        let dmin = self.dd.iter().fold(f64::INFINITY, |acc, d| f64::min(acc, *d));
        let dmax = self.dd.iter().fold(f64::NEG_INFINITY, |acc, d| f64::max(acc, *d));
        if !(dmin < 0.0 && dmax > 0.0) {
            return Ok(false);
        }
        if nnode == 2 {
            let (d1, d2) = (self.dd[0], self.dd[1]);
            lambda[0] = (f64::ln(f64::abs(d2) / f64::abs(d1)) + bt * (d1 * d1 - d2 * d2)) / (d1 - d2);
        } else {
            let dd = &self.dd;
            let residual = |l: f64| residual_1d(dd, bt, l);
            let mut width = 1.0;
            let mut lo = lambda[0] - width;
            let mut hi = lambda[0] + width;
            let mut bracketed = false;
            for _ in 0..MAX_BRACKET {
                let (r_lo, r_hi) = (residual(lo), residual(hi));
                if r_lo == 0.0 {
                    hi = lo;
                    bracketed = true;
                    break;
                }
                if r_hi == 0.0 {
                    lo = hi;
                    bracketed = true;
                    break;
                }
                if r_lo < 0.0 && r_hi > 0.0 {
                    bracketed = true;
                    break;
                }
                width *= 2.0;
                if r_lo > 0.0 {
                    lo -= width;
                }
                if r_hi < 0.0 {
                    hi += width;
                }
            }
            if !bracketed {
                return Ok(false);
            }
            lambda[0] = if lo == hi {
                lo
            } else {
                let solver = RootFinder::new();
                let (root, _) = solver.brent(lo, hi, &mut 0, |l, _| Ok(residual(l)))?;
                root
            };
        }

        // polish
        for _ in 0..self.newton_max_iter {
            log_partition(&self.dd, 1, bt, &lambda[..1], &mut self.ww);
            moments(&self.dd, 1, &self.ww, &mut self.rr, &mut self.jj);
            if f64::abs(self.rr[0]) < self.newton_tol {
                return Ok(true);
            }
            let jac = self.jj.get(0, 0);
            if !(jac > 0.0) {
                return Ok(false);
            }
            self.n_newton_iter += 1;
            lambda[0] -= self.rr[0] / jac;
        }
        log_partition(&self.dd, 1, bt, &lambda[..1], &mut self.ww);
        moments(&self.dd, 1, &self.ww, &mut self.rr, &mut self.jj);
        Ok(f64::abs(self.rr[0]) < self.newton_tol)
    }

    /// Minimizes the regularized log-partition function ln Z(λ) + ½ ε |λ|²
    ///
    /// The Nelder-Mead search is followed by a Newton polish with the regularized Hessian J + ε I.
    /// Returns true if the final (non-regularized) residual is acceptable, i.e., |r|∞ ≤ √tol.
    fn solve_regularized(&mut self, bt: f64, lambda: &mut [f64; 3]) -> Result<bool, StrError> {
        let ndim = self.ndim;
        let eps = f64::max(self.regularization, f64::EPSILON);
        if !lambda[..ndim].iter().all(|l| l.is_finite()) {
            lambda.fill(0.0);
        }

        // simplex
        let (dd, ww) = (&self.dd, &mut self.ww);
        let output = self.simplex.minimize(&lambda[..ndim], |l| {
            log_partition(dd, ndim, bt, l, ww) + 0.5 * eps * dot(l, l)
        })?;
        self.n_simplex_iter += output.n_iter;
        lambda[..ndim].copy_from_slice(&output.x);

        // regularized Newton polish
        let mut f = log_partition(&self.dd, ndim, bt, &lambda[..ndim], &mut self.ww)
            + 0.5 * eps * dot(&lambda[..ndim], &lambda[..ndim]);
        let mut g = [0.0; 3];
        let mut trial = [0.0; 3];
        let mut delta = [0.0; 3];
        for _ in 0..self.newton_max_iter {
            moments(&self.dd, ndim, &self.ww, &mut self.rr, &mut self.jj);
            for i in 0..ndim {
                g[i] = self.rr[i] + eps * lambda[i];
                self.jj.add(i, i, eps);
            }
            if norm_inf(&g[..ndim]) < self.newton_tol {
                break;
            }
            if mat_inverse(&mut self.jj_inv, &self.jj).is_err() {
                break;
            }
            self.n_newton_iter += 1;
            let mut decrease = 0.0;
            for i in 0..ndim {
                delta[i] = 0.0;
                for j in 0..ndim {
                    delta[i] += self.jj_inv.get(i, j) * g[j];
                }
                decrease += g[i] * delta[i];
            }
            let mut t = 1.0;
            let mut accepted = false;
            for _ in 0..MAX_BACKTRACK {
                for i in 0..ndim {
                    trial[i] = lambda[i] - t * delta[i];
                }
                let f_trial = log_partition(&self.dd, ndim, bt, &trial[..ndim], &mut self.ww)
                    + 0.5 * eps * dot(&trial[..ndim], &trial[..ndim]);
                if f_trial <= f - ARMIJO * t * decrease {
                    lambda[..ndim].copy_from_slice(&trial[..ndim]);
                    f = f_trial;
                    accepted = true;
                    break;
                }
                t *= 0.5;
            }
            if !accepted {
                break;
            }
        }

        // final state
        log_partition(&self.dd, ndim, bt, &lambda[..ndim], &mut self.ww);
        moments(&self.dd, ndim, &self.ww, &mut self.rr, &mut self.jj);
        let finite = self.ww.iter().all(|w| w.is_finite());
        Ok(finite && norm_inf(&self.rr[..ndim]) <= f64::sqrt(self.newton_tol))
    }

    /// Computes J⁻¹ and returns true if J is nearly singular
    ///
    /// The criterion is `det(J) / (tr(J) / ndim)^ndim < singular_tol`.
    fn is_singular(&mut self) -> bool {
        let ndim = self.ndim;
        let trace: f64 = (0..ndim).map(|i| self.jj.get(i, i)).sum();
        if !(trace > 0.0) {
            return true;
        }
        match mat_inverse(&mut self.jj_inv, &self.jj) {
            Ok(det) => {
                let ratio = det / f64::powi(trace / (ndim as f64), ndim as i32);
                !(ratio >= self.singular_tol)
            }
            Err(_) => true,
        }
    }

    /// Computes the gradients and Hessians from the current weights and Jacobian
    ///
    /// A nearly singular Jacobian is replaced by J + √ϵ tr(J) I. Returns false if the
    /// inverse cannot be computed.
    fn derivatives(&mut self, h: f64, res: &mut BasisResult) -> bool {
        let ndim = self.ndim;
        let nnode = self.ww.len();
        if self.is_singular() {
            let trace: f64 = (0..ndim).map(|i| self.jj.get(i, i)).sum();
            let shift = f64::sqrt(f64::EPSILON) * f64::max(trace, f64::EPSILON);
            for i in 0..ndim {
                self.jj.add(i, i, shift);
            }
            if mat_inverse(&mut self.jj_inv, &self.jj).is_err() {
                return false;
            }
        }

        // g̃ₖ = J̃⁻¹ d̃ₖ
        let mut gg = vec![0.0; nnode * ndim];
        for k in 0..nnode {
            res.weights[k] = self.ww[k];
            let d = &self.dd[k * ndim..(k + 1) * ndim];
            for i in 0..ndim {
                let mut gi = 0.0;
                for j in 0..ndim {
                    gi += self.jj_inv.get(i, j) * d[j];
                }
                gg[k * ndim + i] = gi;
                res.gradients.set(k, i, self.ww[k] * gi / h);
            }
        }
        if !res.weights.as_data().iter().all(|w| w.is_finite()) {
            return false;
        }

        if let Some(hessians) = res.hessians.as_mut() {
            // T[m][a][b] = Σⱼ wⱼ d̃ⱼₘ g̃ⱼₐ g̃ⱼᵦ
            let mut tt = [[[0.0; 3]; 3]; 3];
            for j in 0..nnode {
                let d = &self.dd[j * ndim..(j + 1) * ndim];
                let g = &gg[j * ndim..(j + 1) * ndim];
                for m in 0..ndim {
                    for a in 0..ndim {
                        for b in 0..ndim {
                            tt[m][a][b] += self.ww[j] * d[m] * g[a] * g[b];
                        }
                    }
                }
            }
            let h2 = h * h;
            for k in 0..nnode {
                let g = &gg[k * ndim..(k + 1) * ndim];
                for a in 0..ndim {
                    for b in 0..ndim {
                        let mut middle = 0.0;
                        for m in 0..ndim {
                            middle += g[m] * tt[m][a][b];
                        }
                        let value = self.ww[k] * (g[a] * g[b] - middle - self.jj_inv.get(a, b)) / h2;
                        hessians[k].set(a, b, value);
                    }
                }
            }
        }
        true
    }
}

/// Computes the weights and returns ln Z
///
/// Uses the shift by the largest exponent to avoid overflow.
fn log_partition(dd: &[f64], ndim: usize, bt: f64, lambda: &[f64], ww: &mut [f64]) -> f64 {
    let mut f_max = f64::NEG_INFINITY;
    for k in 0..ww.len() {
        let d = &dd[k * ndim..(k + 1) * ndim];
        let mut f = 0.0;
        for i in 0..ndim {
            f += d[i] * (lambda[i] - bt * d[i]);
        }
        ww[k] = f;
        f_max = f64::max(f_max, f);
    }
    let mut z = 0.0;
    for w in ww.iter_mut() {
        *w = f64::exp(*w - f_max);
        z += *w;
    }
    for w in ww.iter_mut() {
        *w /= z;
    }
    f_max + f64::ln(z)
}

/// Computes the residual r = Σ wᵢ dᵢ and the Jacobian J = Σ wᵢ dᵢ⊗dᵢ - r⊗r
fn moments(dd: &[f64], ndim: usize, ww: &[f64], rr: &mut [f64; 3], jj: &mut Matrix) {
    rr.fill(0.0);
    jj.fill(0.0);
    for k in 0..ww.len() {
        let d = &dd[k * ndim..(k + 1) * ndim];
        for i in 0..ndim {
            rr[i] += ww[k] * d[i];
            for j in 0..ndim {
                jj.add(i, j, ww[k] * d[i] * d[j]);
            }
        }
    }
    for i in 0..ndim {
        for j in 0..ndim {
            jj.add(i, j, -rr[i] * rr[j]);
        }
    }
}

/// Computes the 1D residual without allocating
fn residual_1d(dd: &[f64], bt: f64, lambda: f64) -> f64 {
    let f_max = dd.iter().fold(f64::NEG_INFINITY, |acc, d| f64::max(acc, d * (lambda - bt * d)));
    let mut z = 0.0;
    let mut r = 0.0;
    for d in dd {
        let e = f64::exp(d * (lambda - bt * d) - f_max);
        z += e;
        r += e * d;
    }
    r / z
}

#[inline]
fn norm_inf(v: &[f64]) -> f64 {
    v.iter().fold(0.0, |acc, x| f64::max(acc, f64::abs(*x)))
}

#[inline]
fn dot(u: &[f64], v: &[f64]) -> f64 {
    u.iter().zip(v).map(|(a, b)| a * b).sum()
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::MaxEnt;
    use crate::base::{sample_grid_neighborhood, sample_square_with_center, Config, Neighborhood};
    use crate::basis::{BasisOutcome, BasisResult, FailureReason};
    use russell_lab::{approx_eq, deriv1_central5};

    fn check_consistency(res: &BasisResult, neighborhood: &Neighborhood, x: &[f64], tol: f64) {
        approx_eq(res.sum_weights(), 1.0, 1e-10);
        for w in res.weights.as_data() {
            assert!(*w >= 0.0);
        }
        let xx = res.reproduce(neighborhood);
        for i in 0..x.len() {
            approx_eq(xx[i], x[i], tol);
        }
    }

    #[test]
    fn captures_errors() {
        let config = Config::new(2);
        let mut solver = MaxEnt::new(&config);
        let empty = Neighborhood::new(2);
        assert_eq!(
            solver.compute(&[0.0, 0.0], &empty, 1.0, None).err(),
            Some("neighborhood must not be empty")
        );
        let neighborhood = sample_square_with_center();
        assert_eq!(
            solver.compute(&[0.0], &neighborhood, 1.0, None).err(),
            Some("x must have at least ndim components")
        );
        assert_eq!(
            solver.compute(&[0.5, 0.5], &neighborhood, -1.0, None).err(),
            Some("beta must be finite and non-negative")
        );
        let wrong = Neighborhood::new(3);
        assert_eq!(
            solver.compute(&[0.5, 0.5], &wrong, 1.0, None).err(),
            Some("neighborhood ndim is incompatible with the configuration")
        );
    }

    #[test]
    fn square_with_center_works() {
        let config = Config::new(2);
        let mut solver = MaxEnt::new(&config);
        let neighborhood = sample_square_with_center();
        let x = [0.5, 0.5];
        let outcome = solver.compute(&x, &neighborhood, 1.0, None).unwrap();
        let res = match outcome {
            BasisOutcome::Converged(res) => res,
            _ => panic!("should converge"),
        };
        check_consistency(&res, &neighborhood, &x, 1e-12);
        let center = res.weight(4).unwrap();
        let corner = res.weight(0).unwrap();
        assert!(center > corner);
        for id in 1..4 {
            approx_eq(res.weight(id).unwrap(), corner, 1e-15);
        }
        // w ∝ exp(-β |d|²) with λ = 0
        approx_eq(corner / center, f64::exp(-0.5), 1e-14);
        approx_eq(res.lambda[0], 0.0, 1e-14);
        approx_eq(res.lambda[1], 0.0, 1e-14);
    }

    #[test]
    fn two_nodes_1d_reproduce_linear_interpolation() {
        let config = Config::new(1);
        let mut solver = MaxEnt::new(&config);
        let mut neighborhood = Neighborhood::new(1);
        neighborhood.push(0, &[0.0]);
        neighborhood.push(1, &[1.0]);
        for beta in [0.0, 1.0, 10.0] {
            let outcome = solver.compute(&[0.3], &neighborhood, beta, None).unwrap();
            let res = match outcome {
                BasisOutcome::Converged(res) => res,
                _ => panic!("should converge"),
            };
            approx_eq(res.weights[0], 0.7, 1e-12);
            approx_eq(res.weights[1], 0.3, 1e-12);
            approx_eq(res.gradients.get(0, 0), -1.0, 1e-10);
            approx_eq(res.gradients.get(1, 0), 1.0, 1e-10);
        }
    }

    #[test]
    fn many_nodes_1d_work() {
        let config = Config::new(1);
        let mut solver = MaxEnt::new(&config);
        let neighborhood = sample_grid_neighborhood(1, 6, 0.2);
        for x in [0.05, 0.33, 0.5, 0.91] {
            let outcome = solver.compute(&[x], &neighborhood, 25.0, None).unwrap();
            assert!(matches!(outcome, BasisOutcome::Converged(..)));
            let res = outcome.result().unwrap();
            check_consistency(res, &neighborhood, &[x], 1e-12);
            approx_eq(res.reproduce_gradient(&neighborhood).get(0, 0), 1.0, 1e-10);
        }
    }

    #[test]
    fn warm_start_reduces_iterations() {
        let config = Config::new(2);
        let mut solver = MaxEnt::new(&config);
        let neighborhood = sample_grid_neighborhood(2, 4, 1.0);
        let x = [0.7, 1.9];
        let res = solver.compute(&x, &neighborhood, 1.8, None).unwrap().into_result().unwrap();
        let n_cold = solver.n_newton_iter;
        assert!(n_cold > 0);
        let res_warm = solver
            .compute(&x, &neighborhood, 1.8, Some(&res.lambda))
            .unwrap()
            .into_result()
            .unwrap();
        assert!(solver.n_newton_iter < n_cold);
        for k in 0..res.nnode() {
            approx_eq(res_warm.weights[k], res.weights[k], 1e-12);
        }
    }

    #[test]
    fn grid_3d_works() {
        let config = Config::new(3);
        let mut solver = MaxEnt::new(&config);
        let neighborhood = sample_grid_neighborhood(3, 3, 0.5);
        let x = [0.4, 0.6, 0.35];
        let outcome = solver.compute(&x, &neighborhood, 4.0, None).unwrap();
        assert!(matches!(outcome, BasisOutcome::Converged(..)));
        let res = outcome.result().unwrap();
        check_consistency(res, &neighborhood, &x, 1e-12);
        let gg = res.reproduce_gradient(&neighborhood);
        for i in 0..3 {
            for j in 0..3 {
                approx_eq(gg.get(i, j), if i == j { 1.0 } else { 0.0 }, 1e-10);
            }
        }
    }

    #[test]
    fn locality_increases_with_beta() {
        let config = Config::new(2);
        let mut solver = MaxEnt::new(&config);
        let neighborhood = sample_grid_neighborhood(2, 4, 1.0);
        let x = [1.2, 1.4];
        // nearest: (1,1) = id 5; farthest: (3,3) = id 15
        let mut previous = 0.0;
        for beta in [0.5, 1.0, 2.0, 4.0] {
            let res = solver.compute(&x, &neighborhood, beta, None).unwrap().into_result().unwrap();
            check_consistency(&res, &neighborhood, &x, 1e-12);
            let ratio = res.weight(5).unwrap() / res.weight(15).unwrap();
            assert!(ratio > previous);
            previous = ratio;
        }
    }

    #[test]
    fn gradients_match_numerical_derivatives() {
        let mut config = Config::new(2);
        config.set_hessian(true).unwrap();
        let mut solver = MaxEnt::new(&config);
        let neighborhood = sample_grid_neighborhood(2, 4, 1.0);
        let x = [1.3, 1.6];
        let beta = 1.8;
        let res = solver.compute(&x, &neighborhood, beta, None).unwrap().into_result().unwrap();
        struct Args {
            solver: MaxEnt,
            neighborhood: Neighborhood,
            x: Vec<f64>,
        }
        let mut args = Args {
            solver: MaxEnt::new(&config),
            neighborhood,
            x: x.to_vec(),
        };
        let hessians = res.hessians.as_ref().unwrap();
        for k in 0..res.nnode() {
            for j in 0..2 {
                let at_x = x[j];
                let num = deriv1_central5(at_x, &mut args, |v, a| {
                    let mut xx = a.x.clone();
                    xx[j] = v;
                    let r = a.solver.compute(&xx, &a.neighborhood, beta, None)?.into_result()?;
                    Ok(r.weights[k])
                })
                .unwrap();
                approx_eq(res.gradients.get(k, j), num, 1e-8);
                for i in 0..2 {
                    let num = deriv1_central5(at_x, &mut args, |v, a| {
                        let mut xx = a.x.clone();
                        xx[j] = v;
                        let r = a.solver.compute(&xx, &a.neighborhood, beta, None)?.into_result()?;
                        Ok(r.gradients.get(k, i))
                    })
                    .unwrap();
                    approx_eq(hessians[k].get(i, j), num, 1e-7);
                }
            }
        }
    }

    #[test]
    fn hessians_sum_to_zero() {
        let mut config = Config::new(3);
        config.set_hessian(true).unwrap();
        let mut solver = MaxEnt::new(&config);
        let neighborhood = sample_grid_neighborhood(3, 3, 1.0);
        let res = solver
            .compute(&[0.9, 1.1, 0.8], &neighborhood, 1.0, None)
            .unwrap()
            .into_result()
            .unwrap();
        let hessians = res.hessians.as_ref().unwrap();
        for a in 0..3 {
            for b in 0..3 {
                let sum: f64 = hessians.iter().map(|h| h.get(a, b)).sum();
                approx_eq(sum, 0.0, 1e-9);
                approx_eq(hessians[4].get(a, b), hessians[4].get(b, a), 1e-12);
            }
        }
    }

    #[test]
    fn collinear_nodes_use_the_regularized_solver() {
        let config = Config::new(2);
        let mut solver = MaxEnt::new(&config);
        let mut neighborhood = Neighborhood::new(2);
        neighborhood.push(0, &[0.0, 0.0]);
        neighborhood.push(1, &[1.0, 1.0]);
        neighborhood.push(2, &[2.0, 2.0]);
        let x = [0.8, 0.8];
        let outcome = solver.compute(&x, &neighborhood, 1.0, None).unwrap();
        let res = match outcome {
            BasisOutcome::Regularized(res) => res,
            _ => panic!("should use the regularized solver"),
        };
        assert!(solver.n_simplex_iter > 0);
        check_consistency(&res, &neighborhood, &x, 1e-6);
        assert!(res.weight(1).unwrap() > res.weight(2).unwrap());
    }

    #[test]
    fn point_outside_the_hull_fails() {
        let config = Config::new(2);
        let mut solver = MaxEnt::new(&config);
        let mut neighborhood = Neighborhood::new(2);
        neighborhood.push(0, &[0.0, 0.0]);
        neighborhood.push(1, &[1.0, 0.0]);
        neighborhood.push(2, &[0.0, 1.0]);
        let outcome = solver.compute(&[2.0, 2.0], &neighborhood, 1.0, None).unwrap();
        assert_eq!(outcome.status(), crate::basis::SolveStatus::Failed(FailureReason::NotConverged));
    }

    #[test]
    fn coincident_nodes_give_equal_weights() {
        let config = Config::new(2);
        let mut solver = MaxEnt::new(&config);
        let mut neighborhood = Neighborhood::new(2);
        neighborhood.push(3, &[1.0, 1.0]);
        neighborhood.push(4, &[1.0, 1.0]);
        let res = solver.compute(&[1.0, 1.0], &neighborhood, 1.0, None).unwrap();
        assert!(matches!(res, BasisOutcome::Regularized(..)));
        let res = res.into_result().unwrap();
        assert_eq!(res.weights.as_data(), &[0.5, 0.5]);
    }
}
