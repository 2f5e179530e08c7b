use super::{BasisOutcome, BasisResult, FailureReason};
use crate::base::Neighborhood;
use crate::StrError;
use russell_lab::{mat_inverse, mat_norm, Matrix, Norm};

/// Implements the moving least-squares (MLS) basis
///
/// The weights are `φᵢ(x) = Wᵢ(x) p(0)ᵀ A⁻¹ p(yᵢ)` with the moment matrix `A = Σ Wᵢ p(yᵢ) p(yᵢ)ᵀ`,
/// where `yᵢ = (xᵢ - x) / ρ`, ρ is the support radius, and p is the linear or quadratic
/// polynomial basis:
///
/// ```text
/// order 1: p = {1, y₀, y₁, y₂}
/// order 2: p = {1, y₀, y₁, y₂, y₀², y₀y₁, y₀y₂, y₁², y₁y₂, y₂²}
/// ```
///
/// The nodal weight is the cubic spline with s = |yᵢ|:
///
/// ```text
///        ⎧ 2/3 - 4s² + 4s³            if s ≤ ½
/// W(s) = ⎨ 4/3 (1 - s)³               if ½ < s ≤ 1
///        ⎩ 0                          otherwise
/// ```
///
/// **Note:** The MLS weights may be negative and Hessians are not computed.
pub struct Mls {
    ndim: usize,
    order: usize,
    npoly: usize,
    singular_tol: f64,

    /// Moment matrix (npoly, npoly)
    aa: Matrix,

    /// Inverse of the moment matrix (npoly, npoly)
    aa_inv: Matrix,

    /// Derivatives of the moment matrix w.r.t x (ndim) × (npoly, npoly)
    daa: Vec<Matrix>,

    /// Polynomial basis at the nodes (nnode * npoly)
    pp: Vec<f64>,

    /// Nodal weights (nnode)
    ww: Vec<f64>,

    /// Derivatives of the nodal weights w.r.t x (nnode * ndim)
    dww: Vec<f64>,
}

/// Returns the number of terms of the polynomial basis
pub fn mls_npoly(ndim: usize, order: usize) -> usize {
    match order {
        1 => 1 + ndim,
        _ => (ndim + 1) * (ndim + 2) / 2,
    }
}

/// Evaluates the cubic spline weight and its derivative
fn cubic_spline(s: f64) -> (f64, f64) {
    if s <= 0.5 {
        (2.0 / 3.0 - 4.0 * s * s + 4.0 * s * s * s, -8.0 * s + 12.0 * s * s)
    } else if s <= 1.0 {
        let c = 1.0 - s;
        (4.0 / 3.0 * c * c * c, -4.0 * c * c)
    } else {
        (0.0, 0.0)
    }
}

/// Evaluates the polynomial basis at y
fn polynomial(ndim: usize, order: usize, y: &[f64], p: &mut [f64]) {
    p[0] = 1.0;
    for a in 0..ndim {
        p[1 + a] = y[a];
    }
    if order == 2 {
        let mut m = 1 + ndim;
        for a in 0..ndim {
            for b in a..ndim {
                p[m] = y[a] * y[b];
                m += 1;
            }
        }
    }
}

impl Mls {
    /// Allocates a new instance
    pub fn new(ndim: usize, order: usize, singular_tol: f64) -> Result<Self, StrError> {
        if ndim < 1 || ndim > 3 {
            return Err("ndim must be 1, 2, or 3");
        }
        if order < 1 || order > 2 {
            return Err("MLS order must be 1 or 2");
        }
        let npoly = mls_npoly(ndim, order);
        Ok(Mls {
            ndim,
            order,
            npoly,
            singular_tol,
            aa: Matrix::new(npoly, npoly),
            aa_inv: Matrix::new(npoly, npoly),
            daa: vec![Matrix::new(npoly, npoly); ndim],
            pp: Vec::new(),
            ww: Vec::new(),
            dww: Vec::new(),
        })
    }

    /// Returns the number of terms of the polynomial basis
    pub fn npoly(&self) -> usize {
        self.npoly
    }

    /// Computes the weights and gradients at x
    ///
    /// Nodes farther than `radius` from x receive zero weight. Returns `Failed(SingularMoments)`
    /// if the reciprocal condition number of the moment matrix is smaller than `singular_tol`.
    pub fn compute(&mut self, x: &[f64], neighborhood: &Neighborhood, radius: f64) -> Result<BasisOutcome, StrError> {
        let (ndim, npoly) = (self.ndim, self.npoly);
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
        if !radius.is_finite() || radius <= 0.0 {
            return Err("radius must be finite and positive");
        }

        // nodal weights, polynomial basis, and moment matrix
        self.pp.resize(nnode * npoly, 0.0);
        self.ww.resize(nnode, 0.0);
        self.dww.resize(nnode * ndim, 0.0);
        self.aa.fill(0.0);
        for l in 0..ndim {
            self.daa[l].fill(0.0);
        }
        let mut y = [0.0; 3];
        for k in 0..nnode {
            let xk = neighborhood.x(k);
            let mut s2 = 0.0;
            for i in 0..ndim {
                y[i] = (xk[i] - x[i]) / radius;
                s2 += y[i] * y[i];
            }
            let s = f64::sqrt(s2);
            let (w, dw) = cubic_spline(s);
            self.ww[k] = w;
            for l in 0..ndim {
                // ∂s/∂xₗ = -yₗ / (ρ s)
                self.dww[k * ndim + l] = if s > 0.0 { -dw * y[l] / (radius * s) } else { 0.0 };
            }
            let p = &mut self.pp[k * npoly..(k + 1) * npoly];
            polynomial(ndim, self.order, &y[..ndim], p);
            for a in 0..npoly {
                for b in 0..npoly {
                    let ppt = p[a] * p[b];
                    self.aa.add(a, b, w * ppt);
                    for l in 0..ndim {
                        self.daa[l].add(a, b, self.dww[k * ndim + l] * ppt);
                    }
                }
            }
        }

        // inverse and conditioning
        let norm_aa = mat_norm(&self.aa, Norm::One);
        if !(norm_aa > 0.0) || mat_inverse(&mut self.aa_inv, &self.aa).is_err() {
            return Ok(BasisOutcome::Failed(FailureReason::SingularMoments));
        }
        let rcond = 1.0 / (norm_aa * mat_norm(&self.aa_inv, Norm::One));
        if !(rcond >= self.singular_tol) {
            return Ok(BasisOutcome::Failed(FailureReason::SingularMoments));
        }

        // γ = A⁻¹ p(0) and ηₗ = A⁻¹ (∂ₗA) γ
        let gamma: Vec<f64> = (0..npoly).map(|a| self.aa_inv.get(a, 0)).collect();
        let mut eta = vec![vec![0.0; npoly]; ndim];
        let mut tmp = vec![0.0; npoly];
        for l in 0..ndim {
            for a in 0..npoly {
                tmp[a] = (0..npoly).map(|b| self.daa[l].get(a, b) * gamma[b]).sum();
            }
            for a in 0..npoly {
                eta[l][a] = (0..npoly).map(|b| self.aa_inv.get(a, b) * tmp[b]).sum();
            }
        }

        // weights and gradients
        //   ∂ₗφᵢ = Wᵢ (A⁻¹ ∂ₗp(0) - ηₗ)·pᵢ + ∂ₗWᵢ γ·pᵢ   with ∂ₗp(0) = eₗ₊₁ / ρ
        let mut res = BasisResult::new(&neighborhood.ids, ndim, false);
        for k in 0..nnode {
            let p = &self.pp[k * npoly..(k + 1) * npoly];
            let gamma_p: f64 = (0..npoly).map(|a| gamma[a] * p[a]).sum();
            res.weights[k] = self.ww[k] * gamma_p;
            for l in 0..ndim {
                let mut c = 0.0;
                for a in 0..npoly {
                    c += (self.aa_inv.get(a, 1 + l) / radius - eta[l][a]) * p[a];
                }
                res.gradients.set(k, l, self.ww[k] * c + self.dww[k * ndim + l] * gamma_p);
            }
        }
        Ok(BasisOutcome::Converged(res))
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
