use crate::StrError;

/// Implements the Nelder-Mead (downhill simplex) minimizer
///
/// Uses the standard coefficients: reflection = 1, expansion = 2, contraction = ½, and shrink = ½.
///
/// The iterations stop when the spread of the function values over the simplex satisfies
/// `|f_worst - f_best| ≤ tol · (1 + |f_best|)`.
#[derive(Clone, Debug)]
pub struct NelderMead {
    /// Convergence tolerance on the spread of function values
    pub tol: f64,

    /// Maximum number of iterations
    pub max_iter: usize,

    /// Edge length of the initial simplex
    pub step: f64,
}

/// Holds the results of the minimization
#[derive(Clone, Debug)]
pub struct NelderMeadOutput {
    /// Best point found
    pub x: Vec<f64>,

    /// Function value at the best point
    pub f: f64,

    /// Number of iterations
    pub n_iter: usize,

    /// Number of function evaluations
    pub n_eval: usize,

    /// Indicates that the tolerance was reached
    pub converged: bool,
}

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

impl NelderMead {
    /// Allocates a new instance
    pub fn new(tol: f64, max_iter: usize, step: f64) -> Self {
        NelderMead { tol, max_iter, step }
    }

    /// Minimizes f(x) starting from x0
    ///
    /// Non-finite function values are treated as +∞.
    pub fn minimize<F>(&self, x0: &[f64], mut f: F) -> Result<NelderMeadOutput, StrError>
    where
        F: FnMut(&[f64]) -> f64,
    {
        let n = x0.len();
        if n == 0 {
            return Err("x0 must not be empty");
        }
        if self.step <= 0.0 {
            return Err("the simplex step must be positive");
        }
        let mut n_eval = 0;
        let mut eval = |x: &[f64]| {
            n_eval += 1;
            let v = f(x);
            if v.is_finite() {
                v
            } else {
                f64::INFINITY
            }
        };

        // initial simplex
        let mut vertices: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
        vertices.push(x0.to_vec());
        for k in 0..n {
            let mut v = x0.to_vec();
            v[k] += self.step;
            vertices.push(v);
        }
        let mut values: Vec<f64> = vertices.iter().map(|v| eval(v)).collect();

        let mut centroid = vec![0.0; n];
        let mut trial = vec![0.0; n];
        let mut other = vec![0.0; n];
        let mut order: Vec<usize> = (0..=n).collect();
        let mut converged = false;
        let mut n_iter = 0;

        while n_iter < self.max_iter {
            // sort: best first, worst last
            order.sort_by(|a, b| values[*a].total_cmp(&values[*b]));
            let best = order[0];
            let worst = order[n];
            let second_worst = order[n - 1];
            if f64::abs(values[worst] - values[best]) <= self.tol * (1.0 + f64::abs(values[best])) {
                converged = true;
                break;
            }
            n_iter += 1;

            // centroid of all vertices but the worst
            centroid.fill(0.0);
            for &v in &order[..n] {
                for k in 0..n {
                    centroid[k] += vertices[v][k] / (n as f64);
                }
            }

            // reflection
            for k in 0..n {
                trial[k] = centroid[k] + REFLECTION * (centroid[k] - vertices[worst][k]);
            }
            let f_reflect = eval(&trial);

            if f_reflect < values[best] {
                // expansion
                for k in 0..n {
                    other[k] = centroid[k] + EXPANSION * (trial[k] - centroid[k]);
                }
                let f_expand = eval(&other);
                if f_expand < f_reflect {
                    vertices[worst].copy_from_slice(&other);
                    values[worst] = f_expand;
                } else {
                    vertices[worst].copy_from_slice(&trial);
                    values[worst] = f_reflect;
                }
                continue;
            }

            if f_reflect < values[second_worst] {
                vertices[worst].copy_from_slice(&trial);
                values[worst] = f_reflect;
                continue;
            }

            // contraction (outside if the reflected point improves on the worst; inside otherwise)
            let outside = f_reflect < values[worst];
            for k in 0..n {
                other[k] = if outside {
                    centroid[k] + CONTRACTION * (trial[k] - centroid[k])
                } else {
                    centroid[k] + CONTRACTION * (vertices[worst][k] - centroid[k])
                };
            }
            let f_contract = eval(&other);
            let accept = if outside {
                f_contract <= f_reflect
            } else {
                f_contract < values[worst]
            };
            if accept {
                vertices[worst].copy_from_slice(&other);
                values[worst] = f_contract;
                continue;
            }

            // shrink toward the best vertex
            for &v in &order[1..] {
                for k in 0..n {
                    vertices[v][k] = vertices[best][k] + SHRINK * (vertices[v][k] - vertices[best][k]);
                }
                values[v] = eval(&vertices[v]);
            }
        }

        let best = (0..=n).fold(0, |b, i| if values[i] < values[b] { i } else { b });
        Ok(NelderMeadOutput {
            x: vertices[best].clone(),
            f: values[best],
            n_iter,
            n_eval,
            converged,
        })
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::NelderMead;
    use russell_lab::approx_eq;

    #[test]
    fn captures_errors() {
        let solver = NelderMead::new(1e-10, 100, 0.5);
        assert_eq!(solver.minimize(&[], |_| 0.0).err(), Some("x0 must not be empty"));
        let solver = NelderMead::new(1e-10, 100, 0.0);
        assert_eq!(
            solver.minimize(&[0.0], |_| 0.0).err(),
            Some("the simplex step must be positive")
        );
    }

    #[test]
    fn minimize_works_1d() {
        let solver = NelderMead::new(1e-15, 500, 0.5);
        let out = solver.minimize(&[3.0], |x| (x[0] - 1.0) * (x[0] - 1.0) + 2.0).unwrap();
        assert!(out.converged);
        approx_eq(out.x[0], 1.0, 1e-6);
        approx_eq(out.f, 2.0, 1e-12);
    }

    #[test]
    fn minimize_works_quadratic_3d() {
        let solver = NelderMead::new(1e-15, 5000, 0.5);
        let out = solver
            .minimize(&[0.0, 0.0, 0.0], |x| {
                (x[0] - 1.0).powi(2) + 2.0 * (x[1] + 2.0).powi(2) + 3.0 * (x[2] - 0.5).powi(2)
            })
            .unwrap();
        assert!(out.converged);
        approx_eq(out.x[0], 1.0, 1e-5);
        approx_eq(out.x[1], -2.0, 1e-5);
        approx_eq(out.x[2], 0.5, 1e-5);
        assert!(out.n_eval > out.n_iter);
    }

    #[test]
    fn minimize_works_rosenbrock() {
        let solver = NelderMead::new(1e-15, 5000, 0.5);
        let out = solver
            .minimize(&[-1.2, 1.0], |x| {
                100.0 * (x[1] - x[0] * x[0]).powi(2) + (1.0 - x[0]).powi(2)
            })
            .unwrap();
        assert!(out.converged);
        approx_eq(out.x[0], 1.0, 1e-4);
        approx_eq(out.x[1], 1.0, 1e-4);
    }

    #[test]
    fn minimize_handles_non_finite_values() {
        let solver = NelderMead::new(1e-15, 1000, 2.0);
        // log barrier: undefined for x ≤ 0 (the first reflection lands at x = -1.5)
        let out = solver.minimize(&[0.5], |x| x[0] - f64::ln(x[0])).unwrap();
        assert!(out.converged);
        approx_eq(out.x[0], 1.0, 1e-5);
    }

    #[test]
    fn minimize_stops_at_max_iter() {
        let solver = NelderMead::new(1e-15, 3, 0.5);
        let out = solver.minimize(&[10.0, 10.0], |x| x[0] * x[0] + x[1] * x[1]).unwrap();
        assert!(!out.converged);
        assert_eq!(out.n_iter, 3);
    }
}
