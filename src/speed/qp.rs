//! Box-constrained convex QP solver.
//!
//! Solves `min 0.5 x'Px + q'x  subject to  l <= Ax <= u` with the
//! operator-splitting (ADMM) iteration: the regularized KKT system is
//! factored once, then each iteration alternates a linear solve with a
//! projection onto the constraint box. Equality rows (where `l == u`) get a
//! heavier penalty weight so they tighten quickly.

use nalgebra::{DMatrix, DVector};

/// Problem data: `min 0.5 x'Px + q'x  s.t.  l <= Ax <= u`.
#[derive(Clone, Debug)]
pub struct QpProblem {
    pub hessian: DMatrix<f64>,
    pub gradient: DVector<f64>,
    pub constraints: DMatrix<f64>,
    pub lower: DVector<f64>,
    pub upper: DVector<f64>,
}

/// Iteration controls.
///
/// Residuals are tested against `eps_abs + eps_rel * scale`, where the
/// scale is the infinity norm of the quantities entering each residual.
#[derive(Clone, Debug)]
pub struct QpSettings {
    pub max_iterations: usize,
    pub eps_abs: f64,
    pub eps_rel: f64,
    /// Base constraint penalty.
    pub rho: f64,
    /// Proximal regularization.
    pub sigma: f64,
}

impl Default for QpSettings {
    fn default() -> Self {
        Self {
            max_iterations: 6000,
            eps_abs: 1e-5,
            eps_rel: 1e-5,
            rho: 0.1,
            sigma: 1e-6,
        }
    }
}

/// Equality rows are penalized this much harder than inequality rows.
const EQUALITY_RHO_SCALE: f64 = 1e3;

/// Solve the QP. Returns `None` when the iteration does not reach the
/// requested tolerances within the iteration budget.
pub fn solve(problem: &QpProblem, settings: &QpSettings) -> Option<DVector<f64>> {
    let n = problem.hessian.nrows();
    let m = problem.constraints.nrows();
    debug_assert_eq!(problem.hessian.ncols(), n);
    debug_assert_eq!(problem.constraints.ncols(), n);
    debug_assert_eq!(problem.lower.len(), m);
    debug_assert_eq!(problem.upper.len(), m);

    // Per-row penalties: equality rows are stiffer.
    let mut rho = DVector::from_element(m, settings.rho);
    for i in 0..m {
        if (problem.upper[i] - problem.lower[i]).abs() < 1e-10 {
            rho[i] = settings.rho * EQUALITY_RHO_SCALE;
        }
    }

    // K = P + sigma I + A' diag(rho) A, factored once.
    let a = &problem.constraints;
    let mut weighted_a = a.clone();
    for i in 0..m {
        for j in 0..n {
            weighted_a[(i, j)] *= rho[i];
        }
    }
    let mut kkt = problem.hessian.clone() + a.transpose() * &weighted_a;
    for i in 0..n {
        kkt[(i, i)] += settings.sigma;
    }
    let factorization = kkt.lu();

    let mut x: DVector<f64> = DVector::zeros(n);
    let mut z: DVector<f64> = DVector::zeros(m);
    let mut y: DVector<f64> = DVector::zeros(m);

    // Clamp the initial z into the box.
    for i in 0..m {
        z[i] = z[i].clamp(problem.lower[i], problem.upper[i]);
    }

    for iteration in 0..settings.max_iterations {
        // x-update: (P + sigma I + A' R A) x = sigma x_prev - q + A'(R z - y)
        let mut rz_minus_y = z.clone();
        for i in 0..m {
            rz_minus_y[i] = rho[i] * z[i] - y[i];
        }
        let rhs = &x * settings.sigma - &problem.gradient + a.transpose() * rz_minus_y;
        x = factorization.solve(&rhs)?;

        // z-update: project onto the box.
        let ax = a * &x;
        for i in 0..m {
            z[i] = (ax[i] + y[i] / rho[i]).clamp(problem.lower[i], problem.upper[i]);
        }

        // Dual update.
        for i in 0..m {
            y[i] += rho[i] * (ax[i] - z[i]);
        }

        // Convergence test, amortized over iterations.
        if iteration % 25 == 24 || iteration + 1 == settings.max_iterations {
            let primal_residual = (0..m)
                .map(|i| (ax[i] - z[i]).abs())
                .fold(0.0_f64, f64::max);
            let primal_tolerance =
                settings.eps_abs + settings.eps_rel * ax.amax().max(z.amax());

            let px = &problem.hessian * &x;
            let aty = a.transpose() * &y;
            let stationarity = &px + &problem.gradient + &aty;
            let dual_residual = stationarity.amax();
            let dual_tolerance = settings.eps_abs
                + settings.eps_rel
                    * px.amax().max(aty.amax()).max(problem.gradient.amax());

            if primal_residual < primal_tolerance && dual_residual < dual_tolerance {
                return Some(x);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    /// min (x0 - 3)^2 + (x1 + 1)^2 with -2 <= x <= 2.
    #[test]
    fn test_box_constrained_least_squares() {
        let problem = QpProblem {
            hessian: DMatrix::from_diagonal_element(2, 2, 2.0),
            gradient: DVector::from_vec(vec![-6.0, 2.0]),
            constraints: DMatrix::identity(2, 2),
            lower: DVector::from_element(2, -2.0),
            upper: DVector::from_element(2, 2.0),
        };
        let x = solve(&problem, &QpSettings::default()).unwrap();
        // Unconstrained optimum (3, -1); x0 clips to the bound.
        assert!((x[0] - 2.0).abs() < 1e-3);
        assert!((x[1] + 1.0).abs() < 1e-3);
    }

    /// min x'x subject to x0 + x1 = 1: symmetric split.
    #[test]
    fn test_equality_constraint() {
        let problem = QpProblem {
            hessian: DMatrix::from_diagonal_element(2, 2, 2.0),
            gradient: DVector::zeros(2),
            constraints: DMatrix::from_row_slice(1, 2, &[1.0, 1.0]),
            lower: DVector::from_element(1, 1.0),
            upper: DVector::from_element(1, 1.0),
        };
        let x = solve(&problem, &QpSettings::default()).unwrap();
        assert!((x[0] - 0.5).abs() < 1e-3);
        assert!((x[1] - 0.5).abs() < 1e-3);
        assert!((x[0] + x[1] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_infeasible_tolerances_return_none() {
        // Contradictory equality rows cannot converge.
        let problem = QpProblem {
            hessian: DMatrix::from_diagonal_element(1, 1, 2.0),
            gradient: DVector::zeros(1),
            constraints: DMatrix::from_row_slice(2, 1, &[1.0, 1.0]),
            lower: DVector::from_vec(vec![0.0, 1.0]),
            upper: DVector::from_vec(vec![0.0, 1.0]),
        };
        let settings = QpSettings {
            max_iterations: 200,
            ..QpSettings::default()
        };
        assert!(solve(&problem, &settings).is_none());
    }
}
