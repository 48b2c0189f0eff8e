//! Piecewise-jerk speed optimization problem.
//!
//! Decision variables are `(s, s', s'')` at uniformly spaced time knots,
//! linked by constant-jerk dynamics between knots. The assembled QP is
//! handed to the box-constrained solver in [`super::qp`].

use super::qp::{self, QpProblem, QpSettings};
use nalgebra::{DMatrix, DVector};

/// Builder for the speed QP over `num_knots` states at spacing `dt`.
pub struct PiecewiseJerkSpeedProblem {
    num_knots: usize,
    dt: f64,
    init: [f64; 3],
    x_bounds: Vec<(f64, f64)>,
    dx_bounds: Vec<(f64, f64)>,
    ddx_bounds: Vec<(f64, f64)>,
    dddx_bound: f64,
    weight_x_ref: f64,
    x_ref: Vec<f64>,
    weight_dx_ref: f64,
    dx_ref: f64,
    weight_ddx: f64,
    weight_dddx: f64,
}

/// Optimized knot states.
pub struct SpeedSolution {
    pub s: Vec<f64>,
    pub ds: Vec<f64>,
    pub dds: Vec<f64>,
}

impl PiecewiseJerkSpeedProblem {
    /// Create a problem with free bounds and zero weights.
    ///
    /// `init` is the fixed initial state `(s, s', s'')`.
    pub fn new(num_knots: usize, dt: f64, init: [f64; 3]) -> Self {
        debug_assert!(num_knots >= 2);
        debug_assert!(dt > 0.0);
        Self {
            num_knots,
            dt,
            init,
            x_bounds: vec![(f64::NEG_INFINITY, f64::INFINITY); num_knots],
            dx_bounds: vec![(f64::NEG_INFINITY, f64::INFINITY); num_knots],
            ddx_bounds: vec![(f64::NEG_INFINITY, f64::INFINITY); num_knots],
            dddx_bound: f64::INFINITY,
            weight_x_ref: 0.0,
            x_ref: vec![0.0; num_knots],
            weight_dx_ref: 0.0,
            dx_ref: 0.0,
            weight_ddx: 0.0,
            weight_dddx: 0.0,
        }
    }

    pub fn set_x_bounds(&mut self, bounds: Vec<(f64, f64)>) {
        debug_assert_eq!(bounds.len(), self.num_knots);
        self.x_bounds = bounds;
    }

    pub fn set_dx_bounds(&mut self, bounds: Vec<(f64, f64)>) {
        debug_assert_eq!(bounds.len(), self.num_knots);
        self.dx_bounds = bounds;
    }

    pub fn set_ddx_bounds(&mut self, bounds: Vec<(f64, f64)>) {
        debug_assert_eq!(bounds.len(), self.num_knots);
        self.ddx_bounds = bounds;
    }

    pub fn set_dddx_bound(&mut self, bound: f64) {
        self.dddx_bound = bound;
    }

    /// Track per-knot position references with the given weight.
    pub fn set_x_ref(&mut self, weight: f64, x_ref: Vec<f64>) {
        debug_assert_eq!(x_ref.len(), self.num_knots);
        self.weight_x_ref = weight;
        self.x_ref = x_ref;
    }

    /// Track a constant velocity reference with the given weight.
    pub fn set_dx_ref(&mut self, weight: f64, dx_ref: f64) {
        self.weight_dx_ref = weight;
        self.dx_ref = dx_ref;
    }

    pub fn set_weight_ddx(&mut self, weight: f64) {
        self.weight_ddx = weight;
    }

    pub fn set_weight_dddx(&mut self, weight: f64) {
        self.weight_dddx = weight;
    }

    /// Assemble and solve. `None` when the solver fails to converge.
    pub fn optimize(&self) -> Option<SpeedSolution> {
        let n = self.num_knots;
        let dt = self.dt;
        let num_vars = 3 * n;
        let num_constraints = 3 * (n - 1) + num_vars;

        // Objective.
        let mut hessian = DMatrix::<f64>::zeros(num_vars, num_vars);
        let mut gradient = DVector::<f64>::zeros(num_vars);
        for k in 0..n {
            if self.weight_x_ref > 0.0 {
                hessian[(k, k)] += 2.0 * self.weight_x_ref;
                gradient[k] += -2.0 * self.weight_x_ref * self.x_ref[k];
            }
            if self.weight_dx_ref > 0.0 {
                hessian[(n + k, n + k)] += 2.0 * self.weight_dx_ref;
                gradient[n + k] += -2.0 * self.weight_dx_ref * self.dx_ref;
            }
            hessian[(2 * n + k, 2 * n + k)] += 2.0 * self.weight_ddx;
        }
        let jerk_scale = 2.0 * self.weight_dddx / (dt * dt);
        for k in 0..n - 1 {
            let (i, j) = (2 * n + k, 2 * n + k + 1);
            hessian[(i, i)] += jerk_scale;
            hessian[(j, j)] += jerk_scale;
            hessian[(i, j)] -= jerk_scale;
            hessian[(j, i)] -= jerk_scale;
        }

        // Constraints: dynamics, jerk bounds, then variable boxes.
        let mut constraints = DMatrix::<f64>::zeros(num_constraints, num_vars);
        let mut lower = DVector::<f64>::zeros(num_constraints);
        let mut upper = DVector::<f64>::zeros(num_constraints);
        let mut row = 0;

        // s_{k+1} = s_k + s'_k dt + s''_k dt^2/3 + s''_{k+1} dt^2/6
        for k in 0..n - 1 {
            constraints[(row, k + 1)] = 1.0;
            constraints[(row, k)] = -1.0;
            constraints[(row, n + k)] = -dt;
            constraints[(row, 2 * n + k)] = -dt * dt / 3.0;
            constraints[(row, 2 * n + k + 1)] = -dt * dt / 6.0;
            lower[row] = 0.0;
            upper[row] = 0.0;
            row += 1;
        }

        // s'_{k+1} = s'_k + (s''_k + s''_{k+1}) dt / 2
        for k in 0..n - 1 {
            constraints[(row, n + k + 1)] = 1.0;
            constraints[(row, n + k)] = -1.0;
            constraints[(row, 2 * n + k)] = -0.5 * dt;
            constraints[(row, 2 * n + k + 1)] = -0.5 * dt;
            lower[row] = 0.0;
            upper[row] = 0.0;
            row += 1;
        }

        // |s''_{k+1} - s''_k| <= jerk_max dt
        for k in 0..n - 1 {
            constraints[(row, 2 * n + k + 1)] = 1.0;
            constraints[(row, 2 * n + k)] = -1.0;
            lower[row] = -self.dddx_bound * dt;
            upper[row] = self.dddx_bound * dt;
            row += 1;
        }

        // Variable boxes; the first knot is pinned to the initial state.
        for k in 0..n {
            constraints[(row, k)] = 1.0;
            let (lo, hi) = if k == 0 {
                (self.init[0], self.init[0])
            } else {
                self.x_bounds[k]
            };
            lower[row] = lo;
            upper[row] = hi;
            row += 1;
        }
        for k in 0..n {
            constraints[(row, n + k)] = 1.0;
            let (lo, hi) = if k == 0 {
                (self.init[1], self.init[1])
            } else {
                self.dx_bounds[k]
            };
            lower[row] = lo;
            upper[row] = hi;
            row += 1;
        }
        for k in 0..n {
            constraints[(row, 2 * n + k)] = 1.0;
            let (lo, hi) = if k == 0 {
                (self.init[2], self.init[2])
            } else {
                self.ddx_bounds[k]
            };
            lower[row] = lo;
            upper[row] = hi;
            row += 1;
        }
        debug_assert_eq!(row, num_constraints);

        let problem = QpProblem {
            hessian,
            gradient,
            constraints,
            lower,
            upper,
        };
        let solution = qp::solve(&problem, &QpSettings::default())?;

        let mut s: Vec<f64> = (0..n).map(|k| solution[k]).collect();
        let mut ds: Vec<f64> = (0..n).map(|k| solution[n + k]).collect();
        let dds: Vec<f64> = (0..n).map(|k| solution[2 * n + k]).collect();

        // Scrub solver dust: the speed table downstream requires a
        // nonnegative, monotone profile.
        for v in ds.iter_mut() {
            *v = v.max(0.0);
        }
        for k in 1..n {
            if s[k] < s[k - 1] {
                s[k] = s[k - 1];
            }
        }

        Some(SpeedSolution { s, ds, dds })
    }
}
