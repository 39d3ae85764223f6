//! # Bound-constrained nonlinear minimisation
//!
//! Provides the numerical optimisation capability used by the control
//! modules. An [`Objective`] exposes its cost generically over dual numbers,
//! so the solver differentiates it by forward-mode automatic
//! differentiation. The gradient is exact for whatever expressions the
//! objective evaluates, there is no hand-derived Jacobian to drift out of
//! sync with the model.
//!
//! The method is projected gradient descent with Barzilai-Borwein step
//! lengths, safeguarded by an Armijo backtracking line search. Decision
//! variables are kept inside their box bounds by projection, and
//! convergence is declared when either the projected gradient is below
//! tolerance (first-order stationarity) or an accepted step no longer
//! produces a meaningful cost decrease. Exhausting the iteration budget
//! without meeting either criterion is a [`SolveError::NoConvergence`].

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use num_dual::{Dual64, DualNum};
use thiserror::Error;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Armijo sufficient-decrease coefficient.
const ARMIJO_COEFF: f64 = 1e-4;

/// Factor applied to the step length when a trial point is rejected.
const STEP_SHRINK: f64 = 0.5;

/// Initial line search step length, used until curvature information is
/// available.
const STEP_INIT: f64 = 1.0;

/// Step length below which no representable descent remains.
const STEP_MIN: f64 = 1e-14;

/// Bracket on the Barzilai-Borwein step estimate.
const BB_STEP_MIN: f64 = 1e-10;
const BB_STEP_MAX: f64 = 1e8;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A scalar objective function over a fixed number of decision variables.
pub trait Objective {
    /// Number of decision variables.
    fn dim(&self) -> usize;

    /// Evaluate the cost at `u`.
    ///
    /// Implementations must be generic over the scalar type so that the
    /// solver can evaluate them with dual numbers to obtain derivatives.
    fn cost<T: DualNum<f64> + Copy>(&self, u: &[T]) -> T;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Box bounds on the decision variables.
#[derive(Debug, Clone)]
pub struct Bounds {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

/// Solver settings.
#[derive(Debug, Clone, Copy)]
pub struct Settings {
    /// Maximum number of gradient iterations (the solve budget).
    pub max_iter: usize,

    /// Relative cost-decrease below which an accepted step counts as
    /// converged.
    pub cost_tol: f64,

    /// Infinity-norm of the projected gradient below which the current
    /// point counts as stationary.
    pub grad_tol: f64,
}

/// A locally optimal feasible point.
#[derive(Debug, Clone)]
pub struct Solution {
    /// The decision variables at the solution.
    pub u: Vec<f64>,

    /// Cost at the solution.
    pub cost: f64,

    /// Number of iterations taken.
    pub iters: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors produced by the solver.
#[derive(Debug, Error)]
pub enum SolveError {
    #[error(
        "Dimension mismatch: objective has {expected} variables but got \
         {got} initial values/bounds"
    )]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Infeasible bounds: lower exceeds upper at variable {index}")]
    Infeasible { index: usize },

    #[error("No convergence after {iters} iterations (last cost {last_cost:.6e})")]
    NoConvergence { iters: usize, last_cost: f64 },
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Minimise the objective over its box bounds, starting from `u0`.
///
/// Returns a feasible point satisfying the convergence criteria in
/// `settings`, or [`SolveError::NoConvergence`] if the iteration budget is
/// exhausted first. The initial point is projected into the bounds before
/// the first evaluation.
pub fn minimise<O: Objective>(
    obj: &O,
    u0: &[f64],
    bounds: &Bounds,
    settings: &Settings,
) -> Result<Solution, SolveError> {
    let n = obj.dim();

    // Validate dimensions and bound ordering
    if u0.len() != n || bounds.lower.len() != n || bounds.upper.len() != n {
        return Err(SolveError::DimensionMismatch {
            expected: n,
            got: u0.len().min(bounds.lower.len()).min(bounds.upper.len()),
        });
    }
    for i in 0..n {
        if bounds.lower[i] > bounds.upper[i] {
            return Err(SolveError::Infeasible { index: i });
        }
    }

    // Project the initial point into the feasible box
    let mut u: Vec<f64> = (0..n)
        .map(|i| u0[i].clamp(bounds.lower[i], bounds.upper[i]))
        .collect();
    let mut cost = obj.cost(u.as_slice());

    let mut grad = vec![0f64; n];
    let mut duals: Vec<Dual64> = Vec::with_capacity(n);
    let mut step = STEP_INIT;

    // Previous accepted point and its gradient, for the Barzilai-Borwein
    // step estimate
    let mut prev: Option<(Vec<f64>, Vec<f64>)> = None;

    for iter in 1..=settings.max_iter {
        gradient(obj, &u, &mut grad, &mut duals);

        // First-order stationarity: the unit-step projected gradient
        let mut pg_norm = 0f64;
        for i in 0..n {
            let moved = (u[i] - grad[i]).clamp(bounds.lower[i], bounds.upper[i]);
            pg_norm = pg_norm.max((u[i] - moved).abs());
        }
        if pg_norm < settings.grad_tol {
            return Ok(Solution { u, cost, iters: iter });
        }

        // Barzilai-Borwein step from the last accepted move, a cheap local
        // curvature estimate
        if let Some((prev_u, prev_grad)) = &prev {
            let mut sy = 0f64;
            let mut ss = 0f64;
            for i in 0..n {
                let du = u[i] - prev_u[i];
                let dg = grad[i] - prev_grad[i];
                sy += du * dg;
                ss += du * du;
            }
            if sy > f64::EPSILON {
                step = (ss / sy).clamp(BB_STEP_MIN, BB_STEP_MAX);
            }
        }

        // Backtracking line search along the projected steepest-descent arc
        let mut accepted = false;
        let mut trial_step = step;
        while trial_step >= STEP_MIN {
            let trial: Vec<f64> = (0..n)
                .map(|i| (u[i] - trial_step * grad[i]).clamp(bounds.lower[i], bounds.upper[i]))
                .collect();
            let trial_cost = obj.cost(trial.as_slice());

            // Sufficient decrease measured against the actual (projected)
            // displacement
            let mut pred_decrease = 0f64;
            for i in 0..n {
                pred_decrease += grad[i] * (u[i] - trial[i]);
            }

            if trial_cost <= cost - ARMIJO_COEFF * pred_decrease {
                let decrease = cost - trial_cost;
                prev = Some((std::mem::replace(&mut u, trial), grad.clone()));
                cost = trial_cost;
                accepted = true;

                if decrease < settings.cost_tol * cost.abs().max(1.0) {
                    return Ok(Solution { u, cost, iters: iter });
                }
                break;
            }

            trial_step *= STEP_SHRINK;
        }

        // No descent representable at this precision: the point is as
        // stationary as it is going to get
        if !accepted {
            return Ok(Solution { u, cost, iters: iter });
        }
    }

    Err(SolveError::NoConvergence {
        iters: settings.max_iter,
        last_cost: cost,
    })
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Evaluate the gradient of the objective at `u` by forward-mode automatic
/// differentiation, one dual-number pass per variable.
fn gradient<O: Objective>(obj: &O, u: &[f64], grad: &mut [f64], duals: &mut Vec<Dual64>) {
    for i in 0..u.len() {
        duals.clear();
        duals.extend(u.iter().map(|&v| Dual64::from_re(v)));
        duals[i] = duals[i].derivative();
        grad[i] = obj.cost(duals.as_slice()).eps;
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    /// Separable quadratic bowl centred on `target`.
    struct Quadratic {
        target: Vec<f64>,
    }

    impl Objective for Quadratic {
        fn dim(&self) -> usize {
            self.target.len()
        }

        fn cost<T: DualNum<f64> + Copy>(&self, u: &[T]) -> T {
            let mut c = T::from(0.0);
            for (i, &ui) in u.iter().enumerate() {
                c = c + (ui - self.target[i]).powi(2);
            }
            c
        }
    }

    /// A smooth non-convex objective used to cross-check the dual-number
    /// gradient against finite differences.
    struct Wavy;

    impl Objective for Wavy {
        fn dim(&self) -> usize {
            2
        }

        fn cost<T: DualNum<f64> + Copy>(&self, u: &[T]) -> T {
            u[0].sin() * u[1].powi(2) + u[0] * 0.5 + (u[1] * 3.0).atan()
        }
    }

    fn wide_bounds(n: usize) -> Bounds {
        Bounds {
            lower: vec![-1e9; n],
            upper: vec![1e9; n],
        }
    }

    #[test]
    fn quadratic_converges_to_minimum() {
        let obj = Quadratic {
            target: vec![1.5, -2.0, 0.25],
        };
        let settings = Settings {
            max_iter: 200,
            cost_tol: 1e-12,
            grad_tol: 1e-8,
        };

        let sol = minimise(&obj, &[0.0; 3], &wide_bounds(3), &settings).unwrap();

        for (ui, ti) in sol.u.iter().zip(obj.target.iter()) {
            assert!((ui - ti).abs() < 1e-6, "u = {:?}", sol.u);
        }
        assert!(sol.cost < 1e-10);
    }

    #[test]
    fn active_bound_is_respected() {
        let obj = Quadratic { target: vec![2.0] };
        let bounds = Bounds {
            lower: vec![-1.0],
            upper: vec![1.0],
        };
        let settings = Settings {
            max_iter: 200,
            cost_tol: 1e-12,
            grad_tol: 1e-8,
        };

        let sol = minimise(&obj, &[0.0], &bounds, &settings).unwrap();

        // Unconstrained minimum is outside the box, solution sits on the bound
        assert!((sol.u[0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_budget_reports_no_convergence() {
        let obj = Quadratic { target: vec![1.0] };
        let settings = Settings {
            max_iter: 0,
            cost_tol: 1e-12,
            grad_tol: 1e-8,
        };

        match minimise(&obj, &[0.0], &wide_bounds(1), &settings) {
            Err(SolveError::NoConvergence { iters, .. }) => assert_eq!(iters, 0),
            other => panic!("expected NoConvergence, got {:?}", other.map(|s| s.cost)),
        }
    }

    #[test]
    fn crossed_bounds_are_infeasible() {
        let obj = Quadratic { target: vec![0.0, 0.0] };
        let bounds = Bounds {
            lower: vec![0.0, 1.0],
            upper: vec![1.0, -1.0],
        };
        let settings = Settings {
            max_iter: 10,
            cost_tol: 1e-12,
            grad_tol: 1e-8,
        };

        match minimise(&obj, &[0.0, 0.0], &bounds, &settings) {
            Err(SolveError::Infeasible { index }) => assert_eq!(index, 1),
            other => panic!("expected Infeasible, got {:?}", other.map(|s| s.cost)),
        }
    }

    #[test]
    fn dual_gradient_matches_finite_differences() {
        let obj = Wavy;
        let u = [0.7, -1.3];

        let mut grad = vec![0.0; 2];
        let mut duals = Vec::new();
        gradient(&obj, &u, &mut grad, &mut duals);

        let h = 1e-7;
        for i in 0..2 {
            let mut up = u;
            let mut dn = u;
            up[i] += h;
            dn[i] -= h;
            let fd = (obj.cost(&up[..]) - obj.cost(&dn[..])) / (2.0 * h);
            assert!(
                (grad[i] - fd).abs() < 1e-5,
                "grad[{}] = {}, fd = {}",
                i,
                grad[i],
                fd
            );
        }
    }
}
