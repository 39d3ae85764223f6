//! Horizon trajectory optimisation
//!
//! Chooses the steering/acceleration sequence over the horizon that best
//! tracks the fitted reference curve, and returns the first pair along with
//! the optimised trajectory (standard receding-horizon policy).
//!
//! The states along the horizon are not independent decision variables:
//! they are eliminated by rolling the vehicle model forward from the fixed
//! initial state, so the dynamics and initial-condition equalities hold
//! exactly by construction. What remains is a bound-constrained problem
//! over the 2(N-1) controls, solved through `util::nlp`. Decision vector
//! layout: the N-1 steering angles followed by the N-1 accelerations.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use num_dual::DualNum;

// Internal
use super::curve::RefCurve;
use super::model::{ModelState, VehicleModel};
use super::params::Params;
use util::nlp::{self, Bounds, Objective, Settings};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Result of one receding-horizon solve.
#[derive(Debug, Clone)]
pub struct MpcSolution {
    /// First steering angle of the optimised sequence.
    ///
    /// Units: radians
    pub steer_rad: f64,

    /// First acceleration of the optimised sequence, fraction of full
    /// throttle.
    pub accel: f64,

    /// X coordinates of the optimised trajectory, vehicle frame. The first
    /// entry is the (zero) initial position.
    pub traj_x_m: Vec<f64>,

    /// Y coordinates of the optimised trajectory, vehicle frame.
    pub traj_y_m: Vec<f64>,

    /// Cost at the solution.
    pub cost: f64,

    /// Solver iterations taken.
    pub iters: usize,
}

/// One cycle's optimisation problem. Built, solved and discarded within a
/// single call; nothing in here outlives the solve.
struct HorizonProblem<'a> {
    params: &'a Params,
    curve: &'a RefCurve,
    speed_ms: f64,
    cte_m: f64,
    epsi_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl HorizonProblem<'_> {
    fn model(&self) -> VehicleModel {
        VehicleModel {
            lf_m: self.params.lf_m,
            dt_s: self.params.horizon_dt_s,
        }
    }
}

impl Objective for HorizonProblem<'_> {
    fn dim(&self) -> usize {
        2 * (self.params.horizon_steps - 1)
    }

    fn cost<T: DualNum<f64> + Copy>(&self, u: &[T]) -> T {
        let p = self.params;
        let n = p.horizon_steps;
        let (steer, accel) = u.split_at(n - 1);

        let model = self.model();
        let mut state = ModelState::<T>::initial(self.speed_ms, self.cte_m, self.epsi_rad);
        let mut cost = T::from(0.0);

        for k in 0..n {
            // Tracking terms on every horizon state
            cost = cost
                + state.cte.powi(2) * p.w_cte
                + state.epsi.powi(2) * p.w_epsi
                + (state.v - p.target_speed_ms).powi(2) * p.w_speed;

            if k < n - 1 {
                // Control effort
                cost = cost + steer[k].powi(2) * p.w_steer + accel[k].powi(2) * p.w_accel;

                // Control smoothness between consecutive pairs
                if k < n - 2 {
                    cost = cost
                        + (steer[k + 1] - steer[k]).powi(2) * p.w_steer_rate
                        + (accel[k + 1] - accel[k]).powi(2) * p.w_accel_rate;
                }

                state = model.step(&state, steer[k], accel[k], self.curve);
            }
        }

        cost
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Solve the receding-horizon problem for the given predicted local state.
///
/// `speed_ms`, `cte_m` and `epsi_rad` are the predicted vehicle-frame
/// initial state; the trajectory in the returned solution starts exactly
/// from it.
pub fn solve(
    params: &Params,
    curve: &RefCurve,
    speed_ms: f64,
    cte_m: f64,
    epsi_rad: f64,
) -> Result<MpcSolution, nlp::SolveError> {
    let n_ctrl = params.horizon_steps - 1;

    let problem = HorizonProblem {
        params,
        curve,
        speed_ms,
        cte_m,
        epsi_rad,
    };

    // Steering block then acceleration block
    let mut lower = vec![-params.max_steer_rad; n_ctrl];
    let mut upper = vec![params.max_steer_rad; n_ctrl];
    lower.extend(std::iter::repeat(-1.0).take(n_ctrl));
    upper.extend(std::iter::repeat(1.0).take(n_ctrl));
    let bounds = Bounds { lower, upper };

    let settings = Settings {
        max_iter: params.solver_max_iter,
        cost_tol: params.solver_cost_tol,
        grad_tol: params.solver_grad_tol,
    };

    let u0 = vec![0f64; 2 * n_ctrl];
    let solution = nlp::minimise(&problem, &u0, &bounds, &settings)?;

    // Roll the optimised controls out once more for the diagnostic
    // trajectory
    let (steer, accel) = solution.u.split_at(n_ctrl);
    let model = problem.model();
    let mut state = ModelState::<f64>::initial(speed_ms, cte_m, epsi_rad);

    let mut traj_x_m = Vec::with_capacity(params.horizon_steps);
    let mut traj_y_m = Vec::with_capacity(params.horizon_steps);
    for k in 0..params.horizon_steps {
        traj_x_m.push(state.x);
        traj_y_m.push(state.y);
        if k < n_ctrl {
            state = model.step(&state, steer[k], accel[k], curve);
        }
    }

    Ok(MpcSolution {
        steer_rad: solution.u[0],
        accel: solution.u[n_ctrl],
        traj_x_m,
        traj_y_m,
        cost: solution.cost,
        iters: solution.iters,
    })
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use util::nlp::SolveError;

    fn test_params() -> Params {
        Params {
            latency_s: 0.1,
            accel_scale_ms2: 9.81,
            lf_m: 2.67,
            horizon_steps: 10,
            horizon_dt_s: 0.1,
            target_speed_ms: 15.0,
            max_steer_rad: 0.436332,
            w_cte: 100.0,
            w_epsi: 100.0,
            w_speed: 1.0,
            w_steer: 2.0,
            w_accel: 2.0,
            w_steer_rate: 20.0,
            w_accel_rate: 5.0,
            solver_max_iter: 1000,
            solver_cost_tol: 1e-8,
            solver_grad_tol: 1e-5,
        }
    }

    #[test]
    fn on_path_straight_reference_holds_zero_steering() {
        let params = test_params();
        let curve = RefCurve::from_coeffs(vec![0.0, 0.0, 0.0, 0.0]);

        let sol = solve(&params, &curve, 10.0, 0.0, 0.0).unwrap();

        // Nothing pulls the vehicle sideways, so the steering stays at the
        // initial zero while the throttle chases the target speed
        assert!(sol.steer_rad.abs() < 1e-9, "steer = {}", sol.steer_rad);
        assert!(sol.accel > 0.3, "accel = {}", sol.accel);

        // Trajectory marches forward along the local X axis, flat in Y
        for pair in sol.traj_x_m.windows(2) {
            assert!(pair[1] > pair[0]);
        }
        for y in sol.traj_y_m.iter() {
            assert!(y.abs() < 1e-9);
        }
    }

    #[test]
    fn lateral_offset_produces_corrective_steering() {
        let params = test_params();
        // Reference curve one meter above the vehicle: cte = 1, epsi = 0
        let curve = RefCurve::from_coeffs(vec![1.0, 0.0, 0.0, 0.0]);

        let sol = solve(
            &params,
            &curve,
            params.target_speed_ms,
            curve.cte_at_origin(),
            curve.heading_error_at_origin(),
        )
        .unwrap();

        // Raising y towards the reference needs a positive heading, which
        // the yaw relation produces from a negative steering angle
        assert!(sol.steer_rad < -1e-4, "steer = {}", sol.steer_rad);
        assert!(
            sol.steer_rad >= -params.max_steer_rad - 1e-9,
            "steer = {}",
            sol.steer_rad
        );
    }

    #[test]
    fn returned_trajectory_starts_at_the_initial_state() {
        let params = test_params();
        let curve = RefCurve::from_coeffs(vec![0.4, -0.05, 0.01, 0.0]);

        let sol = solve(&params, &curve, 12.0, 0.4, 0.05).unwrap();

        assert_eq!(sol.traj_x_m.len(), params.horizon_steps);
        assert_eq!(sol.traj_y_m.len(), params.horizon_steps);

        // The initial state is bound exactly, not through a cost term
        assert_eq!(sol.traj_x_m[0], 0.0);
        assert_eq!(sol.traj_y_m[0], 0.0);
    }

    #[test]
    fn steering_respects_the_physical_bound() {
        let params = test_params();
        // An aggressively curved reference demanding a hard turn
        let curve = RefCurve::from_coeffs(vec![3.0, 0.8, 0.05, 0.0]);

        let sol = solve(
            &params,
            &curve,
            params.target_speed_ms,
            curve.cte_at_origin(),
            curve.heading_error_at_origin(),
        )
        .unwrap();

        assert!(sol.steer_rad.abs() <= params.max_steer_rad + 1e-9);
        assert!(sol.accel.abs() <= 1.0 + 1e-9);
    }

    #[test]
    fn zero_iteration_budget_fails_with_no_convergence() {
        let mut params = test_params();
        params.solver_max_iter = 0;
        let curve = RefCurve::from_coeffs(vec![0.0, 0.0, 0.0, 0.0]);

        match solve(&params, &curve, 10.0, 0.0, 0.0) {
            Err(SolveError::NoConvergence { iters: 0, .. }) => (),
            other => panic!("expected NoConvergence, got {:?}", other),
        }
    }
}
