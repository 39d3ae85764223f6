//! Actuator output mapping
//!
//! Turns the optimiser's raw first control pair into the platform's
//! normalised command schema. The platform's positive steering convention
//! is opposite to the model's steering angle, hence the negation.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use super::optim::MpcSolution;
use super::params::Params;
use super::state::StatusReport;
use sim_if::CtrlCmd;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Map a solution into a bounded command, recording any saturation in the
/// status report. The trajectories pass through unchanged.
pub fn map_outputs(
    solution: MpcSolution,
    ref_x_m: Vec<f64>,
    ref_y_m: Vec<f64>,
    params: &Params,
    report: &mut StatusReport,
) -> CtrlCmd {
    let steer_raw = -solution.steer_rad / params.max_steer_rad;
    let steer_norm = steer_raw.clamp(-1.0, 1.0);
    report.steer_saturated = steer_norm != steer_raw;

    let throttle_norm = solution.accel.clamp(-1.0, 1.0);
    report.throttle_saturated = throttle_norm != solution.accel;

    CtrlCmd {
        steer_norm,
        throttle_norm,
        traj_x_m: solution.traj_x_m,
        traj_y_m: solution.traj_y_m,
        ref_x_m,
        ref_y_m,
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn solution(steer_rad: f64, accel: f64) -> MpcSolution {
        MpcSolution {
            steer_rad,
            accel,
            traj_x_m: vec![0.0, 1.0],
            traj_y_m: vec![0.0, 0.1],
            cost: 0.0,
            iters: 1,
        }
    }

    fn params() -> Params {
        Params {
            max_steer_rad: 0.5,
            ..Params::default()
        }
    }

    #[test]
    fn steering_is_negated_and_scaled() {
        let mut report = StatusReport::default();

        let cmd = map_outputs(
            solution(-0.25, 0.4),
            vec![],
            vec![],
            &params(),
            &mut report,
        );

        assert!((cmd.steer_norm - 0.5).abs() < 1e-12);
        assert!((cmd.throttle_norm - 0.4).abs() < 1e-12);
        assert!(!report.steer_saturated);
        assert!(!report.throttle_saturated);
    }

    #[test]
    fn saturated_outputs_are_clamped_and_flagged() {
        let mut report = StatusReport::default();

        let cmd = map_outputs(solution(0.75, -1.4), vec![], vec![], &params(), &mut report);

        assert_eq!(cmd.steer_norm, -1.0);
        assert_eq!(cmd.throttle_norm, -1.0);
        assert!(report.steer_saturated);
        assert!(report.throttle_saturated);
        assert!(cmd.is_within_bounds());
    }

    #[test]
    fn trajectories_pass_through_unchanged() {
        let mut report = StatusReport::default();
        let sol = solution(0.0, 0.0);
        let traj_x = sol.traj_x_m.clone();

        let cmd = map_outputs(sol, vec![9.0], vec![-2.0], &params(), &mut report);

        assert_eq!(cmd.traj_x_m, traj_x);
        assert_eq!(cmd.ref_x_m, vec![9.0]);
        assert_eq!(cmd.ref_y_m, vec![-2.0]);
    }
}
