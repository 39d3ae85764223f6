//! Implementations for the MpcCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Serialize;

// Internal
use super::{
    actuate, curve::RefCurve, frame, optim, params::Params, state_pred,
    state_pred::Actuation, MpcCtrlError, REF_CURVE_ORDER,
};
use sim_if::{CtrlCmd, Telemetry};
use util::{module::State, params};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// MPC control module state
#[derive(Default)]
pub struct MpcCtrl {
    pub(crate) params: Params,

    /// The raw actuation chosen on the most recent successful cycle. This
    /// is what the predictor assumes is acting on the vehicle during the
    /// latency window; a failed cycle leaves it untouched.
    last_act: Actuation,

    pub(crate) report: StatusReport,
}

/// Status report for MpcCtrl processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// Cross-track error at the predicted pose.
    ///
    /// Units: meters
    pub cte_m: f64,

    /// Heading error at the predicted pose.
    ///
    /// Units: radians
    pub heading_err_rad: f64,

    /// Speed at the predicted pose.
    ///
    /// Units: meters/second
    pub pred_speed_ms: f64,

    /// Iterations the optimiser took this cycle.
    pub solve_iters: usize,

    /// Cost at the optimiser's solution.
    pub solve_cost: f64,

    /// True if the steering demand was clamped to its normalised bound.
    pub steer_saturated: bool,

    /// True if the throttle demand was clamped to its normalised bound.
    pub throttle_saturated: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for MpcCtrl {
    type InitData = &'static str;
    type InitError = MpcCtrlError;

    type InputData = Telemetry;
    type OutputData = CtrlCmd;
    type StatusReport = StatusReport;
    type ProcError = MpcCtrlError;

    /// Initialise the MpcCtrl module.
    ///
    /// Expected init data is the path to the parameter file. Invalid
    /// parameters are fatal here, never discovered mid-run.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        self.params = params::load(init_data).map_err(MpcCtrlError::ParamLoadError)?;
        self.params.validate().map_err(MpcCtrlError::Config)?;

        // A new session starts from the zero actuation
        self.last_act = Actuation::default();

        Ok(())
    }

    /// Perform one cycle of MPC processing.
    fn proc(
        &mut self,
        telem: &Telemetry,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        // Clear the status report
        self.report = StatusReport::default();

        // Reject malformed telemetry before it reaches the numerics
        telem.validate()?;

        // Predict where the vehicle will be when the next command takes
        // effect
        let pose = state_pred::predict(telem, &self.last_act, &self.params);
        self.report.pred_speed_ms = pose.speed_ms;

        // Re-express the waypoints around the predicted pose
        let (ref_x_m, ref_y_m) =
            frame::world_to_vehicle(&telem.waypoints_x_m, &telem.waypoints_y_m, &pose)?;

        // Fit the reference curve and take the tracking errors at the origin
        let curve = RefCurve::fit(&ref_x_m, &ref_y_m, REF_CURVE_ORDER)?;
        let cte_m = curve.cte_at_origin();
        let epsi_rad = curve.heading_error_at_origin();
        self.report.cte_m = cte_m;
        self.report.heading_err_rad = epsi_rad;

        // Receding-horizon solve around the predicted local state
        let solution = optim::solve(&self.params, &curve, pose.speed_ms, cte_m, epsi_rad)?;
        self.report.solve_iters = solution.iters;
        self.report.solve_cost = solution.cost;

        // The command issued now is what acts on the vehicle during the
        // next cycle's latency window
        self.last_act = Actuation {
            steer_rad: solution.steer_rad,
            accel: solution.accel,
        };

        let cmd = actuate::map_outputs(solution, ref_x_m, ref_y_m, &self.params, &mut self.report);

        trace!(
            "MpcCtrl output: steer {:.4}, throttle {:.4} (cte {:.3} m)",
            cmd.steer_norm,
            cmd.throttle_norm,
            self.report.cte_m
        );

        Ok((cmd, self.report))
    }
}

impl MpcCtrl {
    /// Build the module directly from an owned parameter set, validating it
    /// as `init` would. Intended for embedding the pipeline without a
    /// parameter file.
    pub fn from_params(params: Params) -> Result<Self, MpcCtrlError> {
        params.validate().map_err(MpcCtrlError::Config)?;

        Ok(Self {
            params,
            last_act: Actuation::default(),
            report: StatusReport::default(),
        })
    }

    /// The actuation carried for the next cycle's prediction.
    pub fn last_actuation(&self) -> Actuation {
        self.last_act
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
