//! # Model-predictive control module
//!
//! MpcCtrl is responsible for keeping the vehicle on the reference path
//! supplied with each telemetry sample. Every cycle it runs a five stage
//! pipeline:
//!
//!   1. Predict where the vehicle will be once the actuation latency has
//!      elapsed, using the command issued on the previous cycle (the
//!      command sent now cannot have influenced the telemetry we just
//!      received).
//!   2. Re-express the reference waypoints in the vehicle frame centred on
//!      that predicted pose.
//!   3. Fit a cubic to the local waypoints, giving the cross-track and
//!      heading errors at the predicted position.
//!   4. Solve a receding-horizon optimisation over a sequence of steering
//!      and acceleration commands, subject to the kinematic bicycle model
//!      and the actuator bounds, and keep only the first pair.
//!   5. Normalise the chosen pair into the platform's command schema.
//!
//! The module carries exactly one piece of state between cycles: the raw
//! actuation pair chosen last cycle, which stage 1 consumes. Everything
//! else is recomputed from scratch each cycle.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod actuate;
pub mod curve;
pub mod frame;
pub mod model;
pub mod optim;
pub mod params;
pub mod state;
pub mod state_pred;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::Params;
pub use state::*;

use util::params as util_params;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Degree of the fitted reference curve.
pub const REF_CURVE_ORDER: usize = 3;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Potential errors that can occur during processing of the module.
#[derive(Debug, thiserror::Error)]
pub enum MpcCtrlError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(util_params::LoadError),

    #[error("Invalid parameters: {0}")]
    Config(params::ConfigError),

    /// The telemetry sample failed validation. The cycle is rejected before
    /// any of the numerics run.
    #[error("Telemetry rejected: {0}")]
    InvalidTelemetry(#[from] sim_if::TelemetryError),

    /// The waypoints could not be expressed in the vehicle frame.
    #[error(transparent)]
    Frame(#[from] frame::FrameError),

    /// The reference curve could not be fitted to the local waypoints.
    #[error(transparent)]
    CurveFit(#[from] curve::CurveFitError),

    /// The horizon optimisation did not produce a usable control sequence.
    #[error(transparent)]
    Solve(#[from] util::nlp::SolveError),
}
