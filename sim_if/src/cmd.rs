//! # Control command payload

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// The command sent back to the simulator each control cycle.
///
/// Steering and throttle are normalised to the platform's command schema;
/// the two trajectories are carried purely for display and diagnostics and
/// are expressed in the vehicle frame used by the optimiser.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CtrlCmd {
    /// Normalised steering demand.
    ///
    /// In the platform's sign convention positive steering turns the vehicle
    /// towards positive local Y. Always within [-1, 1].
    pub steer_norm: f64,

    /// Normalised throttle demand, negative values braking. Always within
    /// [-1, 1].
    pub throttle_norm: f64,

    /// X coordinates of the optimised trajectory, vehicle frame.
    ///
    /// Units: meters
    pub traj_x_m: Vec<f64>,

    /// Y coordinates of the optimised trajectory, vehicle frame.
    ///
    /// Units: meters
    pub traj_y_m: Vec<f64>,

    /// X coordinates of the reference waypoints, vehicle frame.
    ///
    /// Units: meters
    pub ref_x_m: Vec<f64>,

    /// Y coordinates of the reference waypoints, vehicle frame.
    ///
    /// Units: meters
    pub ref_y_m: Vec<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl CtrlCmd {
    /// True if both actuator demands lie within their normalised bounds.
    pub fn is_within_bounds(&self) -> bool {
        self.steer_norm.abs() <= 1.0 && self.throttle_norm.abs() <= 1.0
    }
}
