//! # Vehicle telemetry payload

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Conversion factor from the simulator's speed unit (miles per hour) to
/// meters per second.
pub const MPH_TO_MS: f64 = 0.44704;

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// A single telemetry sample from the simulator.
///
/// Positions and waypoints are in the world frame. The waypoints describe
/// the reference path ahead of the vehicle and are paired element-wise
/// between the two arrays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Telemetry {
    /// X coordinates of the reference waypoints.
    ///
    /// Units: meters
    pub waypoints_x_m: Vec<f64>,

    /// Y coordinates of the reference waypoints.
    ///
    /// Units: meters
    pub waypoints_y_m: Vec<f64>,

    /// Vehicle position X coordinate.
    ///
    /// Units: meters
    pub pos_x_m: f64,

    /// Vehicle position Y coordinate.
    ///
    /// Units: meters
    pub pos_y_m: f64,

    /// Vehicle heading, anticlockwise from the world X axis.
    ///
    /// Units: radians
    pub heading_rad: f64,

    /// Vehicle speed as reported by the simulator.
    ///
    /// Units: miles per hour
    pub speed_mph: f64,

    /// The steering command currently applied by the simulator, echoed back
    /// in the platform's normalised sign convention.
    pub last_steer_norm: f64,

    /// The throttle command currently applied by the simulator.
    pub last_throttle_norm: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMERATIONS
// ------------------------------------------------------------------------------------------------

/// Errors raised when validating an incoming telemetry sample.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Telemetry field {0} is not finite")]
    NonFiniteField(&'static str),

    #[error("Waypoint arrays have mismatched lengths ({0} x values, {1} y values)")]
    WaypointLengthMismatch(usize, usize),
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl Telemetry {
    /// Vehicle speed converted to meters per second.
    pub fn speed_ms(&self) -> f64 {
        self.speed_mph * MPH_TO_MS
    }

    /// Check the sample for structural validity.
    ///
    /// Rejects non-finite scalars or waypoints and mismatched waypoint array
    /// lengths. An empty waypoint set is structurally valid here; whether
    /// enough points are present to fit the reference curve is for the
    /// control module to decide.
    pub fn validate(&self) -> Result<(), TelemetryError> {
        if self.waypoints_x_m.len() != self.waypoints_y_m.len() {
            return Err(TelemetryError::WaypointLengthMismatch(
                self.waypoints_x_m.len(),
                self.waypoints_y_m.len(),
            ));
        }

        let scalars = [
            (self.pos_x_m, "pos_x_m"),
            (self.pos_y_m, "pos_y_m"),
            (self.heading_rad, "heading_rad"),
            (self.speed_mph, "speed_mph"),
            (self.last_steer_norm, "last_steer_norm"),
            (self.last_throttle_norm, "last_throttle_norm"),
        ];

        for (value, name) in scalars.iter().copied() {
            if !value.is_finite() {
                return Err(TelemetryError::NonFiniteField(name));
            }
        }

        if !self.waypoints_x_m.iter().all(|v| v.is_finite()) {
            return Err(TelemetryError::NonFiniteField("waypoints_x_m"));
        }
        if !self.waypoints_y_m.iter().all(|v| v.is_finite()) {
            return Err(TelemetryError::NonFiniteField("waypoints_y_m"));
        }

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn sample() -> Telemetry {
        Telemetry {
            waypoints_x_m: vec![0.0, 5.0, 10.0, 15.0],
            waypoints_y_m: vec![0.0, 0.1, 0.4, 0.9],
            pos_x_m: 1.0,
            pos_y_m: 0.5,
            heading_rad: 0.05,
            speed_mph: 22.352,
            last_steer_norm: 0.0,
            last_throttle_norm: 0.1,
        }
    }

    #[test]
    fn valid_sample_passes() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn speed_is_converted_to_ms() {
        // 22.352 mph is very nearly 10 m/s
        assert!((sample().speed_ms() - 9.99224).abs() < 1e-4);
    }

    #[test]
    fn non_finite_scalar_is_rejected() {
        let mut telem = sample();
        telem.speed_mph = f64::NAN;

        match telem.validate() {
            Err(TelemetryError::NonFiniteField(name)) => assert_eq!(name, "speed_mph"),
            other => panic!("expected NonFiniteField, got {:?}", other),
        }
    }

    #[test]
    fn non_finite_waypoint_is_rejected() {
        let mut telem = sample();
        telem.waypoints_y_m[2] = f64::INFINITY;

        assert!(matches!(
            telem.validate(),
            Err(TelemetryError::NonFiniteField("waypoints_y_m"))
        ));
    }

    #[test]
    fn mismatched_waypoint_arrays_are_rejected() {
        let mut telem = sample();
        telem.waypoints_y_m.pop();

        assert!(matches!(
            telem.validate(),
            Err(TelemetryError::WaypointLengthMismatch(4, 3))
        ));
    }
}
