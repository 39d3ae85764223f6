//! Latency-compensating state predictor
//!
//! The command chosen this cycle only reaches the actuators after the
//! transport/actuation latency has elapsed. Optimising around the raw
//! telemetry pose would therefore chase a position the vehicle has already
//! left. This stage advances the telemetry state through the latency window
//! with a single Euler step of the kinematic bicycle model, under the
//! actuation issued on the previous cycle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use super::Params;
use sim_if::Telemetry;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The raw actuation pair chosen by the optimiser, before normalisation
/// into the platform command schema.
///
/// One of these is carried by the pipeline from each cycle to the next and
/// is the only cross-cycle state in the module. A new session starts from
/// the zero actuation.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct Actuation {
    /// Steering angle. Positive angles reduce the heading under the yaw
    /// relation used by the vehicle model.
    ///
    /// Units: radians
    pub steer_rad: f64,

    /// Longitudinal acceleration command as a fraction of full throttle,
    /// negative values braking.
    pub accel: f64,
}

/// World-frame pose and speed predicted for the instant the next command
/// takes effect.
#[derive(Debug, Clone, Copy)]
pub struct PredictedPose {
    /// Predicted position X coordinate.
    ///
    /// Units: meters
    pub x_m: f64,

    /// Predicted position Y coordinate.
    ///
    /// Units: meters
    pub y_m: f64,

    /// Predicted heading.
    ///
    /// Units: radians
    pub heading_rad: f64,

    /// Predicted speed.
    ///
    /// Units: meters/second
    pub speed_ms: f64,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Advance the telemetry state through the latency window under the given
/// actuation.
///
/// With a zero latency the prediction is exactly the telemetry state.
pub fn predict(telem: &Telemetry, last_act: &Actuation, params: &Params) -> PredictedPose {
    let v_ms = telem.speed_ms();
    let dt_s = params.latency_s;

    PredictedPose {
        x_m: telem.pos_x_m + v_ms * telem.heading_rad.cos() * dt_s,
        y_m: telem.pos_y_m + v_ms * telem.heading_rad.sin() * dt_s,
        heading_rad: telem.heading_rad - v_ms / params.lf_m * last_act.steer_rad * dt_s,
        speed_ms: v_ms + last_act.accel * params.accel_scale_ms2 * dt_s,
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn params_with_latency(latency_s: f64) -> Params {
        Params {
            latency_s,
            accel_scale_ms2: 9.81,
            lf_m: 2.67,
            ..Params::default()
        }
    }

    fn telem() -> Telemetry {
        Telemetry {
            waypoints_x_m: vec![],
            waypoints_y_m: vec![],
            pos_x_m: 3.0,
            pos_y_m: -1.5,
            heading_rad: 0.4,
            speed_mph: 20.0,
            last_steer_norm: 0.0,
            last_throttle_norm: 0.0,
        }
    }

    #[test]
    fn zero_latency_is_identity() {
        let act = Actuation {
            steer_rad: 0.2,
            accel: 0.7,
        };

        let pose = predict(&telem(), &act, &params_with_latency(0.0));

        assert_eq!(pose.x_m, 3.0);
        assert_eq!(pose.y_m, -1.5);
        assert_eq!(pose.heading_rad, 0.4);
        assert_eq!(pose.speed_ms, telem().speed_ms());
    }

    #[test]
    fn straight_coasting_advances_along_heading() {
        let mut telem = telem();
        telem.heading_rad = 0.0;

        let pose = predict(&telem, &Actuation::default(), &params_with_latency(0.5));
        let v_ms = telem.speed_ms();

        assert!((pose.x_m - (3.0 + v_ms * 0.5)).abs() < 1e-12);
        assert!((pose.y_m + 1.5).abs() < 1e-12);
        assert_eq!(pose.heading_rad, 0.0);
        assert_eq!(pose.speed_ms, v_ms);
    }

    #[test]
    fn steering_reduces_heading_and_throttle_raises_speed() {
        let act = Actuation {
            steer_rad: 0.1,
            accel: 0.5,
        };
        let params = params_with_latency(0.1);

        let pose = predict(&telem(), &act, &params);
        let v_ms = telem().speed_ms();

        assert!(pose.heading_rad < 0.4);
        assert!((pose.speed_ms - (v_ms + 0.5 * 9.81 * 0.1)).abs() < 1e-12);
    }
}
