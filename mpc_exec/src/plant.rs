//! Closed-loop demonstration plant
//!
//! Stands in for the external simulator when running the exec standalone: a
//! world-frame kinematic bicycle coasts along a sine-wave track, supplying
//! a telemetry sample each cycle and consuming the resulting command.
//!
//! Commanded actuation only takes effect after a configurable delay within
//! the cycle, emulating the transport/actuation latency the controller's
//! predictor compensates for. The plant carries its own physical constants
//! rather than sharing the control parameters; any mismatch between the
//! two is exactly the kind of modelling error the closed loop has to
//! tolerate.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use sim_if::telem::MPH_TO_MS;
use sim_if::{CtrlCmd, Telemetry};
use util::maths::{dist2, wrap_pi};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of track waypoints supplied ahead of the vehicle each cycle.
const WAYPOINTS_AHEAD: usize = 6;

/// Spacing between consecutive track waypoints.
const TRACK_SPACING_M: f64 = 5.0;

/// Number of waypoints making up the track.
const TRACK_POINTS: usize = 240;

/// Lateral amplitude of the sine-wave track.
const TRACK_AMPLITUDE_M: f64 = 10.0;

/// Longitudinal scale of the sine-wave track. The maximum track slope is
/// amplitude over scale.
const TRACK_SCALE_M: f64 = 50.0;

/// Distance from the plant's centre of gravity to its front axle.
const PLANT_LF_M: f64 = 2.67;

/// Acceleration at full throttle.
const PLANT_ACCEL_SCALE_MS2: f64 = 9.81;

/// Physical steering angle bound.
const PLANT_MAX_STEER_RAD: f64 = 0.436332;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The simulated vehicle and its track.
pub struct Plant {
    track_x_m: Vec<f64>,
    track_y_m: Vec<f64>,

    x_m: f64,
    y_m: f64,
    heading_rad: f64,
    speed_ms: f64,

    /// Actuation currently acting on the vehicle.
    act_steer_rad: f64,
    act_throttle: f64,

    /// Delay before a newly commanded actuation takes effect.
    cmd_delay_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Plant {
    /// Create a plant at the start of the track, stationary, with zero
    /// actuation.
    pub fn new(cmd_delay_s: f64) -> Self {
        let track_x_m: Vec<f64> = (0..TRACK_POINTS)
            .map(|i| i as f64 * TRACK_SPACING_M)
            .collect();
        let track_y_m: Vec<f64> = track_x_m
            .iter()
            .map(|&x| TRACK_AMPLITUDE_M * (x / TRACK_SCALE_M).sin())
            .collect();

        // Line up with the track tangent at the start
        let heading_rad = (TRACK_AMPLITUDE_M / TRACK_SCALE_M).atan();

        Self {
            track_x_m,
            track_y_m,
            x_m: 0.0,
            y_m: 0.0,
            heading_rad,
            speed_ms: 0.0,
            act_steer_rad: 0.0,
            act_throttle: 0.0,
            cmd_delay_s,
        }
    }

    /// Telemetry sample for the current true state, with the waypoints
    /// ahead of the vehicle and the acting actuation echoed back in the
    /// platform's normalised convention.
    pub fn telemetry(&self) -> Telemetry {
        let start = self.nearest_track_index();
        let end = (start + WAYPOINTS_AHEAD).min(self.track_x_m.len());

        Telemetry {
            waypoints_x_m: self.track_x_m[start..end].to_vec(),
            waypoints_y_m: self.track_y_m[start..end].to_vec(),
            pos_x_m: self.x_m,
            pos_y_m: self.y_m,
            heading_rad: self.heading_rad,
            speed_mph: self.speed_ms / MPH_TO_MS,
            last_steer_norm: -self.act_steer_rad / PLANT_MAX_STEER_RAD,
            last_throttle_norm: self.act_throttle,
        }
    }

    /// Advance the plant by one control period.
    ///
    /// `cmd` is the command issued this cycle, or `None` when the cycle
    /// failed and the previous actuation is held. A new command starts
    /// acting only after the configured delay has elapsed.
    pub fn apply(&mut self, cmd: Option<&CtrlCmd>, period_s: f64) {
        let delay_s = self.cmd_delay_s.min(period_s);
        self.integrate(delay_s);

        if let Some(cmd) = cmd {
            self.act_steer_rad = -cmd.steer_norm * PLANT_MAX_STEER_RAD;
            self.act_throttle = cmd.throttle_norm;
        }

        self.integrate(period_s - delay_s);
    }

    /// Current speed.
    pub fn speed_ms(&self) -> f64 {
        self.speed_ms
    }

    /// Distance to the nearest track waypoint, a coarse measure of how far
    /// off the path the plant has drifted.
    pub fn track_error_m(&self) -> f64 {
        let i = self.nearest_track_index();
        dist2(
            &[self.x_m, self.y_m],
            &[self.track_x_m[i], self.track_y_m[i]],
        )
    }

    /// Integrate the kinematic bicycle under the acting actuation.
    fn integrate(&mut self, dt_s: f64) {
        if dt_s <= 0.0 {
            return;
        }

        let v_ms = self.speed_ms;

        self.x_m += v_ms * self.heading_rad.cos() * dt_s;
        self.y_m += v_ms * self.heading_rad.sin() * dt_s;
        self.heading_rad = wrap_pi(
            self.heading_rad - v_ms / PLANT_LF_M * self.act_steer_rad * dt_s,
        );
        self.speed_ms = (v_ms + self.act_throttle * PLANT_ACCEL_SCALE_MS2 * dt_s).max(0.0);
    }

    fn nearest_track_index(&self) -> usize {
        let pos = [self.x_m, self.y_m];

        let mut nearest = 0;
        let mut nearest_dist_m = f64::INFINITY;
        for i in 0..self.track_x_m.len() {
            let d = dist2(&pos, &[self.track_x_m[i], self.track_y_m[i]]);
            if d < nearest_dist_m {
                nearest_dist_m = d;
                nearest = i;
            }
        }

        nearest
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn telemetry_supplies_waypoints_ahead() {
        let plant = Plant::new(0.1);
        let telem = plant.telemetry();

        assert_eq!(telem.waypoints_x_m.len(), WAYPOINTS_AHEAD);
        assert!(telem.validate().is_ok());
        assert_eq!(telem.speed_mph, 0.0);
    }

    #[test]
    fn command_takes_effect_only_after_the_delay() {
        let mut plant = Plant::new(0.1);
        plant.speed_ms = 10.0;
        plant.heading_rad = 0.0;

        let cmd = CtrlCmd {
            steer_norm: 0.5,
            throttle_norm: 0.0,
            ..CtrlCmd::default()
        };

        // Over one period the heading only changes during the post-delay
        // portion
        plant.apply(Some(&cmd), 0.2);

        let expected_steer_rad = -0.5 * PLANT_MAX_STEER_RAD;
        let expected_heading = -10.0 / PLANT_LF_M * expected_steer_rad * 0.1;
        assert!((plant.heading_rad - expected_heading).abs() < 1e-12);
    }

    #[test]
    fn held_cycle_keeps_the_previous_actuation() {
        let mut plant = Plant::new(0.0);
        plant.speed_ms = 10.0;

        let cmd = CtrlCmd {
            steer_norm: 0.0,
            throttle_norm: 0.5,
            ..CtrlCmd::default()
        };
        plant.apply(Some(&cmd), 0.1);
        let speed_after_cmd = plant.speed_ms();

        // A failed cycle (None) keeps accelerating under the old throttle
        plant.apply(None, 0.1);
        assert!(plant.speed_ms() > speed_after_cmd);
    }
}
