//! Horizon vehicle model
//!
//! The kinematic bicycle with reference-error dynamics, used as the
//! transition relation between consecutive horizon timesteps. The state is
//! six scalars: position, heading, speed, cross-track error and heading
//! error; the controls are the steering angle and longitudinal
//! acceleration.
//!
//! The step function is written once, generic over dual numbers. The
//! optimiser's plain rollouts and its derivative rollouts therefore execute
//! the same expressions, and the gradients it sees always match the model.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use num_dual::DualNum;

// Internal
use super::curve::RefCurve;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Model state at a single horizon timestep.
#[derive(Debug, Clone, Copy)]
pub struct ModelState<T> {
    /// Longitudinal position, vehicle frame at cycle start.
    pub x: T,

    /// Lateral position, vehicle frame at cycle start.
    pub y: T,

    /// Heading relative to the vehicle frame X axis.
    pub psi: T,

    /// Speed.
    pub v: T,

    /// Cross-track error to the reference curve.
    pub cte: T,

    /// Heading error to the reference curve's tangent.
    pub epsi: T,
}

/// The vehicle's transition relation over one horizon timestep.
#[derive(Debug, Clone, Copy)]
pub struct VehicleModel {
    /// Distance from the centre of gravity to the front axle.
    ///
    /// Units: meters
    pub lf_m: f64,

    /// Timestep length.
    ///
    /// Units: seconds
    pub dt_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<T: DualNum<f64> + Copy> ModelState<T> {
    /// The initial horizon state in the vehicle frame.
    ///
    /// Position and heading are zero by construction of the frame; speed and
    /// the two tracking errors come from the predictor and the fitted curve.
    pub fn initial(speed_ms: f64, cte_m: f64, epsi_rad: f64) -> Self {
        Self {
            x: T::from(0.0),
            y: T::from(0.0),
            psi: T::from(0.0),
            v: T::from(speed_ms),
            cte: T::from(cte_m),
            epsi: T::from(epsi_rad),
        }
    }
}

impl VehicleModel {
    /// Advance the state by one timestep under the given controls.
    pub fn step<T: DualNum<f64> + Copy>(
        &self,
        s: &ModelState<T>,
        steer_rad: T,
        accel: T,
        curve: &RefCurve,
    ) -> ModelState<T> {
        let dt_s = self.dt_s;
        let yaw_rate = s.v / self.lf_m * steer_rad;

        ModelState {
            x: s.x + s.psi.cos() * s.v * dt_s,
            y: s.y + s.psi.sin() * s.v * dt_s,
            psi: s.psi - yaw_rate * dt_s,
            v: s.v + accel * dt_s,
            cte: curve.eval(s.x) - s.y + s.epsi.sin() * s.v * dt_s,
            epsi: s.psi - curve.slope(s.x).atan() - yaw_rate * dt_s,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn coasting_on_a_flat_reference_stays_error_free() {
        let model = VehicleModel {
            lf_m: 2.67,
            dt_s: 0.1,
        };
        let curve = RefCurve::from_coeffs(vec![0.0, 0.0, 0.0, 0.0]);

        let mut state = ModelState::<f64>::initial(10.0, 0.0, 0.0);
        for _ in 0..10 {
            state = model.step(&state, 0.0, 0.0, &curve);
        }

        assert!((state.x - 10.0).abs() < 1e-9);
        assert!(state.y.abs() < 1e-12);
        assert!(state.psi.abs() < 1e-12);
        assert!((state.v - 10.0).abs() < 1e-12);
        assert!(state.cte.abs() < 1e-12);
        assert!(state.epsi.abs() < 1e-12);
    }

    #[test]
    fn steering_turns_against_the_heading() {
        let model = VehicleModel {
            lf_m: 2.67,
            dt_s: 0.1,
        };
        let curve = RefCurve::from_coeffs(vec![0.0, 0.0, 0.0, 0.0]);

        let state = ModelState::<f64>::initial(10.0, 0.0, 0.0);
        let next = model.step(&state, 0.1, 0.0, &curve);

        // Positive steering reduces heading under the yaw relation, and the
        // heading error mirrors it on a flat reference
        assert!((next.psi + 10.0 / 2.67 * 0.1 * 0.1).abs() < 1e-12);
        assert!((next.epsi - next.psi).abs() < 1e-12);
    }

    #[test]
    fn acceleration_integrates_into_speed() {
        let model = VehicleModel {
            lf_m: 2.67,
            dt_s: 0.1,
        };
        let curve = RefCurve::from_coeffs(vec![0.0, 0.0, 0.0, 0.0]);

        let state = ModelState::<f64>::initial(10.0, 0.0, 0.0);
        let next = model.step(&state, 0.0, 0.6, &curve);

        assert!((next.v - 10.06).abs() < 1e-12);
    }
}
