//! MPC control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for MPC control.
///
/// Loaded once at init and passed by reference into every pipeline stage;
/// no stage carries its own copies of these values.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct Params {
    /// Actuation latency compensated for by the state predictor.
    ///
    /// Units: seconds
    pub latency_s: f64,

    /// Acceleration produced by full throttle, used when propagating the
    /// speed through the latency window.
    ///
    /// Units: meters/second^2
    pub accel_scale_ms2: f64,

    /// Distance from the vehicle's centre of gravity to the front axle.
    ///
    /// Units: meters
    pub lf_m: f64,

    /// Number of timesteps in the optimisation horizon.
    pub horizon_steps: usize,

    /// Time between consecutive horizon timesteps.
    ///
    /// Units: seconds
    pub horizon_dt_s: f64,

    /// Reference speed the optimiser drives the vehicle towards.
    ///
    /// Units: meters/second
    pub target_speed_ms: f64,

    /// Physical steering angle limit.
    ///
    /// Units: radians
    pub max_steer_rad: f64,

    /// Cross-track error cost weight.
    pub w_cte: f64,

    /// Heading error cost weight.
    pub w_epsi: f64,

    /// Speed tracking cost weight.
    pub w_speed: f64,

    /// Steering effort cost weight.
    pub w_steer: f64,

    /// Acceleration effort cost weight.
    pub w_accel: f64,

    /// Steering rate-of-change cost weight.
    pub w_steer_rate: f64,

    /// Acceleration rate-of-change cost weight.
    pub w_accel_rate: f64,

    /// Solver iteration budget. A budget of zero makes every solve fail,
    /// which is occasionally useful for testing failure paths.
    pub solver_max_iter: usize,

    /// Solver relative cost-decrease tolerance.
    pub solver_cost_tol: f64,

    /// Solver projected-gradient tolerance.
    pub solver_grad_tol: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised when validating the loaded parameters. All of these are
/// fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Horizon must contain at least 2 steps, got {0}")]
    HorizonTooShort(usize),

    #[error("Parameter {0} must be positive")]
    NonPositive(&'static str),

    #[error("Latency must not be negative, got {0}")]
    NegativeLatency(f64),

    #[error("Cost weight {0} must not be negative")]
    NegativeWeight(&'static str),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Check the parameter set for internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.horizon_steps < 2 {
            return Err(ConfigError::HorizonTooShort(self.horizon_steps));
        }

        if self.latency_s < 0.0 {
            return Err(ConfigError::NegativeLatency(self.latency_s));
        }

        let positives = [
            (self.accel_scale_ms2, "accel_scale_ms2"),
            (self.lf_m, "lf_m"),
            (self.horizon_dt_s, "horizon_dt_s"),
            (self.max_steer_rad, "max_steer_rad"),
            (self.solver_cost_tol, "solver_cost_tol"),
            (self.solver_grad_tol, "solver_grad_tol"),
        ];
        for (value, name) in positives.iter().copied() {
            if value <= 0.0 {
                return Err(ConfigError::NonPositive(name));
            }
        }

        let weights = [
            (self.w_cte, "w_cte"),
            (self.w_epsi, "w_epsi"),
            (self.w_speed, "w_speed"),
            (self.w_steer, "w_steer"),
            (self.w_accel, "w_accel"),
            (self.w_steer_rate, "w_steer_rate"),
            (self.w_accel_rate, "w_accel_rate"),
        ];
        for (value, name) in weights.iter().copied() {
            if value < 0.0 {
                return Err(ConfigError::NegativeWeight(name));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn nominal() -> Params {
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
            solver_max_iter: 500,
            solver_cost_tol: 1e-7,
            solver_grad_tol: 1e-4,
        }
    }

    #[test]
    fn nominal_params_validate() {
        assert!(nominal().validate().is_ok());
    }

    #[test]
    fn short_horizon_is_rejected() {
        let mut params = nominal();
        params.horizon_steps = 1;

        assert!(matches!(
            params.validate(),
            Err(ConfigError::HorizonTooShort(1))
        ));
    }

    #[test]
    fn negative_weight_is_rejected() {
        let mut params = nominal();
        params.w_epsi = -1.0;

        assert!(matches!(
            params.validate(),
            Err(ConfigError::NegativeWeight("w_epsi"))
        ));
    }

    #[test]
    fn non_positive_geometry_is_rejected() {
        let mut params = nominal();
        params.lf_m = 0.0;

        assert!(matches!(
            params.validate(),
            Err(ConfigError::NonPositive("lf_m"))
        ));
    }
}
