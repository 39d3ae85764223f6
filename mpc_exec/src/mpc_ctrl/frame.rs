//! World/vehicle frame transformations
//!
//! The optimiser works entirely in the vehicle frame centred on the
//! predicted pose, with the local X axis along the predicted heading. In
//! that frame the initial position and heading are zero by construction,
//! which keeps the fitted curve well conditioned near the origin.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use thiserror::Error;

// Internal
use super::state_pred::PredictedPose;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised when transforming waypoints between frames.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("No waypoints supplied to transform into the vehicle frame")]
    InsufficientReferenceData,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Express world-frame waypoints in the vehicle frame at the given pose.
///
/// Translates by the pose position, then rotates by the negated heading.
/// The two slices must be of equal length (enforced upstream by telemetry
/// validation); at least one waypoint is required.
pub fn world_to_vehicle(
    xs_m: &[f64],
    ys_m: &[f64],
    pose: &PredictedPose,
) -> Result<(Vec<f64>, Vec<f64>), FrameError> {
    if xs_m.is_empty() {
        return Err(FrameError::InsufficientReferenceData);
    }

    let (sin_h, cos_h) = pose.heading_rad.sin_cos();

    let mut local_x_m = Vec::with_capacity(xs_m.len());
    let mut local_y_m = Vec::with_capacity(ys_m.len());

    for (x_m, y_m) in xs_m.iter().zip(ys_m.iter()) {
        let dx_m = x_m - pose.x_m;
        let dy_m = y_m - pose.y_m;

        local_x_m.push(dx_m * cos_h + dy_m * sin_h);
        local_y_m.push(-dx_m * sin_h + dy_m * cos_h);
    }

    Ok((local_x_m, local_y_m))
}

/// Express vehicle-frame points back in the world frame at the given pose.
///
/// Exact inverse of [`world_to_vehicle`]: rotate by the heading, then
/// translate by the pose position.
pub fn vehicle_to_world(xs_m: &[f64], ys_m: &[f64], pose: &PredictedPose) -> (Vec<f64>, Vec<f64>) {
    let (sin_h, cos_h) = pose.heading_rad.sin_cos();

    let mut world_x_m = Vec::with_capacity(xs_m.len());
    let mut world_y_m = Vec::with_capacity(ys_m.len());

    for (x_m, y_m) in xs_m.iter().zip(ys_m.iter()) {
        world_x_m.push(x_m * cos_h - y_m * sin_h + pose.x_m);
        world_y_m.push(x_m * sin_h + y_m * cos_h + pose.y_m);
    }

    (world_x_m, world_y_m)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn pose(x_m: f64, y_m: f64, heading_rad: f64) -> PredictedPose {
        PredictedPose {
            x_m,
            y_m,
            heading_rad,
            speed_ms: 10.0,
        }
    }

    #[test]
    fn round_trip_recovers_world_points() {
        let xs_m = vec![0.0, 12.5, -7.0, 3.3, 100.0];
        let ys_m = vec![1.0, -4.0, 9.2, 0.0, -55.5];

        let poses = [
            pose(0.0, 0.0, 0.0),
            pose(5.0, -3.0, 0.7),
            pose(-20.0, 14.0, -2.9),
            pose(1e3, -1e3, 3.1),
        ];

        for p in poses.iter() {
            let (lx, ly) = world_to_vehicle(&xs_m, &ys_m, p).unwrap();
            let (wx, wy) = vehicle_to_world(&lx, &ly, p);

            for i in 0..xs_m.len() {
                assert!((wx[i] - xs_m[i]).abs() < 1e-9, "x[{}] for pose {:?}", i, p);
                assert!((wy[i] - ys_m[i]).abs() < 1e-9, "y[{}] for pose {:?}", i, p);
            }
        }
    }

    #[test]
    fn waypoint_ahead_maps_onto_local_x_axis() {
        // A waypoint dead ahead of the vehicle lands on the positive local
        // X axis regardless of the pose
        let p = pose(2.0, 3.0, std::f64::consts::FRAC_PI_2);

        let (lx, ly) = world_to_vehicle(&[2.0], &[8.0], &p).unwrap();

        assert!((lx[0] - 5.0).abs() < 1e-12);
        assert!(ly[0].abs() < 1e-12);
    }

    #[test]
    fn empty_waypoints_are_rejected() {
        assert!(matches!(
            world_to_vehicle(&[], &[], &pose(0.0, 0.0, 0.0)),
            Err(FrameError::InsufficientReferenceData)
        ));
    }
}
