//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Wrap an angle into the range [-pi, pi].
pub fn wrap_pi<T>(angle: T) -> T
where
    T: Float,
{
    let pi = T::from(std::f64::consts::PI).unwrap();
    let tau = T::from(std::f64::consts::TAU).unwrap();

    let mut a = angle % tau;

    if a > pi {
        a = a - tau;
    }
    if a < -pi {
        a = a + tau;
    }

    a
}

/// Return the euclidian distance between two 2D points.
pub fn dist2<T>(point_0: &[T; 2], point_1: &[T; 2]) -> T
where
    T: Float,
{
    ((point_0[0] - point_1[0]).powi(2) + (point_0[1] - point_1[1]).powi(2)).sqrt()
}

#[cfg(test)]
mod test {
    use super::*;

    const PI: f64 = std::f64::consts::PI;

    #[test]
    fn test_wrap_pi() {
        assert!((wrap_pi(0f64)).abs() < 1e-12);
        assert!((wrap_pi(PI / 2.0) - PI / 2.0).abs() < 1e-12);
        assert!((wrap_pi(3.0 * PI) - PI).abs() < 1e-12);
        assert!((wrap_pi(-3.0 * PI) + PI).abs() < 1e-12);
        assert!((wrap_pi(2.0 * PI)).abs() < 1e-12);
    }

    #[test]
    fn test_dist2() {
        assert!((dist2(&[0f64, 0f64], &[3f64, 4f64]) - 5.0).abs() < 1e-12);
        assert!(dist2(&[1f64, 1f64], &[1f64, 1f64]).abs() < 1e-12);
    }
}
