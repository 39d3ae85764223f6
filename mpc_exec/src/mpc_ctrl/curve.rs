//! Reference curve fitting and evaluation
//!
//! Fits a low-degree polynomial to the vehicle-frame waypoints by linear
//! least squares. The solve goes through a Householder QR factorisation of
//! the Vandermonde matrix rather than the normal equations, which keeps the
//! fit stable when the waypoints are nearly collinear.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{DMatrix, DVector};
use num_dual::DualNum;
use thiserror::Error;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Relative threshold on the R factor's diagonal below which the fit is
/// declared rank deficient.
const RANK_TOL: f64 = 1e-12;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A polynomial reference path in the vehicle frame.
///
/// Coefficients are ordered lowest to highest degree, so `coeffs[0]` is the
/// curve's height at the origin. Recomputed every cycle, never mutated.
#[derive(Debug, Clone)]
pub struct RefCurve {
    coeffs: Vec<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised while fitting the reference curve.
#[derive(Debug, Error)]
pub enum CurveFitError {
    /// Not enough points to constrain the requested degree. A degree `d`
    /// polynomial needs at least `d + 1` points.
    #[error("Degenerate fit: {got} points cannot constrain a degree {order} polynomial")]
    DegenerateFit { got: usize, order: usize },

    /// The fitting matrix lost rank, typically because the waypoints share
    /// abscissae.
    #[error("Reference fit is rank deficient, waypoints may be collinear or duplicated")]
    RankDeficient,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RefCurve {
    /// Fit a polynomial of the given degree to the points, minimising the
    /// summed squared vertical residual.
    pub fn fit(xs_m: &[f64], ys_m: &[f64], order: usize) -> Result<Self, CurveFitError> {
        if order < 1 || xs_m.len() < order + 1 {
            return Err(CurveFitError::DegenerateFit {
                got: xs_m.len(),
                order,
            });
        }

        // Vandermonde matrix, columns in increasing power
        let rows = xs_m.len();
        let mut a = DMatrix::<f64>::zeros(rows, order + 1);
        for i in 0..rows {
            a[(i, 0)] = 1.0;
            for j in 0..order {
                a[(i, j + 1)] = a[(i, j)] * xs_m[i];
            }
        }

        let y = DVector::<f64>::from_column_slice(ys_m);

        let qr = a.qr();
        let r = qr.r();

        // Check the triangular factor's conditioning before solving
        let mut diag_max = 0f64;
        for j in 0..=order {
            diag_max = diag_max.max(r[(j, j)].abs());
        }
        for j in 0..=order {
            if r[(j, j)].abs() < RANK_TOL * diag_max.max(1.0) {
                return Err(CurveFitError::RankDeficient);
            }
        }

        let rhs = qr.q().transpose() * y;
        let coeffs = r
            .solve_upper_triangular(&rhs)
            .ok_or(CurveFitError::RankDeficient)?;

        Ok(Self {
            coeffs: coeffs.iter().copied().collect(),
        })
    }

    /// Build a curve directly from coefficients, lowest degree first.
    pub fn from_coeffs(coeffs: Vec<f64>) -> Self {
        Self { coeffs }
    }

    /// The fitted coefficients, lowest degree first.
    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    /// Evaluate the curve at `x`, Horner form.
    ///
    /// Generic over dual numbers so the optimiser can differentiate through
    /// the reference during the horizon rollout.
    pub fn eval<T: DualNum<f64> + Copy>(&self, x: T) -> T {
        let mut acc = T::from(0.0);
        for &c in self.coeffs.iter().rev() {
            acc = acc * x + c;
        }
        acc
    }

    /// Evaluate the curve's first derivative at `x`.
    pub fn slope<T: DualNum<f64> + Copy>(&self, x: T) -> T {
        let mut acc = T::from(0.0);
        for i in (1..self.coeffs.len()).rev() {
            acc = acc * x + self.coeffs[i] * i as f64;
        }
        acc
    }

    /// Cross-track error at the vehicle frame origin.
    pub fn cte_at_origin(&self) -> f64 {
        self.coeffs.first().copied().unwrap_or(0.0)
    }

    /// Heading error at the vehicle frame origin: the negated arctangent of
    /// the curve's slope there.
    pub fn heading_error_at_origin(&self) -> f64 {
        match self.coeffs.get(1) {
            Some(c1) => -c1.atan(),
            None => 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
