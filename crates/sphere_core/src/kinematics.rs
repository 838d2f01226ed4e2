//! Great-circle motion with linear drag.
//!
//! A body with speed `v`, thrust `a` and friction `μ` obeys
//! `dv/dt = a - μ v`. Over a step `dt` the closed form gives
//!
//! ```text
//! x  = μ dt
//! f  = (1 - e^-x) / x
//! g  = dt (1 - f) / x
//! θ  = (v f + a g) dt          arc travelled
//! v' = v e^-x + a dt f
//! ```
//!
//! so splitting an interval into more steps does not change the result for
//! constant thrust. Both coefficients fall back to their Taylor series when
//! `x` is tiny, where the closed forms lose all precision.

use crate::math::Vec3;

/// Below this `μ dt` the coefficients use their series expansion.
const SERIES_THRESHOLD: f64 = 1e-5;

/// Integration coefficients for one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepCoefficients {
    /// Speed decay factor `e^-x`.
    pub decay: f64,
    /// `(1 - e^-x) / x`.
    pub f: f64,
    /// `dt (1 - f) / x`.
    pub g: f64,
    /// Step length.
    pub dt: f64,
}

impl StepCoefficients {
    /// Compute the coefficients for friction `mu` over `dt`.
    #[must_use]
    pub fn new(mu: f64, dt: f64) -> Self {
        let x = mu * dt;
        let (f, g) = if x.abs() < SERIES_THRESHOLD {
            let mut f = -1.0 / 24.0 + x / 120.0;
            f = 1.0 / 6.0 + x * f;
            f = -1.0 / 2.0 + x * f;
            f = 1.0 + x * f;

            let mut g = -1.0 / 120.0 + x / 720.0;
            g = 1.0 / 24.0 + x * g;
            g = -1.0 / 6.0 + x * g;
            g = 1.0 / 2.0 + x * g;
            (f, dt * g)
        } else {
            let f = -(-x).exp_m1() / x;
            (f, dt * (1.0 - f) / x)
        };

        Self {
            decay: (-x).exp(),
            f,
            g,
            dt,
        }
    }

    /// Arc length travelled from speed `v` under thrust `a`.
    #[must_use]
    pub fn arc(&self, v: f64, a: f64) -> f64 {
        (v * self.f + a * self.g) * self.dt
    }

    /// Speed at the end of the step.
    #[must_use]
    pub fn speed(&self, v: f64, a: f64) -> f64 {
        v * self.decay + a * self.dt * self.f
    }
}

/// Advance a body by one step.
///
/// Returns the new `(r, v)`. The axis is unchanged; the position is
/// renormalized so rounding cannot drift it off the sphere.
#[must_use]
pub fn propagate(r: Vec3, u: Vec3, v: f64, a: f64, coefficients: &StepCoefficients) -> (Vec3, f64) {
    let theta = coefficients.arc(v, a);
    let speed = coefficients.speed(v, a);
    let position = r.rotated_about(u, theta).normalized();
    (position, speed)
}
