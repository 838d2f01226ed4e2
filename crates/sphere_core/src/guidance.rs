//! Steering law for homing missiles.
//!
//! A missile flying the great circle with axis `u` hits a target at `t`
//! only if `t` lies on that circle, i.e. when `u` is parallel to `r × t`.
//! Each step the axis is turned about the missile position toward that
//! ideal axis at a rate proportional to the remaining heading error.

use crate::math::Vec3;

/// Signed heading error (radians) between the current axis and the axis
/// that leads to `target`.
///
/// Returns `None` when the target is at the missile's position or its
/// antipode, where every great circle leads there.
#[must_use]
pub fn heading_error(r: Vec3, u: Vec3, target: Vec3) -> Option<f64> {
    let desired = r.cross(target).try_normalized()?;
    let sin = r.dot(u.cross(desired));
    let cos = u.dot(desired);
    Some(sin.atan2(cos))
}

/// Axis after one steering step of length `dt` with the given `gain`.
///
/// The turn never overshoots the ideal axis.
#[must_use]
pub fn steer(r: Vec3, u: Vec3, target: Vec3, gain: f64, dt: f64) -> Vec3 {
    let Some(error) = heading_error(r, u, target) else {
        return u;
    };
    let limit = error.abs();
    let turn = (gain * error * dt).clamp(-limit, limit);
    u.rotated_about(r, turn).normalized()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_error_when_on_course() {
        // Missile at x flying toward y on the equator
        let error = heading_error(Vec3::X, Vec3::Z, Vec3::Y).unwrap();
        assert!(error.abs() < 1e-12);
    }

    #[test]
    fn test_error_sign_and_magnitude() {
        // Target straight north of the missile: ideal axis is -y
        let error = heading_error(Vec3::X, Vec3::Z, Vec3::Z).unwrap();
        assert!((error.abs() - std::f64::consts::FRAC_PI_2).abs() < 1e-12);

        let steered = Vec3::Z.rotated_about(Vec3::X, error);
        assert!(steered.approx_eq(-Vec3::Y, 1e-12));
    }

    #[test]
    fn test_degenerate_target() {
        assert!(heading_error(Vec3::X, Vec3::Z, Vec3::X).is_none());
        assert!(heading_error(Vec3::X, Vec3::Z, -Vec3::X).is_none());
        assert_eq!(steer(Vec3::X, Vec3::Z, Vec3::X, 10.0, 0.1), Vec3::Z);
    }

    #[test]
    fn test_steer_never_overshoots() {
        let u = steer(Vec3::X, Vec3::Z, Vec3::Z, 1e6, 1.0);
        assert!(u.approx_eq(-Vec3::Y, 1e-12));
    }

    #[test]
    fn test_steer_partial_turn() {
        let u = steer(Vec3::X, Vec3::Z, Vec3::Z, 1.0, 0.1);
        let remaining = heading_error(Vec3::X, u, Vec3::Z).unwrap();
        let expected = std::f64::consts::FRAC_PI_2 * 0.9;
        assert!((remaining.abs() - expected).abs() < 1e-12);
        assert!(u.dot(Vec3::X).abs() < 1e-12);
    }
}
