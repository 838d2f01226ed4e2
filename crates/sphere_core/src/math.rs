//! Vector math for bodies living on the unit sphere.
//!
//! Positions are unit vectors, and every body moves along a great circle
//! described by a unit axis. [`Vec3`] carries the handful of operations the
//! engine needs for that: dot/cross products, normalization and rotation
//! about an axis.

use serde::{Deserialize, Serialize};

/// Default absolute tolerance for approximate comparisons.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// A 3D Euclidean vector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
}

impl Vec3 {
    /// Zero vector.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Unit vector along X.
    pub const X: Self = Self::new(1.0, 0.0, 0.0);

    /// Unit vector along Y.
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);

    /// Unit vector along Z.
    pub const Z: Self = Self::new(0.0, 0.0, 1.0);

    /// Create a new vector.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product `self × other`.
    #[must_use]
    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Squared length (avoids sqrt for comparisons).
    #[must_use]
    pub fn length_squared(self) -> f64 {
        self.dot(self)
    }

    /// Euclidean length.
    #[must_use]
    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Whether every component is finite.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Normalize the vector, or `None` if it has (almost) no length.
    #[must_use]
    pub fn try_normalized(self) -> Option<Self> {
        let len = self.length();
        if len > f64::EPSILON && len.is_finite() {
            Some(self / len)
        } else {
            None
        }
    }

    /// Normalize the vector.
    ///
    /// The engine never normalizes a zero vector on its own paths; doing so
    /// is a caller bug and trips a debug assertion. Release builds return
    /// the input unchanged.
    #[must_use]
    pub fn normalized(self) -> Self {
        let normalized = self.try_normalized();
        debug_assert!(normalized.is_some(), "normalizing zero-length vector {self:?}");
        normalized.unwrap_or(self)
    }

    /// Rotate `self` about the unit `axis` by `angle` radians (right hand rule).
    #[must_use]
    pub fn rotated_about(self, axis: Self, angle: f64) -> Self {
        let along = axis * axis.dot(self);
        let cross = axis.cross(self);
        let perpendicular = cross.cross(axis);
        let (sin, cos) = angle.sin_cos();
        along + perpendicular * cos + cross * sin
    }

    /// Component of `self` orthogonal to the unit vector `normal`.
    #[must_use]
    pub fn reject_from(self, normal: Self) -> Self {
        self - normal * self.dot(normal)
    }

    /// Angular separation in radians between two unit vectors.
    #[must_use]
    pub fn angle_to(self, other: Self) -> f64 {
        self.dot(other).clamp(-1.0, 1.0).acos()
    }

    /// Compare component-wise within an absolute tolerance.
    #[must_use]
    pub fn approx_eq(self, other: Self, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && (self.z - other.z).abs() <= tolerance
    }
}

impl std::ops::Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::SubAssign for Vec3 {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl std::ops::Neg for Vec3 {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl std::ops::Mul<f64> for Vec3 {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl std::ops::Div<f64> for Vec3 {
    type Output = Self;

    fn div(self, rhs: f64) -> Self::Output {
        Self::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_follows_right_hand_rule() {
        assert_eq!(Vec3::X.cross(Vec3::Y), Vec3::Z);
        assert_eq!(Vec3::Y.cross(Vec3::Z), Vec3::X);
        assert_eq!(Vec3::Z.cross(Vec3::X), Vec3::Y);
    }

    #[test]
    fn test_dot() {
        let a = Vec3::new(2.0, 3.0, -1.0);
        let b = Vec3::new(4.0, -1.0, 2.0);
        assert_eq!(a.dot(b), 3.0);
    }

    #[test]
    fn test_normalize() {
        let v = Vec3::new(3.0, 4.0, 0.0).normalized();
        assert!((v.length() - 1.0).abs() < 1e-12);
        assert!(v.approx_eq(Vec3::new(0.6, 0.8, 0.0), 1e-12));
    }

    #[test]
    fn test_try_normalized_rejects_zero() {
        assert!(Vec3::ZERO.try_normalized().is_none());
        assert!(Vec3::new(f64::NAN, 0.0, 0.0).try_normalized().is_none());
    }

    #[test]
    fn test_rotation_about_z() {
        let quarter = std::f64::consts::FRAC_PI_2;
        let rotated = Vec3::X.rotated_about(Vec3::Z, quarter);
        assert!(rotated.approx_eq(Vec3::Y, 1e-12));

        // Rotating the axis itself is a no-op
        assert!(Vec3::Z.rotated_about(Vec3::Z, 1.234).approx_eq(Vec3::Z, 1e-12));
    }

    #[test]
    fn test_rotation_preserves_length() {
        let axis = Vec3::new(1.0, 1.0, 1.0).normalized();
        let v = Vec3::new(0.3, -2.0, 0.7);
        let rotated = v.rotated_about(axis, 0.9);
        assert!((rotated.length() - v.length()).abs() < 1e-12);
    }

    #[test]
    fn test_reject_from() {
        let v = Vec3::new(1.0, 2.0, 3.0).reject_from(Vec3::Z);
        assert_eq!(v, Vec3::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn test_angle_to() {
        let angle = Vec3::X.angle_to(Vec3::Y);
        assert!((angle - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }
}
