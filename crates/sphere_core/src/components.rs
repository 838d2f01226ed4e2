//! Agent and missile records.
//!
//! Both are plain data. Each body sits at a unit position `r` and moves
//! along the great circle whose axis is the unit vector `u` (always
//! orthogonal to `r`). Its velocity vector is `v · (u × r)`.

use serde::{Deserialize, Serialize};

use crate::math::Vec3;

/// Index of an agent in its engine. Agents are never removed, so an id
/// stays valid for the engine's lifetime.
pub type AgentId = usize;

/// A combatant moving on the sphere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Unit position on the sphere.
    pub r: Vec3,
    /// Unit rotation axis, orthogonal to `r`.
    pub u: Vec3,
    /// Speed along the great circle.
    pub v: f64,
    /// Thrust (tangential acceleration).
    pub a: f64,
    /// Hit points. The agent is alive while this is positive.
    pub hp: i32,
}

impl Agent {
    /// Create a new agent.
    #[must_use]
    pub const fn new(r: Vec3, u: Vec3, v: f64, a: f64, hp: i32) -> Self {
        Self { r, u, v, a, hp }
    }

    /// Whether the agent still has hit points left.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Unit heading, tangent to the sphere at `r`.
    #[must_use]
    pub fn heading(&self) -> Vec3 {
        self.u.cross(self.r)
    }

    /// Velocity vector in the tangent plane.
    #[must_use]
    pub fn velocity(&self) -> Vec3 {
        self.heading() * self.v
    }

    /// Replace the motion with a tangent velocity vector.
    ///
    /// The speed becomes `|velocity|` and the axis `r × velocity`. A
    /// (near) zero velocity stops the agent but keeps its axis.
    pub fn set_velocity(&mut self, velocity: Vec3) {
        let tangent = velocity.reject_from(self.r);
        self.v = tangent.length();
        if let Some(axis) = self.r.cross(tangent).try_normalized() {
            self.u = axis;
        }
    }

    /// Rotate the heading about the position by `angle` radians.
    ///
    /// Positive angles turn left when looking down on the sphere.
    pub fn turn(&mut self, angle: f64) {
        self.u = self.u.rotated_about(self.r, angle).normalized();
    }

    /// Compare within an absolute tolerance (hp must match exactly).
    #[must_use]
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        self.r.approx_eq(other.r, tolerance)
            && self.u.approx_eq(other.u, tolerance)
            && (self.v - other.v).abs() <= tolerance
            && (self.a - other.a).abs() <= tolerance
            && self.hp == other.hp
    }
}

/// A projectile in flight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Missile {
    /// Unit position on the sphere.
    pub r: Vec3,
    /// Unit rotation axis, orthogonal to `r`.
    pub u: Vec3,
    /// Speed along the great circle.
    pub v: f64,
    /// Agent that fired the missile.
    pub owner: AgentId,
    /// Agent the missile steers toward when guidance is enabled.
    pub target: Option<AgentId>,
}

impl Missile {
    /// Create a new missile.
    #[must_use]
    pub const fn new(r: Vec3, u: Vec3, v: f64, owner: AgentId, target: Option<AgentId>) -> Self {
        Self {
            r,
            u,
            v,
            owner,
            target,
        }
    }

    /// Unit heading, tangent to the sphere at `r`.
    #[must_use]
    pub fn heading(&self) -> Vec3 {
        self.u.cross(self.r)
    }

    /// Velocity vector in the tangent plane.
    #[must_use]
    pub fn velocity(&self) -> Vec3 {
        self.heading() * self.v
    }

    /// Compare within an absolute tolerance (owner and target must match).
    #[must_use]
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        self.r.approx_eq(other.r, tolerance)
            && self.u.approx_eq(other.u, tolerance)
            && (self.v - other.v).abs() <= tolerance
            && self.owner == other.owner
            && self.target == other.target
    }
}
