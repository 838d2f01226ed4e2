//! Global physical parameters shared by every body in an engine.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Linear drag applied to agents and missiles unless overridden.
pub const DEFAULT_FRICTION: f64 = 1.0;

/// Immutable world parameters.
///
/// Angles are in radians on the unit sphere. Build with [`World::new`] so
/// the ranges below are enforced:
///
/// - `restitution >= 0`
/// - `0 < agent_radius < π/2`
/// - `missile_acceleration >= 0`
/// - `friction >= 0`
/// - `missile_guidance >= 0`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct World {
    /// Coefficient of restitution for agent-agent collisions.
    pub restitution: f64,
    /// Angular radius of an agent's body.
    pub agent_radius: f64,
    /// Constant thrust applied to every missile.
    pub missile_acceleration: f64,
    /// Linear drag coefficient `μ` in `dv/dt = a - μ v`.
    #[serde(default = "default_friction")]
    pub friction: f64,
    /// Steering gain for homing missiles. Zero means ballistic.
    #[serde(default)]
    pub missile_guidance: f64,
}

fn default_friction() -> f64 {
    DEFAULT_FRICTION
}

impl World {
    /// Create a world with default friction and no missile guidance.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidWorld`] when a parameter is non-finite
    /// or out of range.
    ///
    /// # Example
    ///
    /// ```
    /// use sphere_core::world::World;
    ///
    /// let world = World::new(1.0, 0.1, 1.0).unwrap();
    /// assert_eq!(world.friction, 1.0);
    /// assert!(World::new(1.0, 0.0, 1.0).is_err());
    /// ```
    pub fn new(restitution: f64, agent_radius: f64, missile_acceleration: f64) -> Result<Self> {
        let world = Self {
            restitution,
            agent_radius,
            missile_acceleration,
            friction: DEFAULT_FRICTION,
            missile_guidance: 0.0,
        };
        world.validate()?;
        Ok(world)
    }

    /// Replace the drag coefficient.
    pub fn with_friction(mut self, friction: f64) -> Result<Self> {
        self.friction = friction;
        self.validate()?;
        Ok(self)
    }

    /// Enable homing missiles with the given steering gain.
    pub fn with_guidance(mut self, gain: f64) -> Result<Self> {
        self.missile_guidance = gain;
        self.validate()?;
        Ok(self)
    }

    /// Check every parameter against its allowed range.
    ///
    /// Worlds that arrive through serde bypass [`World::new`], so the engine
    /// calls this again on construction.
    pub fn validate(&self) -> Result<()> {
        non_negative("restitution", self.restitution)?;
        non_negative("missile_acceleration", self.missile_acceleration)?;
        non_negative("friction", self.friction)?;
        non_negative("missile_guidance", self.missile_guidance)?;

        let r = self.agent_radius;
        if !r.is_finite() || r <= 0.0 || r >= std::f64::consts::FRAC_PI_2 {
            return Err(EngineError::InvalidWorld {
                parameter: "agent_radius",
                value: r,
            });
        }
        Ok(())
    }

    /// Minimum `dot(agent.r, missile.r)` for a missile to hit an agent.
    #[must_use]
    pub fn hit_threshold(&self) -> f64 {
        self.agent_radius.cos()
    }

    /// Maximum `dot(a.r, b.r)` at which two agents are not touching.
    #[must_use]
    pub fn collision_threshold(&self) -> f64 {
        (2.0 * self.agent_radius).cos()
    }

    /// Whether missiles steer toward their targets.
    #[must_use]
    pub fn is_guided(&self) -> bool {
        self.missile_guidance > 0.0
    }
}

fn non_negative(parameter: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidWorld { parameter, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_keeps_parameters() {
        let world = World::new(0.5, 0.2, 3.0).unwrap();
        assert_eq!(world.restitution, 0.5);
        assert_eq!(world.agent_radius, 0.2);
        assert_eq!(world.missile_acceleration, 3.0);
        assert_eq!(world.friction, DEFAULT_FRICTION);
        assert!(!world.is_guided());
    }

    #[test]
    fn test_rejects_bad_radius() {
        for radius in [0.0, -0.1, 2.0, f64::NAN, f64::INFINITY] {
            let err = World::new(1.0, radius, 1.0).unwrap_err();
            assert!(matches!(
                err,
                EngineError::InvalidWorld {
                    parameter: "agent_radius",
                    ..
                }
            ));
        }
    }

    #[test]
    fn test_rejects_negative_parameters() {
        assert!(World::new(-1.0, 0.1, 1.0).is_err());
        assert!(World::new(1.0, 0.1, -1.0).is_err());

        let world = World::new(1.0, 0.1, 1.0).unwrap();
        assert!(world.with_friction(-0.5).is_err());
        assert!(world.with_guidance(f64::NAN).is_err());
        assert!(world.with_guidance(2.0).unwrap().is_guided());
    }

    #[test]
    fn test_thresholds() {
        let world = World::new(1.0, 0.1, 1.0).unwrap();
        assert!((world.hit_threshold() - 0.1f64.cos()).abs() < 1e-15);
        assert!((world.collision_threshold() - 0.2f64.cos()).abs() < 1e-15);
        assert!(world.collision_threshold() < world.hit_threshold());
    }

    #[test]
    fn test_serde_defaults() {
        let world: World = ron::from_str(
            "(restitution: 1.0, agent_radius: 0.1, missile_acceleration: 1.0)",
        )
        .unwrap();
        assert_eq!(world.friction, DEFAULT_FRICTION);
        assert_eq!(world.missile_guidance, 0.0);
    }
}
