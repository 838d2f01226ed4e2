//! Missile impacts and agent-agent collisions.
//!
//! - A missile hits the nearest agent whose centre lies within
//!   `agent_radius` of it. Any agent qualifies: the owner and dead agents
//!   still absorb missiles.
//! - Damage depends on the angle between the agent's and the missile's
//!   axes: head-on 1, crossing 2, from behind 3.
//! - Two living agents closing in on each other inside `2 · agent_radius`
//!   bounce off along the chord between them.

use serde::{Deserialize, Serialize};

use crate::components::{Agent, AgentId, Missile};
use crate::math::Vec3;

/// Damage a missile deals to an agent: `round(2 + cos φ)`, where `φ` is
/// the angle between their axes.
///
/// Always in `1..=3`.
#[must_use]
pub fn impact_damage(agent: &Agent, missile: &Missile) -> i32 {
    let alignment = agent.u.dot(missile.u).clamp(-1.0, 1.0);
    (2.0 + alignment).round() as i32
}

/// The agent hit by a missile at `position`, if any.
///
/// Picks the agent with the largest `dot(agent.r, position)` that reaches
/// `threshold`; ties go to the lower index.
#[must_use]
pub fn nearest_hit(agents: &[Agent], position: Vec3, threshold: f64) -> Option<AgentId> {
    let mut best: Option<(AgentId, f64)> = None;
    for (index, agent) in agents.iter().enumerate() {
        let s = agent.r.dot(position);
        if s < threshold {
            continue;
        }
        if best.map_or(true, |(_, best_s)| s > best_s) {
            best = Some((index, s));
        }
    }
    best.map(|(index, _)| index)
}

/// Whether a pair of agents collided during a step.
///
/// `before` and `after` hold the pair's states at the start and end of the
/// step. The pair collides if both are alive, they overlap at either end
/// of the step and they are getting closer.
#[must_use]
pub fn is_colliding(before: (&Agent, &Agent), after: (&Agent, &Agent), threshold: f64) -> bool {
    if !before.0.is_alive() || !before.1.is_alive() {
        return false;
    }
    let s_before = before.0.r.dot(before.1.r);
    let s_after = after.0.r.dot(after.1.r);
    (s_before > threshold || s_after > threshold) && s_before < s_after
}

/// Exchange momentum between two touching agents.
///
/// Equal masses; `restitution` 1 is elastic, 0 fully plastic along the
/// chord. Velocities are projected back onto each agent's tangent plane.
/// Returns the impulse magnitude applied.
pub fn resolve_collision(first: &mut Agent, second: &mut Agent, restitution: f64) -> f64 {
    let Some(normal) = (first.r - second.r).try_normalized() else {
        return 0.0;
    };
    let v1 = first.velocity();
    let v2 = second.velocity();
    let impulse = 0.5 * (1.0 + restitution) * normal.dot(v1 - v2);

    first.set_velocity(v1 - normal * impulse);
    second.set_velocity(v2 + normal * impulse);
    impulse.abs()
}

/// A missile striking an agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MissileHit {
    /// Sub-step (counted across the engine's lifetime) of the impact.
    pub step: u64,
    /// Agent that fired the missile.
    pub owner: AgentId,
    /// Agent that was hit.
    pub agent: AgentId,
    /// Hit points removed.
    pub damage: i32,
    /// Hit points left afterwards.
    pub hp: i32,
}

/// Two agents bouncing off each other.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentCollision {
    /// Sub-step (counted across the engine's lifetime) of the collision.
    pub step: u64,
    /// Lower agent index.
    pub first: AgentId,
    /// Higher agent index.
    pub second: AgentId,
    /// Impulse magnitude exchanged.
    pub impulse: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(r: Vec3, u: Vec3, v: f64) -> Agent {
        Agent::new(r, u, v, 0.0, 5)
    }

    fn missile(u: Vec3) -> Missile {
        Missile::new(Vec3::X, u, 1.0, 0, None)
    }

    #[test]
    fn test_damage_by_direction() {
        let target = agent(Vec3::X, Vec3::Z, 1.0);
        assert_eq!(impact_damage(&target, &missile(Vec3::Z)), 3);
        assert_eq!(impact_damage(&target, &missile(-Vec3::Y)), 2);
        assert_eq!(impact_damage(&target, &missile(-Vec3::Z)), 1);
    }

    #[test]
    fn test_nearest_hit_prefers_closest() {
        let agents = [
            agent(Vec3::new(1.0, 0.05, 0.0).normalized(), Vec3::Z, 0.0),
            agent(Vec3::new(1.0, 0.01, 0.0).normalized(), Vec3::Z, 0.0),
            agent(Vec3::Y, Vec3::Z, 0.0),
        ];
        let threshold = 0.1f64.cos();
        assert_eq!(nearest_hit(&agents, Vec3::X, threshold), Some(1));
        assert_eq!(nearest_hit(&agents, -Vec3::X, threshold), None);
    }

    #[test]
    fn test_nearest_hit_includes_dead_agents() {
        let mut dead = agent(Vec3::X, Vec3::Z, 0.0);
        dead.hp = 0;
        assert_eq!(nearest_hit(&[dead], Vec3::X, 0.99), Some(0));
    }

    #[test]
    fn test_collision_requires_closing_living_pair() {
        let threshold = 0.2f64.cos();
        let a_before = agent(Vec3::X, Vec3::Z, 1.0);
        let b_before = agent(Vec3::new(1.0, 0.3, 0.0).normalized(), Vec3::Z, 0.0);
        let a_after = agent(Vec3::new(1.0, 0.1, 0.0).normalized(), Vec3::Z, 1.0);

        assert!(is_colliding(
            (&a_before, &b_before),
            (&a_after, &b_before),
            threshold
        ));
        // Moving apart
        assert!(!is_colliding(
            (&a_after, &b_before),
            (&a_before, &b_before),
            threshold
        ));

        let mut dead = b_before;
        dead.hp = 0;
        assert!(!is_colliding((&a_before, &dead), (&a_after, &dead), threshold));
    }

    #[test]
    fn test_elastic_head_on_exchanges_speed() {
        let r1 = Vec3::X;
        let r2 = Vec3::new(1.0, 0.1, 0.0).normalized();
        let mut first = agent(r1, Vec3::Z, 1.0);
        let mut second = agent(r2, Vec3::Z, 0.0);

        let impulse = resolve_collision(&mut first, &mut second, 1.0);
        assert!(impulse > 0.9);
        assert!(first.v < 0.05);
        assert!(second.v > 0.95);
        // Second agent keeps travelling the same way
        assert!(second.u.dot(Vec3::Z) > 0.99);
    }

    #[test]
    fn test_restitution_scales_impulse() {
        let r2 = Vec3::new(1.0, 0.1, 0.0).normalized();
        let mut a1 = agent(Vec3::X, Vec3::Z, 1.0);
        let mut b1 = agent(r2, Vec3::Z, 0.0);
        let mut a2 = a1;
        let mut b2 = b1;

        let elastic = resolve_collision(&mut a1, &mut b1, 1.0);
        let plastic = resolve_collision(&mut a2, &mut b2, 0.0);
        assert!((elastic - 2.0 * plastic).abs() < 1e-12);
    }
}
