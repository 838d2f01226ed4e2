//! The simulation engine.
//!
//! [`Engine`] owns the world parameters, a fixed list of agents and the
//! missiles in flight. Time only advances through [`Engine::simulate`],
//! which splits an interval into equal sub-steps.
//!
//! # Determinism
//!
//! - Agents and missiles are processed in index order
//! - Hits are collected from one consistent snapshot before any damage is
//!   applied or any missile removed
//! - The same inputs always produce bit-identical state (see
//!   [`Engine::state_hash`])
//!
//! # Example
//!
//! ```
//! use sphere_core::prelude::*;
//!
//! let world = World::new(1.0, 0.1, 2.0).unwrap();
//! let agents = vec![
//!     Agent::new(Vec3::X, Vec3::Z, 1.0, 1.0, 5),
//!     Agent::new(Vec3::Y, Vec3::Z, 0.0, 0.0, 5),
//! ];
//! let mut engine = Engine::new(world, agents).unwrap();
//!
//! engine.launch_missile(0, None).unwrap();
//! let events = engine.simulate(2.0, 2000).unwrap();
//!
//! assert_eq!(events.hits.len(), 1);
//! assert!(engine.missiles().is_empty());
//! assert_eq!(engine.agents()[1].hp, 2);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::combat::{
    impact_damage, is_colliding, nearest_hit, resolve_collision, AgentCollision, MissileHit,
};
use crate::components::{Agent, AgentId, Missile};
use crate::error::{EngineError, Result};
use crate::guidance::steer;
use crate::kinematics::{propagate, StepCoefficients};
use crate::math::{Vec3, DEFAULT_TOLERANCE};
use crate::replay::Action;
use crate::state::EngineState;
use crate::world::World;

/// Extra angle (radians) past the agent radius at which missiles spawn, so
/// a fresh missile is not inside its owner's hit cone.
pub const LAUNCH_MARGIN: f64 = 1e-6;

/// Events produced by a call to [`Engine::simulate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationEvents {
    /// Missile impacts, in the order they were applied.
    pub hits: Vec<MissileHit>,
    /// Agent-agent collisions.
    pub collisions: Vec<AgentCollision>,
}

impl SimulationEvents {
    /// Whether nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty() && self.collisions.is_empty()
    }

    /// Total damage dealt to `agent`.
    #[must_use]
    pub fn damage_to(&self, agent: AgentId) -> i32 {
        self.hits
            .iter()
            .filter(|hit| hit.agent == agent)
            .map(|hit| hit.damage)
            .sum()
    }

    /// Append another batch of events.
    pub fn extend(&mut self, other: Self) {
        self.hits.extend(other.hits);
        self.collisions.extend(other.collisions);
    }
}

/// The sphere combat simulation.
///
/// Each sub-step runs in this order:
/// 1. **Agents** - propagate, then bounce colliding pairs
/// 2. **Missiles** - steer (when guided) and propagate
/// 3. **Impacts** - find every hit, then apply damage and drop the missiles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Engine {
    world: World,
    agents: Vec<Agent>,
    missiles: Vec<Missile>,
    /// Simulated time so far.
    elapsed: f64,
    /// Sub-steps run so far.
    steps: u64,
    #[serde(skip)]
    scratch: Vec<Agent>,
}

impl Engine {
    /// Create an engine with the given agents and no missiles.
    ///
    /// Positions are normalized and each axis is projected onto its
    /// agent's tangent plane, so slightly-off inputs are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidWorld`] for out-of-range world
    /// parameters and [`EngineError::InvalidAgent`] for an agent with a
    /// degenerate position or axis or a non-finite speed or thrust.
    pub fn new(world: World, agents: impl Into<Vec<Agent>>) -> Result<Self> {
        world.validate()?;
        let agents = agents
            .into()
            .into_iter()
            .enumerate()
            .map(|(index, agent)| normalize_agent(index, agent))
            .collect::<Result<Vec<_>>>()?;

        debug!(agents = agents.len(), "Engine created");
        Ok(Self {
            world,
            agents,
            missiles: Vec::new(),
            elapsed: 0.0,
            steps: 0,
            scratch: Vec::new(),
        })
    }

    /// Rebuild an engine from a snapshot.
    ///
    /// Counters restart at zero.
    ///
    /// # Errors
    ///
    /// Same as [`Engine::new`], plus [`EngineError::InvalidMissile`] for a
    /// degenerate missile or one whose target does not exist. Owners are
    /// only used for attribution and are not checked.
    pub fn restore(world: World, state: EngineState) -> Result<Self> {
        let mut engine = Self::new(world, state.agents)?;
        let len = engine.agents.len();
        engine.missiles = state
            .missiles
            .into_iter()
            .enumerate()
            .map(|(index, missile)| normalize_missile(index, missile, len))
            .collect::<Result<Vec<_>>>()?;
        Ok(engine)
    }

    /// Copy out the current agents and missiles.
    #[must_use]
    pub fn snapshot(&self) -> EngineState {
        EngineState {
            agents: self.agents.clone(),
            missiles: self.missiles.clone(),
        }
    }

    /// World parameters.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// All agents, in construction order.
    #[must_use]
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Missiles in flight, in launch order.
    #[must_use]
    pub fn missiles(&self) -> &[Missile] {
        &self.missiles
    }

    /// Look up one agent.
    pub fn agent(&self, index: AgentId) -> Result<&Agent> {
        self.agents
            .get(index)
            .ok_or(EngineError::AgentIndexOutOfRange {
                index,
                len: self.agents.len(),
            })
    }

    /// Look up one missile.
    pub fn missile(&self, index: usize) -> Result<&Missile> {
        self.missiles
            .get(index)
            .ok_or(EngineError::MissileIndexOutOfRange {
                index,
                len: self.missiles.len(),
            })
    }

    /// Simulated time so far.
    #[must_use]
    pub const fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Sub-steps run so far.
    #[must_use]
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    /// Fire a missile from an agent.
    ///
    /// The missile starts `agent_radius` (plus [`LAUNCH_MARGIN`]) ahead of
    /// the agent on its great circle, shares its axis and flies at `v`, or
    /// at the agent's speed when `v` is `None`. Its target is the nearest
    /// other living agent. Returns the missile's index.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AgentIndexOutOfRange`] for a bad index and
    /// [`EngineError::InvalidMissile`] for a non-finite speed.
    pub fn launch_missile(&mut self, agent_idx: AgentId, v: Option<f64>) -> Result<usize> {
        let agent = *self.agent(agent_idx)?;
        let speed = v.unwrap_or(agent.v);
        let index = self.missiles.len();
        if !speed.is_finite() {
            return Err(EngineError::InvalidMissile {
                index,
                reason: format!("launch speed {speed} is not finite"),
            });
        }

        let position = agent
            .r
            .rotated_about(agent.u, self.world.agent_radius + LAUNCH_MARGIN)
            .normalized();
        let target = self.nearest_target(agent_idx);
        self.missiles
            .push(Missile::new(position, agent.u, speed, agent_idx, target));

        debug!(owner = agent_idx, missile = index, speed, ?target, "Missile launched");
        Ok(index)
    }

    /// Rotate an agent's heading by `angle` radians about its position.
    pub fn turn_agent(&mut self, agent_idx: AgentId, angle: f64) -> Result<()> {
        let agent = self.agent_mut(agent_idx)?;
        if !angle.is_finite() {
            return Err(EngineError::InvalidAgent {
                index: agent_idx,
                reason: format!("turn angle {angle} is not finite"),
            });
        }
        agent.turn(angle);
        Ok(())
    }

    /// Set an agent's thrust.
    pub fn set_thrust(&mut self, agent_idx: AgentId, thrust: f64) -> Result<()> {
        let agent = self.agent_mut(agent_idx)?;
        if !thrust.is_finite() {
            return Err(EngineError::InvalidAgent {
                index: agent_idx,
                reason: format!("thrust {thrust} is not finite"),
            });
        }
        agent.a = thrust;
        Ok(())
    }

    /// Remove every missile in flight.
    pub fn clear_missiles(&mut self) {
        self.missiles.clear();
    }

    /// Advance the simulation by `t` using `n_steps` equal sub-steps.
    ///
    /// A zero duration leaves the state untouched.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidStepCount`] when `n_steps` is 0 and
    /// [`EngineError::InvalidDuration`] when `t` is negative or not finite.
    /// Nothing is mutated on error.
    pub fn simulate(&mut self, t: f64, n_steps: u32) -> Result<SimulationEvents> {
        if n_steps == 0 {
            return Err(EngineError::InvalidStepCount(n_steps));
        }
        if !t.is_finite() || t < 0.0 {
            return Err(EngineError::InvalidDuration(t));
        }

        let mut events = SimulationEvents::default();
        if t == 0.0 {
            return Ok(events);
        }

        let dt = t / f64::from(n_steps);
        let coefficients = StepCoefficients::new(self.world.friction, dt);
        for _ in 0..n_steps {
            self.step(&coefficients, &mut events);
        }
        self.elapsed += t;

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::trace!(steps = self.steps, state_hash = hash, "Engine state hash");
        }

        Ok(events)
    }

    /// Apply a recorded action.
    ///
    /// Non-simulate actions return no events.
    pub fn apply(&mut self, action: &Action) -> Result<SimulationEvents> {
        match *action {
            Action::Launch { agent, v } => {
                self.launch_missile(agent, v)?;
                Ok(SimulationEvents::default())
            }
            Action::Turn { agent, angle } => {
                self.turn_agent(agent, angle)?;
                Ok(SimulationEvents::default())
            }
            Action::SetThrust { agent, a } => {
                self.set_thrust(agent, a)?;
                Ok(SimulationEvents::default())
            }
            Action::Simulate { t, n_steps } => self.simulate(t, n_steps),
            Action::ClearMissiles => {
                self.clear_missiles();
                Ok(SimulationEvents::default())
            }
        }
    }

    /// Compute a hash of the engine state for determinism checks.
    ///
    /// Floats are hashed by their bit patterns, so any divergence shows up.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.steps.hash(&mut hasher);
        self.elapsed.to_bits().hash(&mut hasher);

        self.agents.len().hash(&mut hasher);
        for agent in &self.agents {
            hash_vec(agent.r, &mut hasher);
            hash_vec(agent.u, &mut hasher);
            agent.v.to_bits().hash(&mut hasher);
            agent.a.to_bits().hash(&mut hasher);
            agent.hp.hash(&mut hasher);
        }

        self.missiles.len().hash(&mut hasher);
        for missile in &self.missiles {
            hash_vec(missile.r, &mut hasher);
            hash_vec(missile.u, &mut hasher);
            missile.v.to_bits().hash(&mut hasher);
            missile.owner.hash(&mut hasher);
            missile.target.hash(&mut hasher);
        }

        hasher.finish()
    }

    /// Serialize the engine for replay or transfer.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize an engine produced by [`Engine::serialize`].
    ///
    /// The decoded state is checked the way [`Engine::restore`] checks a
    /// snapshot, but it is not renormalized, so the state hash survives the
    /// round trip bit for bit.
    ///
    /// # Errors
    ///
    /// Fails on malformed bytes, invalid world parameters, and agents or
    /// missiles that are degenerate or not on the unit sphere.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        let engine: Self = bincode::deserialize(data)?;
        engine.world.validate()?;

        let len = engine.agents.len();
        for (index, agent) in engine.agents.iter().enumerate() {
            let checked = normalize_agent(index, *agent)?;
            if !same_frame((checked.r, checked.u), (agent.r, agent.u)) {
                return Err(EngineError::InvalidAgent {
                    index,
                    reason: OFF_SPHERE.to_string(),
                });
            }
        }
        for (index, missile) in engine.missiles.iter().enumerate() {
            let checked = normalize_missile(index, *missile, len)?;
            if !same_frame((checked.r, checked.u), (missile.r, missile.u)) {
                return Err(EngineError::InvalidMissile {
                    index,
                    reason: OFF_SPHERE.to_string(),
                });
            }
        }
        Ok(engine)
    }

    fn agent_mut(&mut self, index: AgentId) -> Result<&mut Agent> {
        let len = self.agents.len();
        self.agents
            .get_mut(index)
            .ok_or(EngineError::AgentIndexOutOfRange { index, len })
    }

    /// Closest living agent other than `shooter`.
    fn nearest_target(&self, shooter: AgentId) -> Option<AgentId> {
        let origin = self.agents[shooter].r;
        self.agents
            .iter()
            .enumerate()
            .filter(|(index, agent)| *index != shooter && agent.is_alive())
            .fold(None, |best: Option<(AgentId, f64)>, (index, agent)| {
                let s = agent.r.dot(origin);
                match best {
                    Some((_, best_s)) if best_s >= s => best,
                    _ => Some((index, s)),
                }
            })
            .map(|(index, _)| index)
    }

    fn step(&mut self, coefficients: &StepCoefficients, events: &mut SimulationEvents) {
        self.steps += 1;
        let step = self.steps;

        // 1. Agents
        self.scratch.clear();
        self.scratch.extend(self.agents.iter().map(|agent| {
            let (r, v) = propagate(agent.r, agent.u, agent.v, agent.a, coefficients);
            Agent { r, v, ..*agent }
        }));
        self.resolve_agent_collisions(step, events);
        std::mem::swap(&mut self.agents, &mut self.scratch);

        // 2. Missiles
        let world = self.world;
        for missile in &mut self.missiles {
            if world.is_guided() {
                if let Some(target) = missile.target.and_then(|t| self.agents.get(t)) {
                    if target.is_alive() {
                        let gain = world.missile_guidance;
                        missile.u = steer(missile.r, missile.u, target.r, gain, coefficients.dt);
                    }
                }
            }
            let (r, v) = propagate(
                missile.r,
                missile.u,
                missile.v,
                world.missile_acceleration,
                coefficients,
            );
            missile.r = r;
            missile.v = v;
        }

        // 3. Impacts
        self.resolve_impacts(step, events);

        #[cfg(feature = "debug-validation")]
        self.check_invariants();
    }

    /// Bounce colliding pairs. `self.agents` holds the state before the
    /// step and `self.scratch` the propagated state.
    fn resolve_agent_collisions(&mut self, step: u64, events: &mut SimulationEvents) {
        let threshold = self.world.collision_threshold();
        let before = &self.agents;
        let after = &mut self.scratch;
        let mut rewound = vec![false; before.len()];

        for i in 0..before.len() {
            for j in (i + 1)..before.len() {
                if !is_colliding((&before[i], &before[j]), (&after[i], &after[j]), threshold) {
                    continue;
                }
                for k in [i, j] {
                    if !rewound[k] {
                        after[k] = before[k];
                        rewound[k] = true;
                    }
                }

                let (head, tail) = after.split_at_mut(j);
                let impulse = resolve_collision(&mut head[i], &mut tail[0], self.world.restitution);
                debug!(step, first = i, second = j, impulse, "Agents collided");
                events.collisions.push(AgentCollision {
                    step,
                    first: i,
                    second: j,
                    impulse,
                });
            }
        }
    }

    /// Two-phase hit resolution: collect every hit against the current
    /// snapshot, then apply damage and drop the spent missiles.
    fn resolve_impacts(&mut self, step: u64, events: &mut SimulationEvents) {
        let threshold = self.world.hit_threshold();
        let hits: Vec<(usize, AgentId)> = self
            .missiles
            .iter()
            .enumerate()
            .filter_map(|(index, missile)| {
                nearest_hit(&self.agents, missile.r, threshold).map(|agent| (index, agent))
            })
            .collect();

        if hits.is_empty() {
            return;
        }

        let mut spent = vec![false; self.missiles.len()];
        for &(index, agent_idx) in &hits {
            let missile = self.missiles[index];
            let agent = &mut self.agents[agent_idx];
            let damage = impact_damage(agent, &missile);
            agent.hp -= damage;
            spent[index] = true;

            debug!(
                step,
                owner = missile.owner,
                agent = agent_idx,
                damage,
                hp = agent.hp,
                "Missile hit"
            );
            events.hits.push(MissileHit {
                step,
                owner: missile.owner,
                agent: agent_idx,
                damage,
                hp: agent.hp,
            });
        }

        let mut index = 0;
        self.missiles.retain(|_| {
            let keep = !spent[index];
            index += 1;
            keep
        });
    }

    #[cfg(feature = "debug-validation")]
    fn check_invariants(&self) {
        const TOLERANCE: f64 = 1e-9;
        for agent in &self.agents {
            debug_assert!((agent.r.length() - 1.0).abs() < TOLERANCE, "agent left the sphere");
            debug_assert!(agent.r.dot(agent.u).abs() < 1e-6, "agent axis not tangent");
        }
        for missile in &self.missiles {
            debug_assert!((missile.r.length() - 1.0).abs() < TOLERANCE, "missile left the sphere");
        }
    }
}

fn hash_vec<H: Hasher>(v: Vec3, hasher: &mut H) {
    v.x.to_bits().hash(hasher);
    v.y.to_bits().hash(hasher);
    v.z.to_bits().hash(hasher);
}

/// Normalize `r` and project `u` onto the tangent plane at `r`.
fn tangent_frame(r: Vec3, u: Vec3) -> std::result::Result<(Vec3, Vec3), &'static str> {
    let r = r
        .try_normalized()
        .ok_or("position is zero or not finite")?;
    let u = u
        .reject_from(r)
        .try_normalized()
        .ok_or("axis is zero, not finite or parallel to the position")?;
    Ok((r, u))
}

const OFF_SPHERE: &str = "position or axis is not a unit tangent frame";

fn same_frame(expected: (Vec3, Vec3), found: (Vec3, Vec3)) -> bool {
    expected.0.approx_eq(found.0, DEFAULT_TOLERANCE)
        && expected.1.approx_eq(found.1, DEFAULT_TOLERANCE)
}

fn normalize_agent(index: usize, agent: Agent) -> Result<Agent> {
    let invalid = |reason: String| EngineError::InvalidAgent { index, reason };

    let (r, u) = tangent_frame(agent.r, agent.u).map_err(|reason| invalid(reason.to_string()))?;
    if !agent.v.is_finite() {
        return Err(invalid(format!("speed {} is not finite", agent.v)));
    }
    if !agent.a.is_finite() {
        return Err(invalid(format!("thrust {} is not finite", agent.a)));
    }
    Ok(Agent { r, u, ..agent })
}

fn normalize_missile(index: usize, missile: Missile, agents: usize) -> Result<Missile> {
    let invalid = |reason: String| EngineError::InvalidMissile { index, reason };

    let (r, u) =
        tangent_frame(missile.r, missile.u).map_err(|reason| invalid(reason.to_string()))?;
    if !missile.v.is_finite() {
        return Err(invalid(format!("speed {} is not finite", missile.v)));
    }
    if let Some(target) = missile.target.filter(|&t| t >= agents) {
        return Err(invalid(format!("target {target} does not exist")));
    }
    Ok(Missile { r, u, ..missile })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> World {
        World::new(1.0, 0.1, 2.0).unwrap()
    }

    fn duel() -> Engine {
        Engine::new(
            world(),
            vec![
                Agent::new(Vec3::X, Vec3::Z, 1.0, 1.0, 5),
                Agent::new(Vec3::Y, Vec3::Z, 0.0, 0.0, 5),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_new_keeps_agents() {
        let engine = duel();
        assert_eq!(engine.agents().len(), 2);
        assert!(engine.missiles().is_empty());
        assert_eq!(engine.agents()[0], Agent::new(Vec3::X, Vec3::Z, 1.0, 1.0, 5));
        assert_eq!(engine.steps(), 0);
    }

    #[test]
    fn test_new_projects_axis() {
        let tilted = Agent::new(Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.1, 0.0, 1.0), 1.0, 0.0, 3);
        let engine = Engine::new(world(), vec![tilted]).unwrap();
        let agent = engine.agents()[0];
        assert!(agent.r.approx_eq(Vec3::X, 1e-12));
        assert!(agent.u.approx_eq(Vec3::Z, 1e-12));
    }

    #[test]
    fn test_new_rejects_degenerate_agents() {
        let parallel = Agent::new(Vec3::X, Vec3::X, 1.0, 0.0, 3);
        let err = Engine::new(world(), vec![parallel]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidAgent { index: 0, .. }));

        let bad_speed = Agent::new(Vec3::X, Vec3::Z, f64::NAN, 0.0, 3);
        let err = Engine::new(world(), vec![bad_speed]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidAgent { index: 0, .. }));
    }

    #[test]
    fn test_launch_out_of_range() {
        let mut engine = duel();
        let err = engine.launch_missile(2, None).unwrap_err();
        assert_eq!(err, EngineError::AgentIndexOutOfRange { index: 2, len: 2 });
        assert!(engine.missiles().is_empty());
    }

    #[test]
    fn test_launch_placement_and_target() {
        let mut engine = duel();
        let index = engine.launch_missile(0, None).unwrap();
        assert_eq!(index, 0);

        let missile = engine.missiles()[0];
        let agent = engine.agents()[0];
        assert!((agent.r.dot(missile.r) - 0.1f64.cos()).abs() < 1e-5);
        assert_eq!(missile.u, agent.u);
        assert_eq!(missile.v, agent.v);
        assert_eq!(missile.owner, 0);
        assert_eq!(missile.target, Some(1));

        engine.launch_missile(1, Some(2.0)).unwrap();
        assert_eq!(engine.missiles()[1].v, 2.0);
        assert_eq!(engine.missiles()[1].target, Some(0));
    }

    #[test]
    fn test_launch_skips_dead_targets() {
        let mut engine = Engine::new(
            world(),
            vec![
                Agent::new(Vec3::X, Vec3::Z, 1.0, 0.0, 5),
                Agent::new(Vec3::Y, Vec3::Z, 0.0, 0.0, 0),
            ],
        )
        .unwrap();
        engine.launch_missile(0, None).unwrap();
        assert_eq!(engine.missiles()[0].target, None);
    }

    #[test]
    fn test_simulate_rejects_bad_arguments() {
        let mut engine = duel();
        assert_eq!(
            engine.simulate(1.0, 0).unwrap_err(),
            EngineError::InvalidStepCount(0)
        );
        assert!(matches!(
            engine.simulate(-1.0, 10).unwrap_err(),
            EngineError::InvalidDuration(_)
        ));
        assert!(engine.simulate(f64::NAN, 10).is_err());
        assert!(engine.simulate(f64::INFINITY, 10).is_err());
        assert_eq!(engine.steps(), 0);
    }

    #[test]
    fn test_zero_duration_is_noop() {
        let mut engine = duel();
        engine.launch_missile(0, None).unwrap();
        let before = engine.snapshot();
        let hash = engine.state_hash();
        let events = engine.simulate(0.0, 7).unwrap();
        assert!(events.is_empty());
        assert_eq!(engine.snapshot(), before);
        assert_eq!(engine.state_hash(), hash);
    }

    #[test]
    fn test_simulate_counts_steps() {
        let mut engine = duel();
        engine.simulate(1.0, 10).unwrap();
        engine.simulate(0.5, 5).unwrap();
        assert_eq!(engine.steps(), 15);
        assert!((engine.elapsed() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_missile_removed_on_hit() {
        let mut engine = duel();
        engine.launch_missile(0, None).unwrap();
        let events = engine.simulate(2.0, 2000).unwrap();

        assert!(engine.missiles().is_empty());
        assert_eq!(events.hits.len(), 1);
        let hit = events.hits[0];
        assert_eq!(hit.owner, 0);
        assert_eq!(hit.agent, 1);
        assert_eq!(hit.damage, 3);
        assert_eq!(engine.agents()[1].hp, 2);
        assert_eq!(events.damage_to(1), 3);
    }

    #[test]
    fn test_turn_and_thrust() {
        let mut engine = duel();
        engine.turn_agent(0, 0.4).unwrap();
        assert!((engine.agents()[0].u.dot(Vec3::Z) - 0.4f64.cos()).abs() < 1e-12);

        engine.set_thrust(1, 3.0).unwrap();
        assert_eq!(engine.agents()[1].a, 3.0);

        assert!(engine.turn_agent(5, 0.1).is_err());
        assert!(engine.set_thrust(0, f64::NAN).is_err());
    }

    #[test]
    fn test_clear_missiles() {
        let mut engine = duel();
        engine.launch_missile(0, None).unwrap();
        engine.launch_missile(1, None).unwrap();
        engine.clear_missiles();
        assert!(engine.missiles().is_empty());
        assert!(matches!(
            engine.missile(0),
            Err(EngineError::MissileIndexOutOfRange { index: 0, len: 0 })
        ));
    }

    #[test]
    fn test_apply_clear_missiles() {
        let mut engine = duel();
        engine.apply(&Action::Launch { agent: 0, v: None }).unwrap();
        let events = engine.apply(&Action::ClearMissiles).unwrap();
        assert!(events.hits.is_empty());
        assert!(engine.missiles().is_empty());
    }

    #[test]
    fn test_state_hash_tracks_state() {
        let mut a = duel();
        let mut b = duel();
        assert_eq!(a.state_hash(), b.state_hash());

        a.simulate(1.0, 100).unwrap();
        assert_ne!(a.state_hash(), b.state_hash());

        b.simulate(1.0, 100).unwrap();
        assert_eq!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let mut engine = duel();
        engine.launch_missile(0, None).unwrap();
        engine.simulate(0.5, 50).unwrap();

        let bytes = engine.serialize().unwrap();
        let restored = Engine::deserialize(&bytes).unwrap();
        assert_eq!(restored.state_hash(), engine.state_hash());
        assert!(Engine::deserialize(&bytes[..bytes.len() / 2]).is_err());
    }

    #[test]
    fn test_deserialize_rejects_degenerate_state() {
        let mut engine = duel();
        engine.launch_missile(0, None).unwrap();

        let mut zeroed = engine.clone();
        zeroed.agents[0].r = Vec3::ZERO;
        let err = Engine::deserialize(&zeroed.serialize().unwrap()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidAgent { index: 0, .. }));

        let mut stretched = engine.clone();
        stretched.agents[1].r = stretched.agents[1].r * 2.0;
        let err = Engine::deserialize(&stretched.serialize().unwrap()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidAgent { index: 1, .. }));

        let mut lost = engine.clone();
        lost.missiles[0].u = Vec3::new(f64::NAN, 0.0, 0.0);
        let err = Engine::deserialize(&lost.serialize().unwrap()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidMissile { index: 0, .. }));

        let mut orphan = engine;
        orphan.missiles[0].target = Some(7);
        let err = Engine::deserialize(&orphan.serialize().unwrap()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidMissile { index: 0, .. }));
    }

    #[test]
    fn test_snapshot_restore() {
        let mut engine = duel();
        engine.launch_missile(0, None).unwrap();
        let restored = Engine::restore(*engine.world(), engine.snapshot()).unwrap();
        assert_eq!(restored.agents(), engine.agents());
        assert!(restored.snapshot().approx_eq(&engine.snapshot(), 1e-15));
        assert_eq!(restored.missiles()[0].target, Some(1));

        let mut state = engine.snapshot();
        state.missiles[0].target = Some(9);
        let err = Engine::restore(*engine.world(), state).unwrap_err();
        assert!(matches!(err, EngineError::InvalidMissile { index: 0, .. }));
    }
}
