//! Plain snapshots of an engine's bodies.

use serde::{Deserialize, Serialize};

use crate::components::{Agent, Missile};

/// Agents and missiles at one instant, without world parameters or
/// counters. Feed back through [`Engine::restore`](crate::engine::Engine::restore).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    /// Agents in index order.
    pub agents: Vec<Agent>,
    /// Missiles in launch order.
    pub missiles: Vec<Missile>,
}

impl EngineState {
    /// Sum of hit points over every agent.
    #[must_use]
    pub fn total_hp(&self) -> i64 {
        self.agents.iter().map(|agent| i64::from(agent.hp)).sum()
    }

    /// Number of agents still alive.
    #[must_use]
    pub fn living_agents(&self) -> usize {
        self.agents.iter().filter(|agent| agent.is_alive()).count()
    }

    /// Compare within an absolute tolerance.
    #[must_use]
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        self.agents.len() == other.agents.len()
            && self.missiles.len() == other.missiles.len()
            && self
                .agents
                .iter()
                .zip(&other.agents)
                .all(|(a, b)| a.approx_eq(b, tolerance))
            && self
                .missiles
                .iter()
                .zip(&other.missiles)
                .all(|(a, b)| a.approx_eq(b, tolerance))
    }
}
