//! Scenario loading and playback.
//!
//! A scenario is a world, the starting agents and a script of actions.
//! Scenarios are written in RON:
//!
//! ```ron
//! Scenario(
//!     name: "Duel",
//!     description: "Two agents, one missile each",
//!     world: (restitution: 1.0, agent_radius: 0.1, missile_acceleration: 2.0),
//!     agents: [
//!         (r: (x: 1.0, y: 0.0, z: 0.0), u: (x: 0.0, y: 0.0, z: 1.0), v: 1.0, a: 1.0, hp: 5),
//!         (r: (x: 0.0, y: 1.0, z: 0.0), u: (x: 0.0, y: 0.0, z: 1.0), v: 0.0, a: 0.0, hp: 5),
//!     ],
//!     actions: [
//!         Launch(agent: 0),
//!         Launch(agent: 1, v: Some(2.0)),
//!         Simulate(t: 2.0, n_steps: 2000),
//!     ],
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use sphere_core::prelude::{
    Action, Agent, AgentCollision, Engine, EngineError, EngineState, MissileHit, Replay,
    SimulationEvents, Vec3, World,
};
use thiserror::Error;
use tracing::{debug, info};

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// No built-in scenario by that name.
    #[error("Unknown built-in scenario: {0}")]
    UnknownBuiltin(String),
    /// The engine rejected the setup or an action.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

/// A complete scenario: setup plus scripted actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// World parameters.
    pub world: World,
    /// Agents at the start.
    pub agents: Vec<Agent>,
    /// Actions applied in order.
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl Scenario {
    /// Names accepted by [`Scenario::builtin`].
    pub const BUILTINS: &'static [&'static str] = &["duel", "ring"];

    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let scenario = Self::from_ron_str(&contents)?;
        debug!(path = %path.display(), name = %scenario.name, "Scenario loaded");
        Ok(scenario)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Look up a built-in scenario by name.
    pub fn builtin(name: &str) -> Result<Self, ScenarioError> {
        match name {
            "duel" => Ok(Self::duel()),
            "ring" => Ok(Self::ring(12)),
            other => Err(ScenarioError::UnknownBuiltin(other.to_string())),
        }
    }

    /// Resolve a scenario from either a file or a built-in name.
    ///
    /// The file wins when both are given; with neither, the duel is used.
    pub fn resolve(path: Option<&Path>, builtin: Option<&str>) -> Result<Self, ScenarioError> {
        match (path, builtin) {
            (Some(path), _) => Self::load(path),
            (None, Some(name)) => Self::builtin(name),
            (None, None) => Ok(Self::duel()),
        }
    }

    /// The reference duel.
    ///
    /// Agent 0 flies toward agent 1 under thrust; both fire once, agent 1
    /// at double speed. After seven seconds both missiles have struck, the
    /// agents have bumped into each other repeatedly and each is left with 2 hp.
    #[must_use]
    pub fn duel() -> Self {
        Self {
            name: "duel".to_string(),
            description: "Reference two-agent engagement".to_string(),
            world: World {
                restitution: 1.0,
                agent_radius: 0.1,
                missile_acceleration: 2.0,
                friction: sphere_core::world::DEFAULT_FRICTION,
                missile_guidance: 0.0,
            },
            agents: vec![
                Agent::new(Vec3::X, Vec3::Z, 1.0, 1.0, 5),
                Agent::new(Vec3::Y, Vec3::Z, 0.0, 0.0, 5),
            ],
            actions: vec![
                Action::Launch { agent: 0, v: None },
                Action::Launch {
                    agent: 1,
                    v: Some(2.0),
                },
                Action::Simulate {
                    t: 2.0,
                    n_steps: 2000,
                },
                Action::Simulate {
                    t: 5.0,
                    n_steps: 5000,
                },
            ],
        }
    }

    /// `count` agents on the equator, alternating direction, every one
    /// firing a guided missile at its nearest neighbour.
    #[must_use]
    pub fn ring(count: usize) -> Self {
        let agents: Vec<Agent> = (0..count)
            .map(|i| {
                let angle = std::f64::consts::TAU * i as f64 / count as f64;
                let r = Vec3::new(angle.cos(), angle.sin(), 0.0);
                let u = if i % 2 == 0 { Vec3::Z } else { -Vec3::Z };
                Agent::new(r, u, 0.5, 0.2, 5)
            })
            .collect();
        let mut actions: Vec<Action> = (0..count)
            .map(|agent| Action::Launch { agent, v: None })
            .collect();
        actions.push(Action::Simulate {
            t: 5.0,
            n_steps: 5000,
        });

        Self {
            name: format!("ring_{count}"),
            description: format!("{count} agents on the equator with guided missiles"),
            world: World {
                restitution: 0.8,
                agent_radius: 0.05,
                missile_acceleration: 1.0,
                friction: sphere_core::world::DEFAULT_FRICTION,
                missile_guidance: 4.0,
            },
            agents,
            actions,
        }
    }

    /// Build the engine at the start of the scenario.
    pub fn engine(&self) -> Result<Engine, ScenarioError> {
        Ok(Engine::new(self.world, self.agents.clone())?)
    }

    /// Play every action and summarise the outcome.
    pub fn run(&self) -> Result<ScenarioReport, ScenarioError> {
        let mut engine = self.engine()?;
        let mut events = SimulationEvents::default();
        for action in &self.actions {
            events.extend(engine.apply(action)?);
        }

        let report = ScenarioReport::new(&self.name, &engine, events);
        info!(
            scenario = %self.name,
            steps = report.steps,
            hits = report.hits.len(),
            collisions = report.collisions.len(),
            living = report.living_agents,
            "Scenario finished"
        );
        Ok(report)
    }

    /// Record the scenario as a replay.
    pub fn record(&self) -> Result<Replay, ScenarioError> {
        Ok(Replay::record(
            self.name.clone(),
            self.world,
            self.agents.clone(),
            self.actions.clone(),
        )?)
    }

    /// Serialize to pretty RON.
    pub fn to_ron_string(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }
}

/// Outcome of playing a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Scenario name.
    pub name: String,
    /// Sub-steps simulated.
    pub steps: u64,
    /// Simulated time.
    pub elapsed: f64,
    /// Every missile impact.
    pub hits: Vec<MissileHit>,
    /// Every agent collision.
    pub collisions: Vec<AgentCollision>,
    /// Agents still alive at the end.
    pub living_agents: usize,
    /// Bodies at the end.
    pub final_state: EngineState,
    /// [`Engine::state_hash`] at the end.
    pub state_hash: u64,
}

impl ScenarioReport {
    /// Summarise an engine and the events that led to it.
    #[must_use]
    pub fn new(name: &str, engine: &Engine, events: SimulationEvents) -> Self {
        let final_state = engine.snapshot();
        Self {
            name: name.to_string(),
            steps: engine.steps(),
            elapsed: engine.elapsed(),
            hits: events.hits,
            collisions: events.collisions,
            living_agents: final_state.living_agents(),
            final_state,
            state_hash: engine.state_hash(),
        }
    }
}
