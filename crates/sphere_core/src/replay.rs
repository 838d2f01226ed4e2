//! Replay system for recording and playing back engagements.
//!
//! A replay stores the world, the initial agents and the stream of actions
//! applied to the engine. Because the engine is deterministic this is
//! enough to recreate every intermediate state bit for bit.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::components::{Agent, AgentId};
use crate::engine::{Engine, SimulationEvents};
use crate::error::{EngineError, Result};
use crate::world::World;

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// One mutating call on an engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// [`Engine::launch_missile`].
    Launch {
        /// Firing agent.
        agent: AgentId,
        /// Speed override.
        #[serde(default)]
        v: Option<f64>,
    },
    /// [`Engine::turn_agent`].
    Turn {
        /// Agent to turn.
        agent: AgentId,
        /// Angle in radians.
        angle: f64,
    },
    /// [`Engine::set_thrust`].
    SetThrust {
        /// Agent to update.
        agent: AgentId,
        /// New thrust.
        a: f64,
    },
    /// [`Engine::simulate`].
    Simulate {
        /// Duration.
        t: f64,
        /// Number of sub-steps.
        n_steps: u32,
    },
    /// [`Engine::clear_missiles`].
    ClearMissiles,
}

/// Complete replay data structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Replay {
    /// Replay format version.
    pub version: u32,
    /// Scenario name.
    pub name: String,
    /// World parameters.
    pub world: World,
    /// Agents at the start.
    pub agents: Vec<Agent>,
    /// Actions in the order they were applied.
    pub actions: Vec<Action>,
    /// State hash after the last action.
    pub final_hash: u64,
}

impl Replay {
    /// Run `actions` on a fresh engine and record the outcome.
    ///
    /// # Errors
    /// Returns an error if the engine rejects the setup or any action.
    pub fn record(
        name: impl Into<String>,
        world: World,
        agents: Vec<Agent>,
        actions: Vec<Action>,
    ) -> Result<Self> {
        let mut replay = Self {
            version: REPLAY_VERSION,
            name: name.into(),
            world,
            agents,
            actions,
            final_hash: 0,
        };
        replay.final_hash = replay.play()?.state_hash();
        Ok(replay)
    }

    /// Build the initial engine.
    pub fn initial_engine(&self) -> Result<Engine> {
        Engine::new(self.world, self.agents.clone())
    }

    /// Play every action and return the final engine.
    pub fn play(&self) -> Result<Engine> {
        let mut engine = self.initial_engine()?;
        for action in &self.actions {
            engine.apply(action)?;
        }
        Ok(engine)
    }

    /// Play the replay and check the final hash.
    ///
    /// # Errors
    /// Returns [`EngineError::ReplayMismatch`] if playback diverged.
    pub fn verify(&self) -> Result<Engine> {
        let engine = self.play()?;
        let actual = engine.state_hash();
        if actual != self.final_hash {
            return Err(EngineError::ReplayMismatch {
                expected: self.final_hash,
                actual,
            });
        }
        Ok(engine)
    }

    /// Total simulated time across all actions.
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.actions
            .iter()
            .map(|action| match action {
                Action::Simulate { t, .. } => *t,
                _ => 0.0,
            })
            .sum()
    }

    /// Save the replay to a file.
    ///
    /// # Errors
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = bincode::serialize(self)?;
        std::fs::write(path.as_ref(), bytes)?;
        debug!(path = %path.as_ref().display(), actions = self.actions.len(), "Replay saved");
        Ok(())
    }

    /// Load a replay from a file.
    ///
    /// # Errors
    /// Returns an error if file reading or deserialization fails, or the
    /// file was written by another format version.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        let replay: Self = bincode::deserialize(&bytes)?;

        if replay.version != REPLAY_VERSION {
            return Err(EngineError::ReplayVersion {
                expected: REPLAY_VERSION,
                found: replay.version,
            });
        }

        Ok(replay)
    }
}

/// Records actions while driving a live engine.
#[derive(Debug, Clone)]
pub struct Recorder {
    name: String,
    world: World,
    agents: Vec<Agent>,
    actions: Vec<Action>,
    engine: Engine,
}

impl Recorder {
    /// Start recording on a fresh engine.
    pub fn new(name: impl Into<String>, world: World, agents: Vec<Agent>) -> Result<Self> {
        let engine = Engine::new(world, agents)?;
        Ok(Self {
            name: name.into(),
            world,
            agents: engine.agents().to_vec(),
            actions: Vec::new(),
            engine,
        })
    }

    /// Apply an action and record it if the engine accepted it.
    pub fn apply(&mut self, action: Action) -> Result<SimulationEvents> {
        let events = self.engine.apply(&action)?;
        self.actions.push(action);
        Ok(events)
    }

    /// The live engine.
    #[must_use]
    pub const fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Stop recording.
    #[must_use]
    pub fn finish(self) -> Replay {
        Replay {
            version: REPLAY_VERSION,
            name: self.name,
            world: self.world,
            agents: self.agents,
            actions: self.actions,
            final_hash: self.engine.state_hash(),
        }
    }
}

/// Replay playback controller, one action at a time.
#[derive(Debug)]
pub struct ReplayPlayer {
    replay: Replay,
    engine: Engine,
    /// Index of the next action to apply.
    cursor: usize,
}

impl ReplayPlayer {
    /// Create a player positioned before the first action.
    ///
    /// # Errors
    /// Returns an error if the initial engine cannot be built.
    pub fn new(replay: Replay) -> Result<Self> {
        let engine = replay.initial_engine()?;
        Ok(Self {
            replay,
            engine,
            cursor: 0,
        })
    }

    /// Apply the next action.
    ///
    /// Returns `Ok(None)` once every action has been played.
    pub fn advance(&mut self) -> Result<Option<SimulationEvents>> {
        let Some(action) = self.replay.actions.get(self.cursor) else {
            return Ok(None);
        };
        let events = self.engine.apply(action)?;
        self.cursor += 1;
        Ok(Some(events))
    }

    /// Jump to just before action `target` by replaying from the start.
    pub fn seek(&mut self, target: usize) -> Result<()> {
        self.engine = self.replay.initial_engine()?;
        self.cursor = 0;
        while self.cursor < target.min(self.replay.actions.len()) {
            self.advance()?;
        }
        Ok(())
    }

    /// Index of the next action.
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// The engine at the current position.
    #[must_use]
    pub const fn engine(&self) -> &Engine {
        &self.engine
    }

    /// The replay being played.
    #[must_use]
    pub const fn replay(&self) -> &Replay {
        &self.replay
    }

    /// Whether every action has been applied.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.cursor >= self.replay.actions.len()
    }

    /// Get progress as a percentage (0-100).
    #[must_use]
    pub fn progress_percent(&self) -> f64 {
        if self.replay.actions.is_empty() {
            100.0
        } else {
            (self.cursor as f64 / self.replay.actions.len() as f64) * 100.0
        }
    }
}
