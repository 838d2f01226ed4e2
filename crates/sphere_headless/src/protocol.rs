//! JSON protocol for driving an engine from another process.
//!
//! The session communicates via JSON lines (one JSON object per line):
//!
//! **Input (stdin):** Commands from the controller
//! **Output (stdout):** Responses, one per command
//!
//! # Protocol Flow
//!
//! 1. Session starts, outputs `{"type":"ready",...}`
//! 2. Controller sends `init` (or `load_state`) unless a scenario was
//!    preloaded
//! 3. Controller launches, turns, thrusts and simulates
//! 4. `quit` ends the session with `{"type":"bye"}`
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","agents":0}
//! -> {"cmd":"init","world":{"restitution":1.0,"agent_radius":0.1,"missile_acceleration":2.0},"agents":[...]}
//! <- {"type":"state","steps":0,"elapsed":0.0,"agents":[...],"missiles":[],"hash":...}
//! -> {"cmd":"launch","agent":0}
//! <- {"type":"launched","missile":0,"owner":0,"target":1}
//! -> {"cmd":"simulate","t":2.0,"n_steps":2000}
//! <- {"type":"events","steps":2000,"elapsed":2.0,"hits":[...],"collisions":[]}
//! -> {"cmd":"hash"}
//! <- {"type":"hash","steps":2000,"hash":...}
//! ```

use serde::{Deserialize, Serialize};
use sphere_core::prelude::{
    Agent, AgentCollision, AgentId, Engine, EngineState, Missile, MissileHit, SimulationEvents,
    World,
};

/// Protocol version reported in [`Response::Ready`].
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================================================
// Input Commands (Controller -> Session)
// ============================================================================

/// Commands that can be sent to a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Replace the engine with a fresh one.
    Init { world: World, agents: Vec<Agent> },

    /// Replace the engine with one restored from a snapshot.
    LoadState { world: World, state: EngineState },

    /// Fire a missile from an agent.
    Launch {
        agent: AgentId,
        #[serde(default)]
        v: Option<f64>,
    },

    /// Rotate an agent's axis about its position.
    Turn { agent: AgentId, angle: f64 },

    /// Set an agent's thrust.
    Thrust { agent: AgentId, a: f64 },

    /// Advance time by `t` in `n_steps` sub-steps (default: 1).
    Simulate {
        t: f64,
        #[serde(default = "default_step_count")]
        n_steps: u32,
    },

    /// Remove every missile in flight.
    ClearMissiles,

    /// Query current state without advancing time.
    Query,

    /// Report the current state hash.
    Hash,

    /// End the session.
    Quit,
}

fn default_step_count() -> u32 {
    1
}

// ============================================================================
// Output Responses (Session -> Controller)
// ============================================================================

/// Responses sent from a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Session is ready to accept commands.
    Ready { version: String, agents: usize },

    /// Acknowledgment of a command.
    Ack { cmd: String },

    /// Error processing a command. The engine is left unchanged.
    Error {
        message: String,
        cmd: Option<String>,
    },

    /// Full engine state.
    State {
        steps: u64,
        elapsed: f64,
        agents: Vec<Agent>,
        missiles: Vec<Missile>,
        hash: u64,
    },

    /// A missile was launched.
    Launched {
        missile: usize,
        owner: AgentId,
        target: Option<AgentId>,
    },

    /// What happened during a `simulate`.
    Events {
        steps: u64,
        elapsed: f64,
        hits: Vec<MissileHit>,
        collisions: Vec<AgentCollision>,
    },

    /// State hash for determinism verification.
    Hash { steps: u64, hash: u64 },

    /// Goodbye message before shutdown.
    Bye,
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    pub fn ready(agents: usize) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            agents,
        }
    }

    /// Create an acknowledgment.
    pub fn ack(cmd: &str) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Full state of an engine.
    pub fn state(engine: &Engine) -> Self {
        Self::State {
            steps: engine.steps(),
            elapsed: engine.elapsed(),
            agents: engine.agents().to_vec(),
            missiles: engine.missiles().to_vec(),
            hash: engine.state_hash(),
        }
    }

    /// Events of a `simulate` call on `engine`.
    pub fn events(engine: &Engine, events: SimulationEvents) -> Self {
        Self::Events {
            steps: engine.steps(),
            elapsed: engine.elapsed(),
            hits: events.hits,
            collisions: events.collisions,
        }
    }

    /// Whether this is an error response.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}"}}"#)
        });
        json.push('\n');
        json
    }
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Get command name for acknowledgment.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::LoadState { .. } => "load_state",
            Self::Launch { .. } => "launch",
            Self::Turn { .. } => "turn",
            Self::Thrust { .. } => "thrust",
            Self::Simulate { .. } => "simulate",
            Self::ClearMissiles => "clear_missiles",
            Self::Query => "query",
            Self::Hash => "hash",
            Self::Quit => "quit",
        }
    }
}
