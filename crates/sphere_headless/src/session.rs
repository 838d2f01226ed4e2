//! Protocol session: one engine driven by JSON-line commands.

use std::io::{self, BufRead, Write};

use sphere_core::prelude::Engine;
use tracing::{debug, info, warn};

use crate::protocol::{Command, Response};

/// Session configuration.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Output the full state after every command that changes the engine.
    pub auto_state_output: bool,
}

/// A protocol session.
///
/// Holds at most one engine. Commands that need an engine fail with an
/// error response until `init` or `load_state` has been received (or an
/// engine was supplied up front).
#[derive(Debug, Default)]
pub struct Session {
    config: SessionConfig,
    engine: Option<Engine>,
    finished: bool,
}

impl Session {
    /// Create a session without an engine.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            engine: None,
            finished: false,
        }
    }

    /// Create a session around an existing engine.
    pub fn with_engine(engine: Engine, config: SessionConfig) -> Self {
        Self {
            config,
            engine: Some(engine),
            finished: false,
        }
    }

    /// The current engine, if any.
    pub fn engine(&self) -> Option<&Engine> {
        self.engine.as_ref()
    }

    /// Whether `quit` has been received.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Process one command.
    ///
    /// Engine errors become [`Response::Error`]; the engine is unchanged
    /// in that case.
    pub fn handle(&mut self, command: Command) -> Response {
        let name = command.name();
        match self.dispatch(command) {
            Ok(response) => response,
            Err(message) => {
                warn!(cmd = name, %message, "Command failed");
                Response::error(message, Some(name))
            }
        }
    }

    /// Parse and process one input line. Blank lines yield nothing.
    pub fn handle_line(&mut self, line: &str) -> Option<Response> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match Command::from_json(line) {
            Ok(command) => Some(self.handle(command)),
            Err(e) => {
                warn!(error = %e, "Malformed command");
                Some(Response::error(format!("Invalid command: {e}"), None))
            }
        }
    }

    /// Serve commands from `input` until `quit` or end of input.
    ///
    /// # Errors
    /// Returns an error only if reading or writing fails.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<()> {
        let agents = self.engine.as_ref().map_or(0, |e| e.agents().len());
        output.write_all(Response::ready(agents).to_json_line().as_bytes())?;
        output.flush()?;

        for line in input.lines() {
            let line = line?;
            let Some(response) = self.handle_line(&line) else {
                continue;
            };
            let changed = matches!(
                response,
                Response::Launched { .. } | Response::Events { .. } | Response::Ack { .. }
            );
            output.write_all(response.to_json_line().as_bytes())?;

            if changed && self.config.auto_state_output {
                if let Some(engine) = &self.engine {
                    output.write_all(Response::state(engine).to_json_line().as_bytes())?;
                }
            }
            output.flush()?;

            if self.finished {
                break;
            }
        }

        info!("Session closed");
        Ok(())
    }

    fn engine_mut(&mut self) -> Result<&mut Engine, String> {
        self.engine
            .as_mut()
            .ok_or_else(|| "No engine: send init or load_state first".to_string())
    }

    fn dispatch(&mut self, command: Command) -> Result<Response, String> {
        let response = match command {
            Command::Init { world, agents } => {
                let engine = Engine::new(world, agents).map_err(|e| e.to_string())?;
                info!(agents = engine.agents().len(), "Engine initialised");
                let response = Response::state(&engine);
                self.engine = Some(engine);
                response
            }
            Command::LoadState { world, state } => {
                let engine = Engine::restore(world, state).map_err(|e| e.to_string())?;
                info!(
                    agents = engine.agents().len(),
                    missiles = engine.missiles().len(),
                    "Engine restored"
                );
                let response = Response::state(&engine);
                self.engine = Some(engine);
                response
            }
            Command::Launch { agent, v } => {
                let engine = self.engine_mut()?;
                let missile = engine.launch_missile(agent, v).map_err(|e| e.to_string())?;
                let target = engine.missile(missile).map_err(|e| e.to_string())?.target;
                Response::Launched {
                    missile,
                    owner: agent,
                    target,
                }
            }
            Command::Turn { agent, angle } => {
                self.engine_mut()?
                    .turn_agent(agent, angle)
                    .map_err(|e| e.to_string())?;
                Response::ack("turn")
            }
            Command::Thrust { agent, a } => {
                self.engine_mut()?
                    .set_thrust(agent, a)
                    .map_err(|e| e.to_string())?;
                Response::ack("thrust")
            }
            Command::Simulate { t, n_steps } => {
                let engine = self.engine_mut()?;
                let events = engine.simulate(t, n_steps).map_err(|e| e.to_string())?;
                debug!(
                    steps = engine.steps(),
                    hits = events.hits.len(),
                    collisions = events.collisions.len(),
                    "Simulated"
                );
                Response::events(engine, events)
            }
            Command::ClearMissiles => {
                self.engine_mut()?.clear_missiles();
                Response::ack("clear_missiles")
            }
            Command::Query => Response::state(self.engine_mut()?),
            Command::Hash => {
                let engine = self.engine_mut()?;
                Response::Hash {
                    steps: engine.steps(),
                    hash: engine.state_hash(),
                }
            }
            Command::Quit => {
                self.finished = true;
                Response::Bye
            }
        };
        Ok(response)
    }
}
