//! Headless engagement runner for scripted play and CI verification.
//!
//! This crate drives a [`Engine`](sphere_core::engine::Engine) without any front end:
//!
//! - **Scenarios**: RON files describing a world, agents and a script of
//!   actions, played to completion
//! - **Protocol**: JSON commands on stdin, JSON responses on stdout, so an
//!   external controller (or a script in another language) can steer agents
//! - **Batches**: many scenarios in parallel, results written as JSON
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from the controller (init, launch, simulate, etc.)
//! - **stdout**: Responses (JSON)
//! - **stderr**: Logs (human-readable)
//!
//! See [`protocol`] for the full command/response format.
//!
//! # Example
//!
//! ```bash
//! # Play a scenario file
//! cargo run -p sphere_headless -- run --scenario scenarios/duel.ron
//!
//! # Drive an engine interactively
//! echo '{"cmd":"simulate","t":1.0,"n_steps":100}' | cargo run -p sphere_headless -- serve --builtin duel
//! ```

pub mod batch;
pub mod protocol;
pub mod scenario;
pub mod session;

pub use batch::{run_batch, verify_determinism, BatchConfig, BatchResults};
pub use protocol::{Command, Response};
pub use scenario::{Scenario, ScenarioError, ScenarioReport};
pub use session::{Session, SessionConfig};
