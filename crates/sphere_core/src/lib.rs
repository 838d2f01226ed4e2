//! # Sphere Core
//!
//! Deterministic combat simulation on the surface of the unit sphere.
//!
//! Agents fly great circles under thrust and drag, fire missiles at each
//! other and lose hit points on impact. This crate contains **only** the
//! simulation:
//! - No rendering
//! - No IO beyond explicit replay files
//! - No randomness
//!
//! This separation enables:
//! - Headless runners and batch experiments
//! - Replay systems
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`math`] - 3D vectors and rotations
//! - [`world`] - Global physical parameters
//! - [`components`] - Agent and missile records
//! - [`kinematics`] - Great-circle propagation with drag
//! - [`guidance`] - Steering law for homing missiles
//! - [`combat`] - Missile hits, damage and agent collisions
//! - [`engine`] - The simulation loop
//! - [`state`] - Snapshots
//! - [`replay`] - Recording and playback

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod combat;
pub mod components;
pub mod engine;
pub mod error;
pub mod guidance;
pub mod kinematics;
pub mod math;
pub mod replay;
pub mod state;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::combat::{AgentCollision, MissileHit};
    pub use crate::components::{Agent, AgentId, Missile};
    pub use crate::engine::{Engine, SimulationEvents};
    pub use crate::error::{EngineError, Result};
    pub use crate::math::Vec3;
    pub use crate::replay::{Action, Recorder, Replay, ReplayPlayer};
    pub use crate::state::EngineState;
    pub use crate::world::World;
}
