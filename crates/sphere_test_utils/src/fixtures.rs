//! Test fixtures and helpers.
//!
//! Pre-built worlds and engines for consistent testing.

use sphere_core::prelude::*;

/// World of the reference duel: elastic, radius 0.1, missile thrust 2.
#[must_use]
pub fn duel_world() -> World {
    World {
        restitution: 1.0,
        agent_radius: 0.1,
        missile_acceleration: 2.0,
        friction: 1.0,
        missile_guidance: 0.0,
    }
}

/// Agents of the reference duel.
///
/// Agent 0 starts at `x` cruising toward `y` at speed 1 with thrust 1;
/// agent 1 sits still at `y`. Both share the axis `z`.
#[must_use]
pub fn duel_agents() -> Vec<Agent> {
    vec![
        Agent::new(Vec3::X, Vec3::Z, 1.0, 1.0, 5),
        Agent::new(Vec3::Y, Vec3::Z, 0.0, 0.0, 5),
    ]
}

/// The reference duel with one missile launched from each agent (agent 1
/// fires at speed 2).
///
/// # Panics
///
/// Never for the built-in parameters.
#[must_use]
pub fn duel_engine() -> Engine {
    let mut engine = Engine::new(duel_world(), duel_agents()).expect("valid duel setup");
    engine.launch_missile(0, None).expect("agent 0 exists");
    engine.launch_missile(1, Some(2.0)).expect("agent 1 exists");
    engine
}

/// `count` agents spread evenly around the equator, all flying east.
///
/// # Panics
///
/// Panics if `count` is zero.
#[must_use]
pub fn ring_engine(count: usize, world: World) -> Engine {
    assert!(count > 0, "ring needs at least one agent");
    let agents: Vec<Agent> = (0..count)
        .map(|i| {
            let phi = std::f64::consts::TAU * i as f64 / count as f64;
            Agent::new(Vec3::new(phi.cos(), phi.sin(), 0.0), Vec3::Z, 0.5, 0.5, 10)
        })
        .collect();
    Engine::new(world, agents).expect("valid ring setup")
}

/// Assert two vectors match within `tolerance`.
///
/// # Panics
///
/// Panics with both vectors when they differ.
#[track_caller]
pub fn assert_vec_near(actual: Vec3, expected: Vec3, tolerance: f64) {
    assert!(
        actual.approx_eq(expected, tolerance),
        "expected {expected:?}, got {actual:?} (tolerance {tolerance})"
    );
}
