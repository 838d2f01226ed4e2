//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the engine produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! The engine works in `f64`, so determinism rests on doing exactly the
//! same operations in exactly the same order:
//!
//! - **Iteration order**: agents and missiles live in `Vec`s and are always
//!   walked by index.
//!
//! - **Hit resolution**: hits are collected from one snapshot before any
//!   damage is applied, so missile order cannot change the outcome of a
//!   sub-step.
//!
//! - **No randomness**: missile targets are chosen geometrically.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: individual pieces (propagation, steering, impacts)
//! 2. **Property tests**: random setups still produce identical runs
//! 3. **Integration tests**: reference scenarios are reproducible
//! 4. **Parallel tests**: N engines on N threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use sphere_core::engine::Engine;
use tracing::debug;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps driven per run.
    pub steps: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic engine).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Engine is non-deterministic!\n\
                 Runs: {}\n\
                 Steps: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.steps,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a state machine multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `steps` - Number of times to call `step` per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance the state once
/// * `hash` - Function to compute the state hash
///
/// # Example
///
/// ```
/// use sphere_test_utils::determinism::verify_determinism;
/// use sphere_test_utils::fixtures::duel_engine;
///
/// let result = verify_determinism(
///     3,
///     50,
///     duel_engine,
///     |engine| {
///         engine.simulate(0.05, 5).unwrap();
///     },
///     |engine| engine.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    steps: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..steps {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        steps,
    }
}

/// Run an engine twice, calling `simulate(dt, sub_steps)` `calls` times,
/// and check the final hashes match.
///
/// # Panics
///
/// Panics if the engine rejects the `simulate` call.
pub fn verify_engine_determinism<F>(setup_fn: F, calls: u64, dt: f64, sub_steps: u32) -> bool
where
    F: Fn() -> Engine,
{
    let result = verify_determinism(
        2,
        calls,
        &setup_fn,
        |engine| {
            engine
                .simulate(dt, sub_steps)
                .expect("simulate rejected");
        },
        |engine| engine.state_hash(),
    );
    result.is_deterministic
}

/// Result of parallel engine runs.
#[derive(Debug, Clone)]
pub struct ParallelSimResult {
    /// Final state hash from each engine.
    pub hashes: Vec<u64>,
    /// Simulated time per engine.
    pub duration: f64,
    /// Number of engines run.
    pub num_sims: usize,
}

impl ParallelSimResult {
    /// Check if all engines produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all engines matched.
    ///
    /// # Panics
    ///
    /// Panics if engines produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel engines diverged!\n\
                 Engines: {}\n\
                 Duration: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_sims,
                self.duration,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run `num_sims` engines on scoped threads and collect final hashes.
///
/// Catches non-determinism that only shows up under thread scheduling or
/// memory layout differences.
///
/// # Panics
///
/// Panics if a worker thread panics or the engine rejects the
/// `simulate` call.
pub fn run_parallel_simulations_scoped<F>(
    setup_fn: F,
    num_sims: usize,
    duration: f64,
    sub_steps: u32,
) -> ParallelSimResult
where
    F: Fn() -> Engine + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut engine = setup_fn();
                    engine
                        .simulate(duration, sub_steps)
                        .expect("simulate rejected");
                    engine.state_hash()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    ParallelSimResult {
        hashes,
        duration,
        num_sims,
    }
}

/// Compare two runs call by call, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs match throughout, `Some(call)` for the first
/// `simulate` call after which they differ (0 means the setups differ).
///
/// # Panics
///
/// Panics if the engine rejects the `simulate` call.
pub fn find_first_divergence<F>(setup_fn: F, calls: u64, dt: f64, sub_steps: u32) -> Option<u64>
where
    F: Fn() -> Engine,
{
    let mut first = setup_fn();
    let mut second = setup_fn();

    if first.state_hash() != second.state_hash() {
        return Some(0);
    }

    for call in 1..=calls {
        first.simulate(dt, sub_steps).expect("simulate rejected");
        second.simulate(dt, sub_steps).expect("simulate rejected");

        if first.state_hash() != second.state_hash() {
            debug!(call, "Runs diverged");
            return Some(call);
        }
    }

    None
}

/// Verify that a serialization round trip preserves the state exactly,
/// and that the restored engine keeps evolving identically.
///
/// # Panics
///
/// Panics if the engine rejects the `simulate` call.
pub fn verify_serialization_determinism<F>(setup_fn: F, duration: f64, sub_steps: u32) -> bool
where
    F: Fn() -> Engine,
{
    let mut engine = setup_fn();
    engine
        .simulate(duration, sub_steps)
        .expect("simulate rejected");

    let Ok(bytes) = engine.serialize() else {
        return false;
    };
    let Ok(mut restored) = Engine::deserialize(&bytes) else {
        return false;
    };

    if restored.state_hash() != engine.state_hash() {
        return false;
    }

    engine
        .simulate(duration, sub_steps)
        .expect("simulate rejected");
    restored
        .simulate(duration, sub_steps)
        .expect("simulate rejected");
    restored.state_hash() == engine.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for engine testing.
///
/// These generate random but reproducible setups for property-based tests.
pub mod strategies {
    use proptest::prelude::*;
    use sphere_core::prelude::*;

    /// Generate a unit vector.
    pub fn arb_unit_vector() -> impl Strategy<Value = Vec3> {
        (-1.0f64..1.0, -1.0f64..1.0, -1.0f64..1.0).prop_filter_map(
            "vector too short to normalize",
            |(x, y, z)| {
                let v = Vec3::new(x, y, z);
                (v.length() > 0.1).then(|| v.normalized())
            },
        )
    }

    /// Generate a `(position, axis)` pair with the axis tangent to the
    /// position.
    pub fn arb_frame() -> impl Strategy<Value = (Vec3, Vec3)> {
        (arb_unit_vector(), arb_unit_vector()).prop_filter_map(
            "axis parallel to position",
            |(r, w)| {
                let tangent = w.reject_from(r);
                (tangent.length() > 0.1).then(|| (r, tangent.normalized()))
            },
        )
    }

    /// Generate an agent with speed 0..3, thrust 0..2 and hp 1..10.
    pub fn arb_agent() -> impl Strategy<Value = Agent> {
        (arb_frame(), 0.0f64..3.0, 0.0f64..2.0, 1i32..10)
            .prop_map(|((r, u), v, a, hp)| Agent::new(r, u, v, a, hp))
    }

    /// Generate between 1 and `max_agents - 1` agents.
    pub fn arb_agent_list(max_agents: usize) -> impl Strategy<Value = Vec<Agent>> {
        proptest::collection::vec(arb_agent(), 1..max_agents)
    }

    /// Generate valid world parameters.
    pub fn arb_world() -> impl Strategy<Value = World> {
        (0.0f64..1.0, 0.02f64..0.3, 0.0f64..3.0, 0.0f64..2.0, 0.0f64..4.0).prop_map(
            |(restitution, agent_radius, missile_acceleration, friction, missile_guidance)| World {
                restitution,
                agent_radius,
                missile_acceleration,
                friction,
                missile_guidance,
            },
        )
    }

    /// Generate an action for an engine with `agents` agents.
    pub fn arb_action(agents: usize) -> impl Strategy<Value = Action> {
        let agent = 0..agents.max(1);
        prop_oneof![
            4 => (agent.clone(), proptest::option::of(0.0f64..3.0))
                .prop_map(|(agent, v)| Action::Launch { agent, v }),
            3 => (agent.clone(), -3.0f64..3.0)
                .prop_map(|(agent, angle)| Action::Turn { agent, angle }),
            3 => (agent, 0.0f64..2.0).prop_map(|(agent, a)| Action::SetThrust { agent, a }),
            4 => (0.0f64..1.0, 1u32..50).prop_map(|(t, n_steps)| Action::Simulate { t, n_steps }),
            1 => Just(Action::ClearMissiles),
        ]
    }

    /// Generate a world, agents and a sequence of up to `max_actions`
    /// actions that only reference existing agents.
    pub fn arb_scenario(
        max_agents: usize,
        max_actions: usize,
    ) -> impl Strategy<Value = (World, Vec<Agent>, Vec<Action>)> {
        (arb_world(), arb_agent_list(max_agents)).prop_flat_map(move |(world, agents)| {
            let actions = proptest::collection::vec(arb_action(agents.len()), 0..max_actions);
            (Just(world), Just(agents), actions)
        })
    }
}
