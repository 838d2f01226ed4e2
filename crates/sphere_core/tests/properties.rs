//! Property tests over random worlds, agents and action sequences.

use proptest::prelude::*;
use sphere_core::prelude::*;
use sphere_test_utils::determinism::strategies::{arb_agent_list, arb_scenario, arb_world};

const SPHERE_TOLERANCE: f64 = 1e-9;

fn on_sphere(v: Vec3) -> bool {
    (v.length() - 1.0).abs() < SPHERE_TOLERANCE
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn construction_keeps_agents(world in arb_world(), agents in arb_agent_list(8)) {
        let engine = Engine::new(world, agents.clone()).unwrap();
        prop_assert_eq!(engine.agents().len(), agents.len());
        prop_assert!(engine.missiles().is_empty());
        for (stored, input) in engine.agents().iter().zip(&agents) {
            prop_assert!(stored.approx_eq(input, 1e-9));
        }
    }

    #[test]
    fn launch_places_missile_on_hit_radius(
        world in arb_world(),
        agents in arb_agent_list(6),
        pick in any::<prop::sample::Index>(),
        speed in proptest::option::of(0.0f64..5.0),
    ) {
        let mut engine = Engine::new(world, agents).unwrap();
        let shooter = pick.index(engine.agents().len());
        engine.launch_missile(shooter, speed).unwrap();

        let agent = engine.agents()[shooter];
        let missile = engine.missiles()[0];
        prop_assert!((agent.r.dot(missile.r) - world.agent_radius.cos()).abs() < 1e-5);
        prop_assert!(missile.u.approx_eq(agent.u, 1e-12));
        prop_assert_eq!(missile.v, speed.unwrap_or(agent.v));
        prop_assert_eq!(missile.owner, shooter);
        prop_assert_ne!(missile.target, Some(shooter));
    }

    #[test]
    fn invariants_hold_across_actions((world, agents, actions) in arb_scenario(6, 16)) {
        let mut engine = Engine::new(world, agents).unwrap();

        for action in &actions {
            let hp_before: Vec<i32> = engine.agents().iter().map(|a| a.hp).collect();
            let missiles_before = engine.missiles().len();

            let events = engine.apply(action).unwrap();

            // hp never increases
            for (agent, before) in engine.agents().iter().zip(&hp_before) {
                prop_assert!(agent.hp <= *before);
            }

            // Missiles only appear through launches and leave through hits or a clear
            match action {
                Action::Launch { .. } => {
                    prop_assert_eq!(engine.missiles().len(), missiles_before + 1);
                }
                Action::Simulate { .. } => {
                    prop_assert!(engine.missiles().len() <= missiles_before);
                    prop_assert_eq!(engine.missiles().len() + events.hits.len(), missiles_before);
                }
                Action::ClearMissiles => {
                    prop_assert!(engine.missiles().is_empty());
                }
                _ => {
                    prop_assert_eq!(engine.missiles().len(), missiles_before);
                }
            }

            for agent in engine.agents() {
                prop_assert!(on_sphere(agent.r));
                prop_assert!(on_sphere(agent.u));
                prop_assert!(agent.v.is_finite());
            }
            for missile in engine.missiles() {
                prop_assert!(on_sphere(missile.r));
                prop_assert!(on_sphere(missile.u));
                prop_assert!(missile.v.is_finite());
            }
        }
    }

    #[test]
    fn zero_duration_is_a_no_op(
        (world, agents, actions) in arb_scenario(5, 8),
        n_steps in 1u32..1000,
    ) {
        let mut engine = Engine::new(world, agents).unwrap();
        for action in &actions {
            engine.apply(action).unwrap();
        }

        let before = engine.snapshot();
        let hash = engine.state_hash();
        let events = engine.simulate(0.0, n_steps).unwrap();

        prop_assert!(events.is_empty());
        prop_assert_eq!(engine.snapshot(), before);
        prop_assert_eq!(engine.state_hash(), hash);
    }

    #[test]
    fn snapshot_restore_continues_identically(
        (world, agents, actions) in arb_scenario(5, 8),
    ) {
        let mut engine = Engine::new(world, agents).unwrap();
        for action in &actions {
            engine.apply(action).unwrap();
        }

        let mut restored = Engine::restore(world, engine.snapshot()).unwrap();
        let a = engine.simulate(1.0, 100).unwrap();
        let b = restored.simulate(1.0, 100).unwrap();

        prop_assert!(restored.snapshot().approx_eq(&engine.snapshot(), 1e-9));
        prop_assert_eq!(a.hits.len(), b.hits.len());
    }
}
