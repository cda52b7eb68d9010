//! Swarm lifecycle tests.
//!
//! Drives whole cycles through the public API: a resonant pair merges, the
//! cluster starves, and its constituents come back.

use holon_core::agent::FractalAgent;
use holon_core::types::AgentId;
use holon_core::error::{ConfigError, HolonError};
use holon_runtime::builder::SwarmBuilder;
use holon_runtime::config::SwarmConfig;
use holon_runtime::swarm::{Swarm, SwarmEvent};
use std::f64::consts::{PI, TAU};

/// A swarm that stops spawning as soon as one agent is live.
fn closed_swarm() -> Swarm {
    SwarmBuilder::new()
        .with_seed(3)
        .with_max_population(1)
        .build()
        .unwrap()
}

#[test]
fn starved_cluster_releases_its_constituents() {
    let mut swarm = closed_swarm();
    swarm.insert_agent(FractalAgent::new(AgentId(1), 1.0, 0.02)).unwrap();
    swarm.insert_agent(FractalAgent::new(AgentId(2), 1.0, 0.02)).unwrap();

    // Cycle 1: the pair composes into a cluster holding 0.04.
    let first = swarm.evolve_cycle(0.0).unwrap();
    assert!(first.spawned.is_none());
    assert_eq!(first.composed.len(), 1);
    let cluster_id = first.composed[0];
    assert_eq!(swarm.live_count(), 1);
    assert!((swarm.agent(cluster_id).unwrap().energy() - 0.04).abs() < 1e-12);

    // Cycle 2: the cluster sits below critical energy and bursts.
    let second = swarm.evolve_cycle(0.0).unwrap();
    assert!(second.spawned.is_none());
    assert_eq!(second.decomposed, vec![cluster_id]);
    assert_eq!(second.released, vec![AgentId(1), AgentId(2)]);
    assert!(swarm.absorbed().is_empty());
    assert!(swarm.agent(cluster_id).is_none());

    let mut total = 0.0;
    for id in [AgentId(1), AgentId(2)] {
        let agent = swarm.agent(id).unwrap();
        assert_eq!(agent.parent_id(), Some(cluster_id));
        assert_eq!(agent.cluster_id(), None);
        assert_eq!(agent.depth(), 0);
        assert_eq!(agent.decomposition_history().len(), 1);
        total += agent.energy();
    }
    assert!((total - 0.04).abs() < 1e-12, "energy must survive the burst");

    let stats = swarm.stats();
    assert_eq!(stats.total_compositions, 1);
    assert_eq!(stats.total_decompositions, 1);
}

#[test]
fn parent_link_clears_on_the_next_evolve() {
    let mut swarm = closed_swarm();
    swarm.insert_agent(FractalAgent::new(AgentId(1), 1.0, 0.02)).unwrap();
    swarm.insert_agent(FractalAgent::new(AgentId(2), 1.0, 0.02)).unwrap();
    swarm.evolve_cycle(0.0).unwrap();
    swarm.evolve_cycle(0.0).unwrap();
    assert!(swarm.agent(AgentId(1)).unwrap().parent_id().is_some());

    // Cycle 3: the released pair still resonates and re-composes.
    let third = swarm.evolve_cycle(0.0).unwrap();
    assert_eq!(third.composed.len(), 1);
    let absorbed = &swarm.absorbed()[&AgentId(1)];
    assert_eq!(absorbed.parent_id(), None);
    assert_eq!(absorbed.cluster_id(), Some(third.composed[0]));
}

#[test]
fn event_history_tells_the_story_in_order() {
    let mut swarm = closed_swarm();
    swarm.insert_agent(FractalAgent::new(AgentId(1), 1.0, 0.02)).unwrap();
    swarm.insert_agent(FractalAgent::new(AgentId(2), 1.0, 0.02)).unwrap();
    swarm.run(2, 0.0).unwrap();

    let kinds: Vec<(u64, &str)> = swarm
        .event_history()
        .iter()
        .filter_map(|(cycle, event)| match event {
            SwarmEvent::Composed { .. } => Some((*cycle, "composed")),
            SwarmEvent::Decomposed { .. } => Some((*cycle, "decomposed")),
            SwarmEvent::CycleComplete { .. } => Some((*cycle, "complete")),
            _ => None,
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            (1, "composed"),
            (1, "complete"),
            (2, "decomposed"),
            (2, "complete"),
        ]
    );
}

#[test]
fn long_run_respects_population_and_energy_bounds() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("holon_runtime=debug,holon_core=debug")
        .with_test_writer()
        .try_init();

    let mut swarm = SwarmBuilder::new()
        .with_seed(11)
        .with_max_population(6)
        .build()
        .unwrap();
    let mut previous_live = 0;
    for report in swarm.run(60, 0.1).unwrap() {
        if previous_live >= 6 {
            assert!(report.spawned.is_none(), "spawned past capacity");
        }
        assert!(report.coherence >= 0.0 && report.coherence <= 1.0 + 1e-12);
        assert!(report.total_energy.is_finite());
        previous_live = report.live;
    }
    for agent in swarm.agents().values() {
        let bounds = agent.energy_bounds();
        assert!(bounds.contains(agent.energy()));
        assert_eq!(agent.cluster_id(), None);
    }
    for agent in swarm.absorbed().values() {
        let cluster = agent.cluster_id().unwrap();
        assert!(
            swarm.agents().contains_key(&cluster) || swarm.absorbed().contains_key(&cluster),
            "absorbed agent points at a missing cluster"
        );
    }
}

#[test]
fn absorbed_agents_do_not_count_toward_capacity() {
    let mut swarm = SwarmBuilder::new()
        .with_seed(4)
        .with_max_population(2)
        .build()
        .unwrap();
    swarm.insert_agent(FractalAgent::new(AgentId(1), 0.5, 1.0)).unwrap();
    swarm.insert_agent(FractalAgent::new(AgentId(2), 0.5, 1.0)).unwrap();

    let first = swarm.evolve_cycle(0.0).unwrap();
    assert!(first.spawned.is_none());
    assert_eq!(first.composed.len(), 1);
    assert_eq!(swarm.live_count(), 1);
    assert_eq!(swarm.absorbed().len(), 2);

    // One live cluster leaves room under the cap, so a newcomer spawns.
    let second = swarm.evolve_cycle(0.0).unwrap();
    assert!(second.spawned.is_some());
    assert!(swarm.live_count() + swarm.absorbed().len() > 2);
    assert!(swarm.live_count() <= 2);
}

#[test]
fn oversized_spawn_jitter_fails_at_build() {
    let mut config = SwarmConfig::default();
    config.spawn.phase_jitter = 1e308;
    let Err(err) = SwarmBuilder::new().with_config(config).build() else {
        panic!("phase jitter of 1e308 was accepted");
    };
    assert!(matches!(
        err,
        HolonError::Config(ConfigError::OutOfRange { ref field, .. }) if field == "spawn.phase_jitter"
    ));

    let mut widest = SwarmConfig::default();
    widest.spawn.phase_jitter = PI;
    widest.spawn.velocity_jitter = TAU;
    widest.spawn.mutation_scale = 1.0;
    let mut swarm = SwarmBuilder::new().with_config(widest).build().unwrap();
    let reports = swarm.run(20, 0.1).unwrap();
    assert!(reports.iter().any(|r| r.spawned.is_some()));
    for agent in swarm.agents().values() {
        assert!(agent.phase().is_finite() && agent.velocity().is_finite());
    }
}
