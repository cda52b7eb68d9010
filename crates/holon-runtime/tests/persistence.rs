//! File round trips: TOML configuration in, JSON snapshots and event logs out.

use holon_runtime::builder::SwarmBuilder;
use holon_runtime::config::SwarmConfig;
use holon_runtime::export::{self, EventLog};
use std::fs;

#[test]
fn config_file_drives_the_builder() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("holon.toml");
    fs::write(
        &path,
        r#"
seed = 9

[spawn]
max_population = 4

[decomposition]
critical_energy = 0.25
"#,
    )
    .unwrap();

    let builder = SwarmBuilder::from_config_file(&path).unwrap();
    assert_eq!(builder.config().seed, 9);
    assert_eq!(builder.config().spawn.max_population, 4);
    // Untouched sections keep their defaults.
    assert_eq!(builder.config().resonance.threshold, 0.95);

    let mut swarm = builder.build().unwrap();
    swarm.run(10, 0.1).unwrap();
    assert_eq!(swarm.decomposition_engine().config().critical_energy, 0.25);
    assert!(swarm.stats().total_spawned <= 10);
}

#[test]
fn saved_config_loads_back_identically() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("saved.toml");

    let mut config = SwarmConfig::default();
    config.seed = 1234;
    config.dynamics.coupling_strength = 0.8;
    config.composition.min_coherence = 0.9;
    config.save(&path).unwrap();

    let loaded = SwarmConfig::load(&path).unwrap();
    assert_eq!(loaded.seed, 1234);
    assert_eq!(loaded.dynamics.coupling_strength, 0.8);
    assert_eq!(
        loaded.to_toml_string().unwrap(),
        config.to_toml_string().unwrap()
    );
}

#[test]
fn invalid_config_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[spawn]\nmax_population = 0\n").unwrap();
    assert!(SwarmConfig::load(&path).is_err());
    assert!(SwarmConfig::load(dir.path().join("missing.toml")).is_err());
}

#[test]
fn snapshot_survives_a_file_round_trip() {
    let mut swarm = SwarmBuilder::new().with_seed(5).build().unwrap();
    swarm.run(25, 0.1).unwrap();
    let snapshot = swarm.snapshot();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");
    export::save_snapshot(&snapshot, &path).unwrap();
    let loaded = export::load_snapshot(&path).unwrap();

    assert_eq!(loaded.cycle, 25);
    assert_eq!(loaded.agents, snapshot.agents);
    assert_eq!(loaded.absorbed, snapshot.absorbed);
    assert_eq!(loaded.stats, snapshot.stats);
    assert_eq!(loaded.pool.len(), snapshot.pool.len());
    assert_eq!(
        export::snapshot_to_json(&loaded).unwrap(),
        export::snapshot_to_json(&snapshot).unwrap()
    );
}

#[test]
fn event_log_is_written_as_json() {
    let mut swarm = SwarmBuilder::new().build().unwrap();
    swarm.run(5, 0.1).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.json");
    export::save_events(&swarm, &path).unwrap();

    let log: EventLog = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(log.swarm.len(), swarm.event_history().len());
    assert_eq!(
        log.compositions.len(),
        swarm.composition_engine().events().len()
    );
}
