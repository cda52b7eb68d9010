//! Reproducibility and input-validation tests.
//!
//! Same seed and same reality script must give the same run, and a bad
//! snapshot must leave the swarm untouched.

use holon_core::bridge::{RealitySnapshot, CPU_PERCENT, MEMORY_PERCENT};
use holon_core::error::{HolonError, RealityError};
use holon_runtime::builder::SwarmBuilder;
use holon_runtime::export::snapshot_to_json;
use holon_runtime::reality::{FixedReality, ScriptedReality};
use holon_runtime::swarm::Swarm;

fn script() -> ScriptedReality {
    ScriptedReality::new(vec![
        RealitySnapshot::from_percentages(12.0, 40.0, 70.0),
        RealitySnapshot::from_percentages(13.0, 41.0, 70.0),
        RealitySnapshot::from_percentages(12.5, 39.0, 71.0),
        RealitySnapshot::from_percentages(80.0, 10.0, 5.0),
    ])
    .looping()
}

fn seeded(seed: u64) -> Swarm {
    SwarmBuilder::new()
        .with_seed(seed)
        .with_max_population(10)
        .with_reality(script())
        .build()
        .unwrap()
}

#[test]
fn same_seed_same_run() {
    let mut a = seeded(42);
    let mut b = seeded(42);
    let reports_a = a.run(40, 0.1).unwrap();
    let reports_b = b.run(40, 0.1).unwrap();

    assert_eq!(reports_a, reports_b);
    assert_eq!(a.event_history(), b.event_history());
    assert_eq!(
        snapshot_to_json(&a.snapshot()).unwrap(),
        snapshot_to_json(&b.snapshot()).unwrap()
    );
}

#[test]
fn different_seeds_diverge() {
    let mut a = seeded(1);
    let mut b = seeded(2);
    a.evolve_cycle(0.1).unwrap();
    b.evolve_cycle(0.1).unwrap();

    let phase_a: Vec<f64> = a.agents().values().map(|x| x.phase()).collect();
    let phase_b: Vec<f64> = b.agents().values().map(|x| x.phase()).collect();
    assert_ne!(phase_a, phase_b);
}

#[test]
fn missing_metric_leaves_swarm_untouched() {
    let partial = RealitySnapshot::new()
        .with(CPU_PERCENT, 10.0)
        .with(MEMORY_PERCENT, 20.0);
    let mut swarm = SwarmBuilder::new()
        .with_reality(FixedReality::new(partial))
        .build()
        .unwrap();

    let err = swarm.evolve_cycle(0.1).unwrap_err();
    match err {
        HolonError::Reality(RealityError::MissingMetric(name)) => {
            assert_eq!(name, "disk_percent")
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(swarm.cycle(), 0);
    assert_eq!(swarm.time(), 0.0);
    assert_eq!(swarm.live_count(), 0);
    assert!(swarm.event_history().is_empty());
}

#[test]
fn non_finite_metric_is_rejected() {
    let mut swarm = SwarmBuilder::new()
        .with_reality(FixedReality::from_percentages(10.0, f64::NAN, 30.0))
        .build()
        .unwrap();
    assert!(matches!(
        swarm.evolve_cycle(0.1),
        Err(HolonError::Reality(RealityError::NonFiniteMetric { .. }))
    ));
    assert_eq!(swarm.stats().total_spawned, 0);
}

#[test]
fn empty_script_is_an_error_not_a_panic() {
    let mut swarm = SwarmBuilder::new()
        .with_reality(ScriptedReality::new(Vec::new()))
        .build()
        .unwrap();
    assert!(matches!(
        swarm.evolve_cycle(0.1),
        Err(HolonError::InvalidInput(_))
    ));
    assert_eq!(swarm.cycle(), 0);
}
