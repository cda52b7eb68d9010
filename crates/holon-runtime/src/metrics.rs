//! Population metrics for reading a swarm's emergent state.
//!
//! Computes three categories from swarm state:
//! - Population: depth structure and how energy is spread across agents
//! - Lifecycle: composition and decomposition activity
//! - Memory: pool and association graph size

use crate::swarm::{Swarm, SwarmEvent, SwarmSnapshot};
use serde::Serialize;
use std::collections::BTreeMap;

/// Shape of the live population.
#[derive(Debug, Clone, Serialize)]
pub struct PopulationMetrics {
    pub live: usize,
    pub absorbed: usize,
    /// Depth -> live agent count.
    pub depth_histogram: BTreeMap<u32, usize>,
    pub total_energy: f64,
    pub mean_energy: f64,
    /// Gini coefficient of live energies (0 = equal, 1 = one agent holds all).
    pub energy_gini: f64,
    pub coherence: f64,
    pub mean_resonance: f64,
}

/// Composition and decomposition activity over the whole run.
#[derive(Debug, Clone, Serialize)]
pub struct LifecycleMetrics {
    pub total_spawned: usize,
    pub total_compositions: usize,
    pub total_decompositions: usize,
    pub rejected_compositions: usize,
    /// Rejection kind -> count.
    pub rejections_by_kind: BTreeMap<String, usize>,
    pub mean_cluster_size: f64,
    pub mean_energy_per_constituent: f64,
}

/// Size of the shared memory structures.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryMetrics {
    pub pool_size: usize,
    pub strongest_pattern: Option<String>,
    pub strongest_strength: f64,
    pub association_links: usize,
    pub association_sources: usize,
}

/// All swarm metrics combined.
#[derive(Debug, Clone, Serialize)]
pub struct SwarmMetrics {
    pub population: PopulationMetrics,
    pub lifecycle: LifecycleMetrics,
    pub memory: MemoryMetrics,
}

/// Compute all metrics from the swarm's current state and history.
pub fn compute(swarm: &Swarm) -> SwarmMetrics {
    SwarmMetrics {
        population: compute_population(swarm),
        lifecycle: compute_lifecycle(swarm),
        memory: compute_memory(swarm),
    }
}

fn compute_population(swarm: &Swarm) -> PopulationMetrics {
    let live: Vec<_> = swarm.agents().values().cloned().collect();
    let energies: Vec<f64> = live.iter().map(|a| a.energy()).collect();
    let mut depth_histogram = BTreeMap::new();
    for agent in &live {
        *depth_histogram.entry(agent.depth()).or_insert(0) += 1;
    }
    let total_energy: f64 = energies.iter().sum();
    let n = live.len();

    PopulationMetrics {
        live: n,
        absorbed: swarm.absorbed().len(),
        depth_histogram,
        total_energy,
        mean_energy: if n > 0 { total_energy / n as f64 } else { 0.0 },
        energy_gini: compute_gini(&energies),
        coherence: swarm.detector().coherence(&live),
        mean_resonance: if n > 0 {
            live.iter().map(|a| a.resonance()).sum::<f64>() / n as f64
        } else {
            0.0
        },
    }
}

fn compute_lifecycle(swarm: &Swarm) -> LifecycleMetrics {
    let composition = swarm.composition_engine().stats();
    let decomposition = swarm.decomposition_engine().stats();

    let mut rejected_compositions = 0;
    let mut rejections_by_kind = BTreeMap::new();
    for (_, event) in swarm.event_history() {
        if let SwarmEvent::CompositionRejected { reason, .. } = event {
            rejected_compositions += 1;
            *rejections_by_kind
                .entry(reason.kind().to_string())
                .or_insert(0) += 1;
        }
    }

    LifecycleMetrics {
        total_spawned: swarm.stats().total_spawned,
        total_compositions: composition.total_compositions,
        total_decompositions: decomposition.total_decompositions,
        rejected_compositions,
        rejections_by_kind,
        mean_cluster_size: composition.mean_members,
        mean_energy_per_constituent: decomposition.mean_energy_per_constituent,
    }
}

fn compute_memory(swarm: &Swarm) -> MemoryMetrics {
    let pool = swarm.pool();
    let strongest = pool.dominant();
    MemoryMetrics {
        pool_size: pool.len(),
        strongest_pattern: strongest.map(|e| e.id.to_string()),
        strongest_strength: strongest.map(|e| e.strength).unwrap_or(0.0),
        association_links: swarm.associations().link_count(),
        association_sources: swarm.associations().source_count(),
    }
}

/// Per-snapshot series for plotting a run's trajectory.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Trajectory {
    pub cycles: Vec<u64>,
    pub live: Vec<usize>,
    pub clusters: Vec<usize>,
    pub deepest: Vec<u32>,
    pub total_energy: Vec<f64>,
    pub coherence: Vec<f64>,
}

/// Collect time series from a sequence of snapshots.
pub fn trajectory(snapshots: &[SwarmSnapshot]) -> Trajectory {
    let mut t = Trajectory::default();
    for snap in snapshots {
        t.cycles.push(snap.cycle);
        t.live.push(snap.stats.live);
        t.clusters.push(snap.stats.clusters);
        t.deepest.push(snap.stats.deepest);
        t.total_energy.push(snap.stats.total_energy);
        t.coherence.push(snap.stats.coherence);
    }
    t
}

fn compute_gini(values: &[f64]) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }

    let mean = values.iter().sum::<f64>() / n as f64;
    if mean <= 0.0 {
        return 0.0;
    }

    let mut sum_abs_diff = 0.0;
    for a in values {
        for b in values {
            sum_abs_diff += (a - b).abs();
        }
    }

    sum_abs_diff / (2.0 * n as f64 * n as f64 * mean)
}

/// Print a formatted metrics report to the terminal.
pub fn print_report(metrics: &SwarmMetrics) {
    let p = &metrics.population;
    let l = &metrics.lifecycle;
    let m = &metrics.memory;

    println!("── Population ──");
    println!("  live / absorbed:      {} / {}", p.live, p.absorbed);
    for (depth, count) in &p.depth_histogram {
        println!("  depth {}:              {}", depth, count);
    }
    println!("  total energy:         {:.4}", p.total_energy);
    println!("  energy gini:          {:.4}", p.energy_gini);
    println!("  coherence:            {:.4}", p.coherence);
    println!("── Lifecycle ──");
    println!("  spawned:              {}", l.total_spawned);
    println!("  compositions:         {}", l.total_compositions);
    println!("  decompositions:       {}", l.total_decompositions);
    println!("  rejected:             {}", l.rejected_compositions);
    println!("── Memory ──");
    println!("  pool size:            {}", m.pool_size);
    if let Some(pattern) = &m.strongest_pattern {
        println!("  strongest:            {} ({:.4})", pattern, m.strongest_strength);
    }
    println!("  association links:    {}", m.association_links);
}
