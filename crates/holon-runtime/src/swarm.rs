//! Swarm: the population and its cycle loop.
//!
//! The swarm owns every agent. Live agents sit in one map; constituents that
//! have been absorbed into a cluster move to a registry so that decomposition
//! can hand them back exactly as they were.
//!
//! Each cycle:
//! 1. Spawn a base agent from the current reality snapshot, if there is room
//! 2. Advance every live agent's phase and charge its metabolic cost
//! 3. Annotate resonance and find resonant clusters at each depth
//! 4. Compose clusters; members move to the absorbed registry
//! 5. Burst the clusters that were starved before this cycle composed
//! 6. Fold dominant patterns into the global pool, decay pool and links

use crate::config::SwarmConfig;
use crate::reality::RealitySource;
use holon_core::agent::{AgentRecord, FractalAgent};
use holon_core::bridge::{PhaseState, TranscendentalBridge};
use holon_core::composition::{CompositionEngine, CompositionOutcome, CompositionRejection};
use holon_core::decomposition::{DecompositionEngine, DecompositionOutcome};
use holon_core::error::{HolonError, Result};
use holon_core::memory::{
    self, AssociativeMemory, HomeostaticScaler, Pattern, PatternEvolution, PatternMemory,
};
use holon_core::resonance::ResonanceDetector;
use holon_core::types::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, trace};

/// Cycle counter.
pub type Cycle = u64;

/// Event emitted by the swarm during simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SwarmEvent {
    /// A base agent was born.
    Spawned { id: AgentId, phase: f64, energy: f64 },
    /// A resonant group merged into a cluster.
    Composed {
        cluster: AgentId,
        members: Vec<AgentId>,
        depth: u32,
        event: EventId,
    },
    /// A resonant group failed a composition precondition.
    CompositionRejected {
        members: Vec<AgentId>,
        reason: CompositionRejection,
    },
    /// A starved cluster released its constituents.
    Decomposed {
        cluster: AgentId,
        constituents: Vec<AgentId>,
        event: EventId,
    },
    /// Pool patterns decayed below the memory floor.
    PatternsForgotten { patterns: Vec<PatternId> },
    /// A cycle completed.
    CycleComplete {
        cycle: Cycle,
        time: SimTime,
        live: usize,
        absorbed: usize,
    },
}

/// What happened during one call to [`Swarm::evolve_cycle`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle: Cycle,
    pub time: SimTime,
    /// Bridge output used for this cycle's spawn.
    pub phase_state: Option<PhaseState>,
    pub spawned: Option<AgentId>,
    /// Resonant groups handed to composition.
    pub clusters_found: usize,
    pub composed: Vec<AgentId>,
    pub rejected: Vec<(Vec<AgentId>, CompositionRejection)>,
    pub decomposed: Vec<AgentId>,
    /// Constituents returned to the live population.
    pub released: Vec<AgentId>,
    pub forgotten: usize,
    pub live: usize,
    pub absorbed: usize,
    /// Energy held by live agents after the cycle.
    pub total_energy: f64,
    /// Order parameter of the live population after the cycle.
    pub coherence: f64,
}

/// Statistics about the swarm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwarmStats {
    pub cycle: Cycle,
    pub time: SimTime,
    pub live: usize,
    pub absorbed: usize,
    /// Live agents at depth 1 or deeper.
    pub clusters: usize,
    pub deepest: u32,
    pub total_spawned: usize,
    pub total_compositions: usize,
    pub total_decompositions: usize,
    pub pool_size: usize,
    pub association_links: usize,
    pub total_energy: f64,
    pub coherence: f64,
}

/// A complete serializable snapshot of the swarm at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmSnapshot {
    pub cycle: Cycle,
    pub time: SimTime,
    pub agents: Vec<AgentRecord>,
    pub absorbed: Vec<AgentRecord>,
    pub pool: PatternMemory,
    pub stats: SwarmStats,
}

/// The swarm - manages the agent population and runs the cycle loop.
pub struct Swarm {
    config: SwarmConfig,
    reality: Box<dyn RealitySource>,
    bridge: TranscendentalBridge,
    detector: ResonanceDetector,
    composer: CompositionEngine,
    decomposer: DecompositionEngine,
    evolution: PatternEvolution,
    scaler: HomeostaticScaler,
    pool: PatternMemory,
    associations: AssociativeMemory,
    agents: BTreeMap<AgentId, FractalAgent>,
    absorbed: BTreeMap<AgentId, FractalAgent>,
    ids: IdSequence,
    rng: StdRng,
    time: SimTime,
    cycle: Cycle,
    total_spawned: usize,
    event_history: Vec<(Cycle, SwarmEvent)>,
}

impl Swarm {
    /// Create an empty swarm. The configuration is validated first.
    pub fn new(config: SwarmConfig, reality: impl RealitySource + 'static) -> Result<Self> {
        Self::from_parts(config, Box::new(reality))
    }

    pub(crate) fn from_parts(config: SwarmConfig, reality: Box<dyn RealitySource>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            bridge: TranscendentalBridge::new(),
            detector: ResonanceDetector::new(config.resonance.clone()),
            composer: CompositionEngine::new(config.composition.clone()),
            decomposer: DecompositionEngine::new(config.decomposition.clone()),
            evolution: PatternEvolution::with_scale(
                config.seed.wrapping_add(1),
                config.spawn.mutation_scale,
            ),
            scaler: HomeostaticScaler::new(config.dynamics.homeostatic_target),
            pool: PatternMemory::with_config(config.memory.clone()),
            associations: AssociativeMemory::with_config(config.associations.clone()),
            agents: BTreeMap::new(),
            absorbed: BTreeMap::new(),
            ids: IdSequence::new(),
            rng: StdRng::seed_from_u64(config.seed),
            time: 0.0,
            cycle: 0,
            total_spawned: 0,
            event_history: Vec::new(),
            reality,
            config,
        })
    }

    /// Place an existing agent into the live population.
    ///
    /// Fails if the id is already live or absorbed.
    pub fn insert_agent(&mut self, agent: FractalAgent) -> Result<()> {
        let id = agent.id();
        if self.agents.contains_key(&id) || self.absorbed.contains_key(&id) {
            return Err(HolonError::invalid_input(format!("{} is already in the swarm", id)));
        }
        self.ids.reserve_past(id);
        self.agents.insert(id, agent);
        Ok(())
    }

    /// Run one cycle.
    ///
    /// Input problems (a bad `delta_time`, an unusable snapshot) are
    /// reported before anything is touched, so an `Err` leaves the swarm as
    /// it was.
    pub fn evolve_cycle(&mut self, delta_time: f64) -> Result<CycleReport> {
        if !delta_time.is_finite() || delta_time < 0.0 {
            return Err(HolonError::invalid_input(format!(
                "delta_time must be finite and non-negative, got {}",
                delta_time
            )));
        }
        let now = self.time + delta_time;

        let phase_state = if self.agents.len() < self.config.spawn.max_population {
            let snapshot = self.reality.snapshot(now)?;
            Some(self.bridge.reality_to_phase(&snapshot)?)
        } else {
            None
        };

        self.cycle += 1;
        self.time = now;
        let mut events = Vec::new();
        let mut report = CycleReport {
            cycle: self.cycle,
            time: now,
            phase_state,
            ..Default::default()
        };

        // 1. Spawn
        if let Some(state) = phase_state {
            let agent = self.spawn_from(&state, now);
            events.push(SwarmEvent::Spawned {
                id: agent.id(),
                phase: agent.phase(),
                energy: agent.energy(),
            });
            report.spawned = Some(agent.id());
            self.agents.insert(agent.id(), agent);
        }

        // 2. Evolve
        self.evolve(delta_time, now);
        let starved: Vec<FractalAgent> = self.agents.values().cloned().collect();
        let critical = self.decomposer.detect_critical_clusters(&starved);

        // 3. Detect
        let clusters = self.detect();
        report.clusters_found = clusters.len();

        // 4. Compose
        for member_ids in clusters {
            self.compose_group(member_ids, now, &mut report, &mut events);
        }

        // 5. Decompose
        for cluster_id in critical {
            self.burst(cluster_id, now, &mut report, &mut events);
        }

        // 6. Record
        let forgotten = self.fold_patterns(delta_time);
        report.forgotten = forgotten.len();
        if !forgotten.is_empty() {
            events.push(SwarmEvent::PatternsForgotten { patterns: forgotten });
        }

        let live: Vec<FractalAgent> = self.agents.values().cloned().collect();
        report.live = live.len();
        report.absorbed = self.absorbed.len();
        report.total_energy = live.iter().map(|a| a.energy()).sum();
        report.coherence = self.detector.coherence(&live);

        events.push(SwarmEvent::CycleComplete {
            cycle: self.cycle,
            time: now,
            live: report.live,
            absorbed: report.absorbed,
        });
        for event in events {
            self.event_history.push((self.cycle, event));
        }

        debug!(
            cycle = self.cycle,
            live = report.live,
            absorbed = report.absorbed,
            composed = report.composed.len(),
            decomposed = report.decomposed.len(),
            coherence = report.coherence,
            "cycle complete"
        );

        Ok(report)
    }

    /// Run `cycles` cycles, stopping at the first error.
    pub fn run(&mut self, cycles: u64, delta_time: f64) -> Result<Vec<CycleReport>> {
        let mut reports = Vec::new();
        for _ in 0..cycles {
            reports.push(self.evolve_cycle(delta_time)?);
        }
        info!(
            cycles,
            live = self.agents.len(),
            absorbed = self.absorbed.len(),
            "run finished"
        );
        Ok(reports)
    }

    fn spawn_from(&mut self, state: &PhaseState, now: SimTime) -> FractalAgent {
        let spawn = &self.config.spawn;
        let id = self.ids.next_id();
        let phase = state.alpha + self.rng.random_range(-spawn.phase_jitter..=spawn.phase_jitter);
        let velocity =
            spawn.base_velocity + self.rng.random_range(-spawn.velocity_jitter..=spawn.velocity_jitter);
        let strength = state.magnitude.clamp(0.0, 1.0);

        let mut recalled = BTreeMap::new();
        for p in state.phases() {
            recalled.insert(PatternId::from_phase(p), strength);
        }
        let mut spread = strength;
        for k in 1..=spawn.seed_spread {
            spread *= spawn.seed_decay;
            let neighbour = PatternId::from_phase(state.alpha + k as f64 / PatternId::PHASE_RESOLUTION);
            recalled.entry(neighbour).or_insert(spread);
        }

        let seeds: Vec<Pattern> = state
            .phases()
            .iter()
            .map(|&p| Pattern::from_phase(p, strength))
            .collect();
        let mut patterns = Vec::new();
        memory::merge_patterns(&mut patterns, &seeds);
        for k in 0..spawn.seed_spread {
            let offspring = self.evolution.mutate(&seeds[k % seeds.len()]);
            memory::merge_patterns(&mut patterns, &[offspring]);
        }
        self.scaler.scale(&mut patterns);

        let wrapped = wrap_phase(phase);
        let radius = spawn.spawn_radius;
        let mut agent = FractalAgent::new(id, wrapped, spawn.base_energy)
            .with_energy_bounds(self.config.dynamics.energy_bounds)
            .with_velocity(velocity)
            .with_position(Position::new(radius * wrapped.cos(), radius * wrapped.sin(), 0.0))
            .with_memory(recalled)
            .with_patterns(patterns)
            .born_at(now);
        agent.set_energy(spawn.base_energy);

        self.total_spawned += 1;
        trace!(id = %id, phase = agent.phase(), velocity, "spawned agent");
        agent
    }

    fn evolve(&mut self, delta_time: f64, now: SimTime) {
        let live: Vec<FractalAgent> = self.agents.values().cloned().collect();
        let field = self.detector.mean_field(&live);
        let strength = self.config.dynamics.coupling_strength;
        let cost = self.config.dynamics.metabolic_cost * delta_time;

        for agent in self.agents.values_mut() {
            agent.set_parent(None);
            agent.update_phase_coupled(delta_time, &field, strength);
            agent.metabolize(cost * (agent.depth() as f64 + 1.0));
            if !agent.patterns().is_empty() {
                self.scaler.scale(agent.patterns_mut());
            }
            agent.touch(now);
        }
    }

    /// Annotate resonance on every live agent and return candidate groups,
    /// shallowest depth first.
    fn detect(&mut self) -> Vec<Vec<AgentId>> {
        let mut live: Vec<FractalAgent> = self.agents.values().cloned().collect();
        self.detector.annotate(&mut live);

        let max_depth = self.config.dynamics.max_depth;
        let mut by_depth: BTreeMap<u32, Vec<FractalAgent>> = BTreeMap::new();
        for annotated in live {
            if let Some(agent) = self.agents.get_mut(&annotated.id()) {
                agent.set_resonance(annotated.resonance());
            }
            if annotated.depth() < max_depth {
                by_depth.entry(annotated.depth()).or_default().push(annotated);
            }
        }

        by_depth
            .values()
            .flat_map(|group| self.detector.candidate_clusters(group))
            .collect()
    }

    fn compose_group(
        &mut self,
        member_ids: Vec<AgentId>,
        now: SimTime,
        report: &mut CycleReport,
        events: &mut Vec<SwarmEvent>,
    ) {
        let members: Vec<FractalAgent> = member_ids
            .iter()
            .filter_map(|id| self.agents.get(id).cloned())
            .collect();

        match self.composer.compose(&members, &mut self.ids, now) {
            CompositionOutcome::Composed { cluster, event } => {
                let cluster_id = cluster.id();
                let dominant: Vec<PatternId> = members
                    .iter()
                    .filter_map(|m| m.dominant_pattern().map(|(id, _)| id.clone()))
                    .collect();

                for mut member in members {
                    self.agents.remove(&member.id());
                    member.set_cluster(Some(cluster_id));
                    self.absorbed.insert(member.id(), member);
                }
                self.associations
                    .co_activate(&dominant, self.config.dynamics.association_delta);

                events.push(SwarmEvent::Composed {
                    cluster: cluster_id,
                    members: member_ids,
                    depth: cluster.depth(),
                    event,
                });
                report.composed.push(cluster_id);
                self.agents.insert(cluster_id, cluster);
            }
            CompositionOutcome::NotComposed { reason } => {
                report.rejected.push((member_ids.clone(), reason.clone()));
                events.push(SwarmEvent::CompositionRejected {
                    members: member_ids,
                    reason,
                });
            }
        }
    }

    fn burst(
        &mut self,
        cluster_id: AgentId,
        now: SimTime,
        report: &mut CycleReport,
        events: &mut Vec<SwarmEvent>,
    ) {
        // Absorbed into a deeper cluster during this cycle's compose step.
        let Some(cluster) = self.agents.get(&cluster_id).cloned() else {
            return;
        };

        match self.decomposer.decompose(&cluster, Some(&self.absorbed), now) {
            DecompositionOutcome::Decomposed {
                constituents,
                event,
                ..
            } => {
                self.agents.remove(&cluster_id);
                let released: Vec<AgentId> = constituents.iter().map(|c| c.id()).collect();
                for constituent in constituents {
                    self.absorbed.remove(&constituent.id());
                    self.agents.insert(constituent.id(), constituent);
                }
                report.decomposed.push(cluster_id);
                report.released.extend(released.iter().copied());
                events.push(SwarmEvent::Decomposed {
                    cluster: cluster_id,
                    constituents: released,
                    event,
                });
            }
            DecompositionOutcome::Blocked { reason, .. } => {
                trace!(cluster = %cluster_id, %reason, "critical cluster no longer ready");
            }
        }
    }

    /// Fold each live agent's dominant pattern into the pool, then decay.
    fn fold_patterns(&mut self, delta_time: f64) -> Vec<PatternId> {
        let reinforcement = self.config.dynamics.pool_reinforcement;
        for agent in self.agents.values() {
            if let Some((pattern, weight)) = agent.dominant_pattern() {
                if self.pool.recall(pattern).is_some() {
                    self.pool.reinforce(pattern, true, reinforcement);
                } else {
                    self.pool.add(pattern.clone(), weight);
                }
            }
        }
        let forgotten = self.pool.decay(delta_time);
        self.associations.decay(delta_time);
        forgotten
    }

    /// Get swarm statistics.
    pub fn stats(&self) -> SwarmStats {
        let live: Vec<FractalAgent> = self.agents.values().cloned().collect();
        let composition = self.composer.stats();
        let decomposition = self.decomposer.stats();
        SwarmStats {
            cycle: self.cycle,
            time: self.time,
            live: live.len(),
            absorbed: self.absorbed.len(),
            clusters: live.iter().filter(|a| a.depth() > 0).count(),
            deepest: live.iter().map(|a| a.depth()).max().unwrap_or(0),
            total_spawned: self.total_spawned,
            total_compositions: composition.total_compositions,
            total_decompositions: decomposition.total_decompositions,
            pool_size: self.pool.len(),
            association_links: self.associations.link_count(),
            total_energy: live.iter().map(|a| a.energy()).sum(),
            coherence: self.detector.coherence(&live),
        }
    }

    /// Take a serializable snapshot of the current state.
    pub fn snapshot(&self) -> SwarmSnapshot {
        SwarmSnapshot {
            cycle: self.cycle,
            time: self.time,
            agents: self.agents.values().map(|a| a.to_record(self.time)).collect(),
            absorbed: self.absorbed.values().map(|a| a.to_record(self.time)).collect(),
            pool: self.pool.clone(),
            stats: self.stats(),
        }
    }

    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    pub fn time(&self) -> SimTime {
        self.time
    }

    pub fn cycle(&self) -> Cycle {
        self.cycle
    }

    /// Live agents by id.
    pub fn agents(&self) -> &BTreeMap<AgentId, FractalAgent> {
        &self.agents
    }

    pub fn agent(&self, id: AgentId) -> Option<&FractalAgent> {
        self.agents.get(&id)
    }

    /// Constituents currently held inside some cluster.
    pub fn absorbed(&self) -> &BTreeMap<AgentId, FractalAgent> {
        &self.absorbed
    }

    pub fn live_count(&self) -> usize {
        self.agents.len()
    }

    /// The global pattern pool.
    pub fn pool(&self) -> &PatternMemory {
        &self.pool
    }

    pub fn associations(&self) -> &AssociativeMemory {
        &self.associations
    }

    pub fn detector(&self) -> &ResonanceDetector {
        &self.detector
    }

    pub fn composition_engine(&self) -> &CompositionEngine {
        &self.composer
    }

    pub fn decomposition_engine(&self) -> &DecompositionEngine {
        &self.decomposer
    }

    /// Get the full event history.
    pub fn event_history(&self) -> &[(Cycle, SwarmEvent)] {
        &self.event_history
    }
}
