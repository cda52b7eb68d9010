//! Decomposition: bursting a starved cluster back into its constituents.
//!
//! A cluster whose energy has fallen to the critical threshold releases its
//! children. Energy is split equally, constituents are scattered on a ring
//! around the cluster, and the cluster's memory is handed down to each of
//! them. Constituents the caller still tracks are restored from its
//! registry; any that are missing are rebuilt from the cluster itself.

use crate::agent::FractalAgent;
use crate::types::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::TAU;
use std::fmt;
use tracing::{debug, trace};

/// Configuration for the decomposition engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecompositionConfig {
    /// A cluster at or below this energy bursts (default: 0.1).
    pub critical_energy: f64,
    /// Distance of released constituents from the cluster (default: 1.0).
    pub scatter_radius: f64,
    /// Phase step between rebuilt constituents (default: 0.1).
    pub phase_spread: f64,
    /// Seed for the scatter rotation (default: 42).
    pub seed: u64,
}

impl Default for DecompositionConfig {
    fn default() -> Self {
        Self {
            critical_energy: 0.1,
            scatter_radius: 1.0,
            phase_spread: 0.1,
            seed: 42,
        }
    }
}

/// Why an agent cannot decompose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DecompositionBlock {
    /// Depth 0 or no children.
    NotACluster,
    AboveThreshold { energy: f64, threshold: f64 },
    /// An equal share would be clamped by a constituent's energy bounds.
    SplitOutOfBounds { share: f64, min: f64, max: f64 },
}

impl fmt::Display for DecompositionBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecompositionBlock::NotACluster => write!(f, "not a cluster"),
            DecompositionBlock::AboveThreshold { .. } => write!(f, "above threshold"),
            DecompositionBlock::SplitOutOfBounds { .. } => write!(f, "split out of bounds"),
        }
    }
}

/// Answer of [`DecompositionEngine::can_decompose`].
#[derive(Debug, Clone, PartialEq)]
pub enum DecompositionCheck {
    Ready,
    Blocked(DecompositionBlock),
}

impl DecompositionCheck {
    pub fn is_ready(&self) -> bool {
        matches!(self, DecompositionCheck::Ready)
    }

    pub fn reason(&self) -> Option<&DecompositionBlock> {
        match self {
            DecompositionCheck::Ready => None,
            DecompositionCheck::Blocked(block) => Some(block),
        }
    }
}

/// Result of a decomposition attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum DecompositionOutcome {
    Decomposed {
        /// The retired cluster, children cleared.
        cluster: FractalAgent,
        constituents: Vec<FractalAgent>,
        event: EventId,
    },
    Blocked {
        cluster: AgentId,
        reason: DecompositionBlock,
    },
}

impl DecompositionOutcome {
    pub fn is_decomposed(&self) -> bool {
        matches!(self, DecompositionOutcome::Decomposed { .. })
    }

    pub fn constituents(&self) -> &[FractalAgent] {
        match self {
            DecompositionOutcome::Decomposed { constituents, .. } => constituents,
            DecompositionOutcome::Blocked { .. } => &[],
        }
    }
}

/// Audit record of one burst.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecompositionEvent {
    pub id: EventId,
    pub timestamp: SimTime,
    pub cluster: AgentId,
    pub constituents: Vec<AgentId>,
    pub energy_distribution: Vec<f64>,
    pub pre_burst_energy: f64,
    pub threshold: f64,
    /// Depth of the cluster that burst.
    pub depth: u32,
}

/// Aggregate view of the decomposition log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecompositionStats {
    pub total_decompositions: usize,
    pub total_constituents_released: usize,
    pub total_energy_released: f64,
    pub mean_energy_per_constituent: f64,
    /// Cluster depth -> count.
    pub by_depth: BTreeMap<u32, usize>,
}

/// Equal shares must land inside the bounds unclamped, or energy is not conserved.
fn split_block(share: f64, bounds: EnergyBounds) -> Option<DecompositionBlock> {
    if bounds.contains(share) {
        None
    } else {
        Some(DecompositionBlock::SplitOutOfBounds {
            share,
            min: bounds.min,
            max: bounds.max,
        })
    }
}

/// Bursts critical-energy clusters.
#[derive(Debug, Clone)]
pub struct DecompositionEngine {
    config: DecompositionConfig,
    rng: StdRng,
    events: Vec<DecompositionEvent>,
}

impl Default for DecompositionEngine {
    fn default() -> Self {
        Self::new(DecompositionConfig::default())
    }
}

impl DecompositionEngine {
    pub fn new(config: DecompositionConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &DecompositionConfig {
        &self.config
    }

    /// Whether `agent` may burst now. Not being a cluster wins over energy.
    pub fn can_decompose(&self, agent: &FractalAgent) -> DecompositionCheck {
        if agent.depth() == 0 || agent.children().is_empty() {
            return DecompositionCheck::Blocked(DecompositionBlock::NotACluster);
        }
        if agent.energy() > self.config.critical_energy {
            return DecompositionCheck::Blocked(DecompositionBlock::AboveThreshold {
                energy: agent.energy(),
                threshold: self.config.critical_energy,
            });
        }
        let share = agent.energy() / agent.children().len() as f64;
        if let Some(block) = split_block(share, agent.energy_bounds()) {
            return DecompositionCheck::Blocked(block);
        }
        DecompositionCheck::Ready
    }

    /// Release the constituents of `cluster`.
    ///
    /// `registry` resolves child ids to the agents that were absorbed; a
    /// child absent from it is rebuilt one level shallower than the cluster.
    pub fn decompose(
        &mut self,
        cluster: &FractalAgent,
        registry: Option<&BTreeMap<AgentId, FractalAgent>>,
        now: SimTime,
    ) -> DecompositionOutcome {
        if let DecompositionCheck::Blocked(reason) = self.can_decompose(cluster) {
            trace!(cluster = %cluster.id(), %reason, "decomposition blocked");
            return DecompositionOutcome::Blocked {
                cluster: cluster.id(),
                reason,
            };
        }

        let children: Vec<AgentId> = cluster.children().iter().copied().collect();
        let m = children.len();
        let pre_burst_energy = cluster.energy();
        let share = pre_burst_energy / m as f64;

        // Registry constituents keep their own bounds, which may be narrower.
        if let Some(registry) = registry {
            for known in children.iter().filter_map(|id| registry.get(id)) {
                if let Some(reason) = split_block(share, known.energy_bounds()) {
                    trace!(
                        cluster = %cluster.id(),
                        constituent = %known.id(),
                        %reason,
                        "decomposition blocked"
                    );
                    return DecompositionOutcome::Blocked {
                        cluster: cluster.id(),
                        reason,
                    };
                }
            }
        }

        let event_id = EventId(self.events.len() as u64);
        let rotation = self.rng.random_range(0.0..TAU);
        let radius = self.config.scatter_radius;
        let center = cluster.position();
        let child_depth = cluster.depth().saturating_sub(1);

        let mut constituents = Vec::with_capacity(m);
        for (k, child_id) in children.iter().enumerate() {
            let angle = rotation + TAU * k as f64 / m as f64;
            let position = center.offset(radius * angle.cos(), radius * angle.sin(), 0.0);

            let mut constituent = match registry.and_then(|r| r.get(child_id)) {
                Some(known) => known.clone(),
                None => FractalAgent::new(
                    *child_id,
                    cluster.phase() + k as f64 * self.config.phase_spread,
                    share,
                )
                .with_energy_bounds(cluster.energy_bounds())
                .with_depth(child_depth)
                .with_velocity(cluster.velocity())
                .with_coupling(cluster.coupling())
                .born_at(now),
            };
            constituent.set_energy(share);
            constituent.set_position(position);
            constituent.inherit_memory(cluster.memory(), cluster.patterns());
            constituent.set_parent(Some(cluster.id()));
            constituent.set_cluster(None);
            constituent.record_decomposition(event_id);
            constituent.touch(now);
            constituents.push(constituent);
        }

        let mut retired = cluster.clone();
        retired.clear_children();
        retired.record_decomposition(event_id);
        retired.touch(now);

        debug!(
            cluster = %cluster.id(),
            depth = cluster.depth(),
            released = m,
            energy = pre_burst_energy,
            "decomposed cluster"
        );

        self.events.push(DecompositionEvent {
            id: event_id,
            timestamp: now,
            cluster: cluster.id(),
            constituents: children,
            energy_distribution: constituents.iter().map(|c| c.energy()).collect(),
            pre_burst_energy,
            threshold: self.config.critical_energy,
            depth: cluster.depth(),
        });

        DecompositionOutcome::Decomposed {
            cluster: retired,
            constituents,
            event: event_id,
        }
    }

    /// Ids of every agent that would burst right now, in input order.
    pub fn detect_critical_clusters(&self, agents: &[FractalAgent]) -> Vec<AgentId> {
        agents
            .iter()
            .filter(|a| self.can_decompose(a).is_ready())
            .map(|a| a.id())
            .collect()
    }

    /// Decompose every ready agent in `agents`, in input order.
    pub fn decompose_all(
        &mut self,
        agents: &[FractalAgent],
        registry: Option<&BTreeMap<AgentId, FractalAgent>>,
        now: SimTime,
    ) -> Vec<DecompositionOutcome> {
        let mut outcomes = Vec::new();
        for agent in agents {
            if self.can_decompose(agent).is_ready() {
                outcomes.push(self.decompose(agent, registry, now));
            }
        }
        outcomes
    }

    pub fn events(&self) -> &[DecompositionEvent] {
        &self.events
    }

    pub fn event(&self, id: EventId) -> Option<&DecompositionEvent> {
        self.events.get(id.0 as usize)
    }

    pub fn stats(&self) -> DecompositionStats {
        let mut stats = DecompositionStats::default();
        for e in &self.events {
            stats.total_decompositions += 1;
            stats.total_constituents_released += e.constituents.len();
            stats.total_energy_released += e.pre_burst_energy;
            *stats.by_depth.entry(e.depth).or_insert(0) += 1;
        }
        if stats.total_constituents_released > 0 {
            stats.mean_energy_per_constituent =
                stats.total_energy_released / stats.total_constituents_released as f64;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(energy: f64, children: &[u64]) -> FractalAgent {
        FractalAgent::new(AgentId(100), 1.0, energy)
            .with_depth(1)
            .with_position(Position::new(5.0, 5.0, 1.0))
            .with_children(children.iter().map(|&c| AgentId(c)))
    }

    #[test]
    fn starved_cluster_splits_equally() {
        let mut engine = DecompositionEngine::default();
        let c = cluster(0.05, &[1, 2, 3]);
        assert!(engine.can_decompose(&c).is_ready());

        let outcome = engine.decompose(&c, None, 2.0);
        let parts = outcome.constituents();
        assert_eq!(parts.len(), 3);
        for p in parts {
            assert!((p.energy() - 0.05 / 3.0).abs() < 1e-12);
            assert!((p.energy() - 0.0167).abs() < 1e-4);
            assert_eq!(p.depth(), 0);
        }
        let total: f64 = parts.iter().map(|p| p.energy()).sum();
        assert!((total - 0.05).abs() < 1e-12);
    }

    #[test]
    fn base_agent_is_not_a_cluster() {
        let engine = DecompositionEngine::default();
        let base = FractalAgent::new(AgentId(1), 0.0, 0.01);
        let check = engine.can_decompose(&base);
        assert_eq!(
            check,
            DecompositionCheck::Blocked(DecompositionBlock::NotACluster)
        );
        assert_eq!(check.reason().unwrap().to_string(), "not a cluster");
    }

    #[test]
    fn well_fed_cluster_is_above_threshold() {
        let mut engine = DecompositionEngine::default();
        let c = cluster(3.0, &[1, 2]);
        let check = engine.can_decompose(&c);
        assert_eq!(check.reason().unwrap().to_string(), "above threshold");
        let outcome = engine.decompose(&c, None, 0.0);
        assert!(!outcome.is_decomposed());
        assert!(engine.events().is_empty());
    }

    #[test]
    fn registry_constituents_keep_their_state() {
        let mut engine = DecompositionEngine::default();
        let mut c = cluster(0.08, &[1, 2]);
        c.remember(PatternId::from("shared"), 0.9);

        let mut known = FractalAgent::new(AgentId(1), 4.0, 3.0)
            .with_velocity(0.25)
            .with_coupling(Coupling::Repulsive);
        known.set_cluster(Some(AgentId(100)));
        known.remember(PatternId::from("own"), 0.4);
        let registry = BTreeMap::from([(AgentId(1), known)]);

        let outcome = engine.decompose(&c, Some(&registry), 7.0);
        let parts = outcome.constituents();
        let restored = &parts[0];
        assert_eq!(restored.id(), AgentId(1));
        assert_eq!(restored.phase(), 4.0);
        assert_eq!(restored.velocity(), 0.25);
        assert_eq!(restored.coupling(), Coupling::Repulsive);
        assert_eq!(restored.energy(), 0.04);
        assert_eq!(restored.cluster_id(), None);
        assert_eq!(restored.parent_id(), Some(AgentId(100)));
        assert_eq!(restored.memory().len(), 2);

        let rebuilt = &parts[1];
        assert_eq!(rebuilt.id(), AgentId(2));
        assert!((rebuilt.phase() - 1.1).abs() < 1e-12);
        assert_eq!(rebuilt.memory()[&PatternId::from("shared")], 0.9);
        assert_eq!(rebuilt.birth_time(), 7.0);
    }

    #[test]
    fn split_below_the_energy_floor_is_blocked() {
        let mut engine = DecompositionEngine::new(DecompositionConfig {
            critical_energy: 1.0,
            ..Default::default()
        });
        let c = cluster(0.5, &[1, 2]).with_energy_bounds(EnergyBounds::new(0.5, 100.0));
        assert_eq!(c.energy(), 0.5);

        let check = engine.can_decompose(&c);
        assert!(matches!(
            check,
            DecompositionCheck::Blocked(DecompositionBlock::SplitOutOfBounds { share, min, .. })
                if share == 0.25 && min == 0.5
        ));
        assert_eq!(check.reason().unwrap().to_string(), "split out of bounds");

        let outcome = engine.decompose(&c, None, 0.0);
        assert!(!outcome.is_decomposed());
        assert!(outcome.constituents().is_empty());
        assert!(engine.events().is_empty());
    }

    #[test]
    fn tracked_constituent_bounds_block_the_split() {
        let mut engine = DecompositionEngine::default();
        let c = cluster(0.08, &[1, 2]);
        assert!(engine.can_decompose(&c).is_ready());

        let narrow = FractalAgent::new(AgentId(2), 0.0, 1.0)
            .with_energy_bounds(EnergyBounds::new(0.1, 10.0));
        let registry = BTreeMap::from([(AgentId(2), narrow)]);

        match engine.decompose(&c, Some(&registry), 0.0) {
            DecompositionOutcome::Blocked { cluster, reason } => {
                assert_eq!(cluster, AgentId(100));
                assert_eq!(reason.to_string(), "split out of bounds");
            }
            other => panic!("expected a blocked split, got {:?}", other),
        }
        assert!(engine.events().is_empty());
    }

    #[test]
    fn constituents_ring_the_cluster() {
        let mut engine = DecompositionEngine::new(DecompositionConfig {
            scatter_radius: 2.0,
            ..Default::default()
        });
        let c = cluster(0.05, &[1, 2, 3, 4]);
        let outcome = engine.decompose(&c, None, 0.0);
        for p in outcome.constituents() {
            let d = p.position().distance_to(&c.position());
            assert!((d - 2.0).abs() < 1e-9);
            assert_eq!(p.position().z, 1.0);
        }
    }

    #[test]
    fn retired_cluster_and_event_are_linked() {
        let mut engine = DecompositionEngine::default();
        let outcome = engine.decompose(&cluster(0.06, &[1, 2, 3]), None, 1.5);
        let DecompositionOutcome::Decomposed {
            cluster: retired,
            constituents,
            event,
        } = outcome
        else {
            panic!("expected decomposition");
        };
        assert!(retired.children().is_empty());
        assert!(!retired.is_cluster());
        assert_eq!(retired.decomposition_history(), &[event]);
        for c in &constituents {
            assert_eq!(c.decomposition_history(), &[event]);
        }
        let logged = engine.event(event).unwrap();
        assert_eq!(logged.constituents, vec![AgentId(1), AgentId(2), AgentId(3)]);
        assert_eq!(logged.pre_burst_energy, 0.06);
        assert_eq!(logged.threshold, 0.1);
    }

    #[test]
    fn batch_helpers_and_stats() {
        let mut engine = DecompositionEngine::default();
        let agents = vec![
            cluster(0.05, &[1, 2]),
            cluster(5.0, &[3, 4]),
            FractalAgent::new(AgentId(9), 0.0, 0.0),
        ];
        assert_eq!(engine.detect_critical_clusters(&agents), vec![AgentId(100)]);

        let outcomes = engine.decompose_all(&agents, None, 0.0);
        assert_eq!(outcomes.len(), 1);

        let stats = engine.stats();
        assert_eq!(stats.total_decompositions, 1);
        assert_eq!(stats.total_constituents_released, 2);
        assert!((stats.total_energy_released - 0.05).abs() < 1e-12);
        assert!((stats.mean_energy_per_constituent - 0.025).abs() < 1e-12);
        assert_eq!(stats.by_depth[&1], 1);
    }

    #[test]
    fn same_seed_same_scatter() {
        let c = cluster(0.05, &[1, 2, 3]);
        let mut a = DecompositionEngine::default();
        let mut b = DecompositionEngine::default();
        assert_eq!(a.decompose(&c, None, 0.0), b.decompose(&c, None, 0.0));
    }
}
