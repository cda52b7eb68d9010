//! Composition: merging a resonant group into one higher-depth agent.
//!
//! The engine is a pure transformer over the members it is handed: it never
//! touches the caller's population. On success it returns the new cluster
//! agent; the caller is responsible for retiring the members.
//!
//! Failed preconditions are ordinary outcomes, not errors. They are checked
//! in a fixed order so the reported reason is deterministic.

use crate::agent::FractalAgent;
use crate::memory;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, trace};

/// Phase-mean vectors shorter than this fall back to the arithmetic mean.
const DEGENERATE_MEAN: f64 = 1e-12;

/// Configuration for the composition engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionConfig {
    /// Fewest members a cluster may have (default: 2).
    pub min_members: usize,
    /// Combined energy a group needs to compose (default: 0.0).
    pub min_total_energy: f64,
    /// Group coherence required to compose (default: 0.8).
    pub min_coherence: f64,
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            min_members: 2,
            min_total_energy: 0.0,
            min_coherence: 0.8,
        }
    }
}

/// Why a group was not composed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CompositionRejection {
    TooFewMembers { found: usize, required: usize },
    DuplicateMember(AgentId),
    MixedDepths,
    AlreadyClustered { member: AgentId, cluster: AgentId },
    NotResonant { coherence: f64, required: f64 },
    InsufficientEnergy { total: f64, required: f64 },
    ExceedsEnergyBound { total: f64, max: f64 },
    BelowEnergyBound { total: f64, min: f64 },
}

impl CompositionRejection {
    /// Short name of the rejection, without its numbers.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TooFewMembers { .. } => "too few members",
            Self::DuplicateMember(_) => "duplicate member",
            Self::MixedDepths => "mixed depths",
            Self::AlreadyClustered { .. } => "already clustered",
            Self::NotResonant { .. } => "non-resonant",
            Self::InsufficientEnergy { .. } => "insufficient energy",
            Self::ExceedsEnergyBound { .. } => "exceeds energy bound",
            Self::BelowEnergyBound { .. } => "below energy bound",
        }
    }
}

impl fmt::Display for CompositionRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewMembers { found, required } => {
                write!(f, "too few members ({} < {})", found, required)
            }
            Self::DuplicateMember(id) => write!(f, "duplicate member {}", id),
            Self::MixedDepths => write!(f, "mixed depths"),
            Self::AlreadyClustered { member, cluster } => {
                write!(f, "{} already belongs to {}", member, cluster)
            }
            Self::NotResonant { coherence, required } => {
                write!(f, "non-resonant (coherence {:.4} < {:.4})", coherence, required)
            }
            Self::InsufficientEnergy { total, required } => {
                write!(f, "insufficient energy ({:.4} < {:.4})", total, required)
            }
            Self::ExceedsEnergyBound { total, max } => {
                write!(f, "energy {:.4} exceeds bound {:.4}", total, max)
            }
            Self::BelowEnergyBound { total, min } => {
                write!(f, "energy {:.4} below bound {:.4}", total, min)
            }
        }
    }
}

/// Result of a composition attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum CompositionOutcome {
    Composed {
        cluster: FractalAgent,
        event: EventId,
    },
    NotComposed {
        reason: CompositionRejection,
    },
}

impl CompositionOutcome {
    pub fn is_composed(&self) -> bool {
        matches!(self, CompositionOutcome::Composed { .. })
    }

    pub fn cluster(&self) -> Option<&FractalAgent> {
        match self {
            CompositionOutcome::Composed { cluster, .. } => Some(cluster),
            CompositionOutcome::NotComposed { .. } => None,
        }
    }

    pub fn rejection(&self) -> Option<&CompositionRejection> {
        match self {
            CompositionOutcome::Composed { .. } => None,
            CompositionOutcome::NotComposed { reason } => Some(reason),
        }
    }
}

/// Audit record of one successful composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionEvent {
    pub id: EventId,
    pub timestamp: SimTime,
    pub members: Vec<AgentId>,
    pub member_energies: Vec<f64>,
    pub total_energy: f64,
    pub result: AgentId,
    /// Depth of the resulting cluster.
    pub depth: u32,
    pub coherence: f64,
    /// `min_total_energy` in force when the event happened.
    pub energy_threshold: f64,
}

/// Aggregate view of the composition log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositionStats {
    pub total_compositions: usize,
    pub total_members_absorbed: usize,
    pub total_energy_composed: f64,
    pub mean_members: f64,
    /// Resulting depth -> count.
    pub by_depth: BTreeMap<u32, usize>,
}

/// Turns resonant groups into cluster agents.
#[derive(Debug, Clone, Default)]
pub struct CompositionEngine {
    config: CompositionConfig,
    events: Vec<CompositionEvent>,
}

impl CompositionEngine {
    pub fn new(config: CompositionConfig) -> Self {
        Self {
            config,
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &CompositionConfig {
        &self.config
    }

    /// Check every precondition without composing.
    pub fn check(&self, members: &[FractalAgent]) -> Result<(), CompositionRejection> {
        if members.len() < self.config.min_members.max(1) {
            return Err(CompositionRejection::TooFewMembers {
                found: members.len(),
                required: self.config.min_members.max(1),
            });
        }

        let mut seen = BTreeSet::new();
        for m in members {
            if !seen.insert(m.id()) {
                return Err(CompositionRejection::DuplicateMember(m.id()));
            }
        }

        let depth = members[0].depth();
        if members.iter().any(|m| m.depth() != depth) {
            return Err(CompositionRejection::MixedDepths);
        }

        if let Some((member, cluster)) = members
            .iter()
            .find_map(|m| m.cluster_id().map(|c| (m.id(), c)))
        {
            return Err(CompositionRejection::AlreadyClustered { member, cluster });
        }

        let (_, coherence) = circular_mean(members.iter().map(|m| m.phase()));
        if coherence < self.config.min_coherence {
            return Err(CompositionRejection::NotResonant {
                coherence,
                required: self.config.min_coherence,
            });
        }

        let total: f64 = members.iter().map(|m| m.energy()).sum();
        if total < self.config.min_total_energy {
            return Err(CompositionRejection::InsufficientEnergy {
                total,
                required: self.config.min_total_energy,
            });
        }

        let bounds = members[0].energy_bounds();
        if total > bounds.max {
            return Err(CompositionRejection::ExceedsEnergyBound {
                total,
                max: bounds.max,
            });
        }
        if total < bounds.min {
            return Err(CompositionRejection::BelowEnergyBound {
                total,
                min: bounds.min,
            });
        }

        Ok(())
    }

    /// Merge `members` into a new cluster agent one level deeper.
    ///
    /// The cluster id is drawn from `ids` only when composition succeeds.
    pub fn compose(
        &mut self,
        members: &[FractalAgent],
        ids: &mut IdSequence,
        now: SimTime,
    ) -> CompositionOutcome {
        if let Err(reason) = self.check(members) {
            trace!(members = members.len(), %reason, "composition rejected");
            return CompositionOutcome::NotComposed { reason };
        }

        let n = members.len() as f64;
        let depth = members[0].depth() + 1;
        let bounds = members[0].energy_bounds();
        let member_energies: Vec<f64> = members.iter().map(|m| m.energy()).collect();
        let total_energy: f64 = member_energies.iter().sum();

        let (mean_phase, coherence) = circular_mean(members.iter().map(|m| m.phase()));
        let phase = if coherence < DEGENERATE_MEAN {
            members.iter().map(|m| m.phase()).sum::<f64>() / n
        } else {
            mean_phase
        };
        let velocity = members.iter().map(|m| m.velocity()).sum::<f64>() / n;
        let positions: Vec<Position> = members.iter().map(|m| m.position()).collect();
        let couplings: Vec<Coupling> = members.iter().map(|m| m.coupling()).collect();

        let mut merged_memory = BTreeMap::new();
        let mut merged_patterns = Vec::new();
        for m in members {
            memory::merge_strongest(&mut merged_memory, m.memory());
            memory::merge_patterns(&mut merged_patterns, m.patterns());
        }

        let id = ids.next_id();
        let event_id = EventId(self.events.len() as u64);
        let member_ids: Vec<AgentId> = members.iter().map(|m| m.id()).collect();

        let mut cluster = FractalAgent::new(id, phase, total_energy)
            .with_energy_bounds(bounds)
            .with_depth(depth)
            .with_velocity(velocity)
            .with_position(Position::centroid(&positions))
            .with_coupling(Coupling::majority(&couplings))
            .with_children(member_ids.iter().copied())
            .with_memory(merged_memory)
            .with_patterns(merged_patterns)
            .born_at(now);
        // `new` clamps to the default bounds; the sum must survive wider ones.
        cluster.set_energy(total_energy);
        cluster.set_resonance(coherence);
        cluster.record_composition(event_id);

        debug!(
            cluster = %id,
            depth,
            members = member_ids.len(),
            energy = total_energy,
            coherence,
            "composed cluster"
        );

        self.events.push(CompositionEvent {
            id: event_id,
            timestamp: now,
            members: member_ids,
            member_energies,
            total_energy,
            result: id,
            depth,
            coherence,
            energy_threshold: self.config.min_total_energy,
        });

        CompositionOutcome::Composed {
            cluster,
            event: event_id,
        }
    }

    pub fn events(&self) -> &[CompositionEvent] {
        &self.events
    }

    pub fn event(&self, id: EventId) -> Option<&CompositionEvent> {
        self.events.get(id.0 as usize)
    }

    pub fn stats(&self) -> CompositionStats {
        let mut stats = CompositionStats::default();
        for e in &self.events {
            stats.total_compositions += 1;
            stats.total_members_absorbed += e.members.len();
            stats.total_energy_composed += e.total_energy;
            *stats.by_depth.entry(e.depth).or_insert(0) += 1;
        }
        if stats.total_compositions > 0 {
            stats.mean_members =
                stats.total_members_absorbed as f64 / stats.total_compositions as f64;
        }
        stats
    }
}
