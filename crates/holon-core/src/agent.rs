//! FractalAgent: the mutable entity of the swarm.
//!
//! An agent is a phase oscillator with an energy budget, a position, and two
//! memories (a legacy id -> weight map and a memetic pattern list). Depth 0
//! agents are spawned by the swarm; deeper agents are clusters produced by
//! composition and only ever refer to their constituents by id.

use crate::error::HolonError;
use crate::memory::{self, Pattern};
use crate::resonance::MeanField;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A phase-coupled agent, base or cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct FractalAgent {
    id: AgentId,
    depth: u32,
    energy: f64,
    phase: f64,
    velocity: f64,
    position: Position,
    resonance: f64,
    memory: BTreeMap<PatternId, f64>,
    patterns: Vec<Pattern>,
    birth_time: SimTime,
    last_update: SimTime,
    parent_id: Option<AgentId>,
    children: BTreeSet<AgentId>,
    cluster_id: Option<AgentId>,
    coupling: Coupling,
    energy_bounds: EnergyBounds,
    composition_history: Vec<EventId>,
    decomposition_history: Vec<EventId>,
}

impl FractalAgent {
    /// A depth-0 agent at the origin, born at time zero.
    pub fn new(id: AgentId, phase: f64, energy: f64) -> Self {
        let energy_bounds = EnergyBounds::default();
        Self {
            id,
            depth: 0,
            energy: energy_bounds.clamp(energy),
            phase: wrap_phase(phase),
            velocity: 0.0,
            position: Position::origin(),
            resonance: 0.0,
            memory: BTreeMap::new(),
            patterns: Vec::new(),
            birth_time: 0.0,
            last_update: 0.0,
            parent_id: None,
            children: BTreeSet::new(),
            cluster_id: None,
            coupling: Coupling::Attractive,
            energy_bounds,
            composition_history: Vec::new(),
            decomposition_history: Vec::new(),
        }
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_velocity(mut self, velocity: f64) -> Self {
        self.velocity = if velocity.is_finite() { velocity } else { 0.0 };
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    pub fn with_coupling(mut self, coupling: Coupling) -> Self {
        self.coupling = coupling;
        self
    }

    /// Replace the energy bounds and re-clamp the current energy.
    pub fn with_energy_bounds(mut self, bounds: EnergyBounds) -> Self {
        self.energy_bounds = bounds;
        self.energy = bounds.clamp(self.energy);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = AgentId>) -> Self {
        self.children = children.into_iter().collect();
        self
    }

    pub fn with_memory(mut self, memory: BTreeMap<PatternId, f64>) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_patterns(mut self, patterns: Vec<Pattern>) -> Self {
        self.patterns = patterns;
        self
    }

    /// Stamp birth and last-update time.
    pub fn born_at(mut self, time: SimTime) -> Self {
        self.birth_time = time;
        self.last_update = time;
        self
    }

    // --- accessors ---

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn energy(&self) -> f64 {
        self.energy
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn resonance(&self) -> f64 {
        self.resonance
    }

    pub fn memory(&self) -> &BTreeMap<PatternId, f64> {
        &self.memory
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    pub fn birth_time(&self) -> SimTime {
        self.birth_time
    }

    pub fn last_update(&self) -> SimTime {
        self.last_update
    }

    pub fn parent_id(&self) -> Option<AgentId> {
        self.parent_id
    }

    pub fn children(&self) -> &BTreeSet<AgentId> {
        &self.children
    }

    pub fn cluster_id(&self) -> Option<AgentId> {
        self.cluster_id
    }

    pub fn coupling(&self) -> Coupling {
        self.coupling
    }

    pub fn energy_bounds(&self) -> EnergyBounds {
        self.energy_bounds
    }

    pub fn composition_history(&self) -> &[EventId] {
        &self.composition_history
    }

    pub fn decomposition_history(&self) -> &[EventId] {
        &self.decomposition_history
    }

    /// Time alive as of `now`.
    pub fn age(&self, now: SimTime) -> SimTime {
        (now - self.birth_time).max(0.0)
    }

    /// Whether this agent is a cluster that still knows its constituents.
    pub fn is_cluster(&self) -> bool {
        self.depth >= 1 && !self.children.is_empty()
    }

    /// The strongest entry of the legacy memory map.
    pub fn dominant_pattern(&self) -> Option<(&PatternId, f64)> {
        memory::strongest(&self.memory)
    }

    // --- dynamics ---

    /// Advance the phase by `velocity * delta_time`, wrapped to `[0, 2π)`.
    pub fn update_phase(&mut self, delta_time: f64) {
        if !delta_time.is_finite() {
            return;
        }
        self.phase = wrap_phase(self.phase + self.velocity * delta_time);
    }

    /// Kuramoto step: the natural velocity plus the pull of the mean field.
    ///
    /// `dθ/dt = ω + s·K·r·sin(ψ − θ)` where `s` is the coupling sign.
    pub fn update_phase_coupled(&mut self, delta_time: f64, field: &MeanField, strength: f64) {
        if !delta_time.is_finite() {
            return;
        }
        let pull = self.coupling.sign() * strength * field.magnitude * (field.phase - self.phase).sin();
        let effective = if pull.is_finite() {
            self.velocity + pull
        } else {
            self.velocity
        };
        self.phase = wrap_phase(self.phase + effective * delta_time);
    }

    /// Pay a metabolic cost. Energy never leaves its bounds.
    pub fn metabolize(&mut self, cost: f64) {
        self.set_energy(self.energy - cost);
    }

    pub fn set_energy(&mut self, energy: f64) {
        self.energy = self.energy_bounds.clamp(energy);
    }

    pub fn set_phase(&mut self, phase: f64) {
        self.phase = wrap_phase(phase);
    }

    pub fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    /// Cache the last computed resonance, clamped to `[0, 1]`.
    pub fn set_resonance(&mut self, resonance: f64) {
        self.resonance = if resonance.is_nan() {
            0.0
        } else {
            resonance.clamp(0.0, 1.0)
        };
    }

    pub fn touch(&mut self, now: SimTime) {
        self.last_update = now;
    }

    // --- memory ---

    /// Record a pattern weight, keeping the stronger of old and new.
    pub fn remember(&mut self, id: PatternId, weight: f64) {
        let entry = self.memory.entry(id).or_insert(weight);
        if weight > *entry {
            *entry = weight;
        }
    }

    pub fn memory_mut(&mut self) -> &mut BTreeMap<PatternId, f64> {
        &mut self.memory
    }

    pub fn patterns_mut(&mut self) -> &mut Vec<Pattern> {
        &mut self.patterns
    }

    /// Absorb another memory, max strength wins for shared ids.
    pub fn inherit_memory(&mut self, memory: &BTreeMap<PatternId, f64>, patterns: &[Pattern]) {
        memory::merge_strongest(&mut self.memory, memory);
        memory::merge_patterns(&mut self.patterns, patterns);
    }

    // --- hierarchy links ---

    pub fn set_parent(&mut self, parent: Option<AgentId>) {
        self.parent_id = parent;
    }

    pub fn set_cluster(&mut self, cluster: Option<AgentId>) {
        self.cluster_id = cluster;
    }

    pub fn clear_children(&mut self) {
        self.children.clear();
    }

    pub fn record_composition(&mut self, event: EventId) {
        self.composition_history.push(event);
    }

    pub fn record_decomposition(&mut self, event: EventId) {
        self.decomposition_history.push(event);
    }

    // --- export ---

    /// Serializable view of the agent, with age derived at `now`.
    pub fn to_record(&self, now: SimTime) -> AgentRecord {
        AgentRecord {
            id: self.id,
            depth: self.depth,
            energy: self.energy,
            phase: self.phase,
            velocity: self.velocity,
            position: self.position.to_array(),
            resonance: self.resonance,
            coupling: self.coupling.sign() as i8,
            memory: self
                .memory
                .iter()
                .map(|(pattern, &weight)| MemoryWeight {
                    pattern: pattern.clone(),
                    weight,
                })
                .collect(),
            patterns: self.patterns.clone(),
            birth_time: self.birth_time,
            last_update: self.last_update,
            parent_id: self.parent_id,
            children: self.children.iter().copied().collect(),
            cluster_id: self.cluster_id,
            age: self.age(now),
            energy_bounds: self.energy_bounds,
            composition_history: self.composition_history.clone(),
            decomposition_history: self.decomposition_history.clone(),
        }
    }

    /// Rebuild an agent from its record.
    ///
    /// Fails when the recorded energy bounds are non-finite or inverted.
    pub fn from_record(record: &AgentRecord) -> crate::error::Result<Self> {
        let bounds = record.energy_bounds;
        if !bounds.min.is_finite() || !bounds.max.is_finite() || bounds.min > bounds.max {
            return Err(HolonError::invalid_input(format!(
                "{} has invalid energy bounds [{}, {}]",
                record.id, bounds.min, bounds.max
            )));
        }
        Ok(Self {
            id: record.id,
            depth: record.depth,
            energy: bounds.clamp(record.energy),
            phase: wrap_phase(record.phase),
            velocity: record.velocity,
            position: Position::from(record.position),
            resonance: record.resonance,
            memory: record
                .memory
                .iter()
                .map(|m| (m.pattern.clone(), m.weight))
                .collect(),
            patterns: record.patterns.clone(),
            birth_time: record.birth_time,
            last_update: record.last_update,
            parent_id: record.parent_id,
            children: record.children.iter().copied().collect(),
            cluster_id: record.cluster_id,
            coupling: if record.coupling < 0 {
                Coupling::Repulsive
            } else {
                Coupling::Attractive
            },
            energy_bounds: bounds,
            composition_history: record.composition_history.clone(),
            decomposition_history: record.decomposition_history.clone(),
        })
    }
}

/// One entry of the legacy memory map in exported form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryWeight {
    pub pattern: PatternId,
    pub weight: f64,
}

/// Plain serializable record of an agent, sufficient to rebuild it exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: AgentId,
    pub depth: u32,
    pub energy: f64,
    pub phase: f64,
    pub velocity: f64,
    pub position: [f64; 3],
    pub resonance: f64,
    /// +1 attractive, -1 repulsive.
    pub coupling: i8,
    pub memory: Vec<MemoryWeight>,
    pub patterns: Vec<Pattern>,
    pub birth_time: SimTime,
    pub last_update: SimTime,
    pub parent_id: Option<AgentId>,
    pub children: Vec<AgentId>,
    pub cluster_id: Option<AgentId>,
    /// Derived at export time; ignored on reconstruction.
    pub age: SimTime,
    #[serde(default)]
    pub energy_bounds: EnergyBounds,
    #[serde(default)]
    pub composition_history: Vec<EventId>,
    #[serde(default)]
    pub decomposition_history: Vec<EventId>,
}
