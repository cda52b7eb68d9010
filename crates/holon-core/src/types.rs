//! Shared types used across the Holon engines and crates.

use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::fmt;

/// Simulation time, advanced by the `delta_time` of every cycle.
pub type SimTime = f64;

/// Unique identifier for an agent in the swarm.
///
/// Ids are allocated sequentially by an [`IdSequence`] so that two runs with
/// the same inputs hand out the same ids in the same order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u64);

impl AgentId {
    /// Deterministic id (for tests and reconstruction).
    pub fn from_seed(seed: u64) -> Self {
        Self(seed)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent-{}", self.0)
    }
}

/// Monotonic allocator for [`AgentId`]s.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdSequence {
    next: u64,
}

impl IdSequence {
    pub fn new() -> Self {
        Self { next: 0 }
    }

    /// Start allocating at `first`.
    pub fn starting_at(first: u64) -> Self {
        Self { next: first }
    }

    pub fn next_id(&mut self) -> AgentId {
        let id = AgentId(self.next);
        self.next += 1;
        id
    }

    /// The id the next call to [`IdSequence::next_id`] will return.
    pub fn peek(&self) -> AgentId {
        AgentId(self.next)
    }

    /// Make sure ids already in use are never handed out again.
    pub fn reserve_past(&mut self, id: AgentId) {
        if id.0 >= self.next {
            self.next = id.0 + 1;
        }
    }
}

/// Identifier of a composition or decomposition event in an engine log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

/// Identifier of a pattern, either numeric (quantized phase) or named.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatternId {
    Numeric(u64),
    Named(String),
}

impl PatternId {
    /// Milliradian resolution used when turning a phase into a pattern id.
    pub const PHASE_RESOLUTION: f64 = 1000.0;

    /// Quantize a phase angle into a numeric pattern id.
    pub fn from_phase(phase: f64) -> Self {
        let wrapped = wrap_phase(phase);
        let bucket = (wrapped * Self::PHASE_RESOLUTION).round() as u64;
        // TAU itself rounds into the bucket past the last valid one.
        let buckets = (TAU * Self::PHASE_RESOLUTION).round() as u64;
        PatternId::Numeric(bucket % buckets)
    }

    pub fn named(name: impl Into<String>) -> Self {
        PatternId::Named(name.into())
    }

    /// The phase a numeric id stands for, if it is one.
    pub fn as_phase(&self) -> Option<f64> {
        match self {
            PatternId::Numeric(bucket) => Some(*bucket as f64 / Self::PHASE_RESOLUTION),
            PatternId::Named(_) => None,
        }
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternId::Numeric(n) => write!(f, "#{}", n),
            PatternId::Named(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for PatternId {
    fn from(s: &str) -> Self {
        PatternId::Named(s.to_string())
    }
}

impl From<String> for PatternId {
    fn from(s: String) -> Self {
        PatternId::Named(s)
    }
}

impl From<u64> for PatternId {
    fn from(n: u64) -> Self {
        PatternId::Numeric(n)
    }
}

/// A position in the swarm's 3D field.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn origin() -> Self {
        Self::default()
    }

    pub fn distance_to(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2))
            .sqrt()
    }

    pub fn offset(&self, dx: f64, dy: f64, dz: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Arithmetic centroid. Returns the origin for an empty set.
    pub fn centroid<'a>(positions: impl IntoIterator<Item = &'a Position>) -> Self {
        let mut sum = Position::origin();
        let mut n = 0usize;
        for p in positions {
            sum.x += p.x;
            sum.y += p.y;
            sum.z += p.z;
            n += 1;
        }
        if n == 0 {
            return sum;
        }
        let n = n as f64;
        Position::new(sum.x / n, sum.y / n, sum.z / n)
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f64; 3]> for Position {
    fn from(v: [f64; 3]) -> Self {
        Position::new(v[0], v[1], v[2])
    }
}

/// Coupling sign used by the phase-update rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Coupling {
    /// +1: pulled toward the mean field.
    #[default]
    Attractive,
    /// -1: pushed away from the mean field.
    Repulsive,
}

impl Coupling {
    pub fn sign(&self) -> f64 {
        match self {
            Coupling::Attractive => 1.0,
            Coupling::Repulsive => -1.0,
        }
    }

    /// Majority vote over a set of signs; ties resolve to attractive.
    pub fn majority<'a>(couplings: impl IntoIterator<Item = &'a Coupling>) -> Self {
        let total: f64 = couplings.into_iter().map(|c| c.sign()).sum();
        if total < 0.0 {
            Coupling::Repulsive
        } else {
            Coupling::Attractive
        }
    }
}

/// Inclusive bounds an agent's energy is clamped to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyBounds {
    pub min: f64,
    pub max: f64,
}

impl EnergyBounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Clamp into the bounds. NaN collapses to the lower bound; inverted
    /// bounds collapse to the upper one.
    pub fn clamp(&self, energy: f64) -> f64 {
        if energy.is_nan() {
            return self.min;
        }
        energy.max(self.min).min(self.max)
    }

    pub fn contains(&self, energy: f64) -> bool {
        energy >= self.min && energy <= self.max
    }
}

impl Default for EnergyBounds {
    fn default() -> Self {
        Self { min: 0.0, max: 10_000.0 }
    }
}

/// Wrap an angle into `[0, 2π)`. Non-finite input maps to 0.
pub fn wrap_phase(phase: f64) -> f64 {
    if !phase.is_finite() {
        return 0.0;
    }
    let wrapped = phase.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs.
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Circular mean of a set of angles and the length of the mean unit vector.
///
/// Returns `(mean_phase, magnitude)`; an empty input yields `(0.0, 0.0)`.
pub fn circular_mean(phases: impl IntoIterator<Item = f64>) -> (f64, f64) {
    let mut sin_sum = 0.0;
    let mut cos_sum = 0.0;
    let mut n = 0usize;
    for p in phases {
        sin_sum += p.sin();
        cos_sum += p.cos();
        n += 1;
    }
    if n == 0 {
        return (0.0, 0.0);
    }
    let n = n as f64;
    let (s, c) = (sin_sum / n, cos_sum / n);
    let magnitude = (s * s + c * c).sqrt().min(1.0);
    (wrap_phase(s.atan2(c)), magnitude)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_phase_stays_in_range() {
        for raw in [-100.0, -TAU, -1e-18, 0.0, 1.0, TAU, 7.5 * TAU, 1e9] {
            let w = wrap_phase(raw);
            assert!((0.0..TAU).contains(&w), "{} wrapped to {}", raw, w);
        }
        assert_eq!(wrap_phase(f64::NAN), 0.0);
        assert_eq!(wrap_phase(f64::INFINITY), 0.0);
    }

    #[test]
    fn energy_clamp_tolerates_inverted_bounds() {
        let bounds = EnergyBounds::new(0.0, 5.0);
        assert_eq!(bounds.clamp(-1.0), 0.0);
        assert_eq!(bounds.clamp(7.0), 5.0);
        assert_eq!(bounds.clamp(f64::NAN), 0.0);

        let inverted = EnergyBounds::new(5.0, 1.0);
        assert_eq!(inverted.clamp(3.0), 1.0);
        assert_eq!(inverted.clamp(-10.0), 1.0);
        assert!(!inverted.contains(3.0));
    }

    #[test]
    fn id_sequence_is_monotonic() {
        let mut ids = IdSequence::new();
        assert_eq!(ids.next_id(), AgentId(0));
        assert_eq!(ids.next_id(), AgentId(1));
        ids.reserve_past(AgentId(10));
        assert_eq!(ids.next_id(), AgentId(11));
        ids.reserve_past(AgentId(3));
        assert_eq!(ids.peek(), AgentId(12));
    }

    #[test]
    fn phase_pattern_ids_quantize() {
        assert_eq!(PatternId::from_phase(1.2344), PatternId::Numeric(1234));
        assert_eq!(PatternId::from_phase(TAU - 1e-6), PatternId::Numeric(0));
        assert_eq!(PatternId::from_phase(-0.001), PatternId::from_phase(TAU - 0.001));
        assert_eq!(PatternId::Numeric(1500).as_phase(), Some(1.5));
    }

    #[test]
    fn centroid_of_positions() {
        let ps = [Position::new(0.0, 0.0, 0.0), Position::new(2.0, 4.0, -2.0)];
        assert_eq!(Position::centroid(ps.iter()), Position::new(1.0, 2.0, -1.0));
        assert_eq!(Position::centroid(std::iter::empty()), Position::origin());
    }

    #[test]
    fn coupling_majority_ties_attract() {
        let set = [Coupling::Attractive, Coupling::Repulsive];
        assert_eq!(Coupling::majority(set.iter()), Coupling::Attractive);
        let set = [Coupling::Repulsive, Coupling::Repulsive, Coupling::Attractive];
        assert_eq!(Coupling::majority(set.iter()), Coupling::Repulsive);
    }

    #[test]
    fn circular_mean_handles_wraparound() {
        let (mean, r) = circular_mean([0.1, TAU - 0.1]);
        assert!(mean < 1e-9 || (TAU - mean) < 1e-9);
        assert!(r > 0.99);
        assert_eq!(circular_mean(std::iter::empty()), (0.0, 0.0));
    }

    #[test]
    fn energy_bounds_clamp() {
        let b = EnergyBounds::default();
        assert_eq!(b.clamp(-1.0), 0.0);
        assert_eq!(b.clamp(20_000.0), 10_000.0);
        assert_eq!(b.clamp(f64::NAN), 0.0);
        assert!(b.contains(5.0));
    }
}
