//! Reality-to-phase transform.
//!
//! The bridge is the only way outside measurements enter the simulation. It
//! maps three named percentages onto three phase angles using fixed
//! irrational frequency multipliers (1, φ, e) so that small differences in
//! one metric do not line up with the others.

use crate::error::{RealityError, Result};
use crate::types::{circular_mean, wrap_phase};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::{E, TAU};

pub const CPU_PERCENT: &str = "cpu_percent";
pub const MEMORY_PERCENT: &str = "memory_percent";
pub const DISK_PERCENT: &str = "disk_percent";

/// Golden ratio.
pub const PHI: f64 = 1.618_033_988_749_895;

/// Named metric values, typically percentages in `[0, 100]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RealitySnapshot {
    metrics: BTreeMap<String, f64>,
}

impl RealitySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot with the three metrics the bridge requires.
    pub fn from_percentages(cpu: f64, memory: f64, disk: f64) -> Self {
        Self::new()
            .with(CPU_PERCENT, cpu)
            .with(MEMORY_PERCENT, memory)
            .with(DISK_PERCENT, disk)
    }

    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.metrics.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    pub fn metrics(&self) -> &BTreeMap<String, f64> {
        &self.metrics
    }

    /// A present, finite metric, or the reason it cannot be used.
    pub fn require(&self, name: &str) -> std::result::Result<f64, RealityError> {
        match self.metrics.get(name) {
            None => Err(RealityError::MissingMetric(name.to_string())),
            Some(&value) if !value.is_finite() => Err(RealityError::NonFiniteMetric {
                name: name.to_string(),
                value,
            }),
            Some(&value) => Ok(value),
        }
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for RealitySnapshot {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self {
            metrics: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Three phase angles derived from a snapshot, plus its overall intensity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseState {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    /// RMS of the normalized inputs; 1.0 when every metric reads 100%.
    pub magnitude: f64,
}

impl PhaseState {
    pub fn phases(&self) -> [f64; 3] {
        [self.alpha, self.beta, self.gamma]
    }

    /// Circular mean of the three phases.
    pub fn attractor(&self) -> f64 {
        circular_mean(self.phases()).0
    }
}

/// Stateless snapshot -> [`PhaseState`] transform.
#[derive(Debug, Clone, Copy, Default)]
pub struct TranscendentalBridge;

impl TranscendentalBridge {
    pub fn new() -> Self {
        Self
    }

    /// Map a snapshot onto phase space.
    ///
    /// Values outside `[0, 100]` are mapped like any other; only missing or
    /// non-finite metrics are rejected.
    pub fn reality_to_phase(&self, snapshot: &RealitySnapshot) -> Result<PhaseState> {
        let cpu = snapshot.require(CPU_PERCENT)? / 100.0;
        let memory = snapshot.require(MEMORY_PERCENT)? / 100.0;
        let disk = snapshot.require(DISK_PERCENT)? / 100.0;

        let magnitude = ((cpu * cpu + memory * memory + disk * disk) / 3.0).sqrt();

        Ok(PhaseState {
            alpha: wrap_phase(TAU * cpu),
            beta: wrap_phase(TAU * PHI * memory),
            gamma: wrap_phase(TAU * E * disk),
            magnitude: if magnitude.is_finite() { magnitude } else { 0.0 },
        })
    }
}
