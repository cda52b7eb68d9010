//! Swarm configuration.
//!
//! One TOML document configures everything: spawning, dynamics, and the
//! settings handed to each engine at construction time. Every section and
//! field is optional and falls back to its default.
//!
//! ```toml
//! seed = 7
//!
//! [spawn]
//! max_population = 12
//!
//! [decomposition]
//! critical_energy = 0.2
//! ```

use holon_core::composition::CompositionConfig;
use holon_core::decomposition::DecompositionConfig;
use holon_core::error::{HolonError, Result};
use holon_core::memory::{AssociationConfig, MemoryConfig, MAX_MUTATION_SCALE};
use holon_core::resonance::ResonanceConfig;
use holon_core::types::EnergyBounds;
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};
use std::path::Path;

/// Complete swarm configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmConfig {
    /// Seeds spawn jitter and pattern evolution (default: 42).
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub spawn: SpawnConfig,
    #[serde(default)]
    pub dynamics: DynamicsConfig,
    #[serde(default)]
    pub resonance: ResonanceConfig,
    #[serde(default)]
    pub composition: CompositionConfig,
    #[serde(default)]
    pub decomposition: DecompositionConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub associations: AssociationConfig,
}

/// How new base agents enter the swarm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnConfig {
    /// Spawning stops while the live population is at this size.
    ///
    /// Constituents absorbed into clusters are not counted, so the total
    /// number of tracked agents can exceed this cap.
    #[serde(default = "default_max_population")]
    pub max_population: usize,
    #[serde(default = "default_base_energy")]
    pub base_energy: f64,
    #[serde(default = "default_base_velocity")]
    pub base_velocity: f64,
    /// Half-width of the uniform jitter added to the bridge phase, at most π.
    #[serde(default = "default_phase_jitter")]
    pub phase_jitter: f64,
    /// Half-width of the uniform jitter added to `base_velocity`, at most 2π.
    #[serde(default = "default_velocity_jitter")]
    pub velocity_jitter: f64,
    /// Neighbouring phase ids seeded into a newborn's memory.
    #[serde(default = "default_seed_spread")]
    pub seed_spread: usize,
    /// Strength ratio between successive spread entries.
    #[serde(default = "default_seed_decay")]
    pub seed_decay: f64,
    /// Newborns are placed on a ring of this radius at their phase angle.
    #[serde(default = "default_spawn_radius")]
    pub spawn_radius: f64,
    /// Half-width of the weight and phase perturbation applied to seeded
    /// patterns, within `[0, 1]`.
    #[serde(default = "default_mutation_scale")]
    pub mutation_scale: f64,
}

/// Per-cycle update rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicsConfig {
    /// Kuramoto coupling constant K.
    #[serde(default = "default_coupling_strength")]
    pub coupling_strength: f64,
    /// Energy paid per unit time, multiplied by `depth + 1`.
    #[serde(default = "default_metabolic_cost")]
    pub metabolic_cost: f64,
    /// Sum the memetic pattern weights are scaled back to.
    #[serde(default = "default_homeostatic_target")]
    pub homeostatic_target: f64,
    /// Clusters at this depth are not composed further.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
    /// Strength added to a pooled pattern each time an agent favours it.
    #[serde(default = "default_pool_reinforcement")]
    pub pool_reinforcement: f64,
    /// Link strength added between co-composed members' patterns.
    #[serde(default = "default_association_delta")]
    pub association_delta: f64,
    #[serde(default)]
    pub energy_bounds: EnergyBounds,
}

// Default value functions
fn default_seed() -> u64 { 42 }
fn default_max_population() -> usize { 20 }
fn default_base_energy() -> f64 { 1.0 }
fn default_base_velocity() -> f64 { 0.1 }
fn default_phase_jitter() -> f64 { 0.05 }
fn default_velocity_jitter() -> f64 { 0.01 }
fn default_seed_spread() -> usize { 3 }
fn default_seed_decay() -> f64 { 0.5 }
fn default_spawn_radius() -> f64 { 10.0 }
fn default_mutation_scale() -> f64 { 0.1 }
fn default_coupling_strength() -> f64 { 0.5 }
fn default_metabolic_cost() -> f64 { 0.01 }
fn default_homeostatic_target() -> f64 { 1.0 }
fn default_max_depth() -> u32 { 8 }
fn default_pool_reinforcement() -> f64 { 0.05 }
fn default_association_delta() -> f64 { 0.1 }

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            spawn: SpawnConfig::default(),
            dynamics: DynamicsConfig::default(),
            resonance: ResonanceConfig::default(),
            composition: CompositionConfig::default(),
            decomposition: DecompositionConfig::default(),
            memory: MemoryConfig::default(),
            associations: AssociationConfig::default(),
        }
    }
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            max_population: default_max_population(),
            base_energy: default_base_energy(),
            base_velocity: default_base_velocity(),
            phase_jitter: default_phase_jitter(),
            velocity_jitter: default_velocity_jitter(),
            seed_spread: default_seed_spread(),
            seed_decay: default_seed_decay(),
            spawn_radius: default_spawn_radius(),
            mutation_scale: default_mutation_scale(),
        }
    }
}

impl Default for DynamicsConfig {
    fn default() -> Self {
        Self {
            coupling_strength: default_coupling_strength(),
            metabolic_cost: default_metabolic_cost(),
            homeostatic_target: default_homeostatic_target(),
            max_depth: default_max_depth(),
            pool_reinforcement: default_pool_reinforcement(),
            association_delta: default_association_delta(),
            energy_bounds: EnergyBounds::default(),
        }
    }
}

fn require_finite(field: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(HolonError::invalid_config(field, value.to_string(), "must be finite"))
    }
}

fn require_range(field: &str, value: f64, min: f64, max: f64) -> Result<()> {
    require_finite(field, value)?;
    if value < min || value > max {
        return Err(HolonError::out_of_range(field, min, max, value));
    }
    Ok(())
}

fn require_non_negative(field: &str, value: f64) -> Result<()> {
    require_range(field, value, 0.0, f64::MAX)
}

impl SwarmConfig {
    /// Parse a TOML document. Missing fields take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SwarmConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), self.to_toml_string()?)?;
        Ok(())
    }

    /// Reject values the swarm cannot run with.
    pub fn validate(&self) -> Result<()> {
        let spawn = &self.spawn;
        if spawn.max_population == 0 || spawn.max_population > 1000 {
            return Err(HolonError::out_of_range(
                "spawn.max_population",
                1.0,
                1000.0,
                spawn.max_population as f64,
            ));
        }
        require_finite("spawn.base_velocity", spawn.base_velocity)?;
        require_range("spawn.phase_jitter", spawn.phase_jitter, 0.0, PI)?;
        require_range("spawn.velocity_jitter", spawn.velocity_jitter, 0.0, TAU)?;
        require_range("spawn.seed_decay", spawn.seed_decay, 0.0, 1.0)?;
        require_non_negative("spawn.spawn_radius", spawn.spawn_radius)?;
        require_range("spawn.mutation_scale", spawn.mutation_scale, 0.0, MAX_MUTATION_SCALE)?;

        let dynamics = &self.dynamics;
        let bounds = dynamics.energy_bounds;
        require_finite("dynamics.energy_bounds.min", bounds.min)?;
        require_finite("dynamics.energy_bounds.max", bounds.max)?;
        if bounds.min > bounds.max {
            return Err(HolonError::invalid_config(
                "dynamics.energy_bounds",
                format!("[{}, {}]", bounds.min, bounds.max),
                "min exceeds max",
            ));
        }
        require_range("spawn.base_energy", spawn.base_energy, bounds.min, bounds.max)?;
        require_finite("dynamics.coupling_strength", dynamics.coupling_strength)?;
        require_non_negative("dynamics.metabolic_cost", dynamics.metabolic_cost)?;
        require_range("dynamics.homeostatic_target", dynamics.homeostatic_target, 0.0, f64::MAX)?;
        require_non_negative("dynamics.pool_reinforcement", dynamics.pool_reinforcement)?;
        require_non_negative("dynamics.association_delta", dynamics.association_delta)?;

        let resonance = &self.resonance;
        require_range("resonance.threshold", resonance.threshold, -1.0, 1.0)?;
        if resonance.min_cluster_size == 0 || resonance.min_cluster_size > resonance.max_cluster_size {
            return Err(HolonError::invalid_config(
                "resonance.min_cluster_size",
                resonance.min_cluster_size.to_string(),
                "must be at least 1 and no larger than max_cluster_size",
            ));
        }

        let composition = &self.composition;
        if composition.min_members == 0 {
            return Err(HolonError::invalid_config(
                "composition.min_members",
                "0",
                "a cluster needs at least one member",
            ));
        }
        require_finite("composition.min_total_energy", composition.min_total_energy)?;
        require_range("composition.min_coherence", composition.min_coherence, 0.0, 1.0)?;

        let decomposition = &self.decomposition;
        require_non_negative("decomposition.critical_energy", decomposition.critical_energy)?;
        require_non_negative("decomposition.scatter_radius", decomposition.scatter_radius)?;
        require_finite("decomposition.phase_spread", decomposition.phase_spread)?;

        require_non_negative("memory.decay_rate", self.memory.decay_rate)?;
        require_range("memory.min_strength", self.memory.min_strength, 0.0, 1.0)?;
        require_non_negative("associations.decay_rate", self.associations.decay_rate)?;
        if !(self.associations.max_weight.is_finite() && self.associations.max_weight > 0.0) {
            return Err(HolonError::invalid_config(
                "associations.max_weight",
                self.associations.max_weight.to_string(),
                "must be positive",
            ));
        }

        Ok(())
    }
}
