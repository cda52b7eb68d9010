//! Swarm builder.
//!
//! Everything the swarm runs with is fixed here, before the first cycle:
//! the configuration, each engine's settings, and the reality source. A
//! built swarm has no setters for any of them.
//!
//! # Example
//!
//! ```rust
//! use holon_runtime::builder::SwarmBuilder;
//! use holon_runtime::reality::FixedReality;
//!
//! let mut swarm = SwarmBuilder::new()
//!     .with_seed(7)
//!     .with_max_population(5)
//!     .with_reality(FixedReality::from_percentages(20.0, 40.0, 60.0))
//!     .build()
//!     .unwrap();
//!
//! swarm.run(10, 0.1).unwrap();
//! assert!(swarm.live_count() <= 5);
//! ```

use crate::config::SwarmConfig;
use crate::reality::{FixedReality, RealitySource};
use crate::swarm::Swarm;
use holon_core::composition::CompositionConfig;
use holon_core::decomposition::DecompositionConfig;
use holon_core::error::Result;
use holon_core::memory::{AssociationConfig, MemoryConfig};
use holon_core::resonance::ResonanceConfig;
use holon_core::types::EnergyBounds;
use std::path::Path;

/// Reading used when no reality source is supplied: every metric at 50%.
pub const IDLE_PERCENT: f64 = 50.0;

/// Builder for creating swarms.
pub struct SwarmBuilder {
    config: SwarmConfig,
    reality: Option<Box<dyn RealitySource>>,
}

impl Default for SwarmBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SwarmBuilder {
    /// Create a new swarm builder with default settings.
    pub fn new() -> Self {
        Self {
            config: SwarmConfig::default(),
            reality: None,
        }
    }

    /// Start from a TOML configuration file.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new().with_config(SwarmConfig::load(path)?))
    }

    /// Replace the whole configuration.
    pub fn with_config(mut self, config: SwarmConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_reality(mut self, reality: impl RealitySource + 'static) -> Self {
        self.reality = Some(Box::new(reality));
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn with_max_population(mut self, max_population: usize) -> Self {
        self.config.spawn.max_population = max_population;
        self
    }

    pub fn with_energy_bounds(mut self, bounds: EnergyBounds) -> Self {
        self.config.dynamics.energy_bounds = bounds;
        self
    }

    pub fn with_coupling_strength(mut self, strength: f64) -> Self {
        self.config.dynamics.coupling_strength = strength;
        self
    }

    pub fn with_resonance(mut self, config: ResonanceConfig) -> Self {
        self.config.resonance = config;
        self
    }

    pub fn with_composition(mut self, config: CompositionConfig) -> Self {
        self.config.composition = config;
        self
    }

    pub fn with_decomposition(mut self, config: DecompositionConfig) -> Self {
        self.config.decomposition = config;
        self
    }

    pub fn with_memory(mut self, config: MemoryConfig) -> Self {
        self.config.memory = config;
        self
    }

    pub fn with_associations(mut self, config: AssociationConfig) -> Self {
        self.config.associations = config;
        self
    }

    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    /// Validate the configuration and build the swarm.
    pub fn build(self) -> Result<Swarm> {
        let reality = self.reality.unwrap_or_else(|| {
            Box::new(FixedReality::from_percentages(
                IDLE_PERCENT,
                IDLE_PERCENT,
                IDLE_PERCENT,
            ))
        });
        Swarm::from_parts(self.config, reality)
    }
}
