//! Holon Core Prelude - convenient imports for common usage.
//!
//! ```rust
//! use holon_core::prelude::*;
//! ```

pub use crate::types::{
    circular_mean, wrap_phase, AgentId, Coupling, EnergyBounds, EventId, IdSequence, PatternId,
    Position, SimTime,
};

pub use crate::agent::{AgentRecord, FractalAgent, MemoryWeight};

pub use crate::bridge::{PhaseState, RealitySnapshot, TranscendentalBridge};

pub use crate::resonance::{MeanField, ResonanceConfig, ResonanceDetector, ResonanceNetwork};

pub use crate::composition::{
    CompositionConfig, CompositionEngine, CompositionEvent, CompositionOutcome,
    CompositionRejection, CompositionStats,
};

pub use crate::decomposition::{
    DecompositionBlock, DecompositionCheck, DecompositionConfig, DecompositionEngine,
    DecompositionEvent, DecompositionOutcome, DecompositionStats,
};

pub use crate::memory::{
    AssociationConfig, AssociativeMemory, HomeostaticScaler, MemoryConfig, MemoryEntry, Pattern,
    PatternEvolution, PatternMemory,
};

pub use crate::error::{ConfigError, HolonError, RealityError, Result};
