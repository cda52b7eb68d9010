//! Holon Runtime Prelude - convenient imports for common usage.
//!
//! ```rust
//! use holon_runtime::prelude::*;
//! ```

// Re-export swarm
pub use crate::swarm::{Cycle, CycleReport, Swarm, SwarmEvent, SwarmSnapshot, SwarmStats};

// Re-export swarm builder
pub use crate::builder::SwarmBuilder;

// Re-export configuration
pub use crate::config::{DynamicsConfig, SpawnConfig, SwarmConfig};

// Re-export reality sources
pub use crate::reality::{FixedReality, RealitySource, ScriptedReality};

// Re-export metrics
pub use crate::metrics::{LifecycleMetrics, MemoryMetrics, PopulationMetrics, SwarmMetrics, Trajectory};

// Re-export export helpers
pub use crate::export::{load_snapshot, save_snapshot, EventLog};

// Re-export from core
pub use holon_core::prelude::*;
