//! # Holon
//!
//! Deterministic composition and decomposition dynamics among phase-coupled
//! agents.
//!
//! Agents are phase oscillators with an energy budget. Agents whose phases
//! align merge into a cluster one level deeper; a cluster that runs out of
//! energy bursts back into its constituents, which carry the cluster's memory
//! with them. The only outside input is a reality snapshot of named
//! percentages, mapped onto phase space by the bridge.
//!
//! ## Quick Start
//!
//! ```rust
//! use holon::prelude::*;
//!
//! let mut swarm = SwarmBuilder::new()
//!     .with_seed(42)
//!     .with_max_population(8)
//!     .with_reality(FixedReality::from_percentages(35.0, 60.0, 20.0))
//!     .build()
//!     .unwrap();
//!
//! for report in swarm.run(20, 0.1).unwrap() {
//!     println!(
//!         "cycle {}: {} live, {} absorbed, coherence {:.3}",
//!         report.cycle, report.live, report.absorbed, report.coherence
//!     );
//! }
//!
//! let stats = swarm.stats();
//! assert_eq!(stats.cycle, 20);
//! ```
//!
//! ## Architecture
//!
//! Holon is organized into two crates behind this facade:
//!
//! - [`holon_core`] - Agents, the reality bridge, resonance detection, the
//!   composition and decomposition engines, and the pattern memory suite
//! - [`holon_runtime`] - The swarm cycle loop, configuration, reality sources,
//!   metrics and JSON export
//!
//! ## The Cycle
//!
//! | Step | Component | What It Does |
//! |------|-----------|--------------|
//! | Spawn | Bridge | Seeds a base agent from the current snapshot |
//! | Evolve | FractalAgent | Coupled phase step, metabolic cost |
//! | Detect | ResonanceDetector | Finds mutually resonant groups per depth |
//! | Compose | CompositionEngine | Merges groups into deeper clusters |
//! | Decompose | DecompositionEngine | Bursts starved clusters |
//! | Record | PatternMemory | Folds dominant patterns into the global pool |
//!
//! ## Configuration
//!
//! ```rust,ignore
//! use holon::prelude::*;
//!
//! let config = SwarmConfig::load("holon.toml")?;
//! let swarm = SwarmBuilder::new()
//!     .with_config(config)
//!     .with_reality(ScriptedReality::new(frames).looping())
//!     .build()?;
//! ```

// Re-export all subcrates
pub use holon_core as core;
pub use holon_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust
/// use holon::prelude::*;
/// ```
pub mod prelude {
    pub use holon_runtime::prelude::*;
}
