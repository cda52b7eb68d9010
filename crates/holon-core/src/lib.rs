//! # Holon Core
//!
//! Core types and engines for a deterministic swarm of phase-coupled agents
//! that compose into higher-depth clusters and burst back apart when starved.
//!
//! - **agent** - [`FractalAgent`](agent::FractalAgent), the phase oscillator with energy, depth and memory
//! - **bridge** - maps a reality snapshot onto three phase angles
//! - **resonance** - phase alignment, resonance graph, clusters, order parameter
//! - **composition** - merges resonant groups into one cluster agent
//! - **decomposition** - splits critical-energy clusters into constituents
//! - **memory** - pattern store, evolution, associations and homeostasis
//!
//! ## Quick Start
//!
//! ```rust
//! use holon_core::prelude::*;
//!
//! let a = FractalAgent::new(AgentId(1), 0.0, 1.0);
//! let b = FractalAgent::new(AgentId(2), 0.0, 2.0);
//!
//! let detector = ResonanceDetector::default();
//! assert_eq!(detector.resonance(&a, &b), 1.0);
//!
//! let mut ids = IdSequence::starting_at(3);
//! let mut engine = CompositionEngine::default();
//! let outcome = engine.compose(&[a, b], &mut ids, 0.0);
//! assert_eq!(outcome.cluster().map(|c| c.energy()), Some(3.0));
//! ```

pub mod agent;
pub mod bridge;
pub mod composition;
pub mod decomposition;
pub mod error;
pub mod memory;
pub mod prelude;
pub mod resonance;
pub mod types;
