//! # Holon Runtime
//!
//! Swarm orchestration, configuration and export.
//!
//! The runtime owns the population. It spawns agents from reality
//! snapshots, runs the cycle loop that drives the core engines, and turns
//! the result into statistics and JSON for external analysis.

pub mod builder;
pub mod config;
pub mod export;
pub mod metrics;
pub mod prelude;
pub mod reality;
pub mod swarm;
