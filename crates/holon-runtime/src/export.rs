//! JSON export of swarm state and audit logs.
//!
//! Snapshots and event logs are written as plain `serde_json` documents so
//! external analysis scripts can read them without this crate.

use crate::swarm::{Cycle, Swarm, SwarmEvent, SwarmSnapshot};
use holon_core::agent::AgentRecord;
use holon_core::composition::CompositionEvent;
use holon_core::decomposition::DecompositionEvent;
use holon_core::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Every event the swarm and its engines have logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLog {
    pub compositions: Vec<CompositionEvent>,
    pub decompositions: Vec<DecompositionEvent>,
    pub swarm: Vec<(Cycle, SwarmEvent)>,
}

/// Records of every live agent, id order.
pub fn export_agents(swarm: &Swarm) -> Vec<AgentRecord> {
    let now = swarm.time();
    swarm.agents().values().map(|a| a.to_record(now)).collect()
}

pub fn export_events(swarm: &Swarm) -> EventLog {
    EventLog {
        compositions: swarm.composition_engine().events().to_vec(),
        decompositions: swarm.decomposition_engine().events().to_vec(),
        swarm: swarm.event_history().to_vec(),
    }
}

pub fn snapshot_to_json(snapshot: &SwarmSnapshot) -> Result<String> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

pub fn snapshot_from_json(json: &str) -> Result<SwarmSnapshot> {
    Ok(serde_json::from_str(json)?)
}

pub fn events_to_json(log: &EventLog) -> Result<String> {
    Ok(serde_json::to_string_pretty(log)?)
}

/// Save a snapshot to a JSON file.
pub fn save_snapshot(snapshot: &SwarmSnapshot, path: &Path) -> Result<()> {
    std::fs::write(path, snapshot_to_json(snapshot)?)?;
    Ok(())
}

/// Load a snapshot from a JSON file.
pub fn load_snapshot(path: &Path) -> Result<SwarmSnapshot> {
    let json = std::fs::read_to_string(path)?;
    snapshot_from_json(&json)
}

/// Save the full event log to a JSON file.
pub fn save_events(swarm: &Swarm, path: &Path) -> Result<()> {
    std::fs::write(path, events_to_json(&export_events(swarm))?)?;
    Ok(())
}
