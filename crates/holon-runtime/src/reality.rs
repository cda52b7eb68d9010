//! Reality sources: where the swarm's snapshots come from.
//!
//! The swarm never measures anything itself. A [`RealitySource`] is injected
//! at construction and asked for a snapshot whenever a spawn is due.

use holon_core::bridge::RealitySnapshot;
use holon_core::error::{HolonError, Result};
use holon_core::types::SimTime;

/// Supplies reality snapshots to the swarm.
pub trait RealitySource {
    /// The snapshot in force at simulation time `time`.
    fn snapshot(&mut self, time: SimTime) -> Result<RealitySnapshot>;
}

/// Always returns the same snapshot.
#[derive(Debug, Clone)]
pub struct FixedReality {
    snapshot: RealitySnapshot,
}

impl FixedReality {
    pub fn new(snapshot: RealitySnapshot) -> Self {
        Self { snapshot }
    }

    pub fn from_percentages(cpu: f64, memory: f64, disk: f64) -> Self {
        Self::new(RealitySnapshot::from_percentages(cpu, memory, disk))
    }
}

impl RealitySource for FixedReality {
    fn snapshot(&mut self, _time: SimTime) -> Result<RealitySnapshot> {
        Ok(self.snapshot.clone())
    }
}

/// Plays back a fixed sequence of snapshots, one per request.
///
/// Once the script runs out it either starts over or keeps repeating the
/// final frame.
#[derive(Debug, Clone)]
pub struct ScriptedReality {
    frames: Vec<RealitySnapshot>,
    cursor: usize,
    looping: bool,
}

impl ScriptedReality {
    pub fn new(frames: Vec<RealitySnapshot>) -> Self {
        Self {
            frames,
            cursor: 0,
            looping: false,
        }
    }

    /// Start over from the first frame after the last one.
    pub fn looping(mut self) -> Self {
        self.looping = true;
        self
    }

    /// Number of frames handed out so far.
    pub fn served(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl RealitySource for ScriptedReality {
    fn snapshot(&mut self, _time: SimTime) -> Result<RealitySnapshot> {
        let n = self.frames.len();
        if n == 0 {
            return Err(HolonError::invalid_input("scripted reality has no frames"));
        }
        let index = if self.looping {
            self.cursor % n
        } else {
            self.cursor.min(n - 1)
        };
        self.cursor += 1;
        Ok(self.frames[index].clone())
    }
}
