//! Strength-based pattern store with use-driven decay.
//!
//! Every entry remembers the strength it had when it was last used (its
//! anchor). Decay is a function of the time elapsed since that use, so the
//! result does not depend on how finely the caller slices `decay` calls.

use crate::types::{PatternId, SimTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tunables for a [`PatternMemory`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Exponential decay rate per unit of time since last use (default: 0.05).
    pub decay_rate: f64,
    /// Entries whose strength falls below this are forgotten (default: 0.01).
    pub min_strength: f64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            decay_rate: 0.05,
            min_strength: 0.01,
        }
    }
}

/// A single remembered pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: PatternId,
    /// Current strength in `[0, 1]`.
    pub strength: f64,
    /// Strength at the moment of last use; decay starts from here.
    anchor: f64,
    pub created_at: SimTime,
    pub last_used: SimTime,
    pub use_count: u64,
    pub success_count: u64,
    pub success_rate: f64,
}

impl MemoryEntry {
    fn new(id: PatternId, strength: f64, now: SimTime) -> Self {
        Self {
            id,
            strength,
            anchor: strength,
            created_at: now,
            last_used: now,
            use_count: 0,
            success_count: 0,
            success_rate: 0.0,
        }
    }

    fn touch(&mut self, strength: f64, now: SimTime) {
        self.strength = strength;
        self.anchor = strength;
        self.last_used = now;
    }
}

/// Pattern store keyed by [`PatternId`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatternMemory {
    #[serde(with = "entry_list")]
    entries: BTreeMap<PatternId, MemoryEntry>,
    now: SimTime,
    config: MemoryConfig,
}

// Serialized as a list: numeric pattern ids do not survive as JSON object keys.
mod entry_list {
    use super::MemoryEntry;
    use crate::types::PatternId;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(
        entries: &BTreeMap<PatternId, MemoryEntry>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let list: Vec<&MemoryEntry> = entries.values().collect();
        list.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<PatternId, MemoryEntry>, D::Error> {
        let list = Vec::<MemoryEntry>::deserialize(deserializer)?;
        Ok(list.into_iter().map(|e| (e.id.clone(), e)).collect())
    }
}

fn clamp_unit(strength: f64) -> f64 {
    if strength.is_nan() {
        0.0
    } else {
        strength.clamp(0.0, 1.0)
    }
}

impl PatternMemory {
    pub fn new() -> Self {
        Self::with_config(MemoryConfig::default())
    }

    pub fn with_config(config: MemoryConfig) -> Self {
        Self {
            entries: BTreeMap::new(),
            now: 0.0,
            config,
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// The store's own clock, advanced by [`PatternMemory::decay`].
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Insert or overwrite a pattern. Strength is clamped to `[0, 1]`.
    pub fn add(&mut self, id: impl Into<PatternId>, strength: f64) {
        let id = id.into();
        let strength = clamp_unit(strength);
        let now = self.now;
        match self.entries.get_mut(&id) {
            Some(entry) => entry.touch(strength, now),
            None => {
                self.entries.insert(id.clone(), MemoryEntry::new(id, strength, now));
            }
        }
    }

    pub fn recall(&self, id: &PatternId) -> Option<f64> {
        self.entries.get(id).map(|e| e.strength)
    }

    pub fn entry(&self, id: &PatternId) -> Option<&MemoryEntry> {
        self.entries.get(id)
    }

    /// Nudge a pattern up on success or down on failure.
    ///
    /// Returns false when the pattern is unknown.
    pub fn reinforce(&mut self, id: &PatternId, success: bool, delta: f64) -> bool {
        let now = self.now;
        let Some(entry) = self.entries.get_mut(id) else {
            return false;
        };
        let delta = delta.abs();
        let strength = if success {
            entry.strength + delta
        } else {
            entry.strength - delta
        };
        entry.touch(clamp_unit(strength), now);
        entry.use_count += 1;
        if success {
            entry.success_count += 1;
        }
        entry.success_rate = entry.success_count as f64 / entry.use_count as f64;
        true
    }

    /// Advance the clock and decay every entry by the time since its last use.
    ///
    /// Returns the ids of forgotten patterns.
    pub fn decay(&mut self, time_delta: SimTime) -> Vec<PatternId> {
        if time_delta.is_finite() && time_delta > 0.0 {
            self.now += time_delta;
        }
        let now = self.now;
        let rate = self.config.decay_rate;
        let floor = self.config.min_strength;

        let mut forgotten = Vec::new();
        for (id, entry) in self.entries.iter_mut() {
            let elapsed = (now - entry.last_used).max(0.0);
            entry.strength = clamp_unit(entry.anchor * (-rate * elapsed).exp());
            if entry.strength < floor {
                forgotten.push(id.clone());
            }
        }
        for id in &forgotten {
            self.entries.remove(id);
        }
        forgotten
    }

    /// Fold another store into this one, keeping the stronger entry per id.
    pub fn merge(&mut self, other: &PatternMemory) {
        for (id, theirs) in &other.entries {
            match self.entries.get_mut(id) {
                Some(ours) => {
                    if theirs.strength > ours.strength {
                        *ours = theirs.clone();
                    }
                }
                None => {
                    self.entries.insert(id.clone(), theirs.clone());
                }
            }
        }
    }

    /// The strongest entry; ties go to the smallest id.
    pub fn dominant(&self) -> Option<&MemoryEntry> {
        let mut best: Option<&MemoryEntry> = None;
        for entry in self.entries.values() {
            match best {
                Some(b) if entry.strength <= b.strength => {}
                _ => best = Some(entry),
            }
        }
        best
    }

    /// The `n` strongest entries, strongest first.
    pub fn top(&self, n: usize) -> Vec<&MemoryEntry> {
        let mut all: Vec<&MemoryEntry> = self.entries.values().collect();
        all.sort_by(|a, b| {
            b.strength
                .partial_cmp(&a.strength)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        all.truncate(n);
        all
    }

    /// Plain id -> strength view.
    pub fn strengths(&self) -> BTreeMap<PatternId, f64> {
        self.entries
            .iter()
            .map(|(id, e)| (id.clone(), e.strength))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemoryEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> PatternId {
        PatternId::from(s)
    }

    #[test]
    fn add_clamps_strength() {
        let mut m = PatternMemory::new();
        m.add("hi", 4.0);
        m.add("lo", -1.0);
        assert_eq!(m.recall(&id("hi")), Some(1.0));
        assert_eq!(m.recall(&id("lo")), Some(0.0));
        assert_eq!(m.recall(&id("absent")), None);
    }

    #[test]
    fn reinforce_tracks_success_rate() {
        let mut m = PatternMemory::new();
        m.add("p", 0.5);
        assert!(m.reinforce(&id("p"), true, 0.2));
        assert!(m.reinforce(&id("p"), false, 0.1));
        let e = m.entry(&id("p")).unwrap();
        assert!((e.strength - 0.6).abs() < 1e-12);
        assert_eq!(e.use_count, 2);
        assert!((e.success_rate - 0.5).abs() < 1e-12);
        assert!(!m.reinforce(&id("missing"), true, 0.1));
    }

    #[test]
    fn decay_is_proportional_to_idle_time() {
        let mut coarse = PatternMemory::new();
        let mut fine = PatternMemory::new();
        coarse.add("p", 1.0);
        fine.add("p", 1.0);

        coarse.decay(4.0);
        for _ in 0..4 {
            fine.decay(1.0);
        }
        let expected = (-0.05f64 * 4.0).exp();
        assert!((coarse.recall(&id("p")).unwrap() - expected).abs() < 1e-12);
        assert!((fine.recall(&id("p")).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn decay_forgets_weak_patterns() {
        let mut m = PatternMemory::with_config(MemoryConfig {
            decay_rate: 1.0,
            min_strength: 0.1,
        });
        m.add("weak", 0.2);
        m.add("strong", 1.0);
        let forgotten = m.decay(1.0);
        assert_eq!(forgotten, vec![id("weak")]);
        assert!(m.recall(&id("strong")).is_some());
    }

    #[test]
    fn reinforcement_resets_decay_anchor() {
        let mut m = PatternMemory::new();
        m.add("p", 0.5);
        m.decay(10.0);
        let decayed = m.recall(&id("p")).unwrap();
        m.reinforce(&id("p"), true, 0.0);
        m.decay(0.0);
        assert!((m.recall(&id("p")).unwrap() - decayed).abs() < 1e-12);
    }

    #[test]
    fn merge_is_idempotent() {
        let mut a = PatternMemory::new();
        a.add("shared", 0.3);
        a.add("mine", 0.8);
        let mut b = PatternMemory::new();
        b.add("shared", 0.6);
        b.add("theirs", 0.4);

        a.merge(&b);
        let once = a.strengths();
        a.merge(&b);
        assert_eq!(a.strengths(), once);
        assert_eq!(once[&id("shared")], 0.6);
        assert_eq!(once[&id("mine")], 0.8);
        assert_eq!(once[&id("theirs")], 0.4);
    }

    #[test]
    fn json_roundtrip_keeps_numeric_ids() {
        let mut m = PatternMemory::new();
        m.add(PatternId::Numeric(1234), 0.7);
        m.add("named", 0.2);
        let json = serde_json::to_string(&m).unwrap();
        let back: PatternMemory = serde_json::from_str(&json).unwrap();
        assert_eq!(back.recall(&PatternId::Numeric(1234)), Some(0.7));
        assert_eq!(back.strengths(), m.strengths());
    }

    #[test]
    fn dominant_and_top() {
        let mut m = PatternMemory::new();
        m.add("a", 0.2);
        m.add("b", 0.9);
        m.add("c", 0.5);
        assert_eq!(m.dominant().unwrap().id, id("b"));
        let top: Vec<_> = m.top(2).into_iter().map(|e| e.id.clone()).collect();
        assert_eq!(top, vec![id("b"), id("c")]);
    }
}
