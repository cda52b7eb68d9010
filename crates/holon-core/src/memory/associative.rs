//! Associative memory: weighted directed links between pattern ids.
//!
//! Hebbian-style: patterns that are active together get linked, and the
//! link grows with every repeated co-activation. Unused links decay linearly
//! and are pruned once they reach zero.

use crate::types::{PatternId, SimTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tunables for an [`AssociativeMemory`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociationConfig {
    /// Weight removed per unit of time (default: 0.01).
    pub decay_rate: f64,
    /// Upper bound for a single link (default: 1.0).
    pub max_weight: f64,
}

impl Default for AssociationConfig {
    fn default() -> Self {
        Self {
            decay_rate: 0.01,
            max_weight: 1.0,
        }
    }
}

/// Directed association graph between pattern ids.
#[derive(Debug, Clone, Default)]
pub struct AssociativeMemory {
    links: BTreeMap<PatternId, BTreeMap<PatternId, f64>>,
    config: AssociationConfig,
}

impl AssociativeMemory {
    pub fn new() -> Self {
        Self::with_config(AssociationConfig::default())
    }

    pub fn with_config(config: AssociationConfig) -> Self {
        Self {
            links: BTreeMap::new(),
            config,
        }
    }

    /// Create or strengthen the link `source -> target`. Returns the new weight.
    pub fn associate(&mut self, source: &PatternId, target: &PatternId, delta: f64) -> f64 {
        let max = self.config.max_weight;
        let weight = self
            .links
            .entry(source.clone())
            .or_default()
            .entry(target.clone())
            .or_insert(0.0);
        *weight = (*weight + delta.max(0.0)).min(max);
        *weight
    }

    /// Strengthen every ordered pair among `ids` (self-links excluded).
    pub fn co_activate(&mut self, ids: &[PatternId], delta: f64) {
        for (i, source) in ids.iter().enumerate() {
            for (j, target) in ids.iter().enumerate() {
                if i != j && source != target {
                    self.associate(source, target, delta);
                }
            }
        }
    }

    /// Current weight of `source -> target`, if linked.
    pub fn weight(&self, source: &PatternId, target: &PatternId) -> Option<f64> {
        self.links.get(source)?.get(target).copied()
    }

    /// Targets linked from `source` with weight >= `min_weight`, strongest first.
    pub fn get_associations(&self, source: &PatternId, min_weight: f64) -> Vec<(PatternId, f64)> {
        let Some(targets) = self.links.get(source) else {
            return vec![];
        };
        let mut results: Vec<(PatternId, f64)> = targets
            .iter()
            .filter(|&(_, &w)| w >= min_weight)
            .map(|(id, &w)| (id.clone(), w))
            .collect();
        results.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        results
    }

    /// Linearly weaken all links, pruning those that reach zero.
    ///
    /// Returns the number of links pruned.
    pub fn decay(&mut self, time_delta: SimTime) -> usize {
        if !time_delta.is_finite() || time_delta <= 0.0 {
            return 0;
        }
        let amount = self.config.decay_rate * time_delta;
        let mut pruned = 0;
        for targets in self.links.values_mut() {
            targets.retain(|_, w| {
                *w -= amount;
                let keep = *w > 0.0;
                if !keep {
                    pruned += 1;
                }
                keep
            });
        }
        self.links.retain(|_, targets| !targets.is_empty());
        pruned
    }

    /// Number of directed links.
    pub fn link_count(&self) -> usize {
        self.links.values().map(|t| t.len()).sum()
    }

    /// Number of sources with at least one link.
    pub fn source_count(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> PatternId {
        PatternId::from(s)
    }

    #[test]
    fn repeated_association_strengthens() {
        let mut m = AssociativeMemory::new();
        m.associate(&id("a"), &id("b"), 0.2);
        let w = m.associate(&id("a"), &id("b"), 0.2);
        assert!((w - 0.4).abs() < 1e-12);
        assert_eq!(m.weight(&id("b"), &id("a")), None);
    }

    #[test]
    fn weights_are_capped() {
        let mut m = AssociativeMemory::new();
        for _ in 0..20 {
            m.associate(&id("a"), &id("b"), 0.3);
        }
        assert_eq!(m.weight(&id("a"), &id("b")), Some(1.0));
    }

    #[test]
    fn associations_sorted_by_weight() {
        let mut m = AssociativeMemory::new();
        m.associate(&id("src"), &id("weak"), 0.1);
        m.associate(&id("src"), &id("strong"), 0.8);
        m.associate(&id("src"), &id("mid"), 0.4);
        let got = m.get_associations(&id("src"), 0.2);
        assert_eq!(got, vec![(id("strong"), 0.8), (id("mid"), 0.4)]);
        assert!(m.get_associations(&id("nobody"), 0.0).is_empty());
    }

    #[test]
    fn co_activation_links_both_directions() {
        let mut m = AssociativeMemory::new();
        m.co_activate(&[id("a"), id("b"), id("c")], 0.1);
        assert_eq!(m.link_count(), 6);
        assert_eq!(m.weight(&id("c"), &id("a")), Some(0.1));
    }

    #[test]
    fn decay_prunes_links_and_empty_sources() {
        let mut m = AssociativeMemory::with_config(AssociationConfig {
            decay_rate: 0.1,
            max_weight: 1.0,
        });
        m.associate(&id("a"), &id("b"), 0.15);
        m.associate(&id("c"), &id("d"), 0.5);
        assert_eq!(m.decay(1.0), 0);
        assert_eq!(m.decay(1.0), 1);
        assert_eq!(m.source_count(), 1);
        assert!(m.weight(&id("a"), &id("b")).is_none());
        assert!((m.weight(&id("c"), &id("d")).unwrap() - 0.3).abs() < 1e-12);
    }
}
