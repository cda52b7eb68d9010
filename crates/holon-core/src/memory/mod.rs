//! Pattern memory suite.
//!
//! Two independent memory systems live here, on different timescales:
//!
//! - [`PatternMemory`] is the long-lived strategy store: strengths in
//!   `[0, 1]`, exponential decay since last use, reinforcement, merging.
//!   The swarm's global pool is one of these.
//! - The memetic [`Pattern`] list is the fast synaptic layer carried by each
//!   agent, kept bounded by [`HomeostaticScaler`] and diversified by
//!   [`PatternEvolution`].
//!
//! [`AssociativeMemory`] links pattern ids Hebbian-style ("fire together,
//! wire together") independent of either store.

pub mod associative;
pub mod evolution;
pub mod homeostasis;
pub mod pattern;
pub mod store;

pub use associative::{AssociationConfig, AssociativeMemory};
pub use evolution::{PatternEvolution, MAX_MUTATION_SCALE};
pub use homeostasis::HomeostaticScaler;
pub use pattern::Pattern;
pub use store::{MemoryConfig, MemoryEntry, PatternMemory};

use crate::types::PatternId;
use std::collections::BTreeMap;

/// Merge `source` into `target`, keeping the stronger weight for shared ids.
///
/// Applying the same source twice leaves `target` unchanged the second time.
pub fn merge_strongest(target: &mut BTreeMap<PatternId, f64>, source: &BTreeMap<PatternId, f64>) {
    for (id, &weight) in source {
        target
            .entry(id.clone())
            .and_modify(|w| {
                if weight > *w {
                    *w = weight;
                }
            })
            .or_insert(weight);
    }
}

/// Merge a memetic pattern list, max weight wins per id.
///
/// Existing patterns keep their position; new ids are appended in source order.
pub fn merge_patterns(target: &mut Vec<Pattern>, source: &[Pattern]) {
    for pattern in source {
        match target.iter_mut().find(|p| p.id == pattern.id) {
            Some(existing) => {
                if pattern.weight > existing.weight {
                    *existing = pattern.clone();
                }
            }
            None => target.push(pattern.clone()),
        }
    }
}

/// The strongest entry of a memory map. Ties go to the smallest id.
pub fn strongest(memory: &BTreeMap<PatternId, f64>) -> Option<(&PatternId, f64)> {
    let mut best: Option<(&PatternId, f64)> = None;
    for (id, &w) in memory {
        match best {
            Some((_, bw)) if w <= bw => {}
            _ => best = Some((id, w)),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_strongest_keeps_max() {
        let mut a = BTreeMap::from([(PatternId::from("x"), 0.2), (PatternId::from("y"), 0.9)]);
        let b = BTreeMap::from([(PatternId::from("x"), 0.5), (PatternId::from("y"), 0.1), (PatternId::from("z"), 0.3)]);
        merge_strongest(&mut a, &b);
        assert_eq!(a[&PatternId::from("x")], 0.5);
        assert_eq!(a[&PatternId::from("y")], 0.9);
        assert_eq!(a[&PatternId::from("z")], 0.3);

        let once = a.clone();
        merge_strongest(&mut a, &b);
        assert_eq!(a, once);
    }

    #[test]
    fn merge_patterns_appends_new_ids() {
        let mut a = vec![Pattern::new(PatternId::Numeric(1), 0.4)];
        let b = vec![
            Pattern::new(PatternId::Numeric(2), 0.1),
            Pattern::new(PatternId::Numeric(1), 0.6),
        ];
        merge_patterns(&mut a, &b);
        assert_eq!(a.len(), 2);
        assert_eq!(a[0].id, PatternId::Numeric(1));
        assert_eq!(a[0].weight, 0.6);
        assert_eq!(a[1].id, PatternId::Numeric(2));
    }

    #[test]
    fn strongest_prefers_smallest_id_on_tie() {
        let m = BTreeMap::from([(PatternId::Numeric(5), 0.5), (PatternId::Numeric(2), 0.5)]);
        assert_eq!(strongest(&m), Some((&PatternId::Numeric(2), 0.5)));
        assert_eq!(strongest(&BTreeMap::new()), None);
    }
}
