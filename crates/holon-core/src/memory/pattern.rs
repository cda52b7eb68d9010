//! The memetic pattern record carried in an agent's weighted pattern list.

use crate::types::PatternId;
use serde::{Deserialize, Serialize};

/// A reusable weighted phase/strategy record.
///
/// Weights are unbounded on their own; [`super::HomeostaticScaler`] keeps a
/// list of them summing to a fixed target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub id: PatternId,
    pub weight: f64,
    /// Times this pattern was used.
    pub uses: u64,
    /// Times a use was judged successful.
    pub successes: u64,
    /// Running success rate in `[0, 1]`.
    pub success_rate: f64,
}

impl Pattern {
    pub fn new(id: PatternId, weight: f64) -> Self {
        Self {
            id,
            weight,
            uses: 0,
            successes: 0,
            success_rate: 0.0,
        }
    }

    /// Pattern keyed by a quantized phase.
    pub fn from_phase(phase: f64, weight: f64) -> Self {
        Self::new(PatternId::from_phase(phase), weight)
    }

    pub fn record_use(&mut self, success: bool) {
        self.uses += 1;
        if success {
            self.successes += 1;
        }
        self.success_rate = self.successes as f64 / self.uses as f64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_rate_tracks_uses() {
        let mut p = Pattern::new(PatternId::from("sensor"), 1.0);
        p.record_use(true);
        p.record_use(false);
        p.record_use(true);
        p.record_use(true);
        assert_eq!(p.uses, 4);
        assert_eq!(p.successes, 3);
        assert!((p.success_rate - 0.75).abs() < 1e-12);
    }
}
