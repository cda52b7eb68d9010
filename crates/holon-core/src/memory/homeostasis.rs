//! Homeostatic scaling of memetic pattern weights.
//!
//! Repeated reinforcement would otherwise let a single pattern's weight grow
//! without bound. Scaling is multiplicative, so relative preferences survive.

use super::pattern::Pattern;
use serde::{Deserialize, Serialize};

/// Rescales a pattern list so its weights sum to `target_sum`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HomeostaticScaler {
    pub target_sum: f64,
}

impl Default for HomeostaticScaler {
    fn default() -> Self {
        Self { target_sum: 1.0 }
    }
}

impl HomeostaticScaler {
    pub fn new(target_sum: f64) -> Self {
        Self { target_sum }
    }

    /// Rescale in place and return the factor applied.
    ///
    /// Negative or non-finite weights are floored to zero first. A zero total
    /// resets every weight to `target_sum / n` and returns `None`.
    pub fn scale(&self, patterns: &mut [Pattern]) -> Option<f64> {
        if patterns.is_empty() {
            return Some(1.0);
        }
        for p in patterns.iter_mut() {
            if !p.weight.is_finite() || p.weight < 0.0 {
                p.weight = 0.0;
            }
        }

        let sum: f64 = patterns.iter().map(|p| p.weight).sum();
        if sum > 0.0 && sum.is_finite() {
            let factor = self.target_sum / sum;
            for p in patterns.iter_mut() {
                p.weight *= factor;
            }
            Some(factor)
        } else {
            let uniform = self.target_sum / patterns.len() as f64;
            for p in patterns.iter_mut() {
                p.weight = uniform;
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PatternId;

    fn list(weights: &[f64]) -> Vec<Pattern> {
        weights
            .iter()
            .enumerate()
            .map(|(i, &w)| Pattern::new(PatternId::Numeric(i as u64), w))
            .collect()
    }

    #[test]
    fn scaling_preserves_target_sum_and_ratios() {
        let scaler = HomeostaticScaler::new(2.0);
        let mut ps = list(&[1.0, 3.0, 4.0]);
        let factor = scaler.scale(&mut ps).unwrap();
        assert!((factor - 0.25).abs() < 1e-12);
        let sum: f64 = ps.iter().map(|p| p.weight).sum();
        assert!((sum - 2.0).abs() < 1e-12);
        assert!((ps[2].weight / ps[0].weight - 4.0).abs() < 1e-12);
    }

    #[test]
    fn zero_sum_resets_to_uniform() {
        let scaler = HomeostaticScaler::new(1.0);
        let mut ps = list(&[0.0, 0.0, 0.0, 0.0]);
        assert_eq!(scaler.scale(&mut ps), None);
        for p in &ps {
            assert!((p.weight - 0.25).abs() < 1e-12);
        }
    }

    #[test]
    fn negative_and_nan_weights_are_floored() {
        let scaler = HomeostaticScaler::default();
        let mut ps = list(&[-5.0, f64::NAN, 2.0]);
        scaler.scale(&mut ps);
        assert_eq!(ps[0].weight, 0.0);
        assert_eq!(ps[1].weight, 0.0);
        assert!((ps[2].weight - 1.0).abs() < 1e-12);
    }

    #[test]
    fn repeated_scaling_is_stable() {
        let scaler = HomeostaticScaler::new(5.0);
        let mut ps = list(&[0.3, 9.0, 120.0]);
        scaler.scale(&mut ps);
        let once: Vec<f64> = ps.iter().map(|p| p.weight).collect();
        scaler.scale(&mut ps);
        for (a, b) in once.iter().zip(ps.iter()) {
            assert!((a - b.weight).abs() < 1e-9);
        }
    }

    #[test]
    fn empty_list_is_untouched() {
        let scaler = HomeostaticScaler::default();
        let mut ps: Vec<Pattern> = Vec::new();
        assert_eq!(scaler.scale(&mut ps), Some(1.0));
    }
}
