//! Pattern evolution: mutation and crossover of memetic patterns.
//!
//! Randomness comes from a seeded `StdRng`, so a given seed always produces
//! the same lineage.

use super::pattern::Pattern;
use crate::types::PatternId;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Largest perturbation [`PatternEvolution`] will apply.
pub const MAX_MUTATION_SCALE: f64 = 1.0;

/// Produces perturbed and recombined patterns.
#[derive(Debug, Clone)]
pub struct PatternEvolution {
    rng: StdRng,
    /// Maximum absolute weight perturbation applied by [`PatternEvolution::mutate`].
    mutation_scale: f64,
    /// Counter used to derive offspring ids.
    generation: u64,
}

impl PatternEvolution {
    pub fn new(seed: u64) -> Self {
        Self::with_scale(seed, 0.1)
    }

    /// The scale is taken as an absolute value and capped at
    /// [`MAX_MUTATION_SCALE`]; NaN disables mutation.
    pub fn with_scale(seed: u64, mutation_scale: f64) -> Self {
        let mutation_scale = if mutation_scale.is_nan() {
            0.0
        } else {
            mutation_scale.abs().min(MAX_MUTATION_SCALE)
        };
        Self {
            rng: StdRng::seed_from_u64(seed),
            mutation_scale,
            generation: 0,
        }
    }

    pub fn mutation_scale(&self) -> f64 {
        self.mutation_scale
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// A new pattern with a perturbed weight and halved confidence.
    ///
    /// Numeric (phase) ids shift to a neighbouring phase bucket so the
    /// offspring stays near its parent; named ids get a lineage suffix.
    pub fn mutate(&mut self, pattern: &Pattern) -> Pattern {
        let scale = self.mutation_scale;
        let delta = self.rng.random_range(-scale..=scale);
        let generation = self.next_generation();

        let id = match &pattern.id {
            PatternId::Numeric(_) => {
                let phase = pattern.id.as_phase().unwrap_or(0.0);
                let step = self.rng.random_range(-scale..=scale);
                let shifted = PatternId::from_phase(phase + step);
                if shifted == pattern.id {
                    PatternId::from_phase(phase + 1.0 / PatternId::PHASE_RESOLUTION)
                } else {
                    shifted
                }
            }
            PatternId::Named(name) => PatternId::Named(format!("{}/m{}", name, generation)),
        };

        Pattern {
            id,
            weight: (pattern.weight + delta).max(0.0),
            uses: 0,
            successes: 0,
            success_rate: pattern.success_rate / 2.0,
        }
    }

    /// A child whose weight and success rate are the parents' means.
    pub fn crossover(&mut self, a: &Pattern, b: &Pattern) -> Pattern {
        let generation = self.next_generation();
        let id = match (a.id.as_phase(), b.id.as_phase()) {
            (Some(pa), Some(pb)) => {
                let (mean, _) = crate::types::circular_mean([pa, pb]);
                PatternId::from_phase(mean)
            }
            _ => PatternId::Named(format!("{}x{}/c{}", a.id, b.id, generation)),
        };
        Pattern {
            id,
            weight: (a.weight + b.weight) / 2.0,
            uses: 0,
            successes: 0,
            success_rate: (a.success_rate + b.success_rate) / 2.0,
        }
    }
}
