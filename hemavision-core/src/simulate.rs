//! Filename-seeded stand-in for the classifier.
//!
//! Output is repeatable and looks plausible, but carries no diagnostic meaning.

use hemavision_types::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};
use strum::{EnumCount, VariantArray};

/// Baseline mixture is `SPREAD * dirichlet + FLOOR` before the chosen class is overwritten.
const SPREAD: f32 = 0.3;
const FLOOR: f32 = 0.2;
const CHOSEN_MIN: f32 = 0.75;
const CHOSEN_MAX: f32 = 0.98;

#[derive(Debug, Clone, Copy, Default)]
pub struct Simulator;

impl Simulator {
    fn seed(filename: &str) -> u64 {
        let hash = blake3::hash(filename.as_bytes());
        let mut seed = [0u8; 8];
        seed.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(seed)
    }

    /// The class a filename is steered towards.
    pub fn chosen_class(filename: &str) -> CellType {
        let bucket = (Self::seed(filename) % 100) as usize;
        CellType::VARIANTS[bucket * CellType::COUNT / 100]
    }

    pub fn simulate(&self, filename: &str) -> Result<Probabilities, ProbabilityError> {
        let seed = Self::seed(filename);
        let chosen = Self::chosen_class(filename);
        let mut rng = StdRng::seed_from_u64(seed);

        // Dirichlet(1, ..., 1) is a normalized vector of Exp(1) draws.
        let draws: [f32; CellType::COUNT] =
            std::array::from_fn(|_| -(1.0 - rng.gen::<f32>()).ln());
        let total: f32 = draws.iter().sum();
        let mut weights = draws.map(|draw| SPREAD * draw / total + FLOOR);
        weights[chosen.index()] = rng.gen_range(CHOSEN_MIN..CHOSEN_MAX);

        let probabilities = Probabilities::normalized(weights)?;
        tracing::debug!(filename, %chosen, ?probabilities, "simulated prediction");
        Ok(probabilities)
    }
}
