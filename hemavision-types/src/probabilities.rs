use std::cmp::Ordering;

use derive_more::{AsRef, Index};
use serde::{ser::SerializeMap, Serialize, Serializer};
use strum::{EnumCount, VariantArray};
use thiserror::Error;

use crate::cell::CellType;

/// Allowed distance between the score sum and 1.
pub const PROBABILITY_TOLERANCE: f32 = 1e-3;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProbabilityError {
    #[error("expected {expected} scores, got {got}")]
    WrongLength { expected: usize, got: usize },
    #[error("score for {cell} is not a finite non-negative number: {value}")]
    InvalidScore { cell: CellType, value: f32 },
    #[error("scores sum to {0}, expected 1")]
    NotNormalized(f32),
}

/// Probability distribution over [`CellType`], stored in label order.
#[derive(Debug, Clone, Copy, PartialEq, AsRef, Index)]
pub struct Probabilities(#[index] [f32; CellType::COUNT]);

impl Probabilities {
    pub fn try_new(scores: [f32; CellType::COUNT]) -> Result<Self, ProbabilityError> {
        Self::check_scores(&scores)?;
        let sum: f32 = scores.iter().sum();
        if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(ProbabilityError::NotNormalized(sum));
        }
        Ok(Self(scores))
    }

    pub fn try_from_slice(scores: &[f32]) -> Result<Self, ProbabilityError> {
        let scores: [f32; CellType::COUNT] =
            scores.try_into().map_err(|_| ProbabilityError::WrongLength {
                expected: CellType::COUNT,
                got: scores.len(),
            })?;
        Self::try_new(scores)
    }

    /// Scales non-negative weights so they sum to 1.
    pub fn normalized(weights: [f32; CellType::COUNT]) -> Result<Self, ProbabilityError> {
        Self::check_scores(&weights)?;
        let sum: f32 = weights.iter().sum();
        if sum <= 0.0 {
            return Err(ProbabilityError::NotNormalized(sum));
        }
        Self::try_new(weights.map(|w| w / sum))
    }

    fn check_scores(scores: &[f32; CellType::COUNT]) -> Result<(), ProbabilityError> {
        match scores
            .iter()
            .zip(CellType::VARIANTS)
            .find(|(value, _)| !value.is_finite() || **value < 0.0)
        {
            Some((&value, &cell)) => Err(ProbabilityError::InvalidScore { cell, value }),
            None => Ok(()),
        }
    }

    pub fn get(&self, cell: CellType) -> f32 {
        self.0[cell.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (CellType, f32)> + '_ {
        CellType::VARIANTS.iter().copied().zip(self.0.iter().copied())
    }

    /// Most likely label with its score. Ties go to the earlier label.
    pub fn top(&self) -> (CellType, f32) {
        self.iter()
            .reduce(|best, candidate| {
                match candidate.1.partial_cmp(&best.1).unwrap_or(Ordering::Equal) {
                    Ordering::Greater => candidate,
                    _ => best,
                }
            })
            .unwrap_or((CellType::Eosinophils, self.0[0]))
    }

    pub fn scores(&self) -> &[f32; CellType::COUNT] {
        &self.0
    }
}

/// Serializes as a `{label: score}` object in label order.
impl Serialize for Probabilities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(CellType::COUNT))?;
        for (cell, score) in self.iter() {
            map.serialize_entry(cell.as_ref(), &score)?;
        }
        map.end()
    }
}
