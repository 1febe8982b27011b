use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DistanceError {
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Degenerate vector: cosine similarity is undefined for zero magnitude")]
    DegenerateVector,
}

/// Which end of the score range is the better match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreOrder {
    HigherIsBetter,
    LowerIsBetter,
}

impl ScoreOrder {
    /// Best-first comparator for sorting scored results.
    pub fn compare(&self, a: f32, b: f32) -> Ordering {
        let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
        match self {
            ScoreOrder::HigherIsBetter => ord.reverse(),
            ScoreOrder::LowerIsBetter => ord,
        }
    }

    /// True if score `a` is a strictly better match than score `b`.
    pub fn is_better(&self, a: f32, b: f32) -> bool {
        self.compare(a, b) == Ordering::Less
    }
}

/// Vector comparison function defining "similarity" for ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DistanceStrategy {
    DotProduct,
    Cosine,
    Euclidean,
}

impl DistanceStrategy {
    /// Score a pair of equal-length vectors.
    ///
    /// Dot product and cosine are similarities (higher is better);
    /// Euclidean is a distance (lower is better). Use [`ordering`] to sort
    /// uniformly across strategies.
    ///
    /// [`ordering`]: DistanceStrategy::ordering
    pub fn score(&self, a: &[f32], b: &[f32]) -> Result<f32, DistanceError> {
        if a.len() != b.len() {
            return Err(DistanceError::DimensionMismatch {
                expected: a.len(),
                actual: b.len(),
            });
        }

        match self {
            DistanceStrategy::DotProduct => Ok(dot_product(a, b)),
            DistanceStrategy::Cosine => cosine_similarity(a, b),
            DistanceStrategy::Euclidean => Ok(euclidean_distance(a, b)),
        }
    }

    pub fn ordering(&self) -> ScoreOrder {
        match self {
            DistanceStrategy::DotProduct | DistanceStrategy::Cosine => ScoreOrder::HigherIsBetter,
            DistanceStrategy::Euclidean => ScoreOrder::LowerIsBetter,
        }
    }
}

pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

pub fn magnitude(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity with length and degeneracy checks. Also used by the
/// MMR reranker for candidate-to-candidate similarity, whatever the
/// collection's ranking strategy.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, DistanceError> {
    if a.len() != b.len() {
        return Err(DistanceError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let mag_a = magnitude(a);
    let mag_b = magnitude(b);
    if mag_a == 0.0 || mag_b == 0.0 {
        return Err(DistanceError::DegenerateVector);
    }

    Ok(dot_product(a, b) / (mag_a * mag_b))
}

pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}
