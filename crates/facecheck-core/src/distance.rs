//! Distance metrics between face embeddings.
//!
//! Lower distance means more similar faces. All computation is done in f64
//! regardless of the precision the recognition model produced.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::VerifyError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DistanceError {
    #[error("embedding length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },
    #[error("cosine distance is undefined for a zero-norm embedding")]
    ZeroNorm,
}

/// Metric used to compare two embeddings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    Euclidean,
    #[serde(rename = "euclidean_l2")]
    EuclideanL2,
}

impl DistanceMetric {
    pub const ALL: [DistanceMetric; 3] = [
        DistanceMetric::Cosine,
        DistanceMetric::Euclidean,
        DistanceMetric::EuclideanL2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::Euclidean => "euclidean",
            DistanceMetric::EuclideanL2 => "euclidean_l2",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMetric {
    type Err = VerifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cosine" => Ok(DistanceMetric::Cosine),
            "euclidean" => Ok(DistanceMetric::Euclidean),
            "euclidean_l2" => Ok(DistanceMetric::EuclideanL2),
            other => Err(VerifyError::InvalidArgument(format!(
                "invalid distance_metric passed: {other}"
            ))),
        }
    }
}

fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

fn check_lengths(a: &[f64], b: &[f64]) -> Result<(), DistanceError> {
    if a.len() != b.len() {
        return Err(DistanceError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(())
}

/// Cosine distance `1 - a·b / (|a| |b|)`, in [0, 2].
pub fn cosine_distance(a: &[f64], b: &[f64]) -> Result<f64, DistanceError> {
    check_lengths(a, b)?;

    let denom = norm(a) * norm(b);
    if denom == 0.0 {
        return Err(DistanceError::ZeroNorm);
    }

    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    Ok(1.0 - dot / denom)
}

/// Plain L2 distance between two embeddings.
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> Result<f64, DistanceError> {
    check_lengths(a, b)?;

    Ok(a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt())
}

/// Scale a vector to unit length. A zero vector is returned unchanged.
pub fn l2_normalize(v: &[f64]) -> Vec<f64> {
    let n = norm(v);
    if n == 0.0 {
        v.to_vec()
    } else {
        v.iter().map(|x| x / n).collect()
    }
}

/// Compute the distance between two embeddings under `metric`.
pub fn find_distance(a: &[f64], b: &[f64], metric: DistanceMetric) -> Result<f64, DistanceError> {
    match metric {
        DistanceMetric::Cosine => cosine_distance(a, b),
        DistanceMetric::Euclidean => euclidean_distance(a, b),
        DistanceMetric::EuclideanL2 => euclidean_distance(&l2_normalize(a), &l2_normalize(b)),
    }
}
