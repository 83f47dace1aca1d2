//! Facial expression classifier via ONNX Runtime.
//!
//! Expects the 48x48 single-channel expression network: input (1, 48, 48, 1)
//! scaled to [0, 1], output seven class scores.

use std::fmt;
use std::path::Path;

use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::BgrImage;

const EMOTION_INPUT_SIZE: usize = 48;
const EMOTION_CLASSES: usize = 7;

// BT.601 luma weights, applied to B, G, R.
const GRAY_WEIGHTS: [f32; 3] = [0.114, 0.587, 0.299];

#[derive(Error, Debug)]
pub enum EmotionError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Expression classes in the network's output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    Neutral,
}

impl Emotion {
    pub const ALL: [Emotion; EMOTION_CLASSES] = [
        Emotion::Angry,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Surprise,
        Emotion::Neutral,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Emotion::Angry => "angry",
            Emotion::Disgust => "disgust",
            Emotion::Fear => "fear",
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Surprise => "surprise",
            Emotion::Neutral => "neutral",
        }
    }

    /// Label reported to `/video_feed` clients.
    pub fn display_label(&self) -> &'static str {
        match self {
            Emotion::Angry => "You are angry",
            Emotion::Happy => "You are happy",
            Emotion::Sad => "You are sad",
            other => other.label(),
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmotionPrediction {
    pub dominant: Emotion,
    /// Raw network scores, indexed like [`Emotion::ALL`].
    pub scores: [f32; EMOTION_CLASSES],
}

impl EmotionPrediction {
    /// Pick the highest score; the earliest class wins ties.
    pub fn from_scores(scores: [f32; EMOTION_CLASSES]) -> Self {
        let mut best = 0;
        for (i, &s) in scores.iter().enumerate() {
            if s > scores[best] {
                best = i;
            }
        }
        Self {
            dominant: Emotion::ALL[best],
            scores,
        }
    }
}

pub struct EmotionClassifier {
    session: Session,
}

impl EmotionClassifier {
    /// Load the expression ONNX model from the given path.
    pub fn load(model_path: &Path) -> Result<Self, EmotionError> {
        if !model_path.exists() {
            return Err(EmotionError::ModelNotFound(model_path.display().to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(1)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = %model_path.display(),
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded emotion model"
        );

        Ok(Self { session })
    }

    pub fn classify(&mut self, image: &BgrImage) -> Result<EmotionPrediction, EmotionError> {
        let input = Self::preprocess(image);

        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| EmotionError::InferenceFailed(format!("score extraction: {e}")))?;

        let scores: [f32; EMOTION_CLASSES] = raw.try_into().map_err(|_| {
            EmotionError::InferenceFailed(format!(
                "expected {EMOTION_CLASSES} class scores, got {}",
                raw.len()
            ))
        })?;

        let prediction = EmotionPrediction::from_scores(scores);
        tracing::debug!(emotion = %prediction.dominant, "emotion classified");
        Ok(prediction)
    }

    /// Shrink to 48x48 by area averaging, convert to grayscale and scale to [0, 1].
    fn preprocess(image: &BgrImage) -> Array4<f32> {
        let size = EMOTION_INPUT_SIZE;
        let rows = area_weights(image.height() as usize, size);
        let cols = area_weights(image.width() as usize, size);

        let mut tensor = Array4::<f32>::zeros((1, size, size, 1));
        for (y, row) in rows.iter().enumerate() {
            for (x, col) in cols.iter().enumerate() {
                let mut bgr = [0f32; 3];
                for &(sy, wy) in row {
                    for &(sx, wx) in col {
                        let pixel = image.pixel(sy as u32, sx as u32);
                        for c in 0..3 {
                            bgr[c] += pixel[c] as f32 * wy * wx;
                        }
                    }
                }

                let luma: f32 = bgr
                    .iter()
                    .zip(GRAY_WEIGHTS)
                    .map(|(v, w)| v.round().clamp(0.0, 255.0) * w)
                    .sum();
                tensor[[0, y, x, 0]] = luma.round().clamp(0.0, 255.0) / 255.0;
            }
        }

        tensor
    }
}

/// Source indices and weights covering each of `dst` output cells.
///
/// Each cell spans `src / dst` source pixels; partially covered pixels count
/// by their overlap. Weights of a cell sum to 1.
fn area_weights(src: usize, dst: usize) -> Vec<Vec<(usize, f32)>> {
    let scale = src as f64 / dst as f64;
    (0..dst)
        .map(|i| {
            let start = i as f64 * scale;
            let end = (start + scale).min(src as f64);
            let first = start.floor() as usize;
            let last = (end.ceil() as usize).min(src).max(first + 1);
            (first..last)
                .map(|j| {
                    let overlap = end.min(j as f64 + 1.0) - start.max(j as f64);
                    (j, (overlap / scale) as f32)
                })
                .filter(|&(_, w)| w > 0.0)
                .collect()
        })
        .collect()
}
