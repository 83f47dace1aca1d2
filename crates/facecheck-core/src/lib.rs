//! facecheck-core: face verification and expression analysis.
//!
//! Compares face embeddings under cosine / euclidean / euclidean-L2 distance
//! against pre-tuned per-model thresholds. Embeddings come from any
//! [`EmbeddingExtractor`]; an ONNX whole-image recognizer and an ONNX
//! expression classifier are provided.

pub mod distance;
pub mod emotion;
pub mod error;
pub mod extractor;
pub mod models;
pub mod normalization;
pub mod options;
pub mod recognizer;
pub mod thresholds;
pub mod types;
pub mod verify;

pub use distance::{find_distance, l2_normalize, DistanceError, DistanceMetric};
pub use emotion::{Emotion, EmotionClassifier, EmotionError, EmotionPrediction};
pub use error::VerifyError;
pub use extractor::{EmbeddingExtractor, ExtractError, ExtractOptions, ExtractedFace, FaceImage};
pub use models::{model_spec, EmbeddingOnlyModel, ModelRegistry, ModelSpec};
pub use options::{DetectorBackend, Normalization, VerifyOptions, VerifyParams};
pub use recognizer::{OnnxRecognizer, RecognizerError, TensorLayout};
pub use thresholds::{find_threshold, threshold_for};
pub use types::{
    embedding_from_json, BgrImage, FacialArea, FacialAreas, ImageInput, ImageInputError, VerificationResult,
};
pub use verify::verify;
