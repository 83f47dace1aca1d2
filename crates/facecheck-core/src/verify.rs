//! Face verification: decide whether two inputs show the same person.

use std::time::Instant;

use crate::distance::{find_distance, DistanceError};
use crate::error::VerifyError;
use crate::extractor::{EmbeddingExtractor, ExtractError, ExtractedFace, FaceImage};
use crate::models::ModelRegistry;
use crate::options::VerifyOptions;
use crate::thresholds::threshold_for;
use crate::types::{FacialArea, FacialAreas, ImageInput, VerificationResult};

/// Embeddings and facial areas found for one input.
struct Representation {
    embeddings: Vec<Vec<f64>>,
    facial_areas: Vec<FacialArea>,
}

/// Closest face pair across the two inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestPair {
    pub distance: f64,
    pub idx1: usize,
    pub idx2: usize,
}

/// Verify whether `img1` and `img2` belong to the same person.
///
/// Every face of the first input is compared with every face of the second;
/// the closest pair decides the verdict.
pub fn verify(
    registry: &ModelRegistry,
    img1: &ImageInput,
    img2: &ImageInput,
    options: &VerifyOptions,
) -> Result<VerificationResult, VerifyError> {
    let started = Instant::now();

    let model = registry.get(&options.model_name)?;

    let rep1 = represent(model, img1, 1, options)?;
    let rep2 = represent(model, img2, 2, options)?;

    let best = find_best_pair(&rep1.embeddings, &rep2.embeddings, options)?;

    let threshold = options
        .threshold
        .unwrap_or_else(|| threshold_for(model.model_name(), options.distance_metric));

    let elapsed = started.elapsed().as_secs_f64();
    let result = VerificationResult {
        verified: best.distance <= threshold,
        distance: best.distance,
        threshold,
        model: model.model_name().to_string(),
        detector_backend: options.extract.detector_backend.to_string(),
        similarity_metric: options.distance_metric.to_string(),
        facial_areas: FacialAreas {
            img1: rep1.facial_areas[best.idx1],
            img2: rep2.facial_areas[best.idx2],
        },
        time: (elapsed * 100.0).round() / 100.0,
    };

    tracing::debug!(
        model = %result.model,
        metric = %result.similarity_metric,
        distance = result.distance,
        threshold = result.threshold,
        verified = result.verified,
        "verification finished"
    );

    Ok(result)
}

/// Minimum-distance pair over all `embeddings1 × embeddings2`.
///
/// Ties keep the earliest pair. An empty side has no pair and is reported as
/// a detection failure for that input.
pub fn find_best_pair(
    embeddings1: &[Vec<f64>],
    embeddings2: &[Vec<f64>],
    options: &VerifyOptions,
) -> Result<BestPair, VerifyError> {
    if embeddings1.is_empty() {
        return Err(VerifyError::Detection { index: 1 });
    }
    if embeddings2.is_empty() {
        return Err(VerifyError::Detection { index: 2 });
    }

    let mut best: Option<BestPair> = None;
    for (idx1, e1) in embeddings1.iter().enumerate() {
        for (idx2, e2) in embeddings2.iter().enumerate() {
            let distance = find_distance(e1, e2, options.distance_metric).map_err(|e| match e {
                DistanceError::ZeroNorm => VerifyError::InvalidArgument(format!(
                    "cannot compute cosine distance between face {idx1} of img1 and face {idx2} of img2: {e}"
                )),
                DistanceError::LengthMismatch { .. } => VerifyError::InvalidArgument(e.to_string()),
            })?;

            if best.map_or(true, |b| distance < b.distance) {
                best = Some(BestPair {
                    distance,
                    idx1,
                    idx2,
                });
            }
        }
    }

    // Both sides are non-empty, so at least one pair was evaluated.
    best.ok_or(VerifyError::Detection { index: 1 })
}

fn represent(
    model: &dyn EmbeddingExtractor,
    input: &ImageInput,
    index: usize,
    options: &VerifyOptions,
) -> Result<Representation, VerifyError> {
    let dimension = model.dimension();

    let image = match input {
        ImageInput::Embedding(embedding) => {
            if !options.silent {
                tracing::warn!(
                    index,
                    model = model.model_name(),
                    "img{index} passed as a pre-calculated embedding; make sure it was computed by the same model"
                );
            }
            check_dimension(model, embedding.len(), index)?;
            return Ok(Representation {
                embeddings: vec![embedding.clone()],
                facial_areas: vec![FacialArea::none()],
            });
        }
        ImageInput::Path(path) => FaceImage::Path(path),
        ImageInput::Pixels(pixels) => FaceImage::Pixels(pixels),
    };

    let faces = model
        .extract(&image, &options.extract)
        .map_err(|source| match source {
            ExtractError::NoFaceDetected => VerifyError::Detection { index },
            source => VerifyError::Extraction { index, source },
        })?;

    tracing::debug!(index, faces = faces.len(), dimension, "faces extracted");

    let mut embeddings = Vec::with_capacity(faces.len());
    let mut facial_areas = Vec::with_capacity(faces.len());
    for ExtractedFace {
        embedding,
        facial_area,
        is_real,
    } in faces
    {
        if options.extract.anti_spoofing && is_real == Some(false) {
            return Err(VerifyError::SpoofDetected { index });
        }
        check_dimension(model, embedding.len(), index)?;
        embeddings.push(embedding);
        facial_areas.push(facial_area);
    }

    Ok(Representation {
        embeddings,
        facial_areas,
    })
}

fn check_dimension(model: &dyn EmbeddingExtractor, actual: usize, index: usize) -> Result<(), VerifyError> {
    if actual != model.dimension() {
        return Err(VerifyError::DimensionMismatch {
            model: model.model_name().to_string(),
            expected: model.dimension(),
            actual,
            index,
        });
    }
    Ok(())
}
