//! Boundary between verification and whatever produces face embeddings.

use std::borrow::Cow;
use std::path::Path;

use thiserror::Error;

use crate::options::{DetectorBackend, Normalization};
use crate::types::{BgrImage, FacialArea, ImageInputError};

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error(
        "face could not be detected; confirm that the picture is a face photo \
         or consider setting enforce_detection to false"
    )]
    NoFaceDetected,
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("image error: {0}")]
    Image(#[from] ImageInputError),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

impl ExtractError {
    /// True when the request itself was unusable, as opposed to a runtime failure.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ExtractError::NoFaceDetected | ExtractError::Unsupported(_) | ExtractError::Image(_)
        )
    }
}

/// Image handed to an extractor. Pre-computed embeddings never reach this point.
#[derive(Debug, Clone, Copy)]
pub enum FaceImage<'a> {
    Path(&'a Path),
    Pixels(&'a BgrImage),
}

impl FaceImage<'_> {
    /// Decoded pixels, reading the file first for path inputs.
    pub fn load(&self) -> Result<Cow<'_, BgrImage>, ImageInputError> {
        match self {
            FaceImage::Path(path) => BgrImage::open(path).map(Cow::Owned),
            FaceImage::Pixels(image) => Ok(Cow::Borrowed(*image)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractOptions {
    pub detector_backend: DetectorBackend,
    /// Fail with [`ExtractError::NoFaceDetected`] instead of returning no faces.
    pub enforce_detection: bool,
    pub align: bool,
    /// Grow each detected region by this percentage before cropping.
    pub expand_percentage: u32,
    pub normalization: Normalization,
    pub anti_spoofing: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            detector_backend: DetectorBackend::default(),
            enforce_detection: true,
            align: true,
            expand_percentage: 0,
            normalization: Normalization::default(),
            anti_spoofing: false,
        }
    }
}

/// One face found in an image.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedFace {
    pub embedding: Vec<f64>,
    pub facial_area: FacialArea,
    /// Anti-spoofing verdict, `None` when the check did not run.
    pub is_real: Option<bool>,
}

/// A loaded recognition model able to turn images into embeddings.
///
/// Implementations must be shareable across request handlers; any interior
/// state (such as an inference session) needs its own synchronization.
pub trait EmbeddingExtractor: Send + Sync {
    /// Model name used for threshold lookup and result reporting.
    fn model_name(&self) -> &str;

    /// Length of every embedding this model produces.
    fn dimension(&self) -> usize;

    /// Detect faces in `image` and compute one embedding per face.
    ///
    /// May return an empty list when `enforce_detection` is off.
    fn extract(
        &self,
        image: &FaceImage<'_>,
        options: &ExtractOptions,
    ) -> Result<Vec<ExtractedFace>, ExtractError>;
}
