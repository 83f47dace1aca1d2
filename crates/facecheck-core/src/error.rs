use thiserror::Error;

use crate::extractor::ExtractError;

/// Failure of a verification request.
///
/// `index` fields name the offending input: 1 for the first image, 2 for the second.
#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("embeddings of {model} should have {expected} dimensions, but img{index} has {actual}")]
    DimensionMismatch {
        model: String,
        expected: usize,
        actual: usize,
        index: usize,
    },
    #[error("{model} produces {actual}-dimensional embeddings, expected {expected}")]
    ModelDimension {
        model: String,
        expected: usize,
        actual: usize,
    },
    #[error("face could not be detected in img{index}")]
    Detection { index: usize },
    #[error("spoof detected in img{index}")]
    SpoofDetected { index: usize },
    #[error("exception while processing img{index}: {source}")]
    Extraction {
        index: usize,
        #[source]
        source: ExtractError,
    },
}

impl VerifyError {
    /// True for failures caused by the caller's input rather than the runtime.
    pub fn is_client_error(&self) -> bool {
        match self {
            VerifyError::Extraction { source, .. } => source.is_client_error(),
            VerifyError::ModelDimension { .. } => false,
            _ => true,
        }
    }
}
