//! Recognition model catalog and the registry of loaded models.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::VerifyError;
use crate::extractor::{EmbeddingExtractor, ExtractError, ExtractOptions, ExtractedFace, FaceImage};

/// Static description of a known recognition model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: &'static str,
    /// Length of the embedding vector the model outputs.
    pub dimension: usize,
    /// Network input as (height, width).
    pub input_shape: (usize, usize),
}

const fn spec(name: &'static str, dimension: usize, input_shape: (usize, usize)) -> ModelSpec {
    ModelSpec {
        name,
        dimension,
        input_shape,
    }
}

pub const CATALOG: [ModelSpec; 10] = [
    spec("VGG-Face", 4096, (224, 224)),
    spec("Facenet", 128, (160, 160)),
    spec("Facenet512", 512, (160, 160)),
    spec("OpenFace", 128, (96, 96)),
    spec("DeepFace", 4096, (152, 152)),
    spec("DeepID", 160, (55, 47)),
    spec("Dlib", 128, (150, 150)),
    spec("ArcFace", 512, (112, 112)),
    spec("SFace", 128, (112, 112)),
    spec("GhostFaceNet", 512, (112, 112)),
];

/// Look up a catalog entry by its canonical name.
pub fn model_spec(name: &str) -> Option<&'static ModelSpec> {
    CATALOG.iter().find(|s| s.name == name)
}

/// Catalog model whose weights are not loaded.
///
/// Knows its name and dimension, so pre-computed embeddings can still be
/// verified; image inputs fail with [`ExtractError::Unsupported`].
#[derive(Debug, Clone, Copy)]
pub struct EmbeddingOnlyModel {
    spec: &'static ModelSpec,
}

impl EmbeddingOnlyModel {
    pub fn new(model_name: &str) -> Result<Self, VerifyError> {
        model_spec(model_name)
            .map(|spec| Self { spec })
            .ok_or_else(|| VerifyError::InvalidArgument(format!("unknown recognition model: {model_name}")))
    }
}

impl EmbeddingExtractor for EmbeddingOnlyModel {
    fn model_name(&self) -> &str {
        self.spec.name
    }

    fn dimension(&self) -> usize {
        self.spec.dimension
    }

    fn extract(&self, _image: &FaceImage<'_>, _options: &ExtractOptions) -> Result<Vec<ExtractedFace>, ExtractError> {
        Err(ExtractError::Unsupported(format!(
            "{} weights are not loaded, pass pre-computed embeddings instead",
            self.spec.name
        )))
    }
}

/// Loaded recognition models, keyed by model name.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Default, Clone)]
pub struct ModelRegistry {
    models: HashMap<String, Arc<dyn EmbeddingExtractor>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an extractor under its own model name.
    ///
    /// An extractor claiming a catalog name must produce that model's dimension.
    pub fn register(&mut self, extractor: Arc<dyn EmbeddingExtractor>) -> Result<(), VerifyError> {
        let name = extractor.model_name().to_string();
        if let Some(spec) = model_spec(&name) {
            if spec.dimension != extractor.dimension() {
                return Err(VerifyError::ModelDimension {
                    model: name,
                    expected: spec.dimension,
                    actual: extractor.dimension(),
                });
            }
        }

        tracing::info!(model = %name, dimension = extractor.dimension(), "recognition model registered");
        self.models.insert(name, extractor);
        Ok(())
    }

    /// Resolve a loaded model by name.
    pub fn get(&self, model_name: &str) -> Result<&dyn EmbeddingExtractor, VerifyError> {
        self.models
            .get(model_name)
            .map(|m| &**m)
            .ok_or_else(|| {
                VerifyError::InvalidArgument(format!(
                    "recognition model {model_name} is not loaded (available: {})",
                    self.names().join(", ")
                ))
            })
    }

    /// Names of all loaded models, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.models.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
