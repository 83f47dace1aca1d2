//! Face recognition via ONNX Runtime on whole images.
//!
//! Runs any catalog recognition model exported to ONNX. No detector is
//! involved: the full frame is treated as the face, so only the `skip`
//! detector backend is accepted.

use std::path::Path;
use std::sync::Mutex;

use image::imageops::{self, FilterType};
use ndarray::{Array3, Array4, Axis};
use ort::session::Session;
use ort::value::TensorRef;
use thiserror::Error;

use crate::extractor::{EmbeddingExtractor, ExtractError, ExtractOptions, ExtractedFace, FaceImage};
use crate::models::{model_spec, ModelSpec};
use crate::normalization::normalize_input;
use crate::options::{DetectorBackend, Normalization};
use crate::types::{BgrImage, FacialArea};

#[derive(Error, Debug)]
pub enum RecognizerError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("unknown recognition model: {0}")]
    UnknownModel(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Memory layout of the network input tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TensorLayout {
    /// (1, height, width, 3), as exported from Keras.
    #[default]
    Nhwc,
    /// (1, 3, height, width), as exported from PyTorch.
    Nchw,
}

/// Whole-image recognizer backed by an ONNX session.
pub struct OnnxRecognizer {
    spec: &'static ModelSpec,
    layout: TensorLayout,
    session: Mutex<Session>,
}

impl OnnxRecognizer {
    /// Load the ONNX export of catalog model `model_name` from `model_path`.
    pub fn load(model_name: &str, model_path: &Path, layout: TensorLayout) -> Result<Self, RecognizerError> {
        let spec = model_spec(model_name).ok_or_else(|| RecognizerError::UnknownModel(model_name.to_string()))?;

        if !model_path.exists() {
            return Err(RecognizerError::ModelNotFound(model_path.display().to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            model = spec.name,
            path = %model_path.display(),
            layout = ?layout,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded recognition model"
        );

        Ok(Self {
            spec,
            layout,
            session: Mutex::new(session),
        })
    }

    /// Resize `image` into the network input, keeping aspect ratio and
    /// padding the remainder with black, then normalize.
    ///
    /// Channels are fed in BGR order.
    fn preprocess(
        image: &BgrImage,
        input_shape: (usize, usize),
        normalization: Normalization,
        layout: TensorLayout,
    ) -> Array4<f32> {
        let (target_h, target_w) = input_shape;
        let (h, w) = (image.height() as f32, image.width() as f32);
        let factor = (target_h as f32 / h).min(target_w as f32 / w);
        let new_h = ((h * factor).round() as u32).clamp(1, target_h as u32);
        let new_w = ((w * factor).round() as u32).clamp(1, target_w as u32);

        let resized = imageops::resize(&image.to_rgb(), new_w, new_h, FilterType::Triangle);
        let pad_y = (target_h - new_h as usize) / 2;
        let pad_x = (target_w - new_w as usize) / 2;

        let mut hwc = Array3::<f32>::zeros((target_h, target_w, 3));
        for (x, y, pixel) in resized.enumerate_pixels() {
            let [r, g, b] = pixel.0;
            for (c, value) in [b, g, r].into_iter().enumerate() {
                hwc[[y as usize + pad_y, x as usize + pad_x, c]] = value as f32 / 255.0;
            }
        }

        let hwc = normalize_input(hwc, normalization);
        match layout {
            TensorLayout::Nhwc => hwc.insert_axis(Axis(0)),
            TensorLayout::Nchw => hwc
                .permuted_axes([2, 0, 1])
                .insert_axis(Axis(0))
                .as_standard_layout()
                .into_owned(),
        }
    }
}

impl EmbeddingExtractor for OnnxRecognizer {
    fn model_name(&self) -> &str {
        self.spec.name
    }

    fn dimension(&self) -> usize {
        self.spec.dimension
    }

    fn extract(
        &self,
        image: &FaceImage<'_>,
        options: &ExtractOptions,
    ) -> Result<Vec<ExtractedFace>, ExtractError> {
        if options.detector_backend != DetectorBackend::Skip {
            return Err(ExtractError::Unsupported(format!(
                "detector backend {} is not available, use skip",
                options.detector_backend
            )));
        }
        if options.anti_spoofing {
            return Err(ExtractError::Unsupported(
                "anti-spoofing requires a detector backend".to_string(),
            ));
        }

        let image = image.load()?;
        let input = Self::preprocess(&image, self.spec.input_shape, options.normalization, self.layout);

        let mut session = self
            .session
            .lock()
            .map_err(|_| ExtractError::InferenceFailed("recognition session poisoned".to_string()))?;
        let outputs = session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ExtractError::InferenceFailed(format!("embedding extraction: {e}")))?;

        if raw.len() != self.spec.dimension {
            return Err(ExtractError::InferenceFailed(format!(
                "expected {}-dim embedding from {}, got {}",
                self.spec.dimension,
                self.spec.name,
                raw.len()
            )));
        }

        Ok(vec![ExtractedFace {
            embedding: raw.iter().map(|&v| f64::from(v)).collect(),
            facial_area: FacialArea::new(0, 0, image.width(), image.height()),
            is_real: None,
        }])
    }
}
