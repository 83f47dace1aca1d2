//! Verification options: the string-typed request form and its validated form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::distance::DistanceMetric;
use crate::error::VerifyError;
use crate::extractor::ExtractOptions;

/// Face detector an extractor should use before computing embeddings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DetectorBackend {
    #[default]
    OpenCv,
    RetinaFace,
    Mtcnn,
    Ssd,
    Dlib,
    MediaPipe,
    YoloV8,
    CenterFace,
    /// No detection: the whole image is treated as the face.
    Skip,
}

impl DetectorBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorBackend::OpenCv => "opencv",
            DetectorBackend::RetinaFace => "retinaface",
            DetectorBackend::Mtcnn => "mtcnn",
            DetectorBackend::Ssd => "ssd",
            DetectorBackend::Dlib => "dlib",
            DetectorBackend::MediaPipe => "mediapipe",
            DetectorBackend::YoloV8 => "yolov8",
            DetectorBackend::CenterFace => "centerface",
            DetectorBackend::Skip => "skip",
        }
    }
}

impl fmt::Display for DetectorBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetectorBackend {
    type Err = VerifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "opencv" => DetectorBackend::OpenCv,
            "retinaface" => DetectorBackend::RetinaFace,
            "mtcnn" => DetectorBackend::Mtcnn,
            "ssd" => DetectorBackend::Ssd,
            "dlib" => DetectorBackend::Dlib,
            "mediapipe" => DetectorBackend::MediaPipe,
            "yolov8" => DetectorBackend::YoloV8,
            "centerface" => DetectorBackend::CenterFace,
            "skip" => DetectorBackend::Skip,
            other => {
                return Err(VerifyError::InvalidArgument(format!(
                    "invalid detector_backend passed: {other}"
                )))
            }
        })
    }
}

/// Pixel normalization applied to a face crop before recognition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Normalization {
    #[default]
    Base,
    Raw,
    Facenet,
    Facenet2018,
    VggFace,
    VggFace2,
    ArcFace,
}

impl Normalization {
    pub fn as_str(&self) -> &'static str {
        match self {
            Normalization::Base => "base",
            Normalization::Raw => "raw",
            Normalization::Facenet => "Facenet",
            Normalization::Facenet2018 => "Facenet2018",
            Normalization::VggFace => "VGGFace",
            Normalization::VggFace2 => "VGGFace2",
            Normalization::ArcFace => "ArcFace",
        }
    }
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Normalization {
    type Err = VerifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "base" => Normalization::Base,
            "raw" => Normalization::Raw,
            "Facenet" => Normalization::Facenet,
            "Facenet2018" => Normalization::Facenet2018,
            "VGGFace" => Normalization::VggFace,
            "VGGFace2" => Normalization::VggFace2,
            "ArcFace" => Normalization::ArcFace,
            other => {
                return Err(VerifyError::InvalidArgument(format!(
                    "unimplemented normalization type: {other}"
                )))
            }
        })
    }
}

/// Verification parameters as they arrive over the wire or the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyParams {
    pub model_name: String,
    pub detector_backend: String,
    pub distance_metric: String,
    pub enforce_detection: bool,
    pub align: bool,
    pub expand_percentage: i32,
    pub normalization: String,
    pub threshold: Option<f64>,
    pub anti_spoofing: bool,
    pub silent: bool,
}

impl Default for VerifyParams {
    fn default() -> Self {
        Self {
            model_name: "VGG-Face".to_string(),
            detector_backend: DetectorBackend::default().as_str().to_string(),
            distance_metric: DistanceMetric::default().as_str().to_string(),
            enforce_detection: true,
            align: true,
            expand_percentage: 0,
            normalization: Normalization::default().as_str().to_string(),
            threshold: None,
            anti_spoofing: false,
            silent: false,
        }
    }
}

/// Validated verification options.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyOptions {
    pub model_name: String,
    pub distance_metric: DistanceMetric,
    /// Overrides the pre-tuned threshold when set, including `Some(0.0)`.
    pub threshold: Option<f64>,
    /// Suppresses the warning logged for pre-computed embeddings.
    pub silent: bool,
    pub extract: ExtractOptions,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            model_name: "VGG-Face".to_string(),
            distance_metric: DistanceMetric::default(),
            threshold: None,
            silent: false,
            extract: ExtractOptions::default(),
        }
    }
}

impl TryFrom<VerifyParams> for VerifyOptions {
    type Error = VerifyError;

    fn try_from(params: VerifyParams) -> Result<Self, Self::Error> {
        let distance_metric: DistanceMetric = params.distance_metric.parse()?;
        let detector_backend: DetectorBackend = params.detector_backend.parse()?;
        let normalization: Normalization = params.normalization.parse()?;

        if let Some(threshold) = params.threshold {
            if !threshold.is_finite() {
                return Err(VerifyError::InvalidArgument(format!(
                    "threshold must be a finite number, got {threshold}"
                )));
            }
        }

        let expand_percentage = if params.expand_percentage < 0 {
            tracing::warn!(
                expand_percentage = params.expand_percentage,
                "negative expand_percentage, using 0 instead"
            );
            0
        } else {
            params.expand_percentage as u32
        };

        Ok(Self {
            model_name: params.model_name,
            distance_metric,
            threshold: params.threshold,
            silent: params.silent,
            extract: ExtractOptions {
                detector_backend,
                enforce_detection: params.enforce_detection,
                align: params.align,
                expand_percentage,
                normalization,
                anti_spoofing: params.anti_spoofing,
            },
        })
    }
}
