use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::VerifyError;

#[derive(Error, Debug)]
pub enum ImageInputError {
    #[error("pixel buffer holds {actual} bytes, expected {expected} for a {height}x{width} BGR image")]
    InvalidLength {
        height: u32,
        width: u32,
        expected: usize,
        actual: usize,
    },
    #[error("image is empty")]
    Empty,
    #[error("failed to open image {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Owned 8-bit image in BGR channel order, row-major, height×width×3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BgrImage {
    height: u32,
    width: u32,
    data: Vec<u8>,
}

impl BgrImage {
    /// Wrap a raw BGR buffer, checking it matches the declared size.
    pub fn from_raw(height: u32, width: u32, data: Vec<u8>) -> Result<Self, ImageInputError> {
        if height == 0 || width == 0 {
            return Err(ImageInputError::Empty);
        }
        let expected = height as usize * width as usize * 3;
        if data.len() != expected {
            return Err(ImageInputError::InvalidLength {
                height,
                width,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            height,
            width,
            data,
        })
    }

    /// Convert from an RGB image, swapping channel order.
    pub fn from_rgb(rgb: &RgbImage) -> Self {
        let data = rgb
            .pixels()
            .flat_map(|Rgb([r, g, b])| [*b, *g, *r])
            .collect();
        Self {
            height: rgb.height(),
            width: rgb.width(),
            data,
        }
    }

    /// Decode an encoded image (JPEG, PNG, ...) held in memory.
    pub fn decode(bytes: &[u8]) -> Result<Self, ImageInputError> {
        let img = image::load_from_memory(bytes)?;
        let bgr = Self::from_rgb(&img.to_rgb8());
        if bgr.data.is_empty() {
            return Err(ImageInputError::Empty);
        }
        Ok(bgr)
    }

    /// Read and decode an image file.
    pub fn open(path: &Path) -> Result<Self, ImageInputError> {
        let img = image::open(path).map_err(|source| ImageInputError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let bgr = Self::from_rgb(&img.to_rgb8());
        if bgr.data.is_empty() {
            return Err(ImageInputError::Empty);
        }
        Ok(bgr)
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// BGR triple at row `y`, column `x`.
    pub fn pixel(&self, y: u32, x: u32) -> [u8; 3] {
        let i = (y as usize * self.width as usize + x as usize) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    pub fn to_rgb(&self) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let [b, g, r] = self.pixel(y, x);
            Rgb([r, g, b])
        })
    }
}

/// One side of a verification request.
#[derive(Debug, Clone)]
pub enum ImageInput {
    /// Image file on disk.
    Path(PathBuf),
    /// Already decoded pixels.
    Pixels(BgrImage),
    /// Pre-computed embedding for the requested model.
    Embedding(Vec<f64>),
}

/// Parse a JSON array into a pre-computed embedding.
///
/// Every element must be a JSON floating-point number; integers such as `1`
/// are rejected so that image data can never be mistaken for an embedding.
pub fn embedding_from_json(values: &[serde_json::Value], index: usize) -> Result<Vec<f64>, VerifyError> {
    values
        .iter()
        .map(|v| match v {
            serde_json::Value::Number(n) if n.is_f64() => n.as_f64(),
            _ => None,
        })
        .collect::<Option<Vec<f64>>>()
        .ok_or_else(|| {
            VerifyError::InvalidArgument(format!(
                "when passing img{index} as a list, ensure that all its items are of type float"
            ))
        })
}

/// Region of a detected face. All fields are `None` when no detection took place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FacialArea {
    pub x: Option<u32>,
    pub y: Option<u32>,
    pub w: Option<u32>,
    pub h: Option<u32>,
    pub left_eye: Option<(u32, u32)>,
    pub right_eye: Option<(u32, u32)>,
}

impl FacialArea {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            w: Some(w),
            h: Some(h),
            left_eye: None,
            right_eye: None,
        }
    }

    /// Sentinel for inputs that were never run through detection.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_eyes(mut self, left: (u32, u32), right: (u32, u32)) -> Self {
        self.left_eye = Some(left);
        self.right_eye = Some(right);
        self
    }

    pub fn is_none(&self) -> bool {
        *self == Self::none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FacialAreas {
    pub img1: FacialArea,
    pub img2: FacialArea,
}

/// Outcome of comparing two face images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// `distance <= threshold`.
    pub verified: bool,
    /// Minimum distance over all face pairs.
    pub distance: f64,
    pub threshold: f64,
    pub model: String,
    pub detector_backend: String,
    pub similarity_metric: String,
    pub facial_areas: FacialAreas,
    /// Wall-clock seconds, two decimals.
    pub time: f64,
}
