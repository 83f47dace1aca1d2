use std::path::PathBuf;

use facecheck_core::TensorLayout;

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// Listen address (default: 0.0.0.0:5000).
    pub bind_addr: String,
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// File name of the expression model inside `model_dir`.
    pub emotion_model: String,
    /// Catalog name of the recognition model to load (default: VGG-Face).
    pub recognition_model: String,
    /// Explicit path of the recognition model, overriding `model_dir`.
    pub recognition_model_file: Option<PathBuf>,
    /// Input layout of the recognition network.
    pub recognition_layout: TensorLayout,
    /// Largest accepted request body in bytes.
    pub max_body_bytes: usize,
    /// Requests that may wait for the engine thread before senders block.
    pub request_queue: usize,
}

impl Config {
    /// Load configuration from `FACECHECK_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let model_dir = std::env::var("FACECHECK_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_model_dir());

        let recognition_layout = if env_bool("FACECHECK_RECOGNITION_NCHW", false) {
            TensorLayout::Nchw
        } else {
            TensorLayout::Nhwc
        };

        Self {
            bind_addr: std::env::var("FACECHECK_BIND").unwrap_or_else(|_| "0.0.0.0:5000".to_string()),
            model_dir,
            emotion_model: std::env::var("FACECHECK_EMOTION_MODEL")
                .unwrap_or_else(|_| "facial_expression.onnx".to_string()),
            recognition_model: std::env::var("FACECHECK_RECOGNITION_MODEL")
                .unwrap_or_else(|_| "VGG-Face".to_string()),
            recognition_model_file: std::env::var("FACECHECK_RECOGNITION_MODEL_FILE")
                .ok()
                .map(PathBuf::from),
            recognition_layout,
            max_body_bytes: env_usize("FACECHECK_MAX_BODY_BYTES", 16 * 1024 * 1024),
            request_queue: env_usize("FACECHECK_REQUEST_QUEUE", 8).max(1),
        }
    }

    /// Path to the expression model.
    pub fn emotion_model_path(&self) -> PathBuf {
        self.model_dir.join(&self.emotion_model)
    }

    /// Path to the recognition model, e.g. `vgg_face.onnx` for VGG-Face.
    pub fn recognition_model_path(&self) -> PathBuf {
        self.recognition_model_file.clone().unwrap_or_else(|| {
            let file = format!("{}.onnx", self.recognition_model.to_lowercase().replace('-', "_"));
            self.model_dir.join(file)
        })
    }
}

fn default_model_dir() -> PathBuf {
    let data_dir = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        });
    data_dir.join("facecheck").join("models")
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
        .unwrap_or(default)
}
