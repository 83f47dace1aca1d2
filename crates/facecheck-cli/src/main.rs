use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facecheck_core::{
    embedding_from_json, find_distance, find_threshold, BgrImage, DistanceMetric, EmbeddingOnlyModel,
    EmotionClassifier, ImageInput, ModelRegistry, OnnxRecognizer, TensorLayout, VerifyOptions, VerifyParams,
};

#[derive(Parser)]
#[command(name = "facecheck", about = "Face verification and expression analysis")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify whether two inputs show the same person
    Verify {
        /// First image, or a .json file holding a pre-computed embedding
        img1: PathBuf,
        /// Second image, or a .json file holding a pre-computed embedding
        img2: PathBuf,
        /// Recognition model name (e.g. "VGG-Face", "ArcFace")
        #[arg(long, default_value = "VGG-Face")]
        model: String,
        /// ONNX export of the recognition model; without it only embeddings are accepted
        #[arg(long)]
        model_file: Option<PathBuf>,
        /// The recognition network takes NCHW input instead of NHWC
        #[arg(long)]
        nchw: bool,
        #[arg(long, default_value = "skip")]
        backend: String,
        #[arg(long, default_value = "cosine")]
        metric: String,
        #[arg(long, default_value = "base")]
        normalization: String,
        /// Override the pre-tuned threshold
        #[arg(long)]
        threshold: Option<f64>,
        #[arg(long)]
        no_enforce_detection: bool,
        /// Do not warn about pre-computed embeddings
        #[arg(long)]
        silent: bool,
    },
    /// Classify the facial expression in an image
    Emotion {
        image: PathBuf,
        /// ONNX expression model (48x48 grayscale input)
        #[arg(long)]
        model_file: PathBuf,
    },
    /// Print the pre-tuned threshold for a model and metric
    Threshold { model: String, metric: String },
    /// Distance between two embeddings stored as JSON arrays
    Distance {
        a: PathBuf,
        b: PathBuf,
        #[arg(long, default_value = "cosine")]
        metric: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Verify {
            img1,
            img2,
            model,
            model_file,
            nchw,
            backend,
            metric,
            normalization,
            threshold,
            no_enforce_detection,
            silent,
        } => {
            let params = VerifyParams {
                model_name: model.clone(),
                detector_backend: backend,
                distance_metric: metric,
                enforce_detection: !no_enforce_detection,
                normalization,
                threshold,
                silent,
                ..Default::default()
            };
            let options = VerifyOptions::try_from(params)?;

            let layout = if nchw { TensorLayout::Nchw } else { TensorLayout::Nhwc };
            let registry = build_registry(&model, model_file.as_deref(), layout)?;

            let input1 = load_input(&img1, 1)?;
            let input2 = load_input(&img2, 2)?;
            let result = facecheck_core::verify(&registry, &input1, &input2, &options)?;
            tracing::debug!(
                model = %model,
                verified = result.verified,
                distance = result.distance,
                "verification finished"
            );
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Emotion { image, model_file } => {
            let mut classifier = EmotionClassifier::load(&model_file)?;
            let img = BgrImage::open(&image)?;
            let prediction = classifier.classify(&img)?;
            println!("{}", serde_json::to_string_pretty(&prediction)?);
        }
        Commands::Threshold { model, metric } => {
            println!("{}", find_threshold(&model, &metric));
        }
        Commands::Distance { a, b, metric } => {
            let metric: DistanceMetric = metric.parse()?;
            let a = read_embedding(&a, 1)?;
            let b = read_embedding(&b, 2)?;
            println!("{}", find_distance(&a, &b, metric)?);
        }
    }

    Ok(())
}

fn build_registry(model: &str, model_file: Option<&Path>, layout: TensorLayout) -> Result<ModelRegistry> {
    let mut registry = ModelRegistry::new();
    match model_file {
        Some(path) => registry.register(Arc::new(OnnxRecognizer::load(model, path, layout)?))?,
        None => registry.register(Arc::new(EmbeddingOnlyModel::new(model)?))?,
    }
    Ok(registry)
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Read a JSON array of floats from `path`.
fn read_embedding(path: &Path, index: usize) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let values: Vec<serde_json::Value> =
        serde_json::from_str(&text).with_context(|| format!("{} is not a JSON array", path.display()))?;
    Ok(embedding_from_json(&values, index)?)
}

/// JSON files are pre-computed embeddings; anything else is an image path.
fn load_input(path: &Path, index: usize) -> Result<ImageInput> {
    if is_json(path) {
        Ok(ImageInput::Embedding(read_embedding(path, index)?))
    } else {
        Ok(ImageInput::Path(path.to_path_buf()))
    }
}
