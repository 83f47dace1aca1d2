use std::sync::Arc;

use anyhow::{Context, Result};
use facecheck_core::{EmbeddingOnlyModel, EmotionClassifier, ModelRegistry, OnnxRecognizer};
use tracing_subscriber::EnvFilter;

mod config;
mod engine;
mod http;

use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("facecheckd starting");

    let config = Config::from_env();

    let emotion_path = config.emotion_model_path();
    let classifier = EmotionClassifier::load(&emotion_path)
        .with_context(|| format!("loading emotion model {}", emotion_path.display()))?;

    let registry = build_registry(&config)?;
    let models = registry.names().into_iter().map(String::from).collect();

    let engine = engine::spawn_engine(classifier, registry, config.request_queue)?;
    let app = http::router(http::AppState::new(engine, models), config.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;

    tracing::info!(addr = %config.bind_addr, "facecheckd ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("facecheckd shutting down");
    Ok(())
}

/// Load the configured recognition model. Without a weights file the model
/// still serves pre-computed embeddings.
fn build_registry(config: &Config) -> Result<ModelRegistry> {
    let mut registry = ModelRegistry::new();
    let path = config.recognition_model_path();

    if path.exists() {
        let recognizer = OnnxRecognizer::load(&config.recognition_model, &path, config.recognition_layout)?;
        registry.register(Arc::new(recognizer))?;
    } else {
        tracing::warn!(
            model = %config.recognition_model,
            path = %path.display(),
            "recognition weights not found; only pre-computed embeddings can be verified"
        );
        registry.register(Arc::new(EmbeddingOnlyModel::new(&config.recognition_model)?))?;
    }

    Ok(registry)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
