use facecheck_core::{
    BgrImage, EmotionClassifier, EmotionError, EmotionPrediction, ImageInput, ModelRegistry, VerificationResult,
    VerifyError, VerifyOptions,
};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("emotion error: {0}")]
    Emotion(#[from] EmotionError),
    #[error(transparent)]
    Verify(#[from] VerifyError),
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Expression model driven by the engine thread.
pub trait ExpressionModel: Send + 'static {
    fn classify(&mut self, image: &BgrImage) -> Result<EmotionPrediction, EmotionError>;
}

impl ExpressionModel for EmotionClassifier {
    fn classify(&mut self, image: &BgrImage) -> Result<EmotionPrediction, EmotionError> {
        EmotionClassifier::classify(self, image)
    }
}

/// Messages sent from HTTP handlers to the engine thread.
enum EngineRequest {
    Classify {
        image: BgrImage,
        reply: oneshot::Sender<Result<EmotionPrediction, EngineError>>,
    },
    Verify {
        img1: ImageInput,
        img2: ImageInput,
        options: VerifyOptions,
        reply: oneshot::Sender<Result<VerificationResult, EngineError>>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Request the dominant expression of a face image.
    pub async fn classify(&self, image: BgrImage) -> Result<EmotionPrediction, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Classify {
                image,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }

    /// Request verification of two inputs.
    pub async fn verify(
        &self,
        img1: ImageInput,
        img2: ImageInput,
        options: VerifyOptions,
    ) -> Result<VerificationResult, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Verify {
                img1,
                img2,
                options,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }
}

/// Spawn the engine on a dedicated OS thread.
///
/// Models are loaded by the caller before this point, so a running engine
/// never waits on initialization. The thread exits once every handle is dropped.
pub fn spawn_engine<M: ExpressionModel>(
    mut classifier: M,
    registry: ModelRegistry,
    queue: usize,
) -> Result<EngineHandle, EngineError> {
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(queue);

    std::thread::Builder::new()
        .name("facecheck-engine".into())
        .spawn(move || {
            tracing::info!(models = ?registry.names(), "engine thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Classify { image, reply } => {
                        let result = classifier.classify(&image).map_err(EngineError::from);
                        let _ = reply.send(result);
                    }
                    EngineRequest::Verify {
                        img1,
                        img2,
                        options,
                        reply,
                    } => {
                        let result =
                            facecheck_core::verify(&registry, &img1, &img2, &options).map_err(EngineError::from);
                        let _ = reply.send(result);
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })?;

    Ok(EngineHandle { tx })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use facecheck_core::{EmbeddingOnlyModel, Emotion};
    use std::sync::Arc;

    /// Always answers with the same expression.
    pub(crate) struct FixedExpression(pub Emotion);

    impl ExpressionModel for FixedExpression {
        fn classify(&mut self, _image: &BgrImage) -> Result<EmotionPrediction, EmotionError> {
            let mut scores = [0.0; 7];
            let idx = Emotion::ALL.iter().position(|e| *e == self.0).unwrap_or(0);
            scores[idx] = 1.0;
            Ok(EmotionPrediction::from_scores(scores))
        }
    }

    pub(crate) fn test_engine(emotion: Emotion) -> EngineHandle {
        let mut registry = ModelRegistry::new();
        registry
            .register(Arc::new(EmbeddingOnlyModel::new("Facenet").unwrap()))
            .unwrap();
        spawn_engine(FixedExpression(emotion), registry, 2).unwrap()
    }

    #[tokio::test]
    async fn test_classify_roundtrip() {
        let engine = test_engine(Emotion::Sad);
        let image = BgrImage::from_raw(2, 2, vec![0; 12]).unwrap();
        let prediction = engine.classify(image).await.unwrap();
        assert_eq!(prediction.dominant, Emotion::Sad);
    }

    #[tokio::test]
    async fn test_verify_roundtrip() {
        let engine = test_engine(Emotion::Happy);
        let options = VerifyOptions {
            model_name: "Facenet".to_string(),
            silent: true,
            ..Default::default()
        };
        let result = engine
            .verify(
                ImageInput::Embedding(vec![0.5; 128]),
                ImageInput::Embedding(vec![0.5; 128]),
                options,
            )
            .await
            .unwrap();
        assert!(result.verified);
        assert_eq!(result.threshold, 0.40);
    }

    #[tokio::test]
    async fn test_verify_error_is_forwarded() {
        let engine = test_engine(Emotion::Happy);
        let err = engine
            .verify(
                ImageInput::Embedding(vec![0.5; 3]),
                ImageInput::Embedding(vec![0.5; 128]),
                VerifyOptions {
                    model_name: "Facenet".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Verify(VerifyError::DimensionMismatch { index: 1, .. })
        ));
    }
}
