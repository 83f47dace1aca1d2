use std::sync::Arc;

use facecheck_core::{
    verify, BgrImage, DistanceMetric, EmbeddingExtractor, ExtractError, ExtractOptions, ExtractedFace, FaceImage,
    FacialArea, ImageInput, ModelRegistry, VerifyError, VerifyOptions, VerifyParams,
};

#[derive(Clone, Copy)]
enum Behavior {
    /// One face whose embedding is the mean B, G, R (+1) of the image.
    MeanColor,
    /// Two faces: the mean color and its reverse.
    TwoFaces,
    NoFace,
    Spoof,
    WrongDimension,
}

struct FakeExtractor {
    name: &'static str,
    dimension: usize,
    behavior: Behavior,
}

impl FakeExtractor {
    fn registry(name: &'static str, dimension: usize, behavior: Behavior) -> ModelRegistry {
        let mut registry = ModelRegistry::new();
        registry
            .register(Arc::new(FakeExtractor {
                name,
                dimension,
                behavior,
            }))
            .unwrap();
        registry
    }
}

fn mean_color(image: &BgrImage) -> Vec<f64> {
    let pixels = (image.height() * image.width()) as f64;
    let mut sums = [0.0f64; 3];
    for chunk in image.as_bytes().chunks(3) {
        for (s, &v) in sums.iter_mut().zip(chunk) {
            *s += v as f64;
        }
    }
    sums.iter().map(|s| s / pixels + 1.0).collect()
}

impl EmbeddingExtractor for FakeExtractor {
    fn model_name(&self) -> &str {
        self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn extract(
        &self,
        image: &FaceImage<'_>,
        options: &ExtractOptions,
    ) -> Result<Vec<ExtractedFace>, ExtractError> {
        let image = image.load()?;
        let area = FacialArea::new(0, 0, image.width(), image.height());
        let face = |embedding: Vec<f64>, area: FacialArea| ExtractedFace {
            embedding,
            facial_area: area,
            is_real: None,
        };

        match self.behavior {
            Behavior::MeanColor => Ok(vec![face(mean_color(&image), area)]),
            Behavior::TwoFaces => {
                let forward = mean_color(&image);
                let reversed: Vec<f64> = forward.iter().rev().copied().collect();
                Ok(vec![
                    face(reversed, FacialArea::new(1, 1, 1, 1)),
                    face(forward, FacialArea::new(2, 2, 2, 2)),
                ])
            }
            Behavior::NoFace if options.enforce_detection => Err(ExtractError::NoFaceDetected),
            Behavior::NoFace => Ok(Vec::new()),
            Behavior::Spoof => Ok(vec![ExtractedFace {
                is_real: Some(false),
                ..face(mean_color(&image), area)
            }]),
            Behavior::WrongDimension => Ok(vec![face(vec![1.0; self.dimension + 1], area)]),
        }
    }
}

fn solid(b: u8, g: u8, r: u8) -> BgrImage {
    let data = [b, g, r].repeat(16 * 12);
    BgrImage::from_raw(16, 12, data).unwrap()
}

fn options_for(model: &str) -> VerifyOptions {
    VerifyOptions {
        model_name: model.to_string(),
        ..Default::default()
    }
}

#[test]
fn identical_images_verify_with_zero_distance() {
    let registry = FakeExtractor::registry("toy", 3, Behavior::MeanColor);
    let img = ImageInput::Pixels(solid(10, 200, 30));
    let mut options = options_for("toy");
    options.extract.enforce_detection = false;

    let result = verify(&registry, &img, &img, &options).unwrap();
    assert!(result.distance.abs() < 1e-9);
    assert!(result.verified);
    assert_eq!(result.threshold, 0.40);
    assert_eq!(result.model, "toy");
    assert_eq!(result.detector_backend, "opencv");
    assert_eq!(result.similarity_metric, "cosine");
    assert_eq!(result.facial_areas.img1, FacialArea::new(0, 0, 12, 16));
    assert!(result.time >= 0.0);
}

#[test]
fn different_images_are_not_verified() {
    let registry = FakeExtractor::registry("toy", 3, Behavior::MeanColor);
    let blue = ImageInput::Pixels(solid(255, 0, 0));
    let red = ImageInput::Pixels(solid(0, 0, 255));

    let result = verify(&registry, &blue, &red, &options_for("toy")).unwrap();
    assert!(result.distance > 0.9);
    assert!(!result.verified);
    assert_eq!(result.verified, result.distance <= result.threshold);
}

#[test]
fn precomputed_embeddings_match() {
    let registry = FakeExtractor::registry("toy2d", 2, Behavior::MeanColor);
    let a = ImageInput::Embedding(vec![1.0, 0.0]);
    let b = ImageInput::Embedding(vec![1.0, 0.0]);

    let result = verify(&registry, &a, &b, &options_for("toy2d")).unwrap();
    assert_eq!(result.distance, 0.0);
    assert!(result.verified);
    assert!(result.facial_areas.img1.is_none());
    assert!(result.facial_areas.img2.is_none());
}

#[test]
fn precomputed_embedding_of_wrong_length_fails() {
    let registry = FakeExtractor::registry("Facenet", 128, Behavior::MeanColor);
    let short = ImageInput::Embedding(vec![0.5; 10]);
    let ok = ImageInput::Embedding(vec![0.5; 128]);

    let err = verify(&registry, &ok, &short, &options_for("Facenet")).unwrap_err();
    assert!(matches!(
        err,
        VerifyError::DimensionMismatch { expected: 128, actual: 10, index: 2, .. }
    ));
}

#[test]
fn extracted_embedding_of_wrong_length_fails() {
    let registry = FakeExtractor::registry("toy", 3, Behavior::WrongDimension);
    let img = ImageInput::Pixels(solid(1, 2, 3));
    let err = verify(&registry, &img, &img, &options_for("toy")).unwrap_err();
    assert!(matches!(err, VerifyError::DimensionMismatch { index: 1, .. }));
}

#[test]
fn unloaded_model_is_invalid_argument() {
    let registry = FakeExtractor::registry("toy", 3, Behavior::MeanColor);
    let img = ImageInput::Embedding(vec![1.0, 0.0, 0.0]);
    let err = verify(&registry, &img, &img, &options_for("VGG-Face")).unwrap_err();
    assert!(matches!(err, VerifyError::InvalidArgument(_)));
}

#[test]
fn bogus_metric_is_invalid_argument() {
    let params = VerifyParams {
        distance_metric: "bogus".to_string(),
        ..Default::default()
    };
    assert!(matches!(
        VerifyOptions::try_from(params),
        Err(VerifyError::InvalidArgument(_))
    ));
}

#[test]
fn enforced_detection_without_face_names_the_input() {
    let registry = FakeExtractor::registry("toy", 3, Behavior::NoFace);
    let img = ImageInput::Pixels(solid(1, 2, 3));
    let emb = ImageInput::Embedding(vec![1.0, 2.0, 3.0]);

    let err = verify(&registry, &emb, &img, &options_for("toy")).unwrap_err();
    assert!(matches!(err, VerifyError::Detection { index: 2 }));
}

#[test]
fn no_face_without_enforcement_is_still_a_detection_error() {
    let registry = FakeExtractor::registry("toy", 3, Behavior::NoFace);
    let img = ImageInput::Pixels(solid(1, 2, 3));
    let mut options = options_for("toy");
    options.extract.enforce_detection = false;

    let err = verify(&registry, &img, &img, &options).unwrap_err();
    assert!(matches!(err, VerifyError::Detection { index: 1 }));
}

#[test]
fn spoofed_face_fails_only_with_anti_spoofing() {
    let registry = FakeExtractor::registry("toy", 3, Behavior::Spoof);
    let img = ImageInput::Pixels(solid(1, 2, 3));

    let mut options = options_for("toy");
    assert!(verify(&registry, &img, &img, &options).is_ok());

    options.extract.anti_spoofing = true;
    let err = verify(&registry, &img, &img, &options).unwrap_err();
    assert!(matches!(err, VerifyError::SpoofDetected { index: 1 }));
}

#[test]
fn unreadable_path_is_wrapped_with_input_index() {
    let registry = FakeExtractor::registry("toy", 3, Behavior::MeanColor);
    let good = ImageInput::Pixels(solid(1, 2, 3));
    let missing = ImageInput::Path("/nonexistent/face.png".into());

    let err = verify(&registry, &good, &missing, &options_for("toy")).unwrap_err();
    assert!(matches!(err, VerifyError::Extraction { index: 2, .. }));
    assert!(err.is_client_error());
    assert!(err.to_string().contains("img2"));
}

#[test]
fn path_and_pixel_inputs_agree() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("face.png");
    let img = solid(40, 80, 120);
    img.to_rgb().save(&path).unwrap();

    let registry = FakeExtractor::registry("toy", 3, Behavior::MeanColor);
    let result = verify(
        &registry,
        &ImageInput::Path(path),
        &ImageInput::Pixels(img),
        &options_for("toy"),
    )
    .unwrap();
    assert!(result.distance.abs() < 1e-9);
    assert!(result.verified);
}

#[test]
fn closest_face_pair_wins_and_reports_its_area() {
    let registry = FakeExtractor::registry("toy", 3, Behavior::TwoFaces);
    let img = ImageInput::Pixels(solid(10, 100, 250));
    let mut options = options_for("toy");
    options.distance_metric = DistanceMetric::Euclidean;

    let result = verify(&registry, &img, &img, &options).unwrap();
    // (reversed, reversed) at index (0, 0) is the first zero-distance pair.
    assert_eq!(result.distance, 0.0);
    assert_eq!(result.facial_areas.img1, FacialArea::new(1, 1, 1, 1));
    assert_eq!(result.facial_areas.img2, FacialArea::new(1, 1, 1, 1));
}

#[test]
fn threshold_comes_from_table_or_override() {
    let registry = FakeExtractor::registry("ArcFace", 512, Behavior::MeanColor);
    let mut a = vec![0.0; 512];
    a[0] = 1.0;
    let mut b = vec![0.0; 512];
    b[0] = 1.0;
    b[1] = 0.5;
    let (a, b) = (ImageInput::Embedding(a), ImageInput::Embedding(b));

    let mut options = options_for("ArcFace");
    options.distance_metric = DistanceMetric::EuclideanL2;
    let result = verify(&registry, &a, &b, &options).unwrap();
    assert_eq!(result.threshold, 1.13);
    assert!(result.verified);

    options.threshold = Some(0.0);
    let result = verify(&registry, &a, &b, &options).unwrap();
    assert_eq!(result.threshold, 0.0);
    assert!(!result.verified);
}

#[test]
fn result_serializes_with_expected_fields() {
    let registry = FakeExtractor::registry("toy2d", 2, Behavior::MeanColor);
    let a = ImageInput::Embedding(vec![1.0, 0.0]);
    let mut options = options_for("toy2d");
    options.silent = true;

    let result = verify(&registry, &a, &a, &options).unwrap();
    let value = serde_json::to_value(&result).unwrap();
    for key in [
        "verified",
        "distance",
        "threshold",
        "model",
        "detector_backend",
        "similarity_metric",
        "facial_areas",
        "time",
    ] {
        assert!(value.get(key).is_some(), "missing {key}");
    }
    assert!(value["facial_areas"]["img1"]["x"].is_null());
}
