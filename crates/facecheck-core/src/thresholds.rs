//! Pre-tuned same-person distance thresholds per recognition model and metric.

use crate::distance::DistanceMetric;

/// Thresholds used when the model name is not in [`THRESHOLDS`].
const BASE_THRESHOLDS: MetricThresholds = MetricThresholds {
    cosine: 0.40,
    euclidean: 0.55,
    euclidean_l2: 0.75,
};

/// Threshold for a known model paired with an unknown metric name.
const UNKNOWN_METRIC_THRESHOLD: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricThresholds {
    pub cosine: f64,
    pub euclidean: f64,
    pub euclidean_l2: f64,
}

impl MetricThresholds {
    pub fn get(&self, metric: DistanceMetric) -> f64 {
        match metric {
            DistanceMetric::Cosine => self.cosine,
            DistanceMetric::Euclidean => self.euclidean,
            DistanceMetric::EuclideanL2 => self.euclidean_l2,
        }
    }
}

const fn t(cosine: f64, euclidean: f64, euclidean_l2: f64) -> MetricThresholds {
    MetricThresholds {
        cosine,
        euclidean,
        euclidean_l2,
    }
}

/// Empirically tuned thresholds (VGG-Face values are for its 4096-d output, tuned on LFW).
pub const THRESHOLDS: [(&str, MetricThresholds); 10] = [
    ("VGG-Face", t(0.68, 1.17, 1.17)),
    ("Facenet", t(0.40, 10.0, 0.80)),
    ("Facenet512", t(0.30, 23.56, 1.04)),
    ("ArcFace", t(0.68, 4.15, 1.13)),
    ("Dlib", t(0.07, 0.6, 0.4)),
    ("SFace", t(0.593, 10.734, 1.055)),
    ("OpenFace", t(0.10, 0.55, 0.55)),
    ("DeepFace", t(0.23, 64.0, 0.64)),
    ("DeepID", t(0.015, 45.0, 0.17)),
    ("GhostFaceNet", t(0.65, 35.71, 1.10)),
];

fn model_thresholds(model_name: &str) -> Option<&'static MetricThresholds> {
    THRESHOLDS
        .iter()
        .find(|(name, _)| *name == model_name)
        .map(|(_, thresholds)| thresholds)
}

/// Threshold for a model and a typed metric, falling back to the base table
/// for unknown models.
pub fn threshold_for(model_name: &str, metric: DistanceMetric) -> f64 {
    model_thresholds(model_name)
        .unwrap_or(&BASE_THRESHOLDS)
        .get(metric)
}

/// Threshold lookup by names.
///
/// Unknown model → base thresholds; unknown metric → 0.4.
pub fn find_threshold(model_name: &str, metric: &str) -> f64 {
    match metric.parse::<DistanceMetric>() {
        Ok(metric) => threshold_for(model_name, metric),
        Err(_) => UNKNOWN_METRIC_THRESHOLD,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_model_values() {
        assert_eq!(find_threshold("Facenet512", "cosine"), 0.30);
        assert_eq!(find_threshold("VGG-Face", "euclidean_l2"), 1.17);
        assert_eq!(find_threshold("SFace", "euclidean"), 10.734);
        assert_eq!(find_threshold("DeepID", "cosine"), 0.015);
    }

    #[test]
    fn test_unknown_model_uses_base() {
        assert_eq!(find_threshold("unknown-model", "cosine"), 0.40);
        assert_eq!(find_threshold("unknown-model", "euclidean"), 0.55);
        assert_eq!(find_threshold("unknown-model", "euclidean_l2"), 0.75);
    }

    #[test]
    fn test_unknown_metric_falls_back() {
        assert_eq!(find_threshold("ArcFace", "manhattan"), 0.4);
        assert_eq!(find_threshold("unknown-model", "manhattan"), 0.4);
    }

    #[test]
    fn test_lookup_is_pure() {
        let first = find_threshold("GhostFaceNet", "euclidean");
        for _ in 0..3 {
            assert_eq!(find_threshold("GhostFaceNet", "euclidean"), first);
        }
    }

    #[test]
    fn test_typed_matches_string_lookup() {
        for (name, _) in THRESHOLDS {
            for metric in DistanceMetric::ALL {
                assert_eq!(threshold_for(name, metric), find_threshold(name, metric.as_str()));
            }
        }
    }
}
