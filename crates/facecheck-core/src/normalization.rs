//! Input normalization schemes expected by the various recognition networks.

use ndarray::{Array3, Axis};

use crate::options::Normalization;

const VGGFACE_MEAN: [f32; 3] = [93.5940, 104.7624, 129.1863];
const VGGFACE2_MEAN: [f32; 3] = [91.4953, 103.8827, 131.0912];

/// Normalize an HWC face crop whose values are scaled to [0, 1].
///
/// `Base` leaves the crop untouched; every other scheme first restores the
/// 0–255 range.
pub fn normalize_input(mut img: Array3<f32>, normalization: Normalization) -> Array3<f32> {
    if normalization == Normalization::Base {
        return img;
    }

    img.mapv_inplace(|v| v * 255.0);

    match normalization {
        Normalization::Base | Normalization::Raw => {}
        Normalization::Facenet => {
            let n = img.len().max(1) as f32;
            let mean = img.sum() / n;
            let std = (img.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n).sqrt();
            // Uniform crops have zero spread; centering alone keeps them finite.
            let std = if std > 0.0 { std } else { 1.0 };
            img.mapv_inplace(|v| (v - mean) / std);
        }
        Normalization::Facenet2018 => img.mapv_inplace(|v| v / 127.5 - 1.0),
        Normalization::VggFace => subtract_channel_mean(&mut img, VGGFACE_MEAN),
        Normalization::VggFace2 => subtract_channel_mean(&mut img, VGGFACE2_MEAN),
        Normalization::ArcFace => img.mapv_inplace(|v| (v - 127.5) / 128.0),
    }

    img
}

fn subtract_channel_mean(img: &mut Array3<f32>, mean: [f32; 3]) {
    for (c, mut channel) in img.axis_iter_mut(Axis(2)).enumerate() {
        if let Some(m) = mean.get(c) {
            channel.mapv_inplace(|v| v - m);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(value: f32) -> Array3<f32> {
        Array3::from_elem((2, 2, 3), value)
    }

    #[test]
    fn test_base_is_identity() {
        let img = filled(0.25);
        assert_eq!(normalize_input(img.clone(), Normalization::Base), img);
    }

    #[test]
    fn test_raw_restores_pixel_range() {
        let out = normalize_input(filled(1.0), Normalization::Raw);
        assert!(out.iter().all(|&v| (v - 255.0).abs() < 1e-4));
    }

    #[test]
    fn test_facenet2018_maps_to_unit_range() {
        let out = normalize_input(filled(1.0), Normalization::Facenet2018);
        assert!(out.iter().all(|&v| (v - 1.0).abs() < 1e-5));
        let out = normalize_input(filled(0.0), Normalization::Facenet2018);
        assert!(out.iter().all(|&v| (v + 1.0).abs() < 1e-5));
    }

    #[test]
    fn test_arcface() {
        let out = normalize_input(filled(0.5), Normalization::ArcFace);
        let expected = (127.5 - 127.5) / 128.0;
        assert!(out.iter().all(|&v| (v - expected).abs() < 1e-5));
    }

    #[test]
    fn test_facenet_standardizes() {
        let mut img = Array3::zeros((1, 2, 3));
        img[[0, 1, 0]] = 1.0;
        img[[0, 1, 1]] = 1.0;
        img[[0, 1, 2]] = 1.0;
        let out = normalize_input(img, Normalization::Facenet);

        let n = out.len() as f32;
        let mean = out.sum() / n;
        let var = out.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
        assert!(mean.abs() < 1e-5);
        assert!((var - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_facenet_uniform_crop_stays_finite() {
        let out = normalize_input(filled(0.3), Normalization::Facenet);
        assert!(out.iter().all(|v| v.is_finite() && v.abs() < 1e-4));
    }

    #[test]
    fn test_vggface_subtracts_per_channel() {
        let out = normalize_input(filled(0.0), Normalization::VggFace);
        assert!((out[[0, 0, 0]] + 93.5940).abs() < 1e-3);
        assert!((out[[1, 1, 1]] + 104.7624).abs() < 1e-3);
        assert!((out[[0, 1, 2]] + 129.1863).abs() < 1e-3);

        let out = normalize_input(filled(0.0), Normalization::VggFace2);
        assert!((out[[0, 0, 2]] + 131.0912).abs() < 1e-3);
    }
}
