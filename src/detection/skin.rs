use crate::detection::{DetectionBackend, RasterRegion, contours, preprocessing};
use crate::error::DetectionError;
use crate::models::RawDetection;

/// Local face finder: skin tone mask, smoothing, connected components.
///
/// Crude next to a trained model, but it needs no weights and runs offline,
/// which makes it a usable primary backend for the CLI.
#[derive(Debug, Clone)]
pub struct SkinToneBackend {
    /// Smallest blob (in pixels) reported as a face
    pub min_area: u32,
    pub min_aspect: f32,
    pub max_aspect: f32,
    pub blur_sigma: f32,
}

impl SkinToneBackend {
    pub fn new() -> Self {
        Self {
            min_area: 64,
            min_aspect: 0.5,
            max_aspect: 2.0,
            blur_sigma: 1.5,
        }
    }

    pub fn find_faces(&self, region: &RasterRegion) -> Vec<RawDetection> {
        let mask = preprocessing::skin_mask(&region.pixels);
        let mask = preprocessing::smooth_mask(&mask, self.blur_sigma);

        contours::find_contours(&mask, self.min_area)
            .into_iter()
            .filter(|c| {
                let aspect = c.aspect_ratio();
                aspect >= self.min_aspect && aspect <= self.max_aspect
            })
            .map(|c| c.to_detection().with_class("face"))
            .collect()
    }
}

impl Default for SkinToneBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectionBackend for SkinToneBackend {
    fn name(&self) -> &str {
        "skin-tone"
    }

    fn is_ready(&self) -> bool {
        true
    }

    async fn detect(&self, region: &RasterRegion) -> Result<Vec<RawDetection>, DetectionError> {
        if region.pixels.width() == 0 || region.pixels.height() == 0 {
            return Err(DetectionError::Backend("empty region".into()));
        }
        Ok(self.find_faces(region))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};

    fn blob_image() -> DynamicImage {
        let mut img = RgbImage::from_pixel(120, 80, Rgb([30, 60, 200]));
        for y in 20..50 {
            for x in 40..64 {
                img.put_pixel(x, y, Rgb([224, 172, 140]));
            }
        }
        // A long thin streak: skin colored but not face shaped
        for y in 70..74 {
            for x in 0..100 {
                img.put_pixel(x, y, Rgb([224, 172, 140]));
            }
        }
        DynamicImage::ImageRgb8(img)
    }

    #[tokio::test]
    async fn finds_face_shaped_blob() {
        let image = blob_image();
        let faces = SkinToneBackend::new()
            .detect(&RasterRegion::full(&image))
            .await
            .unwrap();

        assert_eq!(faces.len(), 1);
        let face = &faces[0];
        assert!((face.x - 40.0).abs() <= 2.0 && (face.y - 20.0).abs() <= 2.0);
        assert!((face.width - 24.0).abs() <= 3.0 && (face.height - 30.0).abs() <= 3.0);
        assert!(face.confidence.unwrap() > 0.7);
        assert_eq!(face.class.as_deref(), Some("face"));
    }

    #[tokio::test]
    async fn plain_background_has_no_faces() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, Rgb([30, 60, 200])));
        let faces = SkinToneBackend::new()
            .detect(&RasterRegion::full(&image))
            .await
            .unwrap();
        assert!(faces.is_empty());
    }
}
