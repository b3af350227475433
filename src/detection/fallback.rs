use crate::config::Config;
use crate::detection::{DedupPolicy, Detector, RasterRegion};
use crate::error::DetectionError;
use crate::models::RawDetection;

/// Face centers as fractions of the source image (x, y)
pub const FALLBACK_POSITIONS: [(f32, f32); 5] = [
    (0.2, 0.35),
    (0.5, 0.3),
    (0.8, 0.35),
    (0.35, 0.65),
    (0.65, 0.65),
];

/// Face box side as a fraction of the shorter image side
pub const FALLBACK_FACE_FRACTION: f32 = 0.1;

/// Stand-in detector used when no backend comes up.
///
/// Always places the same five face-sized boxes relative to the whole
/// source image, whichever region is being scanned, so every pass agrees
/// and the result is reproducible.
#[derive(Debug, Clone, Default)]
pub struct FallbackDetector;

impl FallbackDetector {
    pub fn new() -> Self {
        Self
    }

    /// The fixed boxes for a `width` x `height` image, in image coordinates
    pub fn faces_for(width: u32, height: u32) -> Vec<RawDetection> {
        let (w, h) = (width as f32, height as f32);
        let size = w.min(h) * FALLBACK_FACE_FRACTION;
        if size <= 0.0 {
            return Vec::new();
        }
        FALLBACK_POSITIONS
            .iter()
            .map(|&(fx, fy)| {
                RawDetection::new(w * fx - size / 2.0, h * fy - size / 2.0, size, size)
            })
            .collect()
    }
}

impl Detector for FallbackDetector {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn detect(&self, region: &RasterRegion) -> Result<Vec<RawDetection>, DetectionError> {
        let tile = region.tile;
        let dx = tile.offset_x as f32;
        let dy = tile.offset_y as f32;
        Ok(Self::faces_for(region.source_width, region.source_height)
            .into_iter()
            .filter(|face| tile.contains(face))
            .map(|face| face.translated(-dx, -dy))
            .collect())
    }

    fn preferred_policy(&self, config: &Config) -> DedupPolicy {
        DedupPolicy::CenterDistance {
            min_distance: config.dedup.min_center_distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Tile;
    use image::DynamicImage;

    fn assert_near(actual: (f32, f32), expected: (f32, f32)) {
        assert!(
            (actual.0 - expected.0).abs() < 1e-3 && (actual.1 - expected.1).abs() < 1e-3,
            "{actual:?} != {expected:?}"
        );
    }

    #[tokio::test]
    async fn full_region_gets_five_faces() {
        let image = DynamicImage::new_rgb8(200, 200);
        let faces = FallbackDetector.detect(&RasterRegion::full(&image)).await.unwrap();
        assert_eq!(faces.len(), 5);
        assert_near((faces[0].x, faces[0].y), (30.0, 60.0));
        assert!((faces[0].width - 20.0).abs() < 1e-3);
        assert_near(faces[1].center(), (100.0, 60.0));
        assert!(faces.iter().all(|f| f.confidence.is_none() && f.class.is_none()));
    }

    #[tokio::test]
    async fn tile_gets_contained_faces_in_local_coordinates() {
        let image = DynamicImage::new_rgb8(200, 200);
        let tile = Tile {
            offset_x: 80,
            offset_y: 0,
            width: 120,
            height: 120,
        };
        let faces = FallbackDetector.detect(&RasterRegion::crop(&image, tile, 1)).await.unwrap();
        // (0.5, 0.3) and (0.8, 0.35) lie in the top-right tile
        assert_eq!(faces.len(), 2);
        assert_near(faces[0].center(), (20.0, 60.0));
        assert_near(faces[1].center(), (80.0, 70.0));
    }

    #[test]
    fn empty_image_has_no_faces() {
        assert!(FallbackDetector::faces_for(0, 100).is_empty());
    }
}
