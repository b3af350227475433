use image::DynamicImage;

use crate::config::TilingConfig;
use crate::detection::{Detector, RasterRegion, tile_image};
use crate::error::RegionDetectionFailed;
use crate::models::{DetectionPool, RawDetection};
use crate::pipeline::{DebugStage, PipelineContext};

/// Map a region-local detection into source image coordinates.
///
/// The box is clipped to the region, offset by the tile origin, then
/// clipped to the image. None if nothing with positive area survives.
pub fn translate_to_image(detection: &RawDetection, region: &RasterRegion) -> Option<RawDetection> {
    let tile = region.tile;
    detection
        .clipped_to(tile.width as f32, tile.height as f32)?
        .translated(tile.offset_x as f32, tile.offset_y as f32)
        .clipped_to(region.source_width as f32, region.source_height as f32)
}

/// Full image first, then tiles in row-major order
pub fn scan_regions(image: &DynamicImage, tiling: &TilingConfig) -> Vec<RasterRegion> {
    let mut regions = vec![RasterRegion::full(image)];
    for (index, tile) in tile_image(image.width(), image.height(), tiling)
        .into_iter()
        .enumerate()
    {
        regions.push(RasterRegion::crop(image, tile, index));
    }
    regions
}

/// Run `detector` over the full image and every tile, one region at a time.
///
/// A failing region is logged and contributes nothing; if every region
/// fails the pool is simply empty.
pub async fn aggregate<D: Detector>(
    detector: &D,
    image: &DynamicImage,
    tiling: &TilingConfig,
    context: &PipelineContext,
) -> DetectionPool {
    let mut pool = DetectionPool::new();

    for (index, region) in scan_regions(image, tiling).into_iter().enumerate() {
        if region.tile.is_empty() {
            tracing::debug!(region = %region.kind, "Skipping empty region");
            continue;
        }
        context.save_debug(DebugStage::Regions, index, &region.pixels);

        match detector.detect(&region).await {
            Ok(detections) => {
                let before = pool.len();
                pool.extend(
                    detections
                        .iter()
                        .filter_map(|det| translate_to_image(det, &region)),
                );
                tracing::debug!(
                    region = %region.kind,
                    raw = detections.len(),
                    kept = pool.len() - before,
                    "Region scanned"
                );
            }
            Err(source) => {
                let failure = RegionDetectionFailed {
                    region: region.kind,
                    source,
                };
                tracing::warn!(detector = detector.name(), error = %failure, cause = %failure.source, "Region contributes no detections");
            }
        }
    }

    pool
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::RegionKind;
    use crate::error::DetectionError;
    use crate::models::Tile;
    use std::cell::RefCell;

    /// Returns one fixed local box per region, failing on chosen regions
    struct FixedBox {
        local: RawDetection,
        fail_on: Vec<RegionKind>,
        seen: RefCell<Vec<RegionKind>>,
    }

    impl FixedBox {
        fn new(local: RawDetection, fail_on: Vec<RegionKind>) -> Self {
            Self {
                local,
                fail_on,
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl Detector for FixedBox {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn detect(&self, region: &RasterRegion) -> Result<Vec<RawDetection>, DetectionError> {
            self.seen.borrow_mut().push(region.kind);
            if self.fail_on.contains(&region.kind) {
                return Err(DetectionError::Backend("boom".into()));
            }
            Ok(vec![self.local.clone()])
        }
    }

    #[test]
    fn tile_local_box_is_offset_into_image() {
        let image = DynamicImage::new_rgb8(400, 300);
        let tile = Tile {
            offset_x: 100,
            offset_y: 50,
            width: 200,
            height: 200,
        };
        let region = RasterRegion::crop(&image, tile, 0);
        let det = translate_to_image(&RawDetection::new(5.0, 5.0, 10.0, 10.0), &region).unwrap();
        assert_eq!((det.x, det.y), (105.0, 55.0));
    }

    #[test]
    fn overhanging_box_is_clipped_to_region() {
        let image = DynamicImage::new_rgb8(100, 100);
        let tile = Tile {
            offset_x: 60,
            offset_y: 60,
            width: 40,
            height: 40,
        };
        let region = RasterRegion::crop(&image, tile, 3);
        let det = translate_to_image(&RawDetection::new(30.0, -5.0, 30.0, 20.0), &region).unwrap();
        assert_eq!((det.x, det.y, det.width, det.height), (90.0, 60.0, 10.0, 15.0));
    }

    #[tokio::test]
    async fn pool_has_full_pass_then_tiles() {
        // 250x125 with the default 2x2 grid puts the last tile at (100, 50)
        let image = DynamicImage::new_rgb8(250, 125);
        let detector = FixedBox::new(RawDetection::new(5.0, 5.0, 10.0, 10.0), vec![]);
        let pool = aggregate(&detector, &image, &TilingConfig::default(), &PipelineContext::default()).await;

        assert_eq!(pool.len(), 5);
        let last = pool.iter().last().unwrap();
        assert_eq!((last.x, last.y), (105.0, 55.0));
        assert_eq!(
            *detector.seen.borrow(),
            vec![
                RegionKind::Full,
                RegionKind::Tile(0),
                RegionKind::Tile(1),
                RegionKind::Tile(2),
                RegionKind::Tile(3)
            ]
        );
    }

    #[tokio::test]
    async fn failing_tile_is_skipped() {
        let image = DynamicImage::new_rgb8(200, 200);
        let detector = FixedBox::new(
            RawDetection::new(1.0, 1.0, 4.0, 4.0),
            vec![RegionKind::Tile(1), RegionKind::Full],
        );
        let pool = aggregate(&detector, &image, &TilingConfig::default(), &PipelineContext::default()).await;
        assert_eq!(pool.len(), 3);
        assert_eq!(detector.seen.borrow().len(), 5);
    }

    #[tokio::test]
    async fn all_regions_failing_gives_empty_pool() {
        let image = DynamicImage::new_rgb8(64, 64);
        let all = vec![
            RegionKind::Full,
            RegionKind::Tile(0),
            RegionKind::Tile(1),
            RegionKind::Tile(2),
            RegionKind::Tile(3),
        ];
        let detector = FixedBox::new(RawDetection::new(1.0, 1.0, 4.0, 4.0), all);
        let pool = aggregate(&detector, &image, &TilingConfig::default(), &PipelineContext::default()).await;
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn empty_image_never_calls_detector() {
        let image = DynamicImage::new_rgb8(0, 0);
        let detector = FixedBox::new(RawDetection::new(1.0, 1.0, 4.0, 4.0), vec![]);
        let pool = aggregate(&detector, &image, &TilingConfig::default(), &PipelineContext::default()).await;
        assert!(pool.is_empty());
        assert!(detector.seen.borrow().is_empty());
    }
}
