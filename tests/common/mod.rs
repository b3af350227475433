mod fixtures;
pub use fixtures::*;

pub use roimark::detection::{RegionKind, SkinToneBackend};
pub use roimark::{
    AnalyzeError, CanonicalDetection, Config, DetectionBackend, DetectionError, Outcome, RasterRegion,
    RawDetection, Session,
};

/// Asserts two floats agree to within 1e-3
pub fn assert_near(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-3,
        "expected {expected}, got {actual}"
    );
}

/// Every canonical box lies inside a `width` x `height` image
pub fn assert_inside(detections: &[CanonicalDetection], width: u32, height: u32) {
    for det in detections {
        assert!(det.x >= 0.0 && det.y >= 0.0, "{det:?} starts outside the image");
        assert!(det.right() <= width as f32 + 1e-3, "{det:?} overruns width {width}");
        assert!(det.bottom() <= height as f32 + 1e-3, "{det:?} overruns height {height}");
    }
}
