use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a loaded image, minted fresh on every load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageId(Uuid);

impl ImageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ImageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` (the leading `#` is optional)
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Self { r, g, b })
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn to_rgba(&self) -> image::Rgba<u8> {
        image::Rgba([self.r, self.g, self.b, 255])
    }

    /// Relative luminance in [0, 1]
    pub fn luma(&self) -> f64 {
        (0.2126 * f64::from(self.r) + 0.7152 * f64::from(self.g) + 0.0722 * f64::from(self.b)) / 255.0
    }
}

/// One unfiltered detector output, top-left anchored, in pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: Option<f32>,
    pub class: Option<String>,
}

impl RawDetection {
    /// Confidence assumed for detections that carry none
    pub const NEUTRAL_CONFIDENCE: f32 = 0.5;

    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence: None,
            class: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn score(&self) -> f32 {
        self.confidence.unwrap_or(Self::NEUTRAL_CONFIDENCE)
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Area of the rectangular intersection with `other`
    pub fn intersection_area(&self, other: &RawDetection) -> f32 {
        let w = self.right().min(other.right()) - self.x.max(other.x);
        let h = self.bottom().min(other.bottom()) - self.y.max(other.y);
        if w <= 0.0 || h <= 0.0 {
            return 0.0;
        }
        w * h
    }

    /// Intersection area over the smaller of the two areas
    pub fn overlap_ratio(&self, other: &RawDetection) -> f32 {
        let smaller = self.area().min(other.area());
        if smaller <= 0.0 {
            return 0.0;
        }
        self.intersection_area(other) / smaller
    }

    pub fn center_distance(&self, other: &RawDetection) -> f32 {
        let (ax, ay) = self.center();
        let (bx, by) = other.center();
        ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt()
    }

    /// Clip the box to `[0, width] x [0, height]`. Returns None if nothing
    /// with positive area is left.
    pub fn clipped_to(&self, width: f32, height: f32) -> Option<RawDetection> {
        if !(self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()) {
            return None;
        }
        let x0 = self.x.max(0.0);
        let y0 = self.y.max(0.0);
        let x1 = self.right().min(width);
        let y1 = self.bottom().min(height);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(RawDetection {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
            confidence: self.confidence,
            class: self.class.clone(),
        })
    }

    pub fn translated(mut self, dx: f32, dy: f32) -> Self {
        self.x += dx;
        self.y += dy;
        self
    }
}

/// A deduplicated detection in final image coordinates.
///
/// Only the deduplicator constructs these.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalDetection(RawDetection);

impl CanonicalDetection {
    pub(crate) fn new(detection: RawDetection) -> Self {
        Self(detection)
    }

    pub fn detection(&self) -> &RawDetection {
        &self.0
    }

    pub fn into_raw(self) -> RawDetection {
        self.0
    }
}

impl std::ops::Deref for CanonicalDetection {
    type Target = RawDetection;

    fn deref(&self) -> &RawDetection {
        &self.0
    }
}

/// Sub-rectangle of the source image scanned as one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub offset_x: u32,
    pub offset_y: u32,
    pub width: u32,
    pub height: u32,
}

impl Tile {
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            offset_x: 0,
            offset_y: 0,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, det: &RawDetection) -> bool {
        det.x >= self.offset_x as f32
            && det.y >= self.offset_y as f32
            && det.right() <= (self.offset_x + self.width) as f32
            && det.bottom() <= (self.offset_y + self.height) as f32
    }
}

/// Raw detections gathered across all passes over one image
#[derive(Debug, Clone, Default)]
pub struct DetectionPool {
    detections: Vec<RawDetection>,
}

impl DetectionPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, detection: RawDetection) {
        self.detections.push(detection);
    }

    pub fn extend(&mut self, detections: impl IntoIterator<Item = RawDetection>) {
        self.detections.extend(detections);
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RawDetection> {
        self.detections.iter()
    }

    pub fn into_vec(self) -> Vec<RawDetection> {
        self.detections
    }
}

impl From<Vec<RawDetection>> for DetectionPool {
    fn from(detections: Vec<RawDetection>) -> Self {
        Self { detections }
    }
}

impl FromIterator<CanonicalDetection> for DetectionPool {
    fn from_iter<I: IntoIterator<Item = CanonicalDetection>>(iter: I) -> Self {
        Self {
            detections: iter.into_iter().map(CanonicalDetection::into_raw).collect(),
        }
    }
}

/// Connected region of a binary mask, as found by the skin-tone backend
#[derive(Debug, Clone)]
pub struct Contour {
    pub label: u32,
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
    pub pixel_count: u32,
}

impl Contour {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width() as f32 / self.height() as f32
    }

    /// Share of the bounding box covered by the region's pixels
    pub fn fill_ratio(&self) -> f32 {
        let bbox_area = u64::from(self.width()) * u64::from(self.height());
        (f64::from(self.pixel_count) / bbox_area as f64).min(1.0) as f32
    }

    pub fn to_detection(&self) -> RawDetection {
        RawDetection::new(
            self.min_x as f32,
            self.min_y as f32,
            self.width() as f32,
            self.height() as f32,
        )
        .with_confidence(self.fill_ratio())
    }
}
