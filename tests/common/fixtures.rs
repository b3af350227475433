use std::cell::{Cell, RefCell};
use std::rc::Rc;

use image::{DynamicImage, Rgb, RgbImage};
use roimark::detection::{DetectionBackend, RasterRegion, RegionKind};
use roimark::{DetectionError, RawDetection};
use tokio::sync::Semaphore;

pub const BACKGROUND: Rgb<u8> = Rgb([30, 60, 200]);
pub const SKIN: Rgb<u8> = Rgb([224, 172, 140]);

/// Neutral gray image of the given size
pub fn gray_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([128, 128, 128])))
}

/// Blue background with skin-colored rectangles at `(x, y, w, h)`
pub fn skin_blob_image(width: u32, height: u32, blobs: &[(u32, u32, u32, u32)]) -> DynamicImage {
    let mut img = RgbImage::from_pixel(width, height, BACKGROUND);
    for &(bx, by, bw, bh) in blobs {
        for y in by..(by + bh).min(height) {
            for x in bx..(bx + bw).min(width) {
                img.put_pixel(x, y, SKIN);
            }
        }
    }
    DynamicImage::ImageRgb8(img)
}

/// What a scripted backend does for one region
pub enum Script {
    Boxes(Vec<RawDetection>),
    Fail,
    Hang,
}

/// Test backend driven by a per-region script. Counts `detect` calls and
/// can be held at a gate until the test releases it.
pub struct ScriptedBackend {
    script: Box<dyn Fn(&RasterRegion) -> Script>,
    ready: bool,
    gate: Option<Rc<Semaphore>>,
    calls: Rc<Cell<usize>>,
    seen: Rc<RefCell<Vec<RegionKind>>>,
}

impl ScriptedBackend {
    pub fn new(script: impl Fn(&RasterRegion) -> Script + 'static) -> Self {
        Self {
            script: Box::new(script),
            ready: true,
            gate: None,
            calls: Rc::new(Cell::new(0)),
            seen: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Returns the same region-local boxes for every region
    pub fn always(boxes: Vec<RawDetection>) -> Self {
        Self::new(move |_| Script::Boxes(boxes.clone()))
    }

    pub fn never_ready(mut self) -> Self {
        self.ready = false;
        self
    }

    /// Every `detect` waits for a permit; add permits to let calls through
    pub fn gated(mut self, gate: Rc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Shared call counter that outlives the backend once it moves into a session
    pub fn calls(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.calls)
    }

    pub fn seen(&self) -> Rc<RefCell<Vec<RegionKind>>> {
        Rc::clone(&self.seen)
    }
}

impl DetectionBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    async fn detect(&self, region: &RasterRegion) -> Result<Vec<RawDetection>, DetectionError> {
        self.calls.set(self.calls.get() + 1);
        self.seen.borrow_mut().push(region.kind);

        if let Some(gate) = &self.gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|e| DetectionError::Backend(e.to_string()))?;
        }

        match (self.script)(region) {
            Script::Boxes(boxes) => Ok(boxes),
            Script::Fail => Err(DetectionError::Backend("scripted failure".to_string())),
            Script::Hang => std::future::pending().await,
        }
    }
}
