use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use crate::models::{CanonicalDetection, Color, RawDetection};
use crate::prompt::{MAX_LINE_WIDTH, RenderDirective, Shape};

/// Circles never get smaller than this, so tiny detections stay visible
pub const MIN_CIRCLE_RADIUS: f32 = 20.0;

/// Gap between a circle and the label above it
const LABEL_GAP: i32 = 10;
const CHIP_PADDING: i32 = 2;
const GLYPH_SIZE: i32 = 8;
/// Largest whole-pixel scale for label glyphs
const MAX_GLYPH_SCALE: u32 = 24;

const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const OUTLINE: Rgba<u8> = Rgba([255, 215, 0, 255]);

pub fn circle_radius(detection: &RawDetection, directive: &RenderDirective) -> f32 {
    (detection.width.max(detection.height) / 2.0 * directive.radius_scale).max(MIN_CIRCLE_RADIUS)
}

/// Stroke width actually drawn, whatever the directive holds
pub fn stroke_width(directive: &RenderDirective) -> u32 {
    directive.line_width.clamp(1, MAX_LINE_WIDTH)
}

/// Label glyph height in pixels
pub fn label_font_px(directive: &RenderDirective) -> u32 {
    directive.line_width.saturating_mul(3).max(12)
}

pub fn label_text(index: usize, detection: &RawDetection) -> String {
    match &detection.class {
        Some(class) => format!("{} {}", index + 1, class),
        None => format!("{}", index + 1),
    }
}

/// Draw `detections` over a copy of `source`.
///
/// The result is a fresh buffer; nothing is shown until the caller
/// presents it.
pub fn render(source: &DynamicImage, detections: &[CanonicalDetection], directive: &RenderDirective) -> RgbaImage {
    let mut canvas = source.to_rgba8();
    let color = directive.color.to_rgba();
    let line_width = stroke_width(directive);
    let with_labels = directive.labels_for(detections.len());

    for (index, detection) in detections.iter().enumerate() {
        let (cx, cy) = detection.center();
        match directive.shape {
            Shape::Circle => {
                let radius = circle_radius(detection, directive);
                stroke_circle(&mut canvas, cx, cy, radius, line_width, color);
                if with_labels {
                    let text = label_text(index, detection);
                    let (w, h) = text_size(&text, directive);
                    let x = cx.round() as i32 - w / 2;
                    let y = (cy - radius).round() as i32 - LABEL_GAP - h;
                    draw_label(&mut canvas, x, y, &text, directive);
                }
            }
            Shape::Rectangle => {
                stroke_rect(&mut canvas, detection, line_width, color);
                if with_labels {
                    let text = label_text(index, detection);
                    let inset = (line_width / 2) as i32 + 1;
                    let x = detection.x.round() as i32 + inset + CHIP_PADDING;
                    let y = detection.y.round() as i32 + inset + CHIP_PADDING;
                    draw_label(&mut canvas, x, y, &text, directive);
                }
            }
        }
    }

    canvas
}

/// 1px outlines of every box, for the debug dump
pub fn draw_outlines<'a>(source: &DynamicImage, detections: impl Iterator<Item = &'a RawDetection>) -> RgbaImage {
    let mut canvas = source.to_rgba8();
    for detection in detections {
        stroke_rect(&mut canvas, detection, 1, OUTLINE);
    }
    canvas
}

/// Ring of `line_width` centered on the circle's edge
fn stroke_circle(img: &mut RgbaImage, cx: f32, cy: f32, radius: f32, line_width: u32, color: Rgba<u8>) {
    if img.width() == 0 || img.height() == 0 {
        return;
    }
    let half = line_width.max(1) as f32 / 2.0;
    let inner = (radius - half).max(0.0);
    let outer = radius + half;
    let (inner2, outer2) = (inner * inner, outer * outer);

    let max_x = img.width() as i32 - 1;
    let max_y = img.height() as i32 - 1;
    let x0 = ((cx - outer).floor() as i32).clamp(0, max_x);
    let x1 = ((cx + outer).ceil() as i32).clamp(0, max_x);
    let y0 = ((cy - outer).floor() as i32).clamp(0, max_y);
    let y1 = ((cy + outer).ceil() as i32).clamp(0, max_y);

    for y in y0..=y1 {
        for x in x0..=x1 {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            let d2 = dx * dx + dy * dy;
            if d2 >= inner2 && d2 <= outer2 {
                img.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

/// Nested 1px rectangles, half outside and half inside the box edge.
/// Callers pass a width already clamped by `stroke_width`.
fn stroke_rect(img: &mut RgbaImage, detection: &RawDetection, line_width: u32, color: Rgba<u8>) {
    let x = detection.x.round() as i32;
    let y = detection.y.round() as i32;
    let w = detection.width.round() as i32;
    let h = detection.height.round() as i32;

    let line_width = line_width.max(1) as i32;
    let outward = line_width / 2;
    for offset in (outward - line_width + 1)..=outward {
        let (rw, rh) = (w + 2 * offset, h + 2 * offset);
        if rw <= 0 || rh <= 0 {
            continue;
        }
        let rect = Rect::at(x - offset, y - offset).of_size(rw as u32, rh as u32);
        draw_hollow_rect_mut(img, rect, color);
    }
}

fn glyph_scale(directive: &RenderDirective) -> i32 {
    label_font_px(directive)
        .div_ceil(GLYPH_SIZE as u32)
        .min(MAX_GLYPH_SCALE) as i32
}

fn text_size(text: &str, directive: &RenderDirective) -> (i32, i32) {
    let scale = glyph_scale(directive);
    (text.chars().count() as i32 * GLYPH_SIZE * scale, GLYPH_SIZE * scale)
}

/// Filled chip in the directive color with contrasting text, text top-left at (x, y)
fn draw_label(img: &mut RgbaImage, x: i32, y: i32, text: &str, directive: &RenderDirective) {
    let (w, h) = text_size(text, directive);
    let chip = Rect::at(x - CHIP_PADDING, y - CHIP_PADDING)
        .of_size((w + 2 * CHIP_PADDING) as u32, (h + 2 * CHIP_PADDING) as u32);
    draw_filled_rect_mut(img, chip, directive.color.to_rgba());
    draw_text(img, x, y, text, contrast_color(directive.color), glyph_scale(directive));
}

fn contrast_color(color: Color) -> Rgba<u8> {
    if color.luma() > 0.6 { BLACK } else { WHITE }
}

fn draw_text(img: &mut RgbaImage, x: i32, y: i32, text: &str, color: Rgba<u8>, scale: i32) {
    let (width, height) = (img.width() as i32, img.height() as i32);
    let mut cursor_x = x;
    for ch in text.chars() {
        let Some(glyph) = BASIC_FONTS.get(ch).or_else(|| BASIC_FONTS.get('?')) else {
            cursor_x += GLYPH_SIZE * scale;
            continue;
        };
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_SIZE {
                if (bits >> col) & 1 == 0 {
                    continue;
                }
                let px = cursor_x + col * scale;
                let py = y + row as i32 * scale;
                for sy in 0..scale {
                    for sx in 0..scale {
                        let (tx, ty) = (px + sx, py + sy);
                        if tx >= 0 && ty >= 0 && tx < width && ty < height {
                            img.put_pixel(tx as u32, ty as u32, color);
                        }
                    }
                }
            }
        }
        cursor_x += GLYPH_SIZE * scale;
    }
}
