use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::gaussian_blur_f32;

/// Whether an RGB pixel falls in any of the skin tone bands
pub fn is_skin_tone(r: u8, g: u8, b: u8) -> bool {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    let rg = r - g;

    let light = r > 95 && g > 40 && b > 20 && rg > 15 && r > g && r > b;
    let medium = r > 80 && r < 220 && g > 50 && g < 180 && b > 30 && b < 150 && rg > 5;
    let dark = r > 40 && r < 120 && g > 30 && g < 100 && b > 20 && b < 80 && r >= g && g >= b;
    let inclusive = r > 60 && g > 30 && b > 15 && r > b && rg.abs() < 50;

    light || medium || dark || inclusive
}

/// Binary mask with skin pixels set to 255
pub fn skin_mask(img: &DynamicImage) -> GrayImage {
    let rgb = img.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let p = rgb.get_pixel(x, y);
        if is_skin_tone(p[0], p[1], p[2]) {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Blur the mask and re-threshold it, closing pinholes and dropping specks
pub fn smooth_mask(mask: &GrayImage, sigma: f32) -> GrayImage {
    if mask.width() == 0 || mask.height() == 0 || sigma <= 0.0 {
        return mask.clone();
    }
    let mut blurred = gaussian_blur_f32(mask, sigma);
    for pixel in blurred.pixels_mut() {
        pixel[0] = if pixel[0] >= 128 { 255 } else { 0 };
    }
    blurred
}
