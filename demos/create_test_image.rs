use image::{Rgb, RgbImage};

/// Face-sized skin-tone ovals on a gradient background, for trying the CLI
const FACES: [(u32, u32, u32, u32); 3] = [(180, 220, 60, 75), (400, 180, 70, 85), (620, 240, 55, 70)];

fn main() -> anyhow::Result<()> {
    let mut img = RgbImage::new(800, 600);

    for y in 0..600 {
        for x in 0..800 {
            let g = (y * 120 / 600) as u8;
            let b = 160 + (x * 80 / 800) as u8;
            img.put_pixel(x, y, Rgb([20, g, b]));
        }
    }

    for &(cx, cy, rx, ry) in &FACES {
        for y in cy.saturating_sub(ry)..=(cy + ry).min(599) {
            for x in cx.saturating_sub(rx)..=(cx + rx).min(799) {
                let dx = (x as f32 - cx as f32) / rx as f32;
                let dy = (y as f32 - cy as f32) / ry as f32;
                if dx * dx + dy * dy <= 1.0 {
                    img.put_pixel(x, y, Rgb([224, 172, 140]));
                }
            }
        }
    }

    img.save("test_image.png")?;
    println!("Created test_image.png (800x600, {} faces)", FACES.len());
    Ok(())
}
