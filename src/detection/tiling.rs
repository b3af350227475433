use crate::config::TilingConfig;
use crate::models::Tile;

/// Split an image into `grid_size²` overlapping tiles, row-major.
///
/// Each shared edge is pushed outwards by `overlap * (dimension / grid_size)`
/// and clamped to the image. Zero-sized images produce zero-area tiles.
pub fn tile_image(width: u32, height: u32, config: &TilingConfig) -> Vec<Tile> {
    let grid = config.grid_size.max(1);
    let overlap = config.overlap.clamp(0.0, 1.0);

    let columns = spans(width, grid, overlap);
    let rows = spans(height, grid, overlap);

    let mut tiles = Vec::with_capacity((grid * grid) as usize);
    for &(offset_y, tile_h) in &rows {
        for &(offset_x, tile_w) in &columns {
            tiles.push(Tile {
                offset_x,
                offset_y,
                width: tile_w,
                height: tile_h,
            });
        }
    }
    tiles
}

/// (offset, length) of each band along one axis
fn spans(length: u32, grid: u32, overlap: f64) -> Vec<(u32, u32)> {
    let step = length as f64 / grid as f64;
    let margin = step * overlap;
    (0..grid)
        .map(|i| {
            let start = snap(i as f64 * step - margin).floor().max(0.0) as u32;
            let end = snap((i + 1) as f64 * step + margin).ceil().min(length as f64) as u32;
            let start = start.min(end);
            (start, end - start)
        })
        .collect()
}

// Keeps float noise from pushing an edge across a pixel boundary
fn snap(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawDetection;

    fn config(grid_size: u32, overlap: f64) -> TilingConfig {
        TilingConfig { grid_size, overlap }
    }

    #[test]
    fn default_grid_on_square_image() {
        let tiles = tile_image(200, 200, &TilingConfig::default());
        assert_eq!(tiles.len(), 4);
        assert_eq!(tiles[0], Tile { offset_x: 0, offset_y: 0, width: 120, height: 120 });
        assert_eq!(tiles[1], Tile { offset_x: 80, offset_y: 0, width: 120, height: 120 });
        assert_eq!(tiles[2], Tile { offset_x: 0, offset_y: 80, width: 120, height: 120 });
        assert_eq!(tiles[3], Tile { offset_x: 80, offset_y: 80, width: 120, height: 120 });
    }

    #[test]
    fn tiles_stay_inside_image() {
        for &(w, h) in &[(1u32, 1u32), (7, 3), (640, 480), (1001, 333)] {
            for grid in 1..=4 {
                for tile in tile_image(w, h, &config(grid, 0.35)) {
                    assert!(tile.offset_x + tile.width <= w);
                    assert!(tile.offset_y + tile.height <= h);
                }
            }
        }
    }

    #[test]
    fn boundary_straddling_box_fits_one_tile() {
        let tiles = tile_image(400, 400, &TilingConfig::default());
        // Centered on the vertical split at x=200, 30px wide; margin is 40px
        let det = RawDetection::new(185.0, 50.0, 30.0, 30.0);
        assert!(tiles.iter().any(|t| t.contains(&det)));
    }

    #[test]
    fn union_covers_image() {
        let (w, h) = (333u32, 127u32);
        let tiles = tile_image(w, h, &config(3, 0.0));
        for y in 0..h {
            for x in 0..w {
                assert!(tiles.iter().any(|t| {
                    x >= t.offset_x && x < t.offset_x + t.width && y >= t.offset_y && y < t.offset_y + t.height
                }));
            }
        }
    }

    #[test]
    fn zero_sized_image_yields_empty_tiles() {
        let tiles = tile_image(0, 100, &TilingConfig::default());
        assert_eq!(tiles.len(), 4);
        assert!(tiles.iter().all(Tile::is_empty));
    }

    #[test]
    fn zero_grid_is_treated_as_one() {
        let tiles = tile_image(50, 40, &config(0, 0.2));
        assert_eq!(tiles, vec![Tile::full(50, 40)]);
    }
}
