use image::{GrayImage, Luma};
use imageproc::region_labelling::{Connectivity, connected_components};
use std::collections::BTreeMap;

use crate::models::Contour;

/// Group the set pixels of a binary mask into 8-connected regions.
///
/// Regions smaller than `min_area` pixels are dropped. Results are ordered
/// by label, which follows raster order of each region's first pixel.
pub fn find_contours(mask: &GrayImage, min_area: u32) -> Vec<Contour> {
    let labeled = connected_components(mask, Connectivity::Eight, Luma([0u8]));

    let mut regions: BTreeMap<u32, Contour> = BTreeMap::new();
    for (x, y, label) in labeled.enumerate_pixels() {
        let label = label[0];
        if label == 0 {
            continue;
        }
        regions
            .entry(label)
            .and_modify(|c| {
                c.min_x = c.min_x.min(x);
                c.min_y = c.min_y.min(y);
                c.max_x = c.max_x.max(x);
                c.max_y = c.max_y.max(y);
                c.pixel_count += 1;
            })
            .or_insert(Contour {
                label,
                min_x: x,
                min_y: y,
                max_x: x,
                max_y: y,
                pixel_count: 1,
            });
    }

    regions
        .into_values()
        .filter(|c| c.pixel_count >= min_area)
        .collect()
}
