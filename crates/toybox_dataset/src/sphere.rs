//! Sphere view: central vertical strips of consecutive views stitched side by side.

use image::imageops::{crop_imm, replace};
use image::RgbImage;

/// Strip widths for a square view of side `size` split over `nview` views.
///
/// Every strip is `ceil(size / nview)` wide except the last, which takes the
/// remainder, so the widths always sum to `size`.
pub fn strip_widths(size: u32, nview: usize) -> Vec<u32> {
    let step = size.div_ceil(nview.max(1) as u32);
    let mut remaining = size;
    let mut widths = Vec::new();
    while remaining > step {
        widths.push(step);
        remaining -= step;
    }
    widths.push(remaining);
    widths
}

/// Column where a strip of width `w` starts: the horizontal midpoint, pulled left
/// only when the strip would otherwise run off the right edge.
fn strip_origin(size: u32, image_width: u32, w: u32) -> u32 {
    (size / 2).min(image_width.saturating_sub(w))
}

/// Stitch one strip per view into a panorama.
///
/// Views are paired with strip widths in order; surplus views or widths are
/// ignored. Views are expected to share the first view's dimensions.
pub fn stitch(views: &[RgbImage], nview: usize) -> RgbImage {
    let Some(first) = views.first() else {
        return RgbImage::new(0, 0);
    };
    let size = first.height();
    let widths = strip_widths(size, nview);
    let total: u32 = views.iter().zip(&widths).map(|(_, w)| *w).sum();

    let mut canvas = RgbImage::new(total, size);
    let mut offset = 0u32;
    for (view, &w) in views.iter().zip(&widths) {
        let x = strip_origin(size, view.width(), w);
        let strip = crop_imm(view, x, 0, w, size).to_image();
        replace(&mut canvas, &strip, offset as i64, 0);
        offset += w;
    }
    canvas
}
