//! Shared image fixtures for unit tests.
//!
//! Consolidated here so the registrar, zone, and segmentation tests draw
//! their synthetic frames the same way.

use image::{GrayImage, Luma};
use imageproc::drawing::draw_line_segment_mut;

use pentrace_core::geometry::Rect;
use pentrace_core::imgproc::dilate;

/// A `w x h` frame filled with one gray value.
pub(crate) fn uniform_frame(w: u32, h: u32, value: u8) -> GrayImage {
    GrayImage::from_pixel(w, h, Luma([value]))
}

/// Draw a crossing grid of 1 px black lines every 12 px inside `rect`.
///
/// The grid classifies as text: plenty of corners and edges, but a dark
/// fraction far below the occluder gate.
pub(crate) fn scribble(img: &mut GrayImage, rect: Rect) {
    let step = 12;
    let mut x = rect.x;
    while x < rect.right() {
        draw_line_segment_mut(
            img,
            (x as f32, rect.y as f32),
            (x as f32, (rect.bottom() - 1) as f32),
            Luma([0]),
        );
        x += step;
    }
    let mut y = rect.y;
    while y < rect.bottom() {
        draw_line_segment_mut(
            img,
            (rect.x as f32, y as f32),
            ((rect.right() - 1) as f32, y as f32),
            Luma([0]),
        );
        y += step;
    }
}

/// Copy `src` with its content shifted by `(dx, dy)`, filling uncovered
/// pixels with white.
pub(crate) fn shifted_frame(src: &GrayImage, dx: i32, dy: i32) -> GrayImage {
    let mut out = GrayImage::from_pixel(src.width(), src.height(), Luma([255]));
    for (x, y, p) in src.enumerate_pixels() {
        let nx = x as i32 + dx;
        let ny = y as i32 + dy;
        if nx >= 0 && ny >= 0 && (nx as u32) < out.width() && (ny as u32) < out.height() {
            out.put_pixel(nx as u32, ny as u32, *p);
        }
    }
    out
}

/// A black canvas with one white line from `from` to `to`, thickened by
/// dilation to `2 * radius + 1` px.
pub(crate) fn ink_line(w: u32, h: u32, from: (i32, i32), to: (i32, i32), radius: u8) -> GrayImage {
    let mut img = GrayImage::new(w, h);
    draw_line_segment_mut(
        &mut img,
        (from.0 as f32, from.1 as f32),
        (to.0 as f32, to.1 as f32),
        Luma([255]),
    );
    dilate(&img, radius)
}
