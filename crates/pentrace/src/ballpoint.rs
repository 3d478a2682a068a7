//! Ballpoint tip localization.
//!
//! The template match pins down the pen body; the actual writing point sits
//! near the top-left of that patch where the pen shaft tapers. The shaft
//! silhouette dominates the patch edges, so the intersections of strong
//! Hough lines converge on the tip. The averaged intersection is snapped to
//! the nearest surviving edge pixel.

use image::GrayImage;
use imageproc::hough::{detect_lines, LineDetectionOptions, PolarLine};

use pentrace_core::geometry::Point;
use pentrace_core::imgproc::{canny, dilate, sharpen};

use crate::config::BallpointConfig;

/// Locate the pen tip inside the matched template patch.
///
/// Returns the tip in patch-local coordinates, or `None` when the patch
/// yields no usable line intersections or no edge pixel to snap to.
pub fn locate_tip(patch: &GrayImage, cfg: &BallpointConfig) -> Option<Point> {
    let sharpened = sharpen(patch, cfg.sharpen_weight, cfg.sharpen_sigma);
    let edges = canny(&sharpened, cfg.canny_low, cfg.canny_high);

    let mut mask = GrayImage::new(patch.width(), patch.height());
    let contours = imageproc::contours::find_contours::<i32>(&edges);
    let mut kept = 0usize;
    for contour in &contours {
        if contour.points.len() < cfg.min_contour_points {
            continue;
        }
        kept += 1;
        for p in &contour.points {
            mask.put_pixel(p.x as u32, p.y as u32, image::Luma([255]));
        }
    }
    if kept == 0 {
        return None;
    }
    let mask = dilate(&mask, cfg.thicken_radius);

    let mut lines = detect_lines(
        &mask,
        LineDetectionOptions {
            vote_threshold: cfg.hough_vote_threshold,
            suppression_radius: cfg.hough_suppression_radius,
        },
    );
    lines.truncate(cfg.max_lines);

    let candidate = average_intersection(&lines, patch.dimensions(), cfg)?;
    snap_to_edge(&mask, candidate, cfg.snap_radius)
}

/// Average of pairwise line intersections inside the valid tip zone.
///
/// The zone spans from just past the patch origin (`-zone_margin`
/// exclusive) to the patch center (exclusive): the pen is matched with its
/// tip toward the top-left quadrant.
fn average_intersection(
    lines: &[PolarLine],
    dims: (u32, u32),
    cfg: &BallpointConfig,
) -> Option<Point> {
    let lo = -cfg.zone_margin as f64;
    let hi_x = (dims.0 as i32 / 2) as f64;
    let hi_y = (dims.1 as i32 / 2) as f64;

    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut count = 0u32;
    for (i, a) in lines.iter().enumerate() {
        for b in &lines[i + 1..] {
            let Some((x, y)) = intersect_polar(*a, *b) else {
                continue;
            };
            if x > lo && y > lo && x < hi_x && y < hi_y {
                sum_x += x;
                sum_y += y;
                count += 1;
            }
        }
    }
    if count == 0 {
        return None;
    }
    let n = f64::from(count);
    Some(Point::new(
        (sum_x / n).round() as i32,
        (sum_y / n).round() as i32,
    ))
}

/// Intersection of two Hough lines `x cos θ + y sin θ = r`, or `None` for
/// near-parallel pairs.
pub fn intersect_polar(a: PolarLine, b: PolarLine) -> Option<(f64, f64)> {
    let t1 = f64::from(a.angle_in_degrees).to_radians();
    let t2 = f64::from(b.angle_in_degrees).to_radians();
    let (r1, r2) = (f64::from(a.r), f64::from(b.r));
    let det = t1.cos() * t2.sin() - t1.sin() * t2.cos();
    if det.abs() < 1e-6 {
        return None;
    }
    let x = (r1 * t2.sin() - r2 * t1.sin()) / det;
    let y = (r2 * t1.cos() - r1 * t2.cos()) / det;
    Some((x, y))
}

/// Snap `candidate` onto the nearest set mask pixel by scanning expanding
/// square rings.
fn snap_to_edge(mask: &GrayImage, candidate: Point, snap_radius: i32) -> Option<Point> {
    if is_set(mask, candidate.x, candidate.y) {
        return Some(candidate);
    }
    (1..=snap_radius).find_map(|radius| search_ring(mask, candidate, radius))
}

fn search_ring(mask: &GrayImage, center: Point, radius: i32) -> Option<Point> {
    let (w, h) = (mask.width() as i32, mask.height() as i32);
    let min_x = (center.x - radius).max(0);
    let max_x = (center.x + radius).min(w - 1);
    let min_y = (center.y - radius).max(0);
    let max_y = (center.y + radius).min(h - 1);
    if min_x > max_x || min_y > max_y {
        return None;
    }

    // Left and right columns of the ring, then top and bottom rows.
    let x_step = (max_x - min_x).max(1);
    let mut x = min_x;
    loop {
        for y in min_y..=max_y {
            if is_set(mask, x, y) {
                return Some(Point::new(x, y));
            }
        }
        if x >= max_x {
            break;
        }
        x += x_step;
    }
    let y_step = (max_y - min_y).max(1);
    let mut y = min_y;
    loop {
        for x in min_x..=max_x {
            if is_set(mask, x, y) {
                return Some(Point::new(x, y));
            }
        }
        if y >= max_y {
            break;
        }
        y += y_step;
    }
    None
}

fn is_set(mask: &GrayImage, x: i32, y: i32) -> bool {
    x >= 0
        && y >= 0
        && (x as u32) < mask.width()
        && (y as u32) < mask.height()
        && mask.get_pixel(x as u32, y as u32)[0] > 0
}
