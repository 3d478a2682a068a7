//! Stroke post-processing.
//!
//! Direction splits break strokes at hard reversals the segmenter missed
//! (the pen leaving and re-entering along nearly the same path), and
//! redundancy removal drops retraced strokes that contribute no ink of
//! their own. Optional Douglas-Peucker simplification thins the vertex
//! chains for downstream consumers.

use image::GrayImage;
use imageproc::drawing::draw_line_segment_mut;

use pentrace_core::geometry::Point;
use pentrace_core::imgproc::dilate;

use crate::config::PostConfig;

use super::{Stroke, SubStroke};

/// Split pen-down strokes where consecutive segment bearings differ by more
/// than `threshold` degrees (wrapped difference). Pen-up strokes pass
/// through unchanged.
pub fn split_by_direction(strokes: Vec<Stroke>, threshold: f64) -> Vec<Stroke> {
    let mut out = Vec::with_capacity(strokes.len());
    for stroke in strokes {
        if !stroke.pen_down() {
            out.push(stroke);
            continue;
        }
        let mut split_ref = 0;
        for j in 1..stroke.segments.len() {
            let d = stroke.segments[j - 1].bearing() - stroke.segments[j].bearing();
            let wrapped = (d + 180.0).rem_euclid(360.0) - 180.0;
            if wrapped.abs() > threshold {
                out.push(Stroke::new(stroke.segments[split_ref..j].to_vec()));
                split_ref = j;
            }
        }
        out.push(Stroke::new(stroke.segments[split_ref..].to_vec()));
    }
    out
}

/// Drop pen-down strokes whose rendering contributes fewer than
/// `min_contribution_px` pixels outside the union of every other stroke's
/// thickened rendering. Returns the surviving pen-down strokes.
///
/// Contributions are measured against the full input set before any removal,
/// so mutually redundant strokes are all dropped.
pub fn remove_redundancy(strokes: Vec<Stroke>, dims: (u32, u32), cfg: &PostConfig) -> Vec<Stroke> {
    let pen_down: Vec<Stroke> = strokes.into_iter().filter(Stroke::pen_down).collect();
    if pen_down.len() <= 1 {
        return pen_down;
    }

    let masks: Vec<GrayImage> = pen_down
        .iter()
        .map(|s| render_strokes(std::slice::from_ref(s), dims, cfg.draw_radius))
        .collect();

    let keep: Vec<bool> = (0..pen_down.len())
        .map(|i| {
            let mut others = GrayImage::new(dims.0, dims.1);
            for (j, mask) in masks.iter().enumerate() {
                if j == i {
                    continue;
                }
                for (dst, src) in others.iter_mut().zip(mask.iter()) {
                    *dst |= *src;
                }
            }
            let others = dilate(&others, cfg.mask_radius);
            let contribution = masks[i]
                .iter()
                .zip(others.iter())
                .filter(|(own, other)| **own > 0 && **other == 0)
                .count();
            contribution as u32 >= cfg.min_contribution_px
        })
        .collect();

    pen_down
        .into_iter()
        .zip(keep)
        .filter_map(|(s, k)| k.then_some(s))
        .collect()
}

/// Rasterize strokes as white polylines, `2 * radius + 1` pixels thick.
pub fn render_strokes(strokes: &[Stroke], dims: (u32, u32), radius: u8) -> GrayImage {
    let mut canvas = GrayImage::new(dims.0, dims.1);
    for stroke in strokes {
        for s in &stroke.segments {
            draw_line_segment_mut(
                &mut canvas,
                (s.start.x as f32, s.start.y as f32),
                (s.end.x as f32, s.end.y as f32),
                image::Luma([255]),
            );
        }
    }
    dilate(&canvas, radius)
}

/// Douglas-Peucker polyline simplification with tolerance `epsilon`.
///
/// The stroke's vertex chain is thinned; surviving vertices are re-paired
/// into segments with the original pen state.
pub fn simplify(stroke: &Stroke, epsilon: f64) -> Stroke {
    let mut points: Vec<Point> = stroke.segments.iter().map(|s| s.start).collect();
    if let Some(last) = stroke.segments.last() {
        points.push(last.end);
    }
    if points.len() <= 2 {
        return stroke.clone();
    }

    let mut kept = vec![false; points.len()];
    kept[0] = true;
    kept[points.len() - 1] = true;
    mark_kept(&points, 0, points.len() - 1, epsilon, &mut kept);

    let pen_down = stroke.pen_down();
    let survivors: Vec<Point> = points
        .into_iter()
        .zip(kept)
        .filter_map(|(p, k)| k.then_some(p))
        .collect();
    Stroke::new(
        survivors
            .windows(2)
            .map(|w| SubStroke::new(w[0], w[1], pen_down))
            .collect(),
    )
}

fn mark_kept(points: &[Point], lo: usize, hi: usize, epsilon: f64, kept: &mut [bool]) {
    if hi <= lo + 1 {
        return;
    }
    let mut worst = lo;
    let mut worst_dist = 0.0;
    for i in lo + 1..hi {
        let d = perpendicular_distance(points[i], points[lo], points[hi]);
        if d > worst_dist {
            worst_dist = d;
            worst = i;
        }
    }
    if worst_dist > epsilon {
        kept[worst] = true;
        mark_kept(points, lo, worst, epsilon, kept);
        mark_kept(points, worst, hi, epsilon, kept);
    }
}

fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let (px, py) = p.as_f64();
    let (ax, ay) = a.as_f64();
    let (bx, by) = b.as_f64();
    let (dx, dy) = (bx - ax, by - ay);
    let len = (dx * dx + dy * dy).sqrt();
    if len < 1e-12 {
        return p.dist(&a);
    }
    ((py - ay) * dx - (px - ax) * dy).abs() / len
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_stroke(x: i32, y0: i32, y1: i32, parts: i32) -> Stroke {
        let step = (y1 - y0) / parts;
        Stroke::new(
            (0..parts)
                .map(|k| {
                    SubStroke::new(
                        Point::new(x, y0 + k * step),
                        Point::new(x, y0 + (k + 1) * step),
                        true,
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn sharp_reversal_splits_the_stroke() {
        let mut segments: Vec<SubStroke> = (0..5)
            .map(|k| SubStroke::new(Point::new(0, 10 * k), Point::new(0, 10 * (k + 1)), true))
            .collect();
        segments.extend(
            (0..5).map(|k| SubStroke::new(Point::new(0, 50 - 10 * k), Point::new(0, 40 - 10 * k), true)),
        );
        let split = split_by_direction(vec![Stroke::new(segments)], 160.0);
        assert_eq!(split.len(), 2);
        assert_eq!(split[0].segments.len(), 5);
        assert_eq!(split[1].segments.len(), 5);
    }

    #[test]
    fn right_angle_turn_does_not_split() {
        let segments = vec![
            SubStroke::new(Point::new(0, 0), Point::new(0, 10), true),
            SubStroke::new(Point::new(0, 10), Point::new(10, 10), true),
        ];
        let split = split_by_direction(vec![Stroke::new(segments)], 160.0);
        assert_eq!(split.len(), 1);
    }

    #[test]
    fn bearing_wraparound_does_not_split() {
        // Bearings ~11° and ~349°: 22° apart across the wrap.
        let segments = vec![
            SubStroke::new(Point::new(0, 0), Point::new(2, 10), true),
            SubStroke::new(Point::new(2, 10), Point::new(0, 20), true),
        ];
        let split = split_by_direction(vec![Stroke::new(segments)], 160.0);
        assert_eq!(split.len(), 1);
    }

    #[test]
    fn retraced_strokes_are_dropped() {
        let a = line_stroke(10, 10, 90, 8);
        let b = line_stroke(10, 10, 90, 8);
        let c = line_stroke(60, 10, 90, 8);
        let kept = remove_redundancy(vec![a, b, c], (120, 120), &PostConfig::default());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].segments[0].start.x, 60);
    }

    #[test]
    fn pen_up_strokes_are_not_returned() {
        let mut up = line_stroke(10, 10, 90, 8);
        up.set_pen_down(false);
        let down = line_stroke(60, 10, 90, 8);
        let kept = remove_redundancy(vec![up, down], (120, 120), &PostConfig::default());
        assert_eq!(kept.len(), 1);
        assert!(kept[0].pen_down());
    }

    #[test]
    fn simplify_collapses_collinear_chains() {
        let stroke = line_stroke(5, 0, 50, 5);
        let simplified = simplify(&stroke, 3.0);
        assert_eq!(simplified.segments.len(), 1);
        assert_eq!(simplified.segments[0].start, Point::new(5, 0));
        assert_eq!(simplified.segments[0].end, Point::new(5, 50));
    }

    #[test]
    fn simplify_keeps_corners() {
        let segments = vec![
            SubStroke::new(Point::new(0, 0), Point::new(0, 20), true),
            SubStroke::new(Point::new(0, 20), Point::new(0, 40), true),
            SubStroke::new(Point::new(0, 40), Point::new(20, 40), true),
            SubStroke::new(Point::new(20, 40), Point::new(40, 40), true),
        ];
        let simplified = simplify(&Stroke::new(segments), 3.0);
        assert_eq!(simplified.segments.len(), 2);
        assert_eq!(simplified.segments[0].end, Point::new(0, 40));
    }
}
