//! Pen state classification and stroke grouping.
//!
//! The trajectory alone cannot tell writing from repositioning: both move
//! the tip. The final frame's ink trace can. A candidate segment whose line
//! is already covered by ink adds almost nothing when drawn into the trace,
//! while a segment over blank board adds roughly its own length in pixels.

use image::GrayImage;
use imageproc::drawing::draw_line_segment_mut;

use pentrace_core::geometry::{Point, Rect};
use pentrace_core::imgproc::crop;

use crate::config::SegmentConfig;

use super::{Stroke, SubStroke};

/// Classify each candidate segment pen-down or pen-up against the ink trace.
pub fn classify(substrokes: &[SubStroke], ink: &GrayImage, cfg: &SegmentConfig) -> Vec<SubStroke> {
    substrokes
        .iter()
        .map(|s| {
            let pen_down = ink_difference(ink, s.start, s.end, cfg.crop_margin)
                / s.length().max(1.0)
                < cfg.max_ink_difference;
            SubStroke::new(s.start, s.end, pen_down)
        })
        .collect()
}

/// White pixels added by drawing the segment into its ink trace crop.
fn ink_difference(ink: &GrayImage, start: Point, end: Point, margin: i32) -> f64 {
    let bounds = Rect::new(
        start.x.min(end.x) - margin,
        start.y.min(end.y) - margin,
        (start.x - end.x).abs() + 2 * margin + 1,
        (start.y - end.y).abs() + 2 * margin + 1,
    )
    .clip_to(ink.width(), ink.height());
    if bounds.is_empty() {
        // Entirely off the trace: nothing can have been written here.
        return f64::MAX;
    }

    let base = crop(ink, bounds);
    let before = count_white(&base);
    let mut drawn = base.clone();
    draw_line_segment_mut(
        &mut drawn,
        (
            (start.x - bounds.x) as f32,
            (start.y - bounds.y) as f32,
        ),
        ((end.x - bounds.x) as f32, (end.y - bounds.y) as f32),
        image::Luma([255]),
    );
    (count_white(&drawn) - before) as f64
}

fn count_white(img: &GrayImage) -> usize {
    img.pixels().filter(|p| p[0] > 0).count()
}

/// Group consecutive equal-state sub-strokes into strokes.
pub fn group(substrokes: &[SubStroke]) -> Vec<Stroke> {
    let mut strokes: Vec<Stroke> = Vec::new();
    for &s in substrokes {
        match strokes.last_mut() {
            Some(stroke) if stroke.pen_down() == s.pen_down => stroke.segments.push(s),
            _ => strokes.push(Stroke::new(vec![s])),
        }
    }
    strokes
}

/// Absorb strokes shorter than `min_len` into their neighbours.
///
/// A short stroke flips to its neighbours' state and merges: the first or
/// last stroke into its single neighbour, an interior stroke into both
/// (which share a state by construction). Repeats until no stroke is short.
/// No segments are dropped.
pub fn assimilate(mut strokes: Vec<Stroke>, min_len: f64) -> Vec<Stroke> {
    loop {
        if strokes.len() < 2 {
            return strokes;
        }
        let Some(i) = strokes.iter().position(|s| s.length() < min_len) else {
            return strokes;
        };
        let mut short = strokes.remove(i);
        if i == 0 {
            short.set_pen_down(strokes[0].pen_down());
            let mut segments = short.segments;
            segments.append(&mut strokes[0].segments);
            strokes[0].segments = segments;
        } else if i == strokes.len() {
            let prev = &mut strokes[i - 1];
            short.set_pen_down(prev.pen_down());
            prev.segments.append(&mut short.segments);
        } else {
            let mut next = strokes.remove(i);
            let prev = &mut strokes[i - 1];
            short.set_pen_down(prev.pen_down());
            prev.segments.append(&mut short.segments);
            prev.segments.append(&mut next.segments);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrajectoryConfig;
    use crate::stroke::substrokes_from_points;
    use crate::test_utils::ink_line;
    use crate::trajectory;

    fn seg(y0: i32, y1: i32, pen_down: bool) -> SubStroke {
        SubStroke::new(Point::new(0, y0), Point::new(0, y1), pen_down)
    }

    #[test]
    fn grouping_splits_on_state_change() {
        let subs = vec![
            seg(0, 10, true),
            seg(10, 20, true),
            seg(20, 30, false),
            seg(30, 40, true),
        ];
        let strokes = group(&subs);
        assert_eq!(strokes.len(), 3);
        assert_eq!(strokes[0].segments.len(), 2);
        assert!(strokes[0].pen_down());
        assert!(!strokes[1].pen_down());
        assert!(strokes[2].pen_down());
    }

    #[test]
    fn short_interior_stroke_is_absorbed() {
        let mut subs: Vec<SubStroke> = (0..5).map(|k| seg(10 * k, 10 * (k + 1), true)).collect();
        subs.push(seg(50, 52, false));
        subs.extend((0..5).map(|k| seg(52 + 10 * k, 62 + 10 * k, true)));
        let total = subs.len();

        let strokes = assimilate(group(&subs), 10.0);
        assert_eq!(strokes.len(), 1);
        assert!(strokes[0].pen_down());
        assert_eq!(strokes[0].segments.len(), total);
    }

    #[test]
    fn short_leading_stroke_joins_its_neighbour() {
        let subs = vec![seg(0, 3, false), seg(3, 23, true), seg(23, 43, true)];
        let strokes = assimilate(group(&subs), 10.0);
        assert_eq!(strokes.len(), 1);
        assert!(strokes[0].pen_down());
        assert_eq!(strokes[0].segments.len(), 3);
    }

    #[test]
    fn inked_segments_are_pen_down() {
        let ink = ink_line(120, 120, (20, 10), (20, 110), 7);
        let on = SubStroke::new(Point::new(20, 30), Point::new(20, 50), true);
        let off = SubStroke::new(Point::new(80, 30), Point::new(80, 50), true);
        let classified = classify(&[on, off], &ink, &SegmentConfig::default());
        assert!(classified[0].pen_down);
        assert!(!classified[1].pen_down);
    }

    #[test]
    fn straight_record_yields_one_pen_down_stroke() {
        let record: Vec<Point> = (0..100)
            .map(|k| Point::new(0, (f64::from(k) * 200.0 / 99.0).round() as i32))
            .collect();
        let cfg = TrajectoryConfig {
            resample_step: 10.0,
            ..TrajectoryConfig::default()
        };
        let refined = trajectory::refine(&record, &cfg).unwrap();
        let candidates = substrokes_from_points(&refined);

        let ink = ink_line(60, 240, (0, 0), (0, 200), 7);
        let classified = classify(&candidates, &ink, &SegmentConfig::default());
        let strokes = assimilate(group(&classified), SegmentConfig::default().min_stroke_length);

        assert_eq!(strokes.len(), 1);
        assert!(strokes[0].pen_down());
        let n = strokes[0].segments.len();
        assert!((18..=21).contains(&n), "got {n} segments");
    }
}
