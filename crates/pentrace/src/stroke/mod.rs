//! Stroke model and segmentation.
//!
//! A refined trajectory becomes a run of [`SubStroke`] segments, each
//! classified pen-down or pen-up against the final ink trace, grouped into
//! [`Stroke`]s, and post-processed (short-stroke assimilation, direction
//! splits, redundancy removal) into the recovered handwriting.

mod post;
mod segment;

pub use post::{remove_redundancy, render_strokes, simplify, split_by_direction};
pub use segment::{assimilate, classify, group};

use pentrace_core::geometry::Point;

/// One resampled trajectory segment with its pen state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SubStroke {
    pub start: Point,
    pub end: Point,
    pub pen_down: bool,
}

impl SubStroke {
    pub fn new(start: Point, end: Point, pen_down: bool) -> Self {
        Self {
            start,
            end,
            pen_down,
        }
    }

    pub fn length(&self) -> f64 {
        self.start.dist(&self.end)
    }

    /// Travel direction in degrees: 0° points down the image, 90° right,
    /// 180° up, 270° left.
    pub fn bearing(&self) -> f64 {
        let dy = f64::from(self.end.y - self.start.y);
        let dx = f64::from(self.end.x - self.start.x);
        (-dy.atan2(dx).to_degrees() + 90.0).rem_euclid(360.0)
    }
}

/// A maximal run of equal-state sub-strokes.
///
/// Strokes produced by this crate are never empty.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Stroke {
    pub segments: Vec<SubStroke>,
}

impl Stroke {
    pub fn new(segments: Vec<SubStroke>) -> Self {
        debug_assert!(!segments.is_empty());
        Self { segments }
    }

    pub fn pen_down(&self) -> bool {
        self.segments.first().is_some_and(|s| s.pen_down)
    }

    /// Total arc length over all segments.
    pub fn length(&self) -> f64 {
        self.segments.iter().map(SubStroke::length).sum()
    }

    pub fn set_pen_down(&mut self, pen_down: bool) {
        for s in &mut self.segments {
            s.pen_down = pen_down;
        }
    }
}

/// Pair consecutive trajectory points into pen-down candidate sub-strokes.
pub fn substrokes_from_points(points: &[Point]) -> Vec<SubStroke> {
    points
        .windows(2)
        .map(|w| SubStroke::new(w[0], w[1], true))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearing_cardinal_directions() {
        let cases = [
            ((0, 10), 0.0),
            ((10, 0), 90.0),
            ((0, -10), 180.0),
            ((-10, 0), 270.0),
        ];
        for ((dx, dy), expected) in cases {
            let s = SubStroke::new(Point::new(0, 0), Point::new(dx, dy), true);
            assert!(
                (s.bearing() - expected).abs() < 1e-9,
                "({dx}, {dy}) -> {}",
                s.bearing()
            );
        }
    }

    #[test]
    fn stroke_length_sums_segments() {
        let stroke = Stroke::new(vec![
            SubStroke::new(Point::new(0, 0), Point::new(3, 4), true),
            SubStroke::new(Point::new(3, 4), Point::new(3, 14), true),
        ]);
        assert!((stroke.length() - 15.0).abs() < 1e-9);
        assert!(stroke.pen_down());
    }

    #[test]
    fn substrokes_pair_consecutive_points() {
        let points = [Point::new(0, 0), Point::new(0, 2), Point::new(2, 2)];
        let subs = substrokes_from_points(&points);
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].start, Point::new(0, 0));
        assert_eq!(subs[0].end, Point::new(0, 2));
        assert_eq!(subs[1].start, Point::new(0, 2));
        assert!(subs.iter().all(|s| s.pen_down));
    }
}
