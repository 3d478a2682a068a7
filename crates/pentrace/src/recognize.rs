//! Symbol recognition seam.
//!
//! The crate stops at stroke reconstruction; handwriting recognition is an
//! external concern. [`Recognizer`] is the boundary: downstream engines
//! consume [`StrokeTrace`]s and return ranked [`SymbolCandidate`]s.
//! [`group_characters`] bundles reconstructed strokes into per-character
//! trace lists by proximity, which is the granularity engines expect.

use pentrace_core::geometry::Point;

use crate::stroke::{Stroke, SubStroke};

/// Ordered pen-tip polyline extracted from a stroke.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StrokeTrace {
    /// Trajectory points in reference coordinates.
    pub points: Vec<Point>,
    /// Whether the pen was writing while travelling this trace.
    pub pen_down: bool,
}

impl StrokeTrace {
    /// Flatten a stroke into its polyline: segment starts plus the final end.
    pub fn from_stroke(stroke: &Stroke) -> Self {
        let mut points: Vec<Point> = stroke.segments.iter().map(|s| s.start).collect();
        if let Some(last) = stroke.segments.last() {
            points.push(last.end);
        }
        Self {
            points,
            pen_down: stroke.pen_down(),
        }
    }
}

/// One ranked recognition hypothesis.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SymbolCandidate {
    /// The recognized symbol.
    pub symbol: String,
    /// Engine confidence in `[0, 1]`.
    pub confidence: f32,
}

/// A handwriting recognition engine.
pub trait Recognizer {
    /// Recognize the symbol drawn by `traces`, best candidates first.
    fn recognize(&mut self, traces: &[StrokeTrace]) -> Vec<SymbolCandidate>;
}

/// Group strokes into characters by transitive proximity.
///
/// Two strokes belong to the same character when any pair of their segment
/// midpoints lies within `radius` pixels. Closure is transitive: a stroke
/// joins a character when it is close to any stroke already in it.
pub fn group_characters(strokes: &[Stroke], radius: f64) -> Vec<Vec<StrokeTrace>> {
    let mut unassigned = vec![true; strokes.len()];
    let mut characters = Vec::new();

    for i in 0..strokes.len() {
        if !unassigned[i] {
            continue;
        }
        unassigned[i] = false;
        let mut members = vec![i];
        let mut scan = 0;
        while scan < members.len() {
            let anchor = members[scan];
            for (j, free) in unassigned.iter_mut().enumerate() {
                if *free && touches(&strokes[anchor], &strokes[j], radius) {
                    *free = false;
                    members.push(j);
                }
            }
            scan += 1;
        }
        characters.push(
            members
                .iter()
                .map(|&k| StrokeTrace::from_stroke(&strokes[k]))
                .collect(),
        );
    }
    characters
}

fn touches(a: &Stroke, b: &Stroke, radius: f64) -> bool {
    a.segments.iter().any(|sa| {
        let ma = midpoint(sa);
        b.segments.iter().any(|sb| ma.dist(&midpoint(sb)) < radius)
    })
}

fn midpoint(s: &SubStroke) -> Point {
    Point::new((s.start.x + s.end.x) / 2, (s.start.y + s.end.y) / 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_stroke(x: i32, y0: i32, y1: i32) -> Stroke {
        let mid = (y0 + y1) / 2;
        Stroke::new(vec![
            SubStroke::new(Point::new(x, y0), Point::new(x, mid), true),
            SubStroke::new(Point::new(x, mid), Point::new(x, y1), true),
        ])
    }

    #[test]
    fn from_stroke_flattens_segments() {
        let trace = StrokeTrace::from_stroke(&line_stroke(4, 0, 10));
        assert_eq!(
            trace.points,
            vec![Point::new(4, 0), Point::new(4, 5), Point::new(4, 10)]
        );
        assert!(trace.pen_down);
    }

    #[test]
    fn nearby_strokes_form_one_character() {
        let strokes = vec![line_stroke(0, 0, 10), line_stroke(3, 0, 10), line_stroke(60, 0, 10)];
        let characters = group_characters(&strokes, 5.0);

        assert_eq!(characters.len(), 2);
        assert_eq!(characters[0].len(), 2);
        assert_eq!(characters[1].len(), 1);
    }

    #[test]
    fn grouping_is_transitive() {
        // 0 and 8 are too far apart directly, but 4 bridges them.
        let strokes = vec![line_stroke(0, 0, 10), line_stroke(8, 0, 10), line_stroke(4, 0, 10)];
        let characters = group_characters(&strokes, 5.0);

        assert_eq!(characters.len(), 1);
        assert_eq!(characters[0].len(), 3);
    }

    #[test]
    fn recognizer_trait_is_object_safe() {
        struct CountingStub;

        impl Recognizer for CountingStub {
            fn recognize(&mut self, traces: &[StrokeTrace]) -> Vec<SymbolCandidate> {
                vec![SymbolCandidate {
                    symbol: traces.len().to_string(),
                    confidence: 1.0,
                }]
            }
        }

        let mut engine: Box<dyn Recognizer> = Box::new(CountingStub);
        let traces = vec![StrokeTrace::from_stroke(&line_stroke(0, 0, 10))];
        let candidates = engine.recognize(&traces);
        assert_eq!(candidates[0].symbol, "1");
    }
}
