//! Raw tip record refinement.
//!
//! The per-frame tip record is noisy: occlusions and matching glitches throw
//! isolated samples far off the pen path, and the camera-rate sampling is
//! uneven along the stroke. Refinement rejects outliers with a bounded
//! look-ahead, smooths with a short weighted kernel, and resamples to a
//! fixed arc-length step so later segmentation sees uniform sub-strokes.

use pentrace_core::geometry::Point;

use crate::config::TrajectoryConfig;

// ── Error type ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrajectoryError {
    /// Refinement was handed an empty record.
    EmptyRecord,
}

impl std::fmt::Display for TrajectoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyRecord => write!(f, "trajectory record is empty"),
        }
    }
}

impl std::error::Error for TrajectoryError {}

// ── Refinement stages ────────────────────────────────────────────────────

/// Run outlier rejection, smoothing, and resampling in order.
pub fn refine(record: &[Point], cfg: &TrajectoryConfig) -> Result<Vec<Point>, TrajectoryError> {
    let accepted = reject_outliers(record, cfg)?;
    let smoothed = smooth(&accepted, cfg.smooth_weights)?;
    resample(&smoothed, cfg.resample_step)
}

/// Drop samples that jump off the pen path and return within the look-ahead
/// window.
///
/// A jump past the movement threshold starts a scan of up to `lookahead`
/// following samples for one that lands back near the last accepted point;
/// when found, the intervening samples are dropped. When none returns, the
/// jump is taken to be a genuine fast stroke and the next sample is accepted
/// unconditionally.
pub fn reject_outliers(
    record: &[Point],
    cfg: &TrajectoryConfig,
) -> Result<Vec<Point>, TrajectoryError> {
    let first = *record.first().ok_or(TrajectoryError::EmptyRecord)?;
    let mut accepted = vec![first];
    let mut i = 1;
    while i < record.len() {
        let last = accepted[accepted.len() - 1];
        if last.dist(&record[i]) <= cfg.movement_threshold {
            accepted.push(record[i]);
            i += 1;
            continue;
        }
        let end = (i + 1 + cfg.lookahead).min(record.len());
        match (i + 1..end).find(|&j| last.dist(&record[j]) <= cfg.movement_threshold) {
            Some(j) => {
                accepted.push(record[j]);
                i = j + 1;
            }
            None => {
                accepted.push(record[i]);
                i += 1;
            }
        }
    }
    Ok(accepted)
}

/// Replace each interior point by the weighted average of itself and its
/// neighbours; endpoints are kept.
pub fn smooth(record: &[Point], weights: [u32; 3]) -> Result<Vec<Point>, TrajectoryError> {
    if record.is_empty() {
        return Err(TrajectoryError::EmptyRecord);
    }
    let w: [i64; 3] = [
        i64::from(weights[0]),
        i64::from(weights[1]),
        i64::from(weights[2]),
    ];
    let total = (w[0] + w[1] + w[2]).max(1);
    let mut out = record.to_vec();
    for i in 1..record.len().saturating_sub(1) {
        let (a, b, c) = (record[i - 1], record[i], record[i + 1]);
        out[i] = Point::new(
            weighted(a.x, b.x, c.x, w, total),
            weighted(a.y, b.y, c.y, w, total),
        );
    }
    Ok(out)
}

fn weighted(a: i32, b: i32, c: i32, w: [i64; 3], total: i64) -> i32 {
    let sum = w[0] * i64::from(a) + w[1] * i64::from(b) + w[2] * i64::from(c);
    (sum as f64 / total as f64).round() as i32
}

/// Walk the polyline emitting a point every `step` pixels of arc length.
///
/// The first point is kept verbatim, leftover distance carries across
/// segment boundaries, and a final remainder shorter than the step is
/// dropped. A non-positive step returns the record unchanged.
pub fn resample(record: &[Point], step: f64) -> Result<Vec<Point>, TrajectoryError> {
    let first = *record.first().ok_or(TrajectoryError::EmptyRecord)?;
    if step <= 0.0 {
        return Ok(record.to_vec());
    }
    let mut out = vec![first];
    let mut carry = 0.0;
    for pair in record.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let seg = a.dist(&b);
        if seg == 0.0 {
            continue;
        }
        let mut travelled = step - carry;
        while travelled <= seg {
            let t = travelled / seg;
            let x = f64::from(a.x) + f64::from(b.x - a.x) * t;
            let y = f64::from(a.y) + f64::from(b.y - a.y) * t;
            out.push(Point::new(x.round() as i32, y.round() as i32));
            travelled += step;
        }
        carry = seg - (travelled - step);
    }
    Ok(out)
}
