//! Finishing pass: turn the raw tip record into strokes.
//!
//! The last frame of the video carries the complete ink trace. It is
//! binarized there, warped into reference coordinates through the inverse
//! of the accumulated camera transform, and used to classify trajectory
//! segments as pen-down or pen-up.

use image::GrayImage;

use pentrace_core::geometry::Point;
use pentrace_core::imgproc::{adaptive_threshold_inv, box_blur, dilate, warp_affine};

use crate::config::{InkTraceConfig, TrackConfig};
use crate::registrar::Registrar;
use crate::stroke;
use crate::trajectory;

use super::{TrackError, TrackResult};

pub(super) fn run(
    final_frame: &GrayImage,
    record: Vec<Point>,
    registrar: &Registrar,
    frames_processed: u64,
    config: &TrackConfig,
) -> Result<TrackResult, TrackError> {
    let (width, height) = final_frame.dimensions();
    let frames_registered = registrar.frames_registered();
    if record.is_empty() {
        log::warn!("no pen-tip samples were recorded, returning an empty result");
        let mut out = TrackResult::empty(width, height);
        out.frames_processed = frames_processed;
        out.frames_registered = frames_registered;
        return Ok(out);
    }

    // The accumulated transform maps reference coordinates into the final
    // frame; the ink trace needs the reverse direction.
    let to_reference = registrar.full_transform().inverse()?;
    let ink = warp_affine(
        &extract_ink_trace(final_frame, &config.ink),
        &to_reference,
        0,
    )?;

    let trajectory = trajectory::refine(&record, &config.trajectory)?;
    let classified = stroke::classify(
        &stroke::substrokes_from_points(&trajectory),
        &ink,
        &config.segment,
    );
    let mut strokes = stroke::assimilate(
        stroke::group(&classified),
        config.segment.min_stroke_length,
    );
    if config.post.split_by_direction {
        strokes = stroke::split_by_direction(strokes, config.post.direction_threshold);
    }
    let mut strokes = stroke::remove_redundancy(strokes, (width, height), &config.post);
    if let Some(epsilon) = config.post.simplify_epsilon {
        for s in &mut strokes {
            *s = stroke::simplify(s, epsilon);
        }
    }
    log::debug!(
        "finalized {} strokes from {} raw samples ({} trajectory points)",
        strokes.len(),
        record.len(),
        trajectory.len()
    );

    Ok(TrackResult {
        strokes,
        trajectory,
        raw_samples: record.len(),
        frames_processed,
        frames_registered,
        image_size: [width, height],
    })
}

/// Binarize the ink on a whiteboard frame into a thickened mask.
///
/// Ink is darker than its local neighbourhood, so a light blur followed by
/// an inverted adaptive threshold keeps pen strokes and drops the board.
/// The mask is dilated so thin strokes still overlap the trajectory after
/// the warp into reference coordinates.
pub(crate) fn extract_ink_trace(frame: &GrayImage, cfg: &InkTraceConfig) -> GrayImage {
    let blurred = box_blur(frame, cfg.blur_radius);
    let mask = adaptive_threshold_inv(&blurred, cfg.block_radius, cfg.offset);
    dilate(&mask, cfg.thicken_radius)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn ink_trace_keeps_pen_strokes() {
        let mut frame = GrayImage::from_pixel(120, 120, Luma([250]));
        for y in 20..100 {
            frame.put_pixel(60, y, Luma([40]));
        }
        let mask = extract_ink_trace(&frame, &InkTraceConfig::default());

        assert!(mask.get_pixel(60, 60)[0] > 0, "stroke pixel missing");
        assert_eq!(mask.get_pixel(10, 10)[0], 0, "blank board marked as ink");
    }

    #[test]
    fn ink_trace_mask_is_thickened() {
        let mut frame = GrayImage::from_pixel(120, 120, Luma([250]));
        for y in 20..100 {
            frame.put_pixel(60, y, Luma([40]));
        }
        let cfg = InkTraceConfig::default();
        let mask = extract_ink_trace(&frame, &cfg);

        let off = 60 + u32::from(cfg.thicken_radius);
        assert!(
            mask.get_pixel(off, 60)[0] > 0,
            "dilation did not widen the stroke"
        );
    }
}
