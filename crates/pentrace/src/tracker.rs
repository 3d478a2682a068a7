//! High-level tracking API.
//!
//! [`PenTracker`] is the primary entry point for reconstructing pen strokes
//! from whiteboard video. It wraps a [`TrackConfig`] and drives the tracking
//! pipeline over any [`VideoSource`].

use image::GrayImage;

use crate::config::TrackConfig;
use crate::pipeline::{FrameUpdate, TrackError, TrackResult};
use crate::video::VideoSource;

/// Primary tracking interface.
///
/// Encapsulates the tracking configuration. Create once, run on many videos.
///
/// # Examples
///
/// ```no_run
/// use pentrace::{ImageSequenceSource, PenTracker};
///
/// let mut source = ImageSequenceSource::new("frames", 550)?;
/// let template = image::open("template.jpg")?.to_luma8();
/// let result = PenTracker::new().run(&mut source, &template)?;
/// println!("Reconstructed {} strokes", result.strokes.len());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct PenTracker {
    config: TrackConfig,
}

impl PenTracker {
    /// Create a tracker with the default configuration.
    pub fn new() -> Self {
        Self {
            config: TrackConfig::default(),
        }
    }

    /// Create with full config control.
    pub fn with_config(config: TrackConfig) -> Self {
        Self { config }
    }

    /// Access the current configuration.
    pub fn config(&self) -> &TrackConfig {
        &self.config
    }

    /// Mutable access to configuration for post-construction tuning.
    pub fn config_mut(&mut self) -> &mut TrackConfig {
        &mut self.config
    }

    /// Track `template` through `source` and reconstruct the pen strokes.
    ///
    /// The template is a crop of the pen as it appears in the first frame,
    /// with the writing tip near its top-left corner. The source is drained
    /// to its last frame, which supplies the ink trace for stroke
    /// classification.
    pub fn run(
        &self,
        source: &mut dyn VideoSource,
        template: &GrayImage,
    ) -> Result<TrackResult, TrackError> {
        crate::pipeline::track(source, template, &self.config, None)
    }

    /// Like [`PenTracker::run`], invoking `observer` after every tracked
    /// frame with the per-frame state.
    pub fn run_with_observer<F>(
        &self,
        source: &mut dyn VideoSource,
        template: &GrayImage,
        mut observer: F,
    ) -> Result<TrackResult, TrackError>
    where
        F: FnMut(&FrameUpdate),
    {
        crate::pipeline::track(source, template, &self.config, Some(&mut observer))
    }
}

impl Default for PenTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use image::Luma;
    use imageproc::drawing::draw_line_segment_mut;

    use pentrace_core::geometry::{Point, Rect};
    use pentrace_core::imgproc::crop;

    use super::*;
    use crate::test_utils::scribble;
    use crate::video::VideoError;

    struct FrameSource {
        frames: VecDeque<GrayImage>,
        served: u64,
    }

    impl FrameSource {
        fn new(frames: Vec<GrayImage>) -> Self {
            Self {
                frames: frames.into(),
                served: 0,
            }
        }
    }

    impl VideoSource for FrameSource {
        fn frame_available(&self) -> bool {
            !self.frames.is_empty()
        }

        fn next_frame(&mut self) -> Result<GrayImage, VideoError> {
            let frame = self.frames.pop_front().ok_or(VideoError::EndOfStream)?;
            self.served += 1;
            Ok(frame)
        }

        fn frame_number(&self) -> u64 {
            self.served
        }
    }

    fn draw_pen(frame: &mut GrayImage, tip: Point) {
        for off in 0..2 {
            let x = (tip.x + off) as f32;
            let y = tip.y as f32;
            draw_line_segment_mut(frame, (x, y), (x + 30.0, y + 40.0), Luma([40]));
            draw_line_segment_mut(frame, (x, y), (x + 18.0, y + 46.0), Luma([40]));
        }
    }

    fn draw_trail(frame: &mut GrayImage, from: Point, to: Point) {
        for off in 0..2 {
            let x0 = (from.x + off) as f32;
            let x1 = (to.x + off) as f32;
            draw_line_segment_mut(frame, (x0, from.y as f32), (x1, to.y as f32), Luma([60]));
        }
    }

    /// A static camera watching a pen draw a straight vertical line next to
    /// a board already dense with writing. The existing writing anchors
    /// registration; the tip starts at (260, 40) and moves 4 px down per
    /// frame, leaving ink behind.
    fn synthetic_video(frames: u32) -> (Vec<GrayImage>, GrayImage) {
        let start = Point::new(260, 40);
        let mut sequence = Vec::new();
        for n in 1..=frames {
            let tip = Point::new(start.x, start.y + 4 * (n as i32 - 1));
            let mut frame = GrayImage::from_pixel(300, 300, Luma([255]));
            scribble(&mut frame, Rect::new(5, 5, 140, 290));
            draw_trail(&mut frame, start, tip);
            draw_pen(&mut frame, tip);
            sequence.push(frame);
        }
        let template = crop(&sequence[0], Rect::new(245, 28, 50, 60));
        (sequence, template)
    }

    #[test]
    fn tracks_a_moving_pen_end_to_end() {
        let (frames, template) = synthetic_video(40);
        let mut source = FrameSource::new(frames);

        let mut updates = Vec::new();
        let result = PenTracker::new()
            .run_with_observer(&mut source, &template, |u| updates.push(*u))
            .unwrap();

        assert_eq!(result.frames_processed, 40);
        assert_eq!(result.image_size, [300, 300]);
        assert_eq!(updates.len(), 39);
        assert!(updates.windows(2).all(|w| w[0].frame_number < w[1].frame_number));

        // The static board writing keeps the camera registered.
        assert!(
            result.frames_registered >= 30,
            "only {} frames registered",
            result.frames_registered
        );

        // The tip was visible in nearly every frame.
        assert!(
            result.raw_samples >= 30,
            "only {} raw samples",
            result.raw_samples
        );

        // A single pen-down stroke running straight down near x = 260.
        assert_eq!(result.strokes.len(), 1, "strokes: {:?}", result.strokes);
        let stroke = &result.strokes[0];
        assert!(stroke.pen_down());
        assert!(stroke.length() >= 100.0, "stroke length {}", stroke.length());
        for seg in &stroke.segments {
            assert!((seg.start.x - 260).abs() <= 4, "stray point {:?}", seg.start);
        }
    }

    #[test]
    fn single_frame_yields_empty_result() {
        let (mut frames, template) = synthetic_video(3);
        frames.truncate(1);
        let mut source = FrameSource::new(frames);

        let result = PenTracker::new().run(&mut source, &template).unwrap();
        assert_eq!(result.frames_processed, 1);
        assert_eq!(result.raw_samples, 0);
        assert!(result.strokes.is_empty());
        assert!(result.trajectory.is_empty());
    }

    #[test]
    fn empty_source_is_an_error() {
        let template = GrayImage::from_pixel(8, 8, Luma([0]));
        let mut source = FrameSource::new(Vec::new());

        let err = PenTracker::new().run(&mut source, &template).unwrap_err();
        assert!(matches!(
            err,
            TrackError::Video(VideoError::EndOfStream)
        ));
    }

    #[test]
    fn config_is_tunable_after_construction() {
        let mut tracker = PenTracker::new();
        tracker.config_mut().template.fitness_threshold = 0.9;
        assert_eq!(tracker.config().template.fitness_threshold, 0.9);
    }
}
