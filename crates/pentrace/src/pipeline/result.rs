use pentrace_core::geometry::Point;
use pentrace_core::template::TemplateMatch;

use crate::stroke::Stroke;

/// Full tracking result for one video.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TrackResult {
    /// Reconstructed pen-down strokes in reference-frame coordinates.
    pub strokes: Vec<Stroke>,
    /// Refined pen-tip trajectory the strokes were built from.
    pub trajectory: Vec<Point>,
    /// Raw tip samples recorded before trajectory refinement.
    pub raw_samples: usize,
    /// Frames pulled from the source, the seed frame included.
    pub frames_processed: u64,
    /// Frames whose camera motion was registered against the reference.
    pub frames_registered: u64,
    /// Frame dimensions [width, height].
    pub image_size: [u32; 2],
}

impl TrackResult {
    /// Construct an empty result for frames with the provided dimensions.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            strokes: Vec::new(),
            trajectory: Vec::new(),
            raw_samples: 0,
            frames_processed: 0,
            frames_registered: 0,
            image_size: [width, height],
        }
    }

    /// Total inked length across all strokes, in reference pixels.
    pub fn ink_length(&self) -> f64 {
        self.strokes.iter().map(Stroke::length).sum()
    }
}

/// Per-frame progress report handed to a tracking observer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUpdate {
    /// 1-based frame number within the source.
    pub frame_number: u64,
    /// Whether camera motion was registered for this frame.
    pub registered: bool,
    /// Kalman-predicted template position, before matching.
    pub predicted: Point,
    /// Confirmed template match for this frame.
    pub matched: TemplateMatch,
    /// Pen-tip sample in reference coordinates, when the ballpoint was found.
    pub tip: Option<Point>,
}
