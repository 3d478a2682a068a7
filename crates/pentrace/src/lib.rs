//! pentrace — pen-tip tracking and stroke reconstruction from whiteboard
//! lecture video.
//!
//! Given a frame sequence and a template of the pen, the tracker follows the
//! writing tip through the video and rebuilds what was written. The pipeline
//! stages are:
//!
//! 1. **Register** – classify frame zones, track corner features by optical
//!    flow, fit a rigid frame-to-frame transform.
//! 2. **Predict** – constant-acceleration Kalman filter over the template
//!    position.
//! 3. **Confirm** – normalized cross-correlation around the prediction, with
//!    a coarse-to-fine pyramid re-acquire when the match degrades.
//! 4. **Locate** – ballpoint estimation from Hough line intersections inside
//!    the matched patch.
//! 5. **Trace** – trajectory refinement and pen-up/pen-down classification
//!    against the ink visible in the final frame.
//! 6. **Assemble** – group segments into strokes, absorb stubs, split at
//!    direction reversals, drop retraced ink.
//!
//! # Public API
//! - [`PenTracker`] as the primary entry point
//! - [`TrackConfig`] for advanced tuning
//! - [`VideoSource`] for frame acquisition, [`Recognizer`] for downstream
//!   handwriting engines
//!
//! The stage modules are public for callers that need the pieces; the
//! numeric primitives live in the `pentrace-core` crate.

pub mod ballpoint;
pub mod config;
pub mod debug_dump;
pub mod recognize;
pub mod registrar;
pub mod stroke;
pub mod tracker;
pub mod trajectory;
pub mod video;

mod pipeline;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::TrackConfig;
pub use pipeline::{FrameUpdate, TrackError, TrackResult};
pub use recognize::{Recognizer, StrokeTrace, SymbolCandidate};
pub use stroke::{Stroke, SubStroke};
pub use tracker::PenTracker;
pub use video::{ImageSequenceSource, VideoError, VideoSource};
