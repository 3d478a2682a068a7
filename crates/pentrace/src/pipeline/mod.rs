//! High-level tracking pipeline.
//!
//! This module is the glue layer that wires the per-frame stages together:
//! registration -> Kalman predict -> template confirm -> ballpoint locate ->
//! Kalman correct. When the source runs dry, `finalize` turns the raw tip
//! record into strokes: ink trace -> trajectory refinement -> segmentation ->
//! post-processing.
//!
//! Algorithmic primitives live in [`crate::registrar`], [`crate::ballpoint`],
//! [`crate::trajectory`], and [`crate::stroke`]. The pipeline layer focuses
//! on stage boundaries, call order, and data flow.

mod finalize;
mod result;
mod run;

pub use result::{FrameUpdate, TrackResult};

pub(crate) use run::track;

use pentrace_core::affine::AffineError;
use pentrace_core::kalman::KalmanError;
use pentrace_core::template::TemplateMatchError;

use crate::trajectory::TrajectoryError;
use crate::video::VideoError;

// ── Error type ───────────────────────────────────────────────────────────

/// Error produced while tracking a video.
#[derive(Debug)]
pub enum TrackError {
    /// The video source failed to deliver a frame.
    Video(VideoError),
    /// Template matching failed.
    Template(TemplateMatchError),
    /// The Kalman filter rejected a measurement.
    Kalman(KalmanError),
    /// A camera transform could not be estimated or inverted.
    Affine(AffineError),
    /// The recorded trajectory could not be refined.
    Trajectory(TrajectoryError),
}

impl std::fmt::Display for TrackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Video(e) => write!(f, "video source: {e}"),
            Self::Template(e) => write!(f, "template matching: {e}"),
            Self::Kalman(e) => write!(f, "kalman filter: {e}"),
            Self::Affine(e) => write!(f, "camera registration: {e}"),
            Self::Trajectory(e) => write!(f, "trajectory refinement: {e}"),
        }
    }
}

impl std::error::Error for TrackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Video(e) => Some(e),
            Self::Template(e) => Some(e),
            Self::Kalman(e) => Some(e),
            Self::Affine(e) => Some(e),
            Self::Trajectory(e) => Some(e),
        }
    }
}

impl From<VideoError> for TrackError {
    fn from(e: VideoError) -> Self {
        Self::Video(e)
    }
}

impl From<TemplateMatchError> for TrackError {
    fn from(e: TemplateMatchError) -> Self {
        Self::Template(e)
    }
}

impl From<KalmanError> for TrackError {
    fn from(e: KalmanError) -> Self {
        Self::Kalman(e)
    }
}

impl From<AffineError> for TrackError {
    fn from(e: AffineError) -> Self {
        Self::Affine(e)
    }
}

impl From<TrajectoryError> for TrackError {
    fn from(e: TrajectoryError) -> Self {
        Self::Trajectory(e)
    }
}
