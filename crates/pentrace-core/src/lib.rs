//! Core numerics and image primitives for pen-tip tracking.
//!
//! This crate holds the dependency-light building blocks shared by the
//! tracking pipeline:
//!
//! 1. **Geometry**: integer pixel points and rectangles ([`geometry`]).
//! 2. **Affine algebra**: 2×3 transforms with homogeneous composition,
//!    inversion and rigid least-squares estimation ([`affine`]).
//! 3. **Kalman filtering**: a constant-acceleration 2D point tracker
//!    ([`kalman`]).
//! 4. **Image operations**: blur, sharpen, thresholding, morphology, edge
//!    detection, pyramid downsampling and warping over [`image::GrayImage`]
//!    ([`imgproc`]).
//! 5. **Feature tracking**: Shi–Tomasi corner detection ([`corners`]) and
//!    pyramidal Lucas–Kanade sparse optical flow ([`flow`]).
//! 6. **Template matching**: normalized cross-correlation with ROI and
//!    coarse-to-fine pyramid search ([`template`]).

pub mod affine;
pub mod corners;
pub mod flow;
pub mod geometry;
pub mod imgproc;
pub mod kalman;
pub mod template;

pub use affine::{AffineError, AffineTransform};
pub use geometry::{Point, Rect};
pub use kalman::{KalmanConfig, KalmanError, KalmanFilter, KalmanState};
pub use template::{TemplateMatch, TemplateMatchError};
