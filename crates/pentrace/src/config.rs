use std::path::Path;

use pentrace_core::corners::GoodFeaturesConfig;
use pentrace_core::flow::FlowConfig;
use pentrace_core::kalman::KalmanConfig;
use pentrace_core::template::PyramidConfig;

/// Frame zone classification controls.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ZoneConfig {
    /// Side length (pixels) of the square classification window.
    pub window_size: u32,
    /// Lower Canny hysteresis threshold for the zone edge map.
    pub canny_low: f32,
    /// Upper Canny hysteresis threshold for the zone edge map.
    pub canny_high: f32,
    /// Gray levels at or below this count as dark (occluder) pixels.
    pub dark_pixel_max: u8,
    /// Windows whose dark-pixel fraction exceeds this are not whiteboard.
    pub max_dark_fraction: f64,
    /// Minimum mean of the inverted edge window for a blank whiteboard zone.
    pub whiteboard_min_mean: f64,
    /// Maximum residual edge density for a text zone.
    pub text_max_density: f64,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            window_size: 100,
            canny_low: 75.0,
            canny_high: 150.0,
            dark_pixel_max: 80,
            max_dark_fraction: 0.20,
            whiteboard_min_mean: 252.0,
            text_max_density: 1.5,
        }
    }
}

/// Camera-motion registration controls.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RegistrarConfig {
    /// Zone classification controls.
    pub zone: ZoneConfig,
    /// Minimum text zones a frame needs before it can anchor registration.
    pub min_text_zones: usize,
    /// Minimum surviving flow correspondences for a rigid fit.
    pub min_track_points: usize,
    /// Maximum accepted mean residual (pixels) of the rigid fit.
    pub max_residual_px: f64,
    /// Search margin (pixels) around the registration rectangle for the
    /// translation-only fallback match.
    pub search_margin: i32,
    /// Margin trimmed off each side of the registration rectangle.
    pub rect_trim: i32,
    /// Corners closer to the rectangle border than this fraction of its
    /// dimensions are discarded.
    pub border_frac: f32,
    /// Corner detection controls.
    pub corners: GoodFeaturesConfig,
    /// Optical flow controls.
    pub flow: FlowConfig,
}

impl Default for RegistrarConfig {
    fn default() -> Self {
        Self {
            zone: ZoneConfig::default(),
            min_text_zones: 3,
            min_track_points: 3,
            max_residual_px: 1.0,
            search_margin: 25,
            rect_trim: 10,
            border_frac: 0.05,
            corners: GoodFeaturesConfig::default(),
            flow: FlowConfig::default(),
        }
    }
}

/// Pen template confirmation and re-acquisition controls.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TemplateTrackerConfig {
    /// Matches below this NCC fitness trigger a full-frame pyramid search.
    pub fitness_threshold: f64,
    /// Search margin (pixels) around the predicted position.
    pub search_margin: i32,
    /// Pyramid re-acquisition controls.
    pub pyramid: PyramidConfig,
}

impl Default for TemplateTrackerConfig {
    fn default() -> Self {
        Self {
            fitness_threshold: 0.98,
            search_margin: 20,
            pyramid: PyramidConfig::default(),
        }
    }
}

/// Ballpoint tip localization controls.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BallpointConfig {
    /// Unsharp-mask weight applied to the pen patch.
    pub sharpen_weight: f32,
    /// Gaussian sigma of the unsharp-mask blur.
    pub sharpen_sigma: f32,
    /// Lower Canny hysteresis threshold for pen edges.
    pub canny_low: f32,
    /// Upper Canny hysteresis threshold for pen edges.
    pub canny_high: f32,
    /// Contours with fewer boundary points than this are discarded.
    pub min_contour_points: usize,
    /// Dilation radius applied to surviving contours before line detection.
    pub thicken_radius: u8,
    /// Hough accumulator votes required for a line.
    pub hough_vote_threshold: u32,
    /// Hough non-maximum suppression radius.
    pub hough_suppression_radius: u32,
    /// At most this many strongest lines are intersected.
    pub max_lines: usize,
    /// The valid tip zone extends this many pixels above and left of the
    /// patch origin.
    pub zone_margin: i32,
    /// Largest ring searched when snapping the tip onto an edge pixel.
    pub snap_radius: i32,
}

impl Default for BallpointConfig {
    fn default() -> Self {
        Self {
            sharpen_weight: 0.5,
            sharpen_sigma: 5.0,
            canny_low: 125.0,
            canny_high: 250.0,
            min_contour_points: 10,
            thicken_radius: 1,
            hough_vote_threshold: 10,
            hough_suppression_radius: 8,
            max_lines: 25,
            zone_margin: 10,
            snap_radius: 9,
        }
    }
}

/// Raw tip record refinement controls.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TrajectoryConfig {
    /// Jumps longer than this (pixels) between consecutive accepted samples
    /// are treated as outliers.
    pub movement_threshold: f64,
    /// How many samples past an outlier are scanned for a return to the
    /// accepted path.
    pub lookahead: usize,
    /// Weights of the three-tap position smoothing kernel.
    pub smooth_weights: [u32; 3],
    /// Arc-length spacing (pixels) of resampled trajectory points.
    pub resample_step: f64,
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            movement_threshold: 40.0,
            lookahead: 10,
            smooth_weights: [1, 2, 1],
            resample_step: 2.0,
        }
    }
}

/// Pen-up/pen-down segmentation controls.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SegmentConfig {
    /// Maximum added-ink-per-length ratio for a segment to count as written.
    pub max_ink_difference: f64,
    /// Padding (pixels) around a segment when cropping the ink trace.
    pub crop_margin: i32,
    /// Strokes shorter than this (pixels) are assimilated into neighbors.
    pub min_stroke_length: f64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            max_ink_difference: 0.4,
            crop_margin: 5,
            min_stroke_length: 10.0,
        }
    }
}

/// Stroke post-processing controls.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PostConfig {
    /// Split strokes at sharp direction reversals.
    pub split_by_direction: bool,
    /// Minimum absolute bearing change (degrees) that forces a split.
    pub direction_threshold: f64,
    /// Pen-down strokes contributing fewer unique ink pixels than this are
    /// dropped as redundant.
    pub min_contribution_px: u32,
    /// Dilation radius used when rendering a stroke for the redundancy check.
    pub draw_radius: u8,
    /// Extra dilation radius applied to the other-strokes mask.
    pub mask_radius: u8,
    /// Douglas-Peucker tolerance (pixels); `None` disables simplification.
    pub simplify_epsilon: Option<f64>,
}

impl Default for PostConfig {
    fn default() -> Self {
        Self {
            split_by_direction: true,
            direction_threshold: 160.0,
            min_contribution_px: 275,
            draw_radius: 2,
            mask_radius: 5,
            simplify_epsilon: None,
        }
    }
}

/// Final-frame ink trace extraction controls.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct InkTraceConfig {
    /// Box blur radius applied before thresholding.
    pub blur_radius: u32,
    /// Neighborhood radius of the adaptive mean threshold.
    pub block_radius: u32,
    /// Offset subtracted from the local mean before comparison.
    pub offset: i16,
    /// Dilation radius applied to the thresholded ink mask.
    pub thicken_radius: u8,
}

impl Default for InkTraceConfig {
    fn default() -> Self {
        Self {
            blur_radius: 1,
            block_radius: 1,
            offset: 2,
            thicken_radius: 7,
        }
    }
}

/// Top-level tracking configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TrackConfig {
    /// Camera-motion registration controls.
    pub registrar: RegistrarConfig,
    /// Template confirmation and re-acquisition controls.
    pub template: TemplateTrackerConfig,
    /// Ballpoint tip localization controls.
    pub ballpoint: BallpointConfig,
    /// Pen position filter controls.
    pub kalman: KalmanConfig,
    /// Raw tip record refinement controls.
    pub trajectory: TrajectoryConfig,
    /// Pen-up/pen-down segmentation controls.
    pub segment: SegmentConfig,
    /// Stroke post-processing controls.
    pub post: PostConfig,
    /// Ink trace extraction controls.
    pub ink: InkTraceConfig,
}

impl TrackConfig {
    /// Load a full tracking configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            registrar: RegistrarConfig::default(),
            template: TemplateTrackerConfig::default(),
            ballpoint: BallpointConfig::default(),
            kalman: KalmanConfig::default(),
            trajectory: TrajectoryConfig::default(),
            segment: SegmentConfig::default(),
            post: PostConfig::default(),
            ink: InkTraceConfig::default(),
        }
    }
}
