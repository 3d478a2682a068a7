//! Shi–Tomasi corner detection for registration feature points.
//!
//! Sobel gradients → smoothed structure tensor → minimum-eigenvalue
//! response, followed by quality thresholding relative to the strongest
//! response and greedy minimum-spacing selection.

use image::{GrayImage, ImageBuffer, Luma};

type GrayF32 = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Border (pixels) excluded from corner candidates; covers the gradient and
/// smoothing support.
const RESPONSE_MARGIN: u32 = 2;

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct GoodFeaturesConfig {
    /// Maximum number of corners returned.
    pub max_corners: usize,
    /// Response threshold as a fraction of the strongest response.
    pub quality_level: f64,
    /// Minimum Euclidean spacing between accepted corners (pixels).
    pub min_distance: f64,
    /// Gaussian sigma used to smooth the structure tensor.
    pub smoothing_sigma: f32,
}

impl Default for GoodFeaturesConfig {
    fn default() -> Self {
        Self {
            max_corners: 100,
            quality_level: 0.2,
            min_distance: 20.0,
            smoothing_sigma: 1.0,
        }
    }
}

/// A detected corner with its minimum-eigenvalue response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corner {
    pub x: f32,
    pub y: f32,
    pub response: f32,
}

/// Detect up to `cfg.max_corners` corners, strongest first.
pub fn good_features_to_track(img: &GrayImage, cfg: &GoodFeaturesConfig) -> Vec<Corner> {
    let (w, h) = img.dimensions();
    if w <= 2 * RESPONSE_MARGIN || h <= 2 * RESPONSE_MARGIN {
        return Vec::new();
    }

    let gx = imageproc::gradients::horizontal_sobel(img);
    let gy = imageproc::gradients::vertical_sobel(img);

    let mut ixx = GrayF32::new(w, h);
    let mut iyy = GrayF32::new(w, h);
    let mut ixy = GrayF32::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let dx = gx.get_pixel(x, y)[0] as f32;
            let dy = gy.get_pixel(x, y)[0] as f32;
            ixx.put_pixel(x, y, Luma([dx * dx]));
            iyy.put_pixel(x, y, Luma([dy * dy]));
            ixy.put_pixel(x, y, Luma([dx * dy]));
        }
    }
    let ixx = imageproc::filter::gaussian_blur_f32(&ixx, cfg.smoothing_sigma);
    let iyy = imageproc::filter::gaussian_blur_f32(&iyy, cfg.smoothing_sigma);
    let ixy = imageproc::filter::gaussian_blur_f32(&ixy, cfg.smoothing_sigma);

    let mut responses = GrayF32::new(w, h);
    let mut max_response = 0.0f32;
    for y in RESPONSE_MARGIN..h - RESPONSE_MARGIN {
        for x in RESPONSE_MARGIN..w - RESPONSE_MARGIN {
            let a = ixx.get_pixel(x, y)[0];
            let b = iyy.get_pixel(x, y)[0];
            let c = ixy.get_pixel(x, y)[0];
            // Smaller eigenvalue of [[a, c], [c, b]].
            let lambda = 0.5 * ((a + b) - ((a - b) * (a - b) + 4.0 * c * c).sqrt());
            responses.put_pixel(x, y, Luma([lambda]));
            max_response = max_response.max(lambda);
        }
    }
    if max_response <= 0.0 {
        return Vec::new();
    }

    let threshold = cfg.quality_level as f32 * max_response;
    let mut candidates: Vec<Corner> = Vec::new();
    for y in RESPONSE_MARGIN..h - RESPONSE_MARGIN {
        for x in RESPONSE_MARGIN..w - RESPONSE_MARGIN {
            let r = responses.get_pixel(x, y)[0];
            if r >= threshold {
                candidates.push(Corner {
                    x: x as f32,
                    y: y as f32,
                    response: r,
                });
            }
        }
    }
    candidates.sort_by(|a, b| b.response.total_cmp(&a.response));

    let min_dist_sq = (cfg.min_distance * cfg.min_distance) as f32;
    let mut accepted: Vec<Corner> = Vec::new();
    for c in candidates {
        if accepted.len() >= cfg.max_corners {
            break;
        }
        let clear = accepted.iter().all(|a| {
            let dx = a.x - c.x;
            let dy = a.y - c.y;
            dx * dx + dy * dy >= min_dist_sq
        });
        if clear {
            accepted.push(c);
        }
    }
    accepted
}
