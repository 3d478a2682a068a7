//! Sparse pyramidal Lucas–Kanade optical flow.
//!
//! Tracks seed points from one grayscale frame into the next: coarse-to-fine
//! over a Gaussian pyramid, iterative 2×2 normal-equation solves per level,
//! with a minimum-eigenvalue texture gate.

use image::GrayImage;

use crate::imgproc::{pyr_down, sample_bilinear};

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct FlowConfig {
    /// Half-width of the tracking window; the window is `(2r+1)²` pixels.
    pub window_radius: u32,
    /// Iteration cap per pyramid level.
    pub max_iterations: u32,
    /// Convergence threshold on the per-iteration update (pixels).
    pub epsilon: f32,
    /// Number of pyramid levels (1 = no pyramid).
    pub levels: u32,
    /// Minimum normalised eigenvalue of the gradient matrix; windows below
    /// this are considered untrackable.
    pub min_eigenvalue: f32,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            window_radius: 5,
            max_iterations: 30,
            epsilon: 0.01,
            levels: 3,
            min_eigenvalue: 0.001,
        }
    }
}

/// Outcome of tracking a single point.
#[derive(Debug, Clone, Copy)]
pub struct FlowResult {
    /// Estimated position in the next frame.
    pub position: (f32, f32),
    /// Whether the track converged with enough texture.
    pub tracked: bool,
    /// Mean absolute intensity residual over the window (0–1 scale).
    pub error: f32,
}

/// Track `points` from `prev` into `next`.
pub fn track_points(
    prev: &GrayImage,
    next: &GrayImage,
    points: &[(f32, f32)],
    cfg: &FlowConfig,
) -> Vec<FlowResult> {
    let prev_pyr = build_pyramid(prev, cfg.levels);
    let next_pyr = build_pyramid(next, cfg.levels);
    let levels = prev_pyr.len().min(next_pyr.len());

    points
        .iter()
        .map(|&p| track_point(&prev_pyr[..levels], &next_pyr[..levels], p, cfg))
        .collect()
}

fn build_pyramid(img: &GrayImage, levels: u32) -> Vec<GrayImage> {
    let mut pyramid = vec![img.clone()];
    for _ in 1..levels.max(1) {
        let last = &pyramid[pyramid.len() - 1];
        if last.width() < 16 || last.height() < 16 {
            break;
        }
        pyramid.push(pyr_down(last));
    }
    pyramid
}

fn track_point(
    prev_pyr: &[GrayImage],
    next_pyr: &[GrayImage],
    point: (f32, f32),
    cfg: &FlowConfig,
) -> FlowResult {
    let mut flow = (0.0f32, 0.0f32);
    let mut ok = false;
    let mut error = f32::MAX;

    for level in (0..prev_pyr.len()).rev() {
        let scale = (1 << level) as f32;
        let p = (point.0 / scale, point.1 / scale);
        match track_at_level(&prev_pyr[level], &next_pyr[level], p, flow, cfg) {
            Some((new_flow, residual)) => {
                flow = new_flow;
                ok = true;
                error = residual;
            }
            None => {
                ok = false;
            }
        }
        if level > 0 {
            flow = (flow.0 * 2.0, flow.1 * 2.0);
        }
    }

    let position = (point.0 + flow.0, point.1 + flow.1);
    let in_bounds = position.0 >= 0.0
        && position.1 >= 0.0
        && position.0 < next_pyr[0].width() as f32
        && position.1 < next_pyr[0].height() as f32;
    FlowResult {
        position,
        tracked: ok && in_bounds,
        error: if error == f32::MAX { 0.0 } else { error },
    }
}

/// One iterative LK solve. Returns the refined flow and the mean absolute
/// residual, or `None` when the window has too little texture or leaves the
/// image.
fn track_at_level(
    prev: &GrayImage,
    next: &GrayImage,
    p: (f32, f32),
    initial_flow: (f32, f32),
    cfg: &FlowConfig,
) -> Option<((f32, f32), f32)> {
    let r = cfg.window_radius as i32;
    let (w, h) = (prev.width() as f32, prev.height() as f32);
    if p.0 - r as f32 - 1.0 < 0.0
        || p.1 - r as f32 - 1.0 < 0.0
        || p.0 + r as f32 + 1.0 >= w
        || p.1 + r as f32 + 1.0 >= h
    {
        return None;
    }

    let n = (2 * r + 1) * (2 * r + 1);
    let mut template = Vec::with_capacity(n as usize);
    let mut grads = Vec::with_capacity(n as usize);
    let (mut gxx, mut gyy, mut gxy) = (0.0f32, 0.0f32, 0.0f32);
    for dy in -r..=r {
        for dx in -r..=r {
            let x = p.0 + dx as f32;
            let y = p.1 + dy as f32;
            let gx =
                (sample_bilinear(prev, x + 1.0, y) - sample_bilinear(prev, x - 1.0, y)) / 510.0;
            let gy =
                (sample_bilinear(prev, x, y + 1.0) - sample_bilinear(prev, x, y - 1.0)) / 510.0;
            template.push(sample_bilinear(prev, x, y) / 255.0);
            grads.push((gx, gy));
            gxx += gx * gx;
            gyy += gy * gy;
            gxy += gx * gy;
        }
    }

    // Texture gate: smaller eigenvalue of the gradient matrix, per pixel.
    let trace = gxx + gyy;
    let disc = ((gxx - gyy) * (gxx - gyy) + 4.0 * gxy * gxy).sqrt();
    let min_eig = 0.5 * (trace - disc) / n as f32;
    if min_eig < cfg.min_eigenvalue {
        return None;
    }

    let det = gxx * gyy - gxy * gxy;
    if det.abs() < 1e-10 {
        return None;
    }

    let mut flow = initial_flow;
    for _ in 0..cfg.max_iterations {
        let (mut bx, mut by) = (0.0f32, 0.0f32);
        let mut idx = 0;
        for dy in -r..=r {
            for dx in -r..=r {
                let x = p.0 + flow.0 + dx as f32;
                let y = p.1 + flow.1 + dy as f32;
                let residual = template[idx] - sample_bilinear(next, x, y) / 255.0;
                let (gx, gy) = grads[idx];
                bx += gx * residual;
                by += gy * residual;
                idx += 1;
            }
        }
        let ux = (gyy * bx - gxy * by) / det;
        let uy = (gxx * by - gxy * bx) / det;
        flow.0 += ux;
        flow.1 += uy;
        if (ux * ux + uy * uy).sqrt() < cfg.epsilon {
            break;
        }
    }

    let mut residual_sum = 0.0f32;
    let mut idx = 0;
    for dy in -r..=r {
        for dx in -r..=r {
            let x = p.0 + flow.0 + dx as f32;
            let y = p.1 + flow.1 + dy as f32;
            residual_sum += (template[idx] - sample_bilinear(next, x, y) / 255.0).abs();
            idx += 1;
        }
    }
    Some((flow, residual_sum / n as f32))
}
