//! Frame zone classification.
//!
//! Overlapping square windows of the frame are sorted into whiteboard, text,
//! and other (occluder) zones. Text zones anchor camera-motion registration:
//! their union yields the registration rectangle that corner tracking runs
//! in, and frames with too few of them are not trusted as references.

use image::GrayImage;

use pentrace_core::geometry::Rect;
use pentrace_core::imgproc::{canny, crop, dilate, invert, mean, normalize_minmax, otsu_binarize};

use crate::config::ZoneConfig;

/// What a classification window is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    /// Blank board: nearly no edge response.
    Whiteboard,
    /// Written content: dark pixels explained by strong edges.
    Text,
    /// Occluders and clutter: the writer, shadows, off-board background.
    Other,
}

/// A classified window of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Zone {
    pub rect: Rect,
    pub kind: ZoneKind,
}

/// Classify overlapping `window_size` squares at half-window stride.
///
/// Windows that would cross the right or bottom frame edge are skipped.
pub fn classify_zones(frame: &GrayImage, cfg: &ZoneConfig) -> Vec<Zone> {
    let edges = canny(frame, cfg.canny_low, cfg.canny_high);
    let inv_edges = invert(&dilate(&edges, 1));

    let ws = cfg.window_size;
    let stride = (ws / 2).max(1);
    let mut zones = Vec::new();
    let mut y = 0;
    while y + ws < frame.height() {
        let mut x = 0;
        while x + ws < frame.width() {
            let rect = Rect::new(x as i32, y as i32, ws as i32, ws as i32);
            let kind = classify_window(frame, &inv_edges, rect, cfg);
            zones.push(Zone { rect, kind });
            x += stride;
        }
        y += stride;
    }
    zones
}

fn classify_window(
    frame: &GrayImage,
    inv_edges: &GrayImage,
    rect: Rect,
    cfg: &ZoneConfig,
) -> ZoneKind {
    let raw = crop(frame, rect);
    let area = (raw.width() * raw.height()) as f64;
    let dark = raw
        .pixels()
        .filter(|p| p[0] <= cfg.dark_pixel_max)
        .count() as f64;
    if dark / area > cfg.max_dark_fraction {
        return ZoneKind::Other;
    }

    let edge_win = crop(inv_edges, rect);
    if mean(&edge_win) >= cfg.whiteboard_min_mean {
        return ZoneKind::Whiteboard;
    }

    // Dark pixels that no edge response accounts for: ink lives next to its
    // own edges, while shadows and skin are dark without any.
    let ink = otsu_binarize(&normalize_minmax(&raw));
    let mut residual = 0u64;
    for (e, i) in edge_win.pixels().zip(ink.pixels()) {
        residual += u64::from(e[0].saturating_sub(i[0]));
    }
    if residual as f64 / area < cfg.text_max_density {
        ZoneKind::Text
    } else {
        ZoneKind::Other
    }
}

/// The largest rectangle of grid cells covered by text zones, trimmed by
/// `trim` pixels per side. `None` when there are no text zones or trimming
/// consumes the rectangle.
///
/// Zones sit on a half-window grid, so each zone covers a 2x2 block of
/// stride-sized cells; overlapping zones knit the blocks together.
pub fn find_registration_rect(zones: &[Zone], window_size: u32, trim: i32) -> Option<Rect> {
    let spacing = (window_size / 2).max(1) as i32;
    let text: Vec<Rect> = zones
        .iter()
        .filter(|z| z.kind == ZoneKind::Text)
        .map(|z| z.rect)
        .collect();
    let first = *text.first()?;
    let min_x = text.iter().map(|r| r.x).fold(first.x, i32::min);
    let min_y = text.iter().map(|r| r.y).fold(first.y, i32::min);
    let max_x = text.iter().map(|r| r.x).fold(first.x, i32::max);
    let max_y = text.iter().map(|r| r.y).fold(first.y, i32::max);

    let gw = ((max_x - min_x) / spacing + 2) as usize;
    let gh = ((max_y - min_y) / spacing + 2) as usize;
    let mut covered = vec![vec![false; gw]; gh];
    for rect in &text {
        let gx = ((rect.x - min_x) / spacing) as usize;
        let gy = ((rect.y - min_y) / spacing) as usize;
        for dy in 0..2 {
            for dx in 0..2 {
                covered[gy + dy][gx + dx] = true;
            }
        }
    }

    let (gx, gy, cells_w, cells_h) = largest_covered_rect(&covered)?;
    let rect = Rect::new(
        min_x + gx as i32 * spacing,
        min_y + gy as i32 * spacing,
        cells_w as i32 * spacing,
        cells_h as i32 * spacing,
    )
    .trim(trim);
    (!rect.is_empty()).then_some(rect)
}

/// Largest all-covered axis-aligned cell rectangle, found with a per-row
/// histogram sweep. Area ties prefer the squarer rectangle.
fn largest_covered_rect(grid: &[Vec<bool>]) -> Option<(usize, usize, usize, usize)> {
    let gh = grid.len();
    let gw = grid.first().map_or(0, Vec::len);
    let mut heights = vec![0usize; gw];
    let mut best: Option<(usize, usize, usize, usize)> = None;
    let mut best_area = 0;
    let mut best_skew = usize::MAX;

    for gy in 0..gh {
        for gx in 0..gw {
            heights[gx] = if grid[gy][gx] { heights[gx] + 1 } else { 0 };
        }
        let mut stack: Vec<usize> = Vec::new();
        for gx in 0..=gw {
            let h = if gx < gw { heights[gx] } else { 0 };
            while let Some(&top) = stack.last() {
                if heights[top] <= h {
                    break;
                }
                stack.pop();
                let height = heights[top];
                let left = stack.last().map_or(0, |&i| i + 1);
                let width = gx - left;
                let area = width * height;
                let skew = width.abs_diff(height);
                if area > best_area || (area == best_area && skew < best_skew) {
                    best_area = area;
                    best_skew = skew;
                    best = Some((left, gy + 1 - height, width, height));
                }
            }
            stack.push(gx);
        }
    }
    best
}
