//! Normalized cross-correlation template matching.
//!
//! Direct matching over a source image or a window of it, plus a
//! coarse-to-fine pyramid search for template re-acquisition after tracking
//! loss: successive half-resolution levels, each finer level re-matching
//! inside a margin window around the doubled coarse answer.

use image::GrayImage;
use imageproc::template_matching::MatchTemplateMethod;

use crate::geometry::{Point, Rect};
use crate::imgproc::{crop, pyr_down};

// ── Error type ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateMatchError {
    TemplateLargerThanSource {
        source: (u32, u32),
        template: (u32, u32),
    },
}

impl std::fmt::Display for TemplateMatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TemplateLargerThanSource { source, template } => write!(
                f,
                "template {}x{} does not fit source {}x{}",
                template.0, template.1, source.0, source.1
            ),
        }
    }
}

impl std::error::Error for TemplateMatchError {}

// ── Matching ─────────────────────────────────────────────────────────────

/// Best template position and its correlation fitness in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemplateMatch {
    /// Top-left corner of the best match in source coordinates.
    pub position: Point,
    pub fitness: f64,
}

/// Pyramid search controls.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct PyramidConfig {
    /// Number of half-resolution levels (1 = direct full-frame match).
    pub levels: u32,
    /// Search margin (pixels) added around the doubled coarse match at each
    /// finer level.
    pub search_margin: i32,
}

impl Default for PyramidConfig {
    fn default() -> Self {
        Self {
            levels: 3,
            search_margin: 75,
        }
    }
}

/// Exhaustive NCC match of `template` over `source`.
pub fn match_template(
    source: &GrayImage,
    template: &GrayImage,
) -> Result<TemplateMatch, TemplateMatchError> {
    if source.width() < template.width() || source.height() < template.height() {
        return Err(TemplateMatchError::TemplateLargerThanSource {
            source: source.dimensions(),
            template: template.dimensions(),
        });
    }
    let scores = imageproc::template_matching::match_template(
        source,
        template,
        MatchTemplateMethod::CrossCorrelationNormalized,
    );
    let extremes = imageproc::template_matching::find_extremes(&scores);
    let (x, y) = extremes.max_value_location;
    Ok(TemplateMatch {
        position: Point::new(x as i32, y as i32),
        fitness: extremes.max_value as f64,
    })
}

/// NCC match restricted to `window` (clipped to the source). The returned
/// position is absolute in source coordinates.
pub fn match_in_window(
    source: &GrayImage,
    template: &GrayImage,
    window: Rect,
) -> Result<TemplateMatch, TemplateMatchError> {
    let clipped = window.clip_to(source.width(), source.height());
    if clipped.is_empty()
        || (clipped.width as u32) < template.width()
        || (clipped.height as u32) < template.height()
    {
        return Err(TemplateMatchError::TemplateLargerThanSource {
            source: (clipped.width.max(0) as u32, clipped.height.max(0) as u32),
            template: template.dimensions(),
        });
    }
    let view = crop(source, clipped);
    let m = match_template(&view, template)?;
    Ok(TemplateMatch {
        position: m.position.offset(clipped.x, clipped.y),
        fitness: m.fitness,
    })
}

/// A search window of `margin` pixels around `top_left`, clipped to the
/// source and slid so it still holds the template whenever the source is
/// large enough.
pub fn search_window(
    top_left: Point,
    template_dims: (u32, u32),
    margin: i32,
    source_dims: (u32, u32),
) -> Rect {
    let (tw, th) = (template_dims.0 as i32, template_dims.1 as i32);
    let (sw, sh) = (source_dims.0 as i32, source_dims.1 as i32);
    let x0 = (top_left.x - margin).clamp(0, (sw - tw).max(0));
    let y0 = (top_left.y - margin).clamp(0, (sh - th).max(0));
    let x1 = (top_left.x + margin + tw).min(sw);
    let y1 = (top_left.y + margin + th).min(sh);
    Rect::new(x0, y0, x1 - x0, y1 - y0)
}

/// Coarse-to-fine pyramid search over the whole source.
///
/// Levels with a template side under 8 pixels are not built; the fitness of
/// the finest-level match is reported.
pub fn match_pyramid(
    source: &GrayImage,
    template: &GrayImage,
    cfg: &PyramidConfig,
) -> Result<TemplateMatch, TemplateMatchError> {
    let mut src_pyr = vec![source.clone()];
    let mut tpl_pyr = vec![template.clone()];
    for _ in 1..cfg.levels.max(1) {
        let t = &tpl_pyr[tpl_pyr.len() - 1];
        if t.width() < 8 || t.height() < 8 {
            break;
        }
        tpl_pyr.push(pyr_down(t));
        let s = &src_pyr[src_pyr.len() - 1];
        src_pyr.push(pyr_down(s));
    }

    let top = src_pyr.len() - 1;
    let mut best = match_template(&src_pyr[top], &tpl_pyr[top])?;
    for level in (0..top).rev() {
        let t = &tpl_pyr[level];
        let doubled = Point::new(best.position.x * 2, best.position.y * 2);
        let window = search_window(
            doubled,
            t.dimensions(),
            cfg.search_margin,
            src_pyr[level].dimensions(),
        );
        best = match_in_window(&src_pyr[level], t, window)?;
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn noise_image(w: u32, h: u32, seed: u64) -> GrayImage {
        let mut rng = StdRng::seed_from_u64(seed);
        GrayImage::from_fn(w, h, |_, _| image::Luma([rng.gen::<u8>()]))
    }

    #[test]
    fn finds_exact_patch() {
        let source = noise_image(80, 60, 11);
        let template = crop(&source, Rect::new(17, 23, 20, 15));
        let m = match_template(&source, &template).unwrap();
        assert_eq!(m.position, Point::new(17, 23));
        assert!(m.fitness > 0.99);
    }

    #[test]
    fn window_match_reports_absolute_position() {
        let source = noise_image(100, 100, 3);
        let template = crop(&source, Rect::new(30, 25, 16, 16));
        let m = match_in_window(&source, &template, Rect::new(20, 15, 40, 40)).unwrap();
        assert_eq!(m.position, Point::new(30, 25));
    }

    #[test]
    fn pyramid_agrees_with_direct_match() {
        let source = noise_image(200, 150, 7);
        let template = crop(&source, Rect::new(83, 47, 40, 30));
        let direct = match_template(&source, &template).unwrap();
        let pyramid = match_pyramid(&source, &template, &PyramidConfig::default()).unwrap();
        assert_eq!(pyramid.position, direct.position);
        assert!(pyramid.fitness > 0.99);
    }

    #[test]
    fn template_larger_than_source_is_an_error() {
        let source = noise_image(10, 10, 1);
        let template = noise_image(20, 20, 2);
        let err = match_template(&source, &template).unwrap_err();
        assert_eq!(
            err,
            TemplateMatchError::TemplateLargerThanSource {
                source: (10, 10),
                template: (20, 20),
            }
        );
    }

    #[test]
    fn search_window_slides_to_fit_near_borders() {
        let w = search_window(Point::new(2, 2), (20, 20), 10, (100, 100));
        assert_eq!(w, Rect::new(0, 0, 32, 32));
        let w = search_window(Point::new(95, 95), (20, 20), 10, (100, 100));
        assert_eq!(w.right(), 100);
        assert_eq!(w.bottom(), 100);
        assert!(w.width >= 20 && w.height >= 20);
    }
}
