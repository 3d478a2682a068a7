//! Camera-motion registration.
//!
//! Handheld footage drifts, so recorded pen positions only line up across
//! frames after each frame is registered against the first usable one (the
//! reference frame). Per frame:
//!
//! 1. **Zones** – classify half-overlapping windows into whiteboard, text,
//!    and other; frames short on text zones cannot be registered.
//! 2. **Corners** – Shi–Tomasi corners inside the registration rectangle
//!    built from the previous frame's text zones.
//! 3. **Flow** – pyramidal Lucas–Kanade tracks the corners into the current
//!    frame; survivors must land back inside the rectangle.
//! 4. **Fit** – a rigid (rotation + uniform scale) transform over the
//!    surviving pairs, with a translation-only template fallback when too
//!    few survive.
//!
//! Accepted steps compose into the running reference-to-current transform.

mod zones;

pub use zones::{classify_zones, find_registration_rect, Zone, ZoneKind};

use image::GrayImage;

use pentrace_core::affine::{estimate_rigid, mean_residual, AffineError, AffineTransform};
use pentrace_core::corners::good_features_to_track;
use pentrace_core::flow::track_points;
use pentrace_core::geometry::Rect;
use pentrace_core::imgproc::crop;
use pentrace_core::template::match_in_window;

use crate::config::RegistrarConfig;

/// Per-frame registration outcome.
#[derive(Debug, Clone, Copy)]
pub struct Registration {
    /// Maps current-frame coordinates into reference-frame coordinates.
    pub to_reference: AffineTransform,
    /// Whether a fresh camera-motion estimate was folded in for this frame.
    pub registered: bool,
}

struct PrevFrame {
    image: GrayImage,
    zones: Vec<Zone>,
}

/// Tracks cumulative camera motion across the frame stream.
pub struct Registrar {
    config: RegistrarConfig,
    /// Reference-to-current transform.
    full: AffineTransform,
    prev: Option<PrevFrame>,
    frames_registered: u64,
}

impl Registrar {
    pub fn new(config: RegistrarConfig) -> Self {
        Self {
            config,
            full: AffineTransform::identity(),
            prev: None,
            frames_registered: 0,
        }
    }

    /// The running reference-to-current transform.
    pub fn full_transform(&self) -> AffineTransform {
        self.full
    }

    /// Frames whose camera-motion estimate was accepted so far.
    pub fn frames_registered(&self) -> u64 {
        self.frames_registered
    }

    /// Fold the camera motion of `frame` into the running transform.
    ///
    /// Frames without enough text zones (on either side of the pair) leave
    /// the transform unchanged; the newest frame with enough text zones is
    /// kept as the comparison reference.
    pub fn track_movement(&mut self, frame: &GrayImage) -> Result<Registration, AffineError> {
        let zones = classify_zones(frame, &self.config.zone);
        let text_count = count_text(&zones);

        let usable_pair = self
            .prev
            .as_ref()
            .is_some_and(|p| count_text(&p.zones) >= self.config.min_text_zones)
            && text_count >= self.config.min_text_zones;

        if !usable_pair {
            log::debug!("registration skipped: {text_count} text zones in frame");
            if text_count >= self.config.min_text_zones {
                self.prev = Some(PrevFrame {
                    image: frame.clone(),
                    zones,
                });
            }
            return self.unregistered();
        }

        // prev is present and text-rich here
        let Some(prev) = self.prev.as_ref() else {
            return self.unregistered();
        };
        let Some(rect) = find_registration_rect(
            &prev.zones,
            self.config.zone.window_size,
            self.config.rect_trim,
        ) else {
            log::debug!("registration skipped: no registration rectangle");
            self.prev = Some(PrevFrame {
                image: frame.clone(),
                zones,
            });
            return self.unregistered();
        };

        match self.estimate_step(&prev.image, frame, rect) {
            Some(step) => {
                self.full = step.compose(&self.full);
                self.frames_registered += 1;
                self.prev = Some(PrevFrame {
                    image: frame.clone(),
                    zones,
                });
                Ok(Registration {
                    to_reference: self.full.inverse()?,
                    registered: true,
                })
            }
            None => self.unregistered(),
        }
    }

    fn unregistered(&self) -> Result<Registration, AffineError> {
        Ok(Registration {
            to_reference: self.full.inverse()?,
            registered: false,
        })
    }

    /// Previous-to-current motion estimate, or `None` when the fit is not
    /// trustworthy.
    fn estimate_step(
        &self,
        prev: &GrayImage,
        current: &GrayImage,
        rect: Rect,
    ) -> Option<AffineTransform> {
        let patch = crop(prev, rect);
        let corners = good_features_to_track(&patch, &self.config.corners);

        let bx = rect.width as f32 * self.config.border_frac;
        let by = rect.height as f32 * self.config.border_frac;
        let seeds: Vec<(f32, f32)> = corners
            .iter()
            .filter(|c| {
                c.x >= bx && c.x <= rect.width as f32 - bx && c.y >= by
                    && c.y <= rect.height as f32 - by
            })
            .map(|c| (c.x + rect.x as f32, c.y + rect.y as f32))
            .collect();

        let tracks = track_points(prev, current, &seeds, &self.config.flow);
        let mut src = Vec::new();
        let mut dst = Vec::new();
        for (seed, track) in seeds.iter().zip(&tracks) {
            if !track.tracked {
                continue;
            }
            let (nx, ny) = track.position;
            let inside = nx >= rect.x as f32
                && nx < rect.right() as f32
                && ny >= rect.y as f32
                && ny < rect.bottom() as f32;
            if inside {
                src.push((seed.0 as f64, seed.1 as f64));
                dst.push((nx as f64, ny as f64));
            }
        }

        if src.len() < self.config.min_track_points {
            log::debug!(
                "{} of {} corners survived tracking, trying translation fallback",
                src.len(),
                seeds.len()
            );
            return self.translation_step(prev, current, rect);
        }

        match estimate_rigid(&src, &dst) {
            Ok(step) => {
                let residual = mean_residual(&step, &src, &dst);
                if residual <= self.config.max_residual_px {
                    Some(step)
                } else {
                    log::debug!("rigid fit rejected: mean residual {residual:.2} px");
                    None
                }
            }
            Err(err) => {
                log::debug!("rigid fit failed: {err}");
                None
            }
        }
    }

    /// Translation-only fallback: re-find the previous registration patch in
    /// the current frame within a padded search window.
    fn translation_step(
        &self,
        prev: &GrayImage,
        current: &GrayImage,
        rect: Rect,
    ) -> Option<AffineTransform> {
        let template = crop(prev, rect);
        let m = self.config.search_margin;
        let window = Rect::new(
            rect.x - m,
            rect.y - m,
            rect.width + 2 * m,
            rect.height + 2 * m,
        );
        match match_in_window(current, &template, window) {
            Ok(found) => {
                let dx = (found.position.x - rect.x) as f64;
                let dy = (found.position.y - rect.y) as f64;
                Some(AffineTransform::translation(dx, dy))
            }
            Err(err) => {
                log::debug!("translation fallback failed: {err}");
                None
            }
        }
    }
}

fn count_text(zones: &[Zone]) -> usize {
    zones.iter().filter(|z| z.kind == ZoneKind::Text).count()
}
