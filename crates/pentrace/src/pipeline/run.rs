//! Per-frame tracking loop: register -> predict -> confirm -> locate -> correct.

use image::GrayImage;

use pentrace_core::geometry::Rect;
use pentrace_core::imgproc::{crop, sharpen};
use pentrace_core::kalman::KalmanFilter;
use pentrace_core::template::{match_in_window, match_pyramid, search_window};

use crate::ballpoint::locate_tip;
use crate::config::TrackConfig;
use crate::registrar::Registrar;
use crate::video::VideoSource;

use super::result::FrameUpdate;
use super::{TrackError, TrackResult};

/// Track the pen template through every frame of `source`.
///
/// The first frame seeds the Kalman filter with a full pyramid search. Every
/// following frame is registered against the reference, matched around the
/// predicted template position, and mined for a ballpoint sample. The source
/// is drained to its last frame, which doubles as the ink-trace reference
/// for finalization.
pub(crate) fn track(
    source: &mut dyn VideoSource,
    template: &GrayImage,
    config: &TrackConfig,
    mut observer: Option<&mut dyn FnMut(&FrameUpdate)>,
) -> Result<TrackResult, TrackError> {
    let first = source.next_frame()?;
    let prepared_template = prepare(template, config);

    let seed = match_pyramid(
        &prepare(&first, config),
        &prepared_template,
        &config.template.pyramid,
    )?;
    log::debug!(
        "seeded template at ({}, {}) with fitness {:.3}",
        seed.position.x,
        seed.position.y,
        seed.fitness
    );

    let mut filter = KalmanFilter::new(seed.position, &config.kalman);
    let mut registrar = Registrar::new(config.registrar.clone());
    let mut record = Vec::new();
    let mut frames_processed: u64 = 1;
    let mut last_frame = first;

    while source.frame_available() {
        let frame = source.next_frame()?;
        let prepared = prepare(&frame, config);
        let registration = registrar.track_movement(&frame)?;

        let predicted = filter.predict();
        let window = search_window(
            predicted,
            prepared_template.dimensions(),
            config.template.search_margin,
            prepared.dimensions(),
        );
        let mut matched = match_in_window(&prepared, &prepared_template, window)?;
        if matched.fitness < config.template.fitness_threshold {
            log::debug!(
                "frame {}: fitness {:.3} below {:.2}, re-acquiring over the full frame",
                source.frame_number(),
                matched.fitness,
                config.template.fitness_threshold
            );
            matched = match_pyramid(&prepared, &prepared_template, &config.template.pyramid)?;
        }

        // The ballpoint locator works on the raw patch, not the sharpened one.
        let (tw, th) = prepared_template.dimensions();
        let patch = crop(
            &frame,
            Rect::new(matched.position.x, matched.position.y, tw as i32, th as i32),
        );
        let tip = locate_tip(&patch, &config.ballpoint).map(|p| {
            registration
                .to_reference
                .apply(p.offset(matched.position.x, matched.position.y))
        });
        if let Some(sample) = tip {
            record.push(sample);
        }

        filter.correct(matched.position)?;
        frames_processed += 1;

        if let Some(observer) = observer.as_deref_mut() {
            observer(&FrameUpdate {
                frame_number: source.frame_number(),
                registered: registration.registered,
                predicted,
                matched,
                tip,
            });
        }
        last_frame = frame;
    }

    super::finalize::run(&last_frame, record, &registrar, frames_processed, config)
}

/// Contrast boost applied to every frame and the template before matching.
fn prepare(img: &GrayImage, config: &TrackConfig) -> GrayImage {
    sharpen(
        img,
        config.ballpoint.sharpen_weight,
        config.ballpoint.sharpen_sigma,
    )
}
