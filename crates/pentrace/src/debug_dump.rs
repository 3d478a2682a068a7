//! Versioned debug dump schema for tracking runs.
//!
//! The schema reuses production structures wherever possible: the config
//! snapshot is a plain [`TrackConfig`] and the run summary a [`TrackResult`].
//! Debug-only structs are limited to the per-frame records collected through
//! the observer hook.

use serde::{Deserialize, Serialize};

use pentrace_core::geometry::Point;

use crate::config::TrackConfig;
use crate::pipeline::{FrameUpdate, TrackResult};

pub const DEBUG_SCHEMA_V1: &str = "pentrace.debug.v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugDump {
    pub schema_version: String,
    pub video: VideoDebug,
    pub config: TrackConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frames: Vec<FrameRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TrackResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoDebug {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub width: u32,
    pub height: u32,
}

/// Per-frame tracking state, one entry per observed frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameRecord {
    pub frame_number: u64,
    pub registered: bool,
    pub fitness: f64,
    pub predicted: Point,
    pub matched: Point,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tip: Option<Point>,
}

impl From<&FrameUpdate> for FrameRecord {
    fn from(update: &FrameUpdate) -> Self {
        Self {
            frame_number: update.frame_number,
            registered: update.registered,
            fitness: update.matched.fitness,
            predicted: update.predicted,
            matched: update.matched.position,
            tip: update.tip,
        }
    }
}

impl DebugDump {
    /// Start an empty dump for a run over frames of the given dimensions.
    pub fn new(config: &TrackConfig, width: u32, height: u32) -> Self {
        Self {
            schema_version: DEBUG_SCHEMA_V1.to_string(),
            video: VideoDebug {
                path: None,
                width,
                height,
            },
            config: config.clone(),
            frames: Vec::new(),
            result: None,
        }
    }

    /// Append one frame record; pairs with [`crate::PenTracker::run_with_observer`].
    pub fn record(&mut self, update: &FrameUpdate) {
        self.frames.push(FrameRecord::from(update));
    }
}

#[cfg(test)]
mod tests {
    use pentrace_core::template::TemplateMatch;

    use super::*;

    #[test]
    fn debug_dump_json_roundtrip_minimal() {
        let config = TrackConfig::default();
        let mut dump = DebugDump::new(&config, 640, 480);
        dump.record(&FrameUpdate {
            frame_number: 2,
            registered: false,
            predicted: Point::new(10, 20),
            matched: TemplateMatch {
                position: Point::new(11, 21),
                fitness: 0.995,
            },
            tip: None,
        });
        dump.result = Some(TrackResult::empty(640, 480));

        let s = serde_json::to_string_pretty(&dump).unwrap();
        assert!(!s.contains("\"tip\""), "absent tip should be skipped");

        let back: DebugDump = serde_json::from_str(&s).unwrap();
        assert_eq!(back.schema_version, DEBUG_SCHEMA_V1);
        assert_eq!(back.video.width, 640);
        assert_eq!(back.frames.len(), 1);
        assert_eq!(back.frames[0].matched, Point::new(11, 21));
    }
}
