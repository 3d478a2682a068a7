//! Frame acquisition.
//!
//! The tracker pulls frames through the [`VideoSource`] trait so decoded
//! footage, image sequences, and synthetic test feeds all look the same to
//! the pipeline. [`ImageSequenceSource`] reads the common export format of
//! one numbered JPEG per frame.

use std::path::PathBuf;

use image::GrayImage;

// ── Error type ───────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum VideoError {
    /// `next_frame` was called after the source ran out of frames.
    EndOfStream,
    /// The frame directory does not exist.
    NotADirectory { path: PathBuf },
    /// A frame file could not be read or decoded.
    Open {
        path: PathBuf,
        source: image::ImageError,
    },
}

impl std::fmt::Display for VideoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EndOfStream => write!(f, "no frames remain in the source"),
            Self::NotADirectory { path } => {
                write!(f, "frame directory {} does not exist", path.display())
            }
            Self::Open { path, source } => {
                write!(f, "failed to read frame {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for VideoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Open { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ── Source trait ─────────────────────────────────────────────────────────

/// A pull-based supplier of grayscale video frames.
pub trait VideoSource {
    /// True while another frame can be produced.
    fn frame_available(&self) -> bool;

    /// Decode and return the next frame as 8-bit grayscale.
    fn next_frame(&mut self) -> Result<GrayImage, VideoError>;

    /// One-based number of the most recently returned frame, 0 before the
    /// first call.
    fn frame_number(&self) -> u64;
}

/// Frames stored as `<dir>/<n>.jpg` with `n` counting from 1.
#[derive(Debug, Clone)]
pub struct ImageSequenceSource {
    dir: PathBuf,
    next_index: u64,
    last_frame: u64,
}

impl ImageSequenceSource {
    /// Open a sequence of `last_frame` numbered JPEG files under `dir`.
    pub fn new(dir: impl Into<PathBuf>, last_frame: u64) -> Result<Self, VideoError> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(VideoError::NotADirectory { path: dir });
        }
        Ok(Self {
            dir,
            next_index: 1,
            last_frame,
        })
    }

    fn frame_path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("{index}.jpg"))
    }
}

impl VideoSource for ImageSequenceSource {
    fn frame_available(&self) -> bool {
        self.next_index <= self.last_frame
    }

    fn next_frame(&mut self) -> Result<GrayImage, VideoError> {
        if !self.frame_available() {
            return Err(VideoError::EndOfStream);
        }
        let path = self.frame_path(self.next_index);
        let frame = image::open(&path)
            .map_err(|source| VideoError::Open {
                path: path.clone(),
                source,
            })?
            .to_luma8();
        self.next_index += 1;
        Ok(frame)
    }

    fn frame_number(&self) -> u64 {
        self.next_index - 1
    }
}
