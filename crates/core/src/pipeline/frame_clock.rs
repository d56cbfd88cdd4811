use std::time::Instant;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Maps a frame to the kiosk's notion of "now", in seconds.
#[derive(Clone, Copy, Debug)]
pub enum FrameClock {
    /// `index / fps`. Deterministic, for files and replays.
    Media { fps: f64 },
    /// Seconds since the clock was created, for live cameras.
    Wall { started: Instant },
}

impl FrameClock {
    pub fn wall() -> Self {
        FrameClock::Wall {
            started: Instant::now(),
        }
    }

    /// Media time when the source has a usable frame rate and is not live.
    pub fn for_source(metadata: &VideoMetadata, live: bool) -> Self {
        if live || !metadata.has_frame_rate() {
            Self::wall()
        } else {
            FrameClock::Media { fps: metadata.fps }
        }
    }

    pub fn now(&self, frame: &Frame) -> f64 {
        match self {
            FrameClock::Media { fps } => frame.index() as f64 / fps,
            FrameClock::Wall { started } => started.elapsed().as_secs_f64(),
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, FrameClock::Wall { .. })
    }
}
