use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Source of camera or replay frames for the kiosk.
///
/// Implementations hide decoding details; the kiosk only sees RGB
/// [`Frame`]s with increasing indices.
pub trait VideoReader: Send {
    /// Opens a video file, capture device or image directory.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Frames in capture order. Ends when the source is exhausted.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_>;

    fn close(&mut self);
}
