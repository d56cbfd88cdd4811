use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    /// Nominal frame rate; 0.0 when the source does not report one.
    pub fps: f64,
    /// Frame count when known up front; 0 for live devices.
    pub total_frames: usize,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    pub fn has_frame_rate(&self) -> bool {
        self.fps.is_finite() && self.fps > 0.0
    }
}
