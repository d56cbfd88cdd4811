use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Domain interface for locating faces in a frame.
///
/// Output is unordered and may contain malformed boxes; an `Err` is treated
/// by callers as "no faces this frame", never as fatal.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>>;
}
