use crate::pipeline::kiosk_view::KioskView;
use crate::shared::frame::Frame;

/// Draws the kiosk state onto a frame in place.
pub trait OverlayRenderer: Send {
    fn render(&self, frame: &mut Frame, view: &KioskView)
        -> Result<(), Box<dyn std::error::Error>>;
}
