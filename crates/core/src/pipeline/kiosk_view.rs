use crate::recognition::domain::gallery_store::Identity;
use crate::shared::face_box::FaceBox;
use crate::tracking::domain::registration::RegistrationStatus;

pub const WELCOME_MESSAGE: &str = "Welcome! Please stand in front of the camera.";
pub const NO_FACE_MESSAGE: &str = "No face detected. Please position yourself in the frame.";
pub const REGISTERING_MESSAGE: &str = "Registering... Please remain still";
pub const COMPLETE_MESSAGE: &str = "Registration complete! You're now ready to play!";
pub const ALREADY_PLAYED_MESSAGE: &str = "Sorry! You have already played.";

#[derive(Clone, Debug, PartialEq)]
pub struct TrackedFaceView {
    pub identity: Identity,
    pub smoothed_box: FaceBox,
    pub progress: Option<f64>,
    pub status: RegistrationStatus,
}

/// What the rendering side sees after one kiosk cycle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KioskView {
    /// Every tracked face, in identity order.
    pub faces: Vec<TrackedFaceView>,
    /// Detection ran on this frame (it is throttled by the cooldown).
    pub detection_ran: bool,
    /// Detection has run at least once since the kiosk started.
    pub has_searched: bool,
}

impl KioskView {
    pub fn is_idle(&self) -> bool {
        self.faces.is_empty()
    }

    /// Banner prompt for the operator screen.
    pub fn headline(&self) -> &'static str {
        if self.is_idle() {
            return if self.has_searched {
                NO_FACE_MESSAGE
            } else {
                WELCOME_MESSAGE
            };
        }
        if self.any(RegistrationStatus::Registering) {
            REGISTERING_MESSAGE
        } else if self.any(RegistrationStatus::Complete) {
            COMPLETE_MESSAGE
        } else {
            ALREADY_PLAYED_MESSAGE
        }
    }

    /// Highest dwell progress among faces still registering.
    pub fn banner_progress(&self) -> Option<f64> {
        self.faces
            .iter()
            .filter(|f| f.status == RegistrationStatus::Registering)
            .filter_map(|f| f.progress)
            .reduce(f64::max)
    }

    fn any(&self, status: RegistrationStatus) -> bool {
        self.faces.iter().any(|f| f.status == status)
    }
}
