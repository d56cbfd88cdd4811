use crate::recognition::domain::gallery_store::GalleryStore;
use crate::tracking::domain::tracked_face::TrackedFace;

pub const DEFAULT_REGISTRATION_DURATION: f64 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegistrationStatus {
    Registering,
    Complete,
    AlreadyPlayed,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegistrationUpdate {
    pub status: RegistrationStatus,
    /// Dwell progress in `[0, 1]`; `None` for already-played faces.
    pub progress: Option<f64>,
    /// Set on the single frame where `played` was committed.
    pub committed: bool,
}

impl RegistrationUpdate {
    fn registering(progress: f64) -> Self {
        Self {
            status: RegistrationStatus::Registering,
            progress: Some(progress),
            committed: false,
        }
    }

    fn complete(committed: bool) -> Self {
        Self {
            status: RegistrationStatus::Complete,
            progress: Some(1.0),
            committed,
        }
    }

    fn already_played() -> Self {
        Self {
            status: RegistrationStatus::AlreadyPlayed,
            progress: None,
            committed: false,
        }
    }
}

/// Dwell-time gate: registering → complete once a face has been tracked for
/// `duration` seconds, committing `played` to the gallery exactly once.
///
/// The face's `complete` flag is the commit guard. It is set before the
/// gallery write, so a failed write is logged and never retried.
pub struct RegistrationStateMachine {
    duration: f64,
}

impl RegistrationStateMachine {
    pub fn new(duration: f64) -> Self {
        Self { duration }
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// `min(elapsed / duration, 1)`.
    pub fn progress(&self, elapsed: f64) -> f64 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        (elapsed / self.duration).clamp(0.0, 1.0)
    }

    pub fn advance(
        &self,
        face: &mut TrackedFace,
        now: f64,
        gallery: &mut dyn GalleryStore,
    ) -> RegistrationUpdate {
        if face.previously_played() {
            return RegistrationUpdate::already_played();
        }
        if face.is_complete() {
            return RegistrationUpdate::complete(false);
        }

        let elapsed = face.elapsed(now).unwrap_or(0.0);
        let progress = self.progress(elapsed);
        if elapsed < self.duration {
            return RegistrationUpdate::registering(progress);
        }

        let identity = face.identity();
        match gallery.is_played(identity) {
            Ok(true) => {
                log::info!("Identity {identity} has already played");
                face.mark_previously_played();
                RegistrationUpdate::already_played()
            }
            Ok(false) => {
                face.mark_complete();
                match gallery.set_played(identity) {
                    Ok(()) => log::info!(
                        "Registration complete for identity {identity} after {elapsed:.1}s"
                    ),
                    Err(e) => log::error!(
                        "Failed to record identity {identity} as played: {e}"
                    ),
                }
                RegistrationUpdate::complete(true)
            }
            Err(e) => {
                log::warn!("Could not read played flag for identity {identity}: {e}");
                RegistrationUpdate::registering(progress)
            }
        }
    }
}

impl Default for RegistrationStateMachine {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRATION_DURATION)
    }
}
