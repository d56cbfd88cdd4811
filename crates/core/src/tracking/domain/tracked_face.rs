use crate::recognition::domain::gallery_store::Identity;
use crate::shared::face_box::FaceBox;

/// Live tracking state for one identity.
///
/// `complete` only moves false → true. Once it is set the registration
/// start is frozen and no dwell is recomputed.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackedFace {
    identity: Identity,
    registration_start: Option<f64>,
    last_seen: f64,
    smoothed_box: FaceBox,
    complete: bool,
    previously_played: bool,
}

impl TrackedFace {
    /// A face whose dwell timer starts at `now`.
    pub fn registering(identity: Identity, bbox: FaceBox, now: f64) -> Self {
        Self {
            identity,
            registration_start: Some(now),
            last_seen: now,
            smoothed_box: bbox,
            complete: false,
            previously_played: false,
        }
    }

    /// A face that completed registration earlier in this session.
    pub fn resumed_complete(identity: Identity, bbox: FaceBox, now: f64) -> Self {
        Self {
            registration_start: None,
            complete: true,
            ..Self::registering(identity, bbox, now)
        }
    }

    /// A returning player the gallery already marks as played.
    pub fn already_played(identity: Identity, bbox: FaceBox, now: f64) -> Self {
        Self {
            previously_played: true,
            ..Self::resumed_complete(identity, bbox, now)
        }
    }

    pub fn identity(&self) -> Identity {
        self.identity
    }

    pub fn registration_start(&self) -> Option<f64> {
        self.registration_start
    }

    pub fn last_seen(&self) -> f64 {
        self.last_seen
    }

    pub fn smoothed_box(&self) -> FaceBox {
        self.smoothed_box
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn previously_played(&self) -> bool {
        self.previously_played
    }

    /// Dwell time so far, `None` when no timer is running.
    pub fn elapsed(&self, now: f64) -> Option<f64> {
        self.registration_start.map(|start| (now - start).max(0.0))
    }

    pub(crate) fn observe(&mut self, smoothed_box: FaceBox, now: f64) {
        self.smoothed_box = smoothed_box;
        self.last_seen = now;
    }

    pub(crate) fn mark_complete(&mut self) {
        self.complete = true;
    }

    pub(crate) fn mark_previously_played(&mut self) {
        self.complete = true;
        self.previously_played = true;
    }
}
