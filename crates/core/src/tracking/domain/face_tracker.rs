use std::collections::{BTreeMap, HashSet};

use crate::recognition::domain::gallery_store::Identity;
use crate::shared::face_box::FaceBox;
use crate::tracking::domain::box_smoother::BoxSmoother;
use crate::tracking::domain::tracked_face::TrackedFace;

pub const DEFAULT_TRACKING_TIMEOUT: f64 = 2.0;

/// Live set of tracked identities, at most one [`TrackedFace`] each.
///
/// Identities not observed in a frame are left untouched apart from the
/// timeout check in [`FaceTracker::evict_stale`].
pub struct FaceTracker {
    faces: BTreeMap<Identity, TrackedFace>,
    smoother: BoxSmoother,
    timeout: f64,
    completed: HashSet<Identity>,
}

impl FaceTracker {
    pub fn new(smoother: BoxSmoother, timeout: f64) -> Self {
        Self {
            faces: BTreeMap::new(),
            smoother,
            timeout,
            completed: HashSet::new(),
        }
    }

    pub fn timeout(&self) -> f64 {
        self.timeout
    }

    pub fn is_tracking(&self, identity: Identity) -> bool {
        self.faces.contains_key(&identity)
    }

    /// Updates a tracked identity with a new sighting.
    ///
    /// Returns `false` when the identity is not tracked.
    pub fn observe(&mut self, identity: Identity, bbox: FaceBox, now: f64) -> bool {
        let Some(face) = self.faces.get_mut(&identity) else {
            return false;
        };
        let smoothed = self.smoother.smooth(face.smoothed_box(), bbox);
        face.observe(smoothed, now);
        true
    }

    /// Starts tracking an identity seen for the first time since it was last
    /// evicted (or ever).
    ///
    /// `already_played` comes from the gallery. Identities that completed
    /// earlier in this session resume as complete; everything else restarts
    /// its dwell timer at `now`.
    pub fn begin_tracking(
        &mut self,
        identity: Identity,
        bbox: FaceBox,
        now: f64,
        already_played: bool,
    ) -> &TrackedFace {
        if self.faces.contains_key(&identity) {
            return &self.faces[&identity];
        }
        let face = if self.completed.contains(&identity) {
            TrackedFace::resumed_complete(identity, bbox, now)
        } else if already_played {
            TrackedFace::already_played(identity, bbox, now)
        } else {
            TrackedFace::registering(identity, bbox, now)
        };
        log::info!(
            "Tracking identity {identity} ({})",
            if face.previously_played() {
                "already played"
            } else if face.is_complete() {
                "resumed"
            } else {
                "registering"
            }
        );
        self.faces.entry(identity).or_insert(face)
    }

    /// Drops every face with `now - last_seen > timeout` and returns their
    /// identities.
    pub fn evict_stale(&mut self, now: f64) -> Vec<Identity> {
        let timeout = self.timeout;
        let stale: Vec<Identity> = self
            .faces
            .values()
            .filter(|f| now - f.last_seen() > timeout)
            .map(TrackedFace::identity)
            .collect();

        for identity in &stale {
            if let Some(face) = self.faces.remove(identity) {
                if face.is_complete() && !face.previously_played() {
                    self.completed.insert(*identity);
                }
                log::info!(
                    "Lost identity {identity} after {:.1}s unseen",
                    now - face.last_seen()
                );
            }
        }
        stale
    }

    pub fn get(&self, identity: Identity) -> Option<&TrackedFace> {
        self.faces.get(&identity)
    }

    /// Tracked faces in identity order.
    pub fn faces(&self) -> impl Iterator<Item = &TrackedFace> {
        self.faces.values()
    }

    pub fn faces_mut(&mut self) -> impl Iterator<Item = &mut TrackedFace> {
        self.faces.values_mut()
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

impl Default for FaceTracker {
    fn default() -> Self {
        Self::new(BoxSmoother::default(), DEFAULT_TRACKING_TIMEOUT)
    }
}
