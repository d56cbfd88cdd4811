use std::collections::HashSet;
use std::time::Instant;

use crate::detection::domain::face_detector::FaceDetector;
use crate::pipeline::kiosk_view::{KioskView, TrackedFaceView};
use crate::recognition::domain::feature_extractor::FeatureExtractor;
use crate::recognition::domain::gallery_store::{GalleryStore, Identity};
use crate::recognition::domain::identity_matcher::IdentityMatcher;
use crate::recognition::infrastructure::equalized_feature_extractor::EqualizedFeatureExtractor;
use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;
use crate::shared::kiosk_config::KioskConfig;
use crate::shared::region::Region;
use crate::tracking::domain::box_smoother::BoxSmoother;
use crate::tracking::domain::face_tracker::FaceTracker;
use crate::tracking::domain::registration::RegistrationStateMachine;

/// Result of one kiosk cycle.
#[derive(Debug, Default)]
pub struct KioskCycle {
    pub view: KioskView,
    /// Raw detector regions this frame (0 when detection was throttled).
    pub detections: usize,
    /// Identities whose `played` flag was committed this frame.
    pub committed: Vec<Identity>,
    pub detect_ms: f64,
    pub match_ms: f64,
    pub track_ms: f64,
}

/// The per-frame core: detect → extract → match → track → registration.
///
/// Single-threaded. The detector and gallery are borrowed per call so
/// their lifetime belongs to the run loop.
pub struct KioskEngine {
    extractor: Box<dyn FeatureExtractor>,
    matcher: IdentityMatcher,
    tracker: FaceTracker,
    registration: RegistrationStateMachine,
    cooldown: f64,
    last_detection: Option<f64>,
    detection_cycles: usize,
    identities_seen: HashSet<Identity>,
    registrations_committed: usize,
}

impl KioskEngine {
    pub fn new(
        extractor: Box<dyn FeatureExtractor>,
        matcher: IdentityMatcher,
        tracker: FaceTracker,
        registration: RegistrationStateMachine,
        cooldown: f64,
    ) -> Self {
        Self {
            extractor,
            matcher,
            tracker,
            registration,
            cooldown,
            last_detection: None,
            detection_cycles: 0,
            identities_seen: HashSet::new(),
            registrations_committed: 0,
        }
    }

    pub fn from_config(config: &KioskConfig) -> Self {
        Self::new(
            Box::new(EqualizedFeatureExtractor::new(config.feature_size)),
            IdentityMatcher::new(config.match_threshold),
            FaceTracker::new(
                BoxSmoother::new(config.smoothing_alpha),
                config.tracking_timeout_secs,
            ),
            RegistrationStateMachine::new(config.registration_duration_secs),
            config.detection_cooldown_secs,
        )
    }

    pub fn tracker(&self) -> &FaceTracker {
        &self.tracker
    }

    pub fn detection_cycles(&self) -> usize {
        self.detection_cycles
    }

    pub fn identities_seen(&self) -> usize {
        self.identities_seen.len()
    }

    pub fn registrations_committed(&self) -> usize {
        self.registrations_committed
    }

    /// Runs one cycle at time `now` (seconds).
    ///
    /// Detection and matching only run once the cooldown has elapsed since
    /// the previous detection; eviction and registration run every frame.
    pub fn process_frame(
        &mut self,
        frame: &Frame,
        now: f64,
        detector: &mut dyn FaceDetector,
        gallery: &mut dyn GalleryStore,
    ) -> KioskCycle {
        let mut cycle = KioskCycle::default();

        let due = self
            .last_detection
            .map_or(true, |last| now - last >= self.cooldown);
        if due {
            self.last_detection = Some(now);
            self.detection_cycles += 1;

            let t0 = Instant::now();
            let regions = detector.detect(frame).unwrap_or_else(|e| {
                log::warn!("Face detection failed on frame {}: {e}", frame.index());
                Vec::new()
            });
            cycle.detect_ms = t0.elapsed().as_secs_f64() * 1000.0;
            cycle.detections = regions.len();

            let t0 = Instant::now();
            self.apply_detections(frame, &regions, now, gallery);
            cycle.match_ms = t0.elapsed().as_secs_f64() * 1000.0;
        }

        let t0 = Instant::now();
        self.tracker.evict_stale(now);

        let mut faces = Vec::with_capacity(self.tracker.len());
        for face in self.tracker.faces_mut() {
            let update = self.registration.advance(face, now, gallery);
            if update.committed {
                cycle.committed.push(face.identity());
            }
            faces.push(TrackedFaceView {
                identity: face.identity(),
                smoothed_box: face.smoothed_box(),
                progress: update.progress,
                status: update.status,
            });
        }
        self.registrations_committed += cycle.committed.len();
        cycle.track_ms = t0.elapsed().as_secs_f64() * 1000.0;

        cycle.view = KioskView {
            faces,
            detection_ran: due,
            has_searched: self.detection_cycles > 0,
        };
        cycle
    }

    /// Extracts, matches and tracks every usable region. A region that
    /// fails at any step is skipped without affecting the others.
    fn apply_detections(
        &mut self,
        frame: &Frame,
        regions: &[Region],
        now: f64,
        gallery: &mut dyn GalleryStore,
    ) {
        let mut seen_this_frame = HashSet::new();

        for region in regions {
            let Some(region) = region
                .is_valid()
                .then(|| region.clamp_to(frame.width(), frame.height()))
                .flatten()
            else {
                log::debug!("Ignoring unusable detection {region:?}");
                continue;
            };

            let features = match self.extractor.extract(&frame.crop(&region)) {
                Ok(features) => features,
                Err(e) => {
                    log::debug!("Skipping region {region:?}: {e}");
                    continue;
                }
            };

            let matched = match self.matcher.match_features(&features, gallery) {
                Ok(matched) => matched,
                Err(e) => {
                    log::warn!("Gallery lookup failed; skipping region {region:?}: {e}");
                    continue;
                }
            };
            let identity = matched.identity;

            if !seen_this_frame.insert(identity) {
                log::debug!("Identity {identity} matched twice in one frame; keeping the first");
                continue;
            }
            self.identities_seen.insert(identity);

            let bbox = FaceBox::from(region);
            if self.tracker.observe(identity, bbox, now) {
                continue;
            }
            let already_played = !matched.is_new
                && gallery.is_played(identity).unwrap_or_else(|e| {
                    log::warn!("Could not read played flag for identity {identity}: {e}");
                    false
                });
            self.tracker.begin_tracking(identity, bbox, now, already_played);
        }
    }
}

impl Default for KioskEngine {
    fn default() -> Self {
        Self::from_config(&KioskConfig::default())
    }
}
