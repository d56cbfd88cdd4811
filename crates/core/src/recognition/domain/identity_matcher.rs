use crate::recognition::domain::feature_vector::FeatureVector;
use crate::recognition::domain::gallery_store::{GalleryError, GalleryStore, Identity};

pub const DEFAULT_MATCH_THRESHOLD: f64 = 40.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchResult {
    pub identity: Identity,
    pub is_new: bool,
}

/// Nearest-neighbour identity lookup under a maximum-distance policy.
///
/// A full linear scan of the gallery per query. Galleries here hold one
/// event's visitors, so no index is kept; an indexed nearest-neighbour
/// structure would slot in behind [`IdentityMatcher::nearest`].
pub struct IdentityMatcher {
    threshold: f64,
}

impl IdentityMatcher {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Returns the closest stored identity strictly under the threshold, or
    /// allocates a new gallery entry for `features`.
    pub fn match_features(
        &self,
        features: &FeatureVector,
        gallery: &mut dyn GalleryStore,
    ) -> Result<MatchResult, GalleryError> {
        if let Some((identity, distance)) = self.nearest(features, &*gallery)? {
            log::debug!("Matched identity {identity} at distance {distance:.2}");
            return Ok(MatchResult {
                identity,
                is_new: false,
            });
        }

        let identity = gallery.insert(features)?;
        log::info!("Registered new identity {identity}");
        Ok(MatchResult {
            identity,
            is_new: true,
        })
    }

    /// Best `(identity, distance)` with `distance < threshold`.
    ///
    /// Exact ties keep the entry seen first. Entries of a different feature
    /// length are not comparable and are skipped.
    pub fn nearest(
        &self,
        features: &FeatureVector,
        gallery: &dyn GalleryStore,
    ) -> Result<Option<(Identity, f64)>, GalleryError> {
        let mut best: Option<(Identity, f64)> = None;
        for entry in gallery.lookup_all()? {
            let Some(distance) = features.distance(&entry.feature) else {
                log::debug!(
                    "Skipping identity {}: feature length {} != {}",
                    entry.identity,
                    entry.feature.len(),
                    features.len()
                );
                continue;
            };
            if distance >= self.threshold {
                continue;
            }
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((entry.identity, distance));
            }
        }
        Ok(best)
    }
}

impl Default for IdentityMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MATCH_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::infrastructure::in_memory_gallery_store::InMemoryGalleryStore;
    use rstest::rstest;

    /// Vector whose distance from the zero vector of the same length is `d`.
    fn at_distance(d: f32) -> FeatureVector {
        FeatureVector::new(vec![d, 0.0])
    }

    fn gallery_of(vectors: &[FeatureVector]) -> InMemoryGalleryStore {
        let mut gallery = InMemoryGalleryStore::new();
        for v in vectors {
            gallery.insert(v).unwrap();
        }
        gallery
    }

    #[test]
    fn test_empty_gallery_allocates_identity_one() {
        let mut gallery = InMemoryGalleryStore::new();
        let result = IdentityMatcher::new(1.0)
            .match_features(&at_distance(0.0), &mut gallery)
            .unwrap();

        assert_eq!(
            result,
            MatchResult {
                identity: 1,
                is_new: true
            }
        );
        assert!(!gallery.is_played(1).unwrap());
        assert_eq!(gallery.len().unwrap(), 1);
    }

    #[test]
    fn test_exact_match_returns_existing_identity() {
        let mut gallery = gallery_of(&[at_distance(0.5)]);
        let result = IdentityMatcher::new(1.0)
            .match_features(&at_distance(0.5), &mut gallery)
            .unwrap();

        assert_eq!(result.identity, 1);
        assert!(!result.is_new);
        assert_eq!(gallery.len().unwrap(), 1);
    }

    #[test]
    fn test_closest_candidate_wins() {
        // Query is the zero vector: entry 1 at 0.6, entry 2 at 0.2, entry 3 at 0.4.
        let mut gallery = gallery_of(&[at_distance(0.6), at_distance(0.2), at_distance(0.4)]);
        let result = IdentityMatcher::new(1.0)
            .match_features(&at_distance(0.0), &mut gallery)
            .unwrap();
        assert_eq!(result.identity, 2);
    }

    #[test]
    fn test_exact_tie_keeps_first_seen() {
        let mut gallery = gallery_of(&[at_distance(0.3), at_distance(0.3)]);
        let result = IdentityMatcher::new(1.0)
            .match_features(&at_distance(0.0), &mut gallery)
            .unwrap();
        assert_eq!(result.identity, 1);
    }

    #[rstest]
    #[case::well_beyond(2.0)]
    #[case::exactly_at_threshold(1.0)]
    fn test_no_candidate_under_threshold_allocates(#[case] distance: f32) {
        let mut gallery = gallery_of(&[at_distance(distance), at_distance(distance + 0.5)]);
        let before = gallery.len().unwrap();

        let result = IdentityMatcher::new(1.0)
            .match_features(&at_distance(0.0), &mut gallery)
            .unwrap();

        assert!(result.is_new);
        assert_eq!(result.identity, 3);
        assert_eq!(gallery.len().unwrap(), before + 1);
        assert!(!gallery.is_played(result.identity).unwrap());
    }

    #[test]
    fn test_incomparable_lengths_are_ignored() {
        let mut gallery = gallery_of(&[FeatureVector::new(vec![0.0; 3])]);
        let result = IdentityMatcher::new(1.0)
            .match_features(&at_distance(0.0), &mut gallery)
            .unwrap();
        assert!(result.is_new);
        assert_eq!(result.identity, 2);
    }

    #[test]
    fn test_nearest_does_not_mutate_gallery() {
        let gallery = gallery_of(&[at_distance(5.0)]);
        let nearest = IdentityMatcher::new(1.0)
            .nearest(&at_distance(0.0), &gallery)
            .unwrap();
        assert!(nearest.is_none());
        assert_eq!(gallery.len().unwrap(), 1);
    }

    #[test]
    fn test_default_threshold() {
        assert_eq!(IdentityMatcher::default().threshold(), 40.0);
    }
}
