use crate::recognition::domain::feature_vector::FeatureVector;
use crate::recognition::domain::gallery_store::{
    GalleryEntry, GalleryError, GalleryStore, Identity,
};

/// Non-durable gallery for rehearsal runs and tests.
#[derive(Debug, Default)]
pub struct InMemoryGalleryStore {
    entries: Vec<GalleryEntry>,
    next_identity: Identity,
}

impl InMemoryGalleryStore {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_identity: 1,
        }
    }

    fn entry(&self, identity: Identity) -> Option<&GalleryEntry> {
        self.entries.iter().find(|e| e.identity == identity)
    }
}

impl GalleryStore for InMemoryGalleryStore {
    fn lookup_all(&self) -> Result<Vec<GalleryEntry>, GalleryError> {
        Ok(self.entries.clone())
    }

    fn insert(&mut self, feature: &FeatureVector) -> Result<Identity, GalleryError> {
        let identity = self.next_identity.max(1);
        self.next_identity = identity + 1;
        self.entries.push(GalleryEntry {
            identity,
            feature: feature.clone(),
            played: false,
        });
        Ok(identity)
    }

    fn set_played(&mut self, identity: Identity) -> Result<(), GalleryError> {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.identity == identity) {
            entry.played = true;
        }
        Ok(())
    }

    fn is_played(&self, identity: Identity) -> Result<bool, GalleryError> {
        Ok(self.entry(identity).is_some_and(|e| e.played))
    }

    fn len(&self) -> Result<usize, GalleryError> {
        Ok(self.entries.len())
    }
}
