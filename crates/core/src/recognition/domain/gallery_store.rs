use std::path::PathBuf;

use thiserror::Error;

use crate::recognition::domain::feature_vector::FeatureVector;

/// Durable identity key, allocated by the gallery starting at 1.
pub type Identity = u32;

#[derive(Clone, Debug, PartialEq)]
pub struct GalleryEntry {
    pub identity: Identity,
    pub feature: FeatureVector,
    pub played: bool,
}

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to back up corrupt store {path}: {source}")]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid stored value: {0}")]
    InvalidValue(String),
}

/// Persistent mapping identity → feature vector and identity → played flag.
///
/// `played` only ever moves false → true.
pub trait GalleryStore: Send {
    /// Every entry with a readable feature vector, in identity order.
    fn lookup_all(&self) -> Result<Vec<GalleryEntry>, GalleryError>;

    /// Persists a new entry with `played = false` and returns its identity.
    fn insert(&mut self, feature: &FeatureVector) -> Result<Identity, GalleryError>;

    /// Idempotent.
    fn set_played(&mut self, identity: Identity) -> Result<(), GalleryError>;

    /// `false` for unknown identities.
    fn is_played(&self, identity: Identity) -> Result<bool, GalleryError>;

    fn len(&self) -> Result<usize, GalleryError>;

    fn is_empty(&self) -> Result<bool, GalleryError> {
        Ok(self.len()? == 0)
    }
}
