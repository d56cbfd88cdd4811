use thiserror::Error;

use crate::recognition::domain::feature_vector::FeatureVector;
use crate::shared::frame::Frame;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("face crop has zero area ({width}x{height})")]
    EmptyRegion { width: u32, height: u32 },
    #[error("unsupported channel layout: {0} channels")]
    UnsupportedChannels(u8),
}

/// Turns a cropped face into a deterministic feature vector.
///
/// A failure concerns only that crop; callers skip it and carry on with the
/// rest of the frame.
pub trait FeatureExtractor: Send {
    fn extract(&self, face: &Frame) -> Result<FeatureVector, ExtractionError>;
}
