//! Raw-pixel face descriptor: resize → grayscale → histogram equalisation
//! → flatten → scale to `[0, 1]`.
//!
//! Cheap and deterministic; equalisation removes most of the global
//! lighting difference between two sightings of the same face.

use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};

use crate::recognition::domain::feature_extractor::{ExtractionError, FeatureExtractor};
use crate::recognition::domain::feature_vector::FeatureVector;
use crate::shared::frame::Frame;

pub const DEFAULT_FEATURE_SIZE: u32 = 100;

pub struct EqualizedFeatureExtractor {
    size: u32,
}

impl EqualizedFeatureExtractor {
    pub fn new(size: u32) -> Self {
        Self { size: size.max(1) }
    }

    /// Number of components in every vector this extractor produces.
    pub fn feature_len(&self) -> usize {
        (self.size as usize) * (self.size as usize)
    }

    fn resized_gray(&self, face: &Frame) -> Result<GrayImage, ExtractionError> {
        let empty = || ExtractionError::EmptyRegion {
            width: face.width(),
            height: face.height(),
        };
        match face.channels() {
            3 => {
                let rgb = RgbImage::from_raw(face.width(), face.height(), face.data().to_vec())
                    .ok_or_else(empty)?;
                let resized = imageops::resize(&rgb, self.size, self.size, FilterType::Triangle);
                Ok(GrayImage::from_fn(self.size, self.size, |x, y| {
                    let [r, g, b] = resized.get_pixel(x, y).0;
                    image::Luma([luma(r, g, b)])
                }))
            }
            1 => {
                let gray = GrayImage::from_raw(face.width(), face.height(), face.data().to_vec())
                    .ok_or_else(empty)?;
                Ok(imageops::resize(&gray, self.size, self.size, FilterType::Triangle))
            }
            other => Err(ExtractionError::UnsupportedChannels(other)),
        }
    }
}

impl Default for EqualizedFeatureExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_FEATURE_SIZE)
    }
}

impl FeatureExtractor for EqualizedFeatureExtractor {
    fn extract(&self, face: &Frame) -> Result<FeatureVector, ExtractionError> {
        if face.width() == 0 || face.height() == 0 {
            return Err(ExtractionError::EmptyRegion {
                width: face.width(),
                height: face.height(),
            });
        }
        let mut gray = self.resized_gray(face)?.into_raw();
        equalize_histogram(&mut gray);
        Ok(FeatureVector::new(
            gray.into_iter().map(|v| v as f32 / 255.0).collect(),
        ))
    }
}

/// ITU-R BT.601 luma, rounded.
fn luma(r: u8, g: u8, b: u8) -> u8 {
    let y = 0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64;
    y.round().clamp(0.0, 255.0) as u8
}

/// In-place histogram equalisation of 8-bit intensities.
///
/// The darkest occupied level maps to 0 and the cumulative distribution of
/// the remaining pixels is stretched over `1..=255`. A single-level image
/// is left unchanged.
fn equalize_histogram(pixels: &mut [u8]) {
    if pixels.is_empty() {
        return;
    }
    let mut hist = [0usize; 256];
    for &p in pixels.iter() {
        hist[p as usize] += 1;
    }

    let first = hist.iter().position(|&count| count > 0).unwrap_or(0);
    let total = pixels.len();
    if hist[first] == total {
        return;
    }

    let scale = 255.0 / (total - hist[first]) as f64;
    let mut lut = [0u8; 256];
    let mut cumulative = 0usize;
    for level in (first + 1)..256 {
        cumulative += hist[level];
        lut[level] = (cumulative as f64 * scale).round().clamp(0.0, 255.0) as u8;
    }

    for p in pixels.iter_mut() {
        *p = lut[*p as usize];
    }
}
