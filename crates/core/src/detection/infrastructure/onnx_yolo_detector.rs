//! YOLO face detector using ONNX Runtime via `ort`.
//!
//! Letterbox preprocessing, inference, confidence filtering and NMS. Boxes
//! come back in frame pixels with no identity attached; identity is decided
//! downstream by feature matching.
use std::path::Path;

use ndarray::Array4;

use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

use super::math::{nms, ScoredBox};

/// Fallback model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

const NMS_IOU_THRESH: f64 = 0.45;

/// YOLO letterbox padding value (114/255 gray).
const PAD_VALUE: f32 = 114.0 / 255.0;

pub struct OnnxYoloDetector {
    session: ort::session::Session,
    confidence: f64,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Loads the model; input size is read from its NCHW input shape.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?.commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| match input.dtype() {
                ort::value::ValueType::Tensor { ref shape, .. }
                    if shape.len() >= 4 && shape[2] > 0 =>
                {
                    Some(shape[2] as u32)
                }
                _ => None,
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::debug!("YOLO model input size: {input_size}");
        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }
}

impl FaceDetector for OnnxYoloDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
        if frame.channels() != 3 || frame.width() == 0 || frame.height() == 0 {
            return Ok(Vec::new());
        }

        let confidence = self.confidence;
        let (input, letterbox) = letterbox(frame, self.input_size);
        let outputs = self
            .session
            .run(ort::inputs![ort::value::Tensor::from_array(input)?])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        if shape.len() != 3 {
            return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
        }

        // Either [1, features, detections] or [1, detections, features].
        let transposed = shape[1] < shape[2];
        let (num_dets, num_feats) = if transposed {
            (shape[2], shape[1])
        } else {
            (shape[1], shape[2])
        };
        if num_feats < 5 {
            return Ok(Vec::new());
        }
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;
        let value = |det: usize, feat: usize| -> f64 {
            let idx = if transposed {
                feat * num_dets + det
            } else {
                det * num_feats + feat
            };
            data[idx] as f64
        };

        let candidates: Vec<ScoredBox> = (0..num_dets)
            .filter_map(|i| {
                let score = value(i, 4);
                (score >= confidence).then(|| ScoredBox {
                    bbox: letterbox.to_frame(value(i, 0), value(i, 1), value(i, 2), value(i, 3)),
                    score,
                })
            })
            .collect();

        Ok(nms(candidates, NMS_IOU_THRESH)
            .into_iter()
            .map(|b| to_region(&b.bbox))
            .collect())
    }
}

/// Mapping between letterboxed model space and frame pixels.
#[derive(Clone, Copy, Debug)]
struct Letterbox {
    scale: f64,
    pad_x: f64,
    pad_y: f64,
}

impl Letterbox {
    /// Converts a model-space `(cx, cy, w, h)` to frame `[x1, y1, x2, y2]`.
    fn to_frame(&self, cx: f64, cy: f64, w: f64, h: f64) -> [f64; 4] {
        [
            (cx - w / 2.0 - self.pad_x) / self.scale,
            (cy - h / 2.0 - self.pad_y) / self.scale,
            (cx + w / 2.0 - self.pad_x) / self.scale,
            (cy + h / 2.0 - self.pad_y) / self.scale,
        ]
    }
}

/// Nearest-neighbour resizes the frame into a padded square NCHW tensor.
fn letterbox(frame: &Frame, target_size: u32) -> (Array4<f32>, Letterbox) {
    let (fw, fh) = (frame.width() as f64, frame.height() as f64);
    let target = target_size as usize;

    let scale = (target_size as f64 / fw).min(target_size as f64 / fh);
    let new_w = ((fw * scale).round() as usize).min(target);
    let new_h = ((fh * scale).round() as usize).min(target);
    let pad_x = (target - new_w) / 2;
    let pad_y = (target - new_h) / 2;

    let mut tensor = Array4::<f32>::from_elem((1, 3, target, target), PAD_VALUE);
    let src = frame.as_ndarray();
    let max_y = frame.height() as usize - 1;
    let max_x = frame.width() as usize - 1;

    for y in 0..new_h {
        let src_y = ((y as f64 / scale) as usize).min(max_y);
        for x in 0..new_w {
            let src_x = ((x as f64 / scale) as usize).min(max_x);
            for c in 0..3 {
                tensor[[0, c, pad_y + y, pad_x + x]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (
        tensor,
        Letterbox {
            scale,
            pad_x: pad_x as f64,
            pad_y: pad_y as f64,
        },
    )
}

fn to_region(bbox: &[f64; 4]) -> Region {
    let x1 = bbox[0].round() as i32;
    let y1 = bbox[1].round() as i32;
    Region::new(
        x1,
        y1,
        bbox[2].round() as i32 - x1,
        bbox[3].round() as i32 - y1,
    )
}
