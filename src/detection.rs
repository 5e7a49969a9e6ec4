use std::path::PathBuf;

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::error::{PerceptionError, Result};

/// Axis-aligned box in canonical-square pixels.
///
/// `x1 <= x2` and `y1 <= y2` hold for anything the decoder produces from a
/// non-negative size; degenerate boxes are still tolerated downstream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> BoundingBox {
        BoundingBox { x1, y1, x2, y2 }
    }

    pub fn from_center(xc: f32, yc: f32, w: f32, h: f32) -> BoundingBox {
        BoundingBox::new(xc - w / 2.0, yc - h / 2.0, xc + w / 2.0, yc + h / 2.0)
    }

    /// Area with negative extents counted as zero.
    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: usize,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(class_id: usize, confidence: f32, bbox: BoundingBox) -> Detection {
        Detection {
            class_id,
            confidence,
            bbox,
        }
    }
}

/// Raw detector tensor, logically `[1, 4 + num_labels, num_anchors]`,
/// row-major with the anchor index varying fastest.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorOutput {
    pub shape: [usize; 3],
    pub data: Vec<f32>,
}

impl DetectorOutput {
    pub fn new(shape: [usize; 3], data: Vec<f32>) -> DetectorOutput {
        DetectorOutput { shape, data }
    }

    pub fn num_anchors(&self) -> usize {
        self.shape[2]
    }

    fn check_layout(&self, num_labels: usize) -> Result<()> {
        let channels = 4 + num_labels;
        if self.shape[0] != 1 || self.shape[1] != channels {
            return Err(PerceptionError::MalformedDetectorOutput {
                expected: format!("[1, {}, N]", channels),
                actual: format!("{:?}", self.shape),
            });
        }
        let expected_len = self.shape.iter().product::<usize>();
        if self.data.len() != expected_len {
            return Err(PerceptionError::MalformedDetectorOutput {
                expected: format!("{} values for shape {:?}", expected_len, self.shape),
                actual: format!("{} values", self.data.len()),
            });
        }
        Ok(())
    }
}

/// Neural detector capability: canonical square in, raw tensor out.
pub trait NeuralDetector {
    fn infer(&self, image: &GrayImage) -> Result<DetectorOutput>;
}

/// Turns every anchor whose best class score reaches `confidence_threshold`
/// into a detection. No suppression happens here.
pub fn decode_detections(
    output: &DetectorOutput,
    num_labels: usize,
    confidence_threshold: f32,
) -> Result<Vec<Detection>> {
    output.check_layout(num_labels)?;
    let n = output.num_anchors();
    let at = |channel: usize, anchor: usize| output.data[anchor + n * channel];

    let mut detections = Vec::new();
    for i in 0..n {
        let mut class_id = None;
        let mut max_score = f32::NEG_INFINITY;
        for j in 0..num_labels {
            let score = at(4 + j, i);
            if score > max_score {
                max_score = score;
                class_id = Some(j);
            }
        }
        let Some(class_id) = class_id else {
            continue;
        };
        if max_score >= confidence_threshold {
            let bbox = BoundingBox::from_center(at(0, i), at(1, i), at(2, i), at(3, i));
            detections.push(Detection::new(class_id, max_score, bbox));
        }
    }
    log::debug!("{} raw detections over {} anchors", detections.len(), n);
    Ok(detections)
}

/// Replays a tensor dumped to disk as little-endian `f32`, whatever the image.
#[derive(Debug, Clone)]
pub struct TensorFileDetector {
    pub path: PathBuf,
    pub shape: [usize; 3],
}

impl TensorFileDetector {
    pub fn new(path: impl Into<PathBuf>, shape: [usize; 3]) -> TensorFileDetector {
        TensorFileDetector {
            path: path.into(),
            shape,
        }
    }
}

impl NeuralDetector for TensorFileDetector {
    fn infer(&self, _image: &GrayImage) -> Result<DetectorOutput> {
        crate::io::read_raw_tensor(&self.path, self.shape)
    }
}
