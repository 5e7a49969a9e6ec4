use nalgebra as na;
use serde::{Deserialize, Serialize};

use crate::classify::LabelSet;
use crate::error::{PerceptionError, Result};
use crate::mission::RetryPolicy;

pub const DEFAULT_LABELS: [&str; 11] = [
    "coin",
    "compass",
    "coral",
    "crystal",
    "diamond",
    "emerald",
    "fossil",
    "key",
    "letter",
    "shell",
    "treasure_box",
];

/// Fiducial symbol set the marker detector is expected to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerDictionary {
    pub marker_bits: u32,
    pub size: u32,
}

impl MarkerDictionary {
    /// OpenCV name of the dictionary, e.g. `DICT_5X5_1000`.
    pub fn name(&self) -> String {
        format!("DICT_{0}X{0}_{1}", self.marker_bits, self.size)
    }
}

impl Default for MarkerDictionary {
    fn default() -> Self {
        // 5x5 bit payload, 1000 symbols
        Self {
            marker_bits: 5,
            size: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptionConfig {
    pub labels: Vec<String>,
    pub treasure_indices: Vec<usize>,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub canonical_size: u32,
    /// Half side of the physical square centred on the region anchor.
    pub anchor_half_extent: f64,
    pub marker_dictionary: MarkerDictionary,
    pub retry: RetryPolicy,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            labels: DEFAULT_LABELS.iter().map(|s| s.to_string()).collect(),
            treasure_indices: vec![3, 4, 5],
            confidence_threshold: 0.25,
            iou_threshold: 0.7,
            canonical_size: 640,
            anchor_half_extent: 0.1,
            marker_dictionary: MarkerDictionary::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl PerceptionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.labels.is_empty() {
            return Err(PerceptionError::Config("label list is empty".to_string()));
        }
        for (i, idx) in self.treasure_indices.iter().enumerate() {
            if *idx >= self.labels.len() {
                return Err(PerceptionError::Config(format!(
                    "treasure index {} out of range for {} labels",
                    idx,
                    self.labels.len()
                )));
            }
            if self.treasure_indices[..i].contains(idx) {
                return Err(PerceptionError::Config(format!(
                    "treasure index {} listed twice",
                    idx
                )));
            }
        }
        if !(self.iou_threshold > 0.0 && self.iou_threshold <= 1.0) {
            return Err(PerceptionError::Config(format!(
                "iou threshold {} outside (0, 1]",
                self.iou_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(PerceptionError::Config(format!(
                "confidence threshold {} outside [0, 1]",
                self.confidence_threshold
            )));
        }
        if self.canonical_size < 2 {
            return Err(PerceptionError::Config(format!(
                "canonical size {} is too small",
                self.canonical_size
            )));
        }
        Ok(())
    }

    pub fn label_set(&self) -> LabelSet {
        LabelSet::new(self.labels.clone(), &self.treasure_indices)
    }
}

/// Intrinsics and 5-coefficient distortion (k1, k2, p1, p2, k3) of the navigation camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraCalibration {
    pub camera_matrix: [[f64; 3]; 3],
    pub distortion: [f64; 5],
}

impl CameraCalibration {
    pub fn na_camera_matrix(&self) -> na::Matrix3<f64> {
        let m = &self.camera_matrix;
        na::Matrix3::new(
            m[0][0], m[0][1], m[0][2], //
            m[1][0], m[1][1], m[1][2], //
            m[2][0], m[2][1], m[2][2],
        )
    }
}
