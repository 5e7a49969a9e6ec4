pub mod camera_model;
pub mod classify;
pub mod config;
pub mod detection;
pub mod error;
pub mod io;
pub mod marker;
pub mod mission;
pub mod nms;
pub mod optimization;
pub mod orientation;
pub mod pipeline;
pub mod pose;
pub mod region;
pub mod types;
pub mod visualization;

pub use classify::{AreaRecord, ItemCategory, ItemInfo, LabelSet};
pub use config::{CameraCalibration, PerceptionConfig};
pub use detection::{BoundingBox, Detection, DetectorOutput, NeuralDetector};
pub use error::{PerceptionError, Result};
pub use marker::{MarkerCandidate, MarkerDetector};
pub use pipeline::{PerceptionPipeline, Preprocessed, SnapshotSink};
pub use types::{Pose, Quad};
