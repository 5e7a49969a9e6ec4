//! One area recognition pass: frame in, area record out.
//!
//! The marker detector, the neural detector, warping and snapshot storage
//! are injected so each stage can be swapped or mocked.

use std::path::PathBuf;

use image::{DynamicImage, GrayImage};
use nalgebra as na;

use crate::camera_model::Undistorter;
use crate::classify::{AreaRecord, LabelSet, classify_items};
use crate::config::PerceptionConfig;
use crate::detection::{Detection, NeuralDetector, decode_detections};
use crate::error::Result;
use crate::marker::{MarkerDetector, select_marker};
use crate::nms::non_max_suppression;
use crate::pose::estimate_anchor_pose;
use crate::region::{ImageOps, NativeImageOps, rectify_region};
use crate::types::{Pose, Quad};
use crate::visualization::{detection_overlay, marker_overlay};

/// Fire-and-forget image storage for debugging a mission afterwards.
pub trait SnapshotSink {
    fn save(&self, image: &DynamicImage, name: &str);

    /// `false` when saved images are discarded; the pipeline then skips
    /// rendering them.
    fn enabled(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullSnapshotSink;

impl SnapshotSink for NullSnapshotSink {
    fn save(&self, _image: &DynamicImage, _name: &str) {}

    fn enabled(&self) -> bool {
        false
    }
}

/// Writes `<dir>/<name>.png`; failures are logged and dropped.
#[derive(Debug, Clone)]
pub struct DirectorySnapshotSink {
    dir: PathBuf,
}

impl DirectorySnapshotSink {
    pub fn new(dir: impl Into<PathBuf>) -> DirectorySnapshotSink {
        DirectorySnapshotSink { dir: dir.into() }
    }
}

impl SnapshotSink for DirectorySnapshotSink {
    fn save(&self, image: &DynamicImage, name: &str) {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            log::warn!("cannot create {}: {}", self.dir.display(), e);
            return;
        }
        let path = self.dir.join(format!("{}.png", name));
        if let Err(e) = image.save(&path) {
            log::warn!("cannot save snapshot {}: {}", path.display(), e);
        }
    }
}

/// Result of [`PerceptionPipeline::preprocess`].
///
/// With the marker found, `image` is the binarized canonical square. Without
/// it, `image` is the undistorted frame, `anchor` is zero and `source_quad`
/// is `None`.
#[derive(Debug, Clone)]
pub struct Preprocessed {
    pub image: GrayImage,
    pub anchor: Pose,
    pub found: bool,
    pub source_quad: Option<Quad>,
}

pub struct PerceptionPipeline {
    config: PerceptionConfig,
    labels: LabelSet,
    camera_matrix: na::Matrix3<f64>,
    marker_detector: Box<dyn MarkerDetector + Send + Sync>,
    neural_detector: Box<dyn NeuralDetector + Send + Sync>,
    image_ops: Box<dyn ImageOps + Send + Sync>,
    snapshot_sink: Box<dyn SnapshotSink + Send + Sync>,
    undistorter: Option<Undistorter>,
}

impl PerceptionPipeline {
    /// Pipeline over already undistorted frames, native warping and no snapshots.
    pub fn new(
        config: PerceptionConfig,
        camera_matrix: na::Matrix3<f64>,
        marker_detector: Box<dyn MarkerDetector + Send + Sync>,
        neural_detector: Box<dyn NeuralDetector + Send + Sync>,
    ) -> Result<PerceptionPipeline> {
        config.validate()?;
        let labels = config.label_set();
        Ok(PerceptionPipeline {
            config,
            labels,
            camera_matrix,
            marker_detector,
            neural_detector,
            image_ops: Box::new(NativeImageOps),
            snapshot_sink: Box::new(NullSnapshotSink),
            undistorter: None,
        })
    }

    /// Undistorts every frame first; the undistorter's camera matrix replaces
    /// the one given to [`PerceptionPipeline::new`].
    pub fn with_undistorter(mut self, undistorter: Undistorter) -> Self {
        self.camera_matrix = *undistorter.camera_matrix();
        self.undistorter = Some(undistorter);
        self
    }

    pub fn with_image_ops(mut self, image_ops: Box<dyn ImageOps + Send + Sync>) -> Self {
        self.image_ops = image_ops;
        self
    }

    pub fn with_snapshot_sink(mut self, sink: Box<dyn SnapshotSink + Send + Sync>) -> Self {
        self.snapshot_sink = sink;
        self
    }

    pub fn config(&self) -> &PerceptionConfig {
        &self.config
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Undistort, find marker `id`, then rectify the area and solve its pose.
    ///
    /// A missing marker is not an error. A degenerate area or a failed pose
    /// solve is.
    pub fn preprocess(&self, frame: &DynamicImage, id: u32, tag: &str) -> Result<Preprocessed> {
        let gray = match &self.undistorter {
            Some(u) => u.undistort(frame).to_luma8(),
            None => frame.to_luma8(),
        };

        let candidates = self.marker_detector.detect(&gray);
        let snapshots = self.snapshot_sink.enabled();
        if snapshots {
            self.snapshot_sink.save(
                &DynamicImage::ImageRgb8(marker_overlay(&gray, &candidates)),
                &format!("marker_detect{}{}", id, tag),
            );
        }

        let Some(marker) = select_marker(&candidates, id) else {
            if snapshots {
                self.snapshot_sink.save(
                    &DynamicImage::ImageLuma8(gray.clone()),
                    &format!("preprocess{}{}", id, tag),
                );
            }
            return Ok(Preprocessed {
                image: gray,
                anchor: Pose::zero(),
                found: false,
                source_quad: None,
            });
        };

        let region = rectify_region(
            self.image_ops.as_ref(),
            &gray,
            marker,
            self.config.canonical_size,
        )?;
        let anchor = estimate_anchor_pose(
            &self.camera_matrix,
            &region.source_quad,
            self.config.anchor_half_extent,
        )?;
        log::info!("marker {} anchor at {:?}", id, anchor);

        if snapshots {
            self.snapshot_sink.save(
                &DynamicImage::ImageLuma8(region.image.clone()),
                &format!("preprocess{}{}", id, tag),
            );
        }
        Ok(Preprocessed {
            image: region.image,
            anchor,
            found: true,
            source_quad: Some(region.source_quad),
        })
    }

    /// Detector inference, decode and suppression over one image.
    pub fn detect_items(&self, image: &GrayImage) -> Result<Vec<Detection>> {
        let output = self.neural_detector.infer(image)?;
        let raw = decode_detections(
            &output,
            self.labels.len(),
            self.config.confidence_threshold,
        )?;
        let kept = non_max_suppression(&raw, self.config.iou_threshold);
        log::debug!("{} raw, {} kept", raw.len(), kept.len());
        Ok(kept)
    }

    /// Full pass for area `id`.
    pub fn recognize_area(&self, frame: &DynamicImage, id: u32) -> Result<AreaRecord> {
        let pre = self.preprocess(frame, id, "")?;
        let detections = self.detect_items(&pre.image)?;
        if self.snapshot_sink.enabled() {
            self.snapshot_sink.save(
                &DynamicImage::ImageRgb8(detection_overlay(&pre.image, &detections)),
                &format!("detect{}", id),
            );
        }
        let (landmark, treasure) = classify_items(&detections, &self.labels);
        Ok(AreaRecord::new(landmark, treasure, pre.anchor))
    }
}
