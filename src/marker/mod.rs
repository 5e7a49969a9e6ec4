use image::GrayImage;
use nalgebra as na;

use crate::types::Quad;

mod aruco;
pub mod quad;

pub use aruco::ArucoMarkerDetector;

/// One decoded fiducial: id plus corners (lt, rt, rb, lb).
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerCandidate {
    pub id: u32,
    pub corners: Quad,
}

impl MarkerCandidate {
    pub fn new(id: u32, corners: Quad) -> MarkerCandidate {
        MarkerCandidate { id, corners }
    }

    pub fn lt(&self) -> &na::Point2<f64> {
        &self.corners[0]
    }

    pub fn rt(&self) -> &na::Point2<f64> {
        &self.corners[1]
    }

    pub fn rb(&self) -> &na::Point2<f64> {
        &self.corners[2]
    }

    pub fn lb(&self) -> &na::Point2<f64> {
        &self.corners[3]
    }
}

/// Fiducial detection capability.
pub trait MarkerDetector {
    /// All markers decoded in `frame`, in the detector's own order.
    fn detect(&self, frame: &GrayImage) -> Vec<MarkerCandidate>;
}

/// First candidate carrying `target_id`, or `None` when it is not visible.
pub fn locate_marker<D: MarkerDetector + ?Sized>(
    detector: &D,
    frame: &GrayImage,
    target_id: u32,
) -> Option<MarkerCandidate> {
    let candidates = detector.detect(frame);
    select_marker(&candidates, target_id).cloned()
}

/// First of `candidates` carrying `target_id`.
pub fn select_marker(
    candidates: &[MarkerCandidate],
    target_id: u32,
) -> Option<&MarkerCandidate> {
    log::debug!(
        "{} marker candidates, looking for {}",
        candidates.len(),
        target_id
    );
    let found = candidates.iter().find(|c| c.id == target_id);
    if found.is_none() {
        log::info!("marker {} not found", target_id);
    }
    found
}
