use nalgebra as na;
use serde::{Deserialize, Serialize};

/// Four image points ordered top-left, top-right, bottom-right, bottom-left.
pub type Quad = [na::Point2<f64>; 4];

/// Translation of the region anchor in robot-body axes (x forward, y right, z down).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Pose {
    pub fn new(x: f64, y: f64, z: f64) -> Pose {
        Pose { x, y, z }
    }

    /// Fallback used when the marker is not visible.
    pub fn zero() -> Pose {
        Pose::default()
    }

    /// Remaps a camera-frame translation (z forward) to body axes.
    pub fn from_camera_translation(t: &na::Vector3<f64>) -> Pose {
        Pose::new(t.z, t.x, t.y)
    }

    pub fn to_dvec3(&self) -> glam::DVec3 {
        glam::DVec3::new(self.x, self.y, self.z)
    }
}

impl From<glam::DVec3> for Pose {
    fn from(v: glam::DVec3) -> Self {
        Pose::new(v.x, v.y, v.z)
    }
}
