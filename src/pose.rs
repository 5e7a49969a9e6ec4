use nalgebra as na;

use crate::error::{PerceptionError, Result};
use crate::optimization::solve_pnp;
use crate::region::region_center;
use crate::types::{Pose, Quad};

/// Object points of the area: its centre, then the corners of the
/// `2 * half_extent` square in the same order as the image quad.
pub fn anchor_object_points(half_extent: f64) -> [glam::Vec3; 5] {
    let h = half_extent as f32;
    [
        glam::Vec3::new(0.0, 0.0, 0.0),
        glam::Vec3::new(-h, -h, 0.0),
        glam::Vec3::new(h, -h, 0.0),
        glam::Vec3::new(h, h, 0.0),
        glam::Vec3::new(-h, h, 0.0),
    ]
}

pub fn anchor_image_points(quad: &Quad) -> [na::Point2<f64>; 5] {
    [region_center(quad), quad[0], quad[1], quad[2], quad[3]]
}

/// Shoelace area; NaN corners give NaN.
fn quad_area(quad: &Quad) -> f64 {
    let mut twice = 0.0;
    for i in 0..4 {
        let a = quad[i];
        let b = quad[(i + 1) % 4];
        twice += a.x * b.y - b.x * a.y;
    }
    twice.abs() / 2.0
}

/// Position of the area centre in robot-body axes, from the undistorted
/// area quad.
pub fn estimate_anchor_pose(
    camera_matrix: &na::Matrix3<f64>,
    quad: &Quad,
    half_extent: f64,
) -> Result<Pose> {
    let area = quad_area(quad);
    if area.is_nan() || area <= 1e-6 {
        return Err(PerceptionError::PoseSolveFailure(
            "area quad has no extent".to_string(),
        ));
    }
    let p3ds = anchor_object_points(half_extent);
    let p2ds = anchor_image_points(quad);
    let (_, t) = solve_pnp(camera_matrix, &p3ds, &p2ds)?;
    if t.2 <= 0.0 {
        return Err(PerceptionError::PoseSolveFailure(format!(
            "area solved behind the camera, z = {}",
            t.2
        )));
    }
    let pose = Pose::from_camera_translation(&na::Vector3::new(t.0, t.1, t.2));
    log::debug!("anchor pose {:?}", pose);
    Ok(pose)
}
