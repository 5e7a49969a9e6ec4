use nalgebra as na;
use sqpnp_simple::sqpnp_solve_glam;

use crate::error::{PerceptionError, Result};

/// Rotation vector and translation of the object frame in camera coordinates.
pub type RvecTvec = ((f64, f64, f64), (f64, f64, f64));

/// Perspective-n-Point on undistorted pixels.
///
/// Pixels are lifted to the z = 1 plane with the inverse camera matrix and
/// handed to SQPnP.
pub fn solve_pnp(
    camera_matrix: &na::Matrix3<f64>,
    p3ds: &[glam::Vec3],
    p2ds: &[na::Point2<f64>],
) -> Result<RvecTvec> {
    if p3ds.len() != p2ds.len() {
        return Err(PerceptionError::PoseSolveFailure(format!(
            "{} object points vs {} image points",
            p3ds.len(),
            p2ds.len()
        )));
    }
    if p3ds.len() < 4 {
        return Err(PerceptionError::PoseSolveFailure(format!(
            "need at least 4 correspondences, got {}",
            p3ds.len()
        )));
    }
    let k_inv = camera_matrix.try_inverse().ok_or_else(|| {
        PerceptionError::PoseSolveFailure("camera matrix is singular".to_string())
    })?;
    let p2ds_z: Vec<glam::Vec2> = p2ds
        .iter()
        .map(|p| {
            let n = k_inv * na::Vector3::new(p.x, p.y, 1.0);
            glam::Vec2::new((n.x / n.z) as f32, (n.y / n.z) as f32)
        })
        .collect();
    if p2ds_z.iter().any(|p| !p.is_finite()) {
        return Err(PerceptionError::PoseSolveFailure(
            "non-finite normalized image point".to_string(),
        ));
    }

    let (r, t) = sqpnp_solve_glam(p3ds, &p2ds_z).ok_or_else(|| {
        PerceptionError::PoseSolveFailure("sqpnp found no solution".to_string())
    })?;
    let finite = [r.0, r.1, r.2, t.0, t.1, t.2].iter().all(|v| v.is_finite());
    if !finite {
        return Err(PerceptionError::PoseSolveFailure(
            "sqpnp returned a non-finite pose".to_string(),
        ));
    }
    log::trace!("pnp r {:?} t {:?}", r, t);
    Ok((r, t))
}
