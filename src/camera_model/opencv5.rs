use super::generic::CameraModel;
use crate::config::CameraCalibration;
use nalgebra as na;

/// Pinhole camera with the 5-coefficient radial-tangential distortion
/// (k1, k2, p1, p2, k3).
#[derive(Debug, Clone, PartialEq)]
pub struct OpenCVModel5<T: na::RealField + Clone> {
    pub fx: T,
    pub fy: T,
    pub cx: T,
    pub cy: T,
    pub k1: T,
    pub k2: T,
    pub p1: T,
    pub p2: T,
    pub k3: T,
    pub width: u32,
    pub height: u32,
}

impl<T: na::RealField + Clone> OpenCVModel5<T> {
    pub fn new(
        camera_matrix: &na::Matrix3<T>,
        distortion: &[T; 5],
        width: u32,
        height: u32,
    ) -> OpenCVModel5<T> {
        OpenCVModel5 {
            fx: camera_matrix[(0, 0)].clone(),
            fy: camera_matrix[(1, 1)].clone(),
            cx: camera_matrix[(0, 2)].clone(),
            cy: camera_matrix[(1, 2)].clone(),
            k1: distortion[0].clone(),
            k2: distortion[1].clone(),
            p1: distortion[2].clone(),
            p2: distortion[3].clone(),
            k3: distortion[4].clone(),
            width,
            height,
        }
    }

    fn project_one_impl(params: &na::DVector<T>, pt: &na::Vector3<T>) -> na::Vector2<T> {
        let xn = pt[0].clone() / pt[2].clone();
        let yn = pt[1].clone() / pt[2].clone();
        let fx = &params[0];
        let fy = &params[1];
        let cx = &params[2];
        let cy = &params[3];
        let k1 = &params[4];
        let k2 = &params[5];
        let p1 = &params[6];
        let p2 = &params[7];
        let k3 = &params[8];
        let two = T::one() + T::one();

        let r2 = xn.clone() * xn.clone() + yn.clone() * yn.clone();
        let r4 = r2.clone() * r2.clone();
        let r6 = r4.clone() * r2.clone();
        let radial = T::one() + k1.clone() * r2.clone() + k2.clone() * r4 + k3.clone() * r6;
        let xy = xn.clone() * yn.clone();
        let xd = xn.clone() * radial.clone()
            + two.clone() * p1.clone() * xy.clone()
            + p2.clone() * (r2.clone() + two.clone() * xn.clone() * xn);
        let yd = yn.clone() * radial
            + p1.clone() * (r2 + two.clone() * yn.clone() * yn)
            + two * p2.clone() * xy;
        na::Vector2::new(
            fx.clone() * xd + cx.clone(),
            fy.clone() * yd + cy.clone(),
        )
    }
}

impl OpenCVModel5<f64> {
    pub fn from_calibration(calib: &CameraCalibration, width: u32, height: u32) -> Self {
        Self::new(&calib.na_camera_matrix(), &calib.distortion, width, height)
    }
}

impl CameraModel<f64> for OpenCVModel5<f64> {
    fn params(&self) -> na::DVector<f64> {
        na::dvector![
            self.fx, self.fy, self.cx, self.cy, self.k1, self.k2, self.p1, self.p2, self.k3
        ]
    }

    fn project_one(&self, pt: &na::Vector3<f64>) -> na::Vector2<f64> {
        Self::project_one_impl(&self.params(), pt)
    }

    fn width(&self) -> f64 {
        self.width as f64
    }

    fn height(&self) -> f64 {
        self.height as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distortion_is_pinhole() {
        let k = na::Matrix3::new(500.0, 0.0, 320.0, 0.0, 510.0, 240.0, 0.0, 0.0, 1.0);
        let model = OpenCVModel5::new(&k, &[0.0; 5], 640, 480);
        let p = model.project_one(&na::Vector3::new(0.2, -0.1, 2.0));
        assert!((p.x - (500.0 * 0.1 + 320.0)).abs() < 1e-9);
        assert!((p.y - (510.0 * -0.05 + 240.0)).abs() < 1e-9);
    }

    #[test]
    fn barrel_distortion_pulls_points_inward() {
        let k = na::Matrix3::new(500.0, 0.0, 320.0, 0.0, 500.0, 240.0, 0.0, 0.0, 1.0);
        let model = OpenCVModel5::new(&k, &[-0.2, 0.0, 0.0, 0.0, 0.0], 640, 480);
        let p = model.project_one(&na::Vector3::new(0.4, 0.0, 1.0));
        assert!(p.x < 500.0 * 0.4 + 320.0);
        assert!((p.y - 240.0).abs() < 1e-9);
    }
}
