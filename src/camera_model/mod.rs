pub mod generic;
pub mod opencv5;

pub use generic::{CameraModel, init_undistort_map, remap};
pub use opencv5::OpenCVModel5;

use crate::config::CameraCalibration;
use image::DynamicImage;
use nalgebra as na;

/// Cached undistortion maps for one calibration and frame size.
///
/// The output keeps the original camera matrix, so undistorted pixels can be
/// fed to pose solving with zero distortion.
pub struct Undistorter {
    camera_matrix: na::Matrix3<f64>,
    width: u32,
    height: u32,
    xmap: na::DMatrix<f32>,
    ymap: na::DMatrix<f32>,
}

impl Undistorter {
    pub fn new(calib: &CameraCalibration, width: u32, height: u32) -> Undistorter {
        let model = OpenCVModel5::from_calibration(calib, width, height);
        let camera_matrix = calib.na_camera_matrix();
        let (xmap, ymap) = init_undistort_map(&model, &camera_matrix, (height, width));
        log::debug!("undistort map ready for {}x{}", width, height);
        Undistorter {
            camera_matrix,
            width,
            height,
            xmap,
            ymap,
        }
    }

    pub fn camera_matrix(&self) -> &na::Matrix3<f64> {
        &self.camera_matrix
    }

    pub fn frame_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn undistort(&self, img: &DynamicImage) -> DynamicImage {
        if (img.width(), img.height()) != (self.width, self.height) {
            log::warn!(
                "frame is {}x{}, undistort map was built for {}x{}",
                img.width(),
                img.height(),
                self.width,
                self.height
            );
        }
        remap(img, &self.xmap, &self.ymap)
    }
}
