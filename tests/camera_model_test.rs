use area_recognition::camera_model::{
    CameraModel, OpenCVModel5, Undistorter, init_undistort_map, remap,
};
use area_recognition::config::CameraCalibration;
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use nalgebra as na;

fn calibration(distortion: [f64; 5]) -> CameraCalibration {
    CameraCalibration {
        camera_matrix: [[200.0, 0.0, 40.0], [0.0, 200.0, 30.0], [0.0, 0.0, 1.0]],
        distortion,
    }
}

fn pattern() -> GrayImage {
    GrayImage::from_fn(80, 60, |x, y| Luma([((x * 3 + y * 5) % 256) as u8]))
}

#[test]
fn test_zero_distortion_undistort_is_identity() {
    let undistorter = Undistorter::new(&calibration([0.0; 5]), 80, 60);
    assert_eq!(undistorter.frame_size(), (80, 60));
    let img = DynamicImage::ImageLuma8(pattern());
    let out = undistorter.undistort(&img);
    assert_eq!(out.to_luma8(), pattern());
}

#[test]
fn test_undistort_keeps_rgb() {
    let undistorter = Undistorter::new(&calibration([0.0; 5]), 80, 60);
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(80, 60, Rgb([1, 2, 3])));
    match undistorter.undistort(&img) {
        DynamicImage::ImageRgb8(out) => assert_eq!(out.get_pixel(10, 10).0, [1, 2, 3]),
        other => panic!("expected rgb8, got {:?}", other.color()),
    }
}

#[test]
fn test_barrel_map_samples_outward_corners_inward() {
    let calib = calibration([-0.3, 0.0, 0.0, 0.0, 0.0]);
    let model = OpenCVModel5::from_calibration(&calib, 80, 60);
    let k = calib.na_camera_matrix();
    let (xmap, ymap) = init_undistort_map(&model, &k, (60, 80));
    assert_eq!(xmap.shape(), (60, 80));
    // principal point is fixed
    assert!((xmap[(30, 40)] - 40.0).abs() < 1e-3);
    assert!((ymap[(30, 40)] - 30.0).abs() < 1e-3);
    // a corner pixel of the output comes from closer to the centre
    assert!(xmap[(0, 79)] < 79.0);
    assert!(ymap[(0, 79)] > 0.0);
}

#[test]
fn test_project_rejects_points_outside_image() {
    let model = OpenCVModel5::from_calibration(&calibration([0.0; 5]), 80, 60);
    let pts = [na::Vector3::new(0.0, 0.0, 1.0), na::Vector3::new(5.0, 0.0, 1.0)];
    let projected = model.project(&pts);
    assert!(projected[0].is_some());
    assert!(projected[1].is_none());
}

#[test]
fn test_remap_shift() {
    let src = DynamicImage::ImageLuma8(pattern());
    let xmap = na::DMatrix::from_fn(60, 80, |_, c| c as f32 + 1.0);
    let ymap = na::DMatrix::from_fn(60, 80, |r, _| r as f32);
    let out = remap(&src, &xmap, &ymap).to_luma8();
    assert_eq!(out.get_pixel(10, 5), pattern().get_pixel(11, 5));
    assert_eq!(out.get_pixel(79, 5).0[0], 0);
}
