use area_recognition::detection::{BoundingBox, Detection};
use area_recognition::marker::MarkerCandidate;
use area_recognition::visualization::{detection_overlay, marker_overlay};
use image::{GrayImage, Luma};
use nalgebra as na;

const GRAY: [u8; 3] = [128, 128, 128];

#[test]
fn test_detection_overlay_with_boxes_far_outside() {
    let img = GrayImage::from_pixel(64, 64, Luma([128]));
    let dets = vec![
        Detection::new(4, 0.9, BoundingBox::from_center(32.0, 32.0, 1e30, 1e30)),
        Detection::new(1, 0.8, BoundingBox::new(-1e9, -1e9, 1e9, 1e9)),
        Detection::new(2, 0.7, BoundingBox::new(f32::NEG_INFINITY, 0.0, f32::INFINITY, 9.0)),
        Detection::new(3, 0.6, BoundingBox::new(f32::NAN, 5.0, 20.0, 30.0)),
        Detection::new(0, 0.5, BoundingBox::new(10.0, 40.0, 20.0, 50.0)),
    ];
    let out = detection_overlay(&img, &dets);
    assert_eq!(out.dimensions(), (64, 64));
    assert_eq!(out.get_pixel(32, 32).0, GRAY);
    assert_ne!(out.get_pixel(10, 45).0, GRAY);
    assert_ne!(out.get_pixel(20, 20).0, GRAY);
}

#[test]
fn test_detection_overlay_box_crossing_the_edge() {
    let img = GrayImage::from_pixel(32, 32, Luma([128]));
    let dets = vec![Detection::new(5, 0.9, BoundingBox::new(-100.0, 8.0, 16.0, 1e12))];
    let out = detection_overlay(&img, &dets);
    // top edge clipped at the left border, right edge runs off the bottom
    assert_ne!(out.get_pixel(0, 8).0, GRAY);
    assert_ne!(out.get_pixel(16, 31).0, GRAY);
    assert_eq!(out.get_pixel(17, 20).0, GRAY);
}

#[test]
fn test_marker_overlay_with_markers_off_frame() {
    let img = GrayImage::from_pixel(40, 30, Luma([128]));
    let far = MarkerCandidate::new(
        1,
        [
            na::Point2::new(-1e300, -1e300),
            na::Point2::new(1e300, -1e300),
            na::Point2::new(1e300, 1e300),
            na::Point2::new(f64::NAN, 1e300),
        ],
    );
    let near = MarkerCandidate::new(
        2,
        [
            na::Point2::new(5.0, 5.0),
            na::Point2::new(15.0, 5.0),
            na::Point2::new(15.0, 15.0),
            na::Point2::new(5.0, 15.0),
        ],
    );
    let out = marker_overlay(&img, &[far, near]);
    assert_ne!(out.get_pixel(10, 5).0, GRAY);
    assert_eq!(out.get_pixel(10, 10).0, GRAY);
}
