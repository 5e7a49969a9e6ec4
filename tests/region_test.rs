use area_recognition::PerceptionError;
use area_recognition::marker::MarkerCandidate;
use area_recognition::region::{
    ImageOps, NativeImageOps, canonical_corners, rectify_region, region_center, region_quad,
};
use image::{GrayImage, Luma};
use nalgebra as na;

fn marker(id: u32, corners: [(f64, f64); 4]) -> MarkerCandidate {
    MarkerCandidate::new(id, corners.map(|(x, y)| na::Point2::new(x, y)))
}

fn assert_point(p: &na::Point2<f64>, x: f64, y: f64) {
    assert!(
        (p.x - x).abs() < 1e-9 && (p.y - y).abs() < 1e-9,
        "expected ({}, {}), got ({}, {})",
        x,
        y,
        p.x,
        p.y
    );
}

#[test]
fn test_region_quad_axis_aligned_marker() {
    let m = marker(
        1,
        [(100.0, 100.0), (120.0, 100.0), (120.0, 120.0), (100.0, 120.0)],
    );
    let q = region_quad(&m);
    assert_point(&q[0], 15.0, 84.0);
    assert_point(&q[1], 95.0, 84.0);
    assert_point(&q[2], 95.0, 164.0);
    assert_point(&q[3], 15.0, 164.0);
    assert_point(&region_center(&q), 55.0, 124.0);
}

#[test]
fn test_canonical_corners() {
    let c = canonical_corners(640);
    assert_point(&c[0], 0.0, 0.0);
    assert_point(&c[1], 639.0, 0.0);
    assert_point(&c[2], 639.0, 639.0);
    assert_point(&c[3], 0.0, 639.0);
}

#[test]
fn test_rectified_region_is_always_canonical_size() {
    let frame = GrayImage::from_fn(800, 600, |x, y| Luma([((x * 7 + y * 3) % 256) as u8]));
    let markers = [
        // small, axis aligned
        marker(
            0,
            [(500.0, 200.0), (520.0, 200.0), (520.0, 220.0), (500.0, 220.0)],
        ),
        // large, mostly off frame
        marker(
            1,
            [(600.0, 50.0), (780.0, 50.0), (780.0, 230.0), (600.0, 230.0)],
        ),
        // skewed and rotated
        marker(
            2,
            [(410.0, 180.0), (455.0, 170.0), (470.0, 215.0), (420.0, 230.0)],
        ),
    ];
    for m in &markers {
        let region = rectify_region(&NativeImageOps, &frame, m, 640).unwrap();
        assert_eq!(region.image.dimensions(), (640, 640), "marker {}", m.id);
        assert!(region.image.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
        assert_eq!(region.source_quad, region_quad(m));
    }
}

#[test]
fn test_uniform_area_binarizes_white() {
    let frame = GrayImage::from_pixel(300, 300, Luma([200]));
    let m = marker(
        3,
        [(100.0, 100.0), (120.0, 100.0), (120.0, 120.0), (100.0, 120.0)],
    );
    let region = rectify_region(&NativeImageOps, &frame, &m, 64).unwrap();
    assert!(region.image.pixels().all(|p| p.0[0] == 255));
}

#[test]
fn test_warp_follows_area_content() {
    // left half of the area dark, right half bright
    let frame = GrayImage::from_fn(300, 300, |x, _| if x < 55 { Luma([30]) } else { Luma([220]) });
    let m = marker(
        4,
        [(100.0, 100.0), (120.0, 100.0), (120.0, 120.0), (100.0, 120.0)],
    );
    let region = rectify_region(&NativeImageOps, &frame, &m, 640).unwrap();
    assert_eq!(region.image.get_pixel(100, 320).0[0], 0);
    assert_eq!(region.image.get_pixel(540, 320).0[0], 255);
}

#[test]
fn test_degenerate_marker_is_an_error() {
    let frame = GrayImage::new(100, 100);
    let m = marker(5, [(50.0, 50.0); 4]);
    assert!(matches!(
        rectify_region(&NativeImageOps, &frame, &m, 640),
        Err(PerceptionError::DegenerateRegion)
    ));
}

struct InvertOps;

impl ImageOps for InvertOps {
    fn warp_perspective(
        &self,
        src: &GrayImage,
        img_from_canonical: &area_recognition::optimization::Homography,
        size: u32,
    ) -> GrayImage {
        NativeImageOps.warp_perspective(src, img_from_canonical, size)
    }

    fn binarize(&self, img: &GrayImage) -> GrayImage {
        GrayImage::from_fn(img.width(), img.height(), |x, y| {
            Luma([255 - img.get_pixel(x, y).0[0]])
        })
    }
}

#[test]
fn test_image_ops_are_substitutable() {
    let frame = GrayImage::from_pixel(300, 300, Luma([200]));
    let m = marker(
        6,
        [(100.0, 100.0), (120.0, 100.0), (120.0, 120.0), (100.0, 120.0)],
    );
    let region = rectify_region(&InvertOps, &frame, &m, 32).unwrap();
    assert!(region.image.pixels().all(|p| p.0[0] == 55));
}
