//! Rectification of the item area printed next to the area marker.
//!
//! The area sits to the left of and below the marker on the same panel.
//! Its corners are extrapolated from the marker edges, warped onto a fixed
//! canonical square and binarized with a global Otsu threshold.

use image::{GrayImage, Luma};
use nalgebra as na;

use crate::error::{PerceptionError, Result};
use crate::marker::MarkerCandidate;
use crate::optimization::{Homography, homography_from_4pt};
use crate::types::Quad;

/// Marker widths from the marker's left edge to the far side of the area.
pub const AREA_FAR_EDGE: f64 = 4.25;
/// Marker widths from the marker's left edge to the near side of the area.
pub const AREA_NEAR_EDGE: f64 = 0.25;
/// Marker heights the area extends above the marker top.
pub const AREA_ABOVE: f64 = 0.8;
/// Marker heights the area extends below the marker bottom.
pub const AREA_BELOW: f64 = 2.2;

/// Output of the rectifier: the canonical square and the image quad it came from.
#[derive(Debug, Clone)]
pub struct RectifiedRegion {
    pub image: GrayImage,
    pub source_quad: Quad,
}

/// Area corners in the frame, ordered like the canonical square corners.
pub fn region_quad(marker: &MarkerCandidate) -> Quad {
    let lt = marker.lt().coords;
    let rt = marker.rt().coords;
    let rb = marker.rb().coords;
    let lb = marker.lb().coords;
    let top = rt - lt;
    let bottom = rb - lb;
    let left = lb - lt;
    [
        na::Point2::from(lt - top * AREA_FAR_EDGE - left * AREA_ABOVE),
        na::Point2::from(lt - top * AREA_NEAR_EDGE - left * AREA_ABOVE),
        na::Point2::from(lb - bottom * AREA_NEAR_EDGE + left * AREA_BELOW),
        na::Point2::from(lb - bottom * AREA_FAR_EDGE + left * AREA_BELOW),
    ]
}

/// Center of the area, midpoint of its first diagonal.
pub fn region_center(quad: &Quad) -> na::Point2<f64> {
    na::center(&quad[0], &quad[2])
}

pub fn canonical_corners(size: u32) -> Quad {
    let s = size.saturating_sub(1) as f64;
    [
        na::Point2::new(0.0, 0.0),
        na::Point2::new(s, 0.0),
        na::Point2::new(s, s),
        na::Point2::new(0.0, s),
    ]
}

/// Warp and threshold capability used by the rectifier.
pub trait ImageOps {
    /// Samples `src` at `img_from_canonical(x, y)` for every pixel of a
    /// `size` x `size` output.
    fn warp_perspective(
        &self,
        src: &GrayImage,
        img_from_canonical: &Homography,
        size: u32,
    ) -> GrayImage;

    fn binarize(&self, img: &GrayImage) -> GrayImage;
}

/// Pure-Rust warp (bilinear, black border) and Otsu binarization.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeImageOps;

impl ImageOps for NativeImageOps {
    fn warp_perspective(
        &self,
        src: &GrayImage,
        img_from_canonical: &Homography,
        size: u32,
    ) -> GrayImage {
        GrayImage::from_par_fn(size, size, |x, y| {
            let p = img_from_canonical.apply(&na::Point2::new(x as f64, y as f64));
            Luma([sample_bilinear(src, p.x, p.y)])
        })
    }

    fn binarize(&self, img: &GrayImage) -> GrayImage {
        let t = otsu_threshold(img);
        log::trace!("otsu threshold {}", t);
        threshold_binary(img, t)
    }
}

#[inline]
fn get_gray(src: &GrayImage, x: i64, y: i64) -> f64 {
    if x < 0 || y < 0 || x >= src.width() as i64 || y >= src.height() as i64 {
        return 0.0;
    }
    src.get_pixel(x as u32, y as u32).0[0] as f64
}

pub(crate) fn sample_bilinear(src: &GrayImage, x: f64, y: f64) -> u8 {
    if !x.is_finite() || !y.is_finite() {
        return 0;
    }
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let p00 = get_gray(src, x0, y0);
    let p10 = get_gray(src, x0 + 1, y0);
    let p01 = get_gray(src, x0, y0 + 1);
    let p11 = get_gray(src, x0 + 1, y0 + 1);

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    (a + fy * (b - a)).round().clamp(0.0, 255.0) as u8
}

/// Global Otsu threshold maximizing between-class variance over the histogram.
pub fn otsu_threshold(img: &GrayImage) -> u8 {
    let mut hist = [0u64; 256];
    for p in img.pixels() {
        hist[p.0[0] as usize] += 1;
    }
    otsu_from_histogram(&hist)
}

/// Otsu threshold of a 256-bin histogram; values `<= t` form the dark class.
pub fn otsu_from_histogram(hist: &[u64; 256]) -> u8 {
    let total = hist.iter().sum::<u64>() as f64;
    if total == 0.0 {
        return 0;
    }

    let mu: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| i as f64 * h as f64)
        .sum::<f64>()
        / total;
    let eps = f64::EPSILON;
    let mut q1 = 0.0;
    let mut mu1 = 0.0;
    let mut max_sigma = 0.0;
    let mut max_val = 0u8;
    for (i, &h) in hist.iter().enumerate() {
        let p_i = h as f64 / total;
        mu1 *= q1;
        q1 += p_i;
        let q2 = 1.0 - q1;
        if q1.min(q2) < eps || q1.max(q2) > 1.0 - eps {
            continue;
        }
        mu1 = (mu1 + i as f64 * p_i) / q1;
        let mu2 = (mu - q1 * mu1) / q2;
        let sigma = q1 * q2 * (mu1 - mu2) * (mu1 - mu2);
        if sigma > max_sigma {
            max_sigma = sigma;
            max_val = i as u8;
        }
    }
    max_val
}

/// Pixels strictly above `t` become 255, the rest 0.
pub fn threshold_binary(img: &GrayImage, t: u8) -> GrayImage {
    GrayImage::from_par_fn(img.width(), img.height(), |x, y| {
        Luma([if img.get_pixel(x, y).0[0] > t { 255 } else { 0 }])
    })
}

/// Extrapolates the area quad from `marker`, warps it onto a `size` x `size`
/// square and binarizes the result.
pub fn rectify_region<O: ImageOps + ?Sized>(
    ops: &O,
    frame: &GrayImage,
    marker: &MarkerCandidate,
    size: u32,
) -> Result<RectifiedRegion> {
    let source_quad = region_quad(marker);
    let img_from_canonical = homography_from_4pt(&canonical_corners(size), &source_quad)
        .ok_or(PerceptionError::DegenerateRegion)?;
    let warped = ops.warp_perspective(frame, &img_from_canonical, size);
    let image = ops.binarize(&warped);
    Ok(RectifiedRegion { image, source_quad })
}
