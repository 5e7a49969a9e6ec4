use image::{GrayImage, Rgb, RgbImage};
use nalgebra as na;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::detection::Detection;
use crate::marker::MarkerCandidate;

/// Stable pseudo-random colour per id.
pub fn id_to_color(id: usize) -> (u8, u8, u8, u8) {
    let mut rng = ChaCha8Rng::seed_from_u64(id as u64);
    let color_num = rng.random_range(0..2u32.pow(24));
    (
        ((color_num >> 16) % 256) as u8,
        ((color_num >> 8) % 256) as u8,
        (color_num % 256) as u8,
        255,
    )
}

fn rgb(id: usize) -> Rgb<u8> {
    let (r, g, b, _) = id_to_color(id);
    Rgb([r, g, b])
}

const LEFT: u8 = 1;
const RIGHT: u8 = 2;
const ABOVE: u8 = 4;
const BELOW: u8 = 8;

fn outcode(p: &na::Point2<f64>, xmax: f64, ymax: f64) -> u8 {
    let mut code = 0;
    if p.x < 0.0 {
        code |= LEFT;
    } else if p.x > xmax {
        code |= RIGHT;
    }
    if p.y < 0.0 {
        code |= ABOVE;
    } else if p.y > ymax {
        code |= BELOW;
    }
    code
}

/// Cohen-Sutherland clip of segment `a`-`b` to the pixel rectangle
/// `[0, w-1] x [0, h-1]`. Non-finite input is rejected.
fn clip_segment(
    a: &na::Point2<f64>,
    b: &na::Point2<f64>,
    width: u32,
    height: u32,
) -> Option<(na::Point2<f64>, na::Point2<f64>)> {
    let finite = |p: &na::Point2<f64>| p.x.is_finite() && p.y.is_finite();
    if width == 0 || height == 0 || !finite(a) || !finite(b) {
        return None;
    }
    let (xmax, ymax) = ((width - 1) as f64, (height - 1) as f64);
    let (mut a, mut b) = (*a, *b);
    let (mut ca, mut cb) = (outcode(&a, xmax, ymax), outcode(&b, xmax, ymax));
    // every pass pins one coordinate to a boundary
    for _ in 0..8 {
        if ca | cb == 0 {
            return Some((a, b));
        }
        if ca & cb != 0 {
            return None;
        }
        let (out, other, code) = if ca != 0 { (a, b, ca) } else { (b, a, cb) };
        let d = other - out;
        let clipped = if code & ABOVE != 0 {
            na::Point2::new(out.x + d.x * (0.0 - out.y) / d.y, 0.0)
        } else if code & BELOW != 0 {
            na::Point2::new(out.x + d.x * (ymax - out.y) / d.y, ymax)
        } else if code & LEFT != 0 {
            na::Point2::new(0.0, out.y + d.y * (0.0 - out.x) / d.x)
        } else {
            na::Point2::new(xmax, out.y + d.y * (xmax - out.x) / d.x)
        };
        if !finite(&clipped) {
            return None;
        }
        if ca != 0 {
            a = clipped;
            ca = outcode(&a, xmax, ymax);
        } else {
            b = clipped;
            cb = outcode(&b, xmax, ymax);
        }
    }
    None
}

/// Bresenham line from `p0` to `p1`, clipped to the image before stepping.
pub fn draw_line(img: &mut RgbImage, p0: &na::Point2<f64>, p1: &na::Point2<f64>, color: Rgb<u8>) {
    let Some((a, b)) = clip_segment(p0, p1, img.width(), img.height()) else {
        return;
    };
    let (mut x0, mut y0) = (a.x.round() as i64, a.y.round() as i64);
    let (x1, y1) = (b.x.round() as i64, b.y.round() as i64);
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        if x0 >= 0 && y0 >= 0 && x0 < img.width() as i64 && y0 < img.height() as i64 {
            img.put_pixel(x0 as u32, y0 as u32, color);
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

pub fn draw_quad(img: &mut RgbImage, quad: &[na::Point2<f64>; 4], color: Rgb<u8>) {
    for i in 0..4 {
        draw_line(img, &quad[i], &quad[(i + 1) % 4], color);
    }
}

/// Frame with every decoded marker outlined in its id colour.
pub fn marker_overlay(frame: &GrayImage, markers: &[MarkerCandidate]) -> RgbImage {
    let mut img = image::DynamicImage::ImageLuma8(frame.clone()).to_rgb8();
    for m in markers {
        draw_quad(&mut img, &m.corners, rgb(m.id as usize));
    }
    img
}

/// Canonical square with detection boxes drawn in their class colour.
pub fn detection_overlay(image: &GrayImage, detections: &[Detection]) -> RgbImage {
    let mut img = image::DynamicImage::ImageLuma8(image.clone()).to_rgb8();
    for d in detections {
        let b = &d.bbox;
        let quad = [
            na::Point2::new(b.x1 as f64, b.y1 as f64),
            na::Point2::new(b.x2 as f64, b.y1 as f64),
            na::Point2::new(b.x2 as f64, b.y2 as f64),
            na::Point2::new(b.x1 as f64, b.y2 as f64),
        ];
        draw_quad(&mut img, &quad, rgb(d.class_id));
    }
    img
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: f64, y: f64) -> na::Point2<f64> {
        na::Point2::new(x, y)
    }

    #[test]
    fn colors_are_stable_per_id() {
        assert_eq!(id_to_color(7), id_to_color(7));
        assert_eq!(id_to_color(7).3, 255);
    }

    #[test]
    fn line_outside_image_is_clipped() {
        let red = Rgb([255, 0, 0]);
        let mut img = RgbImage::new(4, 4);
        draw_line(&mut img, &pt(-10.0, 1.0), &pt(10.0, 1.0), red);
        assert_eq!(img.get_pixel(0, 1).0, [255, 0, 0]);
        assert_eq!(img.get_pixel(3, 1).0, [255, 0, 0]);
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0]);

        let mut img = RgbImage::new(4, 4);
        draw_line(&mut img, &pt(-5.0, -1.0), &pt(9.0, -1.0), red);
        assert!(img.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn huge_and_non_finite_segments_stay_bounded() {
        let green = Rgb([0, 255, 0]);
        let mut img = RgbImage::new(8, 8);
        draw_line(&mut img, &pt(-1e30, 3.0), &pt(1e30, 3.0), green);
        assert!((0..8).all(|x| img.get_pixel(x, 3).0 == [0, 255, 0]));

        draw_line(&mut img, &pt(f64::MIN, f64::MIN), &pt(f64::MAX, f64::MAX), green);
        draw_line(&mut img, &pt(f64::NAN, 0.0), &pt(4.0, 4.0), green);
        draw_line(&mut img, &pt(0.0, 0.0), &pt(f64::INFINITY, 4.0), green);
        assert_eq!(img.get_pixel(0, 7).0, [0, 0, 0]);
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0]);
    }
}
