//! Dark convex quadrilaterals in a gray frame, the outlines marker decoding
//! starts from.
//!
//! Adaptive mean threshold, union-find connected components, then a four
//! corner fit on the convex hull of each component.

use std::collections::HashMap;

use image::{GrayImage, Luma};
use nalgebra as na;

use crate::types::Quad;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadParams {
    /// The local mean window is `min(width, height) / window_divisor` pixels, at least 7.
    pub window_divisor: u32,
    /// A pixel is dark when it lies more than this below its local mean.
    pub threshold_offset: i32,
    /// Shortest accepted quad side in pixels.
    pub min_side: f64,
    /// Smallest ratio of fitted quad area to hull area.
    pub min_fill: f64,
}

impl Default for QuadParams {
    fn default() -> Self {
        Self {
            window_divisor: 12,
            threshold_offset: 7,
            min_side: 16.0,
            min_fill: 0.9,
        }
    }
}

/// 255 where a pixel is darker than the mean of its `window` x `window`
/// neighbourhood by more than `offset`, 0 elsewhere.
pub fn adaptive_threshold(img: &GrayImage, window: u32, offset: i32) -> GrayImage {
    let (w, h) = img.dimensions();
    let stride = w as usize + 1;
    let mut integral = vec![0u64; stride * (h as usize + 1)];
    for y in 0..h as usize {
        let mut row = 0u64;
        for x in 0..w as usize {
            row += img.get_pixel(x as u32, y as u32).0[0] as u64;
            integral[(y + 1) * stride + x + 1] = integral[y * stride + x + 1] + row;
        }
    }

    let r = window / 2;
    GrayImage::from_par_fn(w, h, |x, y| {
        let (x0, y0) = (x.saturating_sub(r) as usize, y.saturating_sub(r) as usize);
        let (x1, y1) = ((x + r + 1).min(w) as usize, (y + r + 1).min(h) as usize);
        let sum = integral[y1 * stride + x1] + integral[y0 * stride + x0]
            - integral[y0 * stride + x1]
            - integral[y1 * stride + x0];
        let mean = (sum / ((x1 - x0) * (y1 - y0)) as u64) as i32;
        let v = img.get_pixel(x, y).0[0] as i32;
        Luma([if v < mean - offset { 255 } else { 0 }])
    })
}

/// Disjoint sets with union by size and path halving.
struct UnionFind {
    parent: Vec<u32>,
    size: Vec<u32>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n as u32).collect(),
            size: vec![1; n],
        }
    }

    fn find(&mut self, mut id: u32) -> u32 {
        while self.parent[id as usize] != id {
            let grandparent = self.parent[self.parent[id as usize] as usize];
            self.parent[id as usize] = grandparent;
            id = grandparent;
        }
        id
    }

    fn union(&mut self, a: u32, b: u32) {
        let (mut ra, mut rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        if self.size[ra as usize] < self.size[rb as usize] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb as usize] = ra;
        self.size[ra as usize] += self.size[rb as usize];
    }
}

/// 4-connected component stored as one `(min x, max x)` span per row.
#[derive(Debug, Clone)]
struct Blob {
    min_y: u32,
    rows: Vec<(u32, u32)>,
}

impl Blob {
    fn x_range(&self) -> (u32, u32) {
        self.rows
            .iter()
            .fold((u32::MAX, 0), |(lo, hi), r| (lo.min(r.0), hi.max(r.1)))
    }

    fn max_y(&self) -> u32 {
        self.min_y + self.rows.len() as u32 - 1
    }

    /// Pixel-boundary corners of every row span; pixel centers sit on integers.
    fn outline(&self) -> Vec<na::Point2<f64>> {
        let mut pts = Vec::with_capacity(self.rows.len() * 4);
        for (i, &(lo, hi)) in self.rows.iter().enumerate() {
            let y = (self.min_y as usize + i) as f64;
            let (l, r) = (lo as f64 - 0.5, hi as f64 + 0.5);
            pts.push(na::Point2::new(l, y - 0.5));
            pts.push(na::Point2::new(l, y + 0.5));
            pts.push(na::Point2::new(r, y - 0.5));
            pts.push(na::Point2::new(r, y + 0.5));
        }
        pts
    }
}

fn dark_blobs(mask: &GrayImage) -> Vec<Blob> {
    let (w, h) = mask.dimensions();
    let dark = |x: u32, y: u32| mask.get_pixel(x, y).0[0] != 0;

    let mut uf = UnionFind::new(w as usize * h as usize);
    for y in 0..h {
        for x in 0..w {
            if !dark(x, y) {
                continue;
            }
            let id = y * w + x;
            if x > 0 && dark(x - 1, y) {
                uf.union(id, id - 1);
            }
            if y > 0 && dark(x, y - 1) {
                uf.union(id, id - w);
            }
        }
    }

    let mut blobs: HashMap<u32, Blob> = HashMap::new();
    for y in 0..h {
        for x in 0..w {
            if !dark(x, y) {
                continue;
            }
            let root = uf.find(y * w + x);
            let blob = blobs.entry(root).or_insert_with(|| Blob {
                min_y: y,
                rows: Vec::new(),
            });
            // 4-connected blobs cover every row between their first and last
            let row = (y - blob.min_y) as usize;
            if row == blob.rows.len() {
                blob.rows.push((x, x));
            } else {
                let span = &mut blob.rows[row];
                span.0 = span.0.min(x);
                span.1 = span.1.max(x);
            }
        }
    }

    let mut blobs: Vec<Blob> = blobs.into_values().collect();
    blobs.sort_by_key(|b| (b.min_y, b.rows[0].0));
    blobs
}

fn cross(o: &na::Point2<f64>, a: &na::Point2<f64>, b: &na::Point2<f64>) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Twice the signed shoelace area; positive for clockwise order on screen.
fn signed_area2(poly: &[na::Point2<f64>]) -> f64 {
    (0..poly.len())
        .map(|i| {
            let (a, b) = (&poly[i], &poly[(i + 1) % poly.len()]);
            a.x * b.y - b.x * a.y
        })
        .sum()
}

/// Monotone chain hull without collinear vertices.
pub fn convex_hull(mut pts: Vec<na::Point2<f64>>) -> Vec<na::Point2<f64>> {
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }
    let mut lower: Vec<na::Point2<f64>> = Vec::new();
    for p in &pts {
        while lower.len() >= 2 && cross(&lower[lower.len() - 2], &lower[lower.len() - 1], p) <= 0.0
        {
            lower.pop();
        }
        lower.push(*p);
    }
    let mut upper: Vec<na::Point2<f64>> = Vec::new();
    for p in pts.iter().rev() {
        while upper.len() >= 2 && cross(&upper[upper.len() - 2], &upper[upper.len() - 1], p) <= 0.0
        {
            upper.pop();
        }
        upper.push(*p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Four hull vertices spanning the largest quad, clockwise on screen.
///
/// Picks the vertex farthest from the hull centroid, the vertex farthest from
/// that one, then the extreme vertex on either side of their diagonal.
pub fn fit_quad(hull: &[na::Point2<f64>], params: &QuadParams) -> Option<Quad> {
    if hull.len() < 4 {
        return None;
    }
    let centroid = na::Point2::from(
        hull.iter().map(|p| p.coords).sum::<na::Vector2<f64>>() / hull.len() as f64,
    );
    let farthest_from = |o: &na::Point2<f64>| {
        hull.iter()
            .max_by(|a, b| na::distance(o, *a).total_cmp(&na::distance(o, *b)))
            .copied()
    };
    let a = farthest_from(&centroid)?;
    let b = farthest_from(&a)?;
    let side = |p: &na::Point2<f64>| cross(&a, &b, p);
    let c = *hull.iter().max_by(|p, q| side(*p).total_cmp(&side(*q)))?;
    let d = *hull.iter().min_by(|p, q| side(*p).total_cmp(&side(*q)))?;
    if side(&c) <= 0.0 || side(&d) >= 0.0 {
        return None;
    }

    let mut quad = [a, c, b, d];
    if signed_area2(&quad) < 0.0 {
        quad = [a, d, b, c];
    }
    for i in 0..4 {
        let (p, q, r) = (&quad[i], &quad[(i + 1) % 4], &quad[(i + 2) % 4]);
        if na::distance(p, q) < params.min_side || cross(p, q, r) <= 0.0 {
            return None;
        }
    }
    let hull_area = signed_area2(hull).abs();
    if hull_area <= 0.0 || signed_area2(&quad) / hull_area < params.min_fill {
        return None;
    }
    Some(quad)
}

/// Quads around dark blobs that stay clear of the frame border.
pub fn find_quads(img: &GrayImage, params: &QuadParams) -> Vec<Quad> {
    let (w, h) = img.dimensions();
    if w < 3 || h < 3 {
        return Vec::new();
    }
    let window = (w.min(h) / params.window_divisor.max(1)).max(7) | 1;
    let mask = adaptive_threshold(img, window, params.threshold_offset);
    let blobs = dark_blobs(&mask);

    let quads: Vec<Quad> = blobs
        .iter()
        .filter(|blob| {
            let (x_lo, x_hi) = blob.x_range();
            let (y_lo, y_hi) = (blob.min_y, blob.max_y());
            let clear = x_lo > 0 && y_lo > 0 && x_hi + 1 < w && y_hi + 1 < h;
            let big = (x_hi - x_lo + 1) as f64 >= params.min_side
                && (y_hi - y_lo + 1) as f64 >= params.min_side;
            clear && big
        })
        .filter_map(|blob| fit_quad(&convex_hull(blob.outline()), params))
        .collect();
    log::debug!("{} dark blobs, {} quads", blobs.len(), quads.len());
    quads
}
