use nalgebra as na;

/// Planar projective transform, `dst ~ h * src`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    pub h: na::Matrix3<f64>,
}

impl Homography {
    pub fn new(h: na::Matrix3<f64>) -> Homography {
        Homography { h }
    }

    #[inline]
    pub fn apply(&self, p: &na::Point2<f64>) -> na::Point2<f64> {
        let v = self.h * na::Vector3::new(p.x, p.y, 1.0);
        na::Point2::new(v[0] / v[2], v[1] / v[2])
    }

    pub fn inverse(&self) -> Option<Homography> {
        let inv = self.h.try_inverse()?;
        normalize_homography(inv).map(Homography::new)
    }
}

fn normalize_points4(pts: &[na::Point2<f64>; 4]) -> ([na::Point2<f64>; 4], na::Matrix3<f64>) {
    // translate to centroid, scale mean distance to sqrt(2)
    let centroid = pts.iter().fold(na::Vector2::zeros(), |acc, p| acc + p.coords) / 4.0;
    let mean_dist = pts
        .iter()
        .map(|p| (p.coords - centroid).norm())
        .sum::<f64>()
        / 4.0;
    let s = if mean_dist > 1e-12 {
        2.0_f64.sqrt() / mean_dist
    } else {
        1.0
    };
    let t = na::Matrix3::new(
        s, 0.0, -s * centroid.x, //
        0.0, s, -s * centroid.y, //
        0.0, 0.0, 1.0,
    );
    let out = pts.map(|p| {
        let v = t * na::Vector3::new(p.x, p.y, 1.0);
        na::Point2::new(v[0], v[1])
    });
    (out, t)
}

/// True when any three of the (normalized) points are nearly collinear.
fn has_collinear_triple(pts: &[na::Point2<f64>; 4]) -> bool {
    const TRIPLES: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
    TRIPLES.iter().any(|&[a, b, c]| {
        let ab = pts[b] - pts[a];
        let ac = pts[c] - pts[a];
        let cross = ab.x * ac.y - ab.y * ac.x;
        cross.is_nan() || cross.abs() < 1e-9
    })
}

fn normalize_homography(h: na::Matrix3<f64>) -> Option<na::Matrix3<f64>> {
    let s = h[(2, 2)];
    if s.abs() < 1e-12 || !s.is_finite() {
        return None;
    }
    Some(h / s)
}

/// Solves `dst ~ H * src` from four correspondences with `h33 = 1`.
///
/// Returns `None` when three or more points are collinear.
pub fn homography_from_4pt(
    src: &[na::Point2<f64>; 4],
    dst: &[na::Point2<f64>; 4],
) -> Option<Homography> {
    let (src_n, t_src) = normalize_points4(src);
    let (dst_n, t_dst) = normalize_points4(dst);
    if has_collinear_triple(&src_n) || has_collinear_triple(&dst_n) {
        return None;
    }

    let mut a = na::SMatrix::<f64, 8, 8>::zeros();
    let mut b = na::SVector::<f64, 8>::zeros();
    for k in 0..4 {
        let (x, y) = (src_n[k].x, src_n[k].y);
        let (u, v) = (dst_n[k].x, dst_n[k].y);

        let r0 = 2 * k;
        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = 1.0;
        a[(r0, 6)] = -u * x;
        a[(r0, 7)] = -u * y;
        b[r0] = u;

        let r1 = 2 * k + 1;
        a[(r1, 3)] = x;
        a[(r1, 4)] = y;
        a[(r1, 5)] = 1.0;
        a[(r1, 6)] = -v * x;
        a[(r1, 7)] = -v * y;
        b[r1] = v;
    }

    let x = a.lu().solve(&b)?;
    if x.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let hn = na::Matrix3::new(
        x[0], x[1], x[2], //
        x[3], x[4], x[5], //
        x[6], x[7], 1.0,
    );
    let h = t_dst.try_inverse()? * hn * t_src;
    let h = normalize_homography(h)?;
    if h.determinant().abs() < 1e-12 {
        return None;
    }
    Some(Homography::new(h))
}
