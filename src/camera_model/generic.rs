use image::DynamicImage;
use nalgebra as na;
use rayon::prelude::*;

/// Nearest-neighbour lookup of `src` through per-pixel source coordinates.
///
/// Pixels whose map entry is NaN or falls outside `src` are black.
pub fn remap(
    src: &DynamicImage,
    map0: &na::DMatrix<f32>,
    map1: &na::DMatrix<f32>,
) -> DynamicImage {
    let (r, c) = map0.shape();
    let lookup = |x: u32, y: u32, w: u32, h: u32| -> Option<(u32, u32)> {
        let (x_cor, y_cor) = (map0[(y as usize, x as usize)], map1[(y as usize, x as usize)]);
        if x_cor.is_nan() || y_cor.is_nan() {
            return None;
        }
        let x_cor = x_cor.round();
        let y_cor = y_cor.round();
        if x_cor < 0.0 || y_cor < 0.0 || x_cor >= w as f32 || y_cor >= h as f32 {
            None
        } else {
            Some((x_cor as u32, y_cor as u32))
        }
    };
    match src {
        DynamicImage::ImageLuma8(img) => {
            let out_img = image::GrayImage::from_par_fn(c as u32, r as u32, |x, y| {
                match lookup(x, y, img.width(), img.height()) {
                    Some((sx, sy)) => *img.get_pixel(sx, sy),
                    None => image::Luma([0]),
                }
            });
            DynamicImage::ImageLuma8(out_img)
        }
        DynamicImage::ImageRgb8(img) => {
            let out_img = image::RgbImage::from_par_fn(c as u32, r as u32, |x, y| {
                match lookup(x, y, img.width(), img.height()) {
                    Some((sx, sy)) => *img.get_pixel(sx, sy),
                    None => image::Rgb([0, 0, 0]),
                }
            });
            DynamicImage::ImageRgb8(out_img)
        }
        other => {
            log::debug!("remap converting {:?} to luma8", other.color());
            remap(&DynamicImage::ImageLuma8(other.to_luma8()), map0, map1)
        }
    }
}

pub trait CameraModel<T: na::RealField + Clone>
where
    Self: Sync,
{
    fn params(&self) -> na::DVector<T>;
    fn width(&self) -> T;
    fn height(&self) -> T;
    fn project_one(&self, pt: &na::Vector3<T>) -> na::Vector2<T>;
    fn project(&self, p3d: &[na::Vector3<T>]) -> Vec<Option<na::Vector2<T>>> {
        p3d.par_iter()
            .map(|pt| {
                let p2d = self.project_one(pt);
                if p2d[0] < T::zero()
                    || p2d[0] > self.width()
                    || p2d[1] < T::zero()
                    || p2d[1] > self.height()
                {
                    None
                } else {
                    Some(p2d)
                }
            })
            .collect()
    }
}

/// Builds the source lookup maps that undistort an image into the pinhole
/// camera described by `projection_mat`, sized `new_h_w` (rows, cols).
pub fn init_undistort_map(
    camera_model: &dyn CameraModel<f64>,
    projection_mat: &na::Matrix3<f64>,
    new_h_w: (u32, u32),
) -> (na::DMatrix<f32>, na::DMatrix<f32>) {
    let fx = projection_mat[(0, 0)];
    let fy = projection_mat[(1, 1)];
    let cx = projection_mat[(0, 2)];
    let cy = projection_mat[(1, 2)];
    let p3ds: Vec<na::Vector3<f64>> = (0..new_h_w.0)
        .into_par_iter()
        .flat_map(|y| {
            (0..new_h_w.1)
                .into_par_iter()
                .map(|x| na::Vector3::new((x as f64 - cx) / fx, (y as f64 - cy) / fy, 1.0))
                .collect::<Vec<na::Vector3<f64>>>()
        })
        .collect();
    let p2ds = camera_model.project(&p3ds);
    let (xvec, yvec): (Vec<f32>, Vec<f32>) = p2ds
        .par_iter()
        .map(|xy| {
            if let Some(xy) = xy {
                (xy[0] as f32, xy[1] as f32)
            } else {
                (f32::NAN, f32::NAN)
            }
        })
        .unzip();
    let xmap = na::DMatrix::from_row_slice(new_h_w.0 as usize, new_h_w.1 as usize, &xvec);
    let ymap = na::DMatrix::from_row_slice(new_h_w.0 as usize, new_h_w.1 as usize, &yvec);
    (xmap, ymap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_map_copies_pixels() {
        let img = image::GrayImage::from_fn(4, 3, |x, y| image::Luma([(x + 10 * y) as u8]));
        let xmap = na::DMatrix::from_fn(3, 4, |_, c| c as f32);
        let ymap = na::DMatrix::from_fn(3, 4, |r, _| r as f32);
        let out = remap(&DynamicImage::ImageLuma8(img.clone()), &xmap, &ymap).to_luma8();
        assert_eq!(out, img);
    }

    #[test]
    fn nan_and_out_of_range_are_black() {
        let img = image::GrayImage::from_pixel(2, 2, image::Luma([200]));
        let xmap = na::DMatrix::from_row_slice(1, 2, &[f32::NAN, 5.0]);
        let ymap = na::DMatrix::from_row_slice(1, 2, &[0.0, 0.0]);
        let out = remap(&DynamicImage::ImageLuma8(img), &xmap, &ymap).to_luma8();
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
        assert_eq!(out.get_pixel(1, 0).0[0], 0);
    }
}
