use calib_targets_aruco::{Matcher, builtins};
use image::GrayImage;
use nalgebra as na;

use super::quad::{QuadParams, find_quads};
use super::{MarkerCandidate, MarkerDetector};
use crate::config::MarkerDictionary;
use crate::error::{PerceptionError, Result};
use crate::optimization::homography_from_4pt;
use crate::region::{otsu_from_histogram, sample_bilinear};
use crate::types::Quad;

/// Black cells around the payload on each side.
const BORDER_BITS: usize = 1;
/// Smallest spread between the darkest and lightest cell mean.
const MIN_CONTRAST: f64 = 30.0;
/// Sample offsets inside a cell, away from its edges.
const CELL_SAMPLES: [f64; 3] = [0.3, 0.5, 0.7];

/// Standalone square fiducials from one of OpenCV's ArUco dictionaries.
pub struct ArucoMarkerDetector {
    matcher: Matcher,
    marker_bits: usize,
    quad_params: QuadParams,
    min_border_score: f64,
}

impl ArucoMarkerDetector {
    pub fn new(dictionary: &MarkerDictionary) -> Result<ArucoMarkerDetector> {
        let name = dictionary.name();
        let dict = builtins::builtin_dictionary(&name)
            .ok_or_else(|| PerceptionError::Config(format!("unknown marker dictionary {}", name)))?;
        if dict.marker_size != dictionary.marker_bits as usize
            || dict.codes.len() != dictionary.size as usize
        {
            return Err(PerceptionError::Config(format!(
                "dictionary {} holds {} markers of {} bits",
                name,
                dict.codes.len(),
                dict.marker_size
            )));
        }
        log::debug!(
            "marker dictionary {}, up to {} corrected bits",
            name,
            dict.max_correction_bits
        );
        Ok(ArucoMarkerDetector {
            matcher: Matcher::new(dict, dict.max_correction_bits),
            marker_bits: dict.marker_size,
            quad_params: QuadParams::default(),
            min_border_score: 0.85,
        })
    }

    pub fn with_quad_params(mut self, params: QuadParams) -> Self {
        self.quad_params = params;
        self
    }

    /// Reads the cell grid inside `quad` and matches it against the dictionary.
    ///
    /// `quad` must run clockwise on screen. The returned corners start at the
    /// marker's own top-left, whichever way it is turned in the frame.
    pub fn decode(&self, frame: &GrayImage, quad: &Quad) -> Option<MarkerCandidate> {
        let cells = self.marker_bits + 2 * BORDER_BITS;
        let n = cells as f64;
        let grid = [
            na::Point2::new(0.0, 0.0),
            na::Point2::new(n, 0.0),
            na::Point2::new(n, n),
            na::Point2::new(0.0, n),
        ];
        let img_from_grid = homography_from_4pt(&grid, quad)?;

        let means: Vec<f64> = (0..cells * cells)
            .map(|i| {
                let (cx, cy) = ((i % cells) as f64, (i / cells) as f64);
                let mut sum = 0.0;
                for oy in CELL_SAMPLES {
                    for ox in CELL_SAMPLES {
                        let p = img_from_grid.apply(&na::Point2::new(cx + ox, cy + oy));
                        sum += sample_bilinear(frame, p.x, p.y) as f64;
                    }
                }
                (sum / 9.0).round()
            })
            .collect();
        let lo = means.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = means.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if hi - lo < MIN_CONTRAST {
            return None;
        }
        let mut hist = [0u64; 256];
        for m in &means {
            hist[m.clamp(0.0, 255.0) as usize] += 1;
        }
        let t = otsu_from_histogram(&hist) as f64;

        let mut border_black = 0;
        let mut border_total = 0;
        let mut code = 0u64;
        for cy in 0..cells {
            for cx in 0..cells {
                let black = means[cy * cells + cx] <= t;
                let border = cx < BORDER_BITS
                    || cy < BORDER_BITS
                    || cx >= cells - BORDER_BITS
                    || cy >= cells - BORDER_BITS;
                if border {
                    border_total += 1;
                    if black {
                        border_black += 1;
                    }
                } else if black {
                    // row-major payload, black = 1
                    let bit = (cy - BORDER_BITS) * self.marker_bits + (cx - BORDER_BITS);
                    code |= 1 << bit;
                }
            }
        }
        if (border_black as f64) < self.min_border_score * border_total as f64 {
            return None;
        }

        let m = self.matcher.match_code(code)?;
        log::trace!("marker {} turned {} x 90deg, {} bits off", m.id, m.rotation, m.hamming);
        // the dictionary top-left shows up at grid corner `rotation`
        let r = m.rotation as usize;
        let corners: Quad = std::array::from_fn(|i| quad[(i + r) % 4]);
        Some(MarkerCandidate::new(m.id, corners))
    }
}

impl MarkerDetector for ArucoMarkerDetector {
    fn detect(&self, frame: &GrayImage) -> Vec<MarkerCandidate> {
        let quads = find_quads(frame, &self.quad_params);
        let mut candidates: Vec<MarkerCandidate> = quads
            .iter()
            .filter_map(|q| self.decode(frame, q))
            .collect();
        log::debug!("{} quads, {} markers decoded", quads.len(), candidates.len());
        candidates.sort_by_key(|c| c.id);
        candidates
    }
}
