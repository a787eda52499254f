//! Peak detection on the blended detection stamp.
//!
//! Local maxima above a robust background threshold, thinned to a minimum
//! mutual separation, are matched against the primary source's known
//! offset. Detection fails when no peak exists or the best candidate lies
//! farther than the distance cut; the orchestrator then regenerates the
//! whole sample.

use ndarray::Array2;

use crate::error::{BlendError, Result};
use crate::survey::Band;

/// Sigma multiplier above the background for peak candidates.
const PEAK_THRESHOLD_SIGMA: f64 = 3.0;

/// A raw detected peak in pixel coordinates.
#[derive(Clone, Copy, Debug)]
pub struct Peak {
    pub row: usize,
    pub col: usize,
    pub value: f64,
}

/// Outcome of matching detected peaks against the scene.
#[derive(Clone, Debug)]
pub struct PeakMatch {
    /// Source index closest to the chosen peak; this selects the stamp
    /// the dataset treats as "the galaxy".
    pub primary_idx: usize,
    /// Neighbor source index closest to the chosen peak (equals
    /// `primary_idx` in single-source scenes).
    pub closest_idx: usize,
    /// Chosen peak, pixel coordinates (col, row).
    pub peak_px: [f64; 2],
    /// Chosen peak, arcsec from the stamp center.
    pub peak_arcsec: [f64; 2],
    /// Total number of peaks that survived thinning.
    pub n_peaks: usize,
}

/// Find local maxima above `threshold`, at least `min_separation` pixels
/// apart. Brighter peaks win ties during thinning.
pub fn find_peaks(image: &Array2<f64>, threshold: f64, min_separation: usize) -> Vec<Peak> {
    let (h, w) = image.dim();
    let mut candidates = Vec::new();
    for row in 0..h {
        for col in 0..w {
            let v = image[[row, col]];
            if v <= threshold {
                continue;
            }
            let mut is_max = true;
            'neigh: for dr in -1i64..=1 {
                for dc in -1i64..=1 {
                    if dr == 0 && dc == 0 {
                        continue;
                    }
                    let (nr, nc) = (row as i64 + dr, col as i64 + dc);
                    if nr < 0 || nc < 0 || nr >= h as i64 || nc >= w as i64 {
                        continue;
                    }
                    if image[[nr as usize, nc as usize]] > v {
                        is_max = false;
                        break 'neigh;
                    }
                }
            }
            if is_max {
                candidates.push(Peak { row, col, value: v });
            }
        }
    }

    candidates.sort_by(|a, b| b.value.total_cmp(&a.value));
    let min_sep2 = (min_separation * min_separation) as f64;
    let mut kept: Vec<Peak> = Vec::new();
    for cand in candidates {
        let far_enough = kept.iter().all(|p| {
            let dr = p.row as f64 - cand.row as f64;
            let dc = p.col as f64 - cand.col as f64;
            dr * dr + dc * dc >= min_sep2
        });
        if far_enough {
            kept.push(cand);
        }
    }
    kept
}

/// Robust background threshold: median plus `PEAK_THRESHOLD_SIGMA` standard
/// deviations of the image.
fn detection_threshold(image: &Array2<f64>) -> f64 {
    let mut values: Vec<f64> = image.iter().cloned().collect();
    values.sort_by(f64::total_cmp);
    let median = values[values.len() / 2];
    let mean = image.mean().unwrap_or(0.0);
    let var = image.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64;
    median + PEAK_THRESHOLD_SIGMA * var.sqrt()
}

/// Detect peaks in the blended detection stamp and resolve which source
/// each peak belongs to.
///
/// `shifts` holds the true per-source offsets in arcsec, index-aligned
/// with the scene; row 0 is the primary. The chosen peak must lie within
/// `dist_cut` arcsec of the primary's offset.
pub fn detect(
    blend: &Array2<f64>,
    band: &Band,
    shifts: &[[f64; 2]],
    stamp_size: usize,
    min_separation: usize,
    dist_cut: f64,
) -> Result<PeakMatch> {
    let n_sources = shifts.len();
    if n_sources == 0 {
        return Err(BlendError::PeakDetectionFailed("empty scene".into()));
    }

    let threshold = detection_threshold(blend);
    let peaks = find_peaks(blend, threshold, min_separation);
    if peaks.is_empty() {
        return Err(BlendError::PeakDetectionFailed("no peak detected".into()));
    }

    // Peak closest to the primary source's true offset.
    let primary_shift = shifts[0];
    let (best_peak, best_dist) = peaks
        .iter()
        .map(|p| {
            let [x, y] = band.pixel_to_arcsec(p.col as f64, p.row as f64, stamp_size);
            let d =
                ((x - primary_shift[0]).powi(2) + (y - primary_shift[1]).powi(2)).sqrt();
            (p, d)
        })
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .expect("peaks is non-empty");

    if best_dist > dist_cut {
        return Err(BlendError::PeakDetectionFailed(format!(
            "best peak {best_dist:.3}\" from primary exceeds cut {dist_cut:.3}\""
        )));
    }

    let peak_arcsec = band.pixel_to_arcsec(best_peak.col as f64, best_peak.row as f64, stamp_size);

    // Which source sits closest to the chosen peak, and which neighbor.
    let (primary_idx, closest_idx) = if n_sources == 1 {
        (0, 0)
    } else {
        let nearest = |exclude: Option<usize>| {
            shifts
                .iter()
                .enumerate()
                .filter(|(i, _)| Some(*i) != exclude)
                .min_by(|(_, a), (_, b)| {
                    let da = (a[0] - peak_arcsec[0]).powi(2) + (a[1] - peak_arcsec[1]).powi(2);
                    let db = (b[0] - peak_arcsec[0]).powi(2) + (b[1] - peak_arcsec[1]).powi(2);
                    da.total_cmp(&db)
                })
                .map(|(i, _)| i)
                .expect("at least one source")
        };
        let primary = nearest(None);
        (primary, nearest(Some(primary)))
    };

    Ok(PeakMatch {
        primary_idx,
        closest_idx,
        peak_px: [best_peak.col as f64, best_peak.row as f64],
        peak_arcsec,
        n_peaks: peaks.len(),
    })
}
