//! Per-source measurements and blending metrics.
//!
//! Sizes and ellipticities come from an iterative adaptive-moments fit (an
//! elliptical Gaussian weight re-matched to the light until it converges),
//! with the instrument PSF subtracted in quadrature. Blendedness metrics
//! quantify how much neighbor light contaminates the primary source.

use ndarray::Array2;

use crate::consts::{
    APERTURE_SIGMA_FACTOR, MOMENTS_MAX_ITER, MOMENTS_TOL, REFERENCE_BAND, SENTINEL,
};
use crate::error::{BlendError, Result};
use crate::sample::SourceMode;
use crate::scene::Source;
use crate::survey::Band;

/// Converged second moments of a light distribution, pixel units.
#[derive(Clone, Copy, Debug)]
pub struct Moments {
    /// Centroid (column, row).
    pub cx: f64,
    pub cy: f64,
    /// Gaussian-equivalent covariance.
    pub mxx: f64,
    pub myy: f64,
    pub mxy: f64,
    /// Total weighted flux at convergence.
    pub flux: f64,
}

/// Scalar description of one rendered source.
#[derive(Clone, Copy, Debug)]
pub struct SourceSummary {
    pub redshift: f64,
    /// Gaussian-equivalent size, pixels, PSF-deconvolved.
    pub moment_sigma: f64,
    pub e1: f64,
    pub e2: f64,
    pub mag: f64,
}

/// Initial weight sigma for the adaptive-moments iteration, pixels.
const INITIAL_WEIGHT_SIGMA: f64 = 2.5;

/// Fit an elliptical Gaussian to `image` by iterated weighted moments.
///
/// At the fixed point the weight covariance equals the Gaussian-equivalent
/// covariance of the light, which is what gets reported.
pub fn adaptive_moments(image: &Array2<f64>) -> Result<Moments> {
    let (h, w) = image.dim();
    let mut cx = (w as f64 - 1.0) / 2.0;
    let mut cy = (h as f64 - 1.0) / 2.0;
    let s0 = INITIAL_WEIGHT_SIGMA * INITIAL_WEIGHT_SIGMA;
    let (mut wxx, mut wyy, mut wxy) = (s0, s0, 0.0);

    let mut flux = 0.0;
    for _ in 0..MOMENTS_MAX_ITER {
        let det = wxx * wyy - wxy * wxy;
        if !(det > 0.0) {
            return Err(BlendError::NumericDegenerate(
                "adaptive moments weight collapsed".into(),
            ));
        }
        let (ixx, iyy, ixy) = (wyy / det, wxx / det, -wxy / det);

        let mut m00 = 0.0;
        let (mut m10, mut m01) = (0.0, 0.0);
        let (mut m20, mut m02, mut m11) = (0.0, 0.0, 0.0);
        for row in 0..h {
            let dy = row as f64 - cy;
            for col in 0..w {
                let dx = col as f64 - cx;
                let q = ixx * dx * dx + 2.0 * ixy * dx * dy + iyy * dy * dy;
                if q > 25.0 {
                    continue;
                }
                let wgt = image[[row, col]] * (-0.5 * q).exp();
                m00 += wgt;
                m10 += dx * wgt;
                m01 += dy * wgt;
                m20 += dx * dx * wgt;
                m02 += dy * dy * wgt;
                m11 += dx * dy * wgt;
            }
        }
        if !(m00 > 0.0) || !m00.is_finite() {
            return Err(BlendError::NumericDegenerate(
                "non-positive flux in adaptive moments".into(),
            ));
        }

        cx += m10 / m00;
        cy += m01 / m00;
        // Gaussian measured through a matched Gaussian weight has half the
        // true covariance, so the fixed-point update doubles the measured
        // moments.
        let nxx = 2.0 * (m20 / m00 - (m10 / m00).powi(2));
        let nyy = 2.0 * (m02 / m00 - (m01 / m00).powi(2));
        let nxy = 2.0 * (m11 / m00 - (m10 / m00) * (m01 / m00));
        flux = 2.0 * m00;

        let delta = (nxx - wxx).abs() + (nyy - wyy).abs() + (nxy - wxy).abs();
        let scale = (wxx + wyy).abs().max(1e-12);
        wxx = nxx;
        wyy = nyy;
        wxy = nxy;
        if delta / scale < MOMENTS_TOL {
            break;
        }
    }

    if !(wxx * wyy - wxy * wxy).is_finite() {
        return Err(BlendError::NumericDegenerate(
            "non-finite adaptive moments".into(),
        ));
    }
    Ok(Moments {
        cx,
        cy,
        mxx: wxx,
        myy: wyy,
        mxy: wxy,
        flux,
    })
}

/// Measure one source from its rendered stamp: redshift, PSF-deconvolved
/// second-moment size and ellipticity, and magnitude against the band's
/// zero-point.
pub fn describe(
    source: &Source,
    image: &Array2<f64>,
    psf_image: &Array2<f64>,
    mode: SourceMode,
    band: &Band,
) -> Result<SourceSummary> {
    let obs = adaptive_moments(image)?;
    let psf = adaptive_moments(psf_image)?;

    // Deconvolve the PSF in quadrature.
    let gxx = obs.mxx - psf.mxx;
    let gyy = obs.myy - psf.myy;
    let gxy = obs.mxy - psf.mxy;
    let trace = gxx + gyy;
    let det = gxx * gyy - gxy * gxy;
    if !(trace > 0.0) || !(det > 0.0) || !det.is_finite() {
        return Err(BlendError::NumericDegenerate(format!(
            "deconvolved moments degenerate (trace {trace:.3}, det {det:.3})"
        )));
    }

    let redshift = match mode {
        SourceMode::Real if !source.redshift_reliable => SENTINEL,
        _ => source.profile.redshift,
    };

    Ok(SourceSummary {
        redshift,
        moment_sigma: det.powf(0.25),
        e1: (gxx - gyy) / trace,
        e2: 2.0 * gxy / trace,
        mag: source.profile.magnitude(REFERENCE_BAND, band),
    })
}

/// Fraction of flux in the primary's footprint contributed by all
/// neighbors, weighted by the primary's own light. In [0, 1]; 0 when the
/// neighbor image is empty.
pub fn blendedness_total(central: &Array2<f64>, others: &Array2<f64>) -> f64 {
    let mut num = 0.0;
    let mut den = 0.0;
    for (c, o) in central.iter().zip(others.iter()) {
        num += c * o;
        den += c * (c + o);
    }
    if den > 0.0 {
        (num / den).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Blendedness against a single neighbor image.
pub fn blendedness_single(central: &Array2<f64>, neighbor: &Array2<f64>) -> f64 {
    blendedness_total(central, neighbor)
}

/// Neighbor flux fraction within a circular aperture of radius
/// `APERTURE_SIGMA_FACTOR * moment_sigma` pixels around the stamp center.
pub fn blendedness_aperture(
    central: &Array2<f64>,
    others: &Array2<f64>,
    moment_sigma: f64,
) -> f64 {
    let (h, w) = central.dim();
    let cy = (h as f64 - 1.0) / 2.0;
    let cx = (w as f64 - 1.0) / 2.0;
    let r2 = (APERTURE_SIGMA_FACTOR * moment_sigma).powi(2);

    let mut flux_others = 0.0;
    let mut flux_total = 0.0;
    for row in 0..h {
        let dy = row as f64 - cy;
        for col in 0..w {
            let dx = col as f64 - cx;
            if dx * dx + dy * dy > r2 {
                continue;
            }
            flux_others += others[[row, col]];
            flux_total += central[[row, col]] + others[[row, col]];
        }
    }
    if flux_total > 0.0 {
        (flux_others / flux_total).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Matched-filter signal-to-noise of a noiseless stamp against Poisson sky
/// background.
pub fn snr(stamp: &Array2<f64>, sky_level: f64) -> f64 {
    stamp
        .iter()
        .map(|&v| {
            let var = v + sky_level;
            if var > 0.0 {
                v * v / var
            } else {
                0.0
            }
        })
        .sum::<f64>()
        .sqrt()
}

/// Signal-to-noise of the brightest pixel alone.
pub fn snr_peak(stamp: &Array2<f64>, sky_level: f64) -> f64 {
    let peak = stamp.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let var = peak + sky_level;
    if peak > 0.0 && var > 0.0 {
        peak / var.sqrt()
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn gaussian_stamp(size: usize, sigma: f64, flux: f64) -> Array2<f64> {
        let c = (size as f64 - 1.0) / 2.0;
        let norm = flux / (2.0 * std::f64::consts::PI * sigma * sigma);
        Array2::from_shape_fn((size, size), |(r, cidx)| {
            let dy = r as f64 - c;
            let dx = cidx as f64 - c;
            norm * (-0.5 * (dx * dx + dy * dy) / (sigma * sigma)).exp()
        })
    }

    #[test]
    fn moments_recover_gaussian_sigma() {
        let img = gaussian_stamp(65, 3.0, 1_000.0);
        let m = adaptive_moments(&img).unwrap();
        assert_relative_eq!(m.mxx, 9.0, max_relative = 1e-2);
        assert_relative_eq!(m.myy, 9.0, max_relative = 1e-2);
        assert!(m.mxy.abs() < 1e-6);
        assert_relative_eq!(m.cx, 32.0, epsilon = 1e-6);
        assert_relative_eq!(m.flux, 1_000.0, max_relative = 1e-2);
    }

    #[test]
    fn moments_reject_empty_image() {
        let img = Array2::zeros((32, 32));
        assert!(matches!(
            adaptive_moments(&img),
            Err(BlendError::NumericDegenerate(_))
        ));
    }

    #[test]
    fn blendedness_zero_without_neighbors() {
        let central = gaussian_stamp(33, 2.0, 100.0);
        let empty = Array2::zeros((33, 33));
        assert_eq!(blendedness_total(&central, &empty), 0.0);
        assert_eq!(blendedness_aperture(&central, &empty, 2.0), 0.0);
    }

    #[test]
    fn blendedness_bounded_and_monotonic() {
        let central = gaussian_stamp(33, 2.0, 100.0);
        let faint = gaussian_stamp(33, 2.0, 10.0);
        let bright = gaussian_stamp(33, 2.0, 1_000.0);
        let b_faint = blendedness_total(&central, &faint);
        let b_bright = blendedness_total(&central, &bright);
        assert!(b_faint > 0.0 && b_faint < 1.0);
        assert!(b_bright > b_faint && b_bright <= 1.0);
    }

    #[test]
    fn snr_scales_with_flux() {
        let faint = gaussian_stamp(33, 2.0, 100.0);
        let bright = gaussian_stamp(33, 2.0, 10_000.0);
        assert!(snr(&bright, 134.0) > snr(&faint, 134.0));
        assert!(snr_peak(&bright, 134.0) > snr_peak(&faint, 134.0));
        assert_eq!(snr_peak(&Array2::zeros((8, 8)), 134.0), 0.0);
    }
}
