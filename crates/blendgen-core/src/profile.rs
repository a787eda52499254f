//! Parametric galaxy light profiles.
//!
//! A galaxy is modeled as an elliptical Gaussian with a per-band flux
//! vector. Rotation and translation are baked into the profile rather than
//! applied at draw time, so a profile can be moved several times (shift,
//! recenter) and drawn in any band afterwards. Convolution with a band's
//! Gaussian PSF is analytic: the covariance matrices add.

use ndarray::Array2;

use crate::consts::{BAND_COUNT, HLR_TO_SIGMA};
use crate::survey::Band;

/// An elliptical-Gaussian galaxy model.
#[derive(Clone, Debug)]
pub struct GalaxyProfile {
    /// Total flux per band, in image flux units, fixed band ordering.
    pub band_flux: [f64; BAND_COUNT],
    /// Circularized half-light radius in arcsec.
    pub half_light_radius: f64,
    /// Intrinsic ellipticity (distortion convention), in the current
    /// orientation.
    pub e1: f64,
    pub e2: f64,
    /// Translation from the stamp center, arcsec.
    pub offset: [f64; 2],
    /// Catalog redshift; NaN when the catalog has no trustworthy value.
    pub redshift: f64,
}

impl GalaxyProfile {
    /// Apparent magnitude in `band` from its zero-point.
    pub fn magnitude(&self, band_index: usize, band: &Band) -> f64 {
        band.zeropoint - 2.5 * self.band_flux[band_index].log10()
    }

    /// Return the profile rotated by `theta` radians.
    ///
    /// Rotating a profile rotates its ellipticity at twice the angle
    /// (spin-2 quantity); the flux, size and offset are unchanged.
    pub fn rotated(&self, theta: f64) -> Self {
        let (s, c) = (2.0 * theta).sin_cos();
        Self {
            e1: self.e1 * c - self.e2 * s,
            e2: self.e1 * s + self.e2 * c,
            ..self.clone()
        }
    }

    /// Return the profile translated by (dx, dy) arcsec.
    pub fn shifted(&self, dx: f64, dy: f64) -> Self {
        Self {
            offset: [self.offset[0] + dx, self.offset[1] + dy],
            ..self.clone()
        }
    }

    /// Second-moment covariance of the bare profile in arcsec^2:
    /// (Cxx, Cyy, Cxy).
    fn covariance(&self) -> (f64, f64, f64) {
        let sigma2 = (self.half_light_radius / HLR_TO_SIGMA).powi(2);
        (
            sigma2 * (1.0 + self.e1),
            sigma2 * (1.0 - self.e1),
            sigma2 * self.e2,
        )
    }

    /// Rasterize the profile convolved with the band's PSF onto a
    /// `stamp_size` x `stamp_size` grid at the band's pixel scale.
    ///
    /// The returned stamp integrates to `band_flux * exposure_coeff` (up to
    /// truncation at the stamp edges).
    pub fn draw(&self, band_index: usize, band: &Band, stamp_size: usize) -> Array2<f64> {
        let (cxx_g, cyy_g, cxy_g) = self.covariance();
        let psf2 = band.psf_sigma * band.psf_sigma;
        let (cxx, cyy, cxy) = (cxx_g + psf2, cyy_g + psf2, cxy_g);

        let det = cxx * cyy - cxy * cxy;
        let flux = self.band_flux[band_index] * band.exposure_coeff;
        let scale = band.pixel_scale;
        let norm = flux * scale * scale / (2.0 * std::f64::consts::PI * det.sqrt());

        // Inverse covariance for the exponent.
        let (ixx, iyy, ixy) = (cyy / det, cxx / det, -cxy / det);
        let c = (stamp_size as f64 - 1.0) / 2.0;

        let mut img = Array2::zeros((stamp_size, stamp_size));
        for row in 0..stamp_size {
            let dy = (row as f64 - c) * scale - self.offset[1];
            for col in 0..stamp_size {
                let dx = (col as f64 - c) * scale - self.offset[0];
                let q = ixx * dx * dx + 2.0 * ixy * dx * dy + iyy * dy * dy;
                img[[row, col]] = norm * (-0.5 * q).exp();
            }
        }
        img
    }

    /// Evaluate the bare (unconvolved) profile on a grid, used to build
    /// synthetic cutouts.
    pub fn draw_unconvolved(&self, band_index: usize, pixel_scale: f64, size: usize) -> Array2<f64> {
        let (cxx, cyy, cxy) = self.covariance();
        let det = (cxx * cyy - cxy * cxy).max(1e-12);
        let flux = self.band_flux[band_index];
        let norm = flux * pixel_scale * pixel_scale / (2.0 * std::f64::consts::PI * det.sqrt());
        let (ixx, iyy, ixy) = (cyy / det, cxx / det, -cxy / det);
        let c = (size as f64 - 1.0) / 2.0;

        let mut img = Array2::zeros((size, size));
        for row in 0..size {
            let dy = (row as f64 - c) * pixel_scale - self.offset[1];
            for col in 0..size {
                let dx = (col as f64 - c) * pixel_scale - self.offset[0];
                let q = ixx * dx * dx + 2.0 * ixy * dx * dy + iyy * dy * dy;
                img[[row, col]] = norm * (-0.5 * q).exp();
            }
        }
        img
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::REFERENCE_BAND;
    use crate::survey::Survey;
    use approx::assert_relative_eq;

    fn round_profile(flux: f64) -> GalaxyProfile {
        GalaxyProfile {
            band_flux: [flux; BAND_COUNT],
            half_light_radius: 0.4,
            e1: 0.0,
            e2: 0.0,
            offset: [0.0, 0.0],
            redshift: 1.0,
        }
    }

    #[test]
    fn draw_conserves_flux() {
        let survey = Survey::lsst_euclid();
        let band = survey.reference_band();
        let p = round_profile(1_000.0);
        let img = p.draw(REFERENCE_BAND, band, 64);
        assert_relative_eq!(
            img.sum(),
            1_000.0 * band.exposure_coeff,
            max_relative = 1e-3
        );
    }

    #[test]
    fn shift_moves_the_peak() {
        let survey = Survey::lsst_euclid();
        let band = survey.reference_band();
        // 1 arcsec = 5 pixels at LSST scale.
        let p = round_profile(1_000.0).shifted(1.0, 0.0);
        let img = p.draw(REFERENCE_BAND, band, 64);
        let (mut peak, mut val) = ((0, 0), f64::MIN);
        for ((r, c), &v) in img.indexed_iter() {
            if v > val {
                peak = (r, c);
                val = v;
            }
        }
        // Center pixel convention: (63-1)/2 = 31.5, so the peak lands on
        // column 36 or 37.
        assert_eq!(peak.0, 31);
        assert!(peak.1 == 36 || peak.1 == 37, "peak at {peak:?}");
    }

    #[test]
    fn rotation_spins_ellipticity_twice() {
        let mut p = round_profile(10.0);
        p.e1 = 0.3;
        let r = p.rotated(std::f64::consts::FRAC_PI_2);
        assert_relative_eq!(r.e1, -0.3, epsilon = 1e-12);
        assert_relative_eq!(r.e2, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn magnitude_follows_zero_point() {
        let survey = Survey::lsst_euclid();
        let band = survey.reference_band();
        let p = round_profile(100.0);
        assert_relative_eq!(
            p.magnitude(REFERENCE_BAND, band),
            28.13 - 5.0,
            epsilon = 1e-12
        );
    }
}
