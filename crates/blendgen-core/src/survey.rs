//! Band and survey description: the optics side of the simulation.
//!
//! A [`Band`] bundles everything the renderer needs for one filter: pixel
//! scale, a Gaussian PSF width, the per-pixel sky background for one
//! co-added exposure, a throughput/exposure coefficient and the photometric
//! zero-point. A [`Survey`] is the fixed, ordered set of ten bands every
//! image stack is drawn in.

use ndarray::Array2;
use serde::Serialize;

use crate::consts::{BAND_COUNT, IR_BAND, REFERENCE_BAND};

/// Per-band instrument model.
#[derive(Clone, Debug, Serialize)]
pub struct Band {
    /// Filter name.
    pub name: &'static str,
    /// Pixel scale in arcsec/pixel.
    pub pixel_scale: f64,
    /// Gaussian PSF sigma in arcsec.
    pub psf_sigma: f64,
    /// Mean sky background per pixel, in image flux units.
    pub sky_level: f64,
    /// Exposure-time/throughput coefficient applied to source fluxes.
    pub exposure_coeff: f64,
    /// AB zero-point of the filter.
    pub zeropoint: f64,
}

impl Band {
    /// Convert pixel coordinates to angular offsets from the stamp center.
    ///
    /// Uses the (n-1)/2 center convention so the geometric stamp center
    /// maps to (0, 0) arcsec.
    pub fn pixel_to_arcsec(&self, col: f64, row: f64, stamp_size: usize) -> [f64; 2] {
        let c = (stamp_size as f64 - 1.0) / 2.0;
        [(col - c) * self.pixel_scale, (row - c) * self.pixel_scale]
    }

    /// Draw the band's PSF as a normalized (unit flux) stamp.
    pub fn psf_stamp(&self, stamp_size: usize) -> Array2<f64> {
        let sigma_px = self.psf_sigma / self.pixel_scale;
        let c = (stamp_size as f64 - 1.0) / 2.0;
        let mut img = Array2::zeros((stamp_size, stamp_size));
        let mut total = 0.0;
        for row in 0..stamp_size {
            for col in 0..stamp_size {
                let dx = col as f64 - c;
                let dy = row as f64 - c;
                let v = (-0.5 * (dx * dx + dy * dy) / (sigma_px * sigma_px)).exp();
                img[[row, col]] = v;
                total += v;
            }
        }
        if total > 0.0 {
            img.mapv_inplace(|v| v / total);
        }
        img
    }
}

/// The fixed ten-band set: Euclid VIS/Y/J/H followed by LSST u/g/r/i/z/y.
#[derive(Clone, Debug, Serialize)]
pub struct Survey {
    pub bands: Vec<Band>,
}

impl Survey {
    /// Model values for the joint Euclid + LSST configuration the original
    /// training sets were produced for.
    pub fn lsst_euclid() -> Self {
        let bands = vec![
            Band {
                name: "VIS",
                pixel_scale: 0.101,
                psf_sigma: 0.085,
                sky_level: 12.0,
                exposure_coeff: 0.58,
                zeropoint: 25.72,
            },
            Band {
                name: "Y",
                pixel_scale: 0.30,
                psf_sigma: 0.15,
                sky_level: 28.0,
                exposure_coeff: 0.41,
                zeropoint: 24.85,
            },
            Band {
                name: "J",
                pixel_scale: 0.30,
                psf_sigma: 0.16,
                sky_level: 31.0,
                exposure_coeff: 0.44,
                zeropoint: 24.90,
            },
            Band {
                name: "H",
                pixel_scale: 0.30,
                psf_sigma: 0.17,
                sky_level: 35.0,
                exposure_coeff: 0.47,
                zeropoint: 24.92,
            },
            Band {
                name: "u",
                pixel_scale: 0.2,
                psf_sigma: 0.38,
                sky_level: 18.0,
                exposure_coeff: 0.13,
                zeropoint: 26.40,
            },
            Band {
                name: "g",
                pixel_scale: 0.2,
                psf_sigma: 0.36,
                sky_level: 82.0,
                exposure_coeff: 0.52,
                zeropoint: 28.26,
            },
            Band {
                name: "r",
                pixel_scale: 0.2,
                psf_sigma: 0.33,
                sky_level: 134.0,
                exposure_coeff: 1.0,
                zeropoint: 28.13,
            },
            Band {
                name: "i",
                pixel_scale: 0.2,
                psf_sigma: 0.31,
                sky_level: 194.0,
                exposure_coeff: 0.81,
                zeropoint: 27.79,
            },
            Band {
                name: "z",
                pixel_scale: 0.2,
                psf_sigma: 0.30,
                sky_level: 288.0,
                exposure_coeff: 0.61,
                zeropoint: 27.40,
            },
            Band {
                name: "y",
                pixel_scale: 0.2,
                psf_sigma: 0.29,
                sky_level: 361.0,
                exposure_coeff: 0.30,
                zeropoint: 26.58,
            },
        ];
        debug_assert_eq!(bands.len(), BAND_COUNT);
        Self { bands }
    }

    /// The r band, in which selection, detection and metrics run.
    pub fn reference_band(&self) -> &Band {
        &self.bands[REFERENCE_BAND]
    }

    /// The H band used for the infrared magnitude.
    pub fn ir_band(&self) -> &Band {
        &self.bands[IR_BAND]
    }
}
