//! Real-image galaxy cutouts.
//!
//! A [`RealCutout`] carries an observed pixel stamp at its native pixel
//! scale plus a baked-in translation. Drawing resamples the stamp onto the
//! requested band's grid with bilinear interpolation, then applies the
//! band's Gaussian PSF as a separable blur. Absolute normalization is left
//! to the renderer, which rescales real stamps to their parametric
//! counterpart's flux.

use ndarray::Array2;

use crate::consts::MIN_CUTOUT_FLUX;
use crate::error::{BlendError, Result};
use crate::survey::Band;

/// An observed galaxy stamp with a translation baked in.
#[derive(Clone, Debug)]
pub struct RealCutout {
    /// Pixel data, row-major, square.
    pub data: Array2<f64>,
    /// Native pixel scale of `data`, arcsec/pixel.
    pub pixel_scale: f64,
    /// Translation from the stamp center, arcsec.
    pub offset: [f64; 2],
}

impl RealCutout {
    /// Return the cutout translated by (dx, dy) arcsec.
    pub fn shifted(&self, dx: f64, dy: f64) -> Self {
        Self {
            offset: [self.offset[0] + dx, self.offset[1] + dy],
            ..self.clone()
        }
    }

    /// Resample onto a `stamp_size` grid at the band's pixel scale and blur
    /// with the band's PSF.
    pub fn draw(&self, band: &Band, stamp_size: usize) -> Array2<f64> {
        let (ch, cw) = self.data.dim();
        let c_out = (stamp_size as f64 - 1.0) / 2.0;
        let c_in_r = (ch as f64 - 1.0) / 2.0;
        let c_in_c = (cw as f64 - 1.0) / 2.0;
        // Flux-conserving Jacobian between the two grids.
        let jac = (band.pixel_scale / self.pixel_scale).powi(2);

        let mut img = Array2::zeros((stamp_size, stamp_size));
        for row in 0..stamp_size {
            let y = (row as f64 - c_out) * band.pixel_scale - self.offset[1];
            let src_r = y / self.pixel_scale + c_in_r;
            for col in 0..stamp_size {
                let x = (col as f64 - c_out) * band.pixel_scale - self.offset[0];
                let src_c = x / self.pixel_scale + c_in_c;
                img[[row, col]] = bilinear_sample(&self.data, src_r, src_c) * jac;
            }
        }

        let sigma_px = band.psf_sigma / band.pixel_scale;
        gaussian_blur(&img, sigma_px)
    }
}

/// Subtract the stamp's baseline (its minimum) and rescale so the total
/// flux matches `target_flux`.
///
/// A near-zero denominator means the cutout carries no usable signal; the
/// caller retries the whole sample.
pub fn rescale_to_flux(stamp: &Array2<f64>, target_flux: f64) -> Result<Array2<f64>> {
    let baseline = stamp.iter().cloned().fold(f64::INFINITY, f64::min);
    let shifted = stamp.mapv(|v| v - baseline);
    let total = shifted.sum();
    if !total.is_finite() || total.abs() < MIN_CUTOUT_FLUX {
        return Err(BlendError::NumericDegenerate(format!(
            "cutout flux {total:e} too small to rescale"
        )));
    }
    Ok(shifted.mapv(|v| v * target_flux / total))
}

/// Sample an image at fractional coordinates with bilinear interpolation.
/// Out-of-bounds reads are zero.
pub fn bilinear_sample(data: &Array2<f64>, row: f64, col: f64) -> f64 {
    let (h, w) = data.dim();
    if row < 0.0 || col < 0.0 || row > (h - 1) as f64 || col > (w - 1) as f64 {
        return 0.0;
    }
    let r0 = row.floor() as usize;
    let c0 = col.floor() as usize;
    let r1 = (r0 + 1).min(h - 1);
    let c1 = (c0 + 1).min(w - 1);
    let fr = row - r0 as f64;
    let fc = col - c0 as f64;

    data[[r0, c0]] * (1.0 - fr) * (1.0 - fc)
        + data[[r0, c1]] * (1.0 - fr) * fc
        + data[[r1, c0]] * fr * (1.0 - fc)
        + data[[r1, c1]] * fr * fc
}

/// Separable Gaussian blur with edge clamping.
pub fn gaussian_blur(data: &Array2<f64>, sigma: f64) -> Array2<f64> {
    if sigma <= 0.0 {
        return data.clone();
    }
    let kernel = gaussian_kernel(sigma);
    let rows = convolve_rows(data, &kernel);
    convolve_cols(&rows, &kernel)
}

fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (sigma * 3.0).ceil() as usize;
    let mut kernel = vec![0.0; 2 * radius + 1];
    let s2 = 2.0 * sigma * sigma;
    let mut sum = 0.0;
    for (i, k) in kernel.iter_mut().enumerate() {
        let x = i as f64 - radius as f64;
        *k = (-x * x / s2).exp();
        sum += *k;
    }
    for v in &mut kernel {
        *v /= sum;
    }
    kernel
}

fn convolve_rows(data: &Array2<f64>, kernel: &[f64]) -> Array2<f64> {
    let (h, w) = data.dim();
    let radius = kernel.len() / 2;
    let mut out = Array2::zeros((h, w));
    for row in 0..h {
        for col in 0..w {
            let mut sum = 0.0;
            for (ki, &kv) in kernel.iter().enumerate() {
                let src = (col as isize + ki as isize - radius as isize)
                    .clamp(0, w as isize - 1) as usize;
                sum += data[[row, src]] * kv;
            }
            out[[row, col]] = sum;
        }
    }
    out
}

fn convolve_cols(data: &Array2<f64>, kernel: &[f64]) -> Array2<f64> {
    let (h, w) = data.dim();
    let radius = kernel.len() / 2;
    let mut out = Array2::zeros((h, w));
    for row in 0..h {
        for col in 0..w {
            let mut sum = 0.0;
            for (ki, &kv) in kernel.iter().enumerate() {
                let src = (row as isize + ki as isize - radius as isize)
                    .clamp(0, h as isize - 1) as usize;
                sum += data[[src, col]] * kv;
            }
            out[[row, col]] = sum;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn bilinear_at_grid_points_is_exact() {
        let mut data = Array2::zeros((4, 4));
        data[[1, 2]] = 3.5;
        assert_relative_eq!(bilinear_sample(&data, 1.0, 2.0), 3.5);
        assert_relative_eq!(bilinear_sample(&data, 1.0, 1.5), 1.75);
        assert_relative_eq!(bilinear_sample(&data, -0.1, 0.0), 0.0);
    }

    #[test]
    fn blur_preserves_total_flux() {
        let mut data = Array2::zeros((31, 31));
        data[[15, 15]] = 100.0;
        let blurred = gaussian_blur(&data, 2.0);
        assert_relative_eq!(blurred.sum(), 100.0, max_relative = 1e-6);
    }

    #[test]
    fn rescale_hits_target_flux() {
        let data = Array2::from_shape_fn((8, 8), |(r, c)| 0.5 + (r + c) as f64);
        let scaled = rescale_to_flux(&data, 42.0).unwrap();
        assert_relative_eq!(scaled.sum(), 42.0, max_relative = 1e-9);
    }

    #[test]
    fn rescale_rejects_flat_stamp() {
        let data = Array2::from_elem((8, 8), 0.77);
        assert!(rescale_to_flux(&data, 1.0).is_err());
    }
}
