//! Scene rasterization and sky noise.
//!
//! Per band, every source is drawn through the band's PSF onto its own
//! noiseless stamp; the blend is their sum plus one Poisson realization of
//! the sky background. All noise draws consume the caller's RNG stream so
//! successive renders within a sample stay uncorrelated.

use ndarray::Array2;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Poisson};

use crate::cutout::rescale_to_flux;
use crate::error::{BlendError, Result};
use crate::scene::Scene;
use crate::survey::Band;

/// One band's rendering: per-source noiseless stamps plus the noisy blend.
pub struct RenderedBand {
    pub stamps: Vec<Array2<f64>>,
    pub blend: Array2<f64>,
}

/// Draw every source's parametric profile in `band` and sum them into a
/// blend with Poisson sky noise.
pub fn render_band(
    scene: &Scene,
    band_index: usize,
    band: &Band,
    stamp_size: usize,
    rng: &mut StdRng,
) -> Result<RenderedBand> {
    let stamps: Vec<Array2<f64>> = scene
        .sources
        .iter()
        .map(|src| src.profile.draw(band_index, band, stamp_size))
        .collect();

    let mut blend = Array2::zeros((stamp_size, stamp_size));
    for stamp in &stamps {
        blend += stamp;
    }
    add_sky_noise(&mut blend, band.sky_level, rng)?;

    Ok(RenderedBand { stamps, blend })
}

/// Draw every source's real cutout in `band`, without noise or flux
/// normalization. The real-image path renders these once in the reference
/// band and rescales them per output band.
pub fn render_real_stamps(
    scene: &Scene,
    band: &Band,
    stamp_size: usize,
) -> Result<Vec<Array2<f64>>> {
    scene
        .sources
        .iter()
        .map(|src| {
            let cutout = src.cutout.as_ref().ok_or_else(|| {
                BlendError::Catalog("source has no real-image cutout".into())
            })?;
            Ok(cutout.draw(band, stamp_size))
        })
        .collect()
}

/// Rescale each real stamp so its total flux matches the corresponding
/// parametric stamp, then sum into a noiseless blend.
pub fn compose_real_band(
    real_stamps: &[Array2<f64>],
    parametric_stamps: &[Array2<f64>],
) -> Result<(Vec<Array2<f64>>, Array2<f64>)> {
    debug_assert_eq!(real_stamps.len(), parametric_stamps.len());
    let mut rescaled = Vec::with_capacity(real_stamps.len());
    let (h, w) = parametric_stamps[0].dim();
    let mut blend = Array2::zeros((h, w));
    for (real, param) in real_stamps.iter().zip(parametric_stamps) {
        let scaled = rescale_to_flux(real, param.sum())?;
        blend += &scaled;
        rescaled.push(scaled);
    }
    Ok((rescaled, blend))
}

/// Add one Poisson realization of the sky to an image in place.
///
/// The sky mean is added before the draw and subtracted after, so the
/// image keeps its flux scale while gaining sky-limited shot noise.
pub fn add_sky_noise(image: &mut Array2<f64>, sky_level: f64, rng: &mut StdRng) -> Result<()> {
    if sky_level < 0.0 {
        return Err(BlendError::Config(format!(
            "negative sky level {sky_level}"
        )));
    }
    for v in image.iter_mut() {
        let mean = (*v + sky_level).max(0.0);
        if !mean.is_finite() {
            return Err(BlendError::NumericDegenerate(
                "non-finite pixel before noise draw".into(),
            ));
        }
        let noisy = if mean > 0.0 {
            let poisson = Poisson::new(mean)
                .map_err(|e| BlendError::NumericDegenerate(format!("poisson: {e}")))?;
            poisson.sample(rng)
        } else {
            0.0
        };
        *v = noisy - sky_level;
    }
    Ok(())
}
