use ndarray::{Array2, Array3, Axis};
use rand::rngs::StdRng;
use rand::Rng;
use tracing::debug;

use crate::catalog::Catalog;
use crate::consts::{
    BAND_COUNT, DETECTION_STAMP_FACTOR, PEAK_DIST_CUT, PEAK_MIN_SEPARATION, REFERENCE_BAND,
    SAMPLING_DRAW_LIMIT, SENTINEL,
};
use crate::detect::detect;
use crate::error::{BlendError, Result};
use crate::measure::{
    blendedness_aperture, blendedness_single, blendedness_total, describe, snr, snr_peak,
    SourceSummary,
};
use crate::render::{add_sky_noise, compose_real_band, render_band, render_real_stamps};
use crate::sample::{sample_source, SourceMode};
use crate::scene::Scene;
use crate::shift::{apply_cutout_offset, draw_offset, shift_source, ShiftPolicy};
use crate::survey::Survey;

use super::config::{GenerateConfig, Population};
use super::types::{SampleMetadata, SampleRecord};

/// Generate one sample using parametric galaxy models only.
pub fn generate_parametric(
    catalog: &dyn Catalog,
    survey: &Survey,
    config: &GenerateConfig,
    rng: &mut StdRng,
) -> Result<SampleRecord> {
    run(catalog, survey, config, SourceMode::Parametric, rng)
}

/// Generate one sample whose output stacks come from real-image cutouts.
///
/// The parametric sibling of every source is still rendered internally: it
/// drives peak detection, flux normalization of the cutouts, and all
/// reported metrics.
pub fn generate_real(
    catalog: &dyn Catalog,
    survey: &Survey,
    config: &GenerateConfig,
    rng: &mut StdRng,
) -> Result<SampleRecord> {
    run(catalog, survey, config, SourceMode::Real, rng)
}

fn run(
    catalog: &dyn Catalog,
    survey: &Survey,
    config: &GenerateConfig,
    mode: SourceMode,
    rng: &mut StdRng,
) -> Result<SampleRecord> {
    config.validate()?;
    if catalog.is_empty() {
        return Err(BlendError::Catalog("empty catalog".into()));
    }

    for attempt in 1..=config.max_attempts {
        match attempt_sample(catalog, survey, config, mode, rng) {
            Ok(record) => {
                debug!(attempt, sources = record.metadata.nb_blended_gal, "sample generated");
                return Ok(record);
            }
            Err(e) if e.is_retryable() => {
                debug!(attempt, error = %e, "attempt failed, restarting sample");
            }
            Err(e) => return Err(e),
        }
    }

    Err(BlendError::AttemptsExhausted {
        attempts: config.max_attempts,
    })
}

/// One full pipeline attempt: sample, shift, detect, render, measure.
fn attempt_sample(
    catalog: &dyn Catalog,
    survey: &Survey,
    config: &GenerateConfig,
    mode: SourceMode,
    rng: &mut StdRng,
) -> Result<SampleRecord> {
    let n_target = match config.population {
        Population::Isolated => 1,
        Population::Blended => rng.gen_range(1..=config.max_sources),
    };

    // Sample sources until enough pass the magnitude cut.
    let mut scene = Scene::default();
    for _ in 0..n_target {
        let mut accepted = None;
        for _ in 0..SAMPLING_DRAW_LIMIT {
            if let Some(src) = sample_source(
                catalog,
                survey,
                config.allowed_indices.as_deref(),
                mode,
                config.magnitude_cutoff,
                config.stamp_size,
                rng,
            )? {
                accepted = Some(src);
                break;
            }
        }
        scene.sources.push(accepted.ok_or(BlendError::SamplingExhausted {
            draws: SAMPLING_DRAW_LIMIT,
        })?);
    }
    let n = scene.len();

    if config.prefer_brightest {
        scene.reorder_brightest();
    }

    // Shift every source's parametric profile.
    let sources = std::mem::take(&mut scene.sources);
    for (j, src) in sources.into_iter().enumerate() {
        let policy = if j == 0 {
            config.first_shift_policy
        } else {
            config.other_shift_policy
        };
        let (shifted, _) = shift_source(
            src,
            policy,
            config.max_offset_magnitude,
            config.max_offset_radius,
            None,
            rng,
        );
        scene.sources.push(shifted);
    }

    // Peak resolution. Defaults describe the no-detection case.
    let mut primary_idx = 0usize;
    let mut closest_idx = scene
        .closest_to(scene.sources[0].shift, 0)
        .unwrap_or(0);
    let mut n_peak = 1usize;

    if config.detect_peaks {
        let det_size = config.stamp_size * DETECTION_STAMP_FACTOR;
        let ref_band = survey.reference_band();
        let rendered = render_band(&scene, REFERENCE_BAND, ref_band, det_size, rng)?;
        let shifts: Vec<[f64; 2]> = scene.sources.iter().map(|s| s.shift).collect();
        let matched = detect(
            &rendered.blend,
            ref_band,
            &shifts,
            det_size,
            PEAK_MIN_SEPARATION,
            PEAK_DIST_CUT,
        )?;
        scene.recenter(matched.peak_arcsec);
        primary_idx = matched.primary_idx;
        closest_idx = matched.closest_idx;
        n_peak = matched.n_peaks;
    }

    // Isolated scenes keep their single source as the trivial primary.
    if config.population == Population::Isolated || !config.detect_peaks {
        primary_idx = 0;
        n_peak = 1;
    }

    // Real-image path: re-apply the final offsets to the cutouts through
    // the noshift policy, then render all cutouts once in the reference
    // band for per-band rescaling.
    let real_stamps = if mode == SourceMode::Real {
        for src in &mut scene.sources {
            let offset = draw_offset(
                ShiftPolicy::NoShift,
                config.max_offset_magnitude,
                config.max_offset_radius,
                Some(src.shift),
                rng,
            );
            apply_cutout_offset(src, offset);
        }
        Some(render_real_stamps(
            &scene,
            survey.reference_band(),
            config.stamp_size,
        )?)
    } else {
        None
    };

    // Render every band and collect metrics in the reference band.
    let s = config.stamp_size;
    let mut noiseless = Array3::zeros((BAND_COUNT, s, s));
    let mut noisy = Array3::zeros((BAND_COUNT, s, s));
    let mut reference: Option<ReferenceMetrics> = None;

    for (i, band) in survey.bands.iter().enumerate() {
        let rendered = render_band(&scene, i, band, s, rng)?;

        match &real_stamps {
            None => {
                noiseless
                    .index_axis_mut(Axis(0), i)
                    .assign(&rendered.stamps[primary_idx]);
                noisy.index_axis_mut(Axis(0), i).assign(&rendered.blend);
            }
            Some(stamps) => {
                let (rescaled, mut blend_real) = compose_real_band(stamps, &rendered.stamps)?;
                add_sky_noise(&mut blend_real, band.sky_level, rng)?;
                noiseless
                    .index_axis_mut(Axis(0), i)
                    .assign(&rescaled[primary_idx]);
                noisy.index_axis_mut(Axis(0), i).assign(&blend_real);
            }
        }

        if i == REFERENCE_BAND {
            reference = Some(reference_metrics(
                &scene,
                &rendered.stamps,
                primary_idx,
                closest_idx,
                mode,
                band,
                s,
            )?);
        }
    }
    let reference = reference.expect("reference band is always rendered");

    let metadata = assemble_metadata(&scene, &reference, primary_idx, closest_idx, n, n_peak);
    Ok(SampleRecord {
        noiseless,
        noisy,
        metadata,
        shifts: scene.shift_table(config.max_sources),
    })
}

/// Measurements taken once, on the parametric reference-band rendering.
struct ReferenceMetrics {
    primary: SourceSummary,
    closest: Option<SourceSummary>,
    blendedness: [f64; 3],
    snr: f64,
    snr_peak: f64,
}

fn reference_metrics(
    scene: &Scene,
    stamps: &[Array2<f64>],
    primary_idx: usize,
    closest_idx: usize,
    mode: SourceMode,
    band: &crate::survey::Band,
    stamp_size: usize,
) -> Result<ReferenceMetrics> {
    let psf_image = band.psf_stamp(stamp_size);
    let primary = describe(
        &scene.sources[primary_idx],
        &stamps[primary_idx],
        &psf_image,
        mode,
        band,
    )?;

    let (closest, blendedness) = if scene.len() > 1 {
        let closest = describe(
            &scene.sources[closest_idx],
            &stamps[closest_idx],
            &psf_image,
            mode,
            band,
        )?;
        let central = &stamps[primary_idx];
        let mut others = Array2::zeros(central.dim());
        for (h, stamp) in stamps.iter().enumerate() {
            if h != primary_idx {
                others += stamp;
            }
        }
        let metrics = [
            blendedness_total(central, &others),
            blendedness_single(central, &stamps[closest_idx]),
            blendedness_aperture(central, &others, primary.moment_sigma),
        ];
        (Some(closest), metrics)
    } else {
        (None, [SENTINEL; 3])
    };

    Ok(ReferenceMetrics {
        primary,
        closest,
        blendedness,
        snr: snr(&stamps[primary_idx], band.sky_level),
        snr_peak: snr_peak(&stamps[primary_idx], band.sky_level),
    })
}

fn assemble_metadata(
    scene: &Scene,
    reference: &ReferenceMetrics,
    primary_idx: usize,
    closest_idx: usize,
    n: usize,
    n_peak: usize,
) -> SampleMetadata {
    let closest_src = (n > 1).then(|| &scene.sources[closest_idx]);
    let closest_sum = reference.closest.as_ref();
    SampleMetadata {
        nb_blended_gal: n,
        snr: reference.snr,
        snr_peak: reference.snr_peak,
        redshift: reference.primary.redshift,
        moment_sigma: reference.primary.moment_sigma,
        e1: reference.primary.e1,
        e2: reference.primary.e2,
        mag: scene.sources[0].mag,
        mag_ir: scene.sources[0].mag_ir,
        closest_x: closest_src.map_or(SENTINEL, |s| s.shift[0]),
        closest_y: closest_src.map_or(SENTINEL, |s| s.shift[1]),
        closest_redshift: closest_sum.map_or(SENTINEL, |s| s.redshift),
        closest_moment_sigma: closest_sum.map_or(SENTINEL, |s| s.moment_sigma),
        closest_e1: closest_sum.map_or(SENTINEL, |s| s.e1),
        closest_e2: closest_sum.map_or(SENTINEL, |s| s.e2),
        closest_mag: closest_src.map_or(SENTINEL, |s| s.mag),
        closest_mag_ir: closest_src.map_or(SENTINEL, |s| s.mag_ir),
        blendedness_total_lsst: reference.blendedness[0],
        blendedness_closest_lsst: reference.blendedness[1],
        blendedness_aperture_lsst: reference.blendedness[2],
        idx_closest_to_peak: primary_idx,
        n_peak_detected: n_peak,
    }
}
