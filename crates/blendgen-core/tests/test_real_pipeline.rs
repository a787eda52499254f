mod common;

use ndarray::Array2;

use blendgen_core::catalog::Catalog;
use blendgen_core::consts::{BAND_COUNT, REFERENCE_BAND};
use blendgen_core::pipeline::config::Population;
use blendgen_core::pipeline::generate_real;
use blendgen_core::scene::{Scene, Source};
use blendgen_core::shift::{apply_cutout_offset, draw_offset, shift_source, ShiftPolicy};

use common::{rng, test_catalog, test_config, test_survey, TEST_STAMP};

fn centroid(stamp: &ndarray::ArrayView2<f64>) -> (f64, f64) {
    let (mut m0, mut mr, mut mc) = (0.0f64, 0.0f64, 0.0f64);
    for ((r, c), v) in stamp.indexed_iter() {
        let w = v.max(0.0);
        m0 += w;
        mr += w * r as f64;
        mc += w * c as f64;
    }
    (mr / m0, mc / m0)
}

#[test]
fn test_real_output_shapes() {
    let survey = test_survey();
    let catalog = test_catalog(&survey);
    let config = test_config();
    let mut rng = rng(1);

    let record = generate_real(&catalog, &survey, &config, &mut rng).unwrap();
    assert_eq!(record.noiseless.dim(), (BAND_COUNT, TEST_STAMP, TEST_STAMP));
    assert_eq!(record.noisy.dim(), (BAND_COUNT, TEST_STAMP, TEST_STAMP));
    assert!(record.noiseless.iter().all(|v| v.is_finite()));
    assert!(record.noisy.iter().all(|v| v.is_finite()));
}

#[test]
fn test_real_centered_source_stays_centered() {
    let survey = test_survey();
    let catalog = test_catalog(&survey);
    let mut config = test_config();
    config.population = Population::Isolated;
    config.max_sources = 1;
    config.detect_peaks = false;
    config.first_shift_policy = ShiftPolicy::NoShift;
    let mut rng = rng(2);

    let record = generate_real(&catalog, &survey, &config, &mut rng).unwrap();
    let stamp = record.noiseless.index_axis(ndarray::Axis(0), REFERENCE_BAND);

    let (row, col) = centroid(&stamp);
    let center = (TEST_STAMP as f64 - 1.0) / 2.0;
    assert!((row - center).abs() < 1.0, "row centroid {row}");
    assert!((col - center).abs() < 1.0, "col centroid {col}");
}

#[test]
fn test_recentered_cutout_tracks_parametric_sibling() {
    let survey = test_survey();
    let catalog = test_catalog(&survey);
    let band = survey.reference_band();
    let mut rng = rng(5);

    let source = Source {
        index: 3,
        profile: catalog.parametric(3).unwrap(),
        cutout: Some(catalog.real(3, TEST_STAMP).unwrap()),
        mag: 22.0,
        mag_ir: 21.5,
        redshift_reliable: true,
        shift: [0.0, 0.0],
    };

    // Offset the source, re-express the scene around a detected peak,
    // then position the cutout by re-applying the final shift once.
    let (shifted, _) = shift_source(
        source,
        ShiftPolicy::NoShift,
        3.2,
        2.0,
        Some([1.0, 0.3]),
        &mut rng,
    );
    let mut scene = Scene { sources: vec![shifted] };
    scene.recenter([0.4, -0.2]);

    let src = &mut scene.sources[0];
    let offset = draw_offset(ShiftPolicy::NoShift, 3.2, 2.0, Some(src.shift), &mut rng);
    apply_cutout_offset(src, offset);
    let cutout = src.cutout.as_ref().unwrap();
    assert_eq!(cutout.offset, src.profile.offset);

    let param: Array2<f64> = src.profile.draw(REFERENCE_BAND, band, TEST_STAMP);
    let real: Array2<f64> = cutout.draw(band, TEST_STAMP);
    let (pr, pc) = centroid(&param.view());
    let (rr, rc) = centroid(&real.view());
    assert!(
        (pr - rr).abs() < 1.0 && (pc - rc).abs() < 1.0,
        "real centroid ({rr:.2}, {rc:.2}) vs parametric ({pr:.2}, {pc:.2})"
    );
}

#[test]
fn test_real_detection_keeps_primary_centered() {
    let survey = test_survey();
    let catalog = test_catalog(&survey);
    let mut config = test_config();
    config.population = Population::Isolated;
    config.max_sources = 1;
    config.detect_peaks = true;
    config.first_shift_policy = ShiftPolicy::Uniform;
    let mut rng = rng(6);

    // Detection re-centers the scene on the primary's peak, so the real
    // noiseless stamp must end up centered no matter where the shift
    // policy put the source.
    let record = generate_real(&catalog, &survey, &config, &mut rng).unwrap();
    let stamp = record.noiseless.index_axis(ndarray::Axis(0), REFERENCE_BAND);
    let (row, col) = centroid(&stamp);
    let center = (TEST_STAMP as f64 - 1.0) / 2.0;
    assert!((row - center).abs() < 1.5, "row centroid {row}");
    assert!((col - center).abs() < 1.5, "col centroid {col}");
}

#[test]
fn test_real_metadata_snr_positive() {
    let survey = test_survey();
    let catalog = test_catalog(&survey);
    let config = test_config();
    let mut rng = rng(3);

    let record = generate_real(&catalog, &survey, &config, &mut rng).unwrap();
    assert!(record.metadata.snr.is_finite() && record.metadata.snr > 0.0);
    assert!(record.metadata.snr_peak.is_finite() && record.metadata.snr_peak > 0.0);
}

#[test]
fn test_real_same_seed_same_sample() {
    let survey = test_survey();
    let catalog = test_catalog(&survey);
    let config = test_config();

    let a = generate_real(&catalog, &survey, &config, &mut rng(9)).unwrap();
    let b = generate_real(&catalog, &survey, &config, &mut rng(9)).unwrap();
    assert_eq!(a.noisy, b.noisy);
    assert_eq!(a.metadata.nb_blended_gal, b.metadata.nb_blended_gal);
}
