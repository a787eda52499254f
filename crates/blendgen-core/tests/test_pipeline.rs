mod common;

use blendgen_core::consts::{BAND_COUNT, REFERENCE_BAND};
use blendgen_core::error::BlendError;
use blendgen_core::pipeline::config::Population;
use blendgen_core::pipeline::{generate_parametric, METADATA_KEYS};

use common::{rng, test_catalog, test_config, test_survey, TEST_STAMP};

#[test]
fn test_output_shapes() {
    let survey = test_survey();
    let catalog = test_catalog(&survey);
    let config = test_config();
    let mut rng = rng(1);

    let record = generate_parametric(&catalog, &survey, &config, &mut rng).unwrap();
    assert_eq!(record.noiseless.dim(), (BAND_COUNT, TEST_STAMP, TEST_STAMP));
    assert_eq!(record.noisy.dim(), (BAND_COUNT, TEST_STAMP, TEST_STAMP));
    assert_eq!(record.shifts.dim(), (config.max_sources, 2));
}

#[test]
fn test_shift_table_padding() {
    let survey = test_survey();
    let catalog = test_catalog(&survey);
    let config = test_config();
    let mut rng = rng(2);

    let record = generate_parametric(&catalog, &survey, &config, &mut rng).unwrap();
    let n = record.metadata.nb_blended_gal;
    assert!(n >= 1 && n <= config.max_sources);
    for row in 0..config.max_sources {
        for col in 0..2 {
            let v = record.shifts[[row, col]];
            if row < n {
                assert!(v.is_finite(), "used shift row {row} must be finite");
            } else {
                assert!(v.is_nan(), "unused shift row {row} must hold the sentinel");
            }
        }
    }
}

#[test]
fn test_metadata_key_set() {
    assert_eq!(METADATA_KEYS.len(), 22);
    assert_eq!(METADATA_KEYS[0], "nb_blended_gal");
    assert_eq!(METADATA_KEYS[1], "SNR");
    assert_eq!(METADATA_KEYS[20], "idx_closest_to_peak");
    assert_eq!(METADATA_KEYS[21], "n_peak_detected");

    let survey = test_survey();
    let catalog = test_catalog(&survey);
    let config = test_config();
    let mut rng = rng(3);
    let record = generate_parametric(&catalog, &survey, &config, &mut rng).unwrap();
    let entries = record.metadata.entries();
    for (i, (key, _)) in entries.iter().enumerate() {
        assert_eq!(*key, METADATA_KEYS[i]);
    }
}

#[test]
fn test_no_detection_defaults() {
    let survey = test_survey();
    let catalog = test_catalog(&survey);
    let mut config = test_config();
    config.detect_peaks = false;
    let mut rng = rng(4);

    let record = generate_parametric(&catalog, &survey, &config, &mut rng).unwrap();
    assert_eq!(record.metadata.idx_closest_to_peak, 0);
    assert_eq!(record.metadata.n_peak_detected, 1);
}

#[test]
fn test_isolated_sentinels() {
    let survey = test_survey();
    let catalog = test_catalog(&survey);
    let mut config = test_config();
    config.population = Population::Isolated;
    config.max_sources = 1;
    let mut rng = rng(5);

    let record = generate_parametric(&catalog, &survey, &config, &mut rng).unwrap();
    let m = &record.metadata;
    assert_eq!(m.nb_blended_gal, 1);
    assert!(m.closest_x.is_nan());
    assert!(m.closest_y.is_nan());
    assert!(m.closest_redshift.is_nan());
    assert!(m.closest_mag.is_nan());
    assert!(m.blendedness_total_lsst.is_nan());
    assert!(m.blendedness_closest_lsst.is_nan());
    assert!(m.blendedness_aperture_lsst.is_nan());
    assert!(m.snr.is_finite() && m.snr > 0.0);
}

#[test]
fn test_blendedness_in_unit_interval() {
    let survey = test_survey();
    let catalog = test_catalog(&survey);
    let config = test_config();

    // Draw seeds until a genuinely blended sample comes out.
    let mut found = false;
    for seed in 0..40 {
        let mut rng = rng(100 + seed);
        let record = generate_parametric(&catalog, &survey, &config, &mut rng).unwrap();
        if record.metadata.nb_blended_gal > 1 {
            let b = record.metadata.blendedness_total_lsst;
            assert!((0.0..=1.0).contains(&b), "blendedness {b} out of range");
            let a = record.metadata.blendedness_aperture_lsst;
            assert!((0.0..=1.0).contains(&a), "aperture blendedness {a} out of range");
            found = true;
            break;
        }
    }
    assert!(found, "no blended sample in 40 seeds");
}

#[test]
fn test_primary_magnitude_under_cutoff() {
    let survey = test_survey();
    let catalog = test_catalog(&survey);
    let config = test_config();
    let mut rng = rng(6);

    let record = generate_parametric(&catalog, &survey, &config, &mut rng).unwrap();
    assert!(record.metadata.mag < config.magnitude_cutoff);
}

#[test]
fn test_impossible_cutoff_exhausts_attempts() {
    let survey = test_survey();
    let catalog = test_catalog(&survey);
    let mut config = test_config();
    config.magnitude_cutoff = 1.0;
    config.max_attempts = 3;
    let mut rng = rng(7);

    let err = generate_parametric(&catalog, &survey, &config, &mut rng).unwrap_err();
    assert!(matches!(err, BlendError::AttemptsExhausted { attempts: 3 }));
}

#[test]
fn test_same_seed_same_sample() {
    let survey = test_survey();
    let catalog = test_catalog(&survey);
    let config = test_config();

    let a = generate_parametric(&catalog, &survey, &config, &mut rng(11)).unwrap();
    let b = generate_parametric(&catalog, &survey, &config, &mut rng(11)).unwrap();
    assert_eq!(a.noisy, b.noisy);
    assert_eq!(a.noiseless, b.noiseless);
    assert_eq!(a.metadata.nb_blended_gal, b.metadata.nb_blended_gal);
    assert_eq!(a.metadata.snr, b.metadata.snr);
}

#[test]
fn test_isolated_stacks_agree_up_to_noise() {
    let survey = test_survey();
    let catalog = test_catalog(&survey);
    let mut config = test_config();
    config.population = Population::Isolated;
    config.max_sources = 1;
    config.detect_peaks = false;
    let mut rng = rng(12);

    let record = generate_parametric(&catalog, &survey, &config, &mut rng).unwrap();
    assert_eq!(record.metadata.nb_blended_gal, 1);
    let clean = record.noiseless.index_axis(ndarray::Axis(0), REFERENCE_BAND);
    let noisy = record.noisy.index_axis(ndarray::Axis(0), REFERENCE_BAND);
    assert_ne!(clean, noisy);

    // A single source: the blend is the noiseless stamp plus one Poisson
    // sky realization, so the totals agree within a few noise sigmas
    // (sigma of the total ~ sqrt(npix * sky) ~ 370 at sky 134).
    let diff = (noisy.sum() - clean.sum()).abs();
    assert!(diff < 3_000.0, "stack totals differ by {diff}");
}
