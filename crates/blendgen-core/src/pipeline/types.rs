use ndarray::{Array2, Array3};

/// The fixed metadata key set, in output column order. Every generated
/// sample carries exactly these keys.
pub const METADATA_KEYS: [&str; 22] = [
    "nb_blended_gal",
    "SNR",
    "SNR_peak",
    "redshift",
    "moment_sigma",
    "e1",
    "e2",
    "mag",
    "mag_ir",
    "closest_x",
    "closest_y",
    "closest_redshift",
    "closest_moment_sigma",
    "closest_e1",
    "closest_e2",
    "closest_mag",
    "closest_mag_ir",
    "blendedness_total_lsst",
    "blendedness_closest_lsst",
    "blendedness_aperture_lsst",
    "idx_closest_to_peak",
    "n_peak_detected",
];

/// Scalar ground truth for one sample. `closest_*` and `blendedness_*`
/// fields hold the NaN sentinel in single-source scenes.
#[derive(Clone, Copy, Debug)]
pub struct SampleMetadata {
    pub nb_blended_gal: usize,
    pub snr: f64,
    pub snr_peak: f64,
    pub redshift: f64,
    pub moment_sigma: f64,
    pub e1: f64,
    pub e2: f64,
    pub mag: f64,
    pub mag_ir: f64,
    pub closest_x: f64,
    pub closest_y: f64,
    pub closest_redshift: f64,
    pub closest_moment_sigma: f64,
    pub closest_e1: f64,
    pub closest_e2: f64,
    pub closest_mag: f64,
    pub closest_mag_ir: f64,
    pub blendedness_total_lsst: f64,
    pub blendedness_closest_lsst: f64,
    pub blendedness_aperture_lsst: f64,
    pub idx_closest_to_peak: usize,
    pub n_peak_detected: usize,
}

impl SampleMetadata {
    /// Key/value pairs in [`METADATA_KEYS`] order.
    pub fn entries(&self) -> [(&'static str, f64); 22] {
        [
            ("nb_blended_gal", self.nb_blended_gal as f64),
            ("SNR", self.snr),
            ("SNR_peak", self.snr_peak),
            ("redshift", self.redshift),
            ("moment_sigma", self.moment_sigma),
            ("e1", self.e1),
            ("e2", self.e2),
            ("mag", self.mag),
            ("mag_ir", self.mag_ir),
            ("closest_x", self.closest_x),
            ("closest_y", self.closest_y),
            ("closest_redshift", self.closest_redshift),
            ("closest_moment_sigma", self.closest_moment_sigma),
            ("closest_e1", self.closest_e1),
            ("closest_e2", self.closest_e2),
            ("closest_mag", self.closest_mag),
            ("closest_mag_ir", self.closest_mag_ir),
            ("blendedness_total_lsst", self.blendedness_total_lsst),
            ("blendedness_closest_lsst", self.blendedness_closest_lsst),
            ("blendedness_aperture_lsst", self.blendedness_aperture_lsst),
            ("idx_closest_to_peak", self.idx_closest_to_peak as f64),
            ("n_peak_detected", self.n_peak_detected as f64),
        ]
    }
}

/// One generated sample: the primary source's noiseless stack, the noisy
/// blend stack, scalar metadata and the per-source shift table.
#[derive(Clone, Debug)]
pub struct SampleRecord {
    /// Shape (bands, stamp, stamp).
    pub noiseless: Array3<f64>,
    /// Shape (bands, stamp, stamp).
    pub noisy: Array3<f64>,
    pub metadata: SampleMetadata,
    /// Shape (max_sources, 2), arcsec; unused rows hold the sentinel.
    pub shifts: Array2<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_match_key_order() {
        let meta = SampleMetadata {
            nb_blended_gal: 2,
            snr: 1.0,
            snr_peak: 2.0,
            redshift: 0.5,
            moment_sigma: 1.5,
            e1: 0.1,
            e2: -0.1,
            mag: 23.0,
            mag_ir: 22.5,
            closest_x: 0.3,
            closest_y: -0.4,
            closest_redshift: 0.7,
            closest_moment_sigma: 1.1,
            closest_e1: 0.0,
            closest_e2: 0.0,
            closest_mag: 24.2,
            closest_mag_ir: 23.8,
            blendedness_total_lsst: 0.2,
            blendedness_closest_lsst: 0.15,
            blendedness_aperture_lsst: 0.1,
            idx_closest_to_peak: 0,
            n_peak_detected: 2,
        };
        let entries = meta.entries();
        assert_eq!(entries.len(), METADATA_KEYS.len());
        for (entry, key) in entries.iter().zip(METADATA_KEYS.iter()) {
            assert_eq!(entry.0, *key);
        }
    }
}
