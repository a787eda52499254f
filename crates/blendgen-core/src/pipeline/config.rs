use serde::{Deserialize, Serialize};

use crate::shift::ShiftPolicy;

/// Which part of the catalog a run draws from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Split {
    Training,
    Validation,
    Test,
}

/// Whether scenes hold one source or up to `max_sources`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Population {
    Isolated,
    Blended,
}

/// Everything one call to the sample generators needs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerateConfig {
    pub split: Split,
    pub population: Population,
    /// Restrict catalog draws to these indices (e.g. a train/test split).
    #[serde(default)]
    pub allowed_indices: Option<Vec<usize>>,
    /// Maximum number of sources per scene (`nmax_blend`).
    pub max_sources: usize,
    /// Full-pipeline attempts before giving up on a sample.
    pub max_attempts: usize,
    /// Sources at or above this reference-band magnitude are rejected.
    pub magnitude_cutoff: f64,
    /// Shift policy for the source at index 0.
    pub first_shift_policy: ShiftPolicy,
    /// Shift policy for every other source.
    pub other_shift_policy: ShiftPolicy,
    /// Radius cap (arcsec) for the heavy-tailed shift policy.
    pub max_offset_magnitude: f64,
    /// Disk radius (arcsec) for the uniform shift policy.
    pub max_offset_radius: f64,
    /// Run peak detection on the blended detection stamp and re-center on
    /// the detected peak.
    pub detect_peaks: bool,
    /// Put the brightest source at index 0 before shifting.
    pub prefer_brightest: bool,
    /// Output stamp side length, pixels.
    pub stamp_size: usize,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            split: Split::Training,
            population: Population::Blended,
            allowed_indices: None,
            max_sources: 4,
            max_attempts: 3,
            magnitude_cutoff: 27.5,
            first_shift_policy: ShiftPolicy::NoShift,
            other_shift_policy: ShiftPolicy::Uniform,
            max_offset_magnitude: 3.2,
            max_offset_radius: 2.0,
            detect_peaks: true,
            prefer_brightest: true,
            stamp_size: 64,
        }
    }
}

impl GenerateConfig {
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.max_sources == 0 {
            return Err(crate::error::BlendError::Config(
                "max_sources must be at least 1".into(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(crate::error::BlendError::Config(
                "max_attempts must be at least 1".into(),
            ));
        }
        if self.stamp_size < 8 {
            return Err(crate::error::BlendError::Config(format!(
                "stamp_size {} too small",
                self.stamp_size
            )));
        }
        Ok(())
    }
}
