use rand::rngs::StdRng;
use rand::SeedableRng;

use blendgen_core::catalog::SyntheticCatalog;
use blendgen_core::pipeline::config::GenerateConfig;
use blendgen_core::survey::Survey;

pub const TEST_STAMP: usize = 32;

pub fn test_survey() -> Survey {
    Survey::lsst_euclid()
}

/// A small deterministic catalog shared by the pipeline tests.
pub fn test_catalog(survey: &Survey) -> SyntheticCatalog {
    SyntheticCatalog::new(500, 7, survey)
}

/// Default config shrunk to a fast stamp size.
pub fn test_config() -> GenerateConfig {
    GenerateConfig {
        stamp_size: TEST_STAMP,
        max_attempts: 50,
        ..Default::default()
    }
}

pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}
