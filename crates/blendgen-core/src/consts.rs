/// Number of photometric bands in every image stack (Euclid VIS/Y/J/H +
/// LSST u/g/r/i/z/y).
pub const BAND_COUNT: usize = 10;

/// Index of the reference band (LSST r) in the fixed band ordering.
pub const REFERENCE_BAND: usize = 6;

/// Index of the infrared reference band (Euclid H) used for `mag_ir`.
pub const IR_BAND: usize = 3;

/// AB zero-point of the LSST r band used for the magnitude cut and for all
/// reported magnitudes.
pub const ZEROPOINT_R: f64 = 28.13;

/// AB zero-point of the Euclid H band used for `mag_ir`.
pub const ZEROPOINT_H: f64 = 24.92;

/// Maximum distance (arcsec) between the best detected peak and the primary
/// source's true offset before detection is declared failed.
pub const PEAK_DIST_CUT: f64 = 0.65 / 2.0;

/// Minimum separation (pixels) enforced between detected peaks.
pub const PEAK_MIN_SEPARATION: usize = 4;

/// Peak detection runs on a detection stamp this many times the final
/// stamp size.
pub const DETECTION_STAMP_FACTOR: usize = 2;

/// Maximum catalog index draws per accepted source before sampling is
/// declared exhausted.
pub const SAMPLING_DRAW_LIMIT: usize = 1_000;

/// Value stored in unused shift-table rows and in `closest_*` metadata
/// fields when no second source exists. NaN rather than zero: zero is a
/// legal offset.
pub const SENTINEL: f64 = f64::NAN;

/// Ratio of half-light radius to Gaussian sigma for a circular Gaussian
/// profile (sqrt(2 ln 2)).
pub const HLR_TO_SIGMA: f64 = 1.177_410_022_515_474_6;

/// Total cutout flux below this is treated as numerically degenerate
/// during real-image flux rescaling.
pub const MIN_CUTOUT_FLUX: f64 = 1e-9;

/// Aperture radius for `blendedness_aperture`, in units of the measured
/// moment sigma.
pub const APERTURE_SIGMA_FACTOR: f64 = 2.0;

/// Maximum iterations for the adaptive-moments fixed point.
pub const MOMENTS_MAX_ITER: usize = 100;

/// Relative convergence tolerance for the adaptive-moments fixed point.
pub const MOMENTS_TOL: f64 = 1e-6;
