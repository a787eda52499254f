//! Catalog access seam.
//!
//! The pipeline only ever talks to a [`Catalog`]: object count, parametric
//! profile per index, real-image cutout per index. The production COSMOS
//! FITS reader lives behind this trait; [`SyntheticCatalog`] is the
//! in-repo implementation used by the CLI demos and the test suite.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::consts::BAND_COUNT;
use crate::cutout::RealCutout;
use crate::error::{BlendError, Result};
use crate::profile::GalaxyProfile;
use crate::survey::Survey;

/// Read-only galaxy catalog. Implementations must be shareable across
/// worker threads.
pub trait Catalog: Send + Sync {
    /// Number of objects in the catalog.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build the parametric model for one object.
    fn parametric(&self, index: usize) -> Result<GalaxyProfile>;

    /// Build the real-image cutout for one object, padded enough to cover
    /// a `stamp_size` output stamp after shifting.
    fn real(&self, index: usize, stamp_size: usize) -> Result<RealCutout>;

    /// Whether the catalog redshift for one object is trustworthy when the
    /// object is used through its real-image representation.
    fn redshift_reliable(&self, index: usize) -> bool;
}

/// Native pixel scale of synthetic cutouts, arcsec/pixel. Finer than any
/// survey band, as a space-based source image would be.
const CUTOUT_PIXEL_SCALE: f64 = 0.1;

#[derive(Clone, Debug)]
struct SyntheticObject {
    band_flux: [f64; BAND_COUNT],
    half_light_radius: f64,
    e1: f64,
    e2: f64,
    redshift: f64,
    redshift_reliable: bool,
}

/// Seeded catalog of plausible galaxies, deterministic per (size, seed).
pub struct SyntheticCatalog {
    objects: Vec<SyntheticObject>,
}

impl SyntheticCatalog {
    /// Draw `n` objects with magnitudes, colors, sizes and shapes spread
    /// over realistic ranges against `survey`'s zero-points.
    pub fn new(n: usize, seed: u64, survey: &Survey) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let ref_zp = survey.reference_band().zeropoint;

        let objects = (0..n)
            .map(|_| {
                // Faint-end weighted magnitude distribution.
                let mag_r: f64 = 20.0 + 8.5 * rng.gen::<f64>().sqrt();
                let flux_r = 10f64.powf(-0.4 * (mag_r - ref_zp));

                let mut band_flux = [0.0; BAND_COUNT];
                for (i, flux) in band_flux.iter_mut().enumerate() {
                    // Color offset relative to r, in magnitudes.
                    let color: f64 = rng.gen_range(-0.5..0.5);
                    let zp = survey.bands[i].zeropoint;
                    *flux = flux_r * 10f64.powf(-0.4 * (color + ref_zp - zp));
                }

                let e_mod: f64 = rng.gen_range(0.0..0.6);
                let angle: f64 = rng.gen_range(0.0..std::f64::consts::PI);
                SyntheticObject {
                    band_flux,
                    half_light_radius: rng.gen_range(0.15..1.0),
                    e1: e_mod * (2.0 * angle).cos(),
                    e2: e_mod * (2.0 * angle).sin(),
                    redshift: rng.gen_range(0.0..3.0),
                    redshift_reliable: rng.gen::<f64>() < 0.8,
                }
            })
            .collect();

        Self { objects }
    }

    fn object(&self, index: usize) -> Result<&SyntheticObject> {
        self.objects.get(index).ok_or(BlendError::IndexOutOfRange {
            index,
            total: self.objects.len(),
        })
    }
}

impl Catalog for SyntheticCatalog {
    fn len(&self) -> usize {
        self.objects.len()
    }

    fn parametric(&self, index: usize) -> Result<GalaxyProfile> {
        let obj = self.object(index)?;
        Ok(GalaxyProfile {
            band_flux: obj.band_flux,
            half_light_radius: obj.half_light_radius,
            e1: obj.e1,
            e2: obj.e2,
            offset: [0.0, 0.0],
            redshift: obj.redshift,
        })
    }

    fn real(&self, index: usize, stamp_size: usize) -> Result<RealCutout> {
        let profile = self.parametric(index)?;
        // Cover the output stamp at the widest band scale plus shift room.
        let size = (stamp_size as f64 * 0.3 / CUTOUT_PIXEL_SCALE).ceil() as usize | 1;
        let mut data = profile.draw_unconvolved(crate::consts::REFERENCE_BAND, CUTOUT_PIXEL_SCALE, size);
        // Small pedestal so baseline subtraction has something to remove.
        let pedestal = profile.band_flux[crate::consts::REFERENCE_BAND] * 1e-5;
        data.mapv_inplace(|v| v + pedestal);
        Ok(RealCutout {
            data,
            pixel_scale: CUTOUT_PIXEL_SCALE,
            offset: [0.0, 0.0],
        })
    }

    fn redshift_reliable(&self, index: usize) -> bool {
        self.objects
            .get(index)
            .map(|o| o.redshift_reliable)
            .unwrap_or(false)
    }
}
