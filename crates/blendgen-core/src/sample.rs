//! Catalog sampling: index draw, magnitude selection, random orientation.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::consts::{IR_BAND, REFERENCE_BAND};
use crate::error::Result;
use crate::scene::Source;
use crate::survey::Survey;

/// Which representation(s) of a catalog object a sample uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceMode {
    /// Parametric model only.
    Parametric,
    /// Parametric model plus the real-image cutout for the same index.
    Real,
}

/// Draw one catalog object and apply the magnitude cut.
///
/// The index comes uniformly from `allowed` when given, else from the full
/// catalog extent. Returns `Ok(None)` when the object's reference-band
/// magnitude is at or above `mag_cut`; retrying is the caller's job.
/// Accepted sources get one uniform rotation in [0, 2pi).
pub fn sample_source(
    catalog: &dyn Catalog,
    survey: &Survey,
    allowed: Option<&[usize]>,
    mode: SourceMode,
    mag_cut: f64,
    stamp_size: usize,
    rng: &mut StdRng,
) -> Result<Option<Source>> {
    let index = match allowed {
        Some(indices) if !indices.is_empty() => indices[rng.gen_range(0..indices.len())],
        _ => rng.gen_range(0..catalog.len()),
    };

    let profile = catalog.parametric(index)?;
    let mag = profile.magnitude(REFERENCE_BAND, survey.reference_band());
    if !(mag < mag_cut) {
        return Ok(None);
    }

    let theta = rng.gen::<f64>() * std::f64::consts::TAU;
    let profile = profile.rotated(theta);
    let mag_ir = profile.magnitude(IR_BAND, survey.ir_band());

    let cutout = match mode {
        SourceMode::Parametric => None,
        SourceMode::Real => Some(catalog.real(index, stamp_size)?),
    };

    Ok(Some(Source {
        index,
        profile,
        cutout,
        mag,
        mag_ir,
        redshift_reliable: catalog.redshift_reliable(index),
        shift: [0.0, 0.0],
    }))
}
