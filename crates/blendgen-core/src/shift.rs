//! Spatial offsetting of sources.
//!
//! Three policies: keep the source where it is (optionally re-applying a
//! previously computed offset), draw uniformly over a disk, or draw a
//! heavy-tailed radial profile with a uniform angle. Offsets are always in
//! arcseconds, the same unit the renderer's pixel scales are written in.

use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Gamma};
use serde::{Deserialize, Serialize};

use crate::scene::Source;

/// How a source is displaced from the stamp center.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShiftPolicy {
    /// No random draw: the offset is the supplied origin, or zero.
    NoShift,
    /// Uniform over the disk of radius `max_r` (uniform in area, not in
    /// radius).
    Uniform,
    /// Heavy-tailed (beta-prime) radius capped at `max_dx`, uniform angle.
    UniformBetaPrime,
}

/// Shape parameters of the beta-prime radial profile.
const BETA_PRIME_ALPHA: f64 = 2.0;
const BETA_PRIME_BETA: f64 = 3.0;

/// Draw an offset vector for one source.
///
/// `origin` is only consulted by [`ShiftPolicy::NoShift`]; it lets the
/// real-image path re-apply the exact offset its parametric sibling
/// received.
pub fn draw_offset(
    policy: ShiftPolicy,
    max_dx: f64,
    max_r: f64,
    origin: Option<[f64; 2]>,
    rng: &mut StdRng,
) -> [f64; 2] {
    match policy {
        ShiftPolicy::NoShift => origin.unwrap_or([0.0, 0.0]),
        ShiftPolicy::Uniform => {
            let r = max_r * rng.gen::<f64>().sqrt();
            let theta = rng.gen::<f64>() * std::f64::consts::TAU;
            [r * theta.cos(), r * theta.sin()]
        }
        ShiftPolicy::UniformBetaPrime => {
            // Beta-prime as a ratio of Gamma variates.
            let num = Gamma::new(BETA_PRIME_ALPHA, 1.0).expect("valid shape");
            let den = Gamma::new(BETA_PRIME_BETA, 1.0).expect("valid shape");
            let r = (num.sample(rng) / den.sample(rng)).min(max_dx);
            let theta = rng.gen::<f64>() * std::f64::consts::TAU;
            [r * theta.cos(), r * theta.sin()]
        }
    }
}

/// Apply a shift policy to a source's parametric profile, recording the
/// offset on the source. The real cutout, if any, is left untouched; the
/// real-image path re-applies offsets to cutouts explicitly.
pub fn shift_source(
    mut source: Source,
    policy: ShiftPolicy,
    max_dx: f64,
    max_r: f64,
    origin: Option<[f64; 2]>,
    rng: &mut StdRng,
) -> (Source, [f64; 2]) {
    let offset = draw_offset(policy, max_dx, max_r, origin, rng);
    source.profile = source.profile.shifted(offset[0], offset[1]);
    source.shift = [source.shift[0] + offset[0], source.shift[1] + offset[1]];
    (source, offset)
}

/// Re-apply an already-computed offset to a source's real cutout.
pub fn apply_cutout_offset(source: &mut Source, offset: [f64; 2]) {
    if let Some(cutout) = &source.cutout {
        source.cutout = Some(cutout.shifted(offset[0], offset[1]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn noshift_returns_origin_exactly() {
        let mut rng = StdRng::seed_from_u64(1);
        let a = draw_offset(ShiftPolicy::NoShift, 3.2, 2.0, Some([0.7, -1.1]), &mut rng);
        let b = draw_offset(ShiftPolicy::NoShift, 3.2, 2.0, Some([0.7, -1.1]), &mut rng);
        assert_eq!(a, [0.7, -1.1]);
        assert_eq!(a, b);
        let zero = draw_offset(ShiftPolicy::NoShift, 3.2, 2.0, None, &mut rng);
        assert_eq!(zero, [0.0, 0.0]);
    }

    #[test]
    fn uniform_stays_inside_the_disk() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..1_000 {
            let [dx, dy] = draw_offset(ShiftPolicy::Uniform, 3.2, 2.0, None, &mut rng);
            assert!(dx * dx + dy * dy <= 2.0 * 2.0 + 1e-12);
        }
    }

    #[test]
    fn beta_prime_is_capped() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1_000 {
            let [dx, dy] = draw_offset(ShiftPolicy::UniformBetaPrime, 1.5, 2.0, None, &mut rng);
            let r = (dx * dx + dy * dy).sqrt();
            assert!(r <= 1.5 + 1e-12, "radius {r} exceeds cap");
        }
    }
}
