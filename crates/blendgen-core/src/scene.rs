//! Scene model: sampled sources and their applied offsets.
//!
//! A [`Source`] carries everything the pipeline knows about one sampled
//! galaxy (profile, optional real cutout, magnitudes, applied shift) in a
//! single record, so reordering or recentering a scene can never
//! desynchronize parallel arrays.

use ndarray::Array2;

use crate::consts::SENTINEL;
use crate::cutout::RealCutout;
use crate::profile::GalaxyProfile;

/// One sampled galaxy.
#[derive(Clone, Debug)]
pub struct Source {
    /// Catalog index the source was drawn from.
    pub index: usize,
    /// Parametric representation (always present).
    pub profile: GalaxyProfile,
    /// Real-image representation, present on the real-image path.
    pub cutout: Option<RealCutout>,
    /// Reference-band (r) magnitude.
    pub mag: f64,
    /// Infrared (H) magnitude.
    pub mag_ir: f64,
    /// Whether the catalog redshift can be trusted when the source is used
    /// through its real-image representation.
    pub redshift_reliable: bool,
    /// Offset applied by the shift engine, arcsec.
    pub shift: [f64; 2],
}

/// An ordered set of sources; index 0 is the designated primary after
/// brightest-first reordering.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub sources: Vec<Source>,
}

impl Scene {
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Move the brightest (lowest magnitude) source to index 0, keeping
    /// the relative order of the rest.
    pub fn reorder_brightest(&mut self) {
        if self.sources.len() < 2 {
            return;
        }
        let brightest = self
            .sources
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.mag.total_cmp(&b.mag))
            .map(|(i, _)| i)
            .unwrap_or(0);
        let src = self.sources.remove(brightest);
        self.sources.insert(0, src);
    }

    /// Translate every source (profile and recorded shift) by minus
    /// `center`, re-expressing the scene around a detected peak.
    ///
    /// Cutouts are left untouched: the real-image path positions them in
    /// one step by re-applying the final per-source shift, so translating
    /// them here would move them twice.
    pub fn recenter(&mut self, center: [f64; 2]) {
        for src in &mut self.sources {
            src.profile = src.profile.shifted(-center[0], -center[1]);
            src.shift[0] -= center[0];
            src.shift[1] -= center[1];
        }
    }

    /// Index of the neighbor (excluding `exclude`) whose offset lies
    /// closest to `point` in arcsec. `None` for single-source scenes.
    pub fn closest_to(&self, point: [f64; 2], exclude: usize) -> Option<usize> {
        self.sources
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != exclude)
            .min_by(|(_, a), (_, b)| {
                dist2(a.shift, point).total_cmp(&dist2(b.shift, point))
            })
            .map(|(i, _)| i)
    }

    /// Shift table of shape `(max_sources, 2)`; rows past the scene length
    /// hold the sentinel.
    pub fn shift_table(&self, max_sources: usize) -> Array2<f64> {
        let mut table = Array2::from_elem((max_sources, 2), SENTINEL);
        for (i, src) in self.sources.iter().enumerate().take(max_sources) {
            table[[i, 0]] = src.shift[0];
            table[[i, 1]] = src.shift[1];
        }
        table
    }
}

fn dist2(a: [f64; 2], b: [f64; 2]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx * dx + dy * dy
}
