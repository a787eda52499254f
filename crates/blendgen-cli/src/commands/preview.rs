use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use blendgen_core::catalog::SyntheticCatalog;
use blendgen_core::consts::REFERENCE_BAND;
use blendgen_core::io::save_stamp_png;
use blendgen_core::pipeline::config::{GenerateConfig, Population};
use blendgen_core::pipeline::{generate_parametric, generate_real};
use blendgen_core::sample::SourceMode;
use blendgen_core::survey::Survey;

use super::{ModeArg, PopulationArg, ShiftPolicyArg};

#[derive(Args)]
pub struct PreviewArgs {
    /// Output directory for the PNGs
    pub out_dir: PathBuf,

    /// Galaxy representation
    #[arg(long, value_enum, default_value = "parametric")]
    pub mode: ModeArg,

    /// Isolated or blended scene
    #[arg(long, value_enum, default_value = "blended")]
    pub population: PopulationArg,

    /// Shift policy for the neighbor sources
    #[arg(long, value_enum, default_value = "uniform")]
    pub shift: ShiftPolicyArg,

    /// Output stamp size in pixels
    #[arg(long, default_value = "64")]
    pub stamp: usize,

    /// RNG seed
    #[arg(long, default_value = "0")]
    pub seed: u64,
}

pub fn run(args: &PreviewArgs) -> Result<()> {
    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;

    let survey = Survey::lsst_euclid();
    let catalog = SyntheticCatalog::new(2_000, args.seed, &survey);
    let population: Population = args.population.into();
    let config = GenerateConfig {
        population,
        max_sources: if population == Population::Isolated { 1 } else { 4 },
        other_shift_policy: args.shift.into(),
        stamp_size: args.stamp,
        ..Default::default()
    };

    let mut rng = StdRng::seed_from_u64(args.seed);
    let record = match args.mode.into() {
        SourceMode::Parametric => generate_parametric(&catalog, &survey, &config, &mut rng)?,
        SourceMode::Real => generate_real(&catalog, &survey, &config, &mut rng)?,
    };

    let noisy = record.noisy.index_axis(ndarray::Axis(0), REFERENCE_BAND);
    let noiseless = record.noiseless.index_axis(ndarray::Axis(0), REFERENCE_BAND);
    save_stamp_png(&noisy.to_owned(), &args.out_dir.join("blend_noisy.png"))?;
    save_stamp_png(&noiseless.to_owned(), &args.out_dir.join("primary_noiseless.png"))?;

    info!(
        n_sources = record.metadata.nb_blended_gal,
        n_peaks = record.metadata.n_peak_detected,
        "preview sample generated"
    );
    println!("Sources:   {}", record.metadata.nb_blended_gal);
    println!("Peaks:     {}", record.metadata.n_peak_detected);
    println!("SNR:       {:.2}", record.metadata.snr);
    println!("Wrote blend_noisy.png and primary_noiseless.png to {}", args.out_dir.display());
    Ok(())
}
