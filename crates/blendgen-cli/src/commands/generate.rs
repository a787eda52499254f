use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::{info, warn};

use blendgen_core::catalog::SyntheticCatalog;
use blendgen_core::io::{write_metadata_csv, write_shifts_csv, write_stacks};
use blendgen_core::pipeline::config::{GenerateConfig, Population, Split};
use blendgen_core::pipeline::{generate_parametric, generate_real, SampleRecord};
use blendgen_core::sample::SourceMode;
use blendgen_core::survey::Survey;

use super::{ModeArg, PopulationArg, ShiftPolicyArg, SplitArg};

#[derive(Args)]
pub struct GenerateArgs {
    /// Output directory
    pub out_dir: PathBuf,

    /// Run config file (TOML); overrides the sampling flags below
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Galaxy representation for the output stacks
    #[arg(long, value_enum, default_value = "parametric")]
    pub mode: ModeArg,

    /// Which catalog split to draw from
    #[arg(long, value_enum, default_value = "training")]
    pub split: SplitArg,

    /// Isolated or blended scenes
    #[arg(long, value_enum, default_value = "blended")]
    pub population: PopulationArg,

    /// Shift policy for the neighbor sources
    #[arg(long, value_enum, default_value = "uniform")]
    pub shift: ShiftPolicyArg,

    /// Disable peak detection and recentering
    #[arg(long)]
    pub no_detect: bool,

    /// Number of files to produce
    #[arg(long, default_value = "1")]
    pub files: usize,

    /// Samples per file
    #[arg(long, default_value = "100")]
    pub per_file: usize,

    /// Maximum sources per scene
    #[arg(long, default_value = "4")]
    pub max_sources: usize,

    /// Full-pipeline attempts per sample
    #[arg(long, default_value = "100")]
    pub max_attempts: usize,

    /// Reference-band magnitude cut
    #[arg(long, default_value = "27.5")]
    pub mag_cut: f64,

    /// Output stamp size in pixels
    #[arg(long, default_value = "64")]
    pub stamp: usize,

    /// Synthetic catalog size
    #[arg(long, default_value = "20000")]
    pub catalog_size: usize,

    /// Base RNG seed; each sample derives its own stream from it
    #[arg(long, default_value = "0")]
    pub seed: u64,

    /// File name root
    #[arg(long, default_value = "galaxies")]
    pub root: String,
}

pub fn run(args: &GenerateArgs) -> Result<()> {
    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;

    let survey = Survey::lsst_euclid();
    let catalog = SyntheticCatalog::new(args.catalog_size, args.seed, &survey);
    let config = if let Some(ref config_path) = args.config {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("reading config {}", config_path.display()))?;
        toml::from_str(&contents).context("invalid run config")?
    } else {
        build_config(args)
    };
    config.validate()?;

    let mode: SourceMode = args.mode.into();
    info!(
        files = args.files,
        per_file = args.per_file,
        ?mode,
        "starting batch generation"
    );

    for file_idx in 0..args.files {
        let pb = ProgressBar::new(args.per_file as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("File {msg} [{bar:40}] {pos}/{len}")?
                .progress_chars("=> "),
        );
        pb.set_message(format!("{file_idx}"));

        // One independently seeded RNG stream per sample, so parallel
        // workers never share state.
        let samples: Vec<SampleRecord> = (0..args.per_file)
            .into_par_iter()
            .filter_map(|i| {
                let stream = (file_idx * args.per_file + i) as u64;
                let mut rng = StdRng::seed_from_u64(args.seed.wrapping_add(stream << 1 | 1));
                let result = match mode {
                    SourceMode::Parametric => {
                        generate_parametric(&catalog, &survey, &config, &mut rng)
                    }
                    SourceMode::Real => generate_real(&catalog, &survey, &config, &mut rng),
                };
                pb.inc(1);
                match result {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!(sample = i, error = %e, "dropping failed sample");
                        None
                    }
                }
            })
            .collect();
        pb.finish();

        let root = format!("{}_{}", args.root, file_idx);
        write_stacks(&samples, &args.out_dir.join(format!("{root}_images.bin")))?;
        write_metadata_csv(&samples, &args.out_dir.join(format!("{root}_data.csv")))?;
        write_shifts_csv(&samples, &args.out_dir.join(format!("{root}_shifts.csv")))?;
        info!(
            file = file_idx,
            written = samples.len(),
            "file complete"
        );
    }

    println!(
        "Wrote {} file(s) to {}",
        args.files,
        args.out_dir.display()
    );
    Ok(())
}

fn build_config(args: &GenerateArgs) -> GenerateConfig {
    let split: Split = args.split.into();
    let population: Population = args.population.into();

    // Reserve the first quarter of the catalog for the test split, the
    // rest for training and validation.
    let holdout = args.catalog_size / 4;
    let allowed_indices = Some(match split {
        Split::Test => (0..holdout).collect(),
        Split::Training | Split::Validation => (holdout..args.catalog_size).collect(),
    });

    GenerateConfig {
        split,
        population,
        allowed_indices,
        max_sources: if population == Population::Isolated {
            1
        } else {
            args.max_sources
        },
        max_attempts: args.max_attempts,
        magnitude_cutoff: args.mag_cut,
        other_shift_policy: args.shift.into(),
        detect_peaks: !args.no_detect,
        stamp_size: args.stamp,
        ..Default::default()
    }
}
