use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use blendgen_core::pipeline::config::GenerateConfig;
use blendgen_core::survey::Survey;

#[derive(Args)]
pub struct InfoArgs {
    /// Also write the default run configuration as TOML
    #[arg(long)]
    pub write_config: Option<PathBuf>,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let survey = Survey::lsst_euclid();

    println!("Survey bands ({}):", survey.bands.len());
    println!(
        "{:>3}  {:<4} {:>8} {:>8} {:>10} {:>7} {:>7}",
        "idx", "band", "scale", "psf", "sky", "coeff", "zp"
    );
    for (i, band) in survey.bands.iter().enumerate() {
        println!(
            "{:>3}  {:<4} {:>8.2} {:>8.3} {:>10.2} {:>7.2} {:>7.2}",
            i,
            band.name,
            band.pixel_scale,
            band.psf_sigma,
            band.sky_level,
            band.exposure_coeff,
            band.zeropoint
        );
    }

    let config = GenerateConfig::default();
    let toml = toml::to_string_pretty(&config).context("serializing default configuration")?;
    if let Some(path) = &args.write_config {
        std::fs::write(path, &toml).with_context(|| format!("writing {}", path.display()))?;
        println!("\nDefault configuration written to {}", path.display());
    } else {
        println!("\nDefault configuration:\n{toml}");
    }

    Ok(())
}
