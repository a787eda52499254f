mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "blendgen", about = "Blended-galaxy training set generator")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate batches of samples and write them to disk
    Generate(commands::generate::GenerateArgs),
    /// Render one sample and save PNG previews
    Preview(commands::preview::PreviewArgs),
    /// Show the survey band table and the default run configuration
    Info(commands::info::InfoArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Generate(args) => commands::generate::run(args),
        Commands::Preview(args) => commands::preview::run(args),
        Commands::Info(args) => commands::info::run(args),
    }
}
