mod commands;
mod summary;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "vespera", about = "Vespera Pro preprocessing through Siril")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Preset catalog (TOML) to use instead of the built-in presets
    #[arg(long, global = true, value_name = "TOML")]
    presets: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the input layout of a working directory
    Detect(commands::detect::DetectArgs),
    /// List the available presets
    Presets(commands::presets::PresetsArgs),
    /// Print or save a default run configuration
    Config(commands::config::ConfigArgs),
    /// Preprocess a working directory
    Run(commands::run::RunArgs),
    /// Quick Prep a stacked image
    Prep(commands::prep::PrepArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let registry = commands::load_registry(cli.presets.as_deref())?;

    match &cli.command {
        Commands::Detect(args) => commands::detect::run(args),
        Commands::Presets(args) => commands::presets::run(args, &registry),
        Commands::Config(args) => commands::config::run(args),
        Commands::Run(args) => commands::run::run(args, registry),
        Commands::Prep(args) => commands::prep::run(args, registry),
    }
}
