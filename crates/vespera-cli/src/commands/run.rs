use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use vespera_core::config::Configuration;
use vespera_core::registry::Registry;
use vespera_core::service::PipelineService;

use super::{follow, open_engine, EngineArgs};
use crate::summary;

#[derive(Clone, Copy, Default, ValueEnum)]
pub enum Toggle {
    On,
    Off,
    /// Config file value, or the sky preset's recommendation
    #[default]
    Auto,
}

#[derive(Args)]
pub struct RunArgs {
    /// Working directory holding the capture
    pub workdir: PathBuf,

    /// Run config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Filter preset name
    #[arg(long)]
    pub filter: Option<String>,

    /// Sky quality preset name
    #[arg(long)]
    pub sky: Option<String>,

    /// Stacking method preset name
    #[arg(long)]
    pub stacking: Option<String>,

    /// Edge feathering radius in pixels (0-100)
    #[arg(long)]
    pub feather: Option<u8>,

    /// Register in two passes with maximum framing
    #[arg(long)]
    pub two_pass: bool,

    /// Background extraction on the final image
    #[arg(long, value_enum, default_value = "auto")]
    pub background: Toggle,

    /// Photometric color calibration on the final image
    #[arg(long)]
    pub color_calibration: bool,

    /// Keep process/ and masters/ after the run
    #[arg(long)]
    pub keep_temp: bool,

    #[command(flatten)]
    pub engine: EngineArgs,
}

pub fn run(args: &RunArgs, registry: Registry) -> Result<()> {
    let workdir = args
        .workdir
        .canonicalize()
        .with_context(|| format!("Cannot open {}", args.workdir.display()))?;
    let config = build_config(args, &registry)?;

    let (engine, script) = open_engine(&args.engine)?;
    summary::print_run_summary(&workdir, &config, engine.name());

    let service = PipelineService::new(Arc::new(registry));
    let handle = service.start(workdir, config, engine)?;
    let result = follow(handle);

    // A dry run keeps what it recorded even when the run stopped early.
    if let Some(script) = script {
        script.save()?;
    }
    let run_summary = result?;
    summary::print_outputs(&run_summary);

    Ok(())
}

fn build_config(args: &RunArgs, registry: &Registry) -> Result<Configuration> {
    let from_file = args.config.is_some();
    let mut config = match args.config {
        Some(ref path) => Configuration::load(path)
            .with_context(|| format!("Invalid run config {}", path.display()))?,
        None => Configuration::default(),
    };

    if let Some(ref filter) = args.filter {
        config.filter = filter.clone();
    }
    if let Some(ref sky) = args.sky {
        config.sky_quality = sky.clone();
    }
    if let Some(ref stacking) = args.stacking {
        config.stacking = stacking.clone();
    }
    if let Some(feather) = args.feather {
        config.feather = feather;
    }
    config.two_pass |= args.two_pass;
    config.auto_color_calibration |= args.color_calibration;
    config.keep_temp_files |= args.keep_temp;

    config.auto_background_extraction = match args.background {
        Toggle::On => true,
        Toggle::Off => false,
        Toggle::Auto if from_file => config.auto_background_extraction,
        Toggle::Auto => registry
            .sky(&config.sky_quality)
            .map(|sky| sky.gradient_correction)
            .unwrap_or(false),
    };

    // Catch unknown presets before Siril is started.
    config.resolve(registry)?;
    Ok(config)
}
