use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use vespera_core::prep::{BackgroundMethod, DenoiseMethod, PrepOptions};
use vespera_core::registry::Registry;
use vespera_core::service::PipelineService;

use super::{follow, open_engine, EngineArgs};

#[derive(Clone, Copy, ValueEnum)]
pub enum BackgroundArg {
    None,
    /// Siril RBF background extraction
    Rbf,
    /// GraXpert AI background extraction
    Graxpert,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum DenoiseArg {
    None,
    Silentium,
    Graxpert,
    /// Cosmic Clarity
    Cosmic,
}

#[derive(Args)]
pub struct PrepArgs {
    /// Stacked image to prepare
    pub image: PathBuf,

    /// Background extraction method
    #[arg(long, value_enum, default_value = "none")]
    pub background: BackgroundArg,

    /// GraXpert background smoothing (0-1)
    #[arg(long, default_value = "0.5")]
    pub smoothing: f32,

    /// Plate solve the image
    #[arg(long)]
    pub plate_solve: bool,

    /// Photometric color calibration
    #[arg(long)]
    pub pcc: bool,

    /// Denoising method
    #[arg(long, value_enum, default_value = "none")]
    pub denoise: DenoiseArg,

    /// GraXpert denoise strength (0-1)
    #[arg(long, default_value = "0.5")]
    pub strength: f32,

    /// Open the result in the stretch script once saved
    #[arg(long)]
    pub stretch: bool,

    #[command(flatten)]
    pub engine: EngineArgs,
}

pub fn run(args: &PrepArgs, registry: Registry) -> Result<()> {
    let image = args
        .image
        .canonicalize()
        .with_context(|| format!("Cannot open {}", args.image.display()))?;
    let options = build_options(args);

    println!("Vespera Quick Prep");
    println!("  Image:    {}", image.display());
    println!();

    let (engine, script) = open_engine(&args.engine)?;
    let service = PipelineService::new(Arc::new(registry));
    let handle = service.start_prep(image, options, engine)?;
    let result = follow(handle);

    if let Some(script) = script {
        script.save()?;
    }
    let prep_summary = result?;
    for note in &prep_summary.notes {
        println!("  {note}");
    }
    println!(
        "\n{} step(s) applied, output saved to {}",
        prep_summary.steps_applied,
        prep_summary.output.display()
    );

    Ok(())
}

fn build_options(args: &PrepArgs) -> PrepOptions {
    let background = match args.background {
        BackgroundArg::None => BackgroundMethod::None,
        BackgroundArg::Rbf => BackgroundMethod::SirilRbf,
        BackgroundArg::Graxpert => BackgroundMethod::Graxpert {
            smoothing: args.smoothing,
        },
    };
    let denoise = match args.denoise {
        DenoiseArg::None => DenoiseMethod::None,
        DenoiseArg::Silentium => DenoiseMethod::Silentium,
        DenoiseArg::Graxpert => DenoiseMethod::Graxpert {
            strength: args.strength,
        },
        DenoiseArg::Cosmic => DenoiseMethod::CosmicClarity,
    };

    PrepOptions {
        background,
        plate_solve: args.plate_solve,
        color_calibration: args.pcc,
        denoise,
        launch_stretch: args.stretch,
    }
}
