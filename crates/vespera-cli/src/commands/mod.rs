pub mod config;
pub mod detect;
pub mod prep;
pub mod presets;
pub mod run;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;
use vespera_core::engine::{HostEngine, ScriptWriter, SirilPipe, SirilPipeOptions};
use vespera_core::pipeline::PipelineEvent;
use vespera_core::registry::Registry;
use vespera_core::service::RunHandle;

use crate::summary;

/// The built-in presets, or a catalog loaded from `path`.
pub fn load_registry(path: Option<&Path>) -> Result<Registry> {
    match path {
        Some(path) => Registry::load(path)
            .with_context(|| format!("Failed to load presets from {}", path.display())),
        None => Ok(Registry::builtin()),
    }
}

#[derive(Args)]
pub struct EngineArgs {
    /// Siril command-line executable
    #[arg(long, default_value = "siril-cli")]
    pub siril: PathBuf,

    /// Write the Siril commands to a script instead of running Siril
    #[arg(long, value_name = "SSF")]
    pub script: Option<PathBuf>,
}

/// Where a dry run's recorded commands go.
pub struct ScriptOutput {
    writer: ScriptWriter,
    path: PathBuf,
}

impl ScriptOutput {
    pub fn save(&self) -> Result<()> {
        self.writer
            .write_to(&self.path)
            .with_context(|| format!("Failed to write script {}", self.path.display()))?;
        println!(
            "Siril script ({} commands) saved to {}",
            self.writer.commands().len(),
            self.path.display()
        );
        Ok(())
    }
}

/// Launch Siril, or set up a script recorder when `--script` is given.
pub fn open_engine(args: &EngineArgs) -> Result<(Box<dyn HostEngine>, Option<ScriptOutput>)> {
    if let Some(path) = &args.script {
        let writer = ScriptWriter::new();
        let output = ScriptOutput {
            writer: writer.clone(),
            path: path.clone(),
        };
        return Ok((Box::new(writer), Some(output)));
    }
    debug!(executable = %args.siril.display(), "Launching Siril");
    let options = SirilPipeOptions {
        executable: args.siril.clone(),
        ..Default::default()
    };
    let siril = SirilPipe::launch(&options)
        .with_context(|| format!("Could not start {}", args.siril.display()))?;
    Ok((Box::new(siril), None))
}

/// Render a run's events on a progress bar until it ends.
pub fn follow<T>(handle: RunHandle<T>) -> Result<T> {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg:36} [{bar:40}] {pos}%")?
            .progress_chars("=> "),
    );

    let outcome = handle.wait_with(|event| match event {
        PipelineEvent::Progress { percent, message } => {
            pb.set_position(u64::from(percent));
            pb.set_message(message);
        }
        PipelineEvent::Log { message, severity } => {
            pb.println(summary::format_log(&message, severity));
        }
        PipelineEvent::Finished { success, summary: text } => {
            if success {
                pb.finish_with_message("Done");
            } else {
                pb.abandon_with_message("Failed");
            }
            println!("\n{}", summary::format_finished(&text, success));
        }
    });
    Ok(outcome?)
}
