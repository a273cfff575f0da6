use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use vespera_core::io::fits::integration_estimate;
use vespera_core::layout;

use crate::summary;

#[derive(Args)]
pub struct DetectArgs {
    /// Working directory holding the capture
    pub workdir: PathBuf,
}

pub fn run(args: &DetectArgs) -> Result<()> {
    let workdir = args
        .workdir
        .canonicalize()
        .with_context(|| format!("Cannot open {}", args.workdir.display()))?;
    let layout = layout::resolve(&workdir);

    let frames = layout.light_frames();
    let estimate = (!frames.is_empty()).then(|| integration_estimate(&frames));
    summary::print_layout(&workdir, &layout, estimate.as_ref());

    Ok(())
}
