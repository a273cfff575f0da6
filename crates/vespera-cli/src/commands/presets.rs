use anyhow::Result;
use clap::Args;
use vespera_core::registry::Registry;

use crate::summary;

#[derive(Args)]
pub struct PresetsArgs {
    /// Print the catalog as TOML, ready to edit and pass back with --presets
    #[arg(long)]
    pub toml: bool,
}

pub fn run(args: &PresetsArgs, registry: &Registry) -> Result<()> {
    if args.toml {
        print!("{}", registry.to_toml_string()?);
    } else {
        summary::print_presets(registry);
    }
    Ok(())
}
