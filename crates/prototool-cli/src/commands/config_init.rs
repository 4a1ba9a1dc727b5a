use std::path::PathBuf;

use clap::{Args, Subcommand};
use prototool_config::template;
use prototool_core::Failure;

use crate::commands::GlobalFlags;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write an initial prototool.yaml
    Init(InitArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Directory to write prototool.yaml into (defaults to the current directory)
    pub dir: Option<PathBuf>,
    /// Uncomment all options in the generated file
    #[arg(long)]
    pub uncomment: bool,
}

pub fn run(command: ConfigCommands, _flags: &GlobalFlags) -> anyhow::Result<Vec<Failure>> {
    let ConfigCommands::Init(args) = command;
    let dir = args.dir.unwrap_or_else(|| PathBuf::from("."));
    if !dir.is_dir() {
        anyhow::bail!("{} is not a directory", dir.display());
    }
    for existing in ["prototool.yaml", "prototool.json"] {
        if dir.join(existing).exists() {
            anyhow::bail!("{} already exists", dir.join(existing).display());
        }
    }
    let target = dir.join("prototool.yaml");
    std::fs::write(&target, template::generate(None, args.uncomment))?;
    tracing::info!(config = %target.display(), "wrote config");
    Ok(Vec::new())
}
