use std::path::{Path, PathBuf};

use clap::Args;
use prototool_config::create::{derive_package, scaffold_file};
use prototool_config::ConfigResolver;
use prototool_core::Failure;

use crate::commands::GlobalFlags;

#[derive(Args)]
pub struct CreateArgs {
    /// Paths of the .proto files to create
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
    /// Package to use instead of the derived one
    #[arg(long)]
    pub package: Option<String>,
}

pub fn run(args: CreateArgs, flags: &GlobalFlags) -> anyhow::Result<Vec<Failure>> {
    let cwd = std::env::current_dir()?;
    for path in &args.files {
        let abs = if path.is_absolute() {
            path.clone()
        } else {
            cwd.join(path)
        };
        if abs.exists() {
            anyhow::bail!("{} already exists", abs.display());
        }
        if abs.extension().map_or(true, |e| e != "proto") {
            anyhow::bail!("{} does not end in .proto", abs.display());
        }

        // The governing config is the nearest existing ancestor's.
        let anchor = nearest_existing_dir(abs.parent().unwrap_or(Path::new(".")));
        let anchor = anchor.canonicalize().unwrap_or(anchor);
        let mut resolver = ConfigResolver::new(flags.config_data.as_deref(), &anchor)?;
        let config = resolver.for_dir(&anchor)?;

        // Re-anchor the absolute path against the canonicalized
        // config dir so package derivation sees a consistent prefix.
        let rel_to_anchor = abs
            .parent()
            .and_then(|p| p.strip_prefix(nearest_existing_dir(p)).ok().map(Path::to_path_buf))
            .unwrap_or_default();
        let effective = anchor
            .join(&rel_to_anchor)
            .join(abs.file_name().unwrap_or_default());

        let package = match &args.package {
            Some(package) => package.clone(),
            None => derive_package(&config, &effective),
        };
        let content = scaffold_file(&config, &effective, &package)?;

        if let Some(parent) = abs.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&abs, content)?;
        tracing::info!(file = %abs.display(), package, "created");
    }
    Ok(Vec::new())
}

fn nearest_existing_dir(start: &Path) -> PathBuf {
    let mut current = start.to_path_buf();
    while !current.is_dir() {
        if !current.pop() {
            return PathBuf::from(".");
        }
    }
    current
}
