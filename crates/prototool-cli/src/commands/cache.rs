use clap::Subcommand;
use prototool_core::Failure;
use prototool_toolchain::cache::delete_default_cache;
use prototool_toolchain::{protoc_platform, ToolchainCache};

use crate::commands::{DirArgs, GlobalFlags};
use crate::ops;

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Download and install the configured protoc version
    Update(DirArgs),
    /// Remove the default cache root
    Delete,
}

pub async fn run(command: CacheCommands, flags: &GlobalFlags) -> anyhow::Result<Vec<Failure>> {
    match command {
        CacheCommands::Update(args) => {
            let config = ops::config_for_input(args.dir_or_file.as_deref(), flags)?;
            let cache = ToolchainCache::new(flags.cache_path.clone(), flags.protoc_url.clone())?;
            let platform = protoc_platform()?;
            let entry = cache.ensure(&config.protoc.version, platform).await?;
            tracing::info!(
                version = entry.version,
                protoc = %entry.binary_path.display(),
                "toolchain ready"
            );
        }
        CacheCommands::Delete => {
            let root = delete_default_cache()?;
            tracing::info!(root = %root.display(), "cache removed");
        }
    }
    Ok(Vec::new())
}
