use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use prost_types::FileDescriptorSet;
use prototool_config::{discover, group_by_config, Config, ConfigResolver, FileGroup, FileRef};
use prototool_toolchain::protoc::{compile_all, CompileResult};
use prototool_toolchain::{protoc_platform, ProtocRunner, ToolchainCache};

use crate::commands::GlobalFlags;

/// The resolved inputs of a command: discovered files and their
/// config groups.
pub struct Workspace {
    pub refs: Vec<FileRef>,
    pub groups: Vec<FileGroup>,
}

pub fn discover_input(dir_or_file: Option<&Path>, flags: &GlobalFlags) -> anyhow::Result<Workspace> {
    let input = dir_or_file.unwrap_or(Path::new(".")).to_path_buf();
    let anchor = if input.is_file() {
        input.parent().unwrap_or(Path::new(".")).to_path_buf()
    } else {
        input.clone()
    };
    let mut resolver = ConfigResolver::new(flags.config_data.as_deref(), &anchor)?;
    let refs = discover(&input, &mut resolver)?;
    let groups = group_by_config(refs.clone());
    Ok(Workspace { refs, groups })
}

/// The governing config of the input itself, for commands that need
/// one without discovering files (cache update, create, lint lists).
pub fn config_for_input(dir_or_file: Option<&Path>, flags: &GlobalFlags) -> anyhow::Result<Config> {
    let input = dir_or_file.unwrap_or(Path::new(".")).to_path_buf();
    let dir = if input.is_file() {
        input.parent().unwrap_or(Path::new(".")).to_path_buf()
    } else {
        input
    };
    let dir = dir.canonicalize().unwrap_or(dir);
    let mut resolver = ConfigResolver::new(flags.config_data.as_deref(), &dir)?;
    let config = resolver.for_dir(&dir)?;
    Ok(config.as_ref().clone())
}

/// A runner for one group: the explicit protoc paths when given,
/// otherwise the cached toolchain for the group's pinned version.
pub async fn runner_for(flags: &GlobalFlags, config: &Config) -> anyhow::Result<ProtocRunner> {
    match (&flags.protoc_bin_path, &flags.protoc_wkt_path) {
        (Some(bin), Some(wkt)) => return Ok(ProtocRunner::new(bin.clone(), wkt.clone())),
        (None, None) => {}
        _ => anyhow::bail!("--protoc-bin-path and --protoc-wkt-path must be set together"),
    }
    let cache = ToolchainCache::new(flags.cache_path.clone(), flags.protoc_url.clone())?;
    let platform = protoc_platform()?;
    let entry = cache
        .ensure(&config.protoc.version, platform)
        .await
        .with_context(|| format!("ensuring protoc {}", config.protoc.version))?;
    Ok(ProtocRunner::from_entry(&entry))
}

/// Compile every group, in parallel across groups.
pub async fn compile_workspace(
    flags: &GlobalFlags,
    workspace: &Workspace,
) -> anyhow::Result<Vec<CompileResult>> {
    let mut jobs = Vec::with_capacity(workspace.groups.len());
    for group in &workspace.groups {
        jobs.push((runner_for(flags, &group.config).await?, group.clone()));
    }
    Ok(compile_all(jobs).await?)
}

/// Union of the per-group descriptor sets, deduplicated by file name
/// (well-known types appear in every group).
pub fn merged_descriptor_set(results: &[CompileResult]) -> FileDescriptorSet {
    let mut seen = BTreeSet::new();
    let mut merged = FileDescriptorSet::default();
    for result in results {
        if let Some(set) = &result.descriptor_set {
            for file in &set.file {
                if seen.insert(file.name().to_string()) {
                    merged.file.push(file.clone());
                }
            }
        }
    }
    merged
}
