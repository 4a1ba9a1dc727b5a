use std::path::Path;

use clap::{Args, Subcommand};
use prototool_break::{check, checkout_baseline, BreakOptions, GitRef};
use prototool_core::Failure;

use crate::commands::{DirArgs, GlobalFlags};
use crate::ops;

#[derive(Subcommand)]
pub enum BreakCommands {
    /// Compare the current schema against a git baseline
    Check(CheckArgs),
}

#[derive(Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub dir: DirArgs,
    /// Baseline git branch
    #[arg(long, conflicts_with = "git_tag")]
    pub git_branch: Option<String>,
    /// Baseline git tag
    #[arg(long)]
    pub git_tag: Option<String>,
    /// Also check beta packages, which are exempt by default
    #[arg(long)]
    pub include_beta: bool,
    /// Allow non-beta files to import beta files
    #[arg(long)]
    pub allow_beta_deps: bool,
}

pub async fn run(command: BreakCommands, flags: &GlobalFlags) -> anyhow::Result<Vec<Failure>> {
    let BreakCommands::Check(args) = command;
    let reference = match (&args.git_branch, &args.git_tag) {
        (Some(branch), None) => GitRef::Branch(branch.clone()),
        (None, Some(tag)) => GitRef::Tag(tag.clone()),
        _ => anyhow::bail!("break check requires exactly one of --git-branch or --git-tag"),
    };

    let input = args
        .dir
        .dir_or_file
        .clone()
        .unwrap_or_else(|| Path::new(".").to_path_buf());
    let input = input.canonicalize()?;

    // Current worktree is `to`.
    let to_workspace = ops::discover_input(Some(&input), flags)?;
    let to_results = ops::compile_workspace(flags, &to_workspace).await?;
    let to_failures: Vec<Failure> = to_results.iter().flat_map(|r| r.failures.clone()).collect();
    if !to_failures.is_empty() {
        return Ok(to_failures);
    }

    // Baseline from the git ref is `from`.
    let git_dir = if input.is_file() {
        input.parent().unwrap_or(Path::new(".")).to_path_buf()
    } else {
        input.clone()
    };
    let baseline = checkout_baseline(&git_dir, &reference).await?;
    let baseline_input = baseline.baseline_path(&input);
    let from_workspace = ops::discover_input(Some(&baseline_input), flags)?;
    let from_results = ops::compile_workspace(flags, &from_workspace).await?;
    let from_failures: Vec<Failure> = from_results
        .iter()
        .flat_map(|r| r.failures.clone())
        .collect();
    if !from_failures.is_empty() {
        anyhow::bail!(
            "baseline at {} does not compile: {}",
            reference.name(),
            from_failures[0].render(prototool_core::ErrorFormat::Default)
        );
    }

    let from_set = ops::merged_descriptor_set(&from_results);
    let to_set = ops::merged_descriptor_set(&to_results);
    Ok(check(
        &from_set,
        &to_set,
        &BreakOptions {
            include_beta: args.include_beta,
            allow_beta_deps: args.allow_beta_deps,
        },
    ))
}
