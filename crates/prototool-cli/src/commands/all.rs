use clap::Args;
use prototool_core::Failure;

use crate::commands::{format, lint, DirArgs, GlobalFlags};
use crate::ops;

#[derive(Args)]
pub struct AllArgs {
    #[command(flatten)]
    pub dir: DirArgs,
}

/// Compile, then check formatting, then lint, aggregating all
/// diagnostics into one report.
pub async fn run(args: AllArgs, flags: &GlobalFlags) -> anyhow::Result<Vec<Failure>> {
    let workspace = ops::discover_input(args.dir.dir_or_file.as_deref(), flags)?;
    if workspace.refs.is_empty() {
        return Ok(Vec::new());
    }

    let results = ops::compile_workspace(flags, &workspace).await?;
    let mut failures: Vec<Failure> = results.iter().flat_map(|r| r.failures.clone()).collect();
    if !failures.is_empty() {
        return Ok(failures);
    }

    failures.extend(format::format_files(
        &workspace,
        &format::FormatArgs {
            dir: DirArgs { dir_or_file: None },
            fix: false,
            overwrite: false,
            diff_mode: false,
            lint_mode: true,
        },
    )?);
    failures.extend(lint::lint_files(&workspace, &results)?);
    Ok(failures)
}
