use std::path::Path;

use clap::Args;
use prototool_core::Failure;

use crate::commands::{DirArgs, GlobalFlags};
use crate::ops;

#[derive(Args)]
pub struct CompileArgs {
    #[command(flatten)]
    pub dir: DirArgs,
    /// Print the protoc invocations instead of running them
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn run(args: CompileArgs, flags: &GlobalFlags) -> anyhow::Result<Vec<Failure>> {
    let workspace = ops::discover_input(args.dir.dir_or_file.as_deref(), flags)?;
    if workspace.groups.is_empty() {
        return Ok(Vec::new());
    }

    if args.dry_run {
        for group in &workspace.groups {
            let runner = ops::runner_for(flags, &group.config).await?;
            let argv = runner.compile_argv(group, Path::new("/dev/null"));
            println!("protoc {}", argv.join(" "));
        }
        return Ok(Vec::new());
    }

    let results = ops::compile_workspace(flags, &workspace).await?;
    Ok(results.into_iter().flat_map(|r| r.failures).collect())
}
