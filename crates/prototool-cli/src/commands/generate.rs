use clap::Args;
use prototool_core::Failure;

use crate::commands::{DirArgs, GlobalFlags};
use crate::ops;

#[derive(Args)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub dir: DirArgs,
    /// Print the protoc invocations instead of running them
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn run(args: GenerateArgs, flags: &GlobalFlags) -> anyhow::Result<Vec<Failure>> {
    let workspace = ops::discover_input(args.dir.dir_or_file.as_deref(), flags)?;
    let mut failures = Vec::new();
    for group in &workspace.groups {
        if group.config.generate.plugins.is_empty() {
            continue;
        }
        let runner = ops::runner_for(flags, &group.config).await?;
        if args.dry_run {
            println!("protoc {}", runner.generate_argv(group).join(" "));
            continue;
        }
        failures.extend(runner.generate(group).await?);
    }
    Ok(failures)
}
