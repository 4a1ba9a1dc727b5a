use std::collections::HashMap;
use std::path::PathBuf;

use clap::Args;
use prototool_core::Failure;
use prototool_lint::engine::{effective_rules, LintInput};
use prototool_lint::registry::{registry, Group};
use prototool_toolchain::protoc::CompileResult;

use crate::commands::{DirArgs, GlobalFlags};
use crate::ops::{self, Workspace};
use crate::output::display_path;

#[derive(Args)]
pub struct LintArgs {
    #[command(flatten)]
    pub dir: DirArgs,
    /// List every known linter
    #[arg(long)]
    pub list_all_linters: bool,
    /// List the linters enabled by the governing config
    #[arg(long)]
    pub list_linters: bool,
    /// List the known lint groups
    #[arg(long)]
    pub list_all_lint_groups: bool,
    /// List the linters in the given group
    #[arg(long, value_name = "GROUP")]
    pub list_lint_group: Option<String>,
    /// Print the linters that differ between two groups
    #[arg(long, num_args = 2, value_names = ["GROUP1", "GROUP2"])]
    pub diff_lint_groups: Vec<String>,
}

pub async fn run(args: LintArgs, flags: &GlobalFlags) -> anyhow::Result<Vec<Failure>> {
    if args.list_all_linters {
        for rule in registry().rules() {
            println!("{}", rule.id);
        }
        return Ok(Vec::new());
    }
    if args.list_all_lint_groups {
        for group in Group::ALL {
            println!("{}", group.name());
        }
        return Ok(Vec::new());
    }
    if let Some(group) = &args.list_lint_group {
        for rule in registry().group(group)? {
            println!("{}", rule.id);
        }
        return Ok(Vec::new());
    }
    if let [first, second] = args.diff_lint_groups.as_slice() {
        let first_ids: Vec<&str> = registry().group(first)?.iter().map(|r| r.id).collect();
        let second_ids: Vec<&str> = registry().group(second)?.iter().map(|r| r.id).collect();
        for id in &first_ids {
            if !second_ids.contains(id) {
                println!("< {id}");
            }
        }
        for id in &second_ids {
            if !first_ids.contains(id) {
                println!("> {id}");
            }
        }
        return Ok(Vec::new());
    }
    if args.list_linters {
        let config = ops::config_for_input(args.dir.dir_or_file.as_deref(), flags)?;
        for rule in effective_rules(&config.lint)? {
            println!("{}", rule.id);
        }
        return Ok(Vec::new());
    }

    let workspace = ops::discover_input(args.dir.dir_or_file.as_deref(), flags)?;
    if workspace.refs.is_empty() {
        return Ok(Vec::new());
    }
    let results = ops::compile_workspace(flags, &workspace).await?;
    let compile_failures: Vec<Failure> =
        results.iter().flat_map(|r| r.failures.clone()).collect();
    if !compile_failures.is_empty() {
        return Ok(compile_failures);
    }

    lint_files(&workspace, &results)
}

/// Parse and lint every discovered file against its group's
/// descriptors. Also used by `all`.
pub fn lint_files(
    workspace: &Workspace,
    results: &[CompileResult],
) -> anyhow::Result<Vec<Failure>> {
    let results_by_dir: HashMap<PathBuf, &CompileResult> = workspace
        .groups
        .iter()
        .zip(results.iter())
        .map(|(group, result)| (group.config.dir.clone(), result))
        .collect();

    let mut failures = Vec::new();
    let mut parsed = Vec::new();
    for file_ref in &workspace.refs {
        let display = display_path(&file_ref.path);
        let source = std::fs::read_to_string(&file_ref.path)?;
        let stream = match prototool_lang::lex(&display, &source) {
            Ok(stream) => stream,
            Err(e) => {
                failures.push(e.to_failure());
                continue;
            }
        };
        let file = match prototool_lang::parse(&display, &stream) {
            Ok(file) => file,
            Err(e) => {
                failures.push(e.to_failure());
                continue;
            }
        };
        parsed.push((file_ref, display, stream, file));
    }

    let inputs: Vec<LintInput<'_>> = parsed
        .iter()
        .map(|(file_ref, display, stream, file)| LintInput {
            display_path: display.clone(),
            abs_path: file_ref.path.clone(),
            file,
            stream,
            descriptors: results_by_dir
                .get(&file_ref.config.dir)
                .and_then(|r| r.descriptor_set.as_ref()),
            config: &file_ref.config,
        })
        .collect();
    failures.extend(prototool_lint::run(&inputs)?);
    Ok(failures)
}
