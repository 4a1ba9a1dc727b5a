use clap::Args;
use prototool_core::Failure;
use prototool_lint::engine::{effective_rules, load_file_header, run_fix, LintInput};

use crate::commands::{DirArgs, GlobalFlags};
use crate::ops::{self, Workspace};
use crate::output::display_path;

#[derive(Args)]
pub struct FormatArgs {
    #[command(flatten)]
    pub dir: DirArgs,
    /// Apply autofixes (file header, comment style) while formatting
    #[arg(long)]
    pub fix: bool,
    /// Write the canonical form back in place
    #[arg(long)]
    pub overwrite: bool,
    /// Print a unified diff of the changes formatting would make
    #[arg(long)]
    pub diff_mode: bool,
    /// Emit a failure for each file not in canonical form
    #[arg(long)]
    pub lint_mode: bool,
}

pub async fn run(args: FormatArgs, flags: &GlobalFlags) -> anyhow::Result<Vec<Failure>> {
    let workspace = ops::discover_input(args.dir.dir_or_file.as_deref(), flags)?;
    format_files(&workspace, &args)
}

pub fn format_files(workspace: &Workspace, args: &FormatArgs) -> anyhow::Result<Vec<Failure>> {
    let mut failures = Vec::new();
    for file_ref in &workspace.refs {
        let display = display_path(&file_ref.path);
        let source = std::fs::read_to_string(&file_ref.path)?;

        // The configured header participates only when the FILE_HEADER
        // linter is part of the effective rule set.
        let header = if args.fix
            && effective_rules(&file_ref.config.lint)?
                .iter()
                .any(|r| r.id == "FILE_HEADER")
        {
            load_file_header(&file_ref.config)?
        } else {
            None
        };

        let mut working = source.clone();
        if args.fix {
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
            let input = LintInput {
                display_path: display.clone(),
                abs_path: file_ref.path.clone(),
                file: &file,
                stream: &stream,
                descriptors: None,
                config: &file_ref.config,
            };
            let (fixed, conflicts) = run_fix(&input, &source)?;
            failures.extend(conflicts);
            working = fixed;
        }

        let formatted =
            match prototool_format::canonical(&display, &working, header.as_deref(), args.fix) {
                Ok(formatted) => formatted,
                Err(prototool_format::FormatError::Parse(e)) => {
                    failures.push(e.to_failure());
                    continue;
                }
                Err(prototool_format::FormatError::Io(e)) => return Err(e.into()),
            };

        if args.overwrite {
            if formatted != source {
                prototool_format::write_atomic(&file_ref.path, &formatted)?;
            }
        } else if args.diff_mode {
            if formatted != source {
                print!(
                    "{}",
                    prototool_format::render_diff(&display, &source, &formatted)
                );
            }
        } else if args.lint_mode {
            if formatted != source {
                failures.push(
                    Failure::new(&display, 1, 1, "file is not in canonical format")
                        .with_rule("FORMAT_DIFF"),
                );
            }
        } else {
            print!("{formatted}");
        }
    }
    Ok(failures)
}
