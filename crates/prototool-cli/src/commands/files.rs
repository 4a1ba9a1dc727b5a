use prototool_core::Failure;

use crate::commands::{DirArgs, GlobalFlags};
use crate::ops;
use crate::output::display_path;

pub fn run(args: DirArgs, flags: &GlobalFlags) -> anyhow::Result<Vec<Failure>> {
    let workspace = ops::discover_input(args.dir_or_file.as_deref(), flags)?;
    for file_ref in &workspace.refs {
        println!("{}", display_path(&file_ref.path));
    }
    Ok(Vec::new())
}
