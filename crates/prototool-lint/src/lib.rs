pub mod engine;
pub mod error;
pub mod fix;
pub mod registry;
pub mod rules;

pub use engine::{run, run_fix, LintInput};
pub use error::LintError;
pub use fix::Edit;
pub use registry::{registry, Group, Registry, Rule};
