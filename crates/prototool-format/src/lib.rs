pub mod engine;
pub mod error;
pub mod printer;

pub use engine::{canonical, render_diff, write_atomic};
pub use error::FormatError;
pub use printer::{print, PrintOptions};
