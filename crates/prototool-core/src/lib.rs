pub mod failure;

pub use failure::{sort_failures, ErrorFormat, Failure, Location, Severity};
