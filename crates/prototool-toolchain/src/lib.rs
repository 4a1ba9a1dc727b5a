pub mod cache;
pub mod download;
pub mod error;
pub mod platform;
pub mod protoc;

pub use cache::{ToolchainCache, ToolchainEntry};
pub use error::ToolchainError;
pub use platform::protoc_platform;
pub use protoc::{CompileResult, ProtocRunner};
