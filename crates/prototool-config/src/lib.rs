pub mod create;
pub mod discovery;
pub mod error;
pub mod model;
pub mod resolve;
pub mod template;

pub use discovery::{discover, group_by_config, FileGroup, FileRef};
pub use error::ConfigError;
pub use model::{Config, LintConfig, Plugin, PluginType, ProtocConfig, DEFAULT_PROTOC_VERSION};
pub use resolve::ConfigResolver;
