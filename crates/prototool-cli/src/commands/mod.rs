pub mod all;
pub mod break_check;
pub mod cache;
pub mod compile;
pub mod config_init;
pub mod create;
pub mod files;
pub mod format;
pub mod generate;
pub mod grpc;
pub mod inspect;
pub mod lint;
pub mod version;

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};
use prototool_core::{ErrorFormat, Failure};

#[derive(Args, Clone)]
pub struct GlobalFlags {
    /// Path to the toolchain cache (defaults to the platform cache directory)
    #[arg(long, global = true)]
    pub cache_path: Option<PathBuf>,
    /// Inline config data, overriding any prototool.yaml
    #[arg(long, global = true)]
    pub config_data: Option<String>,
    /// Failure output format
    #[arg(long, global = true, value_enum, default_value = "default")]
    pub error_format: ErrorFormatArg,
    /// Emit each failure as a JSON object on its own line
    #[arg(long, global = true)]
    pub json: bool,
    /// Override the protoc release URL template ({version} and {platform} are substituted)
    #[arg(long, global = true)]
    pub protoc_url: Option<String>,
    /// Use this protoc binary instead of the cached toolchain
    #[arg(long, global = true)]
    pub protoc_bin_path: Option<PathBuf>,
    /// Use this well-known-types include directory instead of the cached toolchain
    #[arg(long, global = true)]
    pub protoc_wkt_path: Option<PathBuf>,
    /// Log debug details, including raw protoc stderr
    #[arg(long, global = true)]
    pub debug: bool,
}

impl GlobalFlags {
    pub fn failure_format(&self) -> ErrorFormat {
        if self.json || self.error_format == ErrorFormatArg::Json {
            ErrorFormat::Json
        } else {
            ErrorFormat::Default
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ErrorFormatArg {
    Default,
    Json,
}

#[derive(Args, Clone)]
pub struct DirArgs {
    /// Directory or .proto file (defaults to the current directory)
    pub dir_or_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile, check formatting, and lint
    All(all::AllArgs),
    /// Compile with protoc to check for failures
    Compile(compile::CompileArgs),
    /// Generate stubs with protoc per the configured plugins
    Generate(generate::GenerateArgs),
    /// Lint proto files against the configured rule set
    Lint(lint::LintArgs),
    /// Format proto files
    Format(format::FormatArgs),
    /// Create new proto files from the configured package layout
    Create(create::CreateArgs),
    /// List the proto files a command would operate on
    Files(DirArgs),
    /// Check for backwards-incompatible schema changes
    #[command(subcommand)]
    Break(break_check::BreakCommands),
    /// Manage the protoc toolchain cache
    #[command(subcommand)]
    Cache(cache::CacheCommands),
    /// Manage config files
    #[command(subcommand)]
    Config(config_init::ConfigCommands),
    /// Inspect compiled packages
    #[command(subcommand)]
    Inspect(inspect::InspectCommands),
    /// Call a gRPC endpoint using the compiled schema
    Grpc(grpc::GrpcArgs),
    /// Print version information
    Version,
}

impl Commands {
    pub async fn run(self, flags: &GlobalFlags) -> anyhow::Result<Vec<Failure>> {
        match self {
            Commands::All(args) => all::run(args, flags).await,
            Commands::Compile(args) => compile::run(args, flags).await,
            Commands::Generate(args) => generate::run(args, flags).await,
            Commands::Lint(args) => lint::run(args, flags).await,
            Commands::Format(args) => format::run(args, flags).await,
            Commands::Create(args) => create::run(args, flags),
            Commands::Files(args) => files::run(args, flags),
            Commands::Break(args) => break_check::run(args, flags).await,
            Commands::Cache(args) => cache::run(args, flags).await,
            Commands::Config(args) => config_init::run(args, flags),
            Commands::Inspect(args) => inspect::run(args, flags).await,
            Commands::Grpc(args) => grpc::run(args, flags).await,
            Commands::Version => version::run(flags),
        }
    }
}
